const ILLEGAL: &[char] = &['/', '\\', '?', '<', '>', ':', '*', '|', '"'];
const RESERVED: &[&str] = &["con", "prn", "aux", "nul"];
const MAX_LEN: usize = 255;

/// Strips characters that are not allowed in file names on common platforms.
pub fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && !c.is_control())
        .collect();

    if out == "." || out == ".." || is_reserved(&out) {
        out.clear();
    }

    let trimmed = out.trim_end_matches(['.', ' ']).len();
    out.truncate(trimmed);

    if out.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}

/// Windows device names, with or without an extension.
fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or("").to_ascii_lowercase();
    if RESERVED.contains(&stem.as_str()) {
        return true;
    }
    match stem.strip_prefix("com").or_else(|| stem.strip_prefix("lpt")) {
        Some(n) => n.len() == 1 && n.as_bytes()[0].is_ascii_digit(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_illegal_characters() {
        assert_eq!(sanitize("2023-09-12 (final).dll"), "2023-09-12 (final).dll");
        assert_eq!(sanitize("a/b\\c?d<e>f:g*h|i\"j"), "abcdefghij");
        assert_eq!(sanitize("tab\there\n"), "tabhere");
        assert_eq!(sanitize("../../etc/passwd"), "....etcpasswd");
    }

    #[test]
    fn drops_reserved_names_and_trailing_dots() {
        assert_eq!(sanitize("CON"), "");
        assert_eq!(sanitize("com1.txt"), "");
        assert_eq!(sanitize("console.txt"), "console.txt");
        assert_eq!(sanitize(".."), "");
        assert_eq!(sanitize("name. . "), "name");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize(&long);
        assert!(out.len() <= MAX_LEN);
        assert_eq!(out.len(), 254);
    }
}
