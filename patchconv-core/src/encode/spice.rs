//! spice2x patch records.

use super::{format_bytes, format_rva, Conversion, Tally, WarningKind};
use crate::binary::Binary;
use crate::patch::{PatchDescriptor, PatchEntry};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiceRecord {
    pub name: String,
    pub description: String,
    pub game_code: String,
    #[serde(rename = "type")]
    pub kind: SpiceKind,
    pub patches: Vec<SpicePatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpiceKind {
    Memory,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SpicePatch {
    Memory(MemoryPatch),
    Union(UnionPatch),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPatch {
    pub offset: String,
    pub dll_name: String,
    pub data_disabled: String,
    pub data_enabled: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionPatch {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SpiceKind,
    pub patch: UnionData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionData {
    pub dll_name: String,
    pub data: String,
    pub offset: String,
}

/// Converts `descriptor` into spice2x records for game `game_code`.
///
/// The default union option is never emitted; spice treats "no option
/// selected" as the unmodified binary.
pub fn encode_spice(
    descriptor: &PatchDescriptor,
    binary: &Binary,
    game_code: &str,
) -> Conversion<Vec<SpiceRecord>> {
    let mut tally = Tally::default();
    let dll = descriptor.file_name.as_str();
    let mut records = Vec::new();

    for entry in &descriptor.entries {
        let (name, description, kind, patches) = match entry {
            PatchEntry::NumberUnsupported { name } => {
                tally.warn(name, WarningKind::UnsupportedVariant);
                continue;
            }
            PatchEntry::Plain {
                name,
                description,
                patches,
            } => {
                let patches: Vec<_> = patches
                    .iter()
                    .filter_map(|p| {
                        let rva = tally.resolve(binary, name, p.offset)?;
                        Some(SpicePatch::Memory(MemoryPatch {
                            offset: format_rva(rva),
                            dll_name: dll.to_string(),
                            data_disabled: format_bytes(&p.off),
                            data_enabled: format_bytes(&p.on),
                        }))
                    })
                    .collect();
                (name, description, SpiceKind::Memory, patches)
            }
            PatchEntry::Union {
                name,
                description,
                offset,
                options,
            } => {
                let Some(rva) = tally.resolve(binary, name, *offset) else {
                    continue;
                };
                let patches: Vec<_> = options
                    .iter()
                    .skip(1)
                    .map(|o| {
                        SpicePatch::Union(UnionPatch {
                            name: o.name.clone(),
                            kind: SpiceKind::Union,
                            patch: UnionData {
                                dll_name: dll.to_string(),
                                data: format_bytes(&o.bytes),
                                offset: format_rva(rva),
                            },
                        })
                    })
                    .collect();
                (name, description, SpiceKind::Union, patches)
            }
        };

        if patches.is_empty() {
            log::warn!("no patches left for \"{name}\", skipping");
            continue;
        }

        records.push(SpiceRecord {
            name: name.clone(),
            description: description.clone(),
            game_code: game_code.to_string(),
            kind,
            patches,
        });
    }

    log::info!(
        "successfully converted {} patches for \"{}\" version \"{}\"",
        records.len(),
        descriptor.file_name,
        descriptor.description
    );

    let converted = records.len();
    tally.finish(records, converted)
}

/// Pretty-prints records as a JSON array indented by four spaces.
pub fn to_json_pretty(records: &[SpiceRecord]) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{PlainPatch, UnionOption};
    use crate::sections::{Section, SectionTable};
    use serde_json::json;

    fn binary() -> Binary {
        let sections = SectionTable::new(vec![Section::new(0x1000, 0x400, 0x200)]);
        Binary::from_parts("game.dll", vec![0u8; 0x600], sections)
    }

    fn descriptor() -> PatchDescriptor {
        PatchDescriptor {
            file_name: "soundvoltex.dll".into(),
            description: "2023-09-12".into(),
            entries: vec![
                PatchEntry::Plain {
                    name: "Disable power change".into(),
                    description: "Prevents power settings from changing".into(),
                    patches: vec![
                        PlainPatch {
                            offset: 0x410,
                            on: vec![0xeb],
                            off: vec![0x74],
                        },
                        PlainPatch {
                            offset: 0x10,
                            on: vec![0x90],
                            off: vec![0x75],
                        },
                    ],
                },
                PatchEntry::NumberUnsupported {
                    name: "Volume".into(),
                },
                PatchEntry::Union {
                    name: "Timer".into(),
                    description: String::new(),
                    offset: 0x500,
                    options: vec![
                        UnionOption {
                            name: "Default".into(),
                            bytes: vec![0x90, 0x90],
                        },
                        UnionOption {
                            name: "Freeze".into(),
                            bytes: vec![0xeb, 0x02],
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn renders_memory_and_union_records() {
        let c = encode_spice(&descriptor(), &binary(), "KFC");
        assert_eq!(c.converted, 2);
        assert_eq!(c.warnings.len(), 2);

        let value = serde_json::to_value(&c.output).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "name": "Disable power change",
                    "description": "Prevents power settings from changing",
                    "gameCode": "KFC",
                    "type": "memory",
                    "patches": [{
                        "offset": "1010",
                        "dllName": "soundvoltex.dll",
                        "dataDisabled": "74",
                        "dataEnabled": "EB"
                    }]
                },
                {
                    "name": "Timer",
                    "description": "",
                    "gameCode": "KFC",
                    "type": "union",
                    "patches": [{
                        "name": "Freeze",
                        "type": "union",
                        "patch": {
                            "dllName": "soundvoltex.dll",
                            "data": "EB02",
                            "offset": "1100"
                        }
                    }]
                }
            ])
        );
    }

    #[test]
    fn unresolvable_union_and_empty_memory_are_dropped() {
        let d = PatchDescriptor {
            file_name: "a.dll".into(),
            description: "x".into(),
            entries: vec![
                PatchEntry::Plain {
                    name: "Outside".into(),
                    description: String::new(),
                    patches: vec![PlainPatch {
                        offset: 0x10,
                        on: vec![1],
                        off: vec![0],
                    }],
                },
                PatchEntry::Union {
                    name: "U".into(),
                    description: String::new(),
                    offset: 0x700,
                    options: vec![UnionOption {
                        name: "Default".into(),
                        bytes: vec![0],
                    }],
                },
            ],
        };
        let c = encode_spice(&d, &binary(), "LDJ");
        assert!(c.output.is_empty());
        assert_eq!(c.converted, 0);
        assert_eq!(c.warnings.len(), 2);
    }

    #[test]
    fn pretty_output_keeps_key_order_and_indent() {
        let c = encode_spice(&descriptor(), &binary(), "KFC");
        let text = to_json_pretty(&c.output).unwrap();

        assert!(text.starts_with("[\n    {\n        \"name\": \"Disable power change\",\n"));
        let name = text.find("\"name\"").unwrap();
        let game = text.find("\"gameCode\"").unwrap();
        let patches = text.find("\"patches\"").unwrap();
        assert!(name < game && game < patches);
    }
}
