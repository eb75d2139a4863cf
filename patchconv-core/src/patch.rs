//! Normalized patch model.
//!
//! Descriptors arrive as JSON from an external extractor and are untrusted.
//! [`PatchDescriptor::from_value`] checks every entry against the schema for
//! its declared `type` and decides the variant once; encoders only ever see
//! [`PatchEntry`] values. A single malformed entry rejects the whole
//! descriptor.

use crate::error::{PatchError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

const DESCRIPTOR: &str = "<descriptor>";

/// One on/off byte pair at a file offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainPatch {
    pub offset: u32,
    pub on: Vec<u8>,
    pub off: Vec<u8>,
}

/// One named alternative of a union patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionOption {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchEntry {
    /// Toggle between fixed on/off bytes at one or more offsets.
    Plain {
        name: String,
        description: String,
        patches: Vec<PlainPatch>,
    },
    /// Mutually exclusive alternatives at one offset. `options[0]` is the
    /// default state of the binary.
    Union {
        name: String,
        description: String,
        offset: u32,
        options: Vec<UnionOption>,
    },
    /// Numeric value patch; no output grammar can express it.
    NumberUnsupported { name: String },
}

impl PatchEntry {
    pub fn name(&self) -> &str {
        match self {
            PatchEntry::Plain { name, .. }
            | PatchEntry::Union { name, .. }
            | PatchEntry::NumberUnsupported { name } => name,
        }
    }
}

/// All patches for one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub file_name: String,
    pub description: String,
    pub entries: Vec<PatchEntry>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "fileName", alias = "fname")]
    file_name: String,
    description: String,
    #[serde(alias = "args")]
    entries: Vec<Value>,
}

#[derive(Deserialize)]
struct RawEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(alias = "description", default)]
    tooltip: Option<String>,
    #[serde(default)]
    offset: Option<u32>,
    #[serde(default)]
    patches: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawPlainPatch {
    offset: u32,
    on: Vec<u8>,
    off: Vec<u8>,
}

#[derive(Deserialize)]
struct RawUnionOption {
    name: String,
    #[serde(alias = "bytes")]
    patch: Vec<u8>,
}

impl PatchDescriptor {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawDescriptor = serde_json::from_value(value)
            .map_err(|e| PatchError::malformed(DESCRIPTOR, e.to_string()))?;

        let entries = raw
            .entries
            .into_iter()
            .enumerate()
            .map(|(i, v)| normalize_entry(i, v))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name()) {
                log::warn!("duplicate patch name \"{}\" in \"{}\"", entry.name(), raw.file_name);
            }
        }

        log::info!(
            "found {} patches for \"{}\" version \"{}\"",
            entries.len(),
            raw.file_name,
            raw.description
        );

        Ok(Self {
            file_name: raw.file_name,
            description: raw.description,
            entries,
        })
    }
}

/// Parses extractor output: either one descriptor object or an array of them.
///
/// Only invalid JSON fails the whole input. Each descriptor is normalized on
/// its own, so one malformed descriptor does not hide the others.
pub fn descriptors_from_json(s: &str) -> Result<Vec<Result<PatchDescriptor>>> {
    let value: Value =
        serde_json::from_str(s).map_err(|e| PatchError::malformed(DESCRIPTOR, e.to_string()))?;

    Ok(match value {
        Value::Array(items) => items.into_iter().map(PatchDescriptor::from_value).collect(),
        other => vec![PatchDescriptor::from_value(other)],
    })
}

fn normalize_entry(index: usize, value: Value) -> Result<PatchEntry> {
    let label = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{index}"));

    let raw: RawEntry =
        serde_json::from_value(value).map_err(|e| PatchError::malformed(&label, e.to_string()))?;

    if raw.name.is_empty() {
        return Err(PatchError::malformed(label, "empty name"));
    }
    check_name(&raw.name, &raw.name)?;

    let description = raw.tooltip.unwrap_or_default();

    match raw.kind.as_deref() {
        None => {
            let patches = require_patches(&raw.name, raw.patches)?
                .into_iter()
                .map(|v| plain_patch(&raw.name, v))
                .collect::<Result<Vec<_>>>()?;

            Ok(PatchEntry::Plain {
                name: raw.name,
                description,
                patches,
            })
        }
        Some("union") => {
            let offset = raw
                .offset
                .ok_or_else(|| PatchError::malformed(&raw.name, "union without offset"))?;
            let options = require_patches(&raw.name, raw.patches)?
                .into_iter()
                .map(|v| union_option(&raw.name, v))
                .collect::<Result<Vec<_>>>()?;

            Ok(PatchEntry::Union {
                name: raw.name,
                description,
                offset,
                options,
            })
        }
        Some("number") => Ok(PatchEntry::NumberUnsupported { name: raw.name }),
        Some(other) => Err(PatchError::malformed(
            &raw.name,
            format!("unknown patch type \"{other}\""),
        )),
    }
}

fn require_patches(entry: &str, patches: Option<Vec<Value>>) -> Result<Vec<Value>> {
    match patches {
        Some(p) if !p.is_empty() => Ok(p),
        Some(_) => Err(PatchError::malformed(entry, "empty patches list")),
        None => Err(PatchError::malformed(entry, "missing field `patches`")),
    }
}

/// Names end up inside the line-oriented mempatch grammar.
fn check_name(entry: &str, name: &str) -> Result<()> {
    if name.chars().any(char::is_control) {
        return Err(PatchError::malformed(
            entry.escape_debug().to_string(),
            format!("control character in name \"{}\"", name.escape_debug()),
        ));
    }
    Ok(())
}

fn plain_patch(entry: &str, value: Value) -> Result<PlainPatch> {
    let raw: RawPlainPatch =
        serde_json::from_value(value).map_err(|e| PatchError::malformed(entry, e.to_string()))?;

    if raw.on.is_empty() {
        return Err(PatchError::malformed(entry, "empty patch bytes"));
    }
    if raw.on.len() != raw.off.len() {
        return Err(PatchError::malformed(
            entry,
            format!(
                "on/off length mismatch at offset {:#x} ({} != {})",
                raw.offset,
                raw.on.len(),
                raw.off.len()
            ),
        ));
    }

    Ok(PlainPatch {
        offset: raw.offset,
        on: raw.on,
        off: raw.off,
    })
}

fn union_option(entry: &str, value: Value) -> Result<UnionOption> {
    let raw: RawUnionOption =
        serde_json::from_value(value).map_err(|e| PatchError::malformed(entry, e.to_string()))?;

    check_name(entry, &raw.name)?;
    if raw.patch.is_empty() {
        return Err(PatchError::malformed(
            entry,
            format!("option \"{}\" has no bytes", raw.name),
        ));
    }

    Ok(UnionOption {
        name: raw.name,
        bytes: raw.patch,
    })
}
