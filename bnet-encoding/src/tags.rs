//! Per-field annotations.
//!
//! Annotations are written as comma-separated `key-value` pairs, e.g.
//! `"save-Count"`, `"len-Count"`, `"size-uint8"` or `"bigendian"`. Each token
//! splits on its first `-`; a token without `-` is a presence-only flag.
//! Values containing `-` or `,` are not representable.

use crate::error::ErrorKind;
use std::collections::BTreeMap;

/// Boolean width annotation key.
pub const TAG_SIZE: &str = "size";
/// Big-endian integer annotation key.
pub const TAG_BIGENDIAN: &str = "bigendian";
/// Publishes the field's decoded value under a binding name.
pub const TAG_SAVE: &str = "save";
/// Takes a sequence's element count from a binding name.
pub const TAG_LEN: &str = "len";
/// Promotes the fields of an embedded message into the enclosing one.
pub const TAG_EMBED: &str = "embed";

/// Raw key/value view of an annotation string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    /// Parses an annotation string. Empty input and the literal `-` yield an
    /// empty map.
    pub fn parse(tag: &str) -> Self {
        let mut out = BTreeMap::new();
        if tag.is_empty() || tag == "-" {
            return Self(out);
        }

        for token in tag.split(',') {
            match token.split_once('-') {
                Some((key, value)) => out.insert(key.to_string(), value.to_string()),
                None => out.insert(token.to_string(), String::new()),
            };
        }

        Self(out)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Width used to put a boolean on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolWidth {
    Uint8,
    Uint32,
}

impl BoolWidth {
    pub fn bytes(self) -> usize {
        match self {
            BoolWidth::Uint8 => 1,
            BoolWidth::Uint32 => 4,
        }
    }
}

/// Structured form of [`Annotations`] consulted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTags {
    /// Raw `size` value, validated when a boolean is processed.
    pub size: Option<String>,
    pub big_endian: bool,
    pub save: Option<String>,
    pub len: Option<String>,
    pub embed: bool,
}

impl FieldTags {
    pub fn parse(tag: &str) -> Self {
        Self::from(&Annotations::parse(tag))
    }

    /// Resolves the boolean width, failing when `size` is missing or holds
    /// anything but `uint8`/`uint32`.
    pub fn bool_width(&self) -> Result<BoolWidth, ErrorKind> {
        match self.size.as_deref() {
            Some("uint8") => Ok(BoolWidth::Uint8),
            Some("uint32") => Ok(BoolWidth::Uint32),
            Some(other) => Err(ErrorKind::InvalidTagValue {
                expected: "uint8 or uint32",
                value: other.to_string(),
            }),
            None => Err(ErrorKind::TagDefinitionRequired {
                tag: TAG_SIZE.to_string(),
            }),
        }
    }
}

impl From<&Annotations> for FieldTags {
    fn from(annotations: &Annotations) -> Self {
        Self {
            size: annotations.get(TAG_SIZE).map(str::to_string),
            big_endian: annotations.contains(TAG_BIGENDIAN),
            save: annotations.get(TAG_SAVE).map(str::to_string),
            len: annotations.get(TAG_LEN).map(str::to_string),
            embed: annotations.contains(TAG_EMBED),
        }
    }
}
