//! # bnet-encoding
//!
//! Binary codec for the legacy Battle.net ("bnet") game protocols.
//!
//! This crate provides:
//! - A declaration macro mapping message structs to their wire layout
//! - Per-field annotations (endianness, boolean width, length bindings,
//!   anonymous embedding)
//! - A process-wide cache of flattened type descriptors
//! - Encoder and decoder engines with structured, context-rich errors
//! - Decode limits for untrusted input
//!
//! Framing and message-id dispatch belong to the transport and are not
//! handled here.

pub mod config;
mod context;
pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod error;
mod macros;
pub mod tags;
pub mod wire;

pub use config::{CodecConfig, ConfigError};
pub use decode::Decoder;
pub use descriptor::{
    EmbeddedType, FieldDecl, FieldDescriptor, Kind, TypeDescriptor, Width,
};
pub use encode::Encoder;
pub use error::{EncodingError, ErrorContext, ErrorKind, Result};
pub use tags::{Annotations, BoolWidth, FieldTags};
pub use wire::{Embedded, Field, Message, Record, SavedValue, Wire};

use bytes::Bytes;
use std::any::Any;

/// Encodes a value into a new buffer.
pub fn marshal<T: Wire>(value: &T) -> Result<Bytes> {
    let mut enc = Encoder::new();
    enc.encode(value)?;
    Ok(enc.into_bytes())
}

/// Decodes `data` into `target` with the default limits.
///
/// Trailing bytes after the value are ignored.
pub fn unmarshal<T: Wire>(data: &[u8], target: &mut T) -> Result<()> {
    Decoder::new(data).decode(target)
}

/// Decodes `data` into a type-erased destination.
///
/// The slot must hold a `T` or a populated `Option<T>`.
pub fn unmarshal_any<T: Wire>(data: &[u8], target: &mut dyn Any) -> Result<()> {
    if let Some(value) = target.downcast_mut::<T>() {
        return unmarshal(data, value);
    }

    match target.downcast_mut::<Option<T>>() {
        Some(Some(value)) => unmarshal(data, value),
        Some(None) => Err(ErrorKind::InvalidTarget {
            reason: "nil destination".to_string(),
        }
        .into()),
        None => Err(ErrorKind::InvalidTarget {
            reason: format!("destination is not a {}", std::any::type_name::<T>()),
        }
        .into()),
    }
}
