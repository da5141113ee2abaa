//! Traits connecting Rust types to the wire format.
//!
//! - [`Wire`] is implemented for every encodable kind: unsigned integers,
//!   `bool`, `String`, fixed arrays, `Vec`, `Option`, `Box` and declared
//!   messages.
//! - [`Field`] is the object-safe view of a `Wire` value used when a message
//!   is walked field by field.
//! - [`Record`] gives index-based access to a message's declared fields.
//! - [`Message`] ties a struct to its field declarations; it is normally
//!   implemented through [`bnet_message!`](crate::bnet_message).

use crate::decode::Decoder;
use crate::descriptor::{self, EmbeddedType, FieldDecl, Kind, TypeDescriptor, Width};
use crate::encode::Encoder;
use crate::error::{ErrorKind, Result};
use std::sync::Arc;

/// The value a field publishes under a `save-` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedValue {
    Uint(u64),
    Str(String),
    /// A kind that cannot serve as a sequence length.
    Other(&'static str),
}

/// How a field relates to anonymous embedding.
pub enum Embedded<'a> {
    /// The field's type is not a message.
    NotEmbeddable,
    /// The field is an optional message that is currently absent.
    Absent,
    Present(&'a dyn Record),
}

/// A type with a wire representation.
pub trait Wire: 'static {
    const KIND: Kind;

    fn encode(&self, enc: &mut Encoder) -> Result<()>;

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()>;

    fn saved_value(&self) -> SavedValue {
        SavedValue::Other(std::any::type_name::<Self>())
    }

    /// Writes a dynamic sequence of this type. Elements are concatenated
    /// with no count; the count travels in a sibling field.
    fn encode_seq(items: &[Self], enc: &mut Encoder) -> Result<()>
    where
        Self: Sized,
    {
        for item in items {
            item.encode(enc)?;
        }
        Ok(())
    }

    /// Reads a dynamic sequence whose element count comes from the field's
    /// `len-` binding.
    fn decode_seq(items: &mut Vec<Self>, dec: &mut Decoder<'_>) -> Result<()>
    where
        Self: Sized + Default,
    {
        let count = dec.bound_len()?;
        items.clear();
        // The count is untrusted; every element consumes input.
        items.reserve(count.min(dec.remaining()));
        for _ in 0..count {
            let mut item = Self::default();
            item.decode(dec)?;
            items.push(item);
        }
        Ok(())
    }

    /// The message type whose fields are promoted when a field of this type
    /// is annotated `embed`.
    fn embedded_type() -> Option<EmbeddedType> {
        None
    }

    fn embedded(&self) -> Embedded<'_> {
        Embedded::NotEmbeddable
    }

    /// Mutable access to an embedded message, allocating it when optional.
    fn embedded_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }
}

/// Object-safe view of a [`Wire`] value.
pub trait Field {
    fn encode_dyn(&self, enc: &mut Encoder) -> Result<()>;
    fn decode_dyn(&mut self, dec: &mut Decoder<'_>) -> Result<()>;
    fn saved_dyn(&self) -> SavedValue;
    fn embedded_dyn(&self) -> Embedded<'_>;
    fn embedded_mut_dyn(&mut self) -> Option<&mut dyn Record>;
}

impl<T: Wire> Field for T {
    fn encode_dyn(&self, enc: &mut Encoder) -> Result<()> {
        self.encode(enc)
    }

    fn decode_dyn(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        self.decode(dec)
    }

    fn saved_dyn(&self) -> SavedValue {
        self.saved_value()
    }

    fn embedded_dyn(&self) -> Embedded<'_> {
        self.embedded()
    }

    fn embedded_mut_dyn(&mut self) -> Option<&mut dyn Record> {
        self.embedded_mut()
    }
}

/// Index-based access to a message's declared fields.
pub trait Record {
    fn record_name(&self) -> &'static str;
    fn field_at(&self, index: usize) -> Option<&dyn Field>;
    fn field_at_mut(&mut self, index: usize) -> Option<&mut dyn Field>;
}

/// A struct encoded field by field in declaration order.
pub trait Message: Wire + Record + Default {
    const NAME: &'static str;

    /// The struct's own fields, in declaration order, before promotion.
    fn declared_fields() -> Vec<FieldDecl>;

    /// The cached flattened layout of this message.
    fn descriptor() -> Arc<TypeDescriptor> {
        descriptor::descriptor_of::<Self>()
    }
}

/// Follows a storage path through embedded messages to a field.
pub(crate) fn field_ref<'a>(
    root: &'a dyn Record,
    path: &[usize],
) -> std::result::Result<&'a dyn Field, ErrorKind> {
    let (&last, parents) = path.split_last().ok_or(ErrorKind::UnsupportedType {
        type_name: root.record_name(),
    })?;

    let mut record = root;
    for &index in parents {
        let field = record.field_at(index).ok_or(ErrorKind::UnsupportedType {
            type_name: record.record_name(),
        })?;
        record = match field.embedded_dyn() {
            Embedded::Present(inner) => inner,
            Embedded::Absent => return Err(ErrorKind::NilReference),
            Embedded::NotEmbeddable => {
                return Err(ErrorKind::UnsupportedType {
                    type_name: record.record_name(),
                })
            }
        };
    }

    record.field_at(last).ok_or(ErrorKind::UnsupportedType {
        type_name: record.record_name(),
    })
}

/// Mutable counterpart of [`field_ref`]; absent optional messages along the
/// path are allocated.
pub(crate) fn field_mut<'a>(
    root: &'a mut dyn Record,
    path: &[usize],
) -> std::result::Result<&'a mut dyn Field, ErrorKind> {
    let (&last, parents) = path.split_last().ok_or(ErrorKind::UnsupportedType {
        type_name: root.record_name(),
    })?;

    let mut record = root;
    for &index in parents {
        let type_name = record.record_name();
        record = record
            .field_at_mut(index)
            .and_then(|field| field.embedded_mut_dyn())
            .ok_or(ErrorKind::UnsupportedType { type_name })?;
    }

    let type_name = record.record_name();
    record
        .field_at_mut(last)
        .ok_or(ErrorKind::UnsupportedType { type_name })
}

macro_rules! impl_uint {
    ($($ty:ty => $width:ident, $write:ident, $read:ident);* $(;)?) => {
        $(
            impl Wire for $ty {
                const KIND: Kind = Kind::Uint(Width::$width);

                fn encode(&self, enc: &mut Encoder) -> Result<()> {
                    enc.$write(*self);
                    Ok(())
                }

                fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
                    *self = dec.$read()?;
                    Ok(())
                }

                fn saved_value(&self) -> SavedValue {
                    SavedValue::Uint(u64::from(*self))
                }
            }
        )*
    };
}

impl_uint! {
    u8 => U8, write_u8, read_u8;
    u16 => U16, write_u16, read_u16;
    u32 => U32, write_u32, read_u32;
    u64 => U64, write_u64, read_u64;
}

impl Wire for bool {
    const KIND: Kind = Kind::Bool;

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.write_bool(*self)
    }

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        *self = dec.read_bool()?;
        Ok(())
    }
}

impl Wire for String {
    const KIND: Kind = Kind::String;

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.write_string(self);
        Ok(())
    }

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        *self = dec.read_string()?;
        Ok(())
    }

    fn saved_value(&self) -> SavedValue {
        SavedValue::Str(self.clone())
    }

    // A string list is self-delimiting: an empty string ends it.
    fn encode_seq(items: &[Self], enc: &mut Encoder) -> Result<()> {
        for item in items {
            enc.write_string(item);
        }
        enc.write_string("");
        Ok(())
    }

    fn decode_seq(items: &mut Vec<Self>, dec: &mut Decoder<'_>) -> Result<()> {
        *items = dec.read_string_list()?;
        Ok(())
    }
}

impl<T: Wire, const N: usize> Wire for [T; N] {
    const KIND: Kind = Kind::Array(N);

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        for item in self {
            item.encode(enc)?;
        }
        Ok(())
    }

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        for item in self.iter_mut() {
            item.decode(dec)?;
        }
        Ok(())
    }
}

impl<T: Wire + Default> Wire for Vec<T> {
    const KIND: Kind = Kind::Sequence;

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        T::encode_seq(self, enc)
    }

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        T::decode_seq(self, dec)
    }
}

impl<T: Wire + Default> Wire for Option<T> {
    const KIND: Kind = Kind::Optional;

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Some(value) => value.encode(enc),
            None => Ok(()),
        }
    }

    // Absence has no wire form: an optional is only reconstructed as absent
    // when the input is already exhausted.
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        if dec.remaining() == 0 {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).decode(dec)
    }

    fn saved_value(&self) -> SavedValue {
        match self {
            Some(value) => value.saved_value(),
            None => SavedValue::Other(std::any::type_name::<Self>()),
        }
    }

    fn embedded_type() -> Option<EmbeddedType> {
        T::embedded_type()
    }

    fn embedded(&self) -> Embedded<'_> {
        match self {
            Some(value) => value.embedded(),
            None if T::embedded_type().is_some() => Embedded::Absent,
            None => Embedded::NotEmbeddable,
        }
    }

    fn embedded_mut(&mut self) -> Option<&mut dyn Record> {
        T::embedded_type()?;
        self.get_or_insert_with(T::default).embedded_mut()
    }
}

impl<T: Wire> Wire for Box<T> {
    const KIND: Kind = T::KIND;

    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        (**self).encode(enc)
    }

    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<()> {
        (**self).decode(dec)
    }

    fn saved_value(&self) -> SavedValue {
        (**self).saved_value()
    }

    fn embedded_type() -> Option<EmbeddedType> {
        T::embedded_type()
    }

    fn embedded(&self) -> Embedded<'_> {
        (**self).embedded()
    }

    fn embedded_mut(&mut self) -> Option<&mut dyn Record> {
        (**self).embedded_mut()
    }
}
