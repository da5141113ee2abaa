//! Encoder engine.
//!
//! Walks a value top-down and appends its wire form to an output buffer.
//! Integers are little-endian unless the active field is annotated
//! `bigendian`; strings are written raw with a single `0x00` terminator.
//! A string containing `0x00` is written as-is and will not survive a
//! round trip.

use crate::context::ContextTracker;
use crate::error::{EncodingError, ErrorKind, Result};
use crate::tags::{BoolWidth, FieldTags};
use crate::wire::{self, Message, Wire};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Encodes values into the wire format.
pub struct Encoder {
    buf: BytesMut,
    tags: Arc<FieldTags>,
    context: ContextTracker,
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            tags: Arc::default(),
            context: ContextTracker::default(),
        }
    }

    /// Appends the encoding of `value` to the buffer.
    ///
    /// On failure the buffer contents are unspecified.
    pub fn encode<T: Wire>(&mut self, value: &T) -> Result<()> {
        self.context.reset();
        self.tags = Arc::default();

        let start = self.buf.len();
        let result = value.encode(self);
        match &result {
            Ok(()) => tracing::trace!(
                "Encoded {} bytes ({} buffered)",
                self.buf.len() - start,
                self.buf.len()
            ),
            Err(e) => tracing::debug!("Encode failed [{}]: {}", e.code(), e),
        }
        result
    }

    /// Encodes a message field by field in descriptor order.
    pub fn encode_struct<M: Message>(&mut self, value: &M) -> Result<()> {
        let descriptor = M::descriptor();
        let outer_tags = Arc::clone(&self.tags);
        self.context.enter(M::NAME);

        for field in &descriptor.fields {
            self.context.field(field.name);
            self.tags = Arc::clone(&field.tags);

            let target = wire::field_ref(value, &field.path).map_err(|kind| self.fail(kind))?;
            target.encode_dyn(self)?;
        }

        self.context.leave();
        self.tags = outer_tags;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        if self.tags.big_endian {
            self.buf.put_u16(value);
        } else {
            self.buf.put_u16_le(value);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        if self.tags.big_endian {
            self.buf.put_u32(value);
        } else {
            self.buf.put_u32_le(value);
        }
    }

    pub fn write_u64(&mut self, value: u64) {
        if self.tags.big_endian {
            self.buf.put_u64(value);
        } else {
            self.buf.put_u64_le(value);
        }
    }

    /// Writes a boolean at the width given by the field's `size` annotation.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        let width = self.tags.bool_width().map_err(|kind| self.fail(kind))?;
        match width {
            BoolWidth::Uint8 => self.write_u8(u8::from(value)),
            BoolWidth::Uint32 => self.write_u32(u32::from(value)),
        }
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) {
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0x00);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn fail(&self, kind: ErrorKind) -> EncodingError {
        self.context.error(kind, self.buf.len())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
