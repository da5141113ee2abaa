//! Decoder engine.
//!
//! Walks a destination value top-down, consuming bytes from the input and
//! populating storage. Sequence lengths are resolved through bindings: a
//! field annotated `save-<name>` publishes its decoded value, and a later
//! sequence annotated `len-<name>` reads it as its element count.

use crate::config::CodecConfig;
use crate::context::ContextTracker;
use crate::error::{EncodingError, ErrorKind, Result};
use crate::tags::{BoolWidth, FieldTags, TAG_LEN};
use crate::wire::{self, Message, SavedValue, Wire};
use std::collections::HashMap;
use std::sync::Arc;

/// A named binding registered while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Registered, but the producing field has not finished decoding.
    Pending,
    Resolved(SavedValue),
}

/// Decodes values from a byte buffer.
///
/// A decoder can be reused for several consecutive values of one buffer;
/// each [`decode`](Decoder::decode) call starts with an empty binding table
/// and continues from the current offset.
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
    config: CodecConfig,
    tags: Arc<FieldTags>,
    bindings: HashMap<String, Binding>,
    context: ContextTracker,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, CodecConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: CodecConfig) -> Self {
        Self {
            data,
            offset: 0,
            config,
            tags: Arc::default(),
            bindings: HashMap::new(),
            context: ContextTracker::default(),
        }
    }

    /// Decodes the next value from the buffer into `target`.
    ///
    /// On failure `target` may be partially populated and should be
    /// discarded.
    pub fn decode<T: Wire>(&mut self, target: &mut T) -> Result<()> {
        self.bindings.clear();
        self.context.reset();
        self.tags = Arc::default();

        let start = self.offset;
        let result = target.decode(self);
        match &result {
            Ok(()) => tracing::trace!(
                "Decoded {} bytes ({} remaining)",
                self.offset - start,
                self.remaining()
            ),
            Err(e) => tracing::debug!("Decode failed [{}]: {}", e.code(), e),
        }
        result
    }

    /// Decodes a message field by field in descriptor order.
    pub fn decode_struct<M: Message>(&mut self, value: &mut M) -> Result<()> {
        if self.context.depth() >= self.config.max_depth {
            return Err(self.fail(ErrorKind::DepthLimitExceeded {
                max: self.config.max_depth,
            }));
        }

        let descriptor = M::descriptor();
        let outer_tags = Arc::clone(&self.tags);
        self.context.enter(M::NAME);

        for field in &descriptor.fields {
            self.context.field(field.name);
            self.tags = Arc::clone(&field.tags);

            // Registered before the field is decoded; readers see the value
            // once the producer has completed.
            if let Some(name) = &field.tags.save {
                self.bindings.insert(name.clone(), Binding::Pending);
            }

            let target = wire::field_mut(&mut *value, &field.path).map_err(|kind| self.fail(kind))?;
            target.decode_dyn(self)?;

            if let Some(name) = &field.tags.save {
                self.bindings
                    .insert(name.clone(), Binding::Resolved(target.saved_dyn()));
            }
        }

        self.context.leave();
        self.tags = outer_tags;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(if self.tags.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(if self.tags.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_array::<8>()?;
        Ok(if self.tags.big_endian {
            u64::from_be_bytes(bytes)
        } else {
            u64::from_le_bytes(bytes)
        })
    }

    /// Reads a boolean at the width given by the field's `size` annotation.
    /// Anything but `0` or `1` fails with the raw bytes that were read.
    pub fn read_bool(&mut self) -> Result<bool> {
        let width = self.tags.bool_width().map_err(|kind| self.fail(kind))?;
        let raw = match width {
            BoolWidth::Uint8 => u32::from(self.read_u8()?),
            BoolWidth::Uint32 => self.read_u32()?,
        };

        match raw {
            0 => Ok(false),
            1 => Ok(true),
            _ => {
                self.unread(width.bytes())?;
                let start = self.offset;
                let value = self.read_bytes(width.bytes())?.to_vec();
                Err(self.fail_at(ErrorKind::InvalidValue { value }, start))
            }
        }
    }

    /// Reads a `0x00`-terminated string.
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.data[self.offset..];
        let end = rest.iter().position(|&b| b == 0x00).ok_or_else(|| {
            self.fail(ErrorKind::IndexOutOfRange {
                needed: rest.len() + 1,
                offset: self.offset,
            })
        })?;

        let raw = &rest[..end];
        let value = std::str::from_utf8(raw)
            .map_err(|_| self.fail(ErrorKind::InvalidValue { value: raw.to_vec() }))?
            .to_string();

        self.offset += end + 1;
        Ok(value)
    }

    /// Reads strings until an empty one; the terminator is not returned.
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        loop {
            let item = self.read_string()?;
            if item.is_empty() {
                return Ok(items);
            }
            if items.len() >= self.config.max_sequence_len {
                return Err(self.fail(ErrorKind::SequenceTooLong {
                    len: items.len() + 1,
                    max: self.config.max_sequence_len,
                }));
            }
            items.push(item);
        }
    }

    /// Resolves the element count of the current sequence from its `len-`
    /// binding.
    pub fn bound_len(&self) -> Result<usize> {
        let name = self.tags.len.as_deref().ok_or_else(|| {
            self.fail(ErrorKind::TagDefinitionRequired {
                tag: TAG_LEN.to_string(),
            })
        })?;

        let invalid = |value: String| {
            self.fail(ErrorKind::InvalidSavedValue {
                name: name.to_string(),
                expected: "unsigned integer",
                value,
            })
        };

        let count = match self.bindings.get(name) {
            None => {
                return Err(self.fail(ErrorKind::UndefinedSavedValue {
                    name: name.to_string(),
                }))
            }
            Some(Binding::Pending) => return Err(invalid("<still decoding>".to_string())),
            Some(Binding::Resolved(SavedValue::Uint(n))) => {
                usize::try_from(*n).map_err(|_| invalid(n.to_string()))?
            }
            Some(Binding::Resolved(SavedValue::Str(s))) => {
                s.parse::<usize>().map_err(|_| invalid(s.clone()))?
            }
            Some(Binding::Resolved(SavedValue::Other(type_name))) => {
                return Err(invalid(type_name.to_string()))
            }
        };

        if count > self.config.max_sequence_len {
            return Err(self.fail(ErrorKind::SequenceTooLong {
                len: count,
                max: self.config.max_sequence_len,
            }));
        }
        Ok(count)
    }

    /// Current read offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = match self.offset.checked_add(n) {
            Some(end) if end <= self.data.len() => end,
            _ => {
                return Err(self.fail(ErrorKind::IndexOutOfRange {
                    needed: n,
                    offset: self.offset,
                }))
            }
        };

        let data: &'a [u8] = self.data;
        let bytes = &data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Moves the cursor back over bytes that were just read.
    fn unread(&mut self, n: usize) -> Result<()> {
        if n > self.offset {
            return Err(self.fail(ErrorKind::IndexOutOfRange {
                needed: n,
                offset: self.offset,
            }));
        }
        self.offset -= n;
        Ok(())
    }

    fn fail(&self, kind: ErrorKind) -> EncodingError {
        self.fail_at(kind, self.offset)
    }

    fn fail_at(&self, kind: ErrorKind, offset: usize) -> EncodingError {
        self.context.error(kind, offset)
    }
}
