//! Traversal context used to enrich errors.
//!
//! Both engines push a frame when they descend into a message and record
//! the field currently being processed; a failure captures the whole stack.

use crate::error::{EncodingError, ErrorContext, ErrorKind};

#[derive(Debug, Clone)]
struct Frame {
    type_name: &'static str,
    field: Option<&'static str>,
}

/// Stack of enclosing message types and their active fields.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContextTracker {
    frames: Vec<Frame>,
}

impl ContextTracker {
    /// Enters a message of the given type.
    pub(crate) fn enter(&mut self, type_name: &'static str) {
        self.frames.push(Frame {
            type_name,
            field: None,
        });
    }

    /// Records the field of the innermost message being processed.
    pub(crate) fn field(&mut self, name: &'static str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.field = Some(name);
        }
    }

    /// Leaves the innermost message.
    pub(crate) fn leave(&mut self) {
        let popped = self.frames.pop();
        debug_assert!(popped.is_some(), "leaving a message that was never entered");
    }

    /// Number of messages currently entered.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn reset(&mut self) {
        self.frames.clear();
    }

    /// Captures the current position as an [`ErrorContext`].
    pub(crate) fn snapshot(&self, offset: usize) -> ErrorContext {
        let innermost = self.frames.last();
        ErrorContext {
            type_name: innermost.map(|f| f.type_name),
            field: innermost.and_then(|f| f.field),
            chain: self
                .frames
                .iter()
                .map(|f| match f.field {
                    Some(field) => format!("{}.{}", f.type_name, field),
                    None => f.type_name.to_string(),
                })
                .collect(),
            offset,
        }
    }

    pub(crate) fn error(&self, kind: ErrorKind, offset: usize) -> EncodingError {
        EncodingError::new(kind, self.snapshot(offset))
    }
}
