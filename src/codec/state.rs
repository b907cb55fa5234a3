//! The state machine shared by every reader and writer.
//!
//! Readers move `Initial -> Type -> Name -> Value -> Type ... -> EndOfDocument -> Done`;
//! writers move `Initial -> Name -> Value -> Name ... -> Done`. Nested documents and arrays
//! push a [`Frame`]; popping a frame of the other kind is a stream error.

use crate::errors::DbError;
use crate::value::ElementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initial,
    /// Reader: the next element type (or the end marker) is expected.
    Type,
    /// Reader: a name follows. Writer: a name or the end of the document is expected.
    Name,
    Value,
    EndOfDocument,
    EndOfArray,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Document,
    Array,
}

#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub kind: FrameKind,
    /// Exclusive end offset for length-prefixed input, or the length placeholder offset
    /// for the binary writer. Unused by the textual codec.
    pub offset: usize,
    pub index: usize,
}

#[derive(Debug)]
pub(crate) struct Machine {
    pub state: State,
    pub current_type: Option<ElementType>,
    frames: Vec<Frame>,
    max_depth: usize,
}

pub(crate) fn malformed(msg: impl Into<String>) -> DbError {
    DbError::MalformedStream(msg.into())
}

impl Machine {
    pub fn new(max_depth: usize) -> Self {
        Self { state: State::Initial, current_type: None, frames: Vec::new(), max_depth }
    }

    pub fn check(&self, op: &str, allowed: &[State]) -> Result<(), DbError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(malformed(format!("{op} cannot be called when the state is {:?}", self.state)))
        }
    }

    /// A typed read is legal only in `Value` state and only for the announced type.
    pub fn check_value(&self, op: &str, expected: ElementType) -> Result<(), DbError> {
        self.check(op, &[State::Value])?;
        match self.current_type {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(malformed(format!("{op} expected {expected} but the element type is {t}"))),
            None => Err(malformed(format!("{op} called before the element type was read"))),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn top_kind(&self) -> Option<FrameKind> {
        self.frames.last().map(|f| f.kind)
    }

    pub fn push(&mut self, kind: FrameKind, offset: usize) -> Result<(), DbError> {
        if self.frames.len() >= self.max_depth {
            return Err(malformed(format!("nesting exceeds the maximum depth of {}", self.max_depth)));
        }
        self.frames.push(Frame { kind, offset, index: 0 });
        Ok(())
    }

    pub fn pop(&mut self, op: &str, kind: FrameKind) -> Result<Frame, DbError> {
        match self.top_kind() {
            Some(k) if k == kind => self.frames.pop().ok_or_else(|| malformed("empty frame stack")),
            Some(k) => Err(malformed(format!("{op} cannot close a {k:?} frame"))),
            None => Err(malformed(format!("{op} called with no open frame"))),
        }
    }

    /// Reader transition after a complete value.
    pub fn reader_value_done(&mut self) {
        self.current_type = None;
        self.state = if self.frames.is_empty() { State::Done } else { State::Type };
    }

    /// Writer transition after a complete value.
    pub fn writer_value_done(&mut self) {
        self.state = match self.top_kind() {
            None => State::Done,
            Some(FrameKind::Document) => State::Name,
            Some(FrameKind::Array) => State::Value,
        };
        if let Some(frame) = self.top_mut() {
            frame.index += 1;
        }
    }
}
