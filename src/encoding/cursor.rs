//! Bounds-checked character cursor over an encoding string.
//!
//! Encoding strings are pure ASCII, so the cursor operates on bytes. All
//! access is validated up front; running off the end yields
//! [`crate::Error::OutOfBounds`] instead of panicking on malformed metadata.

use crate::Result;

/// A cursor over the bytes of a type-encoding string.
///
/// Maintains a position that only the owner advances. Reads never move the
/// position implicitly except for [`Cursor::read`], mirroring how the decoder
/// consumes one dispatch character and then decides how much more to take.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor positioned at the start of `encoding`.
    #[must_use]
    pub fn new(encoding: &'a str) -> Cursor<'a> {
        Cursor {
            data: encoding.as_bytes(),
            position: 0,
        }
    }

    /// Total length of the underlying encoding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the underlying encoding is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current position within the encoding.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// `true` while at least one unread byte remains.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `position` is past the end.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }
        self.position = position;
        Ok(())
    }

    /// Advance the cursor by one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if already at the end.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Advance the cursor by `count` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn advance_by(&mut self, count: usize) -> Result<()> {
        if self.position + count > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }
        self.position += count;
        Ok(())
    }

    /// Look at the current byte without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no byte remains.
    pub fn peek(&self) -> Result<u8> {
        self.peek_at(0)
    }

    /// Look at the byte `offset` positions ahead without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the offset is past the end.
    pub fn peek_at(&self, offset: usize) -> Result<u8> {
        self.data
            .get(self.position + offset)
            .copied()
            .ok_or(crate::Error::OutOfBounds)
    }

    /// Read the current byte and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no byte remains.
    pub fn read(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Ok(byte)
    }

    /// Skip over any ASCII digits at the current position, returning how many
    /// were skipped. Runtime offsets between signature tokens are encoded this
    /// way and carry no type information.
    pub fn skip_digits(&mut self) -> usize {
        let start = self.position;
        while self
            .data
            .get(self.position)
            .is_some_and(u8::is_ascii_digit)
        {
            self.position += 1;
        }
        self.position - start
    }

    /// Read ASCII digits at the current position as a decimal number.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no digit is present.
    pub fn read_number(&mut self) -> Result<usize> {
        let start = self.position;
        if self.skip_digits() == 0 {
            return Err(crate::Error::OutOfBounds);
        }
        // Digits are ASCII, so the slice is valid UTF-8 and fits usize for any
        // realistic encoding length.
        let text = std::str::from_utf8(&self.data[start..self.position])
            .expect("digits are ASCII");
        text.parse()
            .map_err(|_| malformed_error!("numeric overflow in encoding at index {}", start))
    }

    /// Borrow the substring between two absolute positions.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an invalid range.
    pub fn slice(&self, start: usize, end: usize) -> Result<&'a str> {
        if start > end || end > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }
        std::str::from_utf8(&self.data[start..end]).map_err(|_| {
            malformed_error!("encoding is not valid ASCII between {} and {}", start, end)
        })
    }

    /// Find the next occurrence of `byte` at or after the current position.
    #[must_use]
    pub fn find(&self, byte: u8) -> Option<usize> {
        self.data[self.position..]
            .iter()
            .position(|candidate| *candidate == byte)
            .map(|offset| self.position + offset)
    }
}
