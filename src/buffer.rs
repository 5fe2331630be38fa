// Copyright (c) 2024, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::priority::Priority;

/// Length of the timestamp written in front of every line (`YYYY-MM-DD HH:MM:SS.ffffff`).
pub const TIME_FMT_SZ: usize = 26;
// The timestamp plus the separating space.
pub const HEADER_SZ: usize = TIME_FMT_SZ + 1;
// Always left free at the end of the buffer so that a line terminator fits.
pub const TRAILER_SZ: usize = 2;
/// Total capacity of an output buffer.
pub const OBUF_SZ: usize = 8192;

/// A fixed capacity buffer holding exactly one record between two flushes.
///
/// The first [HEADER_SZ] bytes are reserved for the timestamp which is written in place when the
/// record is finished, so that the whole line can be handed to every destination as a single
/// slice.
pub struct OutputBuffer {
    buffer: Box<[u8]>,
    cursor: usize,
    prio: Option<Priority>,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    pub fn new() -> OutputBuffer {
        OutputBuffer {
            buffer: vec![0; OBUF_SZ].into_boxed_slice(),
            cursor: HEADER_SZ,
            prio: None,
        }
    }

    /// Resets the write cursor past the header and forgets the priority.
    pub fn clear(&mut self) {
        self.cursor = HEADER_SZ;
        self.prio = None;
    }

    /// Tags the record with the given priority.
    pub fn set_priority(&mut self, prio: Priority) {
        self.prio = Some(prio);
    }

    /// Returns the priority of the record; untagged records have the default priority 0.
    pub fn priority(&self) -> Priority {
        self.prio.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == HEADER_SZ
    }

    /// Returns the number of payload bytes that still fit.
    pub fn remaining(&self) -> usize {
        (OBUF_SZ - TRAILER_SZ).saturating_sub(self.cursor)
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SZ..self.cursor]
    }

    /// Appends as much of `buf` as fits and returns the number of bytes consumed.
    ///
    /// A return value lower than `buf.len()` means the buffer is full and must be flushed before
    /// the rest can be written.
    pub fn push(&mut self, buf: &[u8]) -> usize {
        let len = std::cmp::min(buf.len(), self.remaining());
        self.buffer[self.cursor..self.cursor + len].copy_from_slice(&buf[..len]);
        self.cursor += len;
        len
    }

    /// Writes the timestamp header and a terminating newline (unless the payload already ends
    /// with one) and returns the complete line.
    pub fn finish(&mut self, stamp: &[u8; TIME_FMT_SZ]) -> &[u8] {
        self.buffer[..TIME_FMT_SZ].copy_from_slice(stamp);
        self.buffer[TIME_FMT_SZ] = b' ';
        if self.buffer[self.cursor - 1] != b'\n' {
            self.buffer[self.cursor] = b'\n';
            self.cursor += 1;
        }
        &self.buffer[..self.cursor]
    }
}
