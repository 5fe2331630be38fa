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

//! The destinations a finished line is routed to.

mod file;
mod stderr;
pub mod syslog;

use crate::priority::Priority;
use std::fmt::{Debug, Formatter};
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU8, Ordering};

/// The set of enabled destinations.
#[derive(Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct Flags(u8);

impl Flags {
    /// No destination.
    pub const NONE: Flags = Flags(0);

    /// The output file.
    pub const OFILE: Flags = Flags(0x1);

    /// Non-error records to stderr.
    pub const STDERR_LOG: Flags = Flags(0x2);

    /// Error records to stderr.
    pub const STDERR_ERR: Flags = Flags(0x4);

    /// Both stderr flags.
    pub const STDERR: Flags = Flags(0x2 | 0x4);

    /// Syslog.
    pub const SYSLOG: Flags = Flags(0x8);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns true if every flag of `other` is set.
    pub const fn contains(&self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any flag of `other` is set.
    pub const fn intersects(&self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl Debug for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Flags({:#x})", self.0)
    }
}

/// Routing flags shared between the locked path and the emergency path.
pub struct AtomicFlags(AtomicU8);

impl AtomicFlags {
    pub const fn new(initial: Flags) -> Self {
        Self(AtomicU8::new(initial.0))
    }

    pub fn get(&self) -> Flags {
        Flags(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, flags: Flags) {
        self.0.store(flags.0, Ordering::Release);
    }

    /// Clears the given flags, leaving the others untouched.
    pub fn remove(&self, flags: Flags) {
        self.0.fetch_and(!flags.0, Ordering::AcqRel);
    }
}

/// A destination of finished lines.
pub trait Handler {
    /// The routing flags owned by this handler; they are cleared when a write fails.
    fn flags(&self) -> Flags;

    /// Returns true if a record of the given priority goes to this handler.
    fn accepts(&self, flags: Flags, _prio: Priority) -> bool {
        flags.intersects(self.flags())
    }

    /// Writes one complete line, header included.
    fn write(&mut self, line: &[u8], prio: Priority) -> std::io::Result<()>;
}

/// Sends a line to every handler accepting it, disabling those whose write fails.
///
/// Each handler gets a single write attempt; a failed destination stays off until the next
/// reconfiguration.
pub fn dispatch(flags: &AtomicFlags, line: &[u8], prio: Priority, handlers: &mut [&mut dyn Handler]) {
    for handler in handlers.iter_mut() {
        if handler.accepts(flags.get(), prio) && handler.write(line, prio).is_err() {
            flags.remove(handler.flags());
        }
    }
}

pub use file::FileHandler;
pub use stderr::StdHandler;
pub use syslog::SyslogHandler;
