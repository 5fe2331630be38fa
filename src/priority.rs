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

//! Record priorities and their mapping onto syslog severities.

use std::fmt::{Display, Formatter};

/// The priority of a log record.
///
/// Priorities live on an open signed scale where lower numbers are more urgent. The value `-1` is
/// reserved for errors: it is routed to stderr under the error flag instead of the log flag.
#[derive(Clone, PartialEq, Copy, Ord, PartialOrd, Eq, Debug, Hash, Default)]
pub struct Priority(i32);

impl Priority {
    /// The conventional error priority.
    pub const ERROR: Priority = Priority(-1);

    /// Creates a new priority from its raw value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value of this priority.
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Returns true if this is the error priority (`-1`).
    pub const fn is_error(&self) -> bool {
        self.0 == -1
    }

    /// Returns the syslog severity this priority is emitted at.
    ///
    /// Thresholds are inclusive: a priority equal to a threshold maps to the less severe side
    /// of it, so 3 is critical but 4 is error.
    pub const fn severity(&self) -> Severity {
        match self.0 {
            i32::MIN..=3 => Severity::Critical,
            4..=5 => Severity::Error,
            6..=15 => Severity::Warning,
            16..=30 => Severity::Notice,
            31..=40 => Severity::Info,
            _ => Severity::Debug,
        }
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The syslog severities a record can be emitted at.
#[repr(u8)]
#[derive(Clone, PartialEq, Copy, Ord, PartialOrd, Eq, Debug, Hash)]
pub enum Severity {
    /// Critical conditions (LOG_CRIT).
    Critical = 0,

    /// Error conditions (LOG_ERR).
    Error = 1,

    /// Warning conditions (LOG_WARNING).
    Warning = 2,

    /// Normal but significant conditions (LOG_NOTICE).
    Notice = 3,

    /// Informational messages (LOG_INFO).
    Info = 4,

    /// Debug-level messages (LOG_DEBUG).
    Debug = 5,
}

static SEVERITY_NAMES: [&str; 6] = ["CRIT", "ERR", "WARNING", "NOTICE", "INFO", "DEBUG"];

impl Severity {
    /// Returns the string representation of the `Severity`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        SEVERITY_NAMES[*self as usize]
    }

    /// Returns the matching `LOG_*` constant from `<syslog.h>`.
    pub fn syslog_level(&self) -> libc::c_int {
        match self {
            Severity::Critical => libc::LOG_CRIT,
            Severity::Error => libc::LOG_ERR,
            Severity::Warning => libc::LOG_WARNING,
            Severity::Notice => libc::LOG_NOTICE,
            Severity::Info => libc::LOG_INFO,
            Severity::Debug => libc::LOG_DEBUG,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
