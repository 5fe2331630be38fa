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

//! The logging sink of a long-running storage daemon.
//!
//! A [Sink] buffers one record at a time and, on flush, routes the timestamped line to an output
//! file, syslog and/or stderr depending on the current [Config] and the record's [Priority].
//! Configuration can change at any time: the sink reopens its file, maintains an optional
//! per-instance symlink with a numbered rotation chain and recomputes its routing flags under its
//! lock.
//!
//! Independently from the normal path, [dout_emergency] pushes a raw line to stderr and to every
//! live sink without taking any sink lock; it may be called from a signal handler or before any
//! sink is configured.
//!
//! # Examples
//!
//! ```no_run
//! use dout_sink::{derr, dout, Builder, Config};
//!
//! let sink = dout_sink::install(Builder::new().build()).ok().unwrap();
//! let conf = Config::new().log_file("/var/log/storage/osd.log").log_to_stderr(true);
//! sink.reopen_logs(&conf).unwrap();
//! dout!(1, "booting {}", "osd.0");
//! derr!("failed to mount: {}", "EIO");
//! ```

mod buffer;
mod builder;
mod config;
mod emergency;
mod error;
mod priority;
mod rotate;
mod sink;
mod util;

pub mod bridge;
pub mod handler;

use once_cell::sync::OnceCell;

pub use buffer::{OutputBuffer, HEADER_SZ, OBUF_SZ, TIME_FMT_SZ};
pub use builder::Builder;
pub use config::{
    code_environment, set_code_environment, CodeEnvironment, Config, ConfigObserver, TRACKED_KEYS,
};
pub use emergency::{dout_emergency, dout_emergency_bytes};
pub use error::Error;
pub use handler::Flags;
pub use priority::{Priority, Severity};
pub use rotate::{create_symlink, rotate_files, FileIdentity};
pub use sink::{Record, Sink};

static DOUT: OnceCell<Sink> = OnceCell::new();

/// Installs the process-wide sink used by [dout!] and [derr!].
///
/// Returns the sink back if one is already installed.
pub fn install(sink: Sink) -> Result<&'static Sink, Sink> {
    DOUT.try_insert(sink).map_err(|(_, sink)| sink)
}

/// Returns the process-wide sink, if installed.
pub fn global() -> Option<&'static Sink> {
    DOUT.get()
}

/// Writes a record to the process-wide sink; does nothing when no sink is installed.
///
/// # Examples
///
/// ```
/// dout_sink::dout!(10, "{} objects scrubbed", 42);
/// ```
#[macro_export]
macro_rules! dout {
    ($prio: expr, $($arg: tt)*) => {
        if let Some(sink) = $crate::global() {
            sink.write_fmt($crate::Priority::from($prio), format_args!($($arg)*));
        }
    };
}

/// Writes an error record (priority `-1`) to the process-wide sink.
#[macro_export]
macro_rules! derr {
    ($($arg: tt)*) => {
        $crate::dout!(-1, $($arg)*)
    };
}
