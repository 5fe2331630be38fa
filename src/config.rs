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

//! Configuration snapshot consumed by the sink.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

/// Configuration keys whose change requires the sink to be reconfigured.
pub const TRACKED_KEYS: &[&str] = &[
    "log_file",
    "log_sym_dir",
    "log_sym_history",
    "log_to_stderr",
    "err_to_stderr",
    "log_to_syslog",
    "log_per_instance",
];

/// The execution mode of the process.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CodeEnvironment {
    /// A command line utility or library user.
    #[default]
    Utility = 0,

    /// A long-running daemon; enables per-instance log files and syslog (re)opening.
    Daemon = 1,
}

static CODE_ENV: AtomicU8 = AtomicU8::new(CodeEnvironment::Utility as u8);

/// Sets the process-wide execution mode used by sinks built afterwards.
pub fn set_code_environment(env: CodeEnvironment) {
    CODE_ENV.store(env as u8, Ordering::Release);
}

/// Returns the process-wide execution mode.
pub fn code_environment() -> CodeEnvironment {
    match CODE_ENV.load(Ordering::Acquire) {
        1 => CodeEnvironment::Daemon,
        _ => CodeEnvironment::Utility,
    }
}

/// A read-only view of the logging related configuration.
///
/// The sink never mutates a snapshot; a new snapshot is passed on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the output file, empty to disable file output.
    pub log_file: PathBuf,

    /// Directory of the per-instance symlink; empty means the directory of the output file.
    pub log_sym_dir: PathBuf,

    /// Number of rotated instance symlinks to keep.
    pub log_sym_history: u32,

    /// Route non-error records to stderr.
    pub log_to_stderr: bool,

    /// Route error records to stderr.
    pub err_to_stderr: bool,

    /// Route every record to syslog.
    pub log_to_syslog: bool,

    /// Suffix the output file with the process id (daemons only).
    pub log_per_instance: bool,

    /// The process name (ex: `osd.0`), used as syslog ident and symlink name.
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::new(),
            log_sym_dir: PathBuf::new(),
            log_sym_history: 10,
            log_to_stderr: false,
            err_to_stderr: true,
            log_to_syslog: false,
            log_per_instance: false,
            name: "client.admin".into(),
        }
    }
}

impl Config {
    /// Creates a new configuration snapshot with default values.
    pub fn new() -> Config {
        Config::default()
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn log_sym_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_sym_dir = path.into();
        self
    }

    pub fn log_sym_history(mut self, history: u32) -> Self {
        self.log_sym_history = history;
        self
    }

    pub fn log_to_stderr(mut self, flag: bool) -> Self {
        self.log_to_stderr = flag;
        self
    }

    pub fn err_to_stderr(mut self, flag: bool) -> Self {
        self.err_to_stderr = flag;
        self
    }

    pub fn log_to_syslog(mut self, flag: bool) -> Self {
        self.log_to_syslog = flag;
        self
    }

    pub fn log_per_instance(mut self, flag: bool) -> Self {
        self.log_per_instance = flag;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Returns the set of all tracked keys, as used by a full reconfiguration.
pub fn all_tracked_keys() -> HashSet<String> {
    TRACKED_KEYS.iter().map(|v| String::from(*v)).collect()
}

/// Something that must be told when configuration keys change.
pub trait ConfigObserver {
    /// The keys this observer must be notified about.
    fn tracked_keys(&self) -> &'static [&'static str];

    /// Called with the new snapshot and the names of the keys that changed.
    fn handle_conf_change(&self, conf: &Config, changed: &HashSet<String>);
}
