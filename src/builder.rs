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

use crate::config::{code_environment, CodeEnvironment};
use crate::sink::Sink;
use std::os::fd::RawFd;

/// The sink builder.
///
/// # Examples
///
/// ```
/// use dout_sink::{Builder, Config, Priority};
///
/// let sink = Builder::new().build();
/// sink.reopen_logs(&Config::new().log_to_stderr(true)).unwrap();
/// sink.write(Priority::new(0), "Example message");
/// ```
pub struct Builder {
    pub(crate) code_env: CodeEnvironment,
    pub(crate) stderr_fd: RawFd,
    pub(crate) pid_source: fn() -> u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            code_env: code_environment(),
            stderr_fd: libc::STDERR_FILENO,
            pid_source: std::process::id,
        }
    }
}

impl Builder {
    /// Creates a new instance of a sink builder.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Sets the execution mode of the sink.
    ///
    /// The default is the process-wide mode set with
    /// [set_code_environment](crate::set_code_environment).
    pub fn code_environment(mut self, env: CodeEnvironment) -> Self {
        self.code_env = env;
        self
    }

    /// Sets the descriptor used as standard error.
    ///
    /// # Arguments
    ///
    /// * `fd`: the descriptor; defaults to `STDERR_FILENO`.
    ///
    /// returns: Builder
    pub fn stderr_fd(mut self, fd: RawFd) -> Self {
        self.stderr_fd = fd;
        self
    }

    /// Sets the function used to query the process id; defaults to [std::process::id].
    pub fn pid_source(mut self, f: fn() -> u32) -> Self {
        self.pid_source = f;
        self
    }

    /// Creates the sink and registers it on the emergency path.
    ///
    /// The sink starts with every destination disabled; call
    /// [reopen_logs](Sink::reopen_logs) to apply a configuration.
    pub fn build(self) -> Sink {
        Sink::new(self)
    }
}
