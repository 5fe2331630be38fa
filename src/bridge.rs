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

//! Routes records of the `log` facade into a [Sink].

use crate::priority::Priority;
use crate::sink::Sink;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt::Write;

/// Returns the sink priority used for a `log` level.
pub fn level_priority(level: Level) -> Priority {
    match level {
        Level::Error => Priority::ERROR,
        Level::Warn => Priority::new(10),
        Level::Info => Priority::new(35),
        Level::Debug => Priority::new(45),
        Level::Trace => Priority::new(60),
    }
}

/// A [Log] implementation writing every record to a sink as `<target>: <message>`.
pub struct LogBridge {
    sink: &'static Sink,
}

impl LogBridge {
    pub fn new(sink: &'static Sink) -> LogBridge {
        LogBridge { sink }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut rec = self.sink.record(level_priority(record.level()));
        let _ = write!(rec, "{}: {}", record.target(), record.args());
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Installs a [LogBridge] to the given sink as the global `log` logger.
pub fn init_log(sink: &'static Sink, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(sink)))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, Config};

    #[test]
    fn mapping() {
        assert!(level_priority(Level::Error).is_error());
        assert_eq!(level_priority(Level::Warn).severity(), crate::Severity::Warning);
        assert_eq!(level_priority(Level::Info).severity(), crate::Severity::Info);
        assert_eq!(level_priority(Level::Debug).severity(), crate::Severity::Debug);
        assert_eq!(level_priority(Level::Trace).severity(), crate::Severity::Debug);
    }

    #[test]
    fn bridge_writes_target_and_message() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("bridge.log");
        let sink: &'static Sink = Box::leak(Box::new(Builder::new().stderr_fd(i32::MAX).build()));
        sink.reopen_logs(&Config::new().log_file(&log)).unwrap();
        log::set_max_level(LevelFilter::Trace);
        let bridge = LogBridge::new(sink);
        bridge.log(
            &Record::builder()
                .args(format_args!("value {}", 42))
                .level(Level::Warn)
                .target("osd")
                .build(),
        );
        bridge.flush();
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.lines().any(|v| v.ends_with(" osd: value 42")));
        // Close the leaked sink's file before the directory goes away.
        sink.reopen_logs(&Config::new()).unwrap();
    }
}
