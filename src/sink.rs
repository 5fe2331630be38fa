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

use crate::buffer::OutputBuffer;
use crate::builder::Builder;
use crate::config::{all_tracked_keys, CodeEnvironment, Config, ConfigObserver, TRACKED_KEYS};
use crate::emergency::{dout_emergency, register, unregister, EmergencyTarget};
use crate::error::Error;
use crate::handler::{
    dispatch, syslog, FileHandler, Flags, Handler, StdHandler, SyslogHandler,
};
use crate::priority::Priority;
use crate::rotate::{
    calculate_opath, create_symlink, is_per_instance, open_output, rotate_files, symlink_dir,
    FileIdentity,
};
use crate::util::{fd_is_open, timestamp};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::{Arguments, Write};
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::sync::Arc;

struct Inner {
    buffer: OutputBuffer,
    file: Option<File>,
    identity: FileIdentity,
}

/// A buffered, priority-aware log sink.
///
/// Every entry point serializes through one recursive lock, so nested calls from the thread
/// already holding it (ex: a flush while a [Record] is open) do not deadlock. Only the emergency
/// path bypasses that lock.
pub struct Sink {
    inner: ReentrantMutex<RefCell<Inner>>,
    target: Arc<EmergencyTarget>,
    code_env: CodeEnvironment,
    stderr_fd: RawFd,
    pid_source: fn() -> u32,
}

impl Sink {
    pub(crate) fn new(builder: Builder) -> Sink {
        let target = Arc::new(EmergencyTarget::new());
        register(&target);
        Sink {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                buffer: OutputBuffer::new(),
                file: None,
                identity: FileIdentity::default(),
            })),
            target,
            code_env: builder.code_env,
            stderr_fd: builder.stderr_fd,
            pid_source: builder.pid_source,
        }
    }

    /// Starts a new record at the given priority.
    ///
    /// The returned guard holds the sink's lock until it is dropped; dropping it flushes the
    /// record.
    pub fn record(&self, prio: Priority) -> Record<'_> {
        let guard = self.inner.lock();
        {
            let mut inner = guard.borrow_mut();
            if !inner.buffer.is_empty() {
                self.flush_locked(&mut inner);
            }
            inner.buffer.set_priority(prio);
        }
        Record {
            sink: self,
            guard,
            prio,
        }
    }

    /// Writes a complete record.
    pub fn write(&self, prio: Priority, msg: &str) {
        self.record(prio).write_bytes(msg.as_bytes());
    }

    /// Writes a complete record from format arguments.
    pub fn write_fmt(&self, prio: Priority, args: Arguments) {
        let mut record = self.record(prio);
        let _ = record.write_fmt(args);
    }

    /// Flushes the pending record, if any.
    pub fn flush(&self) {
        let guard = self.inner.lock();
        self.flush_locked(&mut guard.borrow_mut());
    }

    fn flush_locked(&self, inner: &mut Inner) {
        if inner.buffer.is_empty() {
            inner.buffer.clear();
            return;
        }
        let prio = inner.buffer.priority();
        let ofd = inner.file.as_ref().map(|v| v.as_raw_fd()).unwrap_or(-1);
        let stamp = timestamp();
        let line = inner.buffer.finish(&stamp);
        let mut sys = SyslogHandler;
        let mut stderr = StdHandler::new(self.stderr_fd);
        let mut file = FileHandler::new(ofd);
        let mut handlers: [&mut dyn Handler; 3] = [&mut sys, &mut stderr, &mut file];
        dispatch(self.target.flags(), line, prio, &mut handlers);
        inner.buffer.clear();
    }

    fn close_output(&self, inner: &mut Inner) {
        self.target.set_ofd(-1);
        inner.file = None;
    }

    fn read_ofile_config(&self, inner: &mut Inner, conf: &Config) -> Result<bool, Error> {
        inner.identity.clear();
        let opath = calculate_opath(conf, self.code_env, (self.pid_source)());
        if opath.as_os_str().is_empty() {
            return Ok(false);
        }
        inner.identity.symlink_dir = symlink_dir(conf, &opath);
        inner.identity.opath = opath;
        if is_per_instance(conf, self.code_env) {
            let isym_path = inner.identity.symlink_dir.join(&conf.name);
            inner.identity.isym_path = isym_path.clone();
            rotate_files(&isym_path, conf.log_sym_history).inspect_err(|_| {
                dout_emergency("read_ofile_config: failed to rotate instance symlinks\n")
            })?;
            create_symlink(&inner.identity.opath, &isym_path).inspect_err(|_| {
                dout_emergency("read_ofile_config: failed to create instance symlink\n")
            })?;
        }
        let file = open_output(&inner.identity.opath)?;
        self.target.set_ofd(file.as_raw_fd());
        inner.file = Some(file);
        Ok(true)
    }

    /// Applies a new configuration snapshot.
    ///
    /// Routing flags are recomputed from scratch and the output file is closed and reopened. The
    /// whole operation runs under the sink's lock so writers see either the old or the new
    /// configuration. Stderr routing is forced off when the stderr descriptor is not open.
    ///
    /// # Arguments
    ///
    /// * `conf`: the new configuration.
    /// * `changed`: the names of the keys which changed.
    ///
    /// returns: Result<(), Error>
    ///
    /// # Errors
    ///
    /// Returns the error which prevented the output file from being opened; file routing then
    /// stays disabled while the other destinations are applied.
    pub fn reconfigure(&self, conf: &Config, changed: &HashSet<String>) -> Result<(), Error> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if !inner.buffer.is_empty() {
            self.flush_locked(&mut inner);
        }
        self.target.flags().set(Flags::NONE);
        self.close_output(&mut inner);
        let mut flags = Flags::NONE;
        if conf.log_to_syslog {
            if (changed.contains("log_to_syslog") || changed.contains("name"))
                && self.code_env == CodeEnvironment::Daemon
            {
                syslog::reopen(&conf.name);
            }
            flags |= Flags::SYSLOG;
        }
        if fd_is_open(self.stderr_fd) {
            if conf.log_to_stderr {
                flags |= Flags::STDERR_LOG;
            }
            if conf.err_to_stderr {
                flags |= Flags::STDERR_ERR;
            }
        }
        self.target.flags().set(flags);
        let res = self.read_ofile_config(&mut inner, conf);
        if let Ok(true) = res {
            flags |= Flags::OFILE;
            self.target.flags().set(flags);
        }
        res.map(|_| ())
    }

    /// Replays a full reconfiguration as if every tracked key changed.
    pub fn reopen_logs(&self, conf: &Config) -> Result<(), Error> {
        self.reconfigure(conf, &all_tracked_keys())
    }

    /// Follows a process id change (ex: after daemonizing).
    ///
    /// When a per-instance output file is active and its computed path changed, the instance
    /// symlink is pointed at the new path and the current file is renamed to it. The open
    /// descriptor is kept.
    pub fn handle_pid_change(&self, conf: &Config) -> Result<(), Error> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if !self.target.flags().get().contains(Flags::OFILE) {
            return Ok(());
        }
        let new_opath = calculate_opath(conf, self.code_env, (self.pid_source)());
        if new_opath == inner.identity.opath {
            return Ok(());
        }
        if !inner.identity.isym_path.as_os_str().is_empty() {
            create_symlink(&new_opath, &inner.identity.isym_path).inspect_err(|_| {
                dout_emergency("handle_pid_change: failed to (re)create instance symlink\n")
            })?;
        }
        if let Err(source) = std::fs::rename(&inner.identity.opath, &new_opath) {
            let err = Error::Rename {
                from: inner.identity.opath.clone(),
                to: new_opath,
                source,
            };
            dout_emergency(&format!("handle_pid_change: {}\n", err));
            return Err(err);
        }
        inner.identity.opath = new_opath;
        Ok(())
    }

    /// Stops routing anything to stderr until the next reconfiguration.
    pub fn handle_stderr_shutdown(&self) {
        let _guard = self.inner.lock();
        self.target.flags().remove(Flags::STDERR);
    }

    /// Returns the current routing flags.
    pub fn routing(&self) -> Flags {
        self.target.flags().get()
    }

    /// Returns the current output path, empty when there is none.
    pub fn output_path(&self) -> PathBuf {
        let guard = self.inner.lock();
        let path = guard.borrow().identity.opath.clone();
        path
    }

    /// Renders the internal state of the sink for diagnostics.
    pub fn describe(&self) -> String {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        let mut s = String::new();
        let _ = writeln!(s, "flags = {:#x}", self.target.flags().get().bits());
        let _ = writeln!(s, "ofd = {}", self.target.ofd());
        let _ = writeln!(s, "opath = '{}'", inner.identity.opath.display());
        let _ = writeln!(s, "isym_path = '{}'", inner.identity.isym_path.display());
        s
    }
}

impl ConfigObserver for Sink {
    fn tracked_keys(&self) -> &'static [&'static str] {
        TRACKED_KEYS
    }

    fn handle_conf_change(&self, conf: &Config, changed: &HashSet<String>) {
        // Already reported on the emergency path.
        let _ = self.reconfigure(conf, changed);
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        // Must leave the registry before the descriptor goes away.
        unregister(&self.target);
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        self.flush_locked(&mut inner);
        self.close_output(&mut inner);
    }
}

/// An open record on a [Sink], holding the sink's lock.
///
/// Text is appended through [Write](std::fmt::Write) or [write_bytes](Record::write_bytes). A
/// record longer than the output buffer is flushed in several lines, each with its own
/// timestamp.
pub struct Record<'a> {
    sink: &'a Sink,
    guard: ReentrantMutexGuard<'a, RefCell<Inner>>,
    prio: Priority,
}

impl<'a> Record<'a> {
    /// Changes the priority of the record, flushing any text already written.
    pub fn set_priority(&mut self, prio: Priority) {
        let mut inner = self.guard.borrow_mut();
        if !inner.buffer.is_empty() {
            self.sink.flush_locked(&mut inner);
        }
        inner.buffer.set_priority(prio);
        self.prio = prio;
    }

    /// Appends raw bytes to the record.
    pub fn write_bytes(&mut self, mut buf: &[u8]) {
        let mut inner = self.guard.borrow_mut();
        loop {
            // A nested record on this thread may have flushed and cleared the buffer.
            if inner.buffer.is_empty() {
                inner.buffer.set_priority(self.prio);
            }
            let len = inner.buffer.push(buf);
            buf = &buf[len..];
            if buf.is_empty() {
                break;
            }
            self.sink.flush_locked(&mut inner);
        }
    }

    /// Flushes the record; text written afterwards starts a new line at the same priority.
    pub fn flush(&mut self) {
        let mut inner = self.guard.borrow_mut();
        self.sink.flush_locked(&mut inner);
        inner.buffer.set_priority(self.prio);
    }
}

impl<'a> Write for Record<'a> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl<'a> Drop for Record<'a> {
    fn drop(&mut self) {
        let mut inner = self.guard.borrow_mut();
        if !inner.buffer.is_empty() {
            self.sink.flush_locked(&mut inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emergency::is_registered;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    // Lines written by the locked path start with a timestamp; raw emergency lines from other
    // tests running concurrently do not.
    fn is_stamped(line: &str) -> bool {
        let b = line.as_bytes();
        b.len() >= 27
            && b[4] == b'-'
            && b[7] == b'-'
            && b[10] == b' '
            && b[13] == b':'
            && b[16] == b':'
            && b[19] == b'.'
            && b[26] == b' '
            && b[20..26].iter().all(|v| v.is_ascii_digit())
    }

    fn stamped_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter(|v| is_stamped(v))
            .map(String::from)
            .collect()
    }

    struct Capture {
        _dir: TempDir,
        path: PathBuf,
        file: File,
    }

    impl Capture {
        fn new() -> Capture {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("stderr");
            let file = File::create(&path).unwrap();
            Capture {
                _dir: dir,
                path,
                file,
            }
        }

        fn fd(&self) -> RawFd {
            self.file.as_raw_fd()
        }
    }

    #[test]
    fn file_and_stderr() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("x.log");
        let stderr = Capture::new();
        let sink = Builder::new().stderr_fd(stderr.fd()).build();
        let conf = Config::new()
            .log_file(&log)
            .log_to_stderr(true)
            .log_to_syslog(false)
            .log_per_instance(false);
        sink.reopen_logs(&conf).unwrap();
        assert_eq!(sink.routing(), Flags::OFILE | Flags::STDERR);
        sink.write(Priority::new(0), "hello");
        let lines = stamped_lines(&log);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" hello"));
        assert_eq!(stamped_lines(&stderr.path), lines);
    }

    #[test]
    fn error_flag_routes_only_errors() {
        let stderr = Capture::new();
        let sink = Builder::new().stderr_fd(stderr.fd()).build();
        sink.reopen_logs(&Config::new().log_to_stderr(false).err_to_stderr(true))
            .unwrap();
        sink.write(Priority::new(0), "not shown");
        sink.write(Priority::new(50), "not shown either");
        sink.write(Priority::ERROR, "an error");
        let lines = stamped_lines(&stderr.path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" an error"));
    }

    #[test]
    fn closed_stderr_forces_routing_off() {
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new().log_to_stderr(true).err_to_stderr(true))
            .unwrap();
        assert!(!sink.routing().intersects(Flags::STDERR));
        assert_eq!(sink.routing(), Flags::NONE);
    }

    #[test]
    fn failed_file_write_disables_file() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        let conf = Config::new().log_file("/dev/full");
        sink.reopen_logs(&conf).unwrap();
        assert!(sink.routing().contains(Flags::OFILE));
        sink.write(Priority::new(1), "lost");
        assert!(!sink.routing().contains(Flags::OFILE));
        sink.write(Priority::new(1), "also lost");
        assert!(!sink.routing().contains(Flags::OFILE));
        sink.reopen_logs(&conf).unwrap();
        assert!(sink.routing().contains(Flags::OFILE));
    }

    #[test]
    fn stderr_shutdown_clears_both_flags() {
        let sink = Builder::new().stderr_fd(libc::STDERR_FILENO).build();
        sink.reopen_logs(&Config::new().log_to_stderr(true).err_to_stderr(true))
            .unwrap();
        assert!(sink.routing().contains(Flags::STDERR));
        sink.handle_stderr_shutdown();
        assert_eq!(sink.routing(), Flags::NONE);
    }

    #[test]
    fn failed_stderr_write_disables_stderr() {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        unsafe { libc::close(fds[0]) };
        let sink = Builder::new().stderr_fd(fds[1]).build();
        sink.reopen_logs(&Config::new().log_to_stderr(true).err_to_stderr(true))
            .unwrap();
        assert!(sink.routing().contains(Flags::STDERR));
        sink.write(Priority::new(0), "broken pipe");
        assert!(!sink.routing().intersects(Flags::STDERR));
        drop(sink);
        unsafe { libc::close(fds[1]) };
    }

    #[test]
    fn no_log_file() {
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new()).unwrap();
        assert!(!sink.routing().contains(Flags::OFILE));
        assert!(sink.output_path().as_os_str().is_empty());
        let state = sink.describe();
        assert!(state.contains("ofd = -1\n"));
        assert!(state.contains("opath = ''\n"));
        assert!(state.starts_with("flags = 0x"));
    }

    #[test]
    fn open_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        let conf = Config::new().log_file(dir.path().join("missing/x.log"));
        let err = sink.reopen_logs(&conf).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
        assert!(!sink.routing().contains(Flags::OFILE));
        // Writing without any destination is fine.
        sink.write(Priority::new(0), "nowhere");
    }

    #[test]
    fn long_record_is_split() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("long.log");
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new().log_file(&log)).unwrap();
        let text = "x".repeat(crate::buffer::OBUF_SZ * 2);
        sink.write(Priority::new(0), &text);
        let lines = stamped_lines(&log);
        assert_eq!(lines.len(), 3);
        let total: usize = lines.iter().map(|v| v.len() - 27).sum();
        assert_eq!(total, text.len());
    }

    #[test]
    fn record_guard() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("rec.log");
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new().log_file(&log)).unwrap();
        {
            let mut rec = sink.record(Priority::new(5));
            write!(rec, "a={} ", 1).unwrap();
            // Re-entrant call from the thread holding the lock.
            sink.flush();
            write!(rec, "b={}", 2).unwrap();
            rec.set_priority(Priority::new(7));
            rec.write_bytes(b"c\n");
        }
        sink.write_fmt(Priority::new(1), format_args!("{}-{}", "d", 4));
        let lines = stamped_lines(&log);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" a=1 "));
        assert!(lines[1].ends_with(" b=2"));
        assert!(lines[2].ends_with(" c"));
        assert!(lines[3].ends_with(" d-4"));
    }

    #[test]
    fn nested_record_keeps_outer_priority() {
        let stderr = Capture::new();
        let sink = Builder::new().stderr_fd(stderr.fd()).build();
        sink.reopen_logs(&Config::new().log_to_stderr(false).err_to_stderr(true))
            .unwrap();
        {
            let mut rec = sink.record(Priority::ERROR);
            rec.write_str("failed: ").unwrap();
            // Same thread, ex: a Display impl logging through the bridge.
            sink.write(Priority::new(20), "nested debug");
            rec.write_str("EIO").unwrap();
        }
        let lines = stamped_lines(&stderr.path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" failed: "));
        assert!(lines[1].ends_with(" EIO"));
    }

    #[test]
    fn emergency_races_normal_flush() {
        const WRITES: usize = 200;
        const ALERTS: usize = 50;
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("race.log");
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new().log_file(&log)).unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..WRITES {
                    sink.write(Priority::new(1), &format!("w{}", i));
                }
            });
            s.spawn(|| {
                for _ in 0..ALERTS {
                    dout_emergency("racing emergency alert\n");
                }
            });
        });
        // The emergency path bypasses the sink lock: both kinds of writes may land in any
        // order, only the bytes of each write stay together.
        let content = fs::read_to_string(&log).unwrap();
        assert_eq!(content.matches("racing emergency alert\n").count(), ALERTS);
        let written = stamped_lines(&log)
            .into_iter()
            .filter(|v| v[27..].starts_with('w'))
            .count();
        assert_eq!(written, WRITES);
    }

    #[test]
    fn reconfigure_while_record_is_open() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new().log_file(&a)).unwrap();
        {
            let mut rec = sink.record(Priority::new(0));
            rec.write_str("first").unwrap();
            sink.reopen_logs(&Config::new().log_file(&b)).unwrap();
            rec.write_str("second").unwrap();
        }
        assert_eq!(stamped_lines(&a).len(), 1);
        assert!(stamped_lines(&b)[0].ends_with(" second"));
    }

    #[test]
    fn concurrent_writers_see_whole_configurations() {
        const THREADS: usize = 4;
        const WRITES: usize = 200;
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let conf_a = Config::new().log_file(&a);
        let conf_b = Config::new().log_file(&b);
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&conf_a).unwrap();
        std::thread::scope(|s| {
            for t in 0..THREADS {
                let sink = &sink;
                s.spawn(move || {
                    for i in 0..WRITES {
                        sink.write(Priority::new(1), &format!("w{}-{}", t, i));
                    }
                });
            }
            s.spawn(|| {
                for i in 0..50 {
                    let conf = if i % 2 == 0 { &conf_b } else { &conf_a };
                    sink.reopen_logs(conf).unwrap();
                    assert!(sink.routing().contains(Flags::OFILE));
                }
            });
        });
        let mut lines = stamped_lines(&a);
        lines.extend(stamped_lines(&b));
        assert_eq!(lines.len(), THREADS * WRITES);
        for line in lines {
            let payload = &line[27..];
            assert!(payload.starts_with('w'), "torn line: {}", line);
        }
    }

    static PID: AtomicU32 = AtomicU32::new(100);

    fn fake_pid() -> u32 {
        PID.load(Ordering::Relaxed)
    }

    #[test]
    fn per_instance_symlinks_and_pid_change() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("osd.log");
        let link = dir.path().join("osd.0");
        let sink = Builder::new()
            .stderr_fd(i32::MAX)
            .code_environment(CodeEnvironment::Daemon)
            .pid_source(fake_pid)
            .build();
        let conf = Config::new()
            .log_file(&log)
            .log_per_instance(true)
            .log_sym_history(3)
            .name("osd.0");
        PID.store(100, Ordering::Relaxed);
        sink.reopen_logs(&conf).unwrap();
        assert_eq!(sink.output_path(), dir.path().join("osd.log.100"));
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("./osd.log.100"));
        assert!(sink.describe().contains("isym_path = '"));
        sink.write(Priority::new(0), "before");

        PID.store(200, Ordering::Relaxed);
        sink.handle_pid_change(&conf).unwrap();
        let moved = dir.path().join("osd.log.200");
        assert_eq!(sink.output_path(), moved);
        assert!(!dir.path().join("osd.log.100").exists());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("./osd.log.200"));
        sink.write(Priority::new(0), "after");
        let lines = stamped_lines(&moved);
        assert_eq!(lines.len(), 2);

        // Same pid: nothing to do.
        sink.handle_pid_change(&conf).unwrap();

        PID.store(300, Ordering::Relaxed);
        sink.reopen_logs(&conf).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("./osd.log.300"));
        let rotated = dir.path().join("osd.0.1");
        assert_eq!(fs::read_link(&rotated).unwrap(), PathBuf::from("./osd.log.200"));
    }

    #[test]
    fn pid_change_without_file_is_noop() {
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        sink.reopen_logs(&Config::new()).unwrap();
        sink.handle_pid_change(&Config::new()).unwrap();
    }

    #[test]
    fn drop_unregisters() {
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        let target = sink.target.clone();
        assert!(is_registered(&target));
        drop(sink);
        assert!(!is_registered(&target));
        assert_eq!(target.ofd(), -1);
    }

    #[test]
    fn emergency_reaches_every_sink() {
        let dir = TempDir::new().unwrap();
        let sinks: Vec<(PathBuf, Sink)> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("s{}.log", i));
                let sink = Builder::new().stderr_fd(i32::MAX).build();
                sink.reopen_logs(&Config::new().log_file(&path)).unwrap();
                (path, sink)
            })
            .collect();
        dout_emergency("emergency broadcast from sink tests\n");
        for (path, _) in &sinks {
            let content = fs::read_to_string(path).unwrap();
            assert!(content.contains("emergency broadcast from sink tests\n"));
        }
    }

    #[test]
    fn observer() {
        let sink = Builder::new().stderr_fd(i32::MAX).build();
        assert_eq!(sink.tracked_keys(), TRACKED_KEYS);
        let mut changed = HashSet::new();
        changed.insert(String::from("err_to_stderr"));
        sink.handle_conf_change(&Config::new(), &changed);
        assert_eq!(sink.routing(), Flags::NONE);
    }
}
