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

//! Syslog output through the POSIX `openlog`/`syslog`/`closelog` API.

use crate::buffer::HEADER_SZ;
use crate::handler::{Flags, Handler};
use crate::priority::{Priority, Severity};
use parking_lot::{const_mutex, Mutex};
use std::ffi::CString;

// syslog(3) keeps the ident pointer, so the string must stay alive until the next openlog.
static IDENT: Mutex<Option<CString>> = const_mutex(None);

const EMERGENCY_MAX: usize = 1024;

const FORMAT: &[u8] = b"%s\0";

fn to_cstring(msg: &[u8]) -> CString {
    let bytes: Vec<u8> = msg.iter().copied().filter(|v| *v != 0).collect();
    // Cannot fail: every NUL byte was filtered out.
    CString::new(bytes).unwrap_or_default()
}

/// (Re)opens the syslog connection using the given process name as ident.
pub fn reopen(name: &str) {
    let ident = to_cstring(name.as_bytes());
    let mut guard = IDENT.lock();
    unsafe {
        libc::closelog();
        libc::openlog(ident.as_ptr(), libc::LOG_ODELAY | libc::LOG_PID, libc::LOG_USER);
    }
    *guard = Some(ident);
}

/// Sends a message at the given severity, stripping one trailing newline.
pub fn send(severity: Severity, msg: &[u8]) {
    let msg = msg.strip_suffix(b"\n").unwrap_or(msg);
    let msg = to_cstring(msg);
    unsafe {
        libc::syslog(
            libc::LOG_USER | severity.syslog_level(),
            FORMAT.as_ptr().cast(),
            msg.as_ptr(),
        );
    }
}

/// Sends a message at critical severity without allocating; long messages are truncated.
pub fn send_emergency(msg: &[u8]) {
    let mut buf = [0u8; EMERGENCY_MAX];
    let mut len = 0;
    for b in msg.iter().filter(|v| **v != 0) {
        if len == EMERGENCY_MAX - 1 {
            break;
        }
        buf[len] = *b;
        len += 1;
    }
    unsafe {
        libc::syslog(
            libc::LOG_USER | libc::LOG_CRIT,
            FORMAT.as_ptr().cast(),
            buf.as_ptr().cast::<libc::c_char>(),
        );
    }
}

/// Sends lines to syslog, without the timestamp header.
pub struct SyslogHandler;

impl Handler for SyslogHandler {
    fn flags(&self) -> Flags {
        Flags::SYSLOG
    }

    fn write(&mut self, line: &[u8], prio: Priority) -> std::io::Result<()> {
        send(prio.severity(), line.get(HEADER_SZ..).unwrap_or(line));
        Ok(())
    }
}
