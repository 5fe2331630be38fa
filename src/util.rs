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

//! Low-level helpers shared by the sink, the router and the emergency path.
//!
//! Everything in here that takes a raw file descriptor is allocation-free so that it can be used
//! from the emergency path.

use crate::buffer::TIME_FMT_SZ;
use bp3d_os::time::LocalUtcOffset;
use bp3d_util::format::{FixedBufStr, IoToFmt};
use std::ffi::CString;
use std::io::{Error, ErrorKind};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Formats the given time as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn format_timestamp(time: OffsetDateTime) -> [u8; TIME_FMT_SZ] {
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
    );
    let mut wrapper = IoToFmt::new(FixedBufStr::<32>::new());
    let _ = time.format_into(&mut wrapper, format);
    let time_str = wrapper.into_inner();
    let bytes = time_str.str().as_bytes();
    let mut stamp = [b' '; TIME_FMT_SZ];
    let len = std::cmp::min(bytes.len(), TIME_FMT_SZ);
    stamp[..len].copy_from_slice(&bytes[..len]);
    stamp
}

/// Returns the current local time formatted for a line header, falling back to UTC when the
/// local offset cannot be determined.
pub fn timestamp() -> [u8; TIME_FMT_SZ] {
    let time = OffsetDateTime::now_utc();
    let offset = UtcOffset::local_offset_at(time);
    let time = offset.map(|v| time.to_offset(v)).unwrap_or(time);
    format_timestamp(time)
}

/// Writes the whole buffer to a raw descriptor, retrying only on `EINTR`.
pub fn safe_write(fd: RawFd, mut buf: &[u8]) -> std::io::Result<()> {
    while !buf.is_empty() {
        let res = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
        if res < 0 {
            let err = Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if res == 0 {
            return Err(Error::from(ErrorKind::WriteZero));
        }
        buf = &buf[res as usize..];
    }
    Ok(())
}

/// Checks whether a descriptor is open with a zero-length write.
pub fn fd_is_open(fd: RawFd) -> bool {
    loop {
        let res = unsafe { libc::write(fd, [0u8; 1].as_ptr().cast(), 0) };
        if res == 0 {
            return true;
        }
        if Error::last_os_error().kind() != ErrorKind::Interrupted {
            return false;
        }
    }
}

/// Returns true if the path exists and is readable and writable by this process (`access(2)`).
pub fn is_accessible(path: &Path) -> bool {
    let Ok(path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}

/// Makes a path absolute relative to the current working directory.
pub fn normalize_relative(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.into();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.into(),
    }
}

/// Returns the directory part of a path, `.` when there is none.
pub fn dirname(path: &Path) -> &Path {
    match path.parent() {
        Some(v) if v.as_os_str().is_empty() => Path::new("."),
        Some(v) => v,
        None => path,
    }
}
