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

//! The out-of-band emergency path.
//!
//! Every live sink registers an [EmergencyTarget] in a fixed-size process-wide table guarded by a
//! spinlock. [dout_emergency] walks that table without ever touching a sink's own lock, which
//! makes it usable from a signal handler that interrupted a thread in the middle of a flush, or
//! before any sink was configured.
//!
//! The writes done here are not synchronized with the normal flush path: a line written from
//! here may interleave with a line being flushed on the same descriptor. A target's descriptor
//! may even be closed by a concurrent reconfiguration between the load and the write. Both races
//! are tolerated; the message getting out matters more than its formatting.
//!
//! The spinlock is not reentrant: code holding it (only [register] and [unregister]) must never
//! be interrupted by a handler calling [dout_emergency] on the same thread.

use crate::handler::{syslog, AtomicFlags, Flags};
use crate::util::safe_write;
use spin::Mutex;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

const NUM_SLOTS: usize = 32;

const EMPTY: Option<Arc<EmergencyTarget>> = None;

static SLOTS: Mutex<[Option<Arc<EmergencyTarget>>; NUM_SLOTS]> = Mutex::new([EMPTY; NUM_SLOTS]);

/// The part of a sink the emergency path is allowed to see: its output descriptor and its routing
/// flags, both readable without the sink's lock.
pub struct EmergencyTarget {
    ofd: AtomicI32,
    flags: AtomicFlags,
}

impl Default for EmergencyTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyTarget {
    pub fn new() -> EmergencyTarget {
        EmergencyTarget {
            ofd: AtomicI32::new(-1),
            flags: AtomicFlags::new(Flags::NONE),
        }
    }

    pub fn flags(&self) -> &AtomicFlags {
        &self.flags
    }

    /// Returns the open output descriptor, -1 when there is none.
    pub fn ofd(&self) -> RawFd {
        self.ofd.load(Ordering::Acquire)
    }

    pub fn set_ofd(&self, fd: RawFd) {
        self.ofd.store(fd, Ordering::Release);
    }

    fn log_to_file_and_syslog(&self, msg: &[u8]) {
        let fd = self.ofd();
        if fd >= 0 {
            let _ = safe_write(fd, msg);
        }
        if self.flags.get().contains(Flags::SYSLOG) {
            syslog::send_emergency(msg);
        }
    }
}

/// Adds a target to the registry, in the first free slot.
///
/// Returns false when the registry is full; the target then only misses emergency messages.
pub fn register(target: &Arc<EmergencyTarget>) -> bool {
    let mut slots = SLOTS.lock();
    match slots.iter_mut().find(|v| v.is_none()) {
        Some(slot) => {
            *slot = Some(target.clone());
            true
        }
        None => false,
    }
}

/// Removes a target from the registry.
pub fn unregister(target: &Arc<EmergencyTarget>) {
    let old = {
        let mut slots = SLOTS.lock();
        slots
            .iter_mut()
            .find(|v| matches!(v, Some(v) if Arc::ptr_eq(v, target)))
            .and_then(|slot| slot.take())
    };
    // Dropped outside of the spinlock.
    drop(old);
}

/// Returns true if the target currently occupies a slot.
#[cfg(test)]
pub(crate) fn is_registered(target: &Arc<EmergencyTarget>) -> bool {
    SLOTS
        .lock()
        .iter()
        .flatten()
        .any(|v| Arc::ptr_eq(v, target))
}

/// Emergency log of raw bytes.
///
/// The message is written to stderr, then to the output file and (when enabled) syslog of every
/// registered sink. Errors are ignored: there is nowhere left to report them.
///
/// This function may be called from a signal handler and before any sink exists.
pub fn dout_emergency_bytes(msg: &[u8]) {
    let _ = safe_write(libc::STDERR_FILENO, msg);
    let slots = SLOTS.lock();
    for target in slots.iter().flatten() {
        target.log_to_file_and_syslog(msg);
    }
}

/// Emergency log of a string; see [dout_emergency_bytes].
pub fn dout_emergency(msg: &str) {
    dout_emergency_bytes(msg.as_bytes())
}
