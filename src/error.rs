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

use std::path::PathBuf;
use thiserror::Error;

/// A failure to acquire or rearrange one of the sink's on-disk resources.
///
/// Every error is reported on the emergency path before it is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// The output file could not be opened.
    #[error("failed to open log file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A rotated file past the retention limit could not be removed.
    #[error("failed to unlink '{}': {source}", .path.display())]
    Unlink {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be renamed.
    #[error("failed to rename '{}' to '{}': {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// The symlink could not be created.
    #[error("failed to symlink(oldpath='{}', newpath='{}'): {source}", .target.display(), .link.display())]
    Symlink {
        target: PathBuf,
        link: PathBuf,
        source: std::io::Error,
    },

    /// An existing entry in place of the symlink could not be removed.
    #[error("failed to remove '{}': {source}", .path.display())]
    RemoveLink {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Returns the underlying I/O error.
    pub fn io(&self) -> &std::io::Error {
        match self {
            Error::Open { source, .. } => source,
            Error::Unlink { source, .. } => source,
            Error::Rename { source, .. } => source,
            Error::Symlink { source, .. } => source,
            Error::RemoveLink { source, .. } => source,
        }
    }

    /// Returns the OS error code (errno) of this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io().raw_os_error()
    }
}
