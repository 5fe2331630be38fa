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

//! File identity, numbered rotation chains and instance symlinks.

use crate::config::{CodeEnvironment, Config};
use crate::emergency::dout_emergency;
use crate::error::Error;
use crate::util::{dirname, is_accessible, normalize_relative};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Where the sink writes to; every path is empty when file output is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIdentity {
    /// The absolute output path.
    pub opath: PathBuf,

    /// The directory holding the instance symlink.
    pub symlink_dir: PathBuf,

    /// The instance symlink, only set for per-instance daemon logs.
    pub isym_path: PathBuf,
}

impl FileIdentity {
    pub fn clear(&mut self) {
        self.opath.clear();
        self.symlink_dir.clear();
        self.isym_path.clear();
    }
}

fn report(func: &str, err: Error) -> Error {
    dout_emergency(&format!("{}: {}\n", func, err));
    err
}

/// Returns true if the configuration asks for a pid-suffixed output file.
pub fn is_per_instance(conf: &Config, env: CodeEnvironment) -> bool {
    conf.log_per_instance && env == CodeEnvironment::Daemon
}

/// Computes the absolute output path, empty when no log file is configured.
pub fn calculate_opath(conf: &Config, env: CodeEnvironment, pid: u32) -> PathBuf {
    if conf.log_file.as_os_str().is_empty() {
        return PathBuf::new();
    }
    let log_file = normalize_relative(&conf.log_file);
    if is_per_instance(conf, env) {
        let mut path = log_file.into_os_string();
        path.push(format!(".{}", pid));
        path.into()
    } else {
        log_file
    }
}

/// Returns the configured symlink directory, or the directory of the output path.
pub fn symlink_dir(conf: &Config, opath: &Path) -> PathBuf {
    if conf.log_sym_dir.as_os_str().is_empty() {
        dirname(opath).into()
    } else {
        normalize_relative(&conf.log_sym_dir)
    }
}

/// Returns the path of a chain entry: position 0 is `base` itself, position n is `base.n`.
pub fn chain_entry(base: &Path, position: u32) -> PathBuf {
    if position == 0 {
        return base.into();
    }
    let mut path = base.as_os_str().to_owned();
    path.push(format!(".{}", position));
    path.into()
}

/// Shifts the chain rooted at `base` by one position, keeping at most `history` rotated entries.
///
/// Given `base`, `base.1`, `base.2` and `base.3` with a history of 2, `base.3` and `base.2` are
/// removed, `base.1` becomes `base.2` and `base` becomes `base.1`. The chain ends at the first
/// entry which is not readable and writable. Entries are processed from the oldest to the newest
/// so that no rename overwrites an entry which has not been moved yet.
///
/// Numbering starts at `base.1` for the newest rotated entry and `history` rotated entries are
/// kept, rather than starting at `base.0` and stopping at `base.(history - 1)`.
pub fn rotate_files(base: &Path, history: u32) -> Result<(), Error> {
    let mut len = 0;
    while is_accessible(&chain_entry(base, len)) {
        len += 1;
    }
    for position in (0..len).rev() {
        let path = chain_entry(base, position);
        let next = position + 1;
        if next > history {
            std::fs::remove_file(&path)
                .map_err(|source| report("rotate_files", Error::Unlink { path, source }))?;
        } else {
            let to = chain_entry(base, next);
            std::fs::rename(&path, &to).map_err(|source| {
                report(
                    "rotate_files",
                    Error::Rename {
                        from: path,
                        to,
                        source,
                    },
                )
            })?;
        }
    }
    Ok(())
}

/// Creates (or replaces) a symlink at `link` pointing to `target`.
///
/// The link is relative (`./name`) when both paths share a directory.
pub fn create_symlink(target: &Path, link: &Path) -> Result<(), Error> {
    let target = match (dirname(target) == dirname(link), target.file_name()) {
        (true, Some(name)) => Path::new(".").join(name),
        _ => target.into(),
    };
    loop {
        match std::os::unix::fs::symlink(&target, link) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if let Err(source) = std::fs::remove_file(link) {
                    return Err(report(
                        "create_symlink",
                        Error::RemoveLink {
                            path: link.into(),
                            source,
                        },
                    ));
                }
            }
            Err(source) => {
                return Err(report(
                    "create_symlink",
                    Error::Symlink {
                        target,
                        link: link.into(),
                        source,
                    },
                ))
            }
        }
    }
}

/// Opens the output file for appending, creating it with owner-only permissions.
pub fn open_output(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)
        .map_err(|source| {
            let err = Error::Open {
                path: path.into(),
                source,
            };
            dout_emergency(&format!("{}\n", err));
            err
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn make(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn empty_chain_is_noop() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        rotate_files(&base, 3).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn shift_with_history_two() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        make(&base, "zero");
        make(&chain_entry(&base, 1), "one");
        make(&chain_entry(&base, 2), "two");
        rotate_files(&base, 2).unwrap();
        assert!(!base.exists());
        assert_eq!(read(&chain_entry(&base, 1)), "zero");
        assert_eq!(read(&chain_entry(&base, 2)), "one");
        assert!(!chain_entry(&base, 3).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn retention_removes_tail() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        for i in 0..5 {
            make(&chain_entry(&base, i), &i.to_string());
        }
        rotate_files(&base, 3).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
        assert_eq!(read(&chain_entry(&base, 1)), "0");
        assert_eq!(read(&chain_entry(&base, 2)), "1");
        assert_eq!(read(&chain_entry(&base, 3)), "2");
        assert!(!chain_entry(&base, 4).exists());
    }

    #[test]
    fn zero_history_removes_everything() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        make(&base, "a");
        make(&chain_entry(&base, 1), "b");
        rotate_files(&base, 0).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn scan_stops_at_gap() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        make(&base, "a");
        make(&chain_entry(&base, 2), "c");
        rotate_files(&base, 5).unwrap();
        assert_eq!(read(&chain_entry(&base, 1)), "a");
        assert_eq!(read(&chain_entry(&base, 2)), "c");
    }

    #[test]
    fn unrelated_files_are_kept() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        make(&base, "a");
        make(&dir.path().join("base_other"), "x");
        make(&dir.path().join("base_other.1"), "y");
        rotate_files(&base, 1).unwrap();
        assert_eq!(read(&chain_entry(&base, 1)), "a");
        assert_eq!(read(&dir.path().join("base_other")), "x");
        assert_eq!(read(&dir.path().join("base_other.1")), "y");
    }

    #[test]
    fn symlink_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("osd.log.42");
        let other = dir.path().join("osd.log.41");
        let link = dir.path().join("osd.0");
        make(&target, "new");
        make(&other, "old");
        create_symlink(&other, &link).unwrap();
        create_symlink(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("./osd.log.42"));
        assert_eq!(read(&link), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn symlink_across_directories_is_absolute() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sym");
        fs::create_dir(&sub).unwrap();
        let target = dir.path().join("x.log");
        let link = sub.join("client.admin");
        create_symlink(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);
    }

    #[test]
    fn opath_per_instance_only_in_daemon() {
        let conf = Config::new().log_file("/var/log/osd.log").log_per_instance(true);
        assert_eq!(
            calculate_opath(&conf, CodeEnvironment::Daemon, 1234),
            PathBuf::from("/var/log/osd.log.1234")
        );
        assert_eq!(
            calculate_opath(&conf, CodeEnvironment::Utility, 1234),
            PathBuf::from("/var/log/osd.log")
        );
        assert!(calculate_opath(&Config::new(), CodeEnvironment::Daemon, 1).as_os_str().is_empty());
        let rel = calculate_opath(&Config::new().log_file("rel.log"), CodeEnvironment::Utility, 1);
        assert!(rel.is_absolute());
    }

    #[test]
    fn symlink_dir_defaults_to_output_dir() {
        let conf = Config::new();
        assert_eq!(symlink_dir(&conf, Path::new("/var/log/a.log")), PathBuf::from("/var/log"));
        let conf = conf.log_sym_dir("/run/sym");
        assert_eq!(symlink_dir(&conf, Path::new("/var/log/a.log")), PathBuf::from("/run/sym"));
    }

    #[test]
    fn open_creates_owner_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");
        let file = open_output(&path).unwrap();
        drop(file);
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let err = open_output(&dir.path().join("missing/out.log")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }
}
