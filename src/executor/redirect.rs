use std::ffi::CStr;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::dup2;
use crate::ast::OutputMode;

/// Where one standard descriptor of a child comes from.
///
/// Everything in here runs between `fork` and `exec`, so paths arrive as
/// ready-made C strings and nothing allocates.
#[derive(Debug, Clone, Copy)]
pub enum Endpoint<'a> {
    Inherit,
    Pipe(BorrowedFd<'a>),
    ReadFile(&'a CStr),
    WriteFile(&'a CStr, OutputMode),
}

impl Endpoint<'_> {
    /// Makes `slot` refer to this endpoint.
    pub fn attach(&self, slot: RawFd) -> Result<(), Errno> {
        match *self {
            Endpoint::Inherit => Ok(()),
            Endpoint::Pipe(fd) => place(fd.as_raw_fd(), slot),
            Endpoint::ReadFile(path) => ScopedRedirect::open_read(path)?.install(slot),
            Endpoint::WriteFile(path, mode) => ScopedRedirect::open_write(path, mode)?.install(slot),
        }
    }

    /// Bytes naming the endpoint in diagnostics.
    pub fn describe(&self) -> &[u8] {
        match self {
            Endpoint::Inherit => b"inherited descriptor",
            Endpoint::Pipe(_) => b"pipe",
            Endpoint::ReadFile(path) | Endpoint::WriteFile(path, _) => path.to_bytes(),
        }
    }
}

/// An open file waiting to take over a standard slot. The original
/// descriptor is closed when the guard is dropped, whether or not the
/// takeover succeeded.
#[derive(Debug)]
pub struct ScopedRedirect {
    fd: OwnedFd,
}

impl ScopedRedirect {
    pub fn open_read(path: &CStr) -> Result<Self, Errno> {
        let raw = open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty())?;
        // SAFETY: `open` just returned this descriptor and nothing else owns it
        Ok(ScopedRedirect { fd: unsafe { OwnedFd::from_raw_fd(raw) } })
    }

    pub fn open_write(path: &CStr, mode: OutputMode) -> Result<Self, Errno> {
        let flags = OFlag::O_WRONLY
            | OFlag::O_CREAT
            | OFlag::O_CLOEXEC
            | match mode {
                OutputMode::Truncate => OFlag::O_TRUNC,
                OutputMode::Append => OFlag::O_APPEND,
            };
        let perms = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP;
        let raw = open(path, flags, perms)?;
        // SAFETY: as above
        Ok(ScopedRedirect { fd: unsafe { OwnedFd::from_raw_fd(raw) } })
    }

    pub fn install(self, slot: RawFd) -> Result<(), Errno> {
        let raw = self.fd.as_raw_fd();
        if raw == slot {
            // Opened straight into the slot: hand ownership to the slot
            place(raw, slot)?;
            let _ = self.fd.into_raw_fd();
            return Ok(());
        }
        place(raw, slot)
    }
}

fn place(fd: RawFd, slot: RawFd) -> Result<(), Errno> {
    if fd == slot {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
        return Ok(());
    }
    dup2(fd, slot)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::fs::{self, File};
    use std::io::{Read, Write};
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use nix::unistd::{close, dup};
    use tempfile::TempDir;

    fn c_path(path: &Path) -> CString {
        CString::new(path.as_os_str().as_bytes()).unwrap()
    }

    // Works on a scratch slot rather than a real standard descriptor so the
    // test harness's own stdio is left alone.
    fn scratch_slot() -> RawFd {
        dup(libc::STDERR_FILENO).unwrap()
    }

    #[test]
    fn test_write_truncate_then_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old contents\n").unwrap();
        let target = c_path(&path);

        let slot = scratch_slot();
        Endpoint::WriteFile(&target, OutputMode::Truncate).attach(slot).unwrap();
        let mut out = unsafe { File::from_raw_fd(slot) };
        out.write_all(b"one\n").unwrap();
        Endpoint::WriteFile(&target, OutputMode::Append).attach(slot).unwrap();
        out.write_all(b"two\n").unwrap();
        drop(out);

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_created_file_mode_is_at_most_0660() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.txt");
        let target = c_path(&path);

        let slot = scratch_slot();
        Endpoint::WriteFile(&target, OutputMode::Truncate).attach(slot).unwrap();
        close(slot).unwrap();

        // umask may only take bits away from 0660
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o660, 0);
        assert_ne!(mode & 0o600, 0);
    }

    #[test]
    fn test_read_file_endpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "hello").unwrap();
        let source = c_path(&path);

        let slot = scratch_slot();
        Endpoint::ReadFile(&source).attach(slot).unwrap();
        let mut input = unsafe { File::from_raw_fd(slot) };
        let mut buf = String::new();
        input.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let source = c_path(&dir.path().join("absent"));
        let slot = scratch_slot();
        assert_eq!(Endpoint::ReadFile(&source).attach(slot), Err(Errno::ENOENT));
        close(slot).unwrap();
    }

    #[test]
    fn test_describe() {
        let path = CString::new("/tmp/x").unwrap();
        assert_eq!(Endpoint::ReadFile(&path).describe(), b"/tmp/x");
        assert_eq!(Endpoint::Inherit.describe(), b"inherited descriptor");
    }
}
