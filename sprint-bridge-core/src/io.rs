//! Pipe handle acquisition from inherited file descriptors
//!
//! The consumer spawns the producer with two pipes already open and passes the
//! descriptor numbers in the trainer configuration. This module checks that
//! both descriptors are usable in the right direction before taking ownership.

use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, RawFd};

use tracing::debug;

use crate::error::{Error, Result};

/// Direction a descriptor must support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Producer writes, consumer reads
    Write,
    /// Consumer writes, producer reads
    Read,
}

/// The two owned ends of the bridge
#[derive(Debug)]
pub struct PipePair {
    /// Child-to-parent end, written by the bridge
    pub outbound: File,
    /// Parent-to-child end, held but not read
    pub inbound: File,
}

/// Check that `fd` is open and supports the given access direction
pub fn check_descriptor(fd: RawFd, access: Access) -> Result<()> {
    if fd < 0 {
        return Err(Error::Handshake(format!("descriptor {fd} is negative")));
    }

    #[allow(unsafe_code)]
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags == -1 {
        return Err(Error::Handshake(format!(
            "descriptor {fd} is not open: {}",
            io::Error::last_os_error()
        )));
    }

    let mode = flags & libc::O_ACCMODE;
    let usable = match access {
        Access::Write => mode == libc::O_WRONLY || mode == libc::O_RDWR,
        Access::Read => mode == libc::O_RDONLY || mode == libc::O_RDWR,
    };
    if !usable {
        return Err(Error::Handshake(format!(
            "descriptor {fd} is not open for {}",
            match access {
                Access::Write => "writing",
                Access::Read => "reading",
            }
        )));
    }

    Ok(())
}

/// Take ownership of the child-to-parent and parent-to-child descriptors
///
/// Both descriptors are validated before either is wrapped, so on error
/// neither is closed and the caller keeps ownership.
pub fn open_pipe_pair(c2p_fd: RawFd, p2c_fd: RawFd) -> Result<PipePair> {
    if c2p_fd == p2c_fd {
        return Err(Error::Handshake(format!(
            "c2p and p2c must be distinct descriptors, both are {c2p_fd}"
        )));
    }

    check_descriptor(c2p_fd, Access::Write)?;
    check_descriptor(p2c_fd, Access::Read)?;

    // Ownership transfers here; the descriptors were inherited from the
    // consumer and nothing else in this process refers to them.
    #[allow(unsafe_code)]
    let (outbound, inbound) = unsafe { (File::from_raw_fd(c2p_fd), File::from_raw_fd(p2c_fd)) };

    debug!(c2p_fd, p2c_fd, "pipe descriptors acquired");
    Ok(PipePair { outbound, inbound })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::fd::{AsRawFd, IntoRawFd};

    #[test]
    fn test_negative_descriptor() {
        assert!(matches!(check_descriptor(-1, Access::Write), Err(Error::Handshake(_))));
    }

    #[test]
    fn test_unopened_descriptor() {
        assert!(matches!(check_descriptor(1 << 20, Access::Read), Err(Error::Handshake(_))));
    }

    #[test]
    fn test_read_only_descriptor_not_writable() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = OpenOptions::new().read(true).open(tmp.path()).unwrap();
        assert!(check_descriptor(file.as_raw_fd(), Access::Read).is_ok());
        assert!(matches!(
            check_descriptor(file.as_raw_fd(), Access::Write),
            Err(Error::Handshake(_))
        ));
    }

    #[test]
    fn test_same_descriptor_twice() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        assert!(matches!(open_pipe_pair(fd, fd), Err(Error::Handshake(_))));
    }

    #[test]
    fn test_open_pipe_pair() {
        let out = tempfile::tempfile().unwrap().into_raw_fd();
        let inp = tempfile::tempfile().unwrap().into_raw_fd();
        let pair = open_pipe_pair(out, inp).unwrap();
        assert_eq!(pair.outbound.as_raw_fd(), out);
        assert_eq!(pair.inbound.as_raw_fd(), inp);
    }
}
