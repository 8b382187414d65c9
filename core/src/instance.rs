//! Single running engine per machine
//!
//! The engine claims a fixed loopback UDP port. Whoever binds it first is the
//! instance; the OS frees the port when the guard is dropped or the process
//! dies, so a crash never leaves a stale lock behind.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use tracing::debug;

/// Held for as long as this process is the running instance
#[derive(Debug)]
pub struct InstanceGuard {
    socket: UdpSocket,
}

impl InstanceGuard {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[derive(Debug)]
pub enum InstanceLock {
    Acquired(InstanceGuard),
    AlreadyRunning,
}

impl InstanceLock {
    /// Try to become the running instance
    ///
    /// Only "address in use" means another instance; any other bind error is
    /// returned.
    pub fn acquire(port: u16) -> io::Result<Self> {
        match UdpSocket::bind((Ipv4Addr::LOCALHOST, port)) {
            Ok(socket) => {
                debug!(port, "Instance lock acquired");
                Ok(InstanceLock::Acquired(InstanceGuard { socket }))
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!(port, "Instance lock held elsewhere");
                Ok(InstanceLock::AlreadyRunning)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_second_acquire_reports_already_running() {
        let port = free_port();

        let first = InstanceLock::acquire(port).unwrap();
        assert!(matches!(first, InstanceLock::Acquired(_)));
        assert!(matches!(
            InstanceLock::acquire(port).unwrap(),
            InstanceLock::AlreadyRunning
        ));

        drop(first);
        assert!(matches!(
            InstanceLock::acquire(port).unwrap(),
            InstanceLock::Acquired(_)
        ));
    }
}
