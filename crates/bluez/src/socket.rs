//! L2CAP and RFCOMM sockets on `AF_BLUETOOTH`.
//!
//! socket2 has no Bluetooth address types, so `sockaddr_l2` and
//! `sockaddr_rc` are laid out here and copied into a `sockaddr_storage`.
//! Blocking calls run on the blocking pool under both a kernel socket
//! timeout and an outer tokio deadline.

use async_trait::async_trait;
use std::time::Duration;

use bluefang_common::{BdAddr, BlueError, BlueResult, BtSocket, SocketConnector, Transport};

#[derive(Debug, Clone, Default)]
pub struct BluezSockets;

impl BluezSockets {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::*;
    use socket2::{Domain, Protocol, SockAddr, Socket, Type};
    use std::io::{self, Read, Write};
    use std::sync::Arc;
    use tracing::debug;

    const BTPROTO_L2CAP: libc::c_int = 0;
    const BTPROTO_RFCOMM: libc::c_int = 3;
    const RFCOMM_MAX_CHANNEL: u16 = 30;

    /// Extra time the outer deadline allows beyond the kernel timeout.
    const SLACK: Duration = Duration::from_millis(500);

    #[repr(C)]
    struct SockaddrL2 {
        l2_family: libc::sa_family_t,
        l2_psm: u16,
        l2_bdaddr: [u8; 6],
        l2_cid: u16,
        l2_bdaddr_type: u8,
    }

    #[repr(C)]
    struct SockaddrRc {
        rc_family: libc::sa_family_t,
        rc_bdaddr: [u8; 6],
        rc_channel: u8,
    }

    fn into_sockaddr<T>(raw: T) -> SockAddr {
        // SAFETY: T is a plain repr(C) sockaddr smaller than sockaddr_storage.
        unsafe {
            let mut storage: libc::sockaddr_storage = std::mem::zeroed();
            std::ptr::write(&mut storage as *mut libc::sockaddr_storage as *mut T, raw);
            SockAddr::new(storage, std::mem::size_of::<T>() as libc::socklen_t)
        }
    }

    /// Peer address for `transport`; `channel` is the PSM for L2CAP.
    pub(crate) fn peer_address(addr: BdAddr, transport: Transport, channel: u16) -> BlueResult<SockAddr> {
        let family = libc::AF_BLUETOOTH as libc::sa_family_t;
        match transport {
            Transport::L2cap | Transport::L2capDatagram => Ok(into_sockaddr(SockaddrL2 {
                l2_family: family,
                l2_psm: channel.to_le(),
                l2_bdaddr: addr.to_le_octets(),
                l2_cid: 0,
                l2_bdaddr_type: 0,
            })),
            Transport::Rfcomm => {
                if channel == 0 || channel > RFCOMM_MAX_CHANNEL {
                    return Err(BlueError::Config(format!("RFCOMM channel {} out of range", channel)));
                }
                Ok(into_sockaddr(SockaddrRc {
                    rc_family: family,
                    rc_bdaddr: addr.to_le_octets(),
                    rc_channel: channel as u8,
                }))
            }
        }
    }

    fn socket_kind(transport: Transport) -> (Type, libc::c_int) {
        match transport {
            Transport::L2cap => (Type::SEQPACKET, BTPROTO_L2CAP),
            Transport::L2capDatagram => (Type::DGRAM, BTPROTO_L2CAP),
            Transport::Rfcomm => (Type::STREAM, BTPROTO_RFCOMM),
        }
    }

    /// Run `op` on the blocking pool with an outer deadline. Errors are
    /// classified as peer I/O.
    async fn blocking<T, F>(what: String, timeout: Duration, op: F) -> BlueResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let joined = tokio::time::timeout(timeout + SLACK, tokio::task::spawn_blocking(op))
            .await
            .map_err(|_| BlueError::Connectivity(format!("{} timed out", what)))?
            .map_err(|e| BlueError::Resource(format!("{}: worker failed: {}", what, e)))?;
        joined.map_err(|e| BlueError::from_peer(&what, e))
    }

    pub(crate) async fn connect(
        addr: BdAddr,
        transport: Transport,
        channel: u16,
        timeout: Duration,
    ) -> BlueResult<Box<dyn BtSocket>> {
        let peer = peer_address(addr, transport, channel)?;
        let (ty, proto) = socket_kind(transport);
        let label = format!("{} {} {}", addr, transport, channel);
        let timeout = timeout.max(Duration::from_millis(1));

        let sock = Socket::new(Domain::from(libc::AF_BLUETOOTH), ty, Some(Protocol::from(proto)))
            .map_err(|e| BlueError::from_socket(&format!("{} socket", label), e))?;
        let sock = blocking(format!("{} connect", label), timeout, move || {
            sock.connect_timeout(&peer, timeout)?;
            Ok(sock)
        })
        .await?;
        debug!(peer = %label, "Socket connected");
        Ok(Box::new(BluezSocket {
            inner: Arc::new(sock),
            label,
        }))
    }

    /// Closed when the last reference drops.
    struct BluezSocket {
        inner: Arc<Socket>,
        label: String,
    }

    #[async_trait]
    impl BtSocket for BluezSocket {
        async fn send(&mut self, data: &[u8], timeout: Duration) -> BlueResult<usize> {
            let sock = self.inner.clone();
            let data = data.to_vec();
            let timeout = timeout.max(Duration::from_millis(1));
            blocking(format!("{} send", self.label), timeout, move || {
                sock.set_write_timeout(Some(timeout))?;
                (&*sock).write(&data)
            })
            .await
        }

        async fn recv(&mut self, max: usize, timeout: Duration) -> BlueResult<Vec<u8>> {
            let sock = self.inner.clone();
            let timeout = timeout.max(Duration::from_millis(1));
            blocking(format!("{} recv", self.label), timeout, move || {
                sock.set_read_timeout(Some(timeout))?;
                let mut buf = vec![0u8; max.max(1)];
                let n = (&*sock).read(&mut buf)?;
                buf.truncate(n);
                Ok(buf)
            })
            .await
        }
    }

}

#[async_trait]
impl SocketConnector for BluezSockets {
    #[cfg(target_os = "linux")]
    async fn connect(
        &self,
        addr: BdAddr,
        transport: Transport,
        channel: u16,
        timeout: Duration,
    ) -> BlueResult<Box<dyn BtSocket>> {
        imp::connect(addr, transport, channel, timeout).await
    }

    #[cfg(not(target_os = "linux"))]
    async fn connect(
        &self,
        _addr: BdAddr,
        transport: Transport,
        _channel: u16,
        _timeout: Duration,
    ) -> BlueResult<Box<dyn BtSocket>> {
        Err(BlueError::Resource(format!("{} sockets need a Linux host", transport)))
    }
}
