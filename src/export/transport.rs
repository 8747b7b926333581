use std::io;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use crate::config::Protocol;

/// Destination for serialized records. Each call carries exactly one JSON
/// object; no delimiter or length prefix is added.
#[async_trait]
pub trait Transport: Send {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()>;
}

/// One datagram per record. The socket must already be `connect()`ed.
#[async_trait]
impl Transport for UdpSocket {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        self.send(buf).await.map(|_| ())
    }
}

/// Records are written back-to-back onto the stream.
#[async_trait]
impl Transport for TcpStream {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf).await
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write_record(buf).await
    }
}

// ─── Connection ──────────────────────────────────────────────────

/// An established UDP or TCP connection to the collector.
#[derive(Debug)]
pub enum Connection {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Connection {
    /// Resolve `addr` and connect with the given protocol. For UDP this
    /// binds an ephemeral local port of the matching address family.
    pub async fn connect(protocol: Protocol, addr: &str) -> io::Result<Self> {
        match protocol {
            Protocol::Tcp => Ok(Self::Tcp(TcpStream::connect(addr).await?)),
            Protocol::Udp => {
                let remote = tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("no address for {addr}"))
                })?;
                let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(remote).await?;
                Ok(Self::Udp(socket))
            }
        }
    }
}

#[async_trait]
impl Transport for Connection {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Udp(s) => s.write_record(buf).await,
            Self::Tcp(s) => s.write_record(buf).await,
        }
    }
}
