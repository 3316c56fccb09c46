use std::io;
use std::net::SocketAddr;

use mio::net::TcpListener as MioTcpListener;
use mio::{Interest, Token};

use crate::{error, info};

use super::readiness::ReadinessMux;

/// One non-blocking TCP listener per configured `(host, port)` pair. mio
/// binds with a listen backlog of 1024, comfortably above the 128 floor.
pub struct Listener {
    pub token: Token,
    pub addr: SocketAddr,
    inner: MioTcpListener,
}

impl Listener {
    pub fn bind(host: &str, port: u16, token: Token, mux: &mut ReadinessMux) -> io::Result<Self> {
        let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid bind address {host}:{port}"))
        })?;
        let mut inner = MioTcpListener::bind(addr)?;
        mux.register(&mut inner, token, Interest::READABLE)?;
        info!("listening on {addr}");
        Ok(Listener { token, addr, inner })
    }

    /// Accepts exactly one connection per wake, per the level-triggered
    /// readiness contract - the Engine will be woken again if more are
    /// pending.
    pub fn accept_one(&mut self) -> Option<(mio::net::TcpStream, SocketAddr)> {
        match self.inner.accept() {
            Ok(pair) => Some(pair),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => None,
            Err(e) => {
                error!("accept failed on {}: {e}", self.addr);
                None
            }
        }
    }
}
