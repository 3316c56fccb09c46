use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use mio::unix::SourceFd;
use mio::{Interest, Token};

use crate::config::ListenerGroup;
use crate::error::Result;
use crate::net::{Connection, Listener, ReadinessMux};
use crate::router;
use crate::{error, info};

const CONTROL_TOKEN: Token = Token(0);
const LISTENER_TOKEN_BASE: usize = 1;
const CONNECTION_TOKEN_BASE: usize = 1_000_000;
const MAX_EVENTS: usize = 1024;

/// The single-threaded orchestrator: owns the readiness mux, every listener
/// and connection, and the control stream, driving the loop in one place.
pub struct Engine {
    mux: ReadinessMux,
    listeners: Vec<Listener>,
    groups: HashMap<Token, ListenerGroup>,
    connections: HashMap<Token, Connection>,
    next_connection_token: usize,
    control: BufReader<std::io::Stdin>,
    alive: bool,
}

impl Engine {
    pub fn new(groups: Vec<ListenerGroup>) -> Result<Self> {
        let mut mux = ReadinessMux::new(MAX_EVENTS)?;

        let mut listeners = Vec::new();
        let mut token_groups = HashMap::new();
        for (idx, group) in groups.into_iter().enumerate() {
            let token = Token(LISTENER_TOKEN_BASE + idx);
            let listener = Listener::bind(&group.host, group.port, token, &mut mux)?;
            listeners.push(listener);
            token_groups.insert(token, group);
        }

        let stdin = std::io::stdin();
        let control_fd = stdin.as_raw_fd();
        mux.register(&mut SourceFd(&control_fd), CONTROL_TOKEN, Interest::READABLE)?;

        Ok(Engine {
            mux,
            listeners,
            groups: token_groups,
            connections: HashMap::new(),
            next_connection_token: CONNECTION_TOKEN_BASE,
            control: BufReader::new(stdin),
            alive: true,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        while self.alive || !self.connections.is_empty() {
            let timeout = Some(Duration::from_secs(1));
            let ready_tokens: Vec<(Token, bool, bool, bool)> = {
                let batch = self.mux.wait(timeout)?;
                batch
                    .iter()
                    .map(|e| (e.token(), e.is_readable(), e.is_writable(), e.is_error() || e.is_read_closed() && e.is_write_closed()))
                    .collect()
            };

            for (token, readable, writable, hung_up) in ready_tokens {
                if token == CONTROL_TOKEN {
                    self.handle_control();
                } else if hung_up {
                    self.close_connection(token);
                } else if token.0 >= CONNECTION_TOKEN_BASE {
                    if readable {
                        self.handle_read(token);
                    } else if writable {
                        self.handle_write(token);
                    }
                } else if readable {
                    self.accept_one(token);
                }
            }

            self.sweep_idle();
        }
        Ok(())
    }

    fn accept_one(&mut self, listener_token: Token) {
        let Some(listener) = self.listeners.iter_mut().find(|l| l.token == listener_token) else {
            return;
        };
        let Some((mut stream, peer)) = listener.accept_one() else {
            return;
        };

        let token = Token(self.next_connection_token);
        self.next_connection_token += 1;

        if let Err(e) = self.mux.register(&mut stream, token, Interest::READABLE) {
            error!("failed to register accepted connection: {e}");
            return;
        }

        let conn = Connection::accepted(stream, peer, listener_token, Instant::now());
        self.connections.insert(token, conn);
    }

    fn handle_read(&mut self, token: Token) {
        let now = Instant::now();
        let Some(conn) = self.connections.get_mut(&token) else { return };

        match conn.on_read_ready(now) {
            crate::net::ReadOutcome::Error | crate::net::ReadOutcome::Eof => {
                self.close_connection(token);
            }
            crate::net::ReadOutcome::Wait => {}
            crate::net::ReadOutcome::Ready => {
                self.build_and_flip_to_write(token);
            }
        }
    }

    fn build_and_flip_to_write(&mut self, token: Token) {
        let group_server = {
            let Some(conn) = self.connections.get(&token) else { return };
            let Some(group) = self.groups.get(&conn.listener_token) else { return };
            let host = conn.request().map(|r| r.host().to_string()).unwrap_or_default();
            router::get_vhost(group, &host)
        };

        let Some(conn) = self.connections.get_mut(&token) else { return };
        conn.build_response(&group_server);

        if let Err(e) = self.reregister(token, Interest::WRITABLE) {
            error!("failed to reregister for write: {e}");
            self.close_connection(token);
        }
    }

    fn handle_write(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else { return };

        let status = conn.response_status();
        let method = conn.request().map(|r| r.method.to_string());
        let uri_path = conn.request().map(|r| r.uri_path.clone());
        let arrived_at = conn.request().map(|r| r.arrived_at);
        let peer = conn.peer;
        let listener_token = conn.listener_token;

        match conn.on_write_ready() {
            crate::net::WriteOutcome::More => {}
            crate::net::WriteOutcome::Error => self.close_connection(token),
            crate::net::WriteOutcome::Done { keep_alive } => {
                if let (Some(status), Some(method), Some(uri_path), Some(arrived_at)) =
                    (status, method, uri_path, arrived_at)
                {
                    let server_addr = self.listeners.iter().find(|l| l.token == listener_token).map(|l| l.addr);
                    log_access(&method, &uri_path, status, arrived_at, peer, server_addr);
                }

                if keep_alive {
                    let now = Instant::now();
                    if let Some(conn) = self.connections.get_mut(&token) {
                        conn.reset_for_next_request(now);
                    }
                    if let Err(e) = self.reregister(token, Interest::READABLE) {
                        error!("failed to reregister for read: {e}");
                        self.close_connection(token);
                    }
                } else {
                    self.close_connection(token);
                }
            }
        }
    }

    fn reregister(&mut self, token: Token, interest: Interest) -> std::io::Result<()> {
        let Some(conn) = self.connections.get_mut(&token) else {
            return Ok(());
        };
        self.mux.reregister(&mut conn.stream, token, interest)
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.mux.deregister(&mut conn.stream);
        }
    }

    fn sweep_idle(&mut self) {
        let now = Instant::now();
        let expired: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, c)| c.is_expired(now))
            .map(|(t, _)| *t)
            .collect();
        for token in expired {
            self.close_connection(token);
        }
    }

    fn handle_control(&mut self) {
        let mut line = String::new();
        if self.control.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        match line.trim() {
            "quit" | "exit" => {
                info!("graceful shutdown requested");
                self.alive = false;
            }
            _ => {}
        }
    }
}

fn log_access(
    method: &str,
    uri_path: &str,
    status: u16,
    arrived_at: Instant,
    peer: std::net::SocketAddr,
    server_addr: Option<std::net::SocketAddr>,
) {
    let duration = arrived_at.elapsed();
    let duration_str = if duration.as_secs() >= 1 {
        format!("{:.3}s", duration.as_secs_f64())
    } else if duration.as_millis() >= 1 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}us", duration.as_micros())
    };

    let target = if uri_path.len() > 18 {
        format!("{}..", &uri_path[..18])
    } else {
        format!("{:<20}", uri_path)
    };

    let color = match status {
        200..=299 => "32",
        300..=399 => "36",
        400..=499 => "33",
        _ => "31",
    };

    let server = server_addr.map(|a| a.to_string()).unwrap_or_else(|| "?".to_string());

    info!(
        "{method} {target} \x1b[{color}m{status}\x1b[0m {duration_str} {peer} -> {server}"
    );
}
