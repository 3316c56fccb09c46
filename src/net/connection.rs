use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::TcpStream;
use mio::Token;

use crate::config::{Block, ServerBlock};
use crate::handlers;
use crate::http::{ParseOutcome, Request, RequestParser, Response};
use crate::router;

pub const READ_BUF_SIZE: usize = 4096;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq, Eq)]
pub enum State {
    Reading,
    Dispatching,
    Writing,
    Closing,
}

pub enum ReadOutcome {
    Error,
    Eof,
    Wait,
    Ready,
}

pub enum WriteOutcome {
    More,
    Done { keep_alive: bool },
    Error,
}

/// Per-client connection state: the socket, inbound byte buffer via the
/// streaming parser, and (once dispatched) the outbound response.
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    /// Token of the `Listener` that accepted this connection - kept so the
    /// Engine can resolve back to the owning listener group and bind
    /// address without guessing at dispatch time.
    pub listener_token: Token,
    pub state: State,
    pub last_activity: Instant,
    parser: Option<RequestParser>,
    request: Option<Request>,
    response: Option<Response>,
}

impl Connection {
    pub fn accepted(stream: TcpStream, peer: SocketAddr, listener_token: Token, now: Instant) -> Self {
        Connection {
            stream,
            peer,
            listener_token,
            state: State::Reading,
            last_activity: now,
            parser: Some(RequestParser::new(now)),
            request: None,
            response: None,
        }
    }

    pub fn on_read_ready(&mut self, now: Instant) -> ReadOutcome {
        let mut scratch = [0u8; READ_BUF_SIZE];
        match self.stream.read(&mut scratch) {
            Ok(0) => {
                self.state = State::Closing;
                ReadOutcome::Eof
            }
            Ok(n) => {
                self.last_activity = now;
                let parser = self.parser.as_mut().expect("Reading state always has a parser");
                match parser.feed(&scratch[..n]) {
                    ParseOutcome::Wait => ReadOutcome::Wait,
                    ParseOutcome::Complete => {
                        let parser = self.parser.take().unwrap();
                        self.request = Some(parser.take_request());
                        self.state = State::Dispatching;
                        ReadOutcome::Ready
                    }
                    ParseOutcome::Failed(_) => {
                        let parser = self.parser.take().unwrap();
                        self.request = Some(parser.take_request());
                        self.state = State::Dispatching;
                        ReadOutcome::Ready
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => ReadOutcome::Wait,
            Err(_) => {
                self.state = State::Closing;
                ReadOutcome::Error
            }
        }
    }

    /// Runs the handler pipeline exactly once between `Ready` and the first
    /// `on_write_ready`. Panics if called twice for the same request - the
    /// Engine enforces the one-shot edge by only calling this from the
    /// `Dispatching` state.
    pub fn build_response(&mut self, group_server: &Arc<ServerBlock>) {
        assert_eq!(self.state, State::Dispatching, "build_response is a one-shot edge");

        let request = self.request.as_ref().expect("Dispatching state always has a request");

        let mut response = if request.http_code >= 400 {
            handlers::error_page::render(group_server.as_ref(), &Block::Server(group_server.clone()), request.http_code)
        } else {
            let block = router::get_block(group_server, &request.uri_path);
            handlers::dispatch(request, group_server, &block)
        };

        response.finalize(request.connection_close);
        self.response = Some(response);
        self.state = State::Writing;
    }

    pub fn on_write_ready(&mut self) -> WriteOutcome {
        let connection_close = self.request.as_ref().map(|r| r.connection_close).unwrap_or(true);
        let response = self.response.as_mut().expect("Writing state always has a response");

        let pending = response.pending();
        if pending.is_empty() {
            self.state = State::Closing;
            return WriteOutcome::Done { keep_alive: !connection_close };
        }

        match self.stream.write(pending) {
            Ok(0) => WriteOutcome::Error,
            Ok(n) => {
                response.mark_sent(n);
                if response.is_fully_sent() {
                    self.state = State::Closing;
                    WriteOutcome::Done { keep_alive: !connection_close }
                } else {
                    WriteOutcome::More
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => WriteOutcome::More,
            Err(_) => WriteOutcome::Error,
        }
    }

    /// Resets for the next request on a keep-alive connection.
    pub fn reset_for_next_request(&mut self, now: Instant) {
        self.parser = Some(RequestParser::new(now));
        self.request = None;
        self.response = None;
        self.last_activity = now;
        self.state = State::Reading;
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_activity) > IDLE_TIMEOUT
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn response_status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}
