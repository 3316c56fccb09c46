use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;

use super::method::Method;

pub const MAX_REQUEST_LINE: usize = 8192;
pub const MAX_HEADER_SECTION: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    None,
    UrlEncoded,
    Multipart,
}

#[derive(Debug)]
pub struct Request {
    pub arrived_at: Instant,
    pub method: Method,
    pub uri_path: String,
    pub query: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub body_size: usize,
    pub form_kind: FormKind,
    pub connection_close: bool,
    pub http_code: u16,
    pub headers_ready: bool,
    pub body_ready: bool,
    pub chunked: bool,
}

impl Request {
    fn new(arrived_at: Instant) -> Self {
        Request {
            arrived_at,
            method: Method::Unknown,
            uri_path: String::new(),
            query: String::new(),
            version: String::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            body_size: 0,
            form_kind: FormKind::None,
            connection_close: false,
            http_code: 200,
            headers_ready: false,
            body_ready: false,
            chunked: false,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn host(&self) -> &str {
        self.header("host").unwrap_or("")
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Phase {
    ReadingRequestLine,
    ReadingHeaders,
    ReadingBody,
    Complete,
    Failed(u16),
}

#[derive(Debug)]
pub enum ParseOutcome {
    Wait,
    Complete,
    Failed(u16),
}

enum ChunkPhase {
    Size,
    Data(usize),
    TrailingCrlf,
}

/// Incremental HTTP/1.1 parser driven by repeated byte appends. Tolerant of
/// arbitrary buffer splits: feeding the same bytes in one call or many
/// produces the same `Request`.
pub struct RequestParser {
    buf: Vec<u8>,
    phase: Phase,
    header_bytes_consumed: usize,
    content_length: usize,
    chunk_phase: ChunkPhase,
    dechunked: Vec<u8>,
    request: Request,
}

impl RequestParser {
    pub fn new(now: Instant) -> Self {
        RequestParser {
            buf: Vec::new(),
            phase: Phase::ReadingRequestLine,
            header_bytes_consumed: 0,
            content_length: 0,
            chunk_phase: ChunkPhase::Size,
            dechunked: Vec::new(),
            request: Request::new(now),
        }
    }

    /// Appends freshly-read bytes and drives the state machine forward as
    /// far as the currently buffered data allows.
    pub fn feed(&mut self, bytes: &[u8]) -> ParseOutcome {
        self.buf.extend_from_slice(bytes);
        self.advance()
    }

    pub fn take_request(self) -> Request {
        self.request
    }

    fn fail(&mut self, code: u16) -> ParseOutcome {
        self.phase = Phase::Failed(code);
        self.request.http_code = code;
        self.request.connection_close = true;
        ParseOutcome::Failed(code)
    }

    fn advance(&mut self) -> ParseOutcome {
        loop {
            match self.phase {
                Phase::ReadingRequestLine => match self.try_parse_request_line() {
                    Some(Ok(())) => continue,
                    Some(Err(code)) => return self.fail(code),
                    None => return ParseOutcome::Wait,
                },
                Phase::ReadingHeaders => match self.try_parse_header_line() {
                    Some(Ok(())) => continue,
                    Some(Err(code)) => return self.fail(code),
                    None => return ParseOutcome::Wait,
                },
                Phase::ReadingBody => match self.try_parse_body() {
                    Some(Ok(())) => continue,
                    Some(Err(code)) => return self.fail(code),
                    None => return ParseOutcome::Wait,
                },
                Phase::Complete => return ParseOutcome::Complete,
                Phase::Failed(code) => return ParseOutcome::Failed(code),
            }
        }
    }

    fn find_crlf(&self, from: usize) -> Option<usize> {
        self.buf[from..].windows(2).position(|w| w == b"\r\n").map(|p| p + from)
    }

    fn try_parse_request_line(&mut self) -> Option<Result<(), u16>> {
        let end = self.find_crlf(0)?;
        if end > MAX_REQUEST_LINE {
            return Some(Err(414));
        }
        let line = match std::str::from_utf8(&self.buf[..end]) {
            Ok(s) => s,
            Err(_) => return Some(Err(400)),
        };

        let mut parts = line.splitn(3, ' ');
        let method_tok = parts.next().unwrap_or("");
        let target = parts.next().unwrap_or("");
        let version = parts.next().unwrap_or("");

        if method_tok.is_empty() || target.is_empty() || version.is_empty() {
            return Some(Err(400));
        }
        if target.len() > MAX_REQUEST_LINE {
            return Some(Err(414));
        }
        if !target.starts_with('/') {
            return Some(Err(400));
        }
        if !version.eq_ignore_ascii_case("HTTP/1.1") {
            return Some(Err(505));
        }

        let method = Method::from_str(method_tok).unwrap();
        if method == Method::Unknown {
            return Some(Err(501));
        }

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (target.to_string(), String::new()),
        };

        self.request.method = method;
        self.request.uri_path = path;
        self.request.query = query;
        self.request.version = version.to_string();

        self.buf.drain(..end + 2);
        self.phase = Phase::ReadingHeaders;
        Some(Ok(()))
    }

    fn try_parse_header_line(&mut self) -> Option<Result<(), u16>> {
        let end = self.find_crlf(0)?;

        if end == 0 {
            self.buf.drain(..2);
            return Some(self.finish_headers());
        }

        self.header_bytes_consumed += end + 2;
        if self.header_bytes_consumed > MAX_HEADER_SECTION {
            return Some(Err(431));
        }

        let line = match std::str::from_utf8(&self.buf[..end]) {
            Ok(s) => s,
            Err(_) => return Some(Err(400)),
        };
        let Some((name, value)) = line.split_once(':') else {
            return Some(Err(400));
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if name.is_empty() {
            return Some(Err(400));
        }

        self.request.headers.insert(name, value);

        self.buf.drain(..end + 2);
        Some(Ok(()))
    }

    fn finish_headers(&mut self) -> Result<(), u16> {
        let host = self.request.header("host").unwrap_or("").to_string();
        if host.is_empty() {
            return Err(400);
        }

        if let Some(conn) = self.request.header("connection") {
            if conn.eq_ignore_ascii_case("close") {
                self.request.connection_close = true;
            }
        }

        if let Some(ct) = self.request.header("content-type") {
            if ct.starts_with("application/x-www-form-urlencoded") {
                self.request.form_kind = FormKind::UrlEncoded;
            } else if ct.starts_with("multipart/form-data") {
                self.request.form_kind = FormKind::Multipart;
            }
        }

        if self.request.method == Method::Post {
            if self.request.header("content-type").is_none() {
                return Err(400);
            }
            let chunked = self
                .request
                .header("transfer-encoding")
                .map(|v| v.to_ascii_lowercase().contains("chunked"))
                .unwrap_or(false);

            if chunked {
                self.request.chunked = true;
            } else {
                let len = match self.request.header("content-length") {
                    Some(v) => v.trim().parse::<usize>().map_err(|_| 400u16)?,
                    None => return Err(400),
                };
                self.request.body_size = len;
            }
        }

        self.request.headers_ready = true;

        if self.request.method != Method::Post {
            self.phase = Phase::Complete;
        } else {
            self.phase = Phase::ReadingBody;
        }
        Ok(())
    }

    fn try_parse_body(&mut self) -> Option<Result<(), u16>> {
        if self.request.chunked {
            self.try_parse_chunked_body()
        } else {
            if self.buf.len() < self.request.body_size {
                return None;
            }
            self.request.body = self.buf.drain(..self.request.body_size).collect();
            self.request.body_ready = true;
            self.phase = Phase::Complete;
            Some(Ok(()))
        }
    }

    fn try_parse_chunked_body(&mut self) -> Option<Result<(), u16>> {
        loop {
            match self.chunk_phase {
                ChunkPhase::Size => {
                    let end = self.find_crlf(0)?;
                    let line = std::str::from_utf8(&self.buf[..end]).ok()?;
                    let size_str = line.split(';').next().unwrap_or("").trim();
                    let size = match usize::from_str_radix(size_str, 16) {
                        Ok(n) => n,
                        Err(_) => return Some(Err(400)),
                    };
                    self.buf.drain(..end + 2);
                    if size == 0 {
                        self.request.body = std::mem::take(&mut self.dechunked);
                        self.request.body_size = self.request.body.len();
                        self.request.body_ready = true;
                        self.phase = Phase::Complete;
                        return Some(Ok(()));
                    }
                    self.chunk_phase = ChunkPhase::Data(size);
                }
                ChunkPhase::Data(size) => {
                    if self.buf.len() < size {
                        return None;
                    }
                    self.dechunked.extend(self.buf.drain(..size));
                    self.chunk_phase = ChunkPhase::TrailingCrlf;
                }
                ChunkPhase::TrailingCrlf => {
                    if self.buf.len() < 2 {
                        return None;
                    }
                    if &self.buf[..2] != b"\r\n" {
                        return Some(Err(400));
                    }
                    self.buf.drain(..2);
                    self.chunk_phase = ChunkPhase::Size;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get_in_one_shot() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(matches!(outcome, ParseOutcome::Complete));
        let req = p.take_request();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.uri_path, "/index.html");
        assert_eq!(req.host(), "x");
    }

    #[test]
    fn split_across_many_reads_matches_one_shot() {
        let whole = b"GET /a?b=c HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n";
        let mut one_shot = RequestParser::new(Instant::now());
        one_shot.feed(whole);
        let expected = one_shot.take_request();

        let mut split = RequestParser::new(Instant::now());
        let mut outcome = ParseOutcome::Wait;
        for byte in whole {
            outcome = split.feed(&[*byte]);
        }
        assert!(matches!(outcome, ParseOutcome::Complete));
        let got = split.take_request();

        assert_eq!(got.uri_path, expected.uri_path);
        assert_eq!(got.query, expected.query);
        assert_eq!(got.connection_close, expected.connection_close);
    }

    #[test]
    fn header_section_over_limit_is_431() {
        let mut p = RequestParser::new(Instant::now());
        p.feed(b"GET / HTTP/1.1\r\n");
        let huge_value = "a".repeat(MAX_HEADER_SECTION);
        let outcome = p.feed(format!("X-Big: {huge_value}\r\n\r\n").as_bytes());
        assert!(matches!(outcome, ParseOutcome::Failed(431)));
    }

    #[test]
    fn request_uri_over_limit_is_414() {
        let mut p = RequestParser::new(Instant::now());
        let long_path = "A".repeat(MAX_REQUEST_LINE);
        let outcome = p.feed(format!("GET /{long_path} HTTP/1.1\r\nHost: x\r\n\r\n").as_bytes());
        assert!(matches!(outcome, ParseOutcome::Failed(414)));
    }

    #[test]
    fn unknown_method_is_501() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(b"FROB / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(matches!(outcome, ParseOutcome::Failed(501)));
    }

    #[test]
    fn wrong_version_is_505() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n");
        assert!(matches!(outcome, ParseOutcome::Failed(505)));
    }

    #[test]
    fn missing_host_is_400() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(b"GET / HTTP/1.1\r\n\r\n");
        assert!(matches!(outcome, ParseOutcome::Failed(400)));
    }

    #[test]
    fn chunked_body_dechunks_in_order() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(
            b"POST /x HTTP/1.1\r\nHost:x\r\nTransfer-Encoding:chunked\r\nContent-Type:text/plain\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        );
        assert!(matches!(outcome, ParseOutcome::Complete));
        let req = p.take_request();
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn content_length_body_waits_for_full_payload() {
        let mut p = RequestParser::new(Instant::now());
        let outcome = p.feed(b"POST /u HTTP/1.1\r\nHost:x\r\nContent-Length:5\r\nContent-Type:text/plain\r\n\r\nhel");
        assert!(matches!(outcome, ParseOutcome::Wait));
        let outcome = p.feed(b"lo");
        assert!(matches!(outcome, ParseOutcome::Complete));
        assert_eq!(p.take_request().body, b"hello");
    }
}
