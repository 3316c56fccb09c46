use std::time::{SystemTime, UNIX_EPOCH};

use super::status::reason_phrase;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Coarse RFC-1123-shaped timestamp (no leap-second table) - good enough for
/// a `Date` header, not meant for calendar arithmetic.
fn http_date(now: SystemTime) -> String {
    let secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = secs / 86_400;
    let time_of_day = secs % 86_400;
    let (h, m, s) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    let weekday = WEEKDAYS[((days + 4) % 7) as usize];

    let mut year = 1970i64;
    let mut remaining_days = days as i64;
    loop {
        let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
        let year_len = if leap { 366 } else { 365 };
        if remaining_days < year_len {
            break;
        }
        remaining_days -= year_len;
        year += 1;
    }
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let month_lens = [31, if leap { 29 } else { 28 }, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 0;
    for (i, len) in month_lens.iter().enumerate() {
        if remaining_days < *len {
            month = i;
            break;
        }
        remaining_days -= len;
    }
    let day = remaining_days + 1;

    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        weekday, day, MONTHS[month], year, h, m, s
    )
}

/// Status line + headers + body, tracked with a send cursor so partial
/// writes on a non-blocking socket resume at the right offset.
pub struct Response {
    pub status: u16,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    serialized: Option<Vec<u8>>,
    sent: usize,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            serialized: None,
            sent: 0,
        }
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        if let Some(entry) = self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            entry.1 = value.into();
        } else {
            self.headers.push((name.to_string(), value.into()));
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Fills in the always-set headers this server guarantees on every
    /// response, without overwriting anything the handler already set.
    pub fn finalize(&mut self, connection_close: bool) {
        if !self.has_header("Content-Type") {
            self.set_header("Content-Type", "text/html; charset=utf-8");
        }
        self.set_header("Content-Length", self.body.len().to_string());
        self.set_header("Server", "originserver");
        self.set_header("Date", http_date(SystemTime::now()));
        if connection_close {
            self.set_header("Connection", "close");
        } else if !self.has_header("Connection") {
            self.set_header("Connection", "keep-alive");
        }
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.body.len());
        buf.extend_from_slice(
            format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status)).as_bytes(),
        );
        for (name, value) in &self.headers {
            buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(&self.body);
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the next chunk of bytes to write, building the serialized
    /// form on first use.
    pub fn pending(&mut self) -> &[u8] {
        if self.serialized.is_none() {
            self.serialized = Some(self.serialize());
        }
        &self.serialized.as_ref().unwrap()[self.sent..]
    }

    pub fn mark_sent(&mut self, n: usize) {
        self.sent += n;
    }

    pub fn is_fully_sent(&self) -> bool {
        match &self.serialized {
            Some(buf) => self.sent >= buf.len(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_round_trips_status_and_body() {
        let mut r = Response::new(404).with_body(b"<h1>404</h1>".to_vec());
        r.finalize(true);
        let bytes = r.pending().to_vec();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 12\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("<h1>404</h1>\r\n"));
    }

    #[test]
    fn partial_writes_resume_from_cursor() {
        let mut r = Response::new(200).with_body(b"abcdef".to_vec());
        r.finalize(false);
        let first_len = r.pending().len();
        r.mark_sent(first_len - 3);
        assert_eq!(r.pending(), b"f\r\n");
        r.mark_sent(3);
        assert!(r.is_fully_sent());
    }

    #[test]
    fn keep_alive_is_the_default() {
        let mut r = Response::new(200).with_body(Vec::new());
        r.finalize(false);
        let text = String::from_utf8(r.pending().to_vec()).unwrap();
        assert!(text.contains("Connection: keep-alive\r\n"));
    }
}
