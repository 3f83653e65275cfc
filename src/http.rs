use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

// Request lines and headers together may not exceed this; anything larger
// is rejected as malformed.
pub const MAX_HEADER_BYTES: usize = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    pub fn parse(token: &str) -> Option<Method> {
        match token {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "OPTIONS" => Some(Method::Options),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn parse(token: &str) -> Option<Version> {
        match token {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// Case-insensitive header map. Multiple values per name are preserved in
/// insertion order; lookups return the first match.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value previously stored under `name`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        match self.target.find('?') {
            Some(idx) => &self.target[..idx],
            None => &self.target,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.target.find('?').map(|idx| &self.target[idx + 1..])
    }

    /// Keep-alive is the HTTP/1.1 default; `Connection` overrides in both
    /// directions.
    pub fn keep_alive(&self) -> bool {
        match self.headers.get("Connection") {
            Some(value) if value.eq_ignore_ascii_case("close") => false,
            Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version == Version::Http11,
        }
    }

    /// Full wire form: request line, headers in arrival order, blank line,
    /// body. The echo handler returns exactly this.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(self.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.target.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.version.as_str().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut response = Response::new(status);
        response.headers.set("Content-Type", content_type);
        response.body = body.into();
        response
    }

    pub fn text(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::with_body(status, "text/plain", body)
    }

    pub fn html(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::with_body(status, "text/html", body)
    }

    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::with_body(status, "application/json", body)
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            304 => "Not Modified",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            415 => "Unsupported Media Type",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    /// Wire form. Content-Length is always derived from the body here, so
    /// it stays authoritative no matter what a handler set earlier.
    pub fn serialize(&self, version: Version) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(version.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.status.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.reason().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"Content-Length: ");
        out.extend_from_slice(self.body.len().to_string().as_bytes());
        out.extend_from_slice(b"\r\n\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

// Trims trailing CR/LF and surrounding spaces or tabs.
fn trim_line(line: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = line.len();
    while end > start {
        match line[end - 1] {
            b'\r' | b'\n' | b' ' | b'\t' => end -= 1,
            _ => break,
        }
    }
    while start < end {
        match line[start] {
            b' ' | b'\t' => start += 1,
            _ => break,
        }
    }
    &line[start..end]
}

async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf).await
}

/// Reads one HTTP/1.x request. `Ok(None)` is a clean end-of-stream before
/// any byte of a request arrived; malformed input surfaces as
/// `ErrorKind::InvalidData`. Lines may end in LF or CRLF.
pub async fn read_request<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> io::Result<Option<Request>> {
    let mut line = Vec::with_capacity(128);

    // Tolerate blank lines between keep-alive requests.
    let request_line = loop {
        let n = read_line(reader, &mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        if n > MAX_HEADER_BYTES {
            return Err(invalid("request line too long"));
        }
        let trimmed = trim_line(&line);
        if !trimmed.is_empty() {
            break trimmed.to_vec();
        }
    };

    let text = std::str::from_utf8(&request_line).map_err(|_| invalid("non-ascii request line"))?;
    let mut parts = text.split_ascii_whitespace();
    let method = parts.next().and_then(Method::parse);
    let target = parts.next();
    let version = parts.next().and_then(Version::parse);
    let (method, target, version) = match (method, target, version, parts.next()) {
        (Some(m), Some(t), Some(v), None) => (m, t.to_string(), v),
        _ => return Err(invalid("malformed request line")),
    };
    if !target.starts_with('/') && target != "*" {
        return Err(invalid("malformed request target"));
    }

    let mut headers = Headers::new();
    let mut header_bytes = 0usize;
    loop {
        let n = read_line(reader, &mut line).await?;
        if n == 0 {
            return Err(invalid("connection closed inside headers"));
        }
        header_bytes += n;
        if header_bytes > MAX_HEADER_BYTES {
            return Err(invalid("headers too large"));
        }
        let trimmed = trim_line(&line);
        if trimmed.is_empty() {
            break;
        }
        let text = std::str::from_utf8(trimmed).map_err(|_| invalid("non-ascii header"))?;
        let (name, value) = text.split_once(':').ok_or_else(|| invalid("header without colon"))?;
        if name.is_empty() || name.contains(' ') {
            return Err(invalid("malformed header name"));
        }
        headers.append(name, value.trim());
    }

    let mut body = Vec::new();
    if let Some(len) = headers.get("Content-Length") {
        let len: usize = len.trim().parse().map_err(|_| invalid("bad content-length"))?;
        body.resize(len, 0);
        reader.read_exact(&mut body).await?;
    }

    Ok(Some(Request {
        method,
        target,
        version,
        headers,
        body,
    }))
}
