//! Injected fetch capability: the resolver asks for `(status, body)` and
//! stays out of transport concerns (timeouts included).
//!
//! The default `HttpFetcher` speaks plain HTTP/1.1 over `TcpStream`, which is
//! all a link-local metadata-style endpoint needs. Anything else (TLS,
//! proxies) comes in through the `Fetch` trait.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// One fetched response: protocol status plus raw body bytes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub trait Fetch: Send + Sync {
    /// Issue one GET. Err means transport failure (connect/read/write);
    /// protocol-level failures come back in `FetchResponse::status`.
    fn get(&self, url: &str) -> Result<FetchResponse>;
}

/// Plain HTTP/1.1 GET over a TCP socket with read/write timeouts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms.max(1)),
        }
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        let (authority, path) = split_http_url(url)?;
        let stream = TcpStream::connect(&authority)
            .with_context(|| format!("connect {}", authority))?;
        stream.set_nodelay(true).ok();
        stream
            .set_read_timeout(Some(self.timeout))
            .context("set read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("set write timeout")?;

        let mut stream = stream;
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
            path, authority
        );
        stream
            .write_all(request.as_bytes())
            .with_context(|| format!("send request {}", url))?;

        let mut reader = BufReader::new(stream);
        let status = read_status_line(&mut reader)?;
        let content_length = read_headers(&mut reader)?;

        let mut body = Vec::new();
        match content_length {
            Some(n) => {
                body.resize(n, 0);
                reader
                    .read_exact(&mut body)
                    .with_context(|| format!("read body ({} bytes) from {}", n, url))?;
            }
            None => {
                // Connection: close — the peer ends the body with EOF.
                reader
                    .read_to_end(&mut body)
                    .with_context(|| format!("read body from {}", url))?;
            }
        }
        Ok(FetchResponse { status, body })
    }
}

/// Split `http://host[:port]/path?query` into `(host:port, /path?query)`.
fn split_http_url(url: &str) -> Result<(String, String)> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow!("unsupported url '{}': only http:// is handled here", url))?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        bail!("empty host in url '{}'", url);
    }
    let authority = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{}:80", authority)
    };
    Ok((authority, path.to_string()))
}

fn read_status_line(reader: &mut BufReader<TcpStream>) -> Result<u16> {
    let mut line = String::new();
    reader.read_line(&mut line).context("read status line")?;
    // "HTTP/1.1 200 OK"
    let code = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("malformed status line '{}'", line.trim_end()))?;
    code.parse::<u16>()
        .with_context(|| format!("malformed status code '{}'", code))
}

/// Consume headers up to the blank line; return Content-Length if present.
fn read_headers(reader: &mut BufReader<TcpStream>) -> Result<Option<usize>> {
    let mut content_length = None;
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).context("read header line")?;
        if n == 0 {
            bail!("connection closed inside headers");
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(content_length);
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            if key.eq_ignore_ascii_case("content-length") {
                content_length = Some(
                    value
                        .trim()
                        .parse::<usize>()
                        .with_context(|| format!("bad content-length '{}'", value.trim()))?,
                );
            }
        }
    }
}
