//! Incremental HTTP/1.1 request parsing over a growable byte buffer.
//!
//! [`parse`] is called every time new bytes arrive on a connection. It
//! either reports that more data is needed, that the buffered bytes don't
//! form a valid request, or that a full request is ready — in which case
//! it also reports how many bytes of the buffer it consumed, so the
//! caller can keep whatever pipelined bytes follow.

use crate::error::{ErrorKind, Result};

/// Refuse to buffer headers past this size; a legitimate request never
/// needs more.
const MAX_HEADER_SIZE: usize = 2048;

/// Reject a request with more header lines than this before the blank line.
const MAX_HEADERS: usize = 32;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Tries to parse one HTTP request out of the front of `buf`.
///
/// Returns `Ok(None)` when the buffer holds an incomplete request (more
/// bytes needed), `Ok(Some((request, consumed)))` when a full request was
/// parsed, and `Err` when the buffered bytes are not a well-formed
/// request at all.
pub fn parse(buf: &[u8]) -> Result<Option<(Request, usize)>> {
    let header_end = match find_subslice(buf, b"\r\n\r\n") {
        Some(pos) => pos + 4,
        None => {
            if buf.len() > MAX_HEADER_SIZE {
                return Err(ErrorKind::Runtime.into());
            }
            return Ok(None);
        }
    };

    let head = std::str::from_utf8(&buf[..header_end - 4]).map_err(|_| ErrorKind::Runtime)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ErrorKind::Runtime)?;
    let mut parts = request_line.split(' ');
    let method = parts.next().ok_or(ErrorKind::Runtime)?.to_string();
    let uri = parts.next().ok_or(ErrorKind::Runtime)?.to_string();
    let version = parts.next().ok_or(ErrorKind::Runtime)?;
    if version != "HTTP/1.1" {
        return Err(ErrorKind::Runtime.into());
    }

    let mut headers = Vec::new();
    let mut content_length: usize = 0;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(ErrorKind::Runtime.into());
        }
        let (key, value) = line.split_once(':').ok_or(ErrorKind::Runtime)?;
        let key = key.trim().to_string();
        let value = value.trim().to_string();
        if key.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().map_err(|_| ErrorKind::Runtime)?;
        }
        headers.push((key, value));
    }

    let total_needed = header_end + content_length;
    if buf.len() < total_needed {
        return Ok(None);
    }

    let body = buf[header_end..total_needed].to_vec();
    Ok(Some((Request { method, uri, headers, body }, total_needed)))
}

/// Extracts the `name=value` query parameter from a request URI, the way
/// the original imgFS wire format encodes `res`, `img_id`, and `name`.
pub fn get_var<'a>(uri: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = uri.split_once('?')?;
    for pair in query.split('&') {
        let (k, v) = pair.split_once('=')?;
        if k == name {
            return Some(v);
        }
    }
    None
}

/// The URI with any `?query` stripped.
pub fn path_of(uri: &str) -> &str {
    uri.split_once('?').map(|(p, _)| p).unwrap_or(uri)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_get_request() {
        let raw = b"GET /imgfs/list HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, consumed) = parse(raw).unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.uri, "/imgfs/list");
        assert_eq!(req.header("host"), Some("localhost"));
        assert_eq!(consumed, raw.len());
    }

    #[test]
    fn reports_incomplete_headers() {
        let raw = b"GET /imgfs/list HTTP/1.1\r\nHost: localhost\r\n";
        assert!(parse(raw).unwrap().is_none());
    }

    #[test]
    fn waits_for_full_body_before_completing() {
        let raw = b"POST /imgfs/insert?name=a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel";
        assert!(parse(raw).unwrap().is_none());

        let full = b"POST /imgfs/insert?name=a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let (req, consumed) = parse(full).unwrap().unwrap();
        assert_eq!(req.body, b"hello");
        assert_eq!(consumed, full.len());
    }

    #[test]
    fn leaves_pipelined_bytes_for_the_next_parse() {
        let raw = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let (first, consumed) = parse(raw).unwrap().unwrap();
        assert_eq!(first.uri, "/a");
        let (second, _) = parse(&raw[consumed..]).unwrap().unwrap();
        assert_eq!(second.uri, "/b");
    }

    #[test]
    fn rejects_malformed_request_line() {
        let raw = b"NOTHTTPATALL\r\n\r\n";
        assert!(parse(raw).is_err());
    }

    #[test]
    fn rejects_http_1_0() {
        let raw = b"GET /imgfs/list HTTP/1.0\r\n\r\n";
        assert!(parse(raw).is_err());
    }

    #[test]
    fn rejects_too_many_headers() {
        let mut raw = b"GET /imgfs/list HTTP/1.1\r\n".to_vec();
        for i in 0..MAX_HEADERS + 1 {
            raw.extend_from_slice(format!("X-Num-{i}: {i}\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(parse(&raw).is_err());
    }

    #[test]
    fn get_var_extracts_named_parameter() {
        assert_eq!(get_var("/imgfs/read?res=thumb&img_id=cat", "img_id"), Some("cat"));
        assert_eq!(get_var("/imgfs/read?res=thumb&img_id=cat", "res"), Some("thumb"));
        assert_eq!(get_var("/imgfs/read?res=thumb", "img_id"), None);
        assert_eq!(get_var("/imgfs/read", "img_id"), None);
    }
}
