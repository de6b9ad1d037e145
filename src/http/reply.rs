//! Builds raw HTTP/1.1 response bytes. No status-line or header table is
//! owned by a framework here — the server writes exactly the bytes this
//! module hands it.

use crate::error::ErrorKind;

pub fn ok(content_type: &str, body: &[u8]) -> Vec<u8> {
    build("200 OK", &[("Content-Type", content_type)], body)
}

pub fn found(location: &str) -> Vec<u8> {
    build("302 Found", &[("Location", location)], &[])
}

/// Every core-operation failure becomes a 500 carrying the error's
/// message, mirroring how the original CLI and server both surface
/// `ERR_*` codes as plain text.
pub fn error(kind: ErrorKind) -> Vec<u8> {
    let msg = format!("Error: {kind}\n");
    build("500 Internal Server Error", &[("Content-Type", "text/plain")], msg.as_bytes())
}

pub fn bad_request() -> Vec<u8> {
    build("400 Bad Request", &[("Content-Type", "text/plain")], b"Malformed request")
}

fn build(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status}\r\n").into_bytes();
    for (key, value) in headers {
        out.extend_from_slice(format!("{key}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(body);
    out
}
