//! Routes parsed requests to the store, the way the original server's
//! `handle_http_message` bridges the wire protocol to the core ops.

use parking_lot::Mutex;

use crate::error::ErrorKind;
use crate::format::Resolution;
use crate::http::framer::{get_var, path_of, Request};
use crate::http::reply;
use crate::store::StoreFile;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Shared, injectable server state: the single store behind a mutex.
/// Replaces the process-wide callback/statics the original service layer
/// used, so the server has no hidden global state.
pub struct AppState {
    pub store: Mutex<StoreFile>,
}

impl AppState {
    pub fn new(store: StoreFile) -> Self {
        AppState { store: Mutex::new(store) }
    }
}

pub fn dispatch(state: &AppState, req: &Request) -> Vec<u8> {
    let path = path_of(&req.uri);

    match (req.method.as_str(), path) {
        ("GET", "/") | ("GET", "/index.html") => reply::ok("text/html; charset=utf-8", INDEX_HTML.as_bytes()),
        ("GET", "/imgfs/list") => handle_list(state),
        ("POST", "/imgfs/insert") => handle_insert(state, req),
        ("GET", "/imgfs/read") => handle_read(state, req),
        (_, "/imgfs/delete") => handle_delete(state, req),
        _ => reply::error(ErrorKind::InvalidCommand),
    }
}

fn handle_list(state: &AppState) -> Vec<u8> {
    let json = state.store.lock().list_json();
    reply::ok("application/json", json.as_bytes())
}

fn handle_read(state: &AppState, req: &Request) -> Vec<u8> {
    let res_name = match get_var(&req.uri, "res") {
        Some(v) => v,
        None => return reply::error(ErrorKind::NotEnoughArguments),
    };
    let resolution = match Resolution::from_name(res_name) {
        Some(r) => r,
        None => return reply::error(ErrorKind::Resolutions),
    };
    let img_id = match get_var(&req.uri, "img_id") {
        Some(v) => v,
        None => return reply::error(ErrorKind::NotEnoughArguments),
    };

    match state.store.lock().read(img_id, resolution) {
        Ok(bytes) => reply::ok("image/jpeg", &bytes),
        Err(e) => reply::error(e.kind),
    }
}

fn handle_insert(state: &AppState, req: &Request) -> Vec<u8> {
    if req.body.is_empty() {
        return reply::error(ErrorKind::InvalidArgument);
    }
    let name = match get_var(&req.uri, "name") {
        Some(v) => v,
        None => return reply::error(ErrorKind::NotEnoughArguments),
    };

    if let Err(e) = state.store.lock().insert(&req.body, name) {
        return reply::error(e.kind);
    }
    redirect_home(req)
}

fn handle_delete(state: &AppState, req: &Request) -> Vec<u8> {
    let name = match get_var(&req.uri, "img_id") {
        Some(v) => v,
        None => return reply::error(ErrorKind::NotEnoughArguments),
    };

    if let Err(e) = state.store.lock().delete(name) {
        return reply::error(e.kind);
    }
    redirect_home(req)
}

/// Insert and delete both reload the client's page afterwards, the way
/// the original service layer redirected back to `/index.html`.
fn redirect_home(req: &Request) -> Vec<u8> {
    let host = req.header("host").unwrap_or("localhost");
    reply::found(&format!("http://{host}/index.html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::test_support::make_jpeg;
    use tempfile::NamedTempFile;

    fn new_state() -> (NamedTempFile, AppState) {
        let tmp = NamedTempFile::new().unwrap();
        let store = StoreFile::create(tmp.path(), 8, [64, 64, 256, 256]).unwrap();
        (tmp, AppState::new(store))
    }

    fn req(method: &str, uri: &str, body: Vec<u8>) -> Request {
        Request { method: method.into(), uri: uri.into(), headers: vec![("Host".into(), "localhost:8080".into())], body }
    }

    #[test]
    fn list_on_empty_store_is_empty_json() {
        let (_tmp, state) = new_state();
        let resp = dispatch(&state, &req("GET", "/imgfs/list", vec![]));
        let text = String::from_utf8_lossy(&resp);
        assert!(text.contains("200 OK"));
        assert!(text.ends_with(r#"{"Images":[]}"#));
    }

    #[test]
    fn insert_then_list_then_read_round_trips() {
        let (_tmp, state) = new_state();
        let bytes = make_jpeg(32, 32);

        let resp = dispatch(&state, &req("POST", "/imgfs/insert?name=cat", bytes.clone()));
        let text = String::from_utf8_lossy(&resp);
        assert!(text.starts_with("HTTP/1.1 302 Found"));
        assert!(text.contains("Location: http://localhost:8080/index.html"));

        let listed = dispatch(&state, &req("GET", "/imgfs/list", vec![]));
        assert!(String::from_utf8_lossy(&listed).contains("cat"));

        let read = dispatch(&state, &req("GET", "/imgfs/read?res=orig&img_id=cat", vec![]));
        assert!(read.ends_with(&bytes));
    }

    #[test]
    fn read_missing_image_is_500_not_found() {
        let (_tmp, state) = new_state();
        let resp = dispatch(&state, &req("GET", "/imgfs/read?res=orig&img_id=nope", vec![]));
        let text = String::from_utf8_lossy(&resp);
        assert!(text.starts_with("HTTP/1.1 500"));
        assert!(text.contains("image not found"));
    }

    #[test]
    fn delete_then_list_no_longer_contains_name() {
        let (_tmp, state) = new_state();
        let bytes = make_jpeg(16, 16);
        dispatch(&state, &req("POST", "/imgfs/insert?name=cat", bytes));
        dispatch(&state, &req("GET", "/imgfs/delete?img_id=cat", vec![]));

        let listed = dispatch(&state, &req("GET", "/imgfs/list", vec![]));
        assert!(!String::from_utf8_lossy(&listed).contains("cat"));
    }

    #[test]
    fn unknown_route_is_invalid_command() {
        let (_tmp, state) = new_state();
        let resp = dispatch(&state, &req("GET", "/nope", vec![]));
        assert!(String::from_utf8_lossy(&resp).contains("invalid command"));
    }
}
