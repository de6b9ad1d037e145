//! End-to-end coverage of the HTTP surface: spins up the real server on
//! an ephemeral port and drives it over a raw `TcpStream`, the way a
//! browser or `curl` would.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use imgfs::http::dispatch::AppState;
use imgfs::http::run;
use imgfs::store::StoreFile;

async fn spawn_server() -> std::net::SocketAddr {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let store = StoreFile::create(tmp.path(), 8, [64, 64, 256, 256]).unwrap();
    std::mem::forget(tmp); // keep the backing file alive for the server's lifetime

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new(store));
    tokio::spawn(run(listener, state));
    addr
}

async fn send(addr: std::net::SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    response
}

fn make_jpeg(w: u32, h: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    let img = DynamicImage::new_rgb8(w, h);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn list_on_a_fresh_store_is_empty() {
    let addr = spawn_server().await;
    let resp = send(addr, b"GET /imgfs/list HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 200 OK"));
    assert!(text.contains(r#"{"Images":[]}"#));
}

#[tokio::test]
async fn insert_redirects_then_list_contains_the_new_name() {
    let addr = spawn_server().await;
    let body = make_jpeg(40, 40);

    let mut request = format!(
        "POST /imgfs/insert?name=cat HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(&body);

    let resp = send(addr, &request).await;
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 302 Found"));
    assert!(text.contains("Location: http://test/index.html"));

    let listed = send(addr, b"GET /imgfs/list HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(String::from_utf8_lossy(&listed).contains("cat"));
}

#[tokio::test]
async fn unknown_route_gets_a_500_invalid_command() {
    let addr = spawn_server().await;
    let resp = send(addr, b"GET /nope HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 500"));
    assert!(text.contains("invalid command"));
}

#[tokio::test]
async fn read_of_unknown_image_is_a_500_not_found() {
    let addr = spawn_server().await;
    let resp = send(addr, b"GET /imgfs/read?res=orig&img_id=nope HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 500"));
    assert!(text.contains("image not found"));
}

#[tokio::test]
async fn pipelined_requests_on_one_connection_both_get_answered() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let pipelined = b"GET /imgfs/list HTTP/1.1\r\nHost: test\r\n\r\nGET /imgfs/list HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n";
    stream.write_all(pipelined).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    let text = String::from_utf8_lossy(&response);

    assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 2);
}

#[tokio::test]
async fn insert_then_read_small_returns_a_bounded_derived_image() {
    let addr = spawn_server().await;
    let body = make_jpeg(800, 400);

    let mut insert_req = format!(
        "POST /imgfs/insert?name=big HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    insert_req.extend_from_slice(&body);
    send(addr, &insert_req).await;

    let resp = send(addr, b"GET /imgfs/read?res=small&img_id=big HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let split = resp.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let (headers, jpeg_bytes) = (&resp[..split], &resp[split..]);
    assert!(String::from_utf8_lossy(headers).contains("image/jpeg"));
    assert!(jpeg_bytes.len() < body.len());
}
