use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use server_proxy::config::{RouteConfig, ServerConfig, group_by_listener};
use server_proxy::engine::Engine;

fn spawn_engine(port: u16, root: &std::path::Path) {
    let route = RouteConfig {
        path: "/".into(),
        methods: vec!["GET".into(), "DELETE".into()],
        root: root.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let server = ServerConfig {
        host: "127.0.0.1".into(),
        ports: vec![port],
        server_name: "_".into(),
        default_server: true,
        routes: vec![route],
        ..Default::default()
    };
    let groups = group_by_listener(std::slice::from_ref(&server));

    thread::spawn(move || {
        let mut engine = Engine::new(groups).expect("engine binds");
        engine.run().ok();
    });

    // Give the listener time to bind before the test connects.
    thread::sleep(Duration::from_millis(200));
}

fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("connects to loopback");
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    stream
}

fn read_response(stream: &mut TcpStream) -> String {
    thread::sleep(Duration::from_millis(100));
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).unwrap_or(0);
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[test]
fn get_serves_index_file() {
    let dir = std::env::temp_dir().join("originserver_it_index");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "hi").unwrap();

    spawn_engine(18080, &dir);

    let mut stream = connect(18080);
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    let response = read_response(&mut stream);

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Length: 2\r\n"));
    assert!(response.ends_with("hi\r\n"));
}

#[test]
fn missing_file_yields_404() {
    let dir = std::env::temp_dir().join("originserver_it_404");
    std::fs::create_dir_all(&dir).unwrap();

    spawn_engine(18081, &dir);

    let mut stream = connect(18081);
    stream.write_all(b"GET /missing.html HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    let response = read_response(&mut stream);

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("<h1>404 Not Found</h1>"));
}

#[test]
fn chunked_post_body_is_dechunked_then_501() {
    let dir = std::env::temp_dir().join("originserver_it_chunked");
    std::fs::create_dir_all(&dir).unwrap();

    spawn_engine(18082, &dir);

    let mut stream = connect(18082);
    let headers = "POST /x HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\nContent-Type: text/plain\r\n\r\n";
    stream.write_all(headers.as_bytes()).unwrap();
    thread::sleep(Duration::from_millis(50));

    stream.write_all(b"5\r\nhello\r\n").unwrap();
    thread::sleep(Duration::from_millis(50));

    stream.write_all(b"0\r\n\r\n").unwrap();

    let response = read_response(&mut stream);
    assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
}

#[test]
fn request_split_across_many_small_writes_still_completes() {
    let dir = std::env::temp_dir().join("originserver_it_split");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "split-ok").unwrap();

    spawn_engine(18083, &dir);

    let mut stream = connect(18083);
    let request = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
    for byte in request {
        stream.write_all(&[*byte]).unwrap();
        thread::sleep(Duration::from_millis(2));
    }

    let response = read_response(&mut stream);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("split-ok\r\n"));
}

#[test]
fn uri_too_long_closes_after_414() {
    let dir = std::env::temp_dir().join("originserver_it_414");
    std::fs::create_dir_all(&dir).unwrap();

    spawn_engine(18084, &dir);

    let mut stream = connect(18084);
    let long_path = "A".repeat(8200);
    let request = format!("GET /{long_path} HTTP/1.1\r\nHost: x\r\n\r\n");
    stream.write_all(request.as_bytes()).unwrap();

    let response = read_response(&mut stream);
    assert!(response.starts_with("HTTP/1.1 414 Request-URI Too Long\r\n"));

    // The connection closes after send; a further read should hit EOF.
    let mut trailing = [0u8; 16];
    let n = stream.read(&mut trailing).unwrap_or(0);
    assert_eq!(n, 0);
}
