use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

pub mod api;
pub mod jobs;
pub mod routes;

pub const BIND_ENV: &str = "WARBAND_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Largest request body accepted; formations with inline commanders stay far below this.
const MAX_BODY_BYTES: usize = 1 << 20;

pub fn bind_address() -> String {
    std::env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string())
}

pub fn run_server(bind_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr)?;
    tracing::info!(%bind_addr, "warband server listening");
    println!("warband server listening on http://{bind_addr}");

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream) {
                    tracing::warn!(error = %err, "request error");
                }
            }
            Err(err) => tracing::warn!(error = %err, "connection failed"),
        }
    }

    Ok(())
}

fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| buffer.windows(2).position(|w| w == b"\n\n").map(|i| i + 2))
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Read one request: headers, then as much body as `Content-Length` announces.
fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 16_384];
    loop {
        let bytes_read = stream.read(&mut chunk)?;
        if bytes_read == 0 {
            return Ok(buffer);
        }
        buffer.extend_from_slice(&chunk[..bytes_read]);
        if let Some(end) = header_end(&buffer) {
            let head = String::from_utf8_lossy(&buffer[..end]);
            let wanted = end + content_length(&head).min(MAX_BODY_BYTES);
            if buffer.len() >= wanted {
                buffer.truncate(wanted);
                return Ok(buffer);
            }
        }
        if buffer.len() > MAX_BODY_BYTES * 2 {
            return Ok(buffer);
        }
    }
}

/// Method, path and body of one request. The body is everything after the header boundary.
#[derive(Debug, PartialEq, Eq)]
struct ParsedRequest {
    method: String,
    path: String,
    body: String,
}

fn parse_request(raw: &[u8]) -> ParsedRequest {
    let end = header_end(raw).unwrap_or(raw.len());
    let head = String::from_utf8_lossy(&raw[..end]);
    let mut request_parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_parts.next().unwrap_or("GET").to_string();
    let path = request_parts.next().unwrap_or("/").to_string();
    ParsedRequest {
        method,
        path,
        body: String::from_utf8_lossy(&raw[end..]).into_owned(),
    }
}

fn handle_connection(stream: &mut TcpStream) -> std::io::Result<()> {
    let raw = read_request(stream)?;
    if raw.is_empty() {
        return Ok(());
    }

    let request = parse_request(&raw);
    let response = routes::route_request(&request.method, &request.path, &request.body);
    tracing::debug!(
        method = %request.method,
        path = %request.path,
        status = response.status_code,
        "request handled"
    );
    stream.write_all(response.to_http_string().as_bytes())?;
    stream.flush()?;
    Ok(())
}
