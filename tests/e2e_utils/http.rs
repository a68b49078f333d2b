#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub struct RawResponse {
    pub status: u16,
    pub headers: String,
    pub body: String,
}

/// Send a hand-written HTTP/1.1 request and read one response.
pub async fn raw_request(addr: SocketAddr, method: &str, target: &str, extra_headers: &[&str]) -> RawResponse {
    let mut stream = TcpStream::connect(addr)
        .await
        .expect("Should be able to connect to wsbridge");

    let mut request = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", method, target, addr);
    for header in extra_headers {
        request.push_str(header);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .await
        .expect("Should be able to write request");

    let raw = tokio::time::timeout(Duration::from_secs(5), read_response(&mut stream))
        .await
        .expect("Should receive response within timeout");

    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw.as_str(), ""));
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("Malformed response: {}", raw));

    RawResponse {
        status,
        headers: head.to_string(),
        body: body.to_string(),
    }
}

/// Reads the head and a `Content-Length` delimited body, without relying on the server closing.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.expect("Should be able to read response");
        raw.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if body.len() >= content_length {
                return text;
            }
        }
        if n == 0 {
            return text;
        }
    }
}
