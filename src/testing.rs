//! Helpers shared by unit tests: a one-connection HTTP server with canned replies and a
//! config rooted in a temporary directory.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::extractors::FetchContext;
use crate::media::MediaToolkit;

/// Accepts a single connection, reads the whole request and writes `response` back
pub struct CannedServer {
    pub url: String,
    handle: JoinHandle<String>,
}

impl CannedServer {
    pub async fn start(path: &str, response: Vec<u8>) -> Self {
        Self::spawn(path, response, false).await
    }

    /// Like [`CannedServer::start`] but keeps the socket open afterwards without sending more
    pub async fn stalling(path: &str, response: Vec<u8>) -> Self {
        Self::spawn(path, response, true).await
    }

    async fn spawn(path: &str, response: Vec<u8>, hold_open: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}{}", listener.local_addr().unwrap(), path);

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            socket.write_all(&response).await.unwrap();
            socket.flush().await.unwrap();

            if hold_open {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
            String::from_utf8_lossy(&request).into_owned()
        });

        Self { url, handle }
    }

    /// The raw request the server received
    pub async fn request(self) -> String {
        self.handle.await.unwrap()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            return buffer;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let Some(header_end) = find(&buffer, b"\r\n\r\n").map(|i| i + 4) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();

        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());

        let complete = match content_length {
            Some(length) => buffer.len() >= header_end + length,
            None if headers.contains("transfer-encoding: chunked") => buffer.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            return buffer;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// A complete HTTP/1.1 response with a body
pub fn http_response(status_line: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line,
        content_type,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Default config with every directory under `root`, created
pub fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.video_dir = root.join("video");
    config.paths.audio_dir = root.join("audio");
    config.paths.transcription_dir = root.join("out");
    config.ensure_directories().unwrap();
    config
}

pub fn fetch_context(config: Config, toolkit: impl MediaToolkit + 'static) -> FetchContext {
    FetchContext {
        config: Arc::new(config),
        toolkit: Arc::new(toolkit),
        quiet: true,
    }
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
