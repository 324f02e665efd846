//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start an origin that answers every request with its own request head.
///
/// The body is the request line followed by the headers, one per line, as the
/// origin received them. Request bodies are read and discarded.
pub async fn start_echo_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let head_end = head.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
                        let text = String::from_utf8_lossy(&head[..head_end]).to_string();
                        let content_length = text
                            .lines()
                            .filter_map(|line| line.split_once(':'))
                            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        let mut received = head.len() - head_end;
                        while received < content_length {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => received += n,
                            }
                        }
                        let body = text.trim_end().replace("\r\n", "\n");
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A mount table file removed on drop.
pub struct TempFstab {
    path: PathBuf,
}

impl TempFstab {
    pub fn new(content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("fstab-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, content: &str) {
        std::fs::write(&self.path, content).unwrap();
    }
}

impl Drop for TempFstab {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
