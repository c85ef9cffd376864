//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Version};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dispatch_bridge::server::{RequestAdapter, ResponseAdapter, TransportRequest};
use dispatch_bridge::BoxError;

/// Canned answer for the programmable backend.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

/// Start a backend on an ephemeral port that answers every connection with
/// `response` and records the raw request head it received.
pub async fn start_programmable_backend(
    response: StubResponse,
) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        recorded
                            .lock()
                            .unwrap()
                            .push(String::from_utf8_lossy(&buf[..n]).into_owned());

                        let mut head = format!("HTTP/1.1 {}\r\n", response.status_line);
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        head.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.body.len(),
                            response.body
                        ));
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen)
}

/// What a dispatcher saw of the request it was handed.
#[derive(Debug, Clone, Default)]
pub struct Observed {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, Vec<String>)>,
}

/// Dispatcher that records the adapted request, then fails with `error`.
pub fn recording_dispatcher(
    observed: Arc<Mutex<Option<Observed>>>,
    error: &'static str,
) -> impl Fn(&mut RequestAdapter, &mut ResponseAdapter) -> Result<(), BoxError> + Send + Sync + 'static
{
    move |request: &mut RequestAdapter, _: &mut ResponseAdapter| -> Result<(), BoxError> {
        let headers = request
            .headers()
            .request_headers()
            .iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect();
        *observed.lock().unwrap() = Some(Observed {
            method: request.http_method().to_string(),
            path: request.uri().path(),
            headers,
        });
        Err(error.into())
    }
}

/// Transport request whose body cannot be read.
pub struct UnreadableRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
}

impl UnreadableRequest {
    pub fn new(uri: &str) -> Self {
        Self {
            method: Method::POST,
            uri: uri.to_string(),
            headers: HeaderMap::new(),
        }
    }
}

impl TransportRequest for UnreadableRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn request_uri(&self) -> String {
        self.uri.clone()
    }

    fn version(&self) -> Version {
        Version::HTTP_11
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn content(&self) -> Result<Bytes, BoxError> {
        Err("connection reset while reading body".into())
    }
}

/// Reader that counts the bytes it hands out.
pub struct CountingReader {
    inner: io::Cursor<Vec<u8>>,
    pub served: Arc<AtomicUsize>,
}

impl CountingReader {
    pub fn new(data: &[u8]) -> Self {
        Self {
            inner: io::Cursor::new(data.to_vec()),
            served: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = Read::read(&mut self.inner, buf)?;
        self.served.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

/// GET request with the given headers.
pub fn get(uri: &str, headers: &[(&str, &str)]) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::new()).unwrap()
}
