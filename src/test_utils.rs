// src/test_utils.rs
// =============================================================================
// Test helpers shared by the unit tests of every module.
//
// - FixtureSource: an in-memory PageSource. URLs map to canned pages, JSON
//   bodies or error statuses; every call is recorded.
// - LocalServer: a tiny HTTP/1.1 server on 127.0.0.1 for exercising the real
//   reqwest client (auth header, retries, JSON detection).
// - The `data/` fixture tree:
//
//   data
//   ├── a.txt (+ .md5 .sha1 .sha256)
//   └── b
//       └── b.txt (+ .md5 .sha1 .sha256)
// =============================================================================

use crate::client::{Page, PageSource};
use crate::error::{Result, WalkError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const A_TXT_CONTENT: &str = "This is ${data_root}/a.txt with a newline at the end of the file.\n";
pub const A_TXT_MD5: &str = "921214c14fda7cd320caf04cfa26a224";
pub const A_TXT_SHA1: &str = "7c6b7b5a662dcf0a21253bc2576d614f6b7fdc9c";
pub const A_TXT_SHA256: &str = "fd60560f94c1ad21d45e2383f974dd77df582f7336816b7fb367d70ff001fc8f";

pub const B_TXT_CONTENT: &str = "This is ${data_root}/b/b.txt with a newline at the end of the file.\n";
pub const B_TXT_MD5: &str = "640ecd5a7cf34cbf8a921b37731db28b";
pub const B_TXT_SHA1: &str = "d07cd80af550e403df824d64feb67e34a9fbf020";
pub const B_TXT_SHA256: &str = "98dccf9bba2c9294ffcf7772d9dc72f80580d6c08cae4537dd861faa3c85d25e";

#[derive(Debug, Clone)]
enum Fixture {
    Page(String),
    Json(Value),
    Status(u16),
    Timeout,
}

/// In-memory stand-in for the repository manager.
#[derive(Debug, Default)]
pub struct FixtureSource {
    fixtures: Mutex<HashMap<String, Fixture>>,
    // (prefix, body) served for any unregistered URL under prefix
    fallback: Mutex<Option<(String, String)>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long first, to make concurrency observable.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn add_page(&self, url: &str, body: &str) {
        self.insert(url, Fixture::Page(body.to_string()));
    }

    pub fn add_json(&self, url: &str, value: &Value) {
        self.insert(url, Fixture::Json(value.clone()));
    }

    pub fn add_status(&self, url: &str, status: u16) {
        self.insert(url, Fixture::Status(status));
    }

    pub fn add_timeout(&self, url: &str) {
        self.insert(url, Fixture::Timeout);
    }

    pub fn set_fallback(&self, prefix: &str, body: &str) {
        *self.fallback.lock().unwrap() = Some((prefix.to_string(), body.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn insert(&self, url: &str, fixture: Fixture) {
        self.fixtures
            .lock()
            .unwrap()
            .insert(url.to_string(), fixture);
    }

    fn lookup(&self, url: &str) -> Option<Fixture> {
        if let Some(fixture) = self.fixtures.lock().unwrap().get(url) {
            return Some(fixture.clone());
        }
        match &*self.fallback.lock().unwrap() {
            Some((prefix, body)) if url.starts_with(prefix.as_str()) => {
                Some(Fixture::Page(body.clone()))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch(&self, url: &str, _params: &[(&str, &str)]) -> Result<Page> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.lookup(url) {
            Some(Fixture::Page(body)) => Ok(Page::new(url, 200, body)),
            Some(Fixture::Json(value)) => {
                let mut page = Page::new(url, 200, value.to_string());
                page.json = Some(value);
                Ok(page)
            }
            Some(Fixture::Status(status)) => Err(WalkError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Some(Fixture::Timeout) => Err(WalkError::Timeout {
                url: url.to_string(),
            }),
            None => Err(WalkError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// One autoindex line as the server renders it.
pub fn autoindex_line(name: &str, timestamp: &str, size: &str, unit: &str) -> String {
    format!("<a href=\"{name}\">{name}</a>       {timestamp}  {size} {unit}")
}

/// Wraps lines into an HTML page with a parent link, like the real server.
pub fn autoindex_page(lines: &[String]) -> String {
    let mut page = String::from("<!DOCTYPE html>\n<html>\n<body>\n<pre><a href=\"../\">../</a>\n");
    for line in lines {
        page.push_str(line);
        page.push('\n');
    }
    page.push_str("</pre>\n</body>\n</html>\n");
    page
}

// Registers the data/ tree under `root_url` (no trailing slash)
pub fn add_data_tree(source: &FixtureSource, root_url: &str) {
    source.add_page(
        root_url,
        &autoindex_page(&[
            autoindex_line("a.txt", "22-Aug-2019 09:53", "2.50", "MB"),
            autoindex_line("b/", "22-Aug-2020 09:53", "1.23", "kB"),
        ]),
    );
    source.add_page(
        &format!("{root_url}/b/"),
        &format!(
            "{}\nwe ignore this",
            autoindex_line("b.txt", "22-Aug-2020 09:53", "1.23", "kB")
        ),
    );

    let leaves = [
        ("a.txt", A_TXT_CONTENT, A_TXT_MD5, A_TXT_SHA1, A_TXT_SHA256),
        ("b/b.txt", B_TXT_CONTENT, B_TXT_MD5, B_TXT_SHA1, B_TXT_SHA256),
    ];
    for (path, content, md5, sha1, sha256) in leaves {
        let leaf = format!("{root_url}/{path}");
        source.add_page(&leaf, content);
        source.add_page(&format!("{leaf}.md5"), md5);
        source.add_page(&format!("{leaf}.sha1"), &format!("{sha1}\n"));
        source.add_page(&format!("{leaf}.sha256"), sha256);
    }
}

/// Minimal HTTP server answering canned responses in order.
pub struct LocalServer {
    addr: SocketAddr,
    requests: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl LocalServer {
    pub async fn start(responses: Vec<(u16, &'static str, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            let mut responses = responses.into_iter();
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                log.lock()
                    .await
                    .push(String::from_utf8_lossy(&head).to_string());

                let (status, content_type, body) =
                    responses.next().unwrap_or((404, "text/plain", "exhausted"));
                let response = format!(
                    "HTTP/1.1 {status} Fixture\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}
