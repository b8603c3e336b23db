//! Minimal HTTP/1.1 server serving a synthetic bucket for integration tests.
//!
//! Answers listing requests (`/?delimiter=/&prefix=<p>[&marker=<m>]`) with
//! ListBucketResult XML derived from the registered files, and file requests
//! (`/<key>`) with raw bytes. Supports per-prefix failure injection and
//! pagination so truncated listings can be exercised.

use bvdm_core::config::{BvdmConfig, RetryConfig};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Default, Clone)]
struct Dir {
    prefixes: BTreeSet<String>,
    keys: BTreeSet<String>,
}

/// Synthetic bucket contents. Directories are derived from file keys.
#[derive(Debug, Default, Clone)]
pub struct Bucket {
    dirs: BTreeMap<String, Dir>,
    files: BTreeMap<String, Vec<u8>>,
    fail_prefixes: HashSet<String>,
    page_size: Option<usize>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `key`, registering every parent directory on the way.
    pub fn file(&mut self, key: &str, body: &[u8]) -> &mut Self {
        self.files.insert(key.to_string(), body.to_vec());
        let dir_chain = split_chain(key);
        self.link_chain(&dir_chain);
        if let Some(deepest) = dir_chain.last() {
            self.dirs
                .entry(deepest.clone())
                .or_default()
                .keys
                .insert(key.to_string());
        }
        self
    }

    /// Register a directory with no children (cannot be derived from files).
    pub fn empty_dir(&mut self, prefix: &str) -> &mut Self {
        let chain = split_chain(prefix);
        self.link_chain(&chain);
        self
    }

    /// All listing requests for `prefix` return HTTP 500.
    pub fn fail_listing(&mut self, prefix: &str) -> &mut Self {
        self.fail_prefixes.insert(prefix.to_string());
        self
    }

    /// Split listings into pages of at most `n` entries.
    pub fn paginate(&mut self, n: usize) -> &mut Self {
        self.page_size = Some(n);
        self
    }

    fn link_chain(&mut self, chain: &[String]) {
        for pair in chain.windows(2) {
            self.dirs
                .entry(pair[0].clone())
                .or_default()
                .prefixes
                .insert(pair[1].clone());
        }
        for prefix in chain {
            self.dirs.entry(prefix.clone()).or_default();
        }
    }
}

/// All slash-terminated directory prefixes leading to `path`, outermost first.
/// For `data/2024/01/a.zip` that is `data/`, `data/2024/`, `data/2024/01/`;
/// a trailing slash means `path` itself is a directory and ends the chain.
fn split_chain(path: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut acc = String::new();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let dir_segments = if path.ends_with('/') {
        &segments[..]
    } else {
        segments.split_last().map(|(_, rest)| rest).unwrap_or(&[])
    };
    for seg in dir_segments {
        acc.push_str(seg);
        acc.push('/');
        chain.push(acc.clone());
    }
    chain
}

/// Handle to a running server.
pub struct VisionServer {
    pub base_url: String,
    requests: Arc<AtomicU64>,
}

impl VisionServer {
    pub fn listing_base(&self) -> String {
        format!("{}/?delimiter=/&prefix=", self.base_url)
    }

    pub fn file_base(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Total HTTP requests served so far (listings and files).
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Config pointed at this server, with a fast retry policy for tests.
    pub fn config(&self) -> BvdmConfig {
        BvdmConfig {
            listing_base_url: self.listing_base(),
            file_base_url: self.file_base(),
            user_agent: "bvdm-test".to_string(),
            listing_connect_timeout_secs: 5,
            listing_timeout_secs: 10,
            download_connect_timeout_secs: 5,
            retry: Some(RetryConfig {
                max_attempts: 2,
                base_delay_secs: 0.01,
                max_delay_secs: 1,
            }),
        }
    }
}

/// Starts a server in a background thread serving `bucket`. The server runs
/// until the process exits.
pub fn start(bucket: Bucket) -> VisionServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(AtomicU64::new(0));
    let bucket = Arc::new(bucket);
    let counter = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let bucket = Arc::clone(&bucket);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &bucket, &counter));
        }
    });
    VisionServer {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, bucket: &Bucket, counter: &AtomicU64) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") && raw.len() < 16 * 1024 {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            Err(_) => return,
        }
    }
    let request = match std::str::from_utf8(&raw) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first_line = request.lines().next().unwrap_or("").split_whitespace();
    let method = first_line.next().unwrap_or("");
    let target = first_line.next().unwrap_or("");
    if !method.eq_ignore_ascii_case("GET") {
        respond(&mut stream, "405 Method Not Allowed", "text/plain", b"");
        return;
    }
    counter.fetch_add(1, Ordering::SeqCst);

    if let Some(query) = target.strip_prefix("/?") {
        serve_listing(&mut stream, bucket, query);
    } else {
        serve_file(&mut stream, bucket, target.trim_start_matches('/'));
    }
}

fn serve_listing(stream: &mut TcpStream, bucket: &Bucket, query: &str) {
    let mut prefix = "";
    let mut marker = "";
    for param in query.split('&') {
        if let Some((k, v)) = param.split_once('=') {
            match k {
                "prefix" => prefix = v,
                "marker" => marker = v,
                _ => {}
            }
        }
    }

    if bucket.fail_prefixes.contains(prefix) {
        respond(stream, "500 Internal Server Error", "text/plain", b"boom");
        return;
    }

    let empty = Dir::default();
    let dir = bucket.dirs.get(prefix).unwrap_or(&empty);

    // One lexicographic entry stream, as S3 produces with a delimiter.
    let mut entries: Vec<(String, bool)> = dir
        .prefixes
        .iter()
        .map(|p| (p.clone(), true))
        .chain(dir.keys.iter().map(|k| (k.clone(), false)))
        .filter(|(name, _)| marker.is_empty() || name.as_str() > marker)
        .collect();
    entries.sort();

    let total = entries.len();
    let page_len = bucket.page_size.unwrap_or(total.max(1)).max(1);
    let truncated = total > page_len;
    let page = &entries[..page_len.min(total)];
    let next_marker = if truncated {
        page.last().map(|(name, _)| name.clone())
    } else {
        None
    };

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\n",
    );
    xml.push_str("<Name>test-bucket</Name>\n");
    xml.push_str(&format!("<Prefix>{}</Prefix>\n", prefix));
    xml.push_str("<Delimiter>/</Delimiter>\n");
    xml.push_str(&format!("<IsTruncated>{}</IsTruncated>\n", truncated));
    if let Some(m) = &next_marker {
        xml.push_str(&format!("<NextMarker>{}</NextMarker>\n", m));
    }
    for (name, is_prefix) in page {
        if *is_prefix {
            xml.push_str(&format!(
                "<CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>\n",
                name
            ));
        } else {
            let size = bucket.files.get(name).map(Vec::len).unwrap_or(0);
            xml.push_str(&format!(
                "<Contents><Key>{}</Key><Size>{}</Size></Contents>\n",
                name, size
            ));
        }
    }
    xml.push_str("</ListBucketResult>\n");

    respond(stream, "200 OK", "application/xml", xml.as_bytes());
}

fn serve_file(stream: &mut TcpStream, bucket: &Bucket, key: &str) {
    match bucket.files.get(key) {
        Some(body) => respond(stream, "200 OK", "application/octet-stream", body),
        None => respond(stream, "404 Not Found", "text/plain", b"no such key"),
    }
}

fn respond(stream: &mut TcpStream, status: &str, content_type: &str, body: &[u8]) {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len(),
        content_type
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
}
