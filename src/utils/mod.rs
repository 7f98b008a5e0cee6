use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Convert an arbitrary string into a filesystem-safe filename.
///
/// Every run of characters outside `[alphanumeric _ - .]` collapses to a
/// single underscore. Empty input falls back to `fallback`, and long names
/// are truncated to `max_length` characters.
pub fn safe_filename(name: &str, fallback: &str, max_length: usize) -> String {
    let name = name.trim();
    if name.is_empty() {
        return fallback.to_string();
    }

    let mut sanitized = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('_');
            in_run = true;
        }
    }

    if sanitized.is_empty() {
        sanitized = fallback.to_string();
    }

    if sanitized.chars().count() > max_length {
        sanitized = sanitized.chars().take(max_length).collect();
    }

    sanitized
}

/// Load Spotify track URLs from a JSON file.
///
/// Supported shapes:
///   - `["https://open.spotify.com/track/...", ...]`
///   - `[{"url": "https://open.spotify.com/track/..."}, ...]`
///   - `{"name": "https://open.spotify.com/track/...", ...}` (values only)
///
/// Entries are trimmed, empties dropped, and duplicates removed while
/// preserving first-seen order.
pub fn load_input_urls(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    let data: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse input file {}", path.display()))?;

    let mut urls: Vec<String> = Vec::new();

    match data {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push_trimmed(&mut urls, &s),
                    Value::Object(map) => {
                        if let Some(Value::String(s)) = map.get("url") {
                            push_trimmed(&mut urls, s);
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(map) => {
            // Fallback: treat the object as a mapping of name -> url
            for value in map.values() {
                if let Value::String(s) = value {
                    push_trimmed(&mut urls, s);
                }
            }
        }
        _ => {}
    }

    let mut seen = HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));

    Ok(urls)
}

fn push_trimmed(urls: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() {
        urls.push(candidate.to_string());
    }
}

/// Minimal HTTP stub server for exercising the fetch and download paths
/// without touching the network. Serves every connection with the same
/// canned response and tracks the peak number of simultaneous requests.
#[cfg(test)]
pub mod stub {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub struct StubServer {
        pub url: String,
        pub max_in_flight: Arc<AtomicUsize>,
        pub hits: Arc<AtomicUsize>,
    }

    pub async fn spawn(
        status: u16,
        content_type: &'static str,
        body: &'static [u8],
        delay: Duration,
    ) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let url = format!("http://{}", listener.local_addr().expect("stub addr"));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));

        let in_flight_srv = in_flight.clone();
        let max_srv = max_in_flight.clone();
        let hits_srv = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let in_flight = in_flight_srv.clone();
                let max = max_srv.clone();
                let hits = hits_srv.clone();
                tokio::spawn(async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(current, Ordering::SeqCst);

                    let mut buf = [0u8; 8192];
                    let _ = sock.read(&mut buf).await;
                    tokio::time::sleep(delay).await;

                    let head = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(body).await;
                    let _ = sock.shutdown().await;

                    in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        StubServer {
            url,
            max_in_flight,
            hits,
        }
    }
}
