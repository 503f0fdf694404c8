// crates/core/src/net.rs
//! Proxy-port detection and the mirror-vs-proxy latency race.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::net::TcpStream;

use crate::console::Console;

/// Ports local proxy clients commonly listen on, most likely first.
pub const COMMON_PROXY_PORTS: &[u16] = &[7890, 7897, 1080, 10808, 10809, 8888, 8889, 9999];

/// Fallback when nothing is detected.
pub const DEFAULT_PROXY_PORT: u16 = 7897;

const PROXY_ENV_VARS: &[&str] = &[
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
];

/// PyPI mirror reached directly vs. the official index reached through the
/// local proxy — the two contestants of the latency race.
const MIRROR_PROBE_URL: &str = "https://pypi.tuna.tsinghua.edu.cn/simple";
const OFFICIAL_PROBE_URL: &str = "https://pypi.org/simple";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const SCAN_TIMEOUT: Duration = Duration::from_millis(500);

/// Pull a port out of a proxy env value like `http://127.0.0.1:7890`,
/// `127.0.0.1:7890` or `socks5://127.0.0.1:1080/`.
pub fn port_from_env_value(value: &str) -> Option<u16> {
    let tail = value.rsplit(':').next()?;
    tail.trim_end_matches('/').parse().ok()
}

/// Detect the active local proxy port: proxy environment variables first,
/// then a TCP scan of [`COMMON_PROXY_PORTS`], else [`DEFAULT_PROXY_PORT`].
pub async fn detect_proxy_port(console: &dyn Console) -> u16 {
    console.info("detecting local proxy port...");

    for var in PROXY_ENV_VARS {
        if let Some(port) = std::env::var(var).ok().as_deref().and_then(port_from_env_value) {
            console.success(&format!("port {port} found in ${var}"));
            return port;
        }
    }

    for &port in COMMON_PROXY_PORTS {
        let probe = TcpStream::connect(("127.0.0.1", port));
        if let Ok(Ok(_)) = tokio::time::timeout(SCAN_TIMEOUT, probe).await {
            console.success(&format!("active proxy port detected: {port}"));
            return port;
        }
    }

    console.warning(&format!(
        "no common proxy port is listening, falling back to {DEFAULT_PROXY_PORT}"
    ));
    DEFAULT_PROXY_PORT
}

/// Measure round-trip latency to `url`, optionally through `proxy`.
/// `None` means timeout or connection failure.
pub async fn measure_latency(url: &str, proxy: Option<&str>) -> Option<Duration> {
    let mut builder = reqwest::Client::builder().timeout(PROBE_TIMEOUT);
    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url).ok()?);
    }
    let client = builder.build().ok()?;

    let start = Instant::now();
    client.get(url).send().await.ok()?;
    Some(start.elapsed())
}

/// Which configuration the race picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mirror,
    Proxy,
}

/// Result of the mirror-vs-proxy race. Millisecond fields are `None` on
/// timeout.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub mode: Mode,
    pub port: u16,
    pub mirror_ms: Option<u64>,
    pub proxy_ms: Option<u64>,
}

fn fmt_latency(latency: Option<Duration>) -> String {
    match latency {
        Some(d) => format!("{}ms", d.as_millis()),
        None => "timeout".to_string(),
    }
}

/// Race the mirror (direct) against the official index (through the proxy
/// on `port`) and recommend a mode. Ties and double timeouts go to the
/// mirror.
pub async fn recommend_config(port: u16, console: &dyn Console) -> Recommendation {
    console.info("racing mirror vs. proxy...");

    let proxy_url = format!("http://127.0.0.1:{port}");
    let (mirror, proxy) = tokio::join!(
        measure_latency(MIRROR_PROBE_URL, None),
        measure_latency(OFFICIAL_PROBE_URL, Some(&proxy_url)),
    );

    console.info(&format!("mirror (direct): {}", fmt_latency(mirror)));
    console.info(&format!("official (proxied): {}", fmt_latency(proxy)));

    let mode = match (mirror, proxy) {
        (Some(m), Some(p)) if p < m => Mode::Proxy,
        (None, Some(_)) => Mode::Proxy,
        _ => Mode::Mirror,
    };

    Recommendation {
        mode,
        port,
        mirror_ms: mirror.map(|d| d.as_millis() as u64),
        proxy_ms: proxy.map(|d| d.as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_from_url_forms() {
        assert_eq!(port_from_env_value("http://127.0.0.1:7890"), Some(7890));
        assert_eq!(port_from_env_value("127.0.0.1:7897"), Some(7897));
        assert_eq!(port_from_env_value("socks5://127.0.0.1:1080/"), Some(1080));
    }

    #[test]
    fn rejects_portless_values() {
        assert_eq!(port_from_env_value("localhost"), None);
        assert_eq!(port_from_env_value("http://proxy.internal/"), None);
        assert_eq!(port_from_env_value(""), None);
    }

    #[test]
    fn latency_formatting() {
        assert_eq!(fmt_latency(Some(Duration::from_millis(42))), "42ms");
        assert_eq!(fmt_latency(None), "timeout");
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Proxy).unwrap(), "\"proxy\"");
    }
}
