//! Web fetch tool: retrieve a page and hand the model its text.

use std::net::IpAddr;
use std::time::Duration;

use adkit_core::{Tool, ToolContext, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Input for web_fetch tool.
#[derive(Debug, Deserialize)]
pub struct WebFetchInput {
    pub url: String,
    /// Optional max bytes to return (default 100 KB)
    pub max_bytes: Option<usize>,
}

/// Output from web_fetch tool.
#[derive(Debug, Serialize)]
pub struct WebFetchOutput {
    pub url: String,
    pub status_code: u16,
    pub content_type: String,
    pub body: String,
    pub truncated: bool,
}

const DEFAULT_MAX_BYTES: usize = 100_000;
const MAX_REDIRECTS: usize = 10;
const BLOCKED_HOSTS: &[&str] = &["localhost", "metadata.google.internal"];
const USER_AGENT: &str = concat!("adkit/", env!("CARGO_PKG_VERSION"));

static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Refuse loopback, private and link-local targets.
fn check_target(url: &url::Url, allow_local: bool) -> Result<()> {
    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!("unsupported scheme: {other}"),
    }
    if allow_local {
        return Ok(());
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_lowercase();
    if BLOCKED_HOSTS
        .iter()
        .any(|b| host == *b || host.ends_with(&format!(".{b}")))
    {
        anyhow::bail!("blocked host: {host}");
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private(ip) {
            anyhow::bail!("blocked address: {ip}");
        }
    }
    Ok(())
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d is judged by its IPv4 address
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private(IpAddr::V4(v4));
            }
            let head = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (head & 0xfe00) == 0xfc00
                || (head & 0xffc0) == 0xfe80
        }
    }
}

/// Every redirect hop goes through the same target check as the first request.
fn check_redirect(next: &url::Url, hops: usize, allow_local: bool) -> Result<()> {
    if hops >= MAX_REDIRECTS {
        anyhow::bail!("too many redirects");
    }
    check_target(next, allow_local)
}

fn build_client(allow_local: bool) -> Client {
    let policy = redirect::Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), allow_local) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(e.to_string()),
        }
    });
    Client::builder()
        .timeout(Duration::from_secs(30))
        .redirect(policy)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to a client without redirects");
            Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .unwrap_or_default()
        })
}

/// Fetch a URL, stripping HTML to plain text.
pub async fn web_fetch(client: &Client, input: WebFetchInput, allow_local: bool) -> Result<WebFetchOutput> {
    let parsed = url::Url::parse(&input.url)?;
    check_target(&parsed, allow_local)?;

    let max_bytes = input.max_bytes.unwrap_or(DEFAULT_MAX_BYTES);
    let mut resp = client
        .get(parsed)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;
    check_target(resp.url(), allow_local)?;

    let status_code = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();

    let mut buf: Vec<u8> = Vec::with_capacity(max_bytes.min(64 * 1024));
    let mut truncated = false;
    while let Some(chunk) = resp.chunk().await? {
        let room = max_bytes - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    let raw = String::from_utf8_lossy(&buf).to_string();

    let body = if content_type.contains("html") {
        strip_html(&raw)
    } else {
        raw
    };

    debug!(url = %input.url, status_code, truncated, "Fetched page");
    Ok(WebFetchOutput {
        url: input.url,
        status_code,
        content_type,
        body,
        truncated,
    })
}

pub fn strip_html(html: &str) -> String {
    let without_code = SCRIPT_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct WebFetchTool {
    client: Client,
    allow_local: bool,
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self {
            client: build_client(false),
            allow_local: false,
        }
    }

    /// Permit loopback and private addresses, e.g. for an intranet deployment.
    pub fn allow_local(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self.client = build_client(allow);
        self
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetches a web page over HTTP(S) and returns its text content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Absolute http or https URL" },
                "max_bytes": { "type": "integer", "description": "Maximum bytes to read (default 100000)" }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        let input: WebFetchInput = match serde_json::from_value(Value::Object(arguments)) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("invalid input: {e}"))),
        };
        match web_fetch(&self.client, input, self.allow_local).await {
            Ok(output) => Ok(ToolResult::success_value(serde_json::to_value(output)?)),
            Err(e) => {
                warn!(error = %e, "web_fetch failed");
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(u: &str) -> url::Url {
        url::Url::parse(u).unwrap()
    }

    #[test]
    fn blocks_private_targets() {
        for target in [
            "http://localhost:8080/",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://[::ffff:127.0.0.1]/",
            "http://[::ffff:169.254.169.254]/latest/meta-data",
            "http://[::ffff:10.0.0.1]/",
            "http://[fe80::1]/",
            "http://[fd00::1]/",
            "http://metadata.google.internal/",
        ] {
            assert!(check_target(&parse(target), false).is_err(), "{target}");
        }
        assert!(check_target(&parse("file:///etc/passwd"), true).is_err());
        assert!(check_target(&parse("https://example.com/docs"), false).is_ok());
        assert!(check_target(&parse("http://[::ffff:93.184.216.34]/"), false).is_ok());
    }

    #[test]
    fn redirect_hops_are_checked() {
        let public = parse("https://example.com/next");
        assert!(check_redirect(&public, 0, false).is_ok());
        assert!(check_redirect(&parse("http://169.254.169.254/latest/meta-data"), 1, false).is_err());
        assert!(check_redirect(&parse("http://[::ffff:127.0.0.1]:8080/"), 1, false).is_err());
        assert!(check_redirect(&parse("http://127.0.0.1/"), 1, true).is_ok());
        assert!(check_redirect(&public, MAX_REDIRECTS, false).is_err());
    }

    #[test]
    fn strips_markup() {
        let html = "<html><head><style>p{color:red}</style><script>alert(1)</script></head>\
                    <body><h1>Title</h1><p>Fish &amp; chips</p></body></html>";
        assert_eq!(strip_html(html), "Title Fish & chips");
    }
}
