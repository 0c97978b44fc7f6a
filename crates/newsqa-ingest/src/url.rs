//! Fetch a web page (or a PDF served over HTTP) and reduce it to text.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::io::Write;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use newsqa_core::config::IngestConfig;
use newsqa_core::types::Document;

use crate::pdf::load_pdf;

pub struct UrlFetcher {
    client: reqwest::blocking::Client,
}

impl UrlFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    pub fn load(&self, url: &str) -> Result<Vec<Document>> {
        validate_url(url)?;
        let response = self.client.get(url).send().with_context(|| format!("fetching {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {status} from {url}");
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let bytes = response.bytes().with_context(|| format!("reading body of {url}"))?;
        debug!(url, %content_type, bytes = bytes.len(), "fetched");

        if content_type.contains("application/pdf") || bytes.starts_with(b"%PDF") {
            let mut spool = tempfile::Builder::new().suffix(".pdf").tempfile()?;
            spool.write_all(&bytes)?;
            spool.flush()?;
            return load_pdf(spool.path(), url);
        }

        let body = String::from_utf8_lossy(&bytes);
        let text = if content_type.contains("html") || looks_like_html(&body) {
            html_to_text(&body)
        } else {
            body.trim().to_string()
        };
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Document::new(text, url)])
    }
}

/// Only absolute http(s) URLs with a host are fetched.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url).map_err(|e| anyhow!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("unsupported URL scheme '{}' in '{url}'", parsed.scheme());
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        bail!("URL '{url}' has no host");
    }
    Ok(())
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<body")
}

// --- HTML patterns (compiled once) ---

/// Elements whose content is never shown. `head` comes first so that
/// everything inside it goes, whatever it contains.
const HIDDEN_ELEMENTS: [&str; 6] = ["head", "script", "style", "noscript", "svg", "template"];

static HIDDEN_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    HIDDEN_ELEMENTS
        .iter()
        .map(|name| {
            Regex::new(&format!(r"(?is)<{name}\b.*?</{name}\s*>")).expect("hidden-element pattern")
        })
        .collect()
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/tr|/section|/article",
        r"|/blockquote|/header|/footer)\b[^>]*>",
    ))
    .expect("block pattern")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("spaces pattern"));

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("blank-lines pattern"));

/// Visible text of an HTML page. Block-level closers become line breaks and
/// runs of blank lines collapse to a paragraph break, so the chunker can still
/// split on paragraphs.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for hidden in HIDDEN_RES.iter() {
        text = hidden.replace_all(&text, " ").into_owned();
    }
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = BLOCK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SPACES_RE.replace_all(&text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES_RE.replace_all(&joined, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&hellip;", "\u{2026}")
        .replace("&amp;", "&")
}
