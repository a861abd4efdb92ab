// src/server/site.rs

//! Request handling for the dev server, independent of the HTTP transport.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tiny_http::Method;
use tracing::debug;

use crate::config::ConfigFile;

use super::reload::ReloadSignal;

/// Long-poll endpoint used by the injected client.
pub const RELOAD_ENDPOINT: &str = "/__frontpipe/reload";

/// How long a reload request waits before answering with the old generation.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// A response ready to be written by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }
}

/// Result of mapping a URL path onto the served directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    File(PathBuf),
    NotFound,
    Forbidden,
}

/// Static file handler with reload support.
#[derive(Debug, Clone)]
pub struct SiteHandler {
    /// Searched in order; the first existing file wins.
    roots: Vec<PathBuf>,
    start_path: String,
    reload: ReloadSignal,
    poll_timeout: Duration,
}

impl SiteHandler {
    pub fn new(roots: Vec<PathBuf>, start_path: impl Into<String>, reload: ReloadSignal) -> Self {
        Self {
            roots,
            start_path: start_path.into(),
            reload,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    /// Serve the output root; in development also fall back to the source
    /// root for files that are not built yet.
    pub fn from_config(cfg: &ConfigFile, reload: ReloadSignal) -> Self {
        let mut roots = vec![cfg.dest_root()];
        if !cfg.mode.is_production() {
            roots.push(cfg.path(&cfg.src.root));
        }
        Self::new(roots, cfg.server.start_path.clone(), reload)
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Requests that may block for up to the poll timeout.
    pub fn is_long_poll(url: &str) -> bool {
        split_query(url).0 == RELOAD_ENDPOINT
    }

    pub fn handle(&self, method: &Method, url: &str) -> Reply {
        if !matches!(method, Method::Get | Method::Head) {
            return Reply::text(405, "Method Not Allowed");
        }

        let (path, query) = split_query(url);
        if path == RELOAD_ENDPOINT {
            return self.poll_reload(query);
        }

        match self.resolve(path) {
            Resolution::File(file) => self.serve_file(&file),
            Resolution::NotFound => Reply::text(404, "Not Found"),
            Resolution::Forbidden => Reply::text(403, "Forbidden"),
        }
    }

    fn poll_reload(&self, query: Option<&str>) -> Reply {
        let since = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .find_map(|pair| pair.strip_prefix("since="))
            .and_then(|v| v.parse::<u64>().ok());

        let generation = match since {
            Some(seen) => self.reload.wait_newer(seen, self.poll_timeout),
            None => self.reload.current(),
        };
        Reply::text(200, generation.to_string())
    }

    /// Map a URL path to a file below one of the roots.
    pub fn resolve(&self, url_path: &str) -> Resolution {
        let Some(decoded) = percent_decode(url_path) else {
            return Resolution::Forbidden;
        };

        let mut rel = decoded.trim_start_matches('/').to_string();
        if rel.is_empty() {
            rel = self.start_path.clone();
        } else if rel.ends_with('/') {
            rel.push_str("index.html");
        }

        if rel.contains('\\') {
            return Resolution::Forbidden;
        }
        let rel_path = Path::new(&rel);
        if !rel_path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Resolution::Forbidden;
        }

        for root in &self.roots {
            let candidate = root.join(rel_path);
            if candidate.is_file() {
                return Resolution::File(candidate);
            }
            let index = candidate.join("index.html");
            if candidate.is_dir() && index.is_file() {
                return Resolution::File(index);
            }
        }
        Resolution::NotFound
    }

    fn serve_file(&self, file: &Path) -> Reply {
        let body = match fs::read(file) {
            Ok(body) => body,
            Err(err) => {
                debug!(file = ?file, error = %err, "failed to read served file");
                return Reply::text(404, "Not Found");
            }
        };

        let content_type = content_type(file);
        let body = if content_type.starts_with("text/html") {
            let html = String::from_utf8_lossy(&body);
            inject_reload_snippet(&html, self.reload.current()).into_bytes()
        } else {
            body
        };

        Reply { status: 200, content_type, body }
    }
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Decode `%XX` escapes. Returns `None` for malformed escapes or non-UTF-8
/// results.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Client script: long-polls the reload endpoint and reloads the page when
/// the generation moves past the one the page was served with.
fn reload_snippet(generation: u64) -> String {
    format!(
        r#"<script>
(function () {{
  var seen = {generation};
  function poll() {{
    fetch("{RELOAD_ENDPOINT}?since=" + seen, {{ cache: "no-store" }})
      .then(function (r) {{ return r.text(); }})
      .then(function (t) {{
        var next = parseInt(t, 10);
        if (next > seen) {{ location.reload(); }} else {{ poll(); }}
      }})
      .catch(function () {{ setTimeout(poll, 1000); }});
  }}
  poll();
}})();
</script>
"#
    )
}

/// Insert the reload client before `</body>`, or append it when the
/// document has no closing body tag.
pub fn inject_reload_snippet(html: &str, generation: u64) -> String {
    let snippet = reload_snippet(generation);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..pos]);
            out.push_str(&snippet);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{snippet}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_goes_before_closing_body() {
        let html = "<html><BODY><p>hi</p></BODY></html>";
        let out = inject_reload_snippet(html, 3);
        let script = out.find("<script>").unwrap();
        assert!(script < out.find("</BODY>").unwrap());
        assert!(out.contains("var seen = 3;"));
    }

    #[test]
    fn snippet_is_appended_to_fragments() {
        let out = inject_reload_snippet("<p>partial</p>", 0);
        assert!(out.starts_with("<p>partial</p><script>"));
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("/my%20page.html").as_deref(), Some("/my page.html"));
        assert_eq!(percent_decode("/%2e%2e/secret").as_deref(), Some("/../secret"));
        assert_eq!(percent_decode("/bad%2"), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("img/sprite.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
