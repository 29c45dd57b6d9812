//! Usage page served at `/`.

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Response};

use crate::security::ResponseHeaderPolicy;

pub const TEXT_HTML_UTF8: &str = "text/html;charset=UTF-8";

/// Usage pattern shown on the page, relative to the origin.
pub const USAGE_PATTERN: &str = "/{owner}/{repo}/{branch}/{path}";

/// `scheme://host` as seen by the client. Falls back to a relative origin
/// when the request carries no Host header.
pub fn request_origin(headers: &HeaderMap) -> String {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    match host {
        Some(host) => format!("{}://{}", escape_html(scheme), escape_html(host)),
        None => String::new(),
    }
}

/// Host and scheme come from the client and are echoed into HTML.
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn render(origin: &str) -> String {
    format!(
        r#"<html>
  <head>
    <title>GitHub Raw CDN</title>
    <style>
      body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; line-height: 1.6; }}
      h1 {{ color: #0075ff; }}
      code {{ background: #f1f1f1; padding: 2px 5px; border-radius: 3px; }}
      .note {{ background: #fffde7; padding: 10px; border-left: 4px solid #ffd600; margin: 20px 0; }}
    </style>
  </head>
  <body>
    <h1>GitHub Raw CDN</h1>
    <p>A CDN proxy for files in public and private GitHub repositories. Usage:</p>
    <code>{origin}{pattern}</code>
    <p>For example:</p>
    <code>{origin}/username/images/main/folder/image.jpg</code>

    <div class="note">
      <h3>Private repositories</h3>
      <p>Private repositories need a GitHub token, passed in one of two ways:</p>
      <ol>
        <li>Query parameter: <code>{origin}/username/repo/main/image.jpg?token=YOUR_GITHUB_TOKEN</code></li>
        <li>Request header: <code>X-GitHub-Token: YOUR_GITHUB_TOKEN</code></li>
      </ol>
      <p>The token must have read access to the repository.</p>
    </div>

    <p>Configure this URL as the custom domain of your image hosting tool.</p>
  </body>
</html>"#,
        origin = origin,
        pattern = USAGE_PATTERN,
    )
}

/// The full info page response.
pub fn info_page(headers: &HeaderMap, policy: &ResponseHeaderPolicy) -> Response {
    let mut response = Html(render(&request_origin(headers))).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML_UTF8));
    response_headers.insert(header::CACHE_CONTROL, policy.cache_control().clone());
    response
}
