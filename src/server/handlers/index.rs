//! Informational root page describing the proxy API.

use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>HLS Relay</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }
        .container { max-width: 800px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; }
        h1 { color: #333; }
        .info { background: #e3f2fd; padding: 15px; border-radius: 5px; margin: 20px 0; }
        .example { background: #f8f9fa; padding: 15px; border-radius: 5px; margin: 10px 0; font-family: monospace; }
    </style>
</head>
<body>
    <div class="container">
        <h1>HLS Relay</h1>
        <div class="info">
            <p>This relay re-serves HLS manifests and segments so that a
            browser-based player can consume streams that are otherwise
            blocked by CORS or referrer checks.</p>
        </div>
        <div class="info">
            <h3>API</h3>
            <div class="example">GET /proxy?url=[TARGET_URL]&amp;referer=[REFERER_URL]</div>
            <ul>
                <li><code>url</code>: target manifest or segment URL (required, percent-encoded)</li>
                <li><code>referer</code>: Referer header to send upstream (optional)</li>
            </ul>
        </div>
        <div class="info">
            <h3>Example</h3>
            <div class="example">/proxy?url=https%3A%2F%2Fcdn.example.com%2Fvideo.m3u8&amp;referer=https%3A%2F%2Fexample.com%2F</div>
        </div>
    </div>
</body>
</html>
"#;

/// Serve the descriptive HTML index page.
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
