use std::path::Path;

use crate::error::Result;

/// Served at `GET /` when no index template is configured.
const DEFAULT_INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>linkpaste</title>
</head>
<body>
    <h1>linkpaste</h1>
    <p>Shorten a URL or share a file up to {{max_file_mib}} MiB.</p>
    <pre>
curl -F url=https://example.org/long/link {{url}}
curl -F file=@notes.txt {{url}}
curl -F auth=TOKEN -F file=@notes.txt {{url}}
    </pre>
    <form method="post" enctype="multipart/form-data">
        <p><input type="text" name="url" placeholder="https://..."></p>
        <p><input type="file" name="file"></p>
        <p><input type="password" name="auth" placeholder="token (if required)"></p>
        <p><button type="submit">Submit</button></p>
    </form>
</body>
</html>
"#;

pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Fill `{{url}}` and `{{max_file_mib}}` in an index template.
pub fn render_index(template: &str, public_url: &str, max_file_bytes: u64) -> String {
    let max_file_mib = max_file_bytes / (1 << 20);
    template
        .replace("{{url}}", &html_escape(public_url))
        .replace("{{max_file_mib}}", &max_file_mib.to_string())
}

/// Render the index page once at startup, from `path` if given.
pub fn load_index(path: Option<&Path>, public_url: &str, max_file_bytes: u64) -> Result<String> {
    let template = match path {
        Some(p) => std::fs::read_to_string(p)?,
        None => DEFAULT_INDEX_TEMPLATE.to_string(),
    };
    Ok(render_index(&template, public_url, max_file_bytes))
}
