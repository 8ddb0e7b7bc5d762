//! Static file mounts.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use mime::Mime;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.html";

/// A directory or a single file served for GET and HEAD requests. A hit answers ahead of the
/// route table, a miss leaves the request to it.
#[derive(Debug)]
pub(crate) enum StaticMount {
    Dir { prefix: String, root: PathBuf },
    File { path: String, file: PathBuf },
}

impl StaticMount {
    pub(crate) fn dir(prefix: &str, root: PathBuf) -> Self {
        Self::Dir { prefix: prefix.trim_end_matches('/').to_owned(), root }
    }

    pub(crate) fn file(path: &str, file: PathBuf) -> Self {
        Self::File { path: path.to_owned(), file }
    }

    /// Whether a request for `path` belongs to this mount.
    pub(crate) fn contains(&self, path: &str) -> bool {
        match self {
            Self::Dir { prefix, .. } => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            Self::File { path: mounted, .. } => path == mounted,
        }
    }

    /// Loads the file serving `path`, `None` when there is nothing to serve.
    ///
    /// With `head_only` the response carries the headers of the file without its content.
    pub(crate) async fn load(&self, path: &str, head_only: bool) -> Option<Response<Full<Bytes>>> {
        let file = match self {
            Self::Dir { prefix, root } => {
                let relative = path.strip_prefix(prefix.as_str())?.trim_start_matches('/');
                resolve(root, relative).await?
            }
            Self::File { file, .. } => file.clone(),
        };

        let content = match tokio::fs::read(&file).await {
            Ok(content) => content,
            Err(e) => {
                debug!(cause = %e, file = %file.display(), "static file not readable");
                return None;
            }
        };
        debug!(path, file = %file.display(), size = content.len(), "serving static file");

        Some(file_response(&file, content, head_only))
    }
}

async fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.split('/').any(|segment| segment == "..") {
        warn!(path = relative, "rejected static path with parent segment");
        return None;
    }

    let mut file = root.join(relative);
    if tokio::fs::metadata(&file).await.ok()?.is_dir() {
        file.push(INDEX_FILE);
    }

    let root = tokio::fs::canonicalize(root).await.ok()?;
    let resolved = tokio::fs::canonicalize(&file).await.ok()?;
    if !resolved.starts_with(&root) {
        warn!(file = %resolved.display(), root = %root.display(), "static path escapes its mount");
        return None;
    }
    Some(resolved)
}

fn file_response(file: &Path, content: Vec<u8>, head_only: bool) -> Response<Full<Bytes>> {
    let content_type = content_type_for(file);
    let length = content.len();
    let body = if head_only { Bytes::new() } else { Bytes::from(content) };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

/// The content type of a file, guessed from its extension.
pub(crate) fn content_type_for(path: &Path) -> Mime {
    let extension = path.extension().and_then(|extension| extension.to_str()).map(str::to_ascii_lowercase);
    let essence = match extension.as_deref() {
        Some("html" | "htm") => return mime::TEXT_HTML_UTF_8,
        Some("css") => return mime::TEXT_CSS_UTF_8,
        Some("txt" | "md") => return mime::TEXT_PLAIN_UTF_8,
        Some("js" | "mjs") => return mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("json") => return mime::APPLICATION_JSON,
        Some("xml") => return mime::TEXT_XML,
        Some("csv") => return mime::TEXT_CSV_UTF_8,
        Some("png") => return mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => return mime::IMAGE_JPEG,
        Some("gif") => return mime::IMAGE_GIF,
        Some("svg") => return mime::IMAGE_SVG,
        Some("bmp") => return mime::IMAGE_BMP,
        Some("pdf") => return mime::APPLICATION_PDF,
        Some("woff") => return mime::FONT_WOFF,
        Some("woff2") => return mime::FONT_WOFF2,
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("wasm") => "application/wasm",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::{content_type_for, StaticMount};
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use http::StatusCode;
    use http_body_util::BodyExt;
    use std::path::Path;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
        std::fs::write(dir.path().join("docs").join("notes.txt"), "notes").unwrap();
        dir
    }

    async fn body_of(mount: &StaticMount, path: &str) -> Option<String> {
        let response = mount.load(path, false).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Some(String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_contains() {
        let mount = StaticMount::dir("/assets/", "assets".into());
        assert!(mount.contains("/assets"));
        assert!(mount.contains("/assets/app.js"));
        assert!(!mount.contains("/assetsx/app.js"));
        assert!(!mount.contains("/"));

        let root = StaticMount::dir("/", "public".into());
        assert!(root.contains("/"));
        assert!(root.contains("/app.js"));

        let file = StaticMount::file("/favicon.ico", "favicon.ico".into());
        assert!(file.contains("/favicon.ico"));
        assert!(!file.contains("/favicon.ico/x"));
    }

    #[tokio::test]
    async fn test_serve_dir() {
        let dir = fixture();
        let mount = StaticMount::dir("/assets", dir.path().to_path_buf());

        assert_eq!(body_of(&mount, "/assets/app.js").await.as_deref(), Some("console.log(1)"));
        assert_eq!(body_of(&mount, "/assets").await.as_deref(), Some("<h1>home</h1>"));
        assert_eq!(body_of(&mount, "/assets/").await.as_deref(), Some("<h1>home</h1>"));
        assert_eq!(body_of(&mount, "/assets/docs").await.as_deref(), Some("<h1>docs</h1>"));
        assert_eq!(body_of(&mount, "/assets/docs/notes.txt").await.as_deref(), Some("notes"));
        assert!(mount.load("/assets/missing.css", false).await.is_none());
    }

    #[tokio::test]
    async fn test_parent_segments_rejected() {
        let dir = fixture();
        let public = dir.path().join("docs");
        let mount = StaticMount::dir("/docs", public);

        assert!(mount.load("/docs/../index.html", false).await.is_none());
        assert!(mount.load("/docs/../../etc/passwd", false).await.is_none());
        assert_eq!(body_of(&mount, "/docs/notes.txt").await.as_deref(), Some("notes"));
    }

    #[tokio::test]
    async fn test_names_with_spaces() {
        let dir = fixture();
        std::fs::write(dir.path().join("my file.txt"), "spaced").unwrap();
        let mount = StaticMount::dir("/assets", dir.path().to_path_buf());

        // mounts see the path after percent-decoding
        assert_eq!(body_of(&mount, "/assets/my file.txt").await.as_deref(), Some("spaced"));
        assert!(mount.load("/assets/my%20file.txt", false).await.is_none());
    }

    #[tokio::test]
    async fn test_head_has_headers_only() {
        let dir = fixture();
        let mount = StaticMount::file("/script.js", dir.path().join("app.js"));

        let response = mount.load("/script.js", true).await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript; charset=utf-8");
        assert_eq!(response.headers()[CONTENT_LENGTH], "14");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("index.html")), mime::TEXT_HTML_UTF_8);
        assert_eq!(content_type_for(Path::new("style.CSS")), mime::TEXT_CSS_UTF_8);
        assert_eq!(content_type_for(Path::new("logo.png")), mime::IMAGE_PNG);
        assert_eq!(content_type_for(Path::new("favicon.ico")).essence_str(), "image/x-icon");
        assert_eq!(content_type_for(Path::new("archive.tar.xz")), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(content_type_for(Path::new("Makefile")), mime::APPLICATION_OCTET_STREAM);
    }
}
