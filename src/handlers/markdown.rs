use crate::http::{Request, Response};
use comrak::{markdown_to_html, Options};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

// Rendered documents and templates are capped at 1 MiB.
const MAX_DOCUMENT_BYTES: u64 = 1024 * 1024;
const CACHE_TTL: Duration = Duration::from_secs(5);

struct DirCacheEntry {
    html: Vec<u8>,
    etag: String,
    last_modified: String,
    inserted: Instant,
}

// Directory listings are rendered at most once per TTL window. The lock is
// held only around map access, never across filesystem I/O or rendering.
static DIR_CACHE: Lazy<Mutex<FxHashMap<PathBuf, DirCacheEntry>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Renders `.md` files under `root` as GitHub-flavoured Markdown, with an
/// HTML index for directories and conditional-GET caching throughout.
#[derive(Clone, Debug, Default)]
pub struct MarkdownHandler {
    pub prefix: String,
    pub root: PathBuf,
    pub template: Option<PathBuf>,
}

impl MarkdownHandler {
    pub fn new(
        prefix: impl Into<String>,
        root: impl Into<PathBuf>,
        template: Option<PathBuf>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
            template,
        }
    }

    pub fn handle(&self, request: &Request) -> Response {
        let path = request.path();
        let raw = request
            .query()
            .map_or(false, |q| q.split('&').any(|param| param == "raw=1"));

        let rest = match path.strip_prefix(&self.prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => return Response::text(404, "404 Not Found"),
        };
        let target = self.root.join(rest.trim_start_matches('/'));

        // Canonicalization doubles as the existence check and closes the
        // traversal hole the textual guard leaves open.
        let canon_root = match self.root.canonicalize() {
            Ok(canon) => canon,
            Err(_) => return Response::text(404, "404 Not Found"),
        };
        let canon = match target.canonicalize() {
            Ok(canon) => canon,
            Err(_) => return Response::text(404, "404 Not Found"),
        };
        if !canon.starts_with(&canon_root) {
            return Response::text(404, "404 Not Found");
        }

        if canon.is_dir() {
            self.serve_directory(request, path, &canon)
        } else {
            self.serve_file(request, path, &canon, raw)
        }
    }

    fn serve_directory(&self, request: &Request, path: &str, dir: &Path) -> Response {
        if !path.ends_with('/') {
            let mut response = Response::new(301);
            response.headers.set("Location", format!("{}/", path));
            return response;
        }

        {
            let cache = DIR_CACHE.lock();
            if let Some(entry) = cache.get(dir) {
                if entry.inserted.elapsed() < CACHE_TTL {
                    if let Some(not_modified) =
                        conditional_match(request, &entry.etag, &entry.last_modified)
                    {
                        return not_modified;
                    }
                    let mut response = Response::html(200, entry.html.clone());
                    response.headers.set("ETag", entry.etag.clone());
                    response.headers.set("Last-Modified", entry.last_modified.clone());
                    return response;
                }
            }
        }

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    match entry.file_type() {
                        Ok(t) if t.is_dir() => subdirs.push(name),
                        Ok(t) if t.is_file() && name.ends_with(".md") => files.push(name),
                        _ => {}
                    }
                }
            }
            Err(_) => return Response::text(500, "500 Internal Server Error"),
        }
        subdirs.sort();
        files.sort();

        let mut index = format!("<h1>Index of {}</h1>\n<ul>\n", path);
        for name in &subdirs {
            index.push_str(&format!("<li><a href=\"{0}/\">{0}/</a></li>\n", name));
        }
        for name in &files {
            index.push_str(&format!("<li><a href=\"{0}\">{0}</a></li>\n", name));
        }
        index.push_str("</ul>\n");

        let body = match self.wrap_in_template(&index) {
            Some(wrapped) => wrapped,
            None => index,
        };

        let mtime = std::fs::metadata(dir)
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let (etag, last_modified) = validators(body.len() as u64, mtime);

        let mut response = Response::html(200, body.clone());
        response.headers.set("ETag", etag.clone());
        response.headers.set("Last-Modified", last_modified.clone());

        DIR_CACHE.lock().insert(
            dir.to_path_buf(),
            DirCacheEntry {
                html: body.into_bytes(),
                etag,
                last_modified,
                inserted: Instant::now(),
            },
        );
        response
    }

    fn serve_file(&self, request: &Request, path: &str, file: &Path, raw: bool) -> Response {
        if !path.ends_with(".md") {
            return Response::text(404, "404 Not Found");
        }
        let meta = match std::fs::metadata(file) {
            Ok(meta) if meta.is_file() => meta,
            _ => return Response::text(404, "404 Not Found"),
        };

        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let (etag, last_modified) = validators(meta.len(), mtime);

        if let Some(not_modified) = conditional_match(request, &etag, &last_modified) {
            return not_modified;
        }

        if meta.len() > MAX_DOCUMENT_BYTES {
            return Response::text(413, "413 Payload Too Large");
        }
        if meta.len() == 0 {
            let mut response = Response::html(200, "");
            response.headers.set("ETag", etag);
            response.headers.set("Last-Modified", last_modified);
            return response;
        }

        let source = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(_) => return Response::text(500, "500 Internal Server Error"),
        };

        if raw {
            let mut response = Response::with_body(200, "text/markdown", source);
            response.headers.set("ETag", etag);
            response.headers.set("Last-Modified", last_modified);
            return response;
        }

        let html = render_markdown(&String::from_utf8_lossy(&source));
        let body = if self.template.is_some() {
            match self.read_template() {
                Ok(template) => match template.find("{{content}}") {
                    Some(_) => template.replacen("{{content}}", &html, 1),
                    None => html,
                },
                Err(()) => return Response::text(500, "500 Internal Server Error"),
            }
        } else {
            html
        };

        let mut response = Response::html(200, body);
        response.headers.set("ETag", etag);
        response.headers.set("Last-Modified", last_modified);
        response
    }

    // Directory indexes treat a broken template as "no template"; document
    // rendering treats it as a hard failure.
    fn wrap_in_template(&self, content: &str) -> Option<String> {
        let template = self.read_template().ok()?;
        if template.contains("{{content}}") {
            Some(template.replacen("{{content}}", content, 1))
        } else {
            None
        }
    }

    fn read_template(&self) -> Result<String, ()> {
        let path = self.template.as_ref().ok_or(())?;
        let meta = std::fs::metadata(path).map_err(|_| ())?;
        if meta.len() > MAX_DOCUMENT_BYTES {
            return Err(());
        }
        std::fs::read_to_string(path).map_err(|_| ())
    }
}

/// GitHub-flavoured rendering: tables, strikethrough, autolink, tagfilter,
/// tasklist. Raw HTML in the source passes through unchanged.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tagfilter = true;
    options.extension.tasklist = true;
    options.render.unsafe_ = true;
    markdown_to_html(source, &options)
}

// Strong validators from size and mtime, truncated to whole seconds so the
// ETag and the HTTP date always agree.
fn validators(len: u64, mtime: SystemTime) -> (String, String) {
    let secs = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    let truncated = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
    let etag = format!("\"{}-{}\"", len, secs);
    (etag, httpdate::fmt_http_date(truncated))
}

fn conditional_match(request: &Request, etag: &str, last_modified: &str) -> Option<Response> {
    let etag_hit = request
        .headers
        .get("If-None-Match")
        .map_or(false, |value| value.trim() == etag);
    let date_hit = request
        .headers
        .get("If-Modified-Since")
        .map_or(false, |value| value.trim() == last_modified);
    if etag_hit || date_hit {
        let mut response = Response::new(304);
        response.headers.set("ETag", etag);
        response.headers.set("Last-Modified", last_modified);
        Some(response)
    } else {
        None
    }
}
