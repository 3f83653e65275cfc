use crate::http::{Request, Response};
use crate::mime::get_mime_type;
use percent_encoding::percent_decode_str;
use std::path::Path;

/// Serves files under `root` for targets beginning with `prefix`.
#[derive(Clone, Debug, Default)]
pub struct StaticHandler {
    pub prefix: String,
    pub root: String,
}

impl StaticHandler {
    pub fn new(prefix: impl Into<String>, root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        Self {
            prefix: prefix.into(),
            root,
        }
    }

    pub fn handle(&self, request: &Request) -> Response {
        let decoded = decode_target(request.path());

        let rest = match decoded.strip_prefix(&self.prefix) {
            Some(rest) => rest,
            None => return Response::text(404, "404 Not Found"),
        };
        let mut file_path = String::with_capacity(self.root.len() + rest.len() + 1);
        file_path.push_str(&self.root);
        if !rest.starts_with('/') {
            file_path.push('/');
        }
        file_path.push_str(rest);

        // Traversal guard: no dot-dot segments, and the joined path must
        // still sit under the configured root.
        if file_path.contains("..") || !file_path.starts_with(&self.root) {
            return Response::text(404, "404 Not Found");
        }

        let path = Path::new(&file_path);
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            _ => return Response::text(404, "404 Not Found"),
        }

        match std::fs::read(path) {
            Ok(bytes) => Response::with_body(200, get_mime_type(&file_path), bytes),
            Err(_) => Response::text(500, "500 Internal Server Error"),
        }
    }
}

// '+' becomes a space before %xx decoding so an encoded plus survives.
fn decode_target(path: &str) -> String {
    let plus_decoded = path.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}
