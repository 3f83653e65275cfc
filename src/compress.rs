use crate::http::{Request, Response};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

// Bodies at or below this size are cheaper to send uncompressed.
pub const MIN_COMPRESS_BYTES: usize = 1024;

fn accepts_gzip(request: &Request) -> bool {
    request.headers.get_all("Accept-Encoding").any(|value| {
        value.split(',').any(|token| {
            token
                .split(';')
                .next()
                .map_or(false, |coding| coding.trim().eq_ignore_ascii_case("gzip"))
        })
    })
}

/// Gzip-compresses the response body in place when the client advertises
/// support, the body is large enough, and no other encoding is already
/// applied. Compression failure leaves the response untouched.
pub fn apply(request: &Request, response: &mut Response) {
    if response.body.len() <= MIN_COMPRESS_BYTES {
        return;
    }
    if response.headers.contains("Content-Encoding") {
        return;
    }
    if !accepts_gzip(request) {
        return;
    }

    let mut encoder = GzEncoder::new(
        Vec::with_capacity(response.body.len() / 2),
        Compression::default(),
    );
    if encoder.write_all(&response.body).is_err() {
        return;
    }
    if let Ok(compressed) = encoder.finish() {
        response.body = compressed;
        response.headers.set("Content-Encoding", "gzip");
    }
}
