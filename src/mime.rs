use std::path::Path;

// Content types the static handler can emit, indexed for O(1) lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MimeType {
    Html = 0,
    Css = 1,
    Javascript = 2,
    Jpeg = 3,
    Png = 4,
    Gif = 5,
    PlainText = 6,
    Pdf = 7,
    Zip = 8,
    Icon = 9,
    Svg = 10,
    OctetStream = 11,
}

impl MimeType {
    const MIME_STRINGS: [&'static str; 12] = [
        "text/html",                // Html
        "text/css",                 // Css
        "application/javascript",   // Javascript
        "image/jpeg",               // Jpeg
        "image/png",                // Png
        "image/gif",                // Gif
        "text/plain",               // PlainText
        "application/pdf",          // Pdf
        "application/zip",          // Zip
        "image/x-icon",             // Icon
        "image/svg+xml",            // Svg
        "application/octet-stream", // OctetStream
    ];

    pub fn as_str(self) -> &'static str {
        Self::MIME_STRINGS[self as usize]
    }
}

pub fn get_mime_type_enum(file_path: &Path) -> MimeType {
    if let Some(extension) = file_path.extension().and_then(|s| s.to_str()) {
        match extension.to_ascii_lowercase().as_str() {
            "html" => MimeType::Html,
            "css" => MimeType::Css,
            "js" => MimeType::Javascript,
            "jpg" | "jpeg" => MimeType::Jpeg,
            "png" => MimeType::Png,
            "gif" => MimeType::Gif,
            "txt" => MimeType::PlainText,
            "pdf" => MimeType::Pdf,
            "zip" => MimeType::Zip,
            "ico" => MimeType::Icon,
            "svg" => MimeType::Svg,
            _ => MimeType::OctetStream,
        }
    } else {
        MimeType::OctetStream
    }
}

/// Content-Type for a file path, falling back to `application/octet-stream`.
pub fn get_mime_type(file_path: &str) -> &'static str {
    get_mime_type_enum(Path::new(file_path)).as_str()
}
