pub mod compress;
pub mod config;
pub mod fs;
pub mod handlers;
pub mod http;
pub mod mime;
pub mod registry;
pub mod server;
pub mod session;

pub use mime::{get_mime_type, get_mime_type_enum, MimeType};
