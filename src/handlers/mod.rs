pub mod crud;
pub mod echo;
pub mod health;
pub mod markdown;
pub mod not_found;
pub mod sleep;
pub mod static_files;

pub use crud::CrudHandler;
pub use echo::EchoHandler;
pub use health::HealthHandler;
pub use markdown::MarkdownHandler;
pub use not_found::NotFoundHandler;
pub use sleep::SleepHandler;
pub use static_files::StaticHandler;

use crate::http::{Request, Response};

/// The closed set of request handlers. Each variant maps a request to a
/// response and never fails across this boundary; errors are encoded as
/// status codes.
pub enum Handler {
    Echo(EchoHandler),
    Static(StaticHandler),
    Crud(CrudHandler),
    Markdown(MarkdownHandler),
    Health(HealthHandler),
    Sleep(SleepHandler),
    NotFound(NotFoundHandler),
}

impl Handler {
    /// Config-facing type name, also used in the per-request log record.
    pub fn type_name(&self) -> &'static str {
        match self {
            Handler::Echo(_) => "EchoHandler",
            Handler::Static(_) => "StaticHandler",
            Handler::Crud(_) => "CrudHandler",
            Handler::Markdown(_) => "MarkdownHandler",
            Handler::Health(_) => "HealthRequestHandler",
            Handler::Sleep(_) => "SleepHandler",
            Handler::NotFound(_) => "NotFoundHandler",
        }
    }

    pub async fn handle(&self, request: &Request) -> Response {
        match self {
            Handler::Echo(h) => h.handle(request),
            Handler::Static(h) => h.handle(request),
            Handler::Crud(h) => h.handle(request),
            Handler::Markdown(h) => h.handle(request),
            Handler::Health(h) => h.handle(request),
            Handler::Sleep(h) => h.handle(request).await,
            Handler::NotFound(h) => h.handle(request),
        }
    }
}
