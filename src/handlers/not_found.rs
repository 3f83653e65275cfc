use crate::http::{Request, Response};

/// Terminal handler for unmatched routes and missing targets.
#[derive(Debug, Default)]
pub struct NotFoundHandler;

impl NotFoundHandler {
    pub fn handle(&self, _request: &Request) -> Response {
        Response::text(404, "404 Not Found")
    }
}
