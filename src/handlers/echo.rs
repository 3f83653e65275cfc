use crate::http::{Request, Response};

/// Reflects the serialized request back as plain text. Used for diagnostics
/// and as the simplest end-to-end smoke target.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl EchoHandler {
    pub fn handle(&self, request: &Request) -> Response {
        Response::text(200, request.serialize())
    }
}
