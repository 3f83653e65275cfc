use crate::http::{Request, Response};

#[derive(Debug, Default)]
pub struct HealthHandler;

impl HealthHandler {
    pub fn handle(&self, _request: &Request) -> Response {
        Response::text(200, "OK")
    }
}
