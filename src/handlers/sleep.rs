use crate::http::{Request, Response};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_DELAY_MS: u64 = 3000;

/// Delays its response by a configured amount. Exists to demonstrate that a
/// slow handler occupies one task without stalling other connections.
#[derive(Debug)]
pub struct SleepHandler {
    pub delay: Duration,
}

impl Default for SleepHandler {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl SleepHandler {
    pub async fn handle(&self, _request: &Request) -> Response {
        sleep(self.delay).await;
        Response::text(200, "Slept")
    }
}
