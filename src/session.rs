use crate::compress;
use crate::http::{read_request, Response, Version};
use crate::registry::Router;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

// How long an idle keep-alive connection may wait for the next request.
const KEEPALIVE_TIMEOUT_SECS: u64 = 5;

/// Per-connection state machine: read a request, route it, invoke the
/// handler, post-process, write, and recycle on keep-alive.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<Router>,
}

impl Session {
    pub fn new(stream: TcpStream, peer: SocketAddr, router: Arc<Router>) -> Self {
        Self {
            stream,
            peer,
            router,
        }
    }

    pub async fn run(mut self) {
        loop {
            // A fresh BufReader per request; requests are strictly serial
            // per connection.
            let outcome = {
                let mut reader = BufReader::new(&mut self.stream);
                timeout(
                    Duration::from_secs(KEEPALIVE_TIMEOUT_SECS),
                    read_request(&mut reader),
                )
                .await
            };
            let request = match outcome {
                Err(_) => break,         // idle timeout
                Ok(Ok(None)) => break,   // clean end of stream
                Ok(Ok(Some(request))) => request,
                Ok(Err(_)) => {
                    // Parse or read failure: answer 400 and close.
                    let mut response = Response::text(400, "400 Bad Request");
                    response.headers.set("Connection", "close");
                    let _ = self
                        .write_response(Version::Http11, &response, "-", "-", "-")
                        .await;
                    break;
                }
            };

            let (kind, handler) = self.router.route(&request.target);
            let mut response = handler.handle(&request).await;
            compress::apply(&request, &mut response);

            let keep_alive = request.keep_alive();
            response
                .headers
                .set("Connection", if keep_alive { "keep-alive" } else { "close" });

            if self
                .write_response(
                    request.version,
                    &response,
                    request.method.as_str(),
                    &request.target,
                    kind,
                )
                .await
                .is_err()
            {
                break;
            }
            if !keep_alive {
                break;
            }
        }
    }

    async fn write_response(
        &mut self,
        version: Version,
        response: &Response,
        method: &str,
        target: &str,
        handler: &str,
    ) -> io::Result<()> {
        let bytes = response.serialize(version);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        tracing::info!(
            status = response.status,
            method,
            target,
            peer = %self.peer,
            handler,
            "request served"
        );
        Ok(())
    }
}
