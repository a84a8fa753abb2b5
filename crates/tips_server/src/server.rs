//! Main broker server.

use crate::config::ServerConfig;
use crate::handler::{HandlerContext, RequestHandler};
use crate::protocol::{Request, Response};
use std::sync::Arc;
use tips_core::{Broker, CancelToken};

/// The tips server.
///
/// Owns a broker and answers protocol requests against it. Transport-free:
/// [`listener::serve`](crate::listener::serve) feeds it lines from TCP
/// connections, and tests can call it directly.
///
/// # Example
///
/// ```
/// use tips_server::{ServerConfig, TipsServer};
///
/// let server = TipsServer::new(ServerConfig::default());
/// let reply = server.handle_line(r#"{"op":"create_topic","topic":"t1"}"#);
/// assert_eq!(reply, r#"{"status":200,"body":"t1"}"#);
/// ```
pub struct TipsServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl TipsServer {
    /// Creates a new server with a fresh broker.
    pub fn new(config: ServerConfig) -> Self {
        let broker = Arc::new(Broker::new(config.broker.clone()));
        Self::with_broker(config, broker)
    }

    /// Creates a server around an existing broker.
    pub fn with_broker(config: ServerConfig, broker: Arc<Broker>) -> Self {
        let context = Arc::new(HandlerContext::new(config, broker));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles a parsed request.
    pub fn handle(&self, request: Request) -> Response {
        self.handler.respond(request)
    }

    /// Handles one request line and returns the response line.
    pub fn handle_line(&self, line: &str) -> String {
        self.handle_line_with(line, self.request_token())
    }

    /// Handles one request line whose pull, if any, is bound to `cancel`.
    ///
    /// Use a token from [`request_token`](Self::request_token) so that
    /// server shutdown still reaches the request.
    pub fn handle_line_with(&self, line: &str, cancel: CancelToken) -> String {
        let response = match Request::parse(line) {
            Ok(request) => self.handler.respond_with(request, cancel),
            Err(err) => {
                tracing::debug!(error = %err, "rejected request line");
                Response::from_error(&err)
            }
        };
        response.to_line()
    }

    /// Returns a fresh per-request token, cancelled on shutdown.
    pub fn request_token(&self) -> CancelToken {
        self.context.shutdown.child()
    }

    /// Releases every blocked pull. Pulls issued afterwards return
    /// immediately when nothing is available.
    pub fn shutdown(&self) {
        tracing::info!("server shutting down");
        self.context.shutdown.cancel();
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.context.shutdown.is_cancelled()
    }

    /// Returns the broker.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.context.broker
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}
