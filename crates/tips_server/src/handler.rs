//! Request dispatch.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::protocol::{
    parse_id, Request, Response, WireMessage, WirePull, WireSnapshot, WireStats,
    WireSubscription, WireTopic,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tips_core::{Broker, CancelToken, MessageId, PullRequest};

/// Context shared by every request handler.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The broker all requests run against.
    pub broker: Arc<Broker>,
    /// Fires on server shutdown and releases blocked pulls.
    pub shutdown: CancelToken,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, broker: Arc<Broker>) -> Self {
        Self {
            config,
            broker,
            shutdown: CancelToken::new(),
        }
    }
}

/// Handler for broker requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a request and wraps the outcome in a [`Response`].
    ///
    /// May block for the duration of a pull.
    pub fn respond(&self, request: Request) -> Response {
        self.respond_with(request, self.context.shutdown.child())
    }

    /// Like [`respond`](Self::respond), with a caller-owned cancel token.
    ///
    /// Cancelling `cancel` releases a blocked pull with an empty result.
    pub fn respond_with(&self, request: Request, cancel: CancelToken) -> Response {
        let op = request.op();
        match self.handle_with(request, cancel) {
            Ok(body) => Response::ok(body),
            Err(err) => {
                if err.is_server_error() {
                    tracing::warn!(op, error = %err, "request failed");
                } else {
                    tracing::debug!(op, error = %err, "request rejected");
                }
                Response::from_error(&err)
            }
        }
    }

    /// Handles a request and returns the response body.
    pub fn handle(&self, request: Request) -> ServerResult<Value> {
        self.handle_with(request, self.context.shutdown.child())
    }

    /// Handles a request whose pull, if any, is bound to `cancel`.
    pub fn handle_with(&self, request: Request, cancel: CancelToken) -> ServerResult<Value> {
        let broker = &self.context.broker;
        tracing::trace!(op = request.op(), "handling request");

        match request {
            Request::CreateTopic { topic } => {
                broker.create_topic(&topic)?;
                Ok(Value::String(topic))
            }
            Request::Topic { topic } => body(WireTopic::from(broker.topic(&topic)?)),
            Request::DestroyTopic { topic } => {
                broker.destroy_topic(&topic)?;
                Ok(Value::Null)
            }
            Request::Publish { topic, messages } => {
                let ids = broker.publish(&topic, messages)?;
                body(ids.iter().map(|id| id.as_u64().to_string()).collect::<Vec<_>>())
            }
            Request::Subscribe {
                topic,
                subscription,
            } => body(broker.subscribe(&topic, &subscription)?),
            Request::Unsubscribe {
                topic,
                subscription,
            } => {
                broker.unsubscribe(&topic, &subscription)?;
                Ok(Value::Null)
            }
            Request::Subscription {
                topic,
                subscription,
            } => body(WireSubscription::from(
                broker.subscription(&topic, &subscription)?,
            )),
            Request::Pull {
                topic,
                subscription,
                limit,
                autoack,
                timeout,
                offset,
            } => self.handle_pull(
                &topic,
                &subscription,
                limit,
                autoack,
                timeout,
                offset,
                cancel,
            ),
            Request::Ack {
                topic,
                subscription,
                ids,
            } => {
                let ids = ids
                    .iter()
                    .map(|raw| parse_id(raw))
                    .collect::<ServerResult<Vec<MessageId>>>()?;
                broker.ack(&topic, &subscription, &ids)?;
                Ok(Value::Null)
            }
            Request::CreateSnapshot {
                topic,
                subscription,
                name,
            } => Ok(Value::String(broker.create_snapshot(
                &topic,
                &subscription,
                &name,
            )?)),
            Request::RestoreSnapshot {
                topic,
                subscription,
                name,
            } => body(WireSnapshot::from(broker.restore_snapshot(
                &topic,
                &subscription,
                &name,
            )?)),
            Request::DeleteSnapshot {
                topic,
                subscription,
                name,
            } => {
                broker.delete_snapshot(&topic, &subscription, &name)?;
                Ok(Value::Null)
            }
            Request::Snapshots {
                topic,
                subscription,
            } => body(
                broker
                    .snapshots(&topic, &subscription)?
                    .into_iter()
                    .map(WireSnapshot::from)
                    .collect::<Vec<_>>(),
            ),
            Request::Seek {
                topic,
                subscription,
                name,
            } => body(WireSnapshot::from(broker.seek(
                &topic,
                &subscription,
                &name,
            )?)),
            Request::Stats => body(WireStats::from(broker.stats())),
        }
    }

    /// Handles a pull.
    ///
    /// The wire `offset` names the last message the client holds, so
    /// reading resumes one past it. `timeout` is in seconds.
    #[allow(clippy::too_many_arguments)]
    fn handle_pull(
        &self,
        topic: &str,
        subscription: &str,
        limit: i64,
        autoack: bool,
        timeout: Option<f64>,
        offset: Option<String>,
        cancel: CancelToken,
    ) -> ServerResult<Value> {
        // Non-positive limits become zero, which the broker rejects.
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut request = PullRequest::new(limit).autoack(autoack).cancel(cancel);

        if let Some(secs) = timeout {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                ServerError::InvalidRequest(format!("invalid timeout {secs}"))
            })?;
            request = request.timeout(timeout);
        }
        if let Some(raw) = offset {
            let start = parse_id(&raw)?
                .as_u64()
                .checked_add(1)
                .ok_or_else(|| ServerError::InvalidRequest(format!("offset {raw} out of range")))?;
            request = request.offset(start);
        }

        let result = self.context.broker.pull(topic, subscription, request)?;
        body(WirePull {
            messages: result.messages.iter().map(WireMessage::from).collect(),
            next_offset: result.next_offset,
        })
    }
}

fn body<T: Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))
}
