//! `graphql-transport-ws` handshake and message handling for one subscription.
//!
//! Pure state machine: feed it socket events, get back frames to send and
//! payloads to hand to the subscriber. The socket itself lives in
//! [`super::connection`].

use bizdesk_shared::{ClientError, GraphqlRequest, WsClientMessage, WsServerMessage};
use serde_json::{json, Value};

use crate::auth_session::SessionToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Subscribed,
    Finished,
}

/// What the caller should do after feeding an event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolStep {
    Send(WsClientMessage),
    Emit(Result<Value, ClientError>),
    Done,
}

#[derive(Debug)]
pub struct SubscriptionProtocol {
    id: String,
    request: GraphqlRequest,
    token: Option<SessionToken>,
    phase: Phase,
}

impl SubscriptionProtocol {
    pub fn new(id: impl Into<String>, request: GraphqlRequest, token: Option<SessionToken>) -> Self {
        Self {
            id: id.into(),
            request,
            token,
            phase: Phase::Connecting,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// First frame once the socket is open. Carries the bearer credential.
    pub fn on_open(&self) -> WsClientMessage {
        WsClientMessage::ConnectionInit {
            payload: self
                .token
                .as_ref()
                .map(|token| json!({ "Authorization": token.bearer() })),
        }
    }

    pub fn on_message(&mut self, text: &str) -> Vec<ProtocolStep> {
        let message = match serde_json::from_str::<WsServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                crate::log_warn!("Unreadable subscription frame: {}", e);
                return vec![ProtocolStep::Emit(Err(ClientError::Protocol(format!(
                    "unreadable subscription frame: {e}"
                ))))];
            }
        };

        match message {
            WsServerMessage::ConnectionAck { .. } if self.phase == Phase::Connecting => {
                self.phase = Phase::Subscribed;
                crate::log_debug!("Subscription {} acknowledged", self.id);
                vec![ProtocolStep::Send(WsClientMessage::Subscribe {
                    id: self.id.clone(),
                    payload: self.request.clone(),
                })]
            }
            WsServerMessage::ConnectionAck { .. } => Vec::new(),
            WsServerMessage::Next { id, payload } if id == self.id => {
                if let Some(first) = payload.errors.first() {
                    return vec![ProtocolStep::Emit(Err(ClientError::Application {
                        message: first.message.clone(),
                        code: first.code(),
                    }))];
                }
                match payload.data {
                    Some(data) if !data.is_null() => vec![ProtocolStep::Emit(Ok(data))],
                    _ => vec![ProtocolStep::Emit(Err(ClientError::Protocol(
                        "subscription event without data".to_string(),
                    )))],
                }
            }
            WsServerMessage::Error { id, payload } if id == self.id => {
                self.phase = Phase::Finished;
                let message = payload
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                let code = payload.first().and_then(|e| e.code());
                vec![
                    ProtocolStep::Emit(Err(ClientError::Application { message, code })),
                    ProtocolStep::Done,
                ]
            }
            WsServerMessage::Complete { id } if id == self.id => {
                self.phase = Phase::Finished;
                vec![ProtocolStep::Done]
            }
            WsServerMessage::Ping { .. } => {
                vec![ProtocolStep::Send(WsClientMessage::Pong { payload: None })]
            }
            _ => Vec::new(),
        }
    }

    /// Frame to send when the subscriber stops listening, if the server
    /// knows about the subscription.
    pub fn close(&mut self) -> Option<WsClientMessage> {
        let was_subscribed = self.phase == Phase::Subscribed;
        self.phase = Phase::Finished;
        was_subscribed.then(|| WsClientMessage::Complete {
            id: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(token: Option<&str>) -> SubscriptionProtocol {
        let request = GraphqlRequest {
            query: "subscription employeeUpdated { employeeUpdated { id } }".to_string(),
            operation_name: Some("employeeUpdated".to_string()),
            variables: json!({}),
        };
        SubscriptionProtocol::new("sub-1", request, token.and_then(SessionToken::new))
    }

    #[test]
    fn init_carries_bearer_token() {
        let init = protocol(Some("tok")).on_open();
        assert_eq!(
            init,
            WsClientMessage::ConnectionInit {
                payload: Some(json!({"Authorization": "Bearer tok"}))
            }
        );
        assert_eq!(
            protocol(None).on_open(),
            WsClientMessage::ConnectionInit { payload: None }
        );
    }

    #[test]
    fn ack_then_next_then_complete() {
        let mut p = protocol(Some("tok"));
        let steps = p.on_message(r#"{"type":"connection_ack"}"#);
        assert!(matches!(&steps[..], [ProtocolStep::Send(WsClientMessage::Subscribe { id, .. })] if id == "sub-1"));

        let steps = p.on_message(
            r#"{"type":"next","id":"sub-1","payload":{"data":{"employeeUpdated":{"id":"e1"}}}}"#,
        );
        assert_eq!(
            steps,
            vec![ProtocolStep::Emit(Ok(json!({"employeeUpdated": {"id": "e1"}})))]
        );

        assert_eq!(
            p.on_message(r#"{"type":"complete","id":"sub-1"}"#),
            vec![ProtocolStep::Done]
        );
        assert!(p.is_finished());
    }

    #[test]
    fn other_ids_are_ignored() {
        let mut p = protocol(None);
        p.on_message(r#"{"type":"connection_ack"}"#);
        assert!(p
            .on_message(r#"{"type":"next","id":"other","payload":{"data":{}}}"#)
            .is_empty());
    }

    #[test]
    fn server_error_ends_subscription() {
        let mut p = protocol(None);
        p.on_message(r#"{"type":"connection_ack"}"#);
        let steps = p.on_message(
            r#"{"type":"error","id":"sub-1","payload":[{"message":"Not authorized"}]}"#,
        );
        assert_eq!(
            steps,
            vec![
                ProtocolStep::Emit(Err(ClientError::Application {
                    message: "Not authorized".to_string(),
                    code: None
                })),
                ProtocolStep::Done
            ]
        );
    }

    #[test]
    fn ping_is_answered() {
        let mut p = protocol(None);
        assert_eq!(
            p.on_message(r#"{"type":"ping"}"#),
            vec![ProtocolStep::Send(WsClientMessage::Pong { payload: None })]
        );
    }

    #[test]
    fn close_completes_only_after_subscribe() {
        let mut p = protocol(None);
        assert_eq!(p.close(), None);

        let mut p = protocol(None);
        p.on_message(r#"{"type":"connection_ack"}"#);
        assert_eq!(
            p.close(),
            Some(WsClientMessage::Complete {
                id: "sub-1".to_string()
            })
        );
    }

    #[test]
    fn garbage_frame_is_protocol_error() {
        let mut p = protocol(None);
        let steps = p.on_message("not json");
        assert!(matches!(&steps[..], [ProtocolStep::Emit(Err(ClientError::Protocol(_)))]));
    }
}
