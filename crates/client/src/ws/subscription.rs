use std::collections::VecDeque;
use std::marker::PhantomData;

use bizdesk_shared::{ClientError, ErrorDescriptor, Operation};
use serde::de::DeserializeOwned;

use super::connection::{WsConnection, WsEvent};
use super::session::{ProtocolStep, SubscriptionProtocol};
use crate::query::decode;
use crate::stores::cache::CacheHandle;

/// A running subscription. Events are normalized into the cache before being
/// handed out, so watching queries see pushed updates too.
pub struct Subscription<T> {
    operation: &'static Operation,
    connection: WsConnection,
    protocol: SubscriptionProtocol,
    cache: CacheHandle,
    pending: VecDeque<Result<T, ErrorDescriptor>>,
    done: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    pub(crate) fn new(
        operation: &'static Operation,
        connection: WsConnection,
        protocol: SubscriptionProtocol,
        cache: CacheHandle,
    ) -> Self {
        Self {
            operation,
            connection,
            protocol,
            cache,
            pending: VecDeque::new(),
            done: false,
            _payload: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        self.protocol.id()
    }

    /// Next pushed payload, or `None` once the server completed the
    /// subscription or the socket went away.
    pub async fn next(&mut self) -> Option<Result<T, ErrorDescriptor>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }

            match self.connection.next_event().await {
                Some(WsEvent::Opened) => {
                    let init = self.protocol.on_open();
                    self.send(&init);
                }
                Some(WsEvent::Message(text)) => {
                    for step in self.protocol.on_message(&text) {
                        self.handle(step);
                    }
                }
                Some(WsEvent::Closed { reason }) => {
                    self.done = true;
                    if !self.protocol.is_finished() {
                        let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                        crate::log_warn!("Subscription {} closed: {}", self.operation.name, reason);
                        return Some(Err(ClientError::Protocol(reason).descriptor()));
                    }
                }
                None => self.done = true,
            }
        }
    }

    fn handle(&mut self, step: ProtocolStep) {
        match step {
            ProtocolStep::Send(message) => self.send(&message),
            ProtocolStep::Emit(Ok(data)) => {
                self.cache.write_entities(&data);
                let item = decode::<T>(self.operation, &data).map_err(|e| e.descriptor());
                self.pending.push_back(item);
            }
            ProtocolStep::Emit(Err(err)) => self.pending.push_back(Err(err.descriptor())),
            ProtocolStep::Done => {
                self.done = true;
                self.connection.close();
            }
        }
    }

    fn send<M: serde::Serialize>(&self, message: &M) {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Err(e) = self.connection.send(json) {
                    crate::log_error!("{}", e);
                }
            }
            Err(e) => crate::log_error!("Serialize failed: {}", e),
        }
    }
}

impl<T> Subscription<T> {
    /// Tell the server to stop and close the socket.
    pub fn close(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Some(complete) = self.protocol.close() {
            if let Ok(json) = serde_json::to_string(&complete) {
                let _ = self.connection.send(json);
            }
        }
        self.connection.close();
        crate::log_debug!("Subscription {} closed by client", self.operation.name);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.close();
    }
}
