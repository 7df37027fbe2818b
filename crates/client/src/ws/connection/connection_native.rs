//! Native/Desktop WebSocket implementation using tokio-tungstenite.

use bizdesk_shared::WS_SUBPROTOCOL;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{WsConnection, WsEvent};

/// Spawn the socket task on the current tokio runtime.
pub(super) fn open(url: &str) -> WsConnection {
    let (sender, outgoing) = unbounded::<String>();
    let (events_tx, events) = unbounded::<WsEvent>();
    let url = url.to_string();

    tokio::spawn(run(url, outgoing, events_tx));

    WsConnection::from_channels(sender, events)
}

async fn run(url: String, mut outgoing: UnboundedReceiver<String>, events: UnboundedSender<WsEvent>) {
    let mut request = match url.as_str().into_client_request() {
        Ok(request) => request,
        Err(e) => {
            crate::log_error!("Invalid subscription URL {}: {}", url, e);
            let _ = events.unbounded_send(WsEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(WS_SUBPROTOCOL));

    let ws_stream = match connect_async(request).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            crate::log_error!("WebSocket error for {}: {}", url, e);
            let _ = events.unbounded_send(WsEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };
    crate::log_info!("WebSocket connected to {}", url);
    let _ = events.unbounded_send(WsEvent::Opened);

    let (mut write, mut read) = ws_stream.split();
    let mut reason = None;

    loop {
        tokio::select! {
            frame = outgoing.next() => match frame {
                Some(text) => {
                    crate::log_debug!("Sending to {}: {}", url, text);
                    if let Err(e) = write.send(Message::text(text)).await {
                        crate::log_error!("Send failed: {}", e);
                        reason = Some(e.to_string());
                        break;
                    }
                }
                None => {
                    // Sender dropped
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if events.unbounded_send(WsEvent::Message(text.as_str().to_string())).is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    crate::log_info!("WebSocket to {} received close frame", url);
                    reason = frame.map(|f| f.reason.as_str().to_string());
                    break;
                }
                // Pong is handled automatically by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    crate::log_error!("WebSocket read error: {}", e);
                    reason = Some(e.to_string());
                    break;
                }
                None => break,
            },
        }
    }

    crate::log_info!("WebSocket to {} closed", url);
    let _ = events.unbounded_send(WsEvent::Closed { reason });
}
