//! WASM/Web-specific WebSocket implementation using web_sys::WebSocket.

use bizdesk_shared::WS_SUBPROTOCOL;
use futures_channel::mpsc::{unbounded, UnboundedSender};
use futures_util::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{js_sys, CloseEvent, MessageEvent, WebSocket};

use super::{WsConnection, WsEvent};

pub(super) fn open(url: &str) -> WsConnection {
    let (sender, mut outgoing) = unbounded::<String>();
    let (events_tx, events) = unbounded::<WsEvent>();

    let ws = match WebSocket::new_with_str(url, WS_SUBPROTOCOL) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log_error!("Failed to create WebSocket: {:?}", e);
            let _ = events_tx.unbounded_send(WsEvent::Closed {
                reason: Some(format!("{:?}", e)),
            });
            return WsConnection::from_channels(sender, events);
        }
    };

    install_handlers(&ws, events_tx);

    // Frames are only queued after `Opened` has been observed.
    spawn_local(async move {
        while let Some(text) = outgoing.next().await {
            if ws.ready_state() != WebSocket::OPEN {
                crate::log_info!("WebSocket no longer open, stopping send task");
                break;
            }
            crate::log_debug!("Sending: {}", text);
            if let Err(e) = ws.send_with_str(&text) {
                crate::log_error!("Send failed: {:?}", e);
                break;
            }
        }
        let _ = ws.close();
    });

    WsConnection::from_channels(sender, events)
}

fn install_handlers(ws: &WebSocket, events: UnboundedSender<WsEvent>) {
    let events_open = events.clone();
    let onopen_callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
        crate::log_info!("WebSocket onopen fired");
        let _ = events_open.unbounded_send(WsEvent::Opened);
    }) as Box<dyn FnMut(web_sys::Event)>);
    ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
    onopen_callback.forget();

    let events_message = events.clone();
    let onmessage_callback = Closure::wrap(Box::new(move |e: MessageEvent| {
        if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
            let text: String = text.into();
            let _ = events_message.unbounded_send(WsEvent::Message(text));
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
    onmessage_callback.forget();

    let onerror_callback = Closure::wrap(Box::new(move |_: web_sys::ErrorEvent| {
        crate::log_error!("WebSocket onerror fired");
    }) as Box<dyn FnMut(web_sys::ErrorEvent)>);
    ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
    onerror_callback.forget();

    let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
        let reason = if e.reason().is_empty() {
            format!("Code {}", e.code())
        } else {
            e.reason()
        };
        crate::log_info!("WebSocket onclose: {}", reason);
        let _ = events.unbounded_send(WsEvent::Closed {
            reason: Some(reason),
        });
    }) as Box<dyn FnMut(CloseEvent)>);
    ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
    onclose_callback.forget();
}
