//! WASM runtime: drives the [`Agent`] from a `web_sys::WebSocket`.
//!
//! Socket callbacks and the reconnect timer only push [`ChannelEvent`]s
//! into one queue; a single `spawn_local` task drains it, so every event
//! is handled to completion before the next.

use devreload_shared::{StartupError, TransportError};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{js_sys, CloseEvent, MessageEvent, WebSocket};

use crate::agent::{Agent, Transport};
use crate::config;
use crate::connection::ChannelEvent;
use crate::dom::BrowserDocument;
use crate::token::RandomToken;

/// Queue item: the socket id for socket events, `None` for the retry timer.
type Queued = (Option<u64>, ChannelEvent);

/// An open socket and the callbacks keeping it wired to the queue.
struct Socket {
    ws: WebSocket,
    _onopen: Closure<dyn FnMut(web_sys::Event)>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onerror: Closure<dyn FnMut(web_sys::Event)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
}

impl Socket {
    fn open(
        url: &str,
        protocol: &str,
        channel: u64,
        events: &UnboundedSender<Queued>,
    ) -> Result<Self, TransportError> {
        let tag = Some(channel);
        let ws = WebSocket::new_with_str(url, protocol)
            .map_err(|e| TransportError::new(format!("{:?}", e)))?;

        let tx = events.clone();
        let onopen = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let _ = tx.unbounded_send((tag, ChannelEvent::Opened));
        }) as Box<dyn FnMut(web_sys::Event)>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        let tx = events.clone();
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().dyn_into::<js_sys::JsString>() {
                Ok(text) => {
                    let _ = tx.unbounded_send((tag, ChannelEvent::Message(text.into())));
                }
                Err(_) => crate::log_warn!("ignoring non-text frame"),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        let tx = events.clone();
        let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let _ = tx.unbounded_send((tag, ChannelEvent::Errored));
        }) as Box<dyn FnMut(web_sys::Event)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let tx = events.clone();
        let onclose = Closure::wrap(Box::new(move |_: CloseEvent| {
            let _ = tx.unbounded_send((tag, ChannelEvent::Closed));
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            _onopen: onopen,
            _onmessage: onmessage,
            _onerror: onerror,
            _onclose: onclose,
        })
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        let _ = self.ws.close();
    }
}

/// Resolve the endpoint and start the agent on the page's event loop.
///
/// Fails only when the page does not declare a usable endpoint.
pub fn start() -> Result<(), StartupError> {
    let document = BrowserDocument::current()?;
    let config = config::from_document(document.inner())?;
    let (tx, rx) = unbounded();
    let agent = Agent::new(config, document, RandomToken);
    spawn_local(run(agent, tx, rx));
    Ok(())
}

async fn run(
    mut agent: Agent<BrowserDocument, RandomToken>,
    tx: UnboundedSender<Queued>,
    mut rx: UnboundedReceiver<Queued>,
) {
    let mut socket: Option<Socket> = None;
    let mut pending = agent.start();

    loop {
        while let Some(transport) = pending.take() {
            pending = match transport {
                Transport::Open { url, protocol } => {
                    // Dropping the old socket closes it; anything it already
                    // queued carries its old id and is discarded.
                    socket = None;
                    match Socket::open(url.as_str(), &protocol, agent.channel(), &tx) {
                        Ok(s) => {
                            socket = Some(s);
                            None
                        }
                        Err(e) => {
                            crate::log_error!("{}", e);
                            agent.handle(ChannelEvent::Errored)
                        }
                    }
                }
                Transport::ScheduleRetry { delay_ms } => {
                    let tx = tx.clone();
                    spawn_local(async move {
                        gloo_timers::future::TimeoutFuture::new(delay_ms).await;
                        let _ = tx.unbounded_send((None, ChannelEvent::RetryElapsed));
                    });
                    None
                }
            };
        }

        let Some((channel, event)) = rx.next().await else {
            break;
        };
        pending = match channel {
            Some(channel) => agent.handle_from(channel, event),
            None => agent.handle(event),
        };
    }

    drop(socket);
}
