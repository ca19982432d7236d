//! Devreload Client - live-reload agent for dev servers
//!
//! Keeps one WebSocket open to the dev server, reloads the page when a
//! loaded script or a structural asset change is reported, and hot swaps
//! stylesheets in place when only their content changed.
//!
//! The lifecycle state machine, the change interpreter and the resource
//! matcher are platform-independent; the `web_sys` glue lives in the
//! wasm-only `dom` and `ws` modules.

pub mod logging;

pub mod agent;
pub mod change;
pub mod config;
pub mod connection;
pub mod resource;
pub mod token;

#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod ws;

pub use agent::{Agent, Outcome, Transport};
pub use change::{plan, Action};
pub use config::AgentConfig;
pub use connection::{ChannelEvent, Command, ConnectionManager, ConnectionState};
pub use resource::{Document, LiveResource, ResourceKind, Snapshot};
pub use token::{RandomToken, SequentialToken, TokenSource};

#[cfg(target_arch = "wasm32")]
pub use ws::start;
