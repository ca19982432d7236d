//! The dev client agent: connection lifecycle in, page mutations out.

use crate::change::{self, Action};
use crate::config::AgentConfig;
use crate::connection::{ChannelEvent, Command, ConnectionManager, ConnectionState};
use crate::resource::{self, Document, Snapshot};
use crate::token::TokenSource;

/// Transport work left for the runtime once the agent has handled an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Open { url: url::Url, protocol: String },
    ScheduleRetry { delay_ms: u32 },
}

/// What the agent did to the page in response to a delivered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reloaded { path: String },
    Swapped { path: String, href: url::Url },
    Unchanged,
    /// The frame was not a change event
    Rejected,
    /// A swap was attempted but abandoned
    Failed { path: String },
}

pub struct Agent<D: Document, T: TokenSource> {
    config: AgentConfig,
    connection: ConnectionManager,
    document: D,
    tokens: T,
}

impl<D: Document, T: TokenSource> Agent<D, T> {
    pub fn new(config: AgentConfig, document: D, tokens: T) -> Self {
        let connection = ConnectionManager::new(
            config.endpoint.clone(),
            config.protocol.clone(),
            config.reconnect_delay,
        );
        Self {
            config,
            connection,
            document,
            tokens,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Kick off the first connection.
    pub fn start(&mut self) -> Option<Transport> {
        let command = self.connection.connect()?;
        self.run(command)
    }

    /// Id of the socket opened by the last [`Transport::Open`]
    pub fn channel(&self) -> u64 {
        self.connection.channel()
    }

    /// Feed one lifecycle event through the agent.
    pub fn handle(&mut self, event: ChannelEvent) -> Option<Transport> {
        let command = self.connection.handle(event)?;
        self.run(command)
    }

    /// Feed an event raised by socket `channel`; stale sockets are ignored.
    pub fn handle_from(&mut self, channel: u64, event: ChannelEvent) -> Option<Transport> {
        let command = self.connection.handle_from(channel, event)?;
        self.run(command)
    }

    fn run(&mut self, command: Command) -> Option<Transport> {
        match command {
            Command::Open { url, protocol } => Some(Transport::Open { url, protocol }),
            Command::ScheduleRetry { .. } => Some(Transport::ScheduleRetry {
                delay_ms: self.config.reconnect_delay_ms(),
            }),
            Command::Reload => {
                self.document.reload();
                None
            }
            Command::Deliver(text) => {
                self.apply(&text);
                None
            }
        }
    }

    /// Interpret one text frame and mutate the page accordingly.
    pub fn apply(&self, text: &str) -> Outcome {
        let event = match change::decode(text) {
            Ok(event) => event,
            Err(e) => {
                crate::log_error!("{}", e);
                return Outcome::Rejected;
            }
        };

        let snapshot = Snapshot::capture(&self.document);
        match change::plan(&snapshot, &event) {
            Action::Reload { path } => {
                crate::log_debug!("updated \"{}\"", path);
                self.document.reload();
                Outcome::Reloaded {
                    path: path.to_string(),
                }
            }
            Action::Swap { path, target } => {
                crate::log_debug!("updated \"{}\"", path);
                match resource::hot_swap(
                    &self.document,
                    target,
                    &self.config.cache_bust_param,
                    &self.tokens,
                ) {
                    Ok(href) => Outcome::Swapped {
                        path: path.to_string(),
                        href,
                    },
                    Err(e) => {
                        crate::log_error!("{}", e);
                        Outcome::Failed {
                            path: path.to_string(),
                        }
                    }
                }
            }
            Action::Noop => Outcome::Unchanged,
        }
    }
}
