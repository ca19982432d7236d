//! Channel lifecycle with unconditional fixed-delay reconnect.
//!
//! [`ConnectionManager`] is a pure state machine: it consumes
//! [`ChannelEvent`]s and answers with at most one [`Command`] for the
//! runtime to carry out. The runtime owns the socket and the timer; the
//! manager owns the decisions.
//!
//! ```text
//!  Idle ──connect──▶ Connecting ──Opened──▶ Connected
//!                       ▲   │                  │
//!                RetryElapsed  Errored/Closed  Errored/Closed
//!                       │   ▼                  │
//!                    Reconnecting ◀────────────┘
//! ```

use std::time::Duration;

use url::Url;

/// Connection state for the dev channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    /// `attempt` counts reconnects since the last fresh start, 0 for the first connect
    Connecting { attempt: u32 },
    Connected,
    Reconnecting { attempt: u32 },
}

/// Everything that can move the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Message(String),
    Errored,
    Closed,
    /// The reconnect timer fired
    RetryElapsed,
}

/// Work the runtime must perform on behalf of the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a new channel to `url` with the given sub-protocol
    Open { url: Url, protocol: String },
    /// The server came back after an outage; the page may be stale
    Reload,
    /// Hand a text frame to the change interpreter
    Deliver(String),
    /// Arm the one-shot reconnect timer
    ScheduleRetry { delay: Duration },
}

/// Owns the single channel's lifecycle.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    endpoint: Url,
    protocol: String,
    reconnect_delay: Duration,
    state: ConnectionState,
    /// Id of the most recently opened channel
    channel: u64,
}

impl ConnectionManager {
    pub fn new(endpoint: Url, protocol: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            endpoint,
            protocol: protocol.into(),
            reconnect_delay,
            state: ConnectionState::Idle,
            channel: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Id the runtime tags the current socket's events with
    pub fn channel(&self) -> u64 {
        self.channel
    }

    /// Start the first connection. Only valid from `Idle`.
    pub fn connect(&mut self) -> Option<Command> {
        match self.state {
            ConnectionState::Idle => {
                crate::log_debug!("connecting to dev server @ \"{}\"", self.endpoint);
                self.state = ConnectionState::Connecting { attempt: 0 };
                Some(self.open())
            }
            state => {
                crate::log_debug!("connect ignored in state {:?}", state);
                None
            }
        }
    }

    /// Like [`handle`](Self::handle), for an event raised by socket `channel`.
    /// Events from a socket that has since been replaced are dropped.
    pub fn handle_from(&mut self, channel: u64, event: ChannelEvent) -> Option<Command> {
        if channel != self.channel {
            crate::log_debug!("ignoring {:?} from replaced channel {}", event, channel);
            return None;
        }
        self.handle(event)
    }

    pub fn handle(&mut self, event: ChannelEvent) -> Option<Command> {
        match (self.state, event) {
            (ConnectionState::Connecting { attempt }, ChannelEvent::Opened) => {
                self.state = ConnectionState::Connected;
                if attempt > 0 {
                    crate::log_debug!("reconnected, reloading");
                    Some(Command::Reload)
                } else {
                    crate::log_debug!("connected");
                    None
                }
            }
            (ConnectionState::Connected, ChannelEvent::Message(text)) => {
                Some(Command::Deliver(text))
            }
            (
                ConnectionState::Connecting { attempt },
                ChannelEvent::Errored | ChannelEvent::Closed,
            ) => {
                self.state = ConnectionState::Reconnecting {
                    attempt: attempt.saturating_add(1),
                };
                Some(self.schedule_retry())
            }
            (ConnectionState::Connected, ChannelEvent::Errored | ChannelEvent::Closed) => {
                self.state = ConnectionState::Reconnecting { attempt: 1 };
                Some(self.schedule_retry())
            }
            (ConnectionState::Reconnecting { attempt }, ChannelEvent::RetryElapsed) => {
                crate::log_debug!(
                    "reconnecting to dev server @ \"{}\" (attempt {})",
                    self.endpoint,
                    attempt
                );
                self.state = ConnectionState::Connecting { attempt };
                Some(self.open())
            }
            (state, event) => {
                crate::log_debug!("ignoring {:?} in state {:?}", event, state);
                None
            }
        }
    }

    fn open(&mut self) -> Command {
        self.channel = self.channel.wrapping_add(1);
        Command::Open {
            url: self.endpoint.clone(),
            protocol: self.protocol.clone(),
        }
    }

    fn schedule_retry(&self) -> Command {
        Command::ScheduleRetry {
            delay: self.reconnect_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DELAY: Duration = Duration::from_millis(2000);

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Url::parse("ws://localhost:3001/dev").unwrap(), "ws", DELAY)
    }

    fn open_command() -> Command {
        Command::Open {
            url: Url::parse("ws://localhost:3001/dev").unwrap(),
            protocol: "ws".to_string(),
        }
    }

    #[test]
    fn first_connect_opens_channel() {
        let mut m = manager();
        assert_eq!(m.state(), ConnectionState::Idle);
        assert_eq!(m.connect(), Some(open_command()));
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 0 });
    }

    #[test]
    fn connect_is_not_reentrant() {
        let mut m = manager();
        m.connect();
        assert_eq!(m.connect(), None);
        m.handle(ChannelEvent::Opened);
        assert_eq!(m.connect(), None);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn fresh_open_does_not_reload() {
        let mut m = manager();
        m.connect();
        assert_eq!(m.handle(ChannelEvent::Opened), None);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn messages_are_delivered_only_when_connected() {
        let mut m = manager();
        m.connect();
        assert_eq!(m.handle(ChannelEvent::Message("early".into())), None);
        m.handle(ChannelEvent::Opened);
        assert_eq!(
            m.handle(ChannelEvent::Message("{}".into())),
            Some(Command::Deliver("{}".into()))
        );
    }

    #[test]
    fn close_schedules_fixed_retry() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Opened);
        assert_eq!(
            m.handle(ChannelEvent::Closed),
            Some(Command::ScheduleRetry { delay: DELAY })
        );
        assert_eq!(m.state(), ConnectionState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn error_then_close_arms_one_timer() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Opened);
        assert!(m.handle(ChannelEvent::Errored).is_some());
        assert_eq!(m.handle(ChannelEvent::Closed), None);
        assert_eq!(m.state(), ConnectionState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn retry_reopens_and_reconnect_reloads() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Opened);
        m.handle(ChannelEvent::Closed);
        assert_eq!(m.handle(ChannelEvent::RetryElapsed), Some(open_command()));
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 1 });
        assert_eq!(m.handle(ChannelEvent::Opened), Some(Command::Reload));
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn failed_first_attempt_still_reloads_once_server_is_up() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Errored);
        m.handle(ChannelEvent::Closed);
        m.handle(ChannelEvent::RetryElapsed);
        assert_eq!(m.handle(ChannelEvent::Opened), Some(Command::Reload));
    }

    #[test]
    fn retries_forever_with_same_delay() {
        let mut m = manager();
        m.connect();
        for attempt in 1..=50u32 {
            assert_eq!(
                m.handle(ChannelEvent::Closed),
                Some(Command::ScheduleRetry { delay: DELAY })
            );
            assert_eq!(m.state(), ConnectionState::Reconnecting { attempt });
            assert_eq!(m.handle(ChannelEvent::RetryElapsed), Some(open_command()));
            assert_eq!(m.state(), ConnectionState::Connecting { attempt });
        }
    }

    #[test]
    fn stray_retry_is_ignored() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Opened);
        assert_eq!(m.handle(ChannelEvent::RetryElapsed), None);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn open_while_reconnecting_is_ignored() {
        let mut m = manager();
        m.connect();
        m.handle(ChannelEvent::Closed);
        assert_eq!(m.handle(ChannelEvent::Opened), None);
        assert_eq!(m.state(), ConnectionState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn each_open_gets_a_new_channel_id() {
        let mut m = manager();
        m.connect();
        let first = m.channel();
        m.handle(ChannelEvent::Closed);
        m.handle(ChannelEvent::RetryElapsed);
        assert_ne!(m.channel(), first);
    }

    #[test]
    fn late_close_from_replaced_channel_is_ignored() {
        let mut m = manager();
        m.connect();
        let old = m.channel();
        m.handle_from(old, ChannelEvent::Errored);
        m.handle(ChannelEvent::RetryElapsed);
        let current = m.channel();

        assert_eq!(m.handle_from(old, ChannelEvent::Closed), None);
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 1 });
        assert_eq!(m.handle_from(current, ChannelEvent::Opened), Some(Command::Reload));
    }
}
