//! Per-connection session state machine
//!
//! A session moves through three states:
//!
//! ```text
//! AwaitingHello --Hello--> Active --Goodbye--> Closed
//!       |                    |
//!       +--anything else-----+--transport error--> Closed
//! ```
//!
//! The machine is synchronous and performs no I/O. For each inbound request
//! it either produces the reply itself or hands the request on for dispatch
//! against the store. The transport loop writes the reply and checks
//! [`Session::is_closed`] before reading again.

use log::{debug, warn};
use shared::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHello,
    Active,
    Closed,
}

/// What the transport loop should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send this response as-is.
    Reply(Response),
    /// Run the request through the dispatcher and send its response.
    Dispatch(Request),
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    /// Set when the session was opened over capacity
    rejected: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingHello,
            rejected: false,
        }
    }

    /// A session that answers its first message with a server-full failure
    /// and then closes.
    pub fn rejected() -> Self {
        Self {
            state: SessionState::AwaitingHello,
            rejected: true,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Advances the machine with one inbound request.
    ///
    /// Returns None once the session is closed; nothing more is processed.
    pub fn on_request(&mut self, request: Request) -> Option<Action> {
        match self.state {
            SessionState::Closed => None,

            SessionState::AwaitingHello if self.rejected => {
                self.state = SessionState::Closed;
                Some(Action::Reply(Response::server_full()))
            }

            SessionState::AwaitingHello => match request {
                Request::Hello => {
                    self.state = SessionState::Active;
                    Some(Action::Reply(Response::Success))
                }
                other => {
                    warn!("{} received before Hello, closing session", other.kind());
                    self.state = SessionState::Closed;
                    Some(Action::Reply(Response::protocol_error()))
                }
            },

            SessionState::Active => match request {
                Request::Hello => {
                    warn!("Duplicate Hello on active session");
                    Some(Action::Reply(Response::protocol_error()))
                }
                Request::Goodbye => {
                    debug!("Goodbye received, ending session");
                    self.state = SessionState::Closed;
                    Some(Action::Reply(Response::Success))
                }
                other => Some(Action::Dispatch(other)),
            },
        }
    }

    /// Closes the session after a transport failure. No reply is owed.
    pub fn abort(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
