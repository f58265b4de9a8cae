use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a room's intercom panel is in the call cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallState {
    /// Resting state, also the initial one.
    #[default]
    Idle,
    /// Outbound call placed, waiting for the other room to answer.
    Calling,
    /// Inbound call ringing, waiting for the user to accept or decline.
    Receiving,
    /// Media is flowing.
    InCall,
}

impl CallState {
    pub fn is_idle(self) -> bool {
        self == CallState::Idle
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Calling => "calling",
            CallState::Receiving => "receiving",
            CallState::InCall => "in-call",
        };
        f.write_str(s)
    }
}
