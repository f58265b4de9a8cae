mod call_state;
mod channel;
mod ice;
mod room;
mod session;
mod signaling;

pub use call_state::CallState;
pub use channel::ChannelId;
pub use ice::IceServerConfig;
pub use room::RoomId;
pub use session::{IceCandidate, SdpType, SessionDescription};
pub use signaling::{ClientMessage, RawClientMessage, RawRelayMessage, RelayMessage};
