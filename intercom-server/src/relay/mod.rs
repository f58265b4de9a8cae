mod registry;
mod relay_channel;
mod signaling_relay;

pub use registry::*;
pub use relay_channel::*;
pub use signaling_relay::*;
