pub use intercom_core::{CallState, RoomId};

pub mod model {
    pub use intercom_core::model::*;
    pub use intercom_core::{ProtocolError, decode, encode};
}

#[cfg(feature = "server")]
pub mod server {
    pub use intercom_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use intercom_client::*;
}
