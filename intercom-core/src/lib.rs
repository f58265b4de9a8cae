pub mod codec;
pub mod model;
pub mod utils;

pub use codec::{ProtocolError, decode, encode};
pub use model::*;
