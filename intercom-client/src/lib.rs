mod call;
mod engine;
mod error;
mod media;
mod peer;
mod transport;

pub use call::*;
pub use engine::*;
pub use error::*;
pub use media::*;
pub use peer::*;
pub use transport::*;
