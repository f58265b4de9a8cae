mod devices;
mod stream;
mod synthetic;

pub use devices::*;
pub use stream::*;
pub use synthetic::*;
