mod audio;
mod state_machine;

pub use audio::*;
pub use state_machine::*;
