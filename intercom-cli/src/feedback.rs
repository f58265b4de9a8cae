use colored::*;
use intercom::client::AudioFeedback;
use std::sync::atomic::{AtomicBool, Ordering};

/// Terminal stand-in for the panel speaker: announces tones instead of
/// playing them.
#[derive(Default)]
pub struct ConsoleFeedback {
    ringing: AtomicBool,
    calling: AtomicBool,
}

impl AudioFeedback for ConsoleFeedback {
    fn start_ringtone(&self) {
        if !self.ringing.swap(true, Ordering::AcqRel) {
            println!("{}", "♪ ring ring ♪".yellow().bold());
        }
    }

    fn stop_ringtone(&self) {
        self.ringing.store(false, Ordering::Release);
    }

    fn start_calling_tone(&self) {
        if !self.calling.swap(true, Ordering::AcqRel) {
            println!("{}", "… calling …".cyan());
        }
    }

    fn stop_calling_tone(&self) {
        self.calling.store(false, Ordering::Release);
    }
}
