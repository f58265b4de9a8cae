use std::sync::{Arc, Mutex};

use intercom_client::AudioFeedback;

/// Remembers every tone command in order.
#[derive(Clone, Default)]
pub struct RecordingAudio {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingAudio {
    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn push(&self, entry: &'static str) {
        self.log.lock().unwrap().push(entry);
    }
}

impl AudioFeedback for RecordingAudio {
    fn start_ringtone(&self) {
        self.push("start_ringtone");
    }

    fn stop_ringtone(&self) {
        self.push("stop_ringtone");
    }

    fn start_calling_tone(&self) {
        self.push("start_calling_tone");
    }

    fn stop_calling_tone(&self) {
        self.push("stop_calling_tone");
    }
}
