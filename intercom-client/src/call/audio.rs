use std::sync::Arc;

/// Ringtone and outgoing-call tone player. Stopping a tone that is not
/// playing must be harmless.
pub trait AudioFeedback: Send + Sync {
    fn start_ringtone(&self);

    fn stop_ringtone(&self);

    fn start_calling_tone(&self);

    fn stop_calling_tone(&self);
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentFeedback;

impl AudioFeedback for SilentFeedback {
    fn start_ringtone(&self) {}

    fn stop_ringtone(&self) {}

    fn start_calling_tone(&self) {}

    fn stop_calling_tone(&self) {}
}

impl<T: AudioFeedback + ?Sized> AudioFeedback for Arc<T> {
    fn start_ringtone(&self) {
        (**self).start_ringtone()
    }

    fn stop_ringtone(&self) {
        (**self).stop_ringtone()
    }

    fn start_calling_tone(&self) {
        (**self).start_calling_tone()
    }

    fn stop_calling_tone(&self) {
        (**self).stop_calling_tone()
    }
}
