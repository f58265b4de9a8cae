use intercom_core::{CallState, RoomId, SessionDescription};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::call::AudioFeedback;
use crate::engine::{CallEngine, CallEvent, CallEvents};
use crate::error::CallError;
use crate::media::{MediaKind, MediaStream, RemoteStream};

pub const DEFAULT_RING_TIMEOUT: Duration = Duration::from_secs(30);

/// What the person at the panel asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    Call(RoomId),
    Accept,
    Decline,
    HangUp,
    ToggleVideo,
    ToggleAudio,
}

#[derive(Debug, Clone)]
struct IncomingCall {
    from: RoomId,
    offer: SessionDescription,
}

/// Panel-level call flow for one room: idle, calling, receiving, in-call.
pub struct CallStateMachine {
    engine: CallEngine,
    audio: Box<dyn AudioFeedback>,
    state: watch::Sender<CallState>,
    target: Option<RoomId>,
    incoming: Option<IncomingCall>,
    local_preview: Option<MediaStream>,
    remote_preview: Option<RemoteStream>,
    ring_timeout: Option<Duration>,
    ring_deadline: Option<Instant>,
}

impl CallStateMachine {
    pub fn new(engine: CallEngine, audio: impl AudioFeedback + 'static) -> Self {
        let (state, _) = watch::channel(CallState::Idle);
        Self {
            engine,
            audio: Box::new(audio),
            state,
            target: None,
            incoming: None,
            local_preview: None,
            remote_preview: None,
            ring_timeout: Some(DEFAULT_RING_TIMEOUT),
            ring_deadline: None,
        }
    }

    /// `None` lets unanswered calls ring forever.
    pub fn with_ring_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ring_timeout = timeout;
        self
    }

    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    pub fn engine(&self) -> &CallEngine {
        &self.engine
    }

    /// Room being called or talked to.
    pub fn target(&self) -> Option<&RoomId> {
        self.target.as_ref()
    }

    /// Room whose call is ringing here.
    pub fn incoming_from(&self) -> Option<&RoomId> {
        self.incoming.as_ref().map(|c| &c.from)
    }

    pub fn local_preview(&self) -> Option<&MediaStream> {
        self.local_preview.as_ref()
    }

    pub fn remote_preview(&self) -> Option<&RemoteStream> {
        self.remote_preview.as_ref()
    }

    pub async fn call(&mut self, room: RoomId) -> Result<(), CallError> {
        if &room == self.engine.room() {
            return Err(CallError::OwnRoom(room));
        }
        let current = self.state();
        if !current.is_idle() {
            return Err(CallError::Busy(current));
        }

        self.target = Some(room.clone());
        self.set_state(CallState::Calling);
        self.audio.start_calling_tone();
        self.arm_ring_timer();

        match self.engine.start_call(&room).await {
            Ok(()) => {
                self.local_preview = self.engine.local_stream().await;
                Ok(())
            }
            Err(e) => {
                warn!("Call to '{}' failed: {}", room, e);
                self.audio.stop_calling_tone();
                self.reset();
                Err(e.into())
            }
        }
    }

    pub async fn accept(&mut self) -> Result<(), CallError> {
        if self.state() != CallState::Receiving {
            return Err(CallError::NoIncomingCall);
        }
        let Some(IncomingCall { from, offer }) = self.incoming.take() else {
            return Err(CallError::NoIncomingCall);
        };

        self.audio.stop_ringtone();
        self.ring_deadline = None;

        match self.engine.answer_call(&from, offer).await {
            Ok(()) => {
                self.target = Some(from);
                self.local_preview = self.engine.local_stream().await;
                if self.remote_preview.is_none() {
                    self.remote_preview = self.engine.remote_stream().await;
                }
                self.set_state(CallState::InCall);
                Ok(())
            }
            Err(e) => {
                warn!("Answering '{}' failed: {}", from, e);
                self.engine.hang_up(&from).await;
                self.reset();
                Err(e.into())
            }
        }
    }

    pub async fn decline(&mut self) {
        if self.state() != CallState::Receiving {
            return;
        }
        self.audio.stop_ringtone();
        if let Some(call) = self.incoming.take() {
            self.engine.hang_up(&call.from).await;
        }
        self.reset();
    }

    pub async fn hang_up(&mut self) {
        match self.state() {
            CallState::Idle => {}
            CallState::Receiving => self.decline().await,
            state @ (CallState::Calling | CallState::InCall) => {
                if state == CallState::Calling {
                    self.audio.stop_calling_tone();
                }
                if let Some(target) = self.target.clone() {
                    self.engine.hang_up(&target).await;
                }
                self.reset();
            }
        }
    }

    pub async fn handle_event(&mut self, event: CallEvent) {
        match event {
            CallEvent::IncomingCall { from, offer } => {
                if self.state().is_idle() {
                    info!("Ringing: call from '{}'", from);
                    self.incoming = Some(IncomingCall { from, offer });
                    self.set_state(CallState::Receiving);
                    self.audio.start_ringtone();
                    self.arm_ring_timer();
                } else {
                    info!("Busy, turning away call from '{}'", from);
                    self.engine.reject(&from).await;
                }
            }

            CallEvent::CallAnswered { from } => {
                if self.state() == CallState::Calling && self.target.as_ref() == Some(&from) {
                    self.audio.stop_calling_tone();
                    self.ring_deadline = None;
                    if self.remote_preview.is_none() {
                        self.remote_preview = self.engine.remote_stream().await;
                    }
                    self.set_state(CallState::InCall);
                }
            }

            CallEvent::CallEnded { from } => {
                if self.is_counterpart(&from) {
                    self.audio.stop_ringtone();
                    self.audio.stop_calling_tone();
                    self.reset();
                } else {
                    debug!("Ignoring call-ended from unrelated room '{}'", from);
                }
            }

            CallEvent::TargetUnavailable(room) => {
                if self.state() == CallState::Calling && self.target.as_ref() == Some(&room) {
                    self.audio.stop_calling_tone();
                    self.engine.end_session().await;
                    self.reset();
                }
            }

            CallEvent::RemoteStream(stream) => {
                if !self.state().is_idle() {
                    self.remote_preview = Some(stream);
                }
            }

            CallEvent::TransportClosed => {
                self.audio.stop_ringtone();
                self.audio.stop_calling_tone();
                self.reset();
            }

            CallEvent::Registered(_) | CallEvent::MediaStateChanged(_) => {}
        }
    }

    /// Nobody picked up in time.
    pub async fn ring_timed_out(&mut self) {
        self.ring_deadline = None;
        match self.state() {
            CallState::Calling => {
                info!("Call was not answered in time");
                self.audio.stop_calling_tone();
                if let Some(target) = self.target.clone() {
                    self.engine.hang_up(&target).await;
                }
                self.reset();
            }
            CallState::Receiving => {
                // Another panel of this room may have answered; only stop
                // ringing here.
                info!("Incoming call was not answered here in time");
                self.audio.stop_ringtone();
                if let Some(call) = self.incoming.take() {
                    self.engine.dismiss(&call.from).await;
                }
                self.reset();
            }
            _ => {}
        }
    }

    /// Returns whether video is now enabled, `None` without a local stream.
    pub fn toggle_video(&self) -> Option<bool> {
        self.local_preview.as_ref()?.toggle(MediaKind::Video)
    }

    pub fn toggle_audio(&self) -> Option<bool> {
        self.local_preview.as_ref()?.toggle(MediaKind::Audio)
    }

    pub async fn handle_intent(&mut self, intent: UserIntent) -> Result<(), CallError> {
        match intent {
            UserIntent::Call(room) => self.call(room).await?,
            UserIntent::Accept => self.accept().await?,
            UserIntent::Decline => self.decline().await,
            UserIntent::HangUp => self.hang_up().await,
            UserIntent::ToggleVideo => {
                self.toggle_video();
            }
            UserIntent::ToggleAudio => {
                self.toggle_audio();
            }
        }
        Ok(())
    }

    /// End any call, stop all tones and drop the relay connection.
    pub async fn shutdown(&mut self) {
        self.hang_up().await;
        self.audio.stop_ringtone();
        self.audio.stop_calling_tone();
        self.engine.disconnect().await;
        self.reset();
    }

    /// Drive the machine until `intents` closes, then shut down.
    pub async fn run(
        mut self,
        mut events: CallEvents,
        mut intents: UnboundedReceiver<UserIntent>,
    ) {
        let mut events_open = true;
        loop {
            let deadline = self.ring_deadline;
            let ring = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => {
                        if let Err(e) = self.handle_intent(intent).await {
                            warn!("{}", e);
                        }
                    }
                    None => break,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => events_open = false,
                },
                _ = ring => self.ring_timed_out().await,
            }
        }
        self.shutdown().await;
    }

    fn is_counterpart(&self, room: &RoomId) -> bool {
        self.target.as_ref() == Some(room) || self.incoming_from() == Some(room)
    }

    fn arm_ring_timer(&mut self) {
        self.ring_deadline = self.ring_timeout.map(|t| Instant::now() + t);
    }

    fn set_state(&self, next: CallState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!("Call state: {} -> {}", prev, next);
        }
    }

    fn reset(&mut self) {
        self.target = None;
        self.incoming = None;
        self.local_preview = None;
        self.remote_preview = None;
        self.ring_deadline = None;
        self.set_state(CallState::Idle);
    }
}
