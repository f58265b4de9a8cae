use intercom_core::{CallState, ProtocolError, RoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission to use camera/microphone was denied")]
    NotAllowed,

    #[error("no camera or microphone found")]
    NotFound,

    #[error("capture device failed: {0}")]
    Device(String),

    #[error("neither audio nor video was requested")]
    EmptyConstraints,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not connected to the signaling relay")]
    NotConnected,

    #[error("failed to reach the signaling relay: {0:#}")]
    Transport(anyhow::Error),

    #[error("relay did not acknowledge registration in time")]
    RegistrationTimeout,

    #[error("cannot call own room '{0}'")]
    OwnRoom(RoomId),

    #[error("another call setup is still in progress")]
    SetupInProgress,

    #[error("call setup was cancelled")]
    Cancelled,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("peer connection error: {0:#}")]
    Peer(anyhow::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("cannot call own room '{0}'")]
    OwnRoom(RoomId),

    #[error("panel is busy ({0})")]
    Busy(CallState),

    #[error("there is no incoming call to answer")]
    NoIncomingCall,

    #[error(transparent)]
    Engine(#[from] EngineError),
}
