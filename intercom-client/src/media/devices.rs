use async_trait::async_trait;
use tracing::warn;

use crate::error::MediaError;
use crate::media::{MediaConstraints, MediaStream, synthetic_stream};

/// Access to the local camera and microphone.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(&self, constraints: MediaConstraints)
    -> Result<MediaStream, MediaError>;
}

/// Device set of a headless host: every request fails with `NotFound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptureDevices;

#[async_trait]
impl MediaDevices for NoCaptureDevices {
    async fn get_user_media(
        &self,
        _constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        Err(MediaError::NotFound)
    }
}

/// Capture local media, substituting the synthetic stream when the devices
/// refuse. Only fails when the constraints ask for nothing at all.
pub async fn acquire_local_media(
    devices: &dyn MediaDevices,
    constraints: MediaConstraints,
) -> Result<MediaStream, MediaError> {
    if constraints.is_empty() {
        return Err(MediaError::EmptyConstraints);
    }

    match devices.get_user_media(constraints).await {
        Ok(stream) => Ok(stream),
        Err(e) => {
            warn!("Could not access camera/microphone, using synthetic stream: {}", e);
            Ok(synthetic_stream(constraints))
        }
    }
}
