use bytes::Bytes;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::media::{MediaConstraints, MediaKind, MediaStream, MediaTrack};

/// Produces the frames of a generated track.
pub trait FrameSource: Send + Sync {
    fn next_frame(&self) -> Bytes;

    fn frame_duration(&self) -> Duration;
}

pub const CARD_WIDTH: usize = 320;
pub const CARD_HEIGHT: usize = 240;
pub const CARD_FPS: u32 = 30;
pub const UNAVAILABLE_LABEL: &str = "Camera Not Available";

const GRADIENT_FROM: [u8; 3] = [0x66, 0x7e, 0xea];
const GRADIENT_TO: [u8; 3] = [0x76, 0x4b, 0xa2];
const BANNER: [u8; 3] = [0xff, 0xff, 0xff];
const GLYPH: [u8; 3] = [0x76, 0x4b, 0xa2];

/// Still RGB24 card shown in place of a camera: diagonal gradient with a
/// white banner carrying a crossed-out camera.
pub struct UnavailableCard {
    frame: Bytes,
}

impl UnavailableCard {
    pub fn new() -> Self {
        Self {
            frame: Bytes::from(render_card()),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * CARD_WIDTH + x) * 3;
        [self.frame[i], self.frame[i + 1], self.frame[i + 2]]
    }
}

impl Default for UnavailableCard {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for UnavailableCard {
    fn next_frame(&self) -> Bytes {
        self.frame.clone()
    }

    fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / CARD_FPS
    }
}

fn render_card() -> Vec<u8> {
    let mut frame = vec![0u8; CARD_WIDTH * CARD_HEIGHT * 3];
    let put = |frame: &mut [u8], x: usize, y: usize, rgb: [u8; 3]| {
        let i = (y * CARD_WIDTH + x) * 3;
        frame[i..i + 3].copy_from_slice(&rgb);
    };

    for y in 0..CARD_HEIGHT {
        for x in 0..CARD_WIDTH {
            let t = (x as f32 / CARD_WIDTH as f32 + y as f32 / CARD_HEIGHT as f32) / 2.0;
            let mut rgb = [0u8; 3];
            for c in 0..3 {
                let from = GRADIENT_FROM[c] as f32;
                let to = GRADIENT_TO[c] as f32;
                rgb[c] = (from + (to - from) * t).round() as u8;
            }
            put(&mut frame, x, y, rgb);
        }
    }

    let (banner_top, banner_bottom) = (CARD_HEIGHT * 2 / 5, CARD_HEIGHT * 3 / 5);
    for y in banner_top..banner_bottom {
        for x in 0..CARD_WIDTH {
            put(&mut frame, x, y, BANNER);
        }
    }

    // Camera body outline.
    let (left, right) = (CARD_WIDTH / 2 - 24, CARD_WIDTH / 2 + 16);
    let (top, bottom) = (banner_top + 10, banner_bottom - 10);
    for y in top..bottom {
        for x in left..right {
            let edge = x < left + 2 || x >= right - 2 || y < top + 2 || y >= bottom - 2;
            if edge {
                put(&mut frame, x, y, GLYPH);
            }
        }
    }
    // Lens housing.
    for y in top + 8..bottom - 8 {
        for x in right..right + 8 {
            put(&mut frame, x, y, GLYPH);
        }
    }
    // Slash across the glyph.
    let (x0, x1) = (left - 6, right + 14);
    let span = (x1 - x0) as f32;
    let rise = (bottom + 4 - (top - 4)) as f32;
    for x in x0..x1 {
        let y = (top - 4) as f32 + (x - x0) as f32 * rise / span;
        for dy in 0..3 {
            put(&mut frame, x, y as usize + dy, GLYPH);
        }
    }

    frame
}

pub const TONE_SAMPLE_RATE: u32 = 8000;
pub const TONE_FREQUENCY: f64 = 440.0;
pub const TONE_GAIN: f64 = 0.001;
const TONE_FRAME: Duration = Duration::from_millis(20);

/// Near-silent sine tone as G.711 mu-law frames, so the audio track carries
/// a valid PCMU payload without a microphone.
pub struct QuietTone {
    position: AtomicU64,
}

impl QuietTone {
    pub fn new() -> Self {
        Self {
            position: AtomicU64::new(0),
        }
    }

    pub fn samples_per_frame() -> usize {
        (TONE_SAMPLE_RATE as u128 * TONE_FRAME.as_millis() / 1000) as usize
    }
}

impl Default for QuietTone {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for QuietTone {
    fn next_frame(&self) -> Bytes {
        let count = Self::samples_per_frame();
        let start = self.position.fetch_add(count as u64, Ordering::Relaxed);

        let frame: Vec<u8> = (0..count as u64)
            .map(|i| {
                let t = (start + i) as f64 / TONE_SAMPLE_RATE as f64;
                let sample = (TAU * TONE_FREQUENCY * t).sin() * TONE_GAIN * i16::MAX as f64;
                linear_to_mulaw(sample.round() as i16)
            })
            .collect();

        Bytes::from(frame)
    }

    fn frame_duration(&self) -> Duration {
        TONE_FRAME
    }
}

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

/// G.711 mu-law encoding of one 16-bit sample.
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0
    };
    magnitude = magnitude.min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (magnitude >> (exponent + 3)) & 0x0f;

    !(sign | (exponent << 4) | mantissa) as u8
}

/// Stream handed out when no capture device is usable.
pub fn synthetic_stream(constraints: MediaConstraints) -> MediaStream {
    let mut tracks = Vec::new();
    if constraints.video {
        tracks.push(MediaTrack::new(
            MediaKind::Video,
            UNAVAILABLE_LABEL,
            Some(Arc::new(UnavailableCard::new())),
        ));
    }
    if constraints.audio {
        tracks.push(MediaTrack::new(
            MediaKind::Audio,
            "Quiet Tone",
            Some(Arc::new(QuietTone::new())),
        ));
    }
    MediaStream::new(tracks)
}
