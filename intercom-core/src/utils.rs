/// Public STUN server used when no ICE servers are configured.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
