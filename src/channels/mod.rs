//! Channel implementations for the messaging platform.

pub mod platform;

pub use platform::{InboundEnvelope, InboundPayload, PlatformTransport};
