//! Error types for PetalHowl

use crate::playback::VoiceId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PetalHowlError {
    /// The engine could not decode or fetch any of the resource's sources.
    #[error("Load failed: {0}")]
    LoadFailed(String),

    /// The engine refused to start playback.
    #[error("Play failed: {0}")]
    PlayFailed(String),

    /// Sprite name missing from the resource's sprite table.
    #[error("Sprite not found: {0}")]
    SpriteNotFound(String),

    #[error("Voice pool exhausted")]
    PoolExhausted,

    /// The voice is the sentinel handle, was never minted, or its slot has been recycled.
    #[error("Invalid voice: {0}")]
    InvalidVoice(VoiceId),

    #[error("Invalid {kind} value: {value:?}")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, PetalHowlError>;
