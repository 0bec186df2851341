use crate::error::{PetalHowlError, Result};
use crate::math::{Orientation, Vec3};
use crate::playback::VoiceId;
use crate::spatial::{DistanceModel, PannerAttr, PanningModel};
use std::time::Duration;

/// Which voices of a resource a command or query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every active voice. Queries report the first active voice, or the resource default
    /// when there is none.
    Group,
    Voice(VoiceId),
}

/// Per-resource commands understood by an [`AudioBackend`](super::AudioBackend).
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Load,
    /// Stops every voice and releases the decoded audio.
    Unload,
    /// Without `voice`, mint a new voice (optionally restricted to a sprite). With `voice`,
    /// restart that voice if it still exists.
    Play {
        sprite: Option<String>,
        voice: Option<VoiceId>,
    },
    Pause(Target),
    /// Stops playback and rewinds to the start; cancels any running fade.
    Stop(Target),
    Mute {
        muted: bool,
        target: Target,
    },
    Volume {
        volume: f32,
        target: Target,
    },
    Fade {
        from: f32,
        to: f32,
        duration: Duration,
        target: Target,
    },
    Rate {
        rate: f32,
        target: Target,
    },
    Seek {
        position: Duration,
        target: Target,
    },
    Loop {
        looping: bool,
        target: Target,
    },
    Stereo {
        pan: f32,
        target: Target,
    },
    Position {
        position: Vec3,
        target: Target,
    },
    Orientation {
        orientation: Vec3,
        target: Target,
    },
    PannerAttr {
        attr: PannerAttr,
        target: Target,
    },
    /// Changes only the two model fields, leaving each voice's other panner attributes.
    PannerModels {
        distance: DistanceModel,
        panning: PanningModel,
        target: Target,
    },
}

impl PlaybackCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Play { .. } => "play",
            Self::Pause(_) => "pause",
            Self::Stop(_) => "stop",
            Self::Mute { .. } => "mute",
            Self::Volume { .. } => "volume",
            Self::Fade { .. } => "fade",
            Self::Rate { .. } => "rate",
            Self::Seek { .. } => "seek",
            Self::Loop { .. } => "loop",
            Self::Stereo { .. } => "stereo",
            Self::Position { .. } => "pos",
            Self::Orientation { .. } => "orientation",
            Self::PannerAttr { .. } | Self::PannerModels { .. } => "pannerAttr",
        }
    }
}

/// Per-resource getters understood by an [`AudioBackend`](super::AudioBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackQuery {
    Playing(Target),
    /// Group: full resource length. Voice: the sprite length when playing a sprite.
    Duration(Target),
    Muted(Target),
    Volume(Target),
    Rate(Target),
    Seek(Target),
    Loop(Target),
    Stereo(Target),
    Position(Target),
    Orientation(Target),
    PannerAttr(Target),
}

/// Answer to a [`PlaybackQuery`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryValue {
    Bool(bool),
    Float(f32),
    Duration(Duration),
    Stereo(Option<f32>),
    Position(Option<Vec3>),
    Vector(Vec3),
    Panner(PannerAttr),
}

fn mismatch(expected: &str, got: QueryValue) -> PetalHowlError {
    PetalHowlError::Engine(format!("expected {} reply, got {:?}", expected, got))
}

impl QueryValue {
    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn into_f32(self) -> Result<f32> {
        match self {
            Self::Float(v) => Ok(v),
            other => Err(mismatch("float", other)),
        }
    }

    pub fn into_duration(self) -> Result<Duration> {
        match self {
            Self::Duration(v) => Ok(v),
            other => Err(mismatch("duration", other)),
        }
    }

    pub fn into_stereo(self) -> Result<Option<f32>> {
        match self {
            Self::Stereo(v) => Ok(v),
            other => Err(mismatch("stereo", other)),
        }
    }

    pub fn into_position(self) -> Result<Option<Vec3>> {
        match self {
            Self::Position(v) => Ok(v),
            other => Err(mismatch("position", other)),
        }
    }

    pub fn into_vector(self) -> Result<Vec3> {
        match self {
            Self::Vector(v) => Ok(v),
            other => Err(mismatch("vector", other)),
        }
    }

    pub fn into_panner(self) -> Result<PannerAttr> {
        match self {
            Self::Panner(v) => Ok(v),
            other => Err(mismatch("panner", other)),
        }
    }
}

/// Process-wide commands, applied to every resource the engine owns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalCommand {
    Volume(f32),
    Mute(bool),
    Stereo(f32),
    AutoSuspend(bool),
    Html5PoolSize(usize),
    ListenerPosition(Vec3),
    ListenerOrientation(Orientation),
    UnloadAll,
}
