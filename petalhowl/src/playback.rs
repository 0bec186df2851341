//! Playback handles.
//!
//! A [`Sound`] is either the whole resource ([`Sound::Group`]) or one voice of it
//! ([`Sound::Instance`]). Both expose the same operations; only the target differs:
//! - group setters apply to every active voice, group getters report the first active voice
//!   (or the resource default when none is active). That is an engine convention, not an
//!   aggregate.
//! - instance operations address exactly the bound voice.
//!
//! [`Sound::play`] is the only operation that turns a group into an instance.

use crate::backend::{PlaybackCommand, PlaybackQuery, QueryValue, Target};
use crate::error::{PetalHowlError, Result};
use crate::howl::{Howl, LoadState};
use crate::math::Vec3;
use crate::spatial::{DistanceModel, PannerAttr, PanningModel};
use std::time::Duration;

/// Engine-assigned voice ID. Unique among the active voices of a resource only; the engine
/// recycles IDs once a voice has stopped or ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(i32);

impl VoiceId {
    /// Sentinel carried by the handle returned from a refused play.
    pub const INVALID: VoiceId = VoiceId(-1);

    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A playable handle: every voice of a resource, or one voice.
#[derive(Clone, Debug, PartialEq)]
pub enum Sound {
    Group(Howl),
    /// One voice. `epoch` identifies which minting of `id` this handle was created for.
    Instance { howl: Howl, id: VoiceId, epoch: u64 },
}

impl Sound {
    pub(crate) fn invalid(howl: Howl) -> Self {
        Self::Instance {
            howl,
            id: VoiceId::INVALID,
            epoch: 0,
        }
    }

    pub fn howl(&self) -> &Howl {
        match self {
            Self::Group(howl) | Self::Instance { howl, .. } => howl,
        }
    }

    /// The bound voice, `None` for a group.
    pub fn id(&self) -> Option<VoiceId> {
        match self {
            Self::Group(_) => None,
            Self::Instance { id, .. } => Some(*id),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// False for the sentinel handle and for instances whose voice ID has since been
    /// recycled or released by an unload.
    pub fn is_valid(&self) -> bool {
        self.target().is_ok()
    }

    fn target(&self) -> Result<Target> {
        match self {
            Self::Group(_) => Ok(Target::Group),
            Self::Instance { howl, id, epoch } => {
                if id.is_valid() && howl.is_current(*id, *epoch) {
                    Ok(Target::Voice(*id))
                } else {
                    Err(PetalHowlError::InvalidVoice(*id))
                }
            }
        }
    }

    fn command(&self, build: impl FnOnce(Target) -> PlaybackCommand) -> Result<()> {
        let command = build(self.target()?);
        self.howl().execute(command).map(|_| ())
    }

    fn ask(&self, build: impl FnOnce(Target) -> PlaybackQuery) -> Result<QueryValue> {
        let query = build(self.target()?);
        self.howl().query(query)
    }

    /// On a group, starts a new voice and returns its instance, or the sentinel handle
    /// (ID -1) when the engine refused (pool exhausted, resource failed to load).
    ///
    /// On an instance, restarts that voice if it still exists. A voice that was recycled or
    /// released makes this a no-op. Either way the instance itself is returned.
    pub fn play(&self) -> Sound {
        match self {
            Self::Group(howl) => howl.mint(None),
            Self::Instance { howl, id, .. } => {
                if self.target().is_err() {
                    log::debug!("Voice {} is stale, play ignored", id);
                    return self.clone();
                }
                match howl.execute(PlaybackCommand::Play {
                    sprite: None,
                    voice: Some(*id),
                }) {
                    Ok(Some(_)) => {}
                    Ok(None) => log::debug!("Voice {} is gone, play ignored", id),
                    Err(e) => log::warn!("Restarting voice {} failed: {}", id, e),
                }
                self.clone()
            }
        }
    }

    /// Like [`Sound::play`] but with the refusal as an error.
    ///
    /// # Errors
    ///
    /// - [`PetalHowlError::PoolExhausted`] when a group could not get a new voice.
    /// - [`PetalHowlError::InvalidVoice`] when an instance's voice no longer exists.
    pub fn try_play(&self) -> Result<Sound> {
        match self {
            Self::Group(howl) => howl.try_mint(None),
            Self::Instance { howl, id, .. } => {
                self.target()?;
                howl.execute(PlaybackCommand::Play {
                    sprite: None,
                    voice: Some(*id),
                })?
                .map(|_| self.clone())
                .ok_or(PetalHowlError::InvalidVoice(*id))
            }
        }
    }

    /// Starts a new voice that plays only the named sprite's region.
    ///
    /// # Errors
    ///
    /// [`PetalHowlError::SpriteNotFound`] for an unknown name; no voice is created and the
    /// engine is not called.
    pub fn play_sprite(&self, name: &str) -> Result<Sound> {
        self.howl().play_sprite(name)
    }

    pub fn pause(&self) -> Result<()> {
        self.command(PlaybackCommand::Pause)
    }

    /// Stops and rewinds to the start. Any running fade is cancelled.
    pub fn stop(&self) -> Result<()> {
        self.command(PlaybackCommand::Stop)
    }

    pub fn mute(&self) -> Result<()> {
        self.set_mute(true)
    }

    pub fn unmute(&self) -> Result<()> {
        self.set_mute(false)
    }

    pub fn set_mute(&self, muted: bool) -> Result<()> {
        self.command(|target| PlaybackCommand::Mute { muted, target })
    }

    pub fn muted(&self) -> Result<bool> {
        self.ask(PlaybackQuery::Muted)?.into_bool()
    }

    /// Fades volume from `from` to `to` over `duration`. A `fade` event fires when done.
    pub fn fade(&self, from: f32, to: f32, duration: Duration) -> Result<()> {
        self.command(|target| PlaybackCommand::Fade {
            from,
            to,
            duration,
            target,
        })
    }

    pub fn volume(&self) -> Result<f32> {
        self.ask(PlaybackQuery::Volume)?.into_f32()
    }

    /// 0.0 - 1.0. Cancels a running fade.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.command(|target| PlaybackCommand::Volume { volume, target })
    }

    pub fn rate(&self) -> Result<f32> {
        self.ask(PlaybackQuery::Rate)?.into_f32()
    }

    /// 0.5 - 4.0, 1.0 is normal speed.
    ///
    /// # Errors
    ///
    /// [`PetalHowlError::Configuration`] for a NaN or infinite rate.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        if !rate.is_finite() {
            return Err(PetalHowlError::Configuration(format!(
                "rate must be finite, got {}",
                rate
            )));
        }
        self.command(|target| PlaybackCommand::Rate { rate, target })
    }

    /// Playback position, relative to the sprite start for sprite voices.
    pub fn seek(&self) -> Result<Duration> {
        self.ask(PlaybackQuery::Seek)?.into_duration()
    }

    pub fn set_seek(&self, position: Duration) -> Result<()> {
        self.command(|target| PlaybackCommand::Seek { position, target })
    }

    pub fn looping(&self) -> Result<bool> {
        self.ask(PlaybackQuery::Loop)?.into_bool()
    }

    pub fn set_loop(&self, looping: bool) -> Result<()> {
        self.command(|target| PlaybackCommand::Loop { looping, target })
    }

    /// Stereo pan, `None` when never panned.
    pub fn stereo(&self) -> Result<Option<f32>> {
        self.ask(PlaybackQuery::Stereo)?.into_stereo()
    }

    /// -1.0 (left) to 1.0 (right).
    pub fn set_stereo(&self, pan: f32) -> Result<()> {
        self.command(|target| PlaybackCommand::Stereo { pan, target })
    }

    /// 3D position, `None` when the source is not spatialized.
    pub fn position(&self) -> Result<Option<Vec3>> {
        self.ask(PlaybackQuery::Position)?.into_position()
    }

    pub fn set_position(&self, position: Vec3) -> Result<()> {
        self.command(|target| PlaybackCommand::Position { position, target })
    }

    pub fn orientation(&self) -> Result<Vec3> {
        self.ask(PlaybackQuery::Orientation)?.into_vector()
    }

    pub fn set_orientation(&self, orientation: Vec3) -> Result<()> {
        self.command(|target| PlaybackCommand::Orientation {
            orientation,
            target,
        })
    }

    pub fn panner_attr(&self) -> Result<PannerAttr> {
        self.ask(PlaybackQuery::PannerAttr)?.into_panner()
    }

    pub fn set_panner_attr(&self, attr: PannerAttr) -> Result<()> {
        self.command(|target| PlaybackCommand::PannerAttr { attr, target })
    }

    /// Switches the distance and panning models by their engine names. Every addressed voice
    /// keeps its own cone and distance settings.
    ///
    /// # Errors
    ///
    /// [`PetalHowlError::InvalidEnumValue`] for an unknown name; nothing is changed.
    pub fn set_panner_models(&self, distance_model: &str, panning_model: &str) -> Result<()> {
        let distance: DistanceModel = distance_model.parse()?;
        let panning: PanningModel = panning_model.parse()?;
        self.command(|target| PlaybackCommand::PannerModels {
            distance,
            panning,
            target,
        })
    }

    pub fn playing(&self) -> Result<bool> {
        self.ask(PlaybackQuery::Playing)?.into_bool()
    }

    /// Group: the full resource length, zero until loaded. Instance: the sprite length when
    /// the voice plays a sprite.
    pub fn duration(&self) -> Result<Duration> {
        self.ask(PlaybackQuery::Duration)?.into_duration()
    }

    pub fn state(&self) -> LoadState {
        self.howl().state()
    }
}
