//! Resources: one audio asset, its defaults, sprite table and load state.

use crate::backend::{PlaybackCommand, PlaybackQuery, QueryValue, SharedBackend};
use crate::config::{HowlDesc, Sprite};
use crate::error::{PetalHowlError, Result};
use crate::playback::{Sound, VoiceId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Handle the engine assigns to a resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HowlId(u64);

impl HowlId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HowlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HowlId({})", self.0)
    }
}

/// Load state of a resource.
///
/// `Loading -> Loaded` and `Loading -> Unloaded` only happen when the engine's `load` /
/// `loaderror` notification is dispatched by
/// [`PetalHowlWorld::poll_events`](crate::PetalHowlWorld::poll_events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// State shared between a [`Howl`], its [`Sound`]s and the event bridge.
pub(crate) struct HowlShared {
    pub(crate) id: HowlId,
    pub(crate) desc: HowlDesc,
    pub(crate) state: Cell<LoadState>,
    /// Epoch each live voice ID was minted with. Epochs never repeat within a resource.
    epochs: RefCell<HashMap<VoiceId, u64>>,
    next_epoch: Cell<u64>,
}

impl HowlShared {
    pub(crate) fn new(id: HowlId, desc: HowlDesc) -> Self {
        Self {
            id,
            desc,
            state: Cell::new(LoadState::Unloaded),
            epochs: RefCell::new(HashMap::new()),
            next_epoch: Cell::new(1),
        }
    }

    fn bump_epoch(&self, voice: VoiceId) -> u64 {
        let epoch = self.next_epoch.get();
        self.next_epoch.set(epoch + 1);
        self.epochs.borrow_mut().insert(voice, epoch);
        epoch
    }

    pub(crate) fn is_current(&self, voice: VoiceId, epoch: u64) -> bool {
        self.epochs.borrow().get(&voice) == Some(&epoch)
    }

    /// Back to `Unloaded` with every outstanding instance invalidated.
    pub(crate) fn reset(&self) {
        self.state.set(LoadState::Unloaded);
        self.epochs.borrow_mut().clear();
    }
}

/// A loaded (or loading) audio asset.
///
/// Cloning is cheap and every clone refers to the same resource. Use [`Howl::group`] for a
/// handle that addresses all voices at once, or [`Howl::play`] to start a new voice.
#[derive(Clone)]
pub struct Howl {
    shared: Rc<HowlShared>,
    backend: SharedBackend,
}

impl Howl {
    pub(crate) fn new(shared: Rc<HowlShared>, backend: SharedBackend) -> Self {
        Self { shared, backend }
    }

    pub fn id(&self) -> HowlId {
        self.shared.id
    }

    /// The options the resource was created with.
    pub fn desc(&self) -> &HowlDesc {
        &self.shared.desc
    }

    pub fn state(&self) -> LoadState {
        self.shared.state.get()
    }

    pub fn sprites(&self) -> impl Iterator<Item = (&str, &Sprite)> {
        self.shared
            .desc
            .sprites
            .iter()
            .map(|(name, sprite)| (name.as_str(), sprite))
    }

    /// Exact, case-sensitive lookup in the sprite table.
    pub fn sprite(&self, name: &str) -> Result<&Sprite> {
        self.shared
            .desc
            .sprites
            .get(name)
            .ok_or_else(|| PetalHowlError::SpriteNotFound(name.to_string()))
    }

    /// Starts loading. No-op while `Loading` or `Loaded`.
    pub fn load(&self) -> Result<()> {
        if self.state() != LoadState::Unloaded {
            return Ok(());
        }

        self.shared.state.set(LoadState::Loading);
        log::info!("Howl {} Unloaded -> Loading", self.id());
        if let Err(e) = self.execute(PlaybackCommand::Load) {
            self.shared.state.set(LoadState::Unloaded);
            return Err(e);
        }
        Ok(())
    }

    /// Stops every voice, releases the audio and returns to `Unloaded`.
    ///
    /// Calling it on an already unloaded resource is fine.
    pub fn unload(&self) -> Result<()> {
        self.execute(PlaybackCommand::Unload)?;
        self.shared.reset();
        log::info!("Howl {} unloaded", self.id());
        Ok(())
    }

    /// Handle addressing every active voice of this resource.
    pub fn group(&self) -> Sound {
        Sound::Group(self.clone())
    }

    /// Starts a new voice. See [`Sound::play`].
    pub fn play(&self) -> Sound {
        self.mint(None)
    }

    /// Starts a new voice restricted to the named sprite.
    ///
    /// # Errors
    ///
    /// [`PetalHowlError::SpriteNotFound`] when the name is not in the sprite table; the engine
    /// is not contacted in that case.
    pub fn play_sprite(&self, name: &str) -> Result<Sound> {
        self.sprite(name)?;
        Ok(self.mint(Some(name)))
    }

    /// Like [`Howl::play`], but reports a refused play as an error instead of the sentinel.
    pub fn try_play(&self) -> Result<Sound> {
        self.try_mint(None)
    }

    pub(crate) fn try_mint(&self, sprite: Option<&str>) -> Result<Sound> {
        if self.state() == LoadState::Unloaded {
            self.load()?;
        }

        let minted = self.execute(PlaybackCommand::Play {
            sprite: sprite.map(str::to_string),
            voice: None,
        })?;

        match minted {
            Some(id) => {
                let epoch = self.shared.bump_epoch(id);
                log::debug!("Howl {} minted voice {} (epoch {})", self.id(), id, epoch);
                Ok(Sound::Instance {
                    howl: self.clone(),
                    id,
                    epoch,
                })
            }
            None => Err(PetalHowlError::PoolExhausted),
        }
    }

    pub(crate) fn mint(&self, sprite: Option<&str>) -> Sound {
        self.try_mint(sprite).unwrap_or_else(|e| {
            log::warn!("Howl {} could not start a voice: {}", self.id(), e);
            Sound::invalid(self.clone())
        })
    }

    pub(crate) fn is_current(&self, voice: VoiceId, epoch: u64) -> bool {
        self.shared.is_current(voice, epoch)
    }

    pub(crate) fn execute(&self, command: PlaybackCommand) -> Result<Option<VoiceId>> {
        self.backend.borrow_mut().execute(self.id(), command)
    }

    pub(crate) fn query(&self, query: PlaybackQuery) -> Result<QueryValue> {
        self.backend.borrow().query(self.id(), query)
    }
}

impl std::fmt::Debug for Howl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Howl")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state.get())
            .field("sources", &self.shared.desc.sources)
            .finish()
    }
}

impl PartialEq for Howl {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epochs_track_recycled_ids() {
        let shared = HowlShared::new(HowlId::new(0), HowlDesc::new("a.mp3"));
        let voice = VoiceId::new(2);
        let first = shared.bump_epoch(voice);
        assert!(shared.is_current(voice, first));

        let second = shared.bump_epoch(voice);
        assert!(!shared.is_current(voice, first));
        assert!(shared.is_current(voice, second));

        shared.reset();
        assert!(!shared.is_current(voice, second));
        assert_eq!(shared.state.get(), LoadState::Unloaded);

        let third = shared.bump_epoch(voice);
        assert!(!shared.is_current(voice, first));
        assert!(shared.is_current(voice, third));
    }

    #[test]
    fn howl_id_display() {
        assert_eq!(HowlId::new(4).to_string(), "HowlId(4)");
    }
}
