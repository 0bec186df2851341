//! The boundary to the external audio engine.
//!
//! PetalHowl never decodes or mixes audio. It drives an [`AudioBackend`] with typed
//! commands and reads back typed answers; the engine reports asynchronous outcomes on a
//! notification channel that [`PetalHowlWorld::poll_events`](crate::PetalHowlWorld::poll_events)
//! drains.

mod command;
mod headless;

pub use command::{GlobalCommand, PlaybackCommand, PlaybackQuery, QueryValue, Target};
pub use headless::HeadlessBackend;

use crate::config::HowlDesc;
use crate::error::Result;
use crate::events::EngineNotification;
use crate::howl::HowlId;
use crate::playback::VoiceId;
use crossbeam_channel::Receiver;
use std::cell::RefCell;
use std::rc::Rc;

/// Handle through which resources and playback handles reach the engine.
pub type SharedBackend = Rc<RefCell<dyn AudioBackend>>;

/// An audio engine that owns decoding, mixing and the voice pools.
///
/// All calls are made from one thread and must return without waiting on audio work.
pub trait AudioBackend {
    /// Registers a resource. Loading only starts on [`PlaybackCommand::Load`].
    fn create_resource(&mut self, desc: &HowlDesc) -> Result<HowlId>;

    /// Runs a command. `Play` answers with the minted or restarted voice, or `None` when the
    /// engine refused (pool exhausted, resource not loaded, voice drained); every other command
    /// answers `None`.
    ///
    /// Unknown voices are reported as [`PetalHowlError::InvalidVoice`](crate::PetalHowlError::InvalidVoice).
    fn execute(&mut self, howl: HowlId, command: PlaybackCommand) -> Result<Option<VoiceId>>;

    fn query(&self, howl: HowlId, query: PlaybackQuery) -> Result<QueryValue>;

    fn apply_global(&mut self, command: GlobalCommand);

    /// Whether the engine can play the given format/extension, e.g. `"mp3"`.
    fn supports_codec(&self, format: &str) -> bool;

    /// Channel the engine posts notifications on, in firing order.
    fn notifications(&self) -> Receiver<EngineNotification>;
}
