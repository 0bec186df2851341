//! # PetalHowl
//!
//! A playback-control layer for an external audio engine.
//!
//! PetalHowl never touches samples. It drives an [`AudioBackend`] through typed commands,
//! addresses either every voice of a resource or one voice through the same [`Sound`]
//! handle, and turns the engine's notifications into typed, ID-scoped callbacks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use petalhowl::*;
//! use std::time::Duration;
//!
//! let backend = HeadlessBackend::new().with_clip("sfx.webm", Duration::from_secs(4));
//! let mut world = PetalHowlWorld::new(PetalHowlWorldDesc::default(), backend)?;
//!
//! // Resource with a sprite and a couple of handlers
//! let howl = world.create_howl(
//!     HowlDesc::new("sfx.webm").sprite("blast", Sprite::from_millis(0, 1500, false)),
//!     EventHandlers::new()
//!         .on_load(|| println!("loaded"))
//!         .on_end(|id| println!("voice {} ended", id)),
//! )?;
//!
//! // A group handle plays new voices; each play returns an instance
//! let voice = howl.group().play();
//! voice.set_volume(0.5)?;
//! let blast = howl.play_sprite("blast")?;
//! blast.set_stereo(-1.0)?;
//!
//! // Global listener lives on the mixer
//! world.mixer_mut().set_listener_position(Vec3::new(0.0, 1.7, 0.0));
//!
//! // Deliver notifications
//! world.backend_mut().advance(Duration::from_secs(2));
//! for event in world.poll_events() {
//!     if let PetalHowlEvent::Voice { kind: EventKind::End, voice, .. } = event {
//!         println!("{} finished", voice);
//!     }
//! }
//! # Ok::<(), PetalHowlError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`PetalHowlWorld`]**: Context owning the engine, the mixer and the event bridge
//! - **[`Howl`]**: One audio resource with its defaults, sprites and load state
//! - **[`Sound`]**: Group or instance playback handle
//! - **[`Mixer`]**: Master volume, mute, stereo, suspend policy and the listener
//! - **[`EventHandlers`]** / **[`PetalHowlEvent`]**: Callbacks and typed events
//! - **[`AudioBackend`]**: Engine boundary; [`HeadlessBackend`] is a sample-free engine
//!
//! ## Voice identity
//!
//! Voice IDs come from a bounded pool and are recycled. An instance whose ID has been
//! handed out again reports [`PetalHowlError::InvalidVoice`] instead of controlling the
//! new voice.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod howl;
pub mod math;
pub mod mixer;
pub mod playback;
pub mod spatial;
pub mod world;

pub use backend::{AudioBackend, HeadlessBackend};
pub use config::{HowlDesc, PetalHowlWorldDesc, Sprite};
pub use error::{PetalHowlError, Result};
pub use events::{EventHandlers, EventKind, PetalHowlEvent};
pub use howl::{Howl, HowlId, LoadState};
pub use math::{Orientation, Quat, Vec3};
pub use mixer::Mixer;
pub use playback::{Sound, VoiceId};
pub use spatial::{DistanceModel, Listener, PannerAttr, PanningModel};
pub use world::PetalHowlWorld;
