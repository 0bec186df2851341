//! Global mixer: process-wide volume, mute, stereo, suspend policy and the listener.
//!
//! The mixer keeps a local copy of every value it forwards so getters never need to ask the
//! engine. It is owned by a [`PetalHowlWorld`](crate::PetalHowlWorld); create a second world
//! for an isolated mixer.

use crate::backend::{GlobalCommand, SharedBackend};
use crate::config::PetalHowlWorldDesc;
use crate::math::{Orientation, Vec3};
use crate::spatial::Listener;

pub struct Mixer {
    backend: SharedBackend,
    volume: f32,
    muted: bool,
    stereo: Option<f32>,
    auto_suspend: bool,
    html5_pool_size: usize,
    listener: Listener,
}

impl Mixer {
    /// Pushes the initial values from `desc` to the engine.
    pub(crate) fn new(backend: SharedBackend, desc: &PetalHowlWorldDesc) -> Self {
        let mut mixer = Self {
            backend,
            volume: desc.master_volume,
            muted: desc.muted,
            stereo: None,
            auto_suspend: desc.auto_suspend,
            html5_pool_size: desc.html5_pool_size,
            listener: Listener::default(),
        };
        mixer.send(GlobalCommand::Volume(desc.master_volume));
        mixer.send(GlobalCommand::Mute(desc.muted));
        mixer.send(GlobalCommand::AutoSuspend(desc.auto_suspend));
        mixer.send(GlobalCommand::Html5PoolSize(desc.html5_pool_size));
        mixer
    }

    fn send(&mut self, command: GlobalCommand) {
        self.backend.borrow_mut().apply_global(command);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Master volume, 0.0 - 1.0.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.send(GlobalCommand::Volume(volume));
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
        self.send(GlobalCommand::Mute(muted));
    }

    /// Last global pan, `None` if never set.
    pub fn stereo(&self) -> Option<f32> {
        self.stereo
    }

    /// Pans every resource and every active voice. -1.0 (left) to 1.0 (right).
    pub fn set_stereo(&mut self, pan: f32) {
        self.stereo = Some(pan);
        self.send(GlobalCommand::Stereo(pan));
    }

    pub fn auto_suspend(&self) -> bool {
        self.auto_suspend
    }

    pub fn set_auto_suspend(&mut self, enabled: bool) {
        self.auto_suspend = enabled;
        self.send(GlobalCommand::AutoSuspend(enabled));
    }

    pub fn html5_pool_size(&self) -> usize {
        self.html5_pool_size
    }

    pub fn set_html5_pool_size(&mut self, size: usize) {
        self.html5_pool_size = size;
        self.send(GlobalCommand::Html5PoolSize(size));
    }

    /// Whether the engine can play `format` (an extension or MIME subtype such as `"ogg"`).
    pub fn codecs(&self, format: &str) -> bool {
        self.backend.borrow().supports_codec(format)
    }

    pub fn listener(&self) -> Listener {
        self.listener
    }

    pub fn listener_position(&self) -> Vec3 {
        self.listener.position
    }

    pub fn set_listener_position(&mut self, position: Vec3) {
        self.listener.position = position;
        self.send(GlobalCommand::ListenerPosition(position));
    }

    pub fn listener_orientation(&self) -> Orientation {
        self.listener.orientation
    }

    /// `front` and `up` are expected to be perpendicular; this is not checked.
    pub fn set_listener_orientation(&mut self, orientation: Orientation) {
        self.listener.orientation = orientation;
        self.send(GlobalCommand::ListenerOrientation(orientation));
    }

    /// Sets position and orientation in one go.
    pub fn set_listener(&mut self, listener: Listener) {
        self.set_listener_position(listener.position);
        self.set_listener_orientation(listener.orientation);
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("volume", &self.volume)
            .field("muted", &self.muted)
            .field("stereo", &self.stereo)
            .field("auto_suspend", &self.auto_suspend)
            .field("html5_pool_size", &self.html5_pool_size)
            .field("listener", &self.listener)
            .finish()
    }
}
