//! Event bridge between engine notifications and application callbacks.
//!
//! The engine reports what happened as [`EngineNotification`]s: an engine event name plus an
//! untyped payload. The bridge checks each payload against the shape its event is supposed to
//! have, turns it into a [`PetalHowlEvent`], and hands it to the handler registered for that
//! event when the resource was created.

use crate::error::PetalHowlError;
use crate::howl::{HowlId, HowlShared, LoadState};
use crate::playback::VoiceId;
use crossbeam_channel::Receiver;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Every notification the engine can emit for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Load,
    LoadError,
    PlayError,
    Play,
    End,
    Pause,
    Stop,
    Mute,
    Volume,
    Rate,
    Seek,
    Fade,
    Unlock,
    Stereo,
    Pos,
    Orientation,
}

/// Arguments an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Resource-scoped, no arguments.
    Resource,
    /// The affected voice.
    Voice,
    /// The affected voice (if any) and an error message.
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        Self::Load,
        Self::LoadError,
        Self::PlayError,
        Self::Play,
        Self::End,
        Self::Pause,
        Self::Stop,
        Self::Mute,
        Self::Volume,
        Self::Rate,
        Self::Seek,
        Self::Fade,
        Self::Unlock,
        Self::Stereo,
        Self::Pos,
        Self::Orientation,
    ];

    /// Engine-side event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::LoadError => "loaderror",
            Self::PlayError => "playerror",
            Self::Play => "play",
            Self::End => "end",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Mute => "mute",
            Self::Volume => "volume",
            Self::Rate => "rate",
            Self::Seek => "seek",
            Self::Fade => "fade",
            Self::Unlock => "unlock",
            Self::Stereo => "stereo",
            Self::Pos => "pos",
            Self::Orientation => "orientation",
        }
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::Load | Self::Unlock => PayloadShape::Resource,
            Self::LoadError | Self::PlayError => PayloadShape::Error,
            _ => PayloadShape::Voice,
        }
    }
}

impl FromStr for EventKind {
    type Err = PetalHowlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PetalHowlError::InvalidEnumValue {
                kind: "event",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw arguments of an engine notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePayload {
    None,
    Voice(VoiceId),
    Error {
        voice: Option<VoiceId>,
        message: String,
    },
}

impl EnginePayload {
    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::None => PayloadShape::Resource,
            Self::Voice(_) => PayloadShape::Voice,
            Self::Error { .. } => PayloadShape::Error,
        }
    }
}

/// A notification as posted by the engine on its notification channel.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineNotification {
    pub howl: HowlId,
    pub kind: EventKind,
    pub payload: EnginePayload,
}

impl EngineNotification {
    pub fn resource(howl: HowlId, kind: EventKind) -> Self {
        Self {
            howl,
            kind,
            payload: EnginePayload::None,
        }
    }

    pub fn voice(howl: HowlId, kind: EventKind, voice: VoiceId) -> Self {
        Self {
            howl,
            kind,
            payload: EnginePayload::Voice(voice),
        }
    }

    pub fn error(
        howl: HowlId,
        kind: EventKind,
        voice: Option<VoiceId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            howl,
            kind,
            payload: EnginePayload::Error {
                voice,
                message: message.into(),
            },
        }
    }
}

/// Typed, resource-scoped events produced by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum PetalHowlEvent {
    Loaded {
        howl: HowlId,
    },
    LoadFailed {
        howl: HowlId,
        voice: Option<VoiceId>,
        error: PetalHowlError,
    },
    PlayFailed {
        howl: HowlId,
        voice: Option<VoiceId>,
        error: PetalHowlError,
    },
    Unlocked {
        howl: HowlId,
    },
    /// Any of the voice-scoped notifications (`play`, `end`, `stop`, ...).
    Voice {
        howl: HowlId,
        kind: EventKind,
        voice: VoiceId,
    },
}

impl PetalHowlEvent {
    /// Translates a raw notification, or returns `None` when its payload does not match the
    /// shape of its event.
    pub fn from_notification(notification: EngineNotification) -> Option<Self> {
        let EngineNotification {
            howl,
            kind,
            payload,
        } = notification;

        if payload.shape() != kind.shape() {
            return None;
        }

        let event = match (kind, payload) {
            (EventKind::Load, _) => Self::Loaded { howl },
            (EventKind::Unlock, _) => Self::Unlocked { howl },
            (EventKind::LoadError, EnginePayload::Error { voice, message }) => Self::LoadFailed {
                howl,
                voice,
                error: PetalHowlError::LoadFailed(message),
            },
            (EventKind::PlayError, EnginePayload::Error { voice, message }) => Self::PlayFailed {
                howl,
                voice,
                error: PetalHowlError::PlayFailed(message),
            },
            (kind, EnginePayload::Voice(voice)) => Self::Voice { howl, kind, voice },
            _ => return None,
        };
        Some(event)
    }

    pub fn howl(&self) -> HowlId {
        match self {
            Self::Loaded { howl }
            | Self::LoadFailed { howl, .. }
            | Self::PlayFailed { howl, .. }
            | Self::Unlocked { howl }
            | Self::Voice { howl, .. } => *howl,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Loaded { .. } => EventKind::Load,
            Self::LoadFailed { .. } => EventKind::LoadError,
            Self::PlayFailed { .. } => EventKind::PlayError,
            Self::Unlocked { .. } => EventKind::Unlock,
            Self::Voice { kind, .. } => *kind,
        }
    }

    pub fn voice(&self) -> Option<VoiceId> {
        match self {
            Self::LoadFailed { voice, .. } | Self::PlayFailed { voice, .. } => *voice,
            Self::Voice { voice, .. } => Some(*voice),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::LoadFailed { .. } | Self::PlayFailed { .. })
    }
}

enum Handler {
    Resource(Box<dyn FnMut()>),
    Voice(Box<dyn FnMut(VoiceId)>),
    Error(Box<dyn FnMut(Option<VoiceId>, PetalHowlError)>),
}

/// Callbacks for one resource, fixed when the resource is created.
///
/// Each event has exactly one slot; registering twice for the same event keeps the last
/// callback. There is no way to add or remove callbacks once the table has been handed to
/// [`PetalHowlWorld::create_howl`](crate::PetalHowlWorld::create_howl).
#[derive(Default)]
pub struct EventHandlers {
    handlers: BTreeMap<EventKind, Handler>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn voice(mut self, kind: EventKind, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.handlers.insert(kind, Handler::Voice(Box::new(f)));
        self
    }

    pub fn on_load(mut self, f: impl FnMut() + 'static) -> Self {
        self.handlers
            .insert(EventKind::Load, Handler::Resource(Box::new(f)));
        self
    }

    pub fn on_unlock(mut self, f: impl FnMut() + 'static) -> Self {
        self.handlers
            .insert(EventKind::Unlock, Handler::Resource(Box::new(f)));
        self
    }

    /// The error is always [`PetalHowlError::LoadFailed`].
    pub fn on_load_error(
        mut self,
        f: impl FnMut(Option<VoiceId>, PetalHowlError) + 'static,
    ) -> Self {
        self.handlers
            .insert(EventKind::LoadError, Handler::Error(Box::new(f)));
        self
    }

    /// The error is always [`PetalHowlError::PlayFailed`].
    pub fn on_play_error(
        mut self,
        f: impl FnMut(Option<VoiceId>, PetalHowlError) + 'static,
    ) -> Self {
        self.handlers
            .insert(EventKind::PlayError, Handler::Error(Box::new(f)));
        self
    }

    pub fn on_play(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Play, f)
    }

    /// Fires at the end of every loop iteration for looping voices.
    pub fn on_end(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::End, f)
    }

    pub fn on_pause(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Pause, f)
    }

    pub fn on_stop(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Stop, f)
    }

    pub fn on_mute(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Mute, f)
    }

    pub fn on_volume(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Volume, f)
    }

    pub fn on_rate(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Rate, f)
    }

    pub fn on_seek(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Seek, f)
    }

    pub fn on_fade(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Fade, f)
    }

    pub fn on_stereo(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Stereo, f)
    }

    pub fn on_pos(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Pos, f)
    }

    pub fn on_orientation(self, f: impl FnMut(VoiceId) + 'static) -> Self {
        self.voice(EventKind::Orientation, f)
    }

    fn dispatch(&mut self, event: &PetalHowlEvent) {
        let Some(handler) = self.handlers.get_mut(&event.kind()) else {
            return;
        };

        match (handler, event) {
            (Handler::Resource(f), _) => f(),
            (Handler::Voice(f), PetalHowlEvent::Voice { voice, .. }) => f(*voice),
            (
                Handler::Error(f),
                PetalHowlEvent::LoadFailed { voice, error, .. }
                | PetalHowlEvent::PlayFailed { voice, error, .. },
            ) => f(*voice, error.clone()),
            _ => log::warn!("Handler shape mismatch for event {}", event.kind()),
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

struct Route {
    howl: Rc<HowlShared>,
    handlers: EventHandlers,
}

/// Drains the engine's notification channel and routes each notification to its resource.
pub(crate) struct EventBridge {
    receiver: Receiver<EngineNotification>,
    routes: HashMap<HowlId, Route>,
}

impl EventBridge {
    pub(crate) fn new(receiver: Receiver<EngineNotification>) -> Self {
        Self {
            receiver,
            routes: HashMap::new(),
        }
    }

    pub(crate) fn register(&mut self, howl: Rc<HowlShared>, handlers: EventHandlers) {
        log::debug!(
            "Registering {} handler(s) for howl {}",
            handlers.len(),
            howl.id
        );
        self.routes.insert(howl.id, Route { howl, handlers });
    }

    pub(crate) fn howls(&self) -> impl Iterator<Item = &Rc<HowlShared>> {
        self.routes.values().map(|route| &route.howl)
    }

    /// Dispatches every notification queued so far, in the order the engine posted them.
    ///
    /// Notifications posted while handlers run (for example by a handler that stops a voice)
    /// are left in the channel for the next call.
    pub(crate) fn pump(&mut self) -> Vec<PetalHowlEvent> {
        let pending: Vec<EngineNotification> = self.receiver.try_iter().collect();
        let mut dispatched = Vec::with_capacity(pending.len());

        for notification in pending {
            let howl_id = notification.howl;
            let kind = notification.kind;

            let Some(route) = self.routes.get_mut(&howl_id) else {
                log::warn!("Dropping {} notification for unknown howl {}", kind, howl_id);
                continue;
            };

            let Some(event) = PetalHowlEvent::from_notification(notification) else {
                log::warn!(
                    "Dropping {} notification for howl {}: payload does not match {:?}",
                    kind,
                    howl_id,
                    kind.shape()
                );
                continue;
            };

            if !Self::apply_load_transition(&route.howl, &event) {
                continue;
            }

            log::debug!("Dispatching {:?}", event);
            route.handlers.dispatch(&event);
            dispatched.push(event);
        }

        dispatched
    }

    /// Returns false when the event is stale and must not be dispatched.
    fn apply_load_transition(howl: &HowlShared, event: &PetalHowlEvent) -> bool {
        match event {
            PetalHowlEvent::Loaded { .. } | PetalHowlEvent::LoadFailed { .. } => {
                if howl.state.get() != LoadState::Loading {
                    log::debug!(
                        "Ignoring stale {} for howl {} in state {:?}",
                        event.kind(),
                        howl.id,
                        howl.state.get()
                    );
                    return false;
                }
                let next = if event.is_error() {
                    LoadState::Unloaded
                } else {
                    LoadState::Loaded
                };
                log::info!("Howl {} {:?} -> {:?}", howl.id, howl.state.get(), next);
                howl.state.set(next);
                true
            }
            _ => true,
        }
    }
}
