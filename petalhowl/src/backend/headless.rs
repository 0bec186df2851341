//! A sample-free engine that keeps time and voice bookkeeping only.
//!
//! `HeadlessBackend` behaves like a real engine at the control level (bounded voice pools,
//! seek positions, fades, loop ends, notifications) but never produces audio. Time only moves
//! when [`HeadlessBackend::advance`] is called, which makes playback fully deterministic.

use super::{AudioBackend, GlobalCommand, PlaybackCommand, PlaybackQuery, QueryValue, Target};
use crate::config::HowlDesc;
use crate::error::{PetalHowlError, Result};
use crate::events::{EngineNotification, EventKind};
use crate::howl::HowlId;
use crate::math::Vec3;
use crate::playback::VoiceId;
use crate::spatial::{Listener, PannerAttr};
use crossbeam_channel::{Receiver, Sender};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Idle time after which the context suspends when auto-suspend is on.
const SUSPEND_AFTER: Duration = Duration::from_secs(30);

const SUPPORTED_CODECS: &[&str] = &[
    "mp3", "mpeg", "opus", "ogg", "oga", "wav", "aac", "caf", "m4a", "m4b", "mp4", "weba",
    "webm", "dolby", "flac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceState {
    Playing,
    Paused,
    /// Stopped or finished; the slot may be recycled by the next play.
    Ended,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Params {
    volume: f32,
    rate: f32,
    looping: bool,
    muted: bool,
    stereo: Option<f32>,
    position: Option<Vec3>,
    orientation: Vec3,
    panner: PannerAttr,
}

impl Params {
    fn from_desc(desc: &HowlDesc) -> Self {
        Self {
            volume: desc.volume,
            rate: desc.rate,
            looping: desc.looping,
            muted: desc.muted,
            stereo: desc.stereo,
            position: desc.position,
            orientation: desc.orientation,
            panner: desc.panner,
        }
    }
}

#[derive(Debug, Clone)]
struct Voice {
    sprite: Option<String>,
    start: Duration,
    end: Duration,
    /// Position relative to `start`.
    cursor: Duration,
    state: VoiceState,
    params: Params,
    fade: Option<Fade>,
}

impl Voice {
    fn length(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone)]
enum Decode {
    Unloaded,
    Loaded(Duration),
    Failed(String),
}

#[derive(Debug)]
struct Resource {
    desc: HowlDesc,
    decode: Decode,
    defaults: Params,
    /// Voice ID == index.
    voices: Vec<Voice>,
}

impl Resource {
    fn total(&self) -> Duration {
        match self.decode {
            Decode::Loaded(duration) => duration,
            _ => Duration::ZERO,
        }
    }

    fn index(&self, id: VoiceId) -> Result<usize> {
        usize::try_from(id.get())
            .ok()
            .filter(|index| *index < self.voices.len())
            .ok_or(PetalHowlError::InvalidVoice(id))
    }

    fn voice(&self, id: VoiceId) -> Result<&Voice> {
        self.index(id).map(|index| &self.voices[index])
    }

    /// Group targets only reach voices that are playing or paused.
    fn indices(&self, target: Target) -> Result<Vec<usize>> {
        match target {
            Target::Group => Ok(self
                .voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state != VoiceState::Ended)
                .map(|(index, _)| index)
                .collect()),
            Target::Voice(id) => self.index(id).map(|index| vec![index]),
        }
    }

    fn first(&self, target: Target) -> Result<Option<&Voice>> {
        match target {
            Target::Group => Ok(self.voices.iter().find(|v| v.state != VoiceState::Ended)),
            Target::Voice(id) => self.voice(id).map(Some),
        }
    }

    fn params(&self, target: Target) -> Result<&Params> {
        Ok(self
            .first(target)?
            .map(|voice| &voice.params)
            .unwrap_or(&self.defaults))
    }

    /// Applies `f` to the addressed voices (and to the defaults for group commands), emitting
    /// `kind` once per voice.
    fn update(
        &mut self,
        howl: HowlId,
        target: Target,
        kind: Option<EventKind>,
        out: &mut Vec<EngineNotification>,
        f: impl Fn(&mut Voice),
    ) -> Result<()> {
        let indices = self.indices(target)?;
        if target == Target::Group {
            let mut template = Voice {
                sprite: None,
                start: Duration::ZERO,
                end: Duration::ZERO,
                cursor: Duration::ZERO,
                state: VoiceState::Ended,
                params: self.defaults,
                fade: None,
            };
            f(&mut template);
            self.defaults = template.params;
        }
        for index in indices {
            f(&mut self.voices[index]);
            if let Some(kind) = kind {
                out.push(EngineNotification::voice(howl, kind, voice_id(index)));
            }
        }
        Ok(())
    }

    /// Takes an ended slot or a fresh one; `None` when every slot is active.
    fn mint(&mut self, sprite: Option<&str>) -> Result<Option<usize>> {
        let total = self.total();
        let (start, end, sprite_loop) = match sprite {
            Some(name) => {
                let region = self
                    .desc
                    .sprites
                    .get(name)
                    .ok_or_else(|| PetalHowlError::SpriteNotFound(name.to_string()))?;
                (region.offset.min(total), region.end().min(total), region.looping)
            }
            None => (Duration::ZERO, total, false),
        };

        let mut params = self.defaults;
        params.looping |= sprite_loop;
        let voice = Voice {
            sprite: sprite.map(str::to_string),
            start,
            end,
            cursor: Duration::ZERO,
            state: VoiceState::Playing,
            params,
            fade: None,
        };

        if let Some(index) = self
            .voices
            .iter()
            .position(|v| v.state == VoiceState::Ended)
        {
            self.voices[index] = voice;
            Ok(Some(index))
        } else if self.voices.len() < self.desc.pool_size {
            self.voices.push(voice);
            Ok(Some(self.voices.len() - 1))
        } else {
            Ok(None)
        }
    }

    fn stop_all(&mut self, howl: HowlId, out: &mut Vec<EngineNotification>) {
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if voice.state != VoiceState::Ended {
                out.push(EngineNotification::voice(howl, EventKind::Stop, voice_id(index)));
            }
            voice.state = VoiceState::Ended;
            voice.cursor = Duration::ZERO;
            voice.fade = None;
        }
    }
}

/// Pool sizes are validated to fit in `i32`, so the sentinel is never produced in practice.
fn voice_id(index: usize) -> VoiceId {
    i32::try_from(index)
        .map(VoiceId::new)
        .unwrap_or(VoiceId::INVALID)
}

fn extension(source: &str) -> Option<&str> {
    let path = source.split(['?', '#']).next()?;
    let (_, ext) = path.rsplit_once('.')?;
    (!ext.contains('/')).then_some(ext)
}

/// Reference engine used by tests and the demo. See the module docs.
pub struct HeadlessBackend {
    clips: HashMap<String, Duration>,
    resources: BTreeMap<HowlId, Resource>,
    next_howl: u64,
    master_volume: f32,
    muted: bool,
    stereo: Option<f32>,
    auto_suspend: bool,
    html5_pool_size: usize,
    listener: Listener,
    suspended: bool,
    idle: Duration,
    sender: Sender<EngineNotification>,
    receiver: Receiver<EngineNotification>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            clips: HashMap::new(),
            resources: BTreeMap::new(),
            next_howl: 0,
            master_volume: 1.0,
            muted: false,
            stereo: None,
            auto_suspend: true,
            html5_pool_size: 10,
            listener: Listener::default(),
            suspended: false,
            idle: Duration::ZERO,
            sender,
            receiver,
        }
    }

    /// Makes `uri` loadable with the given length.
    pub fn with_clip(mut self, uri: impl Into<String>, duration: Duration) -> Self {
        self.register_clip(uri, duration);
        self
    }

    pub fn register_clip(&mut self, uri: impl Into<String>, duration: Duration) {
        self.clips.insert(uri.into(), duration);
    }

    /// Moves the engine clock forward, progressing fades and playback.
    pub fn advance(&mut self, dt: Duration) {
        let mut out = Vec::new();
        let mut any_playing = false;

        for (&howl, resource) in self.resources.iter_mut() {
            for (index, voice) in resource.voices.iter_mut().enumerate() {
                if voice.state != VoiceState::Playing {
                    continue;
                }
                any_playing = true;
                let id = voice_id(index);

                if let Some(mut fade) = voice.fade {
                    fade.elapsed += dt;
                    let t = (fade.elapsed.as_secs_f32() / fade.duration.as_secs_f32()).min(1.0);
                    voice.params.volume = fade.from + (fade.to - fade.from) * t;
                    if t >= 1.0 {
                        voice.fade = None;
                        out.push(EngineNotification::voice(howl, EventKind::Fade, id));
                    } else {
                        voice.fade = Some(fade);
                    }
                }

                let length = voice.length();
                let step = dt.as_secs_f64() * f64::from(voice.params.rate.max(0.0));
                voice.cursor = voice
                    .cursor
                    .saturating_add(Duration::try_from_secs_f64(step).unwrap_or(Duration::MAX));
                if voice.cursor >= length {
                    out.push(EngineNotification::voice(howl, EventKind::End, id));
                    if voice.params.looping && !length.is_zero() {
                        let wrapped = voice.cursor.as_secs_f64() % length.as_secs_f64();
                        voice.cursor = Duration::from_secs_f64(wrapped);
                    } else {
                        voice.state = VoiceState::Ended;
                        voice.cursor = Duration::ZERO;
                        voice.fade = None;
                    }
                }
            }
        }

        if any_playing {
            self.idle = Duration::ZERO;
        } else {
            self.idle += dt;
            if self.auto_suspend && !self.suspended && self.idle >= SUSPEND_AFTER {
                log::info!("Headless context suspended after {:?} idle", self.idle);
                self.suspended = true;
            }
        }

        self.emit_all(out);
    }

    /// Simulates the platform unlocking audio after a user gesture.
    pub fn unlock(&mut self) {
        let out = self
            .resources
            .iter()
            .filter(|(_, resource)| matches!(resource.decode, Decode::Loaded(_)))
            .map(|(&howl, _)| EngineNotification::resource(howl, EventKind::Unlock))
            .collect();
        self.emit_all(out);
    }

    /// Number of voices currently held in the resource's pool, ended ones included.
    pub fn voice_count(&self, howl: HowlId) -> usize {
        self.resources
            .get(&howl)
            .map(|resource| resource.voices.len())
            .unwrap_or(0)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn stereo(&self) -> Option<f32> {
        self.stereo
    }

    pub fn auto_suspend(&self) -> bool {
        self.auto_suspend
    }

    pub fn html5_pool_size(&self) -> usize {
        self.html5_pool_size
    }

    pub fn listener(&self) -> Listener {
        self.listener
    }

    fn emit_all(&self, notifications: Vec<EngineNotification>) {
        for notification in notifications {
            if let Err(e) = self.sender.send(notification) {
                log::error!("Failed to post notification: {}", e);
            }
        }
    }

    fn resource(&self, howl: HowlId) -> Result<&Resource> {
        self.resources
            .get(&howl)
            .ok_or_else(|| PetalHowlError::Engine(format!("unknown howl {}", howl)))
    }

    fn resource_mut(&mut self, howl: HowlId) -> Result<&mut Resource> {
        self.resources
            .get_mut(&howl)
            .ok_or_else(|| PetalHowlError::Engine(format!("unknown howl {}", howl)))
    }

    fn pick_source(&self, desc: &HowlDesc) -> std::result::Result<Duration, String> {
        for (index, source) in desc.sources.iter().enumerate() {
            let format = desc
                .formats
                .get(index)
                .map(String::as_str)
                .or_else(|| extension(source));
            let Some(format) = format else {
                log::debug!("Skipping {}: format unknown", source);
                continue;
            };
            if !self.supports_codec(format) {
                log::debug!("Skipping {}: unsupported format {}", source, format);
                continue;
            }
            if let Some(duration) = self.clips.get(source) {
                log::debug!("Selected source {} ({:?})", source, duration);
                return Ok(*duration);
            }
        }
        Err(format!("no playable source among {:?}", desc.sources))
    }

    fn wake(&mut self) {
        if self.suspended {
            log::info!("Headless context resumed");
        }
        self.suspended = false;
        self.idle = Duration::ZERO;
    }

    fn load(&mut self, howl: HowlId, out: &mut Vec<EngineNotification>) -> Result<()> {
        let picked = {
            let resource = self.resource(howl)?;
            if matches!(resource.decode, Decode::Loaded(_)) {
                return Ok(());
            }
            self.pick_source(&resource.desc)
        };

        let resource = self.resource_mut(howl)?;
        match picked {
            Ok(duration) => {
                resource.decode = Decode::Loaded(duration);
                out.push(EngineNotification::resource(howl, EventKind::Load));
                if resource.desc.autoplay {
                    if let Some(index) = resource.mint(None)? {
                        out.push(EngineNotification::voice(howl, EventKind::Play, voice_id(index)));
                        self.wake();
                    }
                }
            }
            Err(message) => {
                log::warn!("Howl {} failed to load: {}", howl, message);
                resource.decode = Decode::Failed(message.clone());
                out.push(EngineNotification::error(howl, EventKind::LoadError, None, message));
            }
        }
        Ok(())
    }

    fn play(
        &mut self,
        howl: HowlId,
        sprite: Option<String>,
        voice: Option<VoiceId>,
        out: &mut Vec<EngineNotification>,
    ) -> Result<Option<VoiceId>> {
        if matches!(self.resource(howl)?.decode, Decode::Unloaded) {
            self.load(howl, out)?;
        }
        let resource = self.resource_mut(howl)?;

        let refusal = match &resource.decode {
            Decode::Loaded(_) => None,
            Decode::Unloaded => Some("resource is not loaded".to_string()),
            Decode::Failed(message) => Some(format!("resource failed to load: {}", message)),
        };
        if let Some(message) = refusal {
            out.push(EngineNotification::error(howl, EventKind::PlayError, voice, message));
            return Ok(None);
        }

        let played = match voice {
            Some(id) => {
                let Ok(index) = resource.index(id) else {
                    return Ok(None);
                };
                let voice = &mut resource.voices[index];
                if voice.state != VoiceState::Playing {
                    voice.state = VoiceState::Playing;
                    out.push(EngineNotification::voice(howl, EventKind::Play, id));
                }
                Some(id)
            }
            None => match resource.mint(sprite.as_deref())? {
                Some(index) => {
                    out.push(EngineNotification::voice(howl, EventKind::Play, voice_id(index)));
                    Some(voice_id(index))
                }
                None => {
                    log::warn!(
                        "Howl {} pool of {} voices exhausted",
                        howl,
                        resource.desc.pool_size
                    );
                    None
                }
            },
        };

        if played.is_some() {
            self.wake();
        }
        Ok(played)
    }
}

impl AudioBackend for HeadlessBackend {
    fn create_resource(&mut self, desc: &HowlDesc) -> Result<HowlId> {
        let howl = HowlId::new(self.next_howl);
        self.next_howl += 1;
        self.resources.insert(
            howl,
            Resource {
                desc: desc.clone(),
                decode: Decode::Unloaded,
                defaults: Params::from_desc(desc),
                voices: Vec::new(),
            },
        );
        log::debug!("Created howl {} for {:?}", howl, desc.sources);
        Ok(howl)
    }

    fn execute(&mut self, howl: HowlId, command: PlaybackCommand) -> Result<Option<VoiceId>> {
        log::debug!("Howl {}: {:?}", howl, command);
        let mut out = Vec::new();
        let mut minted = None;

        match command {
            PlaybackCommand::Load => self.load(howl, &mut out)?,
            PlaybackCommand::Unload => {
                let resource = self.resource_mut(howl)?;
                resource.stop_all(howl, &mut out);
                resource.voices.clear();
                resource.decode = Decode::Unloaded;
            }
            PlaybackCommand::Play { sprite, voice } => {
                minted = self.play(howl, sprite, voice, &mut out)?;
            }
            PlaybackCommand::Pause(target) => {
                let resource = self.resource_mut(howl)?;
                for index in resource.indices(target)? {
                    let voice = &mut resource.voices[index];
                    if voice.state == VoiceState::Playing {
                        voice.state = VoiceState::Paused;
                        out.push(EngineNotification::voice(howl, EventKind::Pause, voice_id(index)));
                    }
                }
            }
            PlaybackCommand::Stop(target) => {
                let resource = self.resource_mut(howl)?;
                for index in resource.indices(target)? {
                    let voice = &mut resource.voices[index];
                    if voice.state != VoiceState::Ended {
                        out.push(EngineNotification::voice(howl, EventKind::Stop, voice_id(index)));
                    }
                    voice.state = VoiceState::Ended;
                    voice.cursor = Duration::ZERO;
                    voice.fade = None;
                }
            }
            PlaybackCommand::Mute { muted, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, Some(EventKind::Mute), &mut out, |v| {
                        v.params.muted = muted
                    })?;
            }
            PlaybackCommand::Volume { volume, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, Some(EventKind::Volume), &mut out, |v| {
                        v.params.volume = volume;
                        v.fade = None;
                    })?;
            }
            PlaybackCommand::Fade {
                from,
                to,
                duration,
                target,
            } => {
                let resource = self.resource_mut(howl)?;
                for index in resource.indices(target)? {
                    let voice = &mut resource.voices[index];
                    if duration.is_zero() {
                        voice.params.volume = to;
                        voice.fade = None;
                        out.push(EngineNotification::voice(howl, EventKind::Fade, voice_id(index)));
                    } else {
                        voice.params.volume = from;
                        voice.fade = Some(Fade {
                            from,
                            to,
                            duration,
                            elapsed: Duration::ZERO,
                        });
                    }
                }
            }
            PlaybackCommand::Rate { rate, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, Some(EventKind::Rate), &mut out, |v| {
                        v.params.rate = rate
                    })?;
            }
            PlaybackCommand::Seek { position, target } => {
                let resource = self.resource_mut(howl)?;
                for index in resource.indices(target)? {
                    let voice = &mut resource.voices[index];
                    voice.cursor = position.min(voice.length());
                    out.push(EngineNotification::voice(howl, EventKind::Seek, voice_id(index)));
                }
            }
            PlaybackCommand::Loop { looping, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, None, &mut out, |v| v.params.looping = looping)?;
            }
            PlaybackCommand::Stereo { pan, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, Some(EventKind::Stereo), &mut out, |v| {
                        v.params.stereo = Some(pan)
                    })?;
            }
            PlaybackCommand::Position { position, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, Some(EventKind::Pos), &mut out, |v| {
                        v.params.position = Some(position)
                    })?;
            }
            PlaybackCommand::Orientation {
                orientation,
                target,
            } => {
                self.resource_mut(howl)?.update(
                    howl,
                    target,
                    Some(EventKind::Orientation),
                    &mut out,
                    |v| v.params.orientation = orientation,
                )?;
            }
            PlaybackCommand::PannerAttr { attr, target } => {
                self.resource_mut(howl)?
                    .update(howl, target, None, &mut out, |v| v.params.panner = attr)?;
            }
            PlaybackCommand::PannerModels {
                distance,
                panning,
                target,
            } => {
                self.resource_mut(howl)?
                    .update(howl, target, None, &mut out, |v| {
                        v.params.panner.distance_model = distance;
                        v.params.panner.panning_model = panning;
                    })?;
            }
        }

        self.emit_all(out);
        Ok(minted)
    }

    fn query(&self, howl: HowlId, query: PlaybackQuery) -> Result<QueryValue> {
        let resource = self.resource(howl)?;
        let value = match query {
            PlaybackQuery::Playing(Target::Group) => QueryValue::Bool(
                resource
                    .voices
                    .iter()
                    .any(|v| v.state == VoiceState::Playing),
            ),
            PlaybackQuery::Playing(Target::Voice(id)) => {
                QueryValue::Bool(resource.voice(id)?.state == VoiceState::Playing)
            }
            PlaybackQuery::Duration(Target::Group) => QueryValue::Duration(resource.total()),
            PlaybackQuery::Duration(Target::Voice(id)) => {
                let voice = resource.voice(id)?;
                QueryValue::Duration(if voice.sprite.is_some() {
                    voice.length()
                } else {
                    resource.total()
                })
            }
            PlaybackQuery::Seek(target) => QueryValue::Duration(
                resource
                    .first(target)?
                    .map(|v| v.cursor)
                    .unwrap_or_default(),
            ),
            PlaybackQuery::Muted(target) => QueryValue::Bool(resource.params(target)?.muted),
            PlaybackQuery::Volume(target) => QueryValue::Float(resource.params(target)?.volume),
            PlaybackQuery::Rate(target) => QueryValue::Float(resource.params(target)?.rate),
            PlaybackQuery::Loop(target) => QueryValue::Bool(resource.params(target)?.looping),
            PlaybackQuery::Stereo(target) => QueryValue::Stereo(resource.params(target)?.stereo),
            PlaybackQuery::Position(target) => {
                QueryValue::Position(resource.params(target)?.position)
            }
            PlaybackQuery::Orientation(target) => {
                QueryValue::Vector(resource.params(target)?.orientation)
            }
            PlaybackQuery::PannerAttr(target) => {
                QueryValue::Panner(resource.params(target)?.panner)
            }
        };
        Ok(value)
    }

    fn apply_global(&mut self, command: GlobalCommand) {
        log::debug!("Global: {:?}", command);
        let mut out = Vec::new();
        match command {
            GlobalCommand::Volume(volume) => self.master_volume = volume,
            GlobalCommand::Mute(muted) => self.muted = muted,
            GlobalCommand::Stereo(pan) => {
                self.stereo = Some(pan);
                for (&howl, resource) in self.resources.iter_mut() {
                    // Group targets never fail.
                    let _ = resource.update(
                        howl,
                        Target::Group,
                        Some(EventKind::Stereo),
                        &mut out,
                        |v| v.params.stereo = Some(pan),
                    );
                }
            }
            GlobalCommand::AutoSuspend(enabled) => self.auto_suspend = enabled,
            GlobalCommand::Html5PoolSize(size) => self.html5_pool_size = size,
            GlobalCommand::ListenerPosition(position) => self.listener.position = position,
            GlobalCommand::ListenerOrientation(orientation) => {
                self.listener.orientation = orientation
            }
            GlobalCommand::UnloadAll => {
                for (&howl, resource) in self.resources.iter_mut() {
                    resource.stop_all(howl, &mut out);
                    resource.voices.clear();
                    resource.decode = Decode::Unloaded;
                }
            }
        }
        self.emit_all(out);
    }

    fn supports_codec(&self, format: &str) -> bool {
        let format = format.trim_start_matches("audio/").to_ascii_lowercase();
        SUPPORTED_CODECS.contains(&format.as_str())
    }

    fn notifications(&self) -> Receiver<EngineNotification> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sprite;
    use approx::assert_relative_eq;

    fn drain(backend: &HeadlessBackend) -> Vec<(EventKind, Option<i32>)> {
        backend
            .notifications()
            .try_iter()
            .map(|n| {
                let voice = match n.payload {
                    crate::events::EnginePayload::Voice(id) => Some(id.get()),
                    _ => None,
                };
                (n.kind, voice)
            })
            .collect()
    }

    fn loaded(backend: &mut HeadlessBackend, desc: HowlDesc) -> HowlId {
        let howl = backend.create_resource(&desc).unwrap();
        backend.execute(howl, PlaybackCommand::Load).unwrap();
        howl
    }

    fn play(backend: &mut HeadlessBackend, howl: HowlId) -> Option<VoiceId> {
        backend
            .execute(
                howl,
                PlaybackCommand::Play {
                    sprite: None,
                    voice: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn extension_ignores_query_strings() {
        assert_eq!(extension("music/theme.ogg?v=2"), Some("ogg"));
        assert_eq!(extension("https://cdn.example.com/stream"), None);
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn load_picks_first_supported_registered_source() {
        let mut backend = HeadlessBackend::new()
            .with_clip("a.xyz", Duration::from_secs(1))
            .with_clip("a.mp3", Duration::from_secs(3));
        let howl = loaded(
            &mut backend,
            HowlDesc::with_sources(["a.xyz", "missing.webm", "a.mp3"]),
        );
        assert_eq!(drain(&backend), vec![(EventKind::Load, None)]);
        assert_eq!(
            backend.query(howl, PlaybackQuery::Duration(Target::Group)),
            Ok(QueryValue::Duration(Duration::from_secs(3)))
        );
    }

    #[test]
    fn format_hint_overrides_missing_extension() {
        let mut backend = HeadlessBackend::new().with_clip("stream", Duration::from_secs(2));
        loaded(&mut backend, HowlDesc::new("stream").format("mp3"));
        assert_eq!(drain(&backend), vec![(EventKind::Load, None)]);
    }

    #[test]
    fn unplayable_sources_report_load_error() {
        let mut backend = HeadlessBackend::new();
        let howl = loaded(&mut backend, HowlDesc::new("gone.mp3"));
        assert_eq!(drain(&backend), vec![(EventKind::LoadError, None)]);

        assert_eq!(play(&mut backend, howl), None);
        assert_eq!(drain(&backend), vec![(EventKind::PlayError, None)]);
    }

    #[test]
    fn pool_recycles_ended_slots_first() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(1));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3").pool_size(2));

        assert_eq!(play(&mut backend, howl), Some(VoiceId::new(0)));
        assert_eq!(play(&mut backend, howl), Some(VoiceId::new(1)));
        assert_eq!(play(&mut backend, howl), None);

        backend
            .execute(howl, PlaybackCommand::Stop(Target::Voice(VoiceId::new(1))))
            .unwrap();
        assert_eq!(play(&mut backend, howl), Some(VoiceId::new(1)));
        assert_eq!(backend.voice_count(howl), 2);
    }

    #[test]
    fn paused_voices_stay_active() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(1));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3").pool_size(1));
        play(&mut backend, howl);
        backend
            .execute(howl, PlaybackCommand::Pause(Target::Group))
            .unwrap();
        assert_eq!(play(&mut backend, howl), None);
    }

    #[test]
    fn non_looping_voice_ends_and_rewinds() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(2));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        let id = play(&mut backend, howl).unwrap();
        drain(&backend);

        backend.advance(Duration::from_millis(2500));
        assert_eq!(drain(&backend), vec![(EventKind::End, Some(0))]);
        assert_eq!(
            backend.query(howl, PlaybackQuery::Playing(Target::Voice(id))),
            Ok(QueryValue::Bool(false))
        );
        assert_eq!(
            backend.query(howl, PlaybackQuery::Seek(Target::Voice(id))),
            Ok(QueryValue::Duration(Duration::ZERO))
        );
    }

    #[test]
    fn looping_sprite_wraps_and_fires_end_each_loop() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(10));
        let howl = loaded(
            &mut backend,
            HowlDesc::new("a.mp3").sprite("tick", Sprite::from_millis(1000, 1000, true)),
        );
        let id = backend
            .execute(
                howl,
                PlaybackCommand::Play {
                    sprite: Some("tick".into()),
                    voice: None,
                },
            )
            .unwrap()
            .unwrap();
        drain(&backend);

        backend.advance(Duration::from_millis(1500));
        assert_eq!(drain(&backend), vec![(EventKind::End, Some(0))]);
        let seek = backend
            .query(howl, PlaybackQuery::Seek(Target::Voice(id)))
            .unwrap()
            .into_duration()
            .unwrap();
        assert_relative_eq!(seek.as_secs_f64(), 0.5, epsilon = 1e-6);
        assert_eq!(
            backend.query(howl, PlaybackQuery::Duration(Target::Voice(id))),
            Ok(QueryValue::Duration(Duration::from_secs(1)))
        );
    }

    #[test]
    fn fade_completes_and_stop_cancels_it() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(60));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        let a = play(&mut backend, howl).unwrap();
        let b = play(&mut backend, howl).unwrap();
        for id in [a, b] {
            backend
                .execute(
                    howl,
                    PlaybackCommand::Fade {
                        from: 1.0,
                        to: 0.0,
                        duration: Duration::from_secs(2),
                        target: Target::Voice(id),
                    },
                )
                .unwrap();
        }
        drain(&backend);

        backend.advance(Duration::from_secs(1));
        let volume = backend
            .query(howl, PlaybackQuery::Volume(Target::Voice(a)))
            .unwrap()
            .into_f32()
            .unwrap();
        assert_relative_eq!(volume, 0.5, epsilon = 1e-4);

        backend
            .execute(howl, PlaybackCommand::Stop(Target::Voice(b)))
            .unwrap();
        drain(&backend);
        backend.advance(Duration::from_secs(2));
        assert_eq!(drain(&backend), vec![(EventKind::Fade, Some(0))]);
    }

    #[test]
    fn group_commands_skip_ended_voices() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(5));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        play(&mut backend, howl);
        play(&mut backend, howl);
        backend
            .execute(howl, PlaybackCommand::Stop(Target::Voice(VoiceId::new(0))))
            .unwrap();
        drain(&backend);

        backend
            .execute(
                howl,
                PlaybackCommand::Seek {
                    position: Duration::from_secs(2),
                    target: Target::Group,
                },
            )
            .unwrap();
        assert_eq!(drain(&backend), vec![(EventKind::Seek, Some(1))]);
        assert_eq!(
            backend.query(howl, PlaybackQuery::Seek(Target::Voice(VoiceId::new(0)))),
            Ok(QueryValue::Duration(Duration::ZERO))
        );
        assert_eq!(
            backend.query(howl, PlaybackQuery::Seek(Target::Group)),
            Ok(QueryValue::Duration(Duration::from_secs(2)))
        );
    }

    #[test]
    fn infinite_rate_ends_voice_without_panicking() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(5));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        let id = play(&mut backend, howl).unwrap();
        backend
            .execute(
                howl,
                PlaybackCommand::Rate {
                    rate: f32::INFINITY,
                    target: Target::Voice(id),
                },
            )
            .unwrap();
        drain(&backend);

        backend.advance(Duration::from_millis(10));
        assert_eq!(drain(&backend), vec![(EventKind::End, Some(0))]);

        play(&mut backend, howl);
        backend
            .execute(
                howl,
                PlaybackCommand::Rate {
                    rate: f32::NAN,
                    target: Target::Group,
                },
            )
            .unwrap();
        backend.advance(Duration::from_secs(1));
        assert_eq!(
            backend.query(howl, PlaybackQuery::Seek(Target::Group)),
            Ok(QueryValue::Duration(Duration::ZERO))
        );
    }

    #[test]
    fn group_setters_update_defaults_for_new_voices() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(5));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        backend
            .execute(
                howl,
                PlaybackCommand::Rate {
                    rate: 2.0,
                    target: Target::Group,
                },
            )
            .unwrap();
        let id = play(&mut backend, howl).unwrap();
        assert_eq!(
            backend.query(howl, PlaybackQuery::Rate(Target::Voice(id))),
            Ok(QueryValue::Float(2.0))
        );
    }

    #[test]
    fn unknown_voice_is_invalid() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(5));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        let ghost = VoiceId::new(4);
        assert_eq!(
            backend.execute(howl, PlaybackCommand::Pause(Target::Voice(ghost))),
            Err(PetalHowlError::InvalidVoice(ghost))
        );
    }

    #[test]
    fn idle_context_suspends_and_play_resumes_it() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(1));
        let howl = loaded(&mut backend, HowlDesc::new("a.mp3"));
        backend.advance(Duration::from_secs(31));
        assert!(backend.is_suspended());
        play(&mut backend, howl);
        assert!(!backend.is_suspended());

        backend.apply_global(GlobalCommand::AutoSuspend(false));
        backend.advance(Duration::from_secs(5));
        backend.advance(Duration::from_secs(60));
        assert!(!backend.is_suspended());
    }

    #[test]
    fn unlock_only_reaches_loaded_resources() {
        let mut backend = HeadlessBackend::new().with_clip("a.mp3", Duration::from_secs(1));
        loaded(&mut backend, HowlDesc::new("a.mp3"));
        backend.create_resource(&HowlDesc::new("a.mp3")).unwrap();
        drain(&backend);
        backend.unlock();
        assert_eq!(drain(&backend), vec![(EventKind::Unlock, None)]);
    }
}
