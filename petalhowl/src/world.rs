use crate::backend::{AudioBackend, GlobalCommand, HeadlessBackend, SharedBackend};
use crate::config::{HowlDesc, PetalHowlWorldDesc};
use crate::error::Result;
use crate::events::{EventBridge, EventHandlers, PetalHowlEvent};
use crate::howl::{Howl, HowlShared};
use crate::mixer::Mixer;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Context object that owns the engine, the global mixer and the event bridge.
///
/// `PetalHowlWorld` is the central API for PetalHowl. Everything runs on the thread that owns
/// the world: control calls return immediately and asynchronous outcomes (load results,
/// voice ends, finished fades) are delivered when [`PetalHowlWorld::poll_events`] is called.
///
/// # Architecture
///
/// - **World**: creates resources, registers their handlers, pumps notifications
/// - **Engine**: any [`AudioBackend`]; decodes, mixes and owns the voice pools
/// - **Handles**: [`Howl`] and [`Sound`](crate::Sound) talk to the engine directly
///
/// Worlds are independent: two worlds never share mixer state, which keeps tests isolated.
pub struct PetalHowlWorld<B: AudioBackend + 'static = HeadlessBackend> {
    desc: PetalHowlWorldDesc,
    backend: Rc<RefCell<B>>,
    mixer: Mixer,
    bridge: EventBridge,
}

impl<B: AudioBackend + 'static> PetalHowlWorld<B> {
    /// Creates a world around `backend` and applies the mixer defaults from `desc`.
    pub fn new(desc: PetalHowlWorldDesc, backend: B) -> Result<Self> {
        let backend = Rc::new(RefCell::new(backend));
        let shared: SharedBackend = backend.clone();
        let receiver = backend.borrow().notifications();
        let mixer = Mixer::new(shared, &desc);

        log::info!(
            "PetalHowl world created (volume {}, auto-suspend {})",
            desc.master_volume,
            desc.auto_suspend
        );

        Ok(Self {
            desc,
            backend,
            mixer,
            bridge: EventBridge::new(receiver),
        })
    }

    pub fn desc(&self) -> &PetalHowlWorldDesc {
        &self.desc
    }

    /// Creates a resource and registers its event handlers.
    ///
    /// With `preload` set (the default) loading starts right away and the resource is
    /// `Loading` when this returns.
    ///
    /// # Arguments
    ///
    /// * `desc` - Sources, defaults and sprite table of the resource
    /// * `handlers` - Callbacks for this resource; they cannot be changed later
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `desc` fails validation, or the engine's error if it
    /// rejects the resource.
    pub fn create_howl(&mut self, desc: HowlDesc, handlers: EventHandlers) -> Result<Howl> {
        desc.validate()?;

        let id = self.backend.borrow_mut().create_resource(&desc)?;
        let preload = desc.preload;
        let shared = Rc::new(HowlShared::new(id, desc));
        self.bridge.register(shared.clone(), handlers);

        let backend: SharedBackend = self.backend.clone();
        let howl = Howl::new(shared, backend);
        if preload {
            howl.load()?;
        }
        Ok(howl)
    }

    /// Delivers every notification the engine has posted so far.
    ///
    /// Notifications are dispatched in the order the engine posted them. Each one updates
    /// the resource's load state where relevant, runs the matching handler, and is returned
    /// as a typed event. Handlers may freely call back into resources and sounds.
    pub fn poll_events(&mut self) -> Vec<PetalHowlEvent> {
        self.bridge.pump()
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    /// Unloads every resource: all voices stop and every resource returns to `Unloaded`.
    pub fn unload_all(&mut self) {
        self.backend
            .borrow_mut()
            .apply_global(GlobalCommand::UnloadAll);
        for howl in self.bridge.howls() {
            howl.reset();
        }
        log::info!("All resources unloaded");
    }

    /// Direct access to the engine, e.g. to drive a [`HeadlessBackend`]'s clock.
    pub fn backend(&self) -> Ref<'_, B> {
        self.backend.borrow()
    }

    pub fn backend_mut(&self) -> RefMut<'_, B> {
        self.backend.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sprite;
    use crate::error::PetalHowlError;
    use crate::events::EventKind;
    use crate::howl::LoadState;
    use crate::math::Vec3;
    use crate::playback::{Sound, VoiceId};
    use crate::spatial::{DistanceModel, PannerAttr, PanningModel};
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn world() -> PetalHowlWorld {
        init_logger();
        let backend = HeadlessBackend::new()
            .with_clip("sound.mp3", Duration::from_secs(60))
            .with_clip("sfx.webm", Duration::from_secs(10));
        PetalHowlWorld::new(PetalHowlWorldDesc::default(), backend).unwrap()
    }

    fn loaded(world: &mut PetalHowlWorld, desc: HowlDesc) -> Howl {
        let howl = world.create_howl(desc, EventHandlers::new()).unwrap();
        world.poll_events();
        assert_eq!(howl.state(), LoadState::Loaded);
        howl
    }

    #[test]
    fn unknown_sprite_creates_no_voice() {
        let mut world = world();
        let howl = loaded(
            &mut world,
            HowlDesc::new("sfx.webm").sprite("a", Sprite::from_millis(0, 1000, false)),
        );

        let err = howl.group().play_sprite("b").unwrap_err();
        assert_eq!(err, PetalHowlError::SpriteNotFound("b".into()));
        assert_eq!(world.backend().voice_count(howl.id()), 0);
        assert!(world.poll_events().is_empty());

        let sprite = howl.group().play_sprite("a").unwrap();
        assert_eq!(sprite.duration(), Ok(Duration::from_secs(1)));
        assert_eq!(world.backend().voice_count(howl.id()), 1);
    }

    #[test]
    fn sprite_names_are_case_sensitive() {
        let mut world = world();
        let howl = loaded(
            &mut world,
            HowlDesc::new("sfx.webm").sprite("blast", Sprite::from_millis(0, 500, false)),
        );
        assert!(howl.play_sprite("Blast").is_err());
    }

    #[test]
    fn pool_exhaustion_returns_sentinel() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3").pool_size(3));
        let group = howl.group();

        let ids: Vec<VoiceId> = (0..3).map(|_| group.play().id().unwrap()).collect();
        assert!(ids.iter().all(VoiceId::is_valid));
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);

        let refused = group.play();
        assert_eq!(refused.id(), Some(VoiceId::INVALID));
        assert!(!refused.is_valid());
        assert_eq!(
            refused.set_volume(0.5),
            Err(PetalHowlError::InvalidVoice(VoiceId::INVALID))
        );
        assert_eq!(group.try_play(), Err(PetalHowlError::PoolExhausted));
    }

    #[test]
    fn instance_volume_does_not_leak_to_siblings() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let a = howl.play();
        let b = howl.play();

        a.set_volume(0.3).unwrap();
        assert_relative_eq!(a.volume().unwrap(), 0.3, epsilon = 1e-6);
        assert_relative_eq!(b.volume().unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn group_loop_reaches_every_instance() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let a = howl.play();
        let b = howl.play();

        b.set_loop(true).unwrap();
        assert_eq!(b.looping(), Ok(true));
        assert_eq!(a.looping(), Ok(false));

        howl.group().set_loop(true).unwrap();
        assert_eq!(a.looping(), Ok(true));
        assert_eq!(b.looping(), Ok(true));
        assert_eq!(howl.group().looping(), Ok(true));
    }

    #[test]
    fn load_state_sequence_restarts_after_unload() {
        let mut world = world();
        let loads = Rc::new(RefCell::new(0));
        let counter = loads.clone();
        let howl = world
            .create_howl(
                HowlDesc::new("sound.mp3").preload(false),
                EventHandlers::new().on_load(move || *counter.borrow_mut() += 1),
            )
            .unwrap();
        assert_eq!(howl.state(), LoadState::Unloaded);

        for round in 1..=2 {
            howl.load().unwrap();
            assert_eq!(howl.state(), LoadState::Loading);
            howl.load().unwrap();
            world.poll_events();
            assert_eq!(howl.state(), LoadState::Loaded);
            assert_eq!(*loads.borrow(), round);

            howl.unload().unwrap();
            howl.unload().unwrap();
            assert_eq!(howl.state(), LoadState::Unloaded);
        }
    }

    #[test]
    fn failed_load_reports_through_callback() {
        let mut world = world();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let howl = world
            .create_howl(
                HowlDesc::with_sources(["missing.mp3", "track.xm"]),
                EventHandlers::new().on_load_error(move |voice, err| {
                    sink.borrow_mut().push((voice, err));
                }),
            )
            .unwrap();
        world.poll_events();

        assert_eq!(howl.state(), LoadState::Unloaded);
        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], (None, PetalHowlError::LoadFailed(_))));
    }

    #[test]
    fn stop_rewinds_and_fires_one_stop() {
        let mut world = world();
        let stops = Rc::new(RefCell::new(Vec::new()));
        let sink = stops.clone();
        let howl = world
            .create_howl(
                HowlDesc::new("sound.mp3"),
                EventHandlers::new().on_stop(move |id| sink.borrow_mut().push(id)),
            )
            .unwrap();
        world.poll_events();

        let sound = howl.play();
        world.backend_mut().advance(Duration::from_secs(5));
        assert!(sound.seek().unwrap() > Duration::ZERO);

        sound.stop().unwrap();
        world.poll_events();
        assert_eq!(sound.seek(), Ok(Duration::ZERO));
        assert_eq!(*stops.borrow(), vec![sound.id().unwrap()]);
    }

    #[test]
    fn seek_reports_what_was_set() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let sound = howl.play();
        sound.set_seek(Duration::from_secs(30)).unwrap();

        let seek = sound.seek().unwrap();
        assert!((seek.as_secs_f64() - 30.0).abs() < 0.1);
    }

    #[test]
    fn recycled_voice_invalidates_old_instance() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3").pool_size(1));
        let first = howl.play();
        first.stop().unwrap();

        let second = howl.play();
        assert_eq!(first.id(), second.id());
        assert!(second.is_valid());
        assert!(!first.is_valid());
        assert_eq!(
            first.pause(),
            Err(PetalHowlError::InvalidVoice(first.id().unwrap()))
        );

        // Restarting a stale instance is a no-op, not an error.
        second.pause().unwrap();
        let replayed = first.play();
        assert_eq!(replayed, first);
        assert_eq!(second.playing(), Ok(false));
    }

    #[test]
    fn instance_play_restarts_same_voice() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let sound = howl.play();
        sound.pause().unwrap();
        assert_eq!(sound.playing(), Ok(false));

        let again = sound.play();
        assert_eq!(again.id(), sound.id());
        assert_eq!(sound.playing(), Ok(true));
        assert_eq!(world.backend().voice_count(howl.id()), 1);
    }

    #[test]
    fn handlers_can_call_back_into_sounds() {
        let mut world = world();
        let holder: Rc<RefCell<Option<Sound>>> = Rc::new(RefCell::new(None));
        let inner = holder.clone();
        let howl = world
            .create_howl(
                HowlDesc::new("sfx.webm"),
                EventHandlers::new().on_play(move |_| {
                    if let Some(sound) = inner.borrow().as_ref() {
                        sound.set_volume(0.1).unwrap();
                    }
                }),
            )
            .unwrap();
        world.poll_events();

        let sound = howl.play();
        *holder.borrow_mut() = Some(sound.clone());
        let events = world.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Play);
        assert_relative_eq!(sound.volume().unwrap(), 0.1);
    }

    #[test]
    fn unload_all_resets_every_resource() {
        let mut world = world();
        let a = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let b = loaded(&mut world, HowlDesc::new("sfx.webm"));
        let voice = a.play();
        b.play();

        world.unload_all();
        assert_eq!(a.state(), LoadState::Unloaded);
        assert_eq!(b.state(), LoadState::Unloaded);
        assert!(!voice.is_valid());

        let stops = world
            .poll_events()
            .into_iter()
            .filter(|e| e.kind() == EventKind::Stop)
            .count();
        assert_eq!(stops, 2);
    }

    #[test]
    fn global_stereo_pans_existing_voices() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let sound = howl.play();
        world.mixer_mut().set_stereo(-0.5);

        assert_eq!(sound.stereo(), Ok(Some(-0.5)));
        assert_eq!(world.mixer().stereo(), Some(-0.5));
        assert_eq!(world.backend().stereo(), Some(-0.5));
    }

    #[test]
    fn panner_models_can_be_switched_by_name() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let sound = howl.play();

        sound.set_panner_models("linear", "equalpower").unwrap();
        let attr = sound.panner_attr().unwrap();
        assert_eq!(attr.distance_model.as_str(), "linear");
        assert_eq!(attr.panning_model.as_str(), "equalpower");

        assert!(matches!(
            sound.set_panner_models("linear", "binaural"),
            Err(PetalHowlError::InvalidEnumValue { .. })
        ));
        assert_eq!(sound.panner_attr(), Ok(attr));
    }

    #[test]
    fn group_duration_is_zero_until_loaded() {
        let mut world = world();
        let howl = world
            .create_howl(HowlDesc::new("sound.mp3").preload(false), EventHandlers::new())
            .unwrap();
        assert_eq!(howl.group().duration(), Ok(Duration::ZERO));
        howl.load().unwrap();
        assert_eq!(howl.group().duration(), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn playing_unloaded_resource_starts_loading() {
        let mut world = world();
        let howl = world
            .create_howl(HowlDesc::new("sound.mp3").preload(false), EventHandlers::new())
            .unwrap();
        let sound = howl.play();
        assert!(sound.is_valid());
        assert_eq!(howl.state(), LoadState::Loading);
        world.poll_events();
        assert_eq!(howl.state(), LoadState::Loaded);
    }

    fn recorder() -> (Rc<RefCell<Vec<VoiceId>>>, impl FnMut(VoiceId) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |id| sink.borrow_mut().push(id))
    }

    #[test]
    fn group_getters_skip_stopped_voices() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let group = howl.group();
        let a = howl.play();
        let b = howl.play();
        a.set_volume(0.2).unwrap();
        b.set_volume(0.9).unwrap();

        a.stop().unwrap();
        assert_eq!(a.playing(), Ok(false));
        assert_relative_eq!(group.volume().unwrap(), 0.9, epsilon = 1e-6);

        b.stop().unwrap();
        assert_relative_eq!(group.volume().unwrap(), 1.0, epsilon = 1e-6);
        assert_eq!(group.seek(), Ok(Duration::ZERO));
    }

    #[test]
    fn group_setters_leave_stopped_voices_alone() {
        let mut world = world();
        let (volumes, on_volume) = recorder();
        let howl = world
            .create_howl(
                HowlDesc::new("sound.mp3"),
                EventHandlers::new().on_volume(on_volume),
            )
            .unwrap();
        let group = howl.group();
        let a = howl.play();
        let b = howl.play();
        a.set_volume(0.2).unwrap();
        a.stop().unwrap();
        world.poll_events();
        volumes.borrow_mut().clear();

        group.set_volume(0.5).unwrap();
        world.poll_events();
        assert_eq!(*volumes.borrow(), vec![b.id().unwrap()]);
        assert_relative_eq!(a.volume().unwrap(), 0.2, epsilon = 1e-6);
        assert_relative_eq!(b.volume().unwrap(), 0.5, epsilon = 1e-6);

        // New voices pick up the group value.
        let c = howl.play();
        assert_relative_eq!(c.volume().unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn group_panner_models_keep_per_voice_attributes() {
        let mut world = world();
        let howl = loaded(&mut world, HowlDesc::new("sound.mp3"));
        let a = howl.play();
        let b = howl.play();
        a.set_panner_attr(PannerAttr::new().max_distance(5.0))
            .unwrap();
        b.set_panner_attr(
            PannerAttr::new()
                .max_distance(50.0)
                .panning_model(PanningModel::EqualPower),
        )
        .unwrap();

        howl.group().set_panner_models("linear", "HRTF").unwrap();

        let a_attr = a.panner_attr().unwrap();
        let b_attr = b.panner_attr().unwrap();
        assert_eq!(a_attr.max_distance, 5.0);
        assert_eq!(b_attr.max_distance, 50.0);
        for attr in [a_attr, b_attr] {
            assert_eq!(attr.distance_model, DistanceModel::Linear);
            assert_eq!(attr.panning_model, PanningModel::Hrtf);
        }
    }

    #[test]
    fn spatial_mute_and_rate_setters_round_trip() {
        let mut world = world();
        let (mutes, on_mute) = recorder();
        let howl = world
            .create_howl(HowlDesc::new("sound.mp3"), EventHandlers::new().on_mute(on_mute))
            .unwrap();
        let sound = howl.play();
        assert_eq!(sound.position(), Ok(None));

        sound.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(sound.position(), Ok(Some(Vec3::new(1.0, 2.0, 3.0))));

        assert_eq!(sound.orientation(), Ok(Vec3::X));
        sound.set_orientation(Vec3::NEG_Z).unwrap();
        assert_eq!(sound.orientation(), Ok(Vec3::NEG_Z));

        sound.mute().unwrap();
        assert_eq!(sound.muted(), Ok(true));
        world.poll_events();
        assert_eq!(*mutes.borrow(), vec![sound.id().unwrap()]);
        sound.unmute().unwrap();
        assert_eq!(sound.muted(), Ok(false));

        sound.set_rate(1.5).unwrap();
        assert_relative_eq!(sound.rate().unwrap(), 1.5);
        assert!(matches!(
            sound.set_rate(f32::INFINITY),
            Err(PetalHowlError::Configuration(_))
        ));
        assert_relative_eq!(sound.rate().unwrap(), 1.5);
    }

    #[test]
    fn fade_is_reported_through_on_fade() {
        let mut world = world();
        let (fades, on_fade) = recorder();
        let howl = world
            .create_howl(HowlDesc::new("sound.mp3"), EventHandlers::new().on_fade(on_fade))
            .unwrap();
        let sound = howl.play();
        sound.fade(1.0, 0.2, Duration::from_secs(2)).unwrap();

        world.backend_mut().advance(Duration::from_secs(1));
        world.poll_events();
        assert!(fades.borrow().is_empty());

        world.backend_mut().advance(Duration::from_secs(1));
        world.poll_events();
        assert_eq!(*fades.borrow(), vec![sound.id().unwrap()]);
        assert_relative_eq!(sound.volume().unwrap(), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn autoplay_starts_a_voice_once_loaded() {
        let mut world = world();
        let (plays, on_play) = recorder();
        let howl = world
            .create_howl(
                HowlDesc::new("sound.mp3").autoplay(true),
                EventHandlers::new().on_play(on_play),
            )
            .unwrap();

        let kinds: Vec<EventKind> = world.poll_events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Load, EventKind::Play]);
        assert_eq!(*plays.borrow(), vec![VoiceId::new(0)]);
        assert_eq!(howl.group().playing(), Ok(true));
        assert_eq!(world.backend().voice_count(howl.id()), 1);
    }

    #[test]
    fn unlock_reaches_on_unlock() {
        let mut world = world();
        let unlocks = Rc::new(RefCell::new(0));
        let counter = unlocks.clone();
        loaded(&mut world, HowlDesc::new("sound.mp3"));
        let howl = world
            .create_howl(
                HowlDesc::new("sfx.webm"),
                EventHandlers::new().on_unlock(move || *counter.borrow_mut() += 1),
            )
            .unwrap();
        world.poll_events();
        assert_eq!(howl.state(), LoadState::Loaded);

        world.backend_mut().unlock();
        let events = world.poll_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind() == EventKind::Unlock));
        assert_eq!(*unlocks.borrow(), 1);
    }
}
