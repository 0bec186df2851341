use anyhow::{Context, Result};
use petalhowl::{
    DistanceModel, EventHandlers, HeadlessBackend, HowlDesc, Listener, LoadState, Orientation,
    PannerAttr, PetalHowlEvent, PetalHowlWorld, PetalHowlWorldDesc, Quat, Sound, Vec3,
};
use std::time::Duration;

const TRACK: &str = "cheeky-buggers.mp3";
const TRACK_LENGTH: Duration = Duration::from_secs(95);

fn mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn world() -> Result<PetalHowlWorld> {
    let backend = HeadlessBackend::new().with_clip(TRACK, TRACK_LENGTH);
    PetalHowlWorld::new(PetalHowlWorldDesc::default(), backend).context("creating world")
}

/// Advances the engine clock one second at a time, delivering events as it goes.
fn run_for(world: &mut PetalHowlWorld, seconds: u64) {
    for _ in 0..seconds {
        world.backend_mut().advance(Duration::from_secs(1));
        for event in world.poll_events() {
            if let PetalHowlEvent::Voice { kind, voice, .. } = &event {
                log::debug!("event {} on voice {}", kind, voice);
            }
        }
    }
}

fn report(sound: &Sound) -> Result<()> {
    log::info!(
        "  seek {} / {}  volume {:.2}  rate {:.2}  stereo {:?}  muted {}",
        mm_ss(sound.seek()?),
        mm_ss(sound.duration()?),
        sound.volume()?,
        sound.rate()?,
        sound.stereo()?,
        sound.muted()?
    );
    Ok(())
}

/// Plays one looping track through a fixed script of transport changes.
pub fn run_transport_session() -> Result<()> {
    let mut world = world()?;

    let handlers = EventHandlers::new()
        .on_load(|| log::info!("loaded"))
        .on_load_error(|_, err| log::error!("{}", err))
        .on_play_error(|_, err| log::error!("{}", err))
        .on_unlock(|| log::info!("unlock"))
        .on_play(|id| log::info!("playing ({})", id))
        .on_pause(|id| log::info!("paused ({})", id))
        .on_stop(|id| log::info!("stopped ({})", id))
        .on_end(|id| log::info!("done ({})", id))
        .on_mute(|_| log::info!("mute"))
        .on_volume(|_| log::info!("volume change"))
        .on_rate(|_| log::info!("rate change"))
        .on_seek(|_| log::info!("seeking"))
        .on_fade(|_| log::info!("fading"))
        .on_stereo(|_| log::info!("panning"));

    let howl = world.create_howl(HowlDesc::new(TRACK).volume(0.5), handlers)?;
    world.poll_events();
    anyhow::ensure!(howl.state() == LoadState::Loaded, "{} did not load", TRACK);
    world.backend_mut().unlock();

    let sound = howl.play();
    sound.set_loop(true)?;
    run_for(&mut world, 5);
    report(&sound)?;

    sound.stop()?;
    run_for(&mut world, 2);
    sound.play();
    run_for(&mut world, 2);

    sound.mute()?;
    run_for(&mut world, 3);
    sound.unmute()?;
    run_for(&mut world, 3);

    sound.pause()?;
    run_for(&mut world, 2);
    sound.play();
    run_for(&mut world, 7);

    sound.set_volume(0.7)?;
    run_for(&mut world, 1);
    sound.set_seek(Duration::from_secs(60))?;
    run_for(&mut world, 3);
    report(&sound)?;

    sound.set_stereo(-1.0)?;
    run_for(&mut world, 3);
    sound.set_stereo(1.0)?;
    run_for(&mut world, 3);
    sound.set_rate(1.5)?;
    sound.fade(0.7, 0.0, Duration::from_secs(4))?;
    run_for(&mut world, 40);
    report(&sound)?;

    sound.stop()?;
    run_for(&mut world, 1);
    log::info!("transport session finished");
    Ok(())
}

/// Moves a source around a listener and swaps panner settings.
pub fn run_spatial_session() -> Result<()> {
    let mut world = world()?;
    let howl = world.create_howl(
        HowlDesc::new(TRACK)
            .looping(true)
            .position(Vec3::new(5.0, 0.0, 0.0))
            .panner(
                PannerAttr::new()
                    .distance_model(DistanceModel::Linear)
                    .max_distance(50.0),
            ),
        EventHandlers::new()
            .on_pos(|id| log::info!("pos change ({})", id))
            .on_orientation(|id| log::info!("orientation change ({})", id)),
    )?;
    world.poll_events();

    let sound = howl.play();
    let listener = Listener::new(Vec3::ZERO, Orientation::default());
    world.mixer_mut().set_listener(listener);

    for step in 0..8 {
        let angle = step as f32 * std::f32::consts::FRAC_PI_4;
        let position = Quat::from_rotation_y(angle) * Vec3::new(5.0, 0.0, 0.0);
        sound.set_position(position)?;
        sound.set_orientation(-position.normalize())?;
        run_for(&mut world, 1);
        log::info!(
            "step {}: source at {:?}, {:.2} from listener",
            step,
            position,
            world.mixer().listener().distance_to(position)
        );
    }

    sound.set_panner_models("exponential", "equalpower")?;
    log::info!("panner now {:?}", sound.panner_attr()?);

    if let Err(e) = sound.set_panner_models("exponential", "binaural") {
        log::warn!("rejected panner model: {}", e);
    }

    world
        .mixer_mut()
        .set_listener_orientation(Orientation::from_rotation(Quat::from_rotation_y(1.0)));
    world.mixer_mut().set_volume(0.8);
    log::info!("mixer: {:?}", world.mixer());

    world.unload_all();
    world.poll_events();
    log::info!("spatial session finished");
    Ok(())
}
