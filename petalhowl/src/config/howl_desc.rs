use crate::error::{PetalHowlError, Result};
use crate::math::Vec3;
use crate::spatial::PannerAttr;
use std::collections::BTreeMap;
use std::time::Duration;

/// A named region of a resource's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sprite {
    pub offset: Duration,
    pub duration: Duration,
    /// Loop the region forever once started.
    pub looping: bool,
}

impl Sprite {
    pub fn new(offset: Duration, duration: Duration, looping: bool) -> Self {
        Self {
            offset,
            duration,
            looping,
        }
    }

    pub fn from_millis(offset_ms: u64, duration_ms: u64, looping: bool) -> Self {
        Self::new(
            Duration::from_millis(offset_ms),
            Duration::from_millis(duration_ms),
            looping,
        )
    }

    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }
}

/// Construction options for a [`Howl`](crate::Howl).
///
/// Everything except the sprite table can be changed later through the playback handles.
/// Sprites are fixed for the lifetime of the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct HowlDesc {
    /// Candidate sources in order of preference; the engine uses the first compatible one.
    pub sources: Vec<String>,
    /// Format hints matched by index against `sources`, for URIs without an extension.
    pub formats: Vec<String>,
    /// 0.0 - 1.0
    pub volume: f32,
    /// 0.5 - 4.0, 1.0 is normal speed.
    pub rate: f32,
    pub looping: bool,
    /// Prefer streaming playback over a fully decoded buffer.
    pub html5: bool,
    pub preload: bool,
    pub autoplay: bool,
    pub muted: bool,
    /// Upper bound on voices the engine keeps for this resource.
    pub pool_size: usize,
    pub sprites: BTreeMap<String, Sprite>,
    /// Stereo pan from -1.0 (left) to 1.0 (right); `None` leaves the source unpanned.
    pub stereo: Option<f32>,
    /// 3D position relative to the listener; `None` leaves the source unspatialized.
    pub position: Option<Vec3>,
    /// Direction the source points in.
    pub orientation: Vec3,
    pub panner: PannerAttr,
}

impl Default for HowlDesc {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            formats: Vec::new(),
            volume: 1.0,
            rate: 1.0,
            looping: false,
            html5: false,
            preload: true,
            autoplay: false,
            muted: false,
            pool_size: 5,
            sprites: BTreeMap::new(),
            stereo: None,
            position: None,
            orientation: Vec3::X,
            panner: PannerAttr::default(),
        }
    }
}

impl HowlDesc {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
            ..Default::default()
        }
    }

    pub fn with_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.formats.push(format.into());
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn html5(mut self, html5: bool) -> Self {
        self.html5 = html5;
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Adds a sprite, replacing any previous sprite with the same name.
    pub fn sprite(mut self, name: impl Into<String>, sprite: Sprite) -> Self {
        self.sprites.insert(name.into(), sprite);
        self
    }

    pub fn stereo(mut self, pan: f32) -> Self {
        self.stereo = Some(pan);
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn orientation(mut self, orientation: Vec3) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn panner(mut self, panner: PannerAttr) -> Self {
        self.panner = panner;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(PetalHowlError::Configuration(
                "at least one source must be given".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(PetalHowlError::Configuration(
                "pool size must be at least 1".into(),
            ));
        }
        // Voice IDs are the pool slot indices.
        if i32::try_from(self.pool_size).is_err() {
            return Err(PetalHowlError::Configuration(format!(
                "pool size {} exceeds the voice ID range",
                self.pool_size
            )));
        }
        Ok(())
    }
}
