//! Spatial parameter model: the global listener and per-source panner attributes.
//!
//! The two sets are deliberately separate types. The listener is mutated only through
//! [`Mixer`](crate::Mixer); panner attributes travel with a resource or a single voice.

mod listener;
mod panner;

pub use listener::Listener;
pub use panner::{DistanceModel, PannerAttr, PanningModel};
