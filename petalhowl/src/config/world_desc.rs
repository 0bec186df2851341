/// Configuration descriptor for a PetalHowl world and its mixer.
#[derive(Debug, Clone, PartialEq)]
pub struct PetalHowlWorldDesc {
    /// Master volume applied on top of every resource (0.0 - 1.0).
    pub master_volume: f32,
    pub muted: bool,
    /// Let the engine suspend its audio context after ~30s of silence.
    pub auto_suspend: bool,
    /// Number of streaming players the engine keeps unlocked for reuse.
    pub html5_pool_size: usize,
}

impl Default for PetalHowlWorldDesc {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            muted: false,
            auto_suspend: true,
            html5_pool_size: 10,
        }
    }
}
