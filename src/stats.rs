/// Counters accumulated during a command run, gated by `Config::collect_stats`.
///
/// Nothing in the crate consumes these beyond exposing them; a CLI or metrics
/// pipeline built on top of the crate is the intended consumer.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub objects_read: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub xref_sections_followed: u64,
    pub duplicate_fonts_merged: u64,
    pub duplicate_images_merged: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }
}
