use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use citybikes_core::TileIndex;

/// Slot holding the tile index currently being served.
///
/// Readers take a snapshot with [`LiveIndex::load`] and keep it for the whole
/// request; the writer replaces the slot wholesale, so a reader sees either
/// the previous index or the new one.
#[derive(Clone)]
pub struct LiveIndex {
    slot: Arc<ArcSwapOption<TileIndex>>,
}

impl LiveIndex {
    pub fn new() -> Self {
        LiveIndex {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// `None` until the first successful refresh.
    pub fn load(&self) -> Option<Arc<TileIndex>> {
        self.slot.load_full()
    }

    /// Publish a new index and return the one it replaces.
    pub fn replace(&self, index: TileIndex) -> Option<Arc<TileIndex>> {
        self.slot.swap(Some(Arc::new(index)))
    }

    pub fn is_ready(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl Default for LiveIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveIndex")
            .field("ready", &self.is_ready())
            .finish()
    }
}
