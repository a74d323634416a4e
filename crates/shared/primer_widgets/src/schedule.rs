use serde::{Deserialize, Serialize};

/// Generation number of a timed run.
///
/// A host hands the epoch returned by `start`/`set_target` to the timer it
/// spawns, and the timer passes it back on every tick. Once a newer run has
/// begun the old epoch no longer matches and the tick is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct EpochCounter {
    current: u64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every epoch handed out before.
    pub fn advance(&mut self) -> Epoch {
        self.current = self.current.wrapping_add(1);
        Epoch(self.current)
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch.0 == self.current
    }
}
