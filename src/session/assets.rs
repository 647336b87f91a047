//! Live-session counts per underlying game

use std::collections::HashMap;

use crate::game::GameKey;

/// How many live sessions use each game's staged assets
#[derive(Debug, Default)]
pub struct AssetRefCount {
    counts: HashMap<GameKey, u32>,
}

impl AssetRefCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, key: GameKey) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Returns the new count
    pub fn acquire(&mut self, key: GameKey) -> u32 {
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    /// Returns the new count, or None if the key was not held.
    /// A key reaching zero is forgotten.
    pub fn release(&mut self, key: GameKey) -> Option<u32> {
        let count = self.counts.get_mut(&key)?;
        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(&key);
        }
        Some(remaining)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
