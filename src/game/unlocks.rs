//! Persistent progression: high score plus three unlock flags.
//!
//! The simulation never touches storage. A [`Run`](super::Run) records what it
//! earned; the [`Session`](super::session::Session) writes it through an
//! [`UnlockStore`].

use serde::{Deserialize, Serialize};

use super::error::GameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Unlock {
    Infinite,
    Soundwave,
    Sticky,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnlockState {
    pub high_score: u32,
    pub infinite: bool,
    pub soundwave: bool,
    pub sticky: bool,
}

impl UnlockState {
    pub fn has(&self, unlock: Unlock) -> bool {
        match unlock {
            Unlock::Infinite => self.infinite,
            Unlock::Soundwave => self.soundwave,
            Unlock::Sticky => self.sticky,
        }
    }

    /// Sticky is available through its own flag or through the infinite unlock.
    pub fn sticky_unlocked(&self) -> bool {
        self.sticky || self.infinite
    }

    /// Set the flag; true only when it was previously clear.
    pub fn grant(&mut self, unlock: Unlock) -> bool {
        let flag = match unlock {
            Unlock::Infinite => &mut self.infinite,
            Unlock::Soundwave => &mut self.soundwave,
            Unlock::Sticky => &mut self.sticky,
        };
        !std::mem::replace(flag, true)
    }

    /// Raise the high score; true when `score` beat it.
    pub fn record_score(&mut self, score: u32) -> bool {
        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }
}

/// Backing store for [`UnlockState`]. Implementations may fail; callers treat
/// failures as "keep playing in memory".
pub trait UnlockStore {
    fn load(&mut self) -> Result<UnlockState, GameError>;
    fn save(&mut self, state: &UnlockState) -> Result<(), GameError>;
}

/// In-process store used by tests and as a fallback when no browser storage exists.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub state: UnlockState,
    pub saves: usize,
    pub fail: bool, // force every call to error
}

impl MemoryStore {
    pub fn with_state(state: UnlockState) -> Self {
        Self { state, ..Self::default() }
    }
}

impl UnlockStore for MemoryStore {
    fn load(&mut self) -> Result<UnlockState, GameError> {
        if self.fail {
            return Err(GameError::Storage("memory store set to fail".into()));
        }
        Ok(self.state)
    }

    fn save(&mut self, state: &UnlockState) -> Result<(), GameError> {
        if self.fail {
            return Err(GameError::Storage("memory store set to fail".into()));
        }
        self.state = *state;
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_reports_only_new_flags() {
        let mut s = UnlockState::default();
        assert!(s.grant(Unlock::Sticky));
        assert!(!s.grant(Unlock::Sticky));
        assert!(s.has(Unlock::Sticky));
        assert!(!s.has(Unlock::Infinite));
    }

    #[test]
    fn infinite_implies_sticky() {
        assert!(!UnlockState::default().sticky_unlocked());
        assert!(UnlockState { infinite: true, ..Default::default() }.sticky_unlocked());
        assert!(UnlockState { sticky: true, ..Default::default() }.sticky_unlocked());
    }

    #[test]
    fn high_score_only_rises() {
        let mut s = UnlockState { high_score: 40, ..Default::default() };
        assert!(!s.record_score(40));
        assert!(s.record_score(41));
        assert_eq!(s.high_score, 41);
    }

    #[test]
    fn failing_store_errors() {
        let mut store = MemoryStore { fail: true, ..Default::default() };
        assert!(store.load().is_err());
        assert!(store.save(&UnlockState::default()).is_err());
        assert_eq!(store.saves, 0);
    }
}
