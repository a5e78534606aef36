//! Glue between runs and persistence. Storage errors are logged and
//! swallowed; play continues with the in-memory state.

use tracing::{debug, warn};

use super::config::GameConfig;
use super::error::GameError;
use super::events::RunResult;
use super::unlocks::{UnlockState, UnlockStore};
use super::{Mode, Run};

pub struct Session<S: UnlockStore> {
    store: S,
    pub config: GameConfig,
    unlocks: UnlockState,
    run: Option<Run>,
    last_result: Option<RunResult>,
}

impl<S: UnlockStore> Session<S> {
    pub fn new(config: GameConfig, store: S) -> Self {
        let mut session = Self {
            store,
            config,
            unlocks: UnlockState::default(),
            run: None,
            last_result: None,
        };
        session.reload();
        session
    }

    fn reload(&mut self) {
        match self.store.load() {
            Ok(state) => self.unlocks = state,
            Err(err) => warn!(%err, "unlock state unavailable, keeping in-memory copy"),
        }
    }

    pub fn unlocks(&self) -> UnlockState {
        self.unlocks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Begin a new run, replacing any previous one. Infinite mode must be unlocked.
    pub fn start(
        &mut self,
        mode: Mode,
        now: f64,
        width: f64,
        height: f64,
        seed: u64,
    ) -> Result<&mut Run, GameError> {
        self.reload();
        if mode == Mode::Infinite && !self.unlocks.infinite {
            return Err(GameError::InfiniteLocked);
        }
        self.last_result = None;
        let run = Run::new(self.config.clone(), mode, self.unlocks, now, width, height, seed);
        Ok(self.run.insert(run))
    }

    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn run_mut(&mut self) -> Result<&mut Run, GameError> {
        self.run.as_mut().ok_or(GameError::NoRun)
    }

    /// Advance the current run and persist anything it earned.
    pub fn tick(&mut self, ts: f64) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.tick(ts);
        let changes = run.take_unlock_changes();
        let result = run.result();
        if let Some(state) = changes {
            self.unlocks = state;
            match self.store.save(&state) {
                Ok(()) => debug!(?state, "unlocks saved"),
                Err(err) => warn!(%err, "could not persist unlocks"),
            }
        }
        if result.is_some() && self.last_result.is_none() {
            self.last_result = result;
        }
    }

    /// The terminal result of the latest run, handed out once.
    pub fn take_result(&mut self) -> Option<RunResult> {
        self.last_result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::Outcome;
    use crate::game::unlocks::MemoryStore;

    fn session(store: MemoryStore) -> Session<MemoryStore> {
        let mut c = GameConfig::default();
        c.bomb.spawn.enabled = false;
        Session::new(c, store)
    }

    #[test]
    fn load_failure_falls_back_to_defaults() {
        let s = session(MemoryStore { fail: true, ..Default::default() });
        assert_eq!(s.unlocks(), UnlockState::default());
    }

    #[test]
    fn infinite_requires_unlock() {
        let mut s = session(MemoryStore::default());
        assert!(matches!(
            s.start(Mode::Infinite, 0.0, 800.0, 600.0, 1),
            Err(GameError::InfiniteLocked)
        ));
        let mut s = session(MemoryStore::with_state(UnlockState { infinite: true, ..Default::default() }));
        assert!(s.start(Mode::Infinite, 0.0, 800.0, 600.0, 1).is_ok());
    }

    #[test]
    fn tick_without_run_is_harmless() {
        let mut s = session(MemoryStore::default());
        s.tick(16.0);
        assert!(matches!(s.run_mut(), Err(GameError::NoRun)));
    }

    #[test]
    fn save_failure_does_not_stop_play() {
        let mut s = session(MemoryStore::default());
        s.start(Mode::Standard, 0.0, 800.0, 600.0, 1).unwrap();
        s.store.fail = true;
        s.run_mut().unwrap().score = 500;
        s.tick(16.0);
        assert!(s.unlocks().sticky);
        assert!(s.run().is_some_and(|r| r.is_running()));
        assert_eq!(s.store().saves, 0);
    }

    #[test]
    fn defeat_result_is_handed_out_once() {
        let mut s = session(MemoryStore::with_state(UnlockState { high_score: 3, ..Default::default() }));
        let run = s.start(Mode::Standard, 0.0, 800.0, 600.0, 1).unwrap();
        run.score = 9;
        run.lives = 0;
        s.tick(16.0);
        let r = s.take_result().unwrap();
        assert_eq!(r.outcome, Outcome::Defeat);
        assert!(!r.new_high_score);
        assert!(s.take_result().is_none());
        assert_eq!(s.store().state.high_score, 3);
    }
}
