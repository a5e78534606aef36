//! Simulation core. [`Run`] is the single context object for one play-through;
//! the subsystem files extend it with `impl Run` blocks.
//!
//! Time is the host's monotonic millisecond clock (`performance.now()` in the
//! browser). Speeds are px per second; `Run::tick` converts the frame delta.

pub mod boss;
pub mod collision;
pub mod config;
pub mod difficulty;
pub mod entity;
pub mod error;
pub mod events;
pub mod powerups;
pub mod session;
pub mod spawn;
pub mod unlocks;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use boss::{Boss, BossPhase};
use config::GameConfig;
use entity::{Entity, EntityId, EntityKind, PowerUpKind, Rect, SpawnKind};
use events::{Cue, GameEvent, Outcome, RunResult};
use powerups::{AimState, EffectQueue, SlowMo, Timed};
use spawn::SpawnTimer;
use unlocks::{Unlock, UnlockState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Standard,
    Infinite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Ended(RunResult),
    Exited,
}

/// Read-only view for the HUD.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hud {
    pub mode: Mode,
    pub score: u32,
    pub high_score: u32,
    pub lives: u32,
    pub max_lives: u32,
    pub boss_line: Option<String>,
    pub effects: Vec<(&'static str, f64)>, // tag, seconds left
}

pub struct Run {
    pub config: GameConfig,
    pub mode: Mode,
    pub state: RunState,
    pub unlocks: UnlockState,
    unlocks_dirty: bool,

    pub width: f64,
    pub height: f64,
    pub score: u32,
    pub lives: u32,
    pub life_ever_lost: bool,
    pub paddle_x: f64,
    pub entities: Vec<Entity>,
    next_id: EntityId,

    pub boss: Boss,
    pub shield: Timed,
    pub slow_mo: SlowMo,
    pub sticky: Timed,
    sticky_x: f64,
    pub aim: AimState,
    effects: EffectQueue,

    timers: [SpawnTimer; 6],
    spawn_interval: f64, // normal blocks
    last_normal_spawn: f64,
    last_life_score: u32,

    started_at: f64,
    last_ts: f64,
    /// Effective seconds simulated by the most recent tick.
    pub last_dt: f64,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Run {
    pub fn new(
        config: GameConfig,
        mode: Mode,
        unlocks: UnlockState,
        now: f64,
        width: f64,
        height: f64,
        seed: u64,
    ) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        let timers = SpawnKind::ALL.map(|k| {
            let sched = spawn::schedule_for(&config, k);
            SpawnTimer::new(now, sched.initial_delay_ms)
        });
        let d = &config.difficulty;
        let paddle_x = (width - d.paddle_width) / 2.0;
        let lives = d.lives;
        let spawn_interval = d.base_spawn_interval_ms;
        let boss = Boss::new(&config.boss);
        info!(?mode, width, height, "run started");
        let mut run = Self {
            config,
            mode,
            state: RunState::Running,
            unlocks,
            unlocks_dirty: false,
            width,
            height,
            score: 0,
            lives,
            life_ever_lost: false,
            paddle_x,
            entities: Vec::new(),
            next_id: 1,
            boss,
            shield: Timed::default(),
            slow_mo: SlowMo::default(),
            sticky: Timed::default(),
            sticky_x: paddle_x,
            aim: AimState::Closed,
            effects: EffectQueue::default(),
            timers,
            spawn_interval,
            last_normal_spawn: now,
            last_life_score: 0,
            started_at: now,
            last_ts: now,
            last_dt: 0.0,
            events: Vec::new(),
            rng,
        };
        run.paddle_x = run.clamp_paddle(paddle_x);
        run
    }

    // --- Frame ---------------------------------------------------------------

    /// Advance one frame at host timestamp `ts` (ms).
    pub fn tick(&mut self, ts: f64) {
        if self.state != RunState::Running {
            return;
        }
        let raw_ms = (ts - self.last_ts).clamp(0.0, self.config.field.max_step_ms.max(0.0));
        self.last_ts = ts;
        let factor = self.slow_mo.factor(ts);
        self.last_dt = raw_ms / 1000.0 * factor;

        self.check_score_unlocks();
        self.maybe_start_boss(ts);

        match self.boss.phase {
            BossPhase::Active { .. } => self.update_boss(ts),
            BossPhase::Dying { .. } => self.update_boss_death(ts),
            BossPhase::Dormant | BossPhase::Resolved => {
                if !self.aim.is_open() {
                    self.run_spawners(ts);
                    self.maybe_spawn_normal(ts);
                }
            }
        }
        self.check_aim_timeout(ts);
        if self.state != RunState::Running {
            return;
        }

        self.expire_effects(ts);
        self.run_due_effects(ts);

        let dt = self.last_dt;
        for e in &mut self.entities {
            e.advance(dt);
        }
        self.apply_sticky_lock();

        if !self.boss.is_dying() && !self.aim.is_open() {
            self.resolve_paddle(ts);
        }
        self.sweep(ts);

        if self.lives == 0 {
            self.finish(false, ts);
        }
    }

    // --- Input ---------------------------------------------------------------

    pub fn paddle_y(&self) -> f64 {
        self.height - self.config.field.paddle_bottom_offset
    }

    pub fn paddle_rect(&self) -> Rect {
        let d = &self.config.difficulty;
        Rect::new(self.paddle_x, self.paddle_y(), d.paddle_width, d.paddle_height)
    }

    fn clamp_paddle(&self, x: f64) -> f64 {
        let d = &self.config.difficulty;
        x.min(self.width - d.paddle_edge_margin - d.paddle_width)
            .max(d.paddle_edge_margin)
    }

    /// Pointer control: centre the paddle on `x`. Ignored while sticky-locked.
    pub fn set_paddle_target(&mut self, x: f64) {
        if self.sticky.is_active() || self.aim.is_open() {
            return;
        }
        self.paddle_x = self.clamp_paddle(x - self.config.difficulty.paddle_width / 2.0);
    }

    /// Keyboard control: `direction` is -1.0 (left) or 1.0 (right).
    pub fn nudge_paddle(&mut self, direction: f64) {
        if self.sticky.is_active() || self.aim.is_open() {
            return;
        }
        let step = self.config.difficulty.paddle_nudge * direction.signum();
        self.paddle_x = self.clamp_paddle(self.paddle_x + step);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.paddle_x = self.clamp_paddle(self.paddle_x);
        self.sticky_x = self.clamp_paddle(self.sticky_x);
    }

    /// Returns false when pausing is not allowed right now.
    pub fn pause(&mut self) -> bool {
        if self.state != RunState::Running || self.aim.is_open() || self.boss.is_dying() {
            return false;
        }
        self.state = RunState::Paused;
        debug!("paused");
        true
    }

    /// Resume with a fresh delta baseline so paused time is never simulated.
    pub fn resume(&mut self, now: f64) {
        if self.state == RunState::Paused {
            self.state = RunState::Running;
            self.last_ts = now;
            debug!("resumed");
        }
    }

    pub fn exit(&mut self) {
        if matches!(self.state, RunState::Running | RunState::Paused) {
            self.state = RunState::Exited;
            self.effects.clear();
            info!(score = self.score, "run exited");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn result(&self) -> Option<RunResult> {
        match self.state {
            RunState::Ended(r) => Some(r),
            _ => None,
        }
    }

    // --- Outputs -------------------------------------------------------------

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// The unlock state if anything changed since the last call.
    pub fn take_unlock_changes(&mut self) -> Option<UnlockState> {
        if std::mem::take(&mut self.unlocks_dirty) {
            Some(self.unlocks)
        } else {
            None
        }
    }

    pub fn hud(&self, now: f64) -> Hud {
        let boss_line = match self.boss.phase {
            BossPhase::Active { .. } => {
                Some(format!("Boss HP: {}/{}", self.boss.health, self.boss.max_health))
            }
            BossPhase::Dying { .. } => Some("Boss defeated".to_string()),
            _ => None,
        };
        let mut effects = Vec::new();
        let left = |t: &Timed| t.until().map(|u| ((u - now) / 1000.0).max(0.0));
        if let Some(s) = left(&self.shield) {
            effects.push(("SHIELD", s));
        }
        if let Some(s) = left(&self.sticky) {
            effects.push(("STICKY", s));
        }
        if let Some(s) = self.slow_mo.remaining(now) {
            effects.push(("SLOW", s / 1000.0));
        }
        if let AimState::Open { since, .. } = self.aim {
            let rem = self.config.snip.aim_timeout_ms - (now - since);
            effects.push(("SNIP", (rem / 1000.0).max(0.0)));
        }
        Hud {
            mode: self.mode,
            score: self.score,
            high_score: self.unlocks.high_score.max(self.score),
            lives: self.lives,
            max_lives: self.config.life.max_lives,
            boss_line,
            effects,
        }
    }

    /// Boss rectangle for the renderer, when one is on screen.
    pub fn boss_rect(&self, now: f64) -> Option<Rect> {
        let b = &self.config.boss;
        match self.boss.phase {
            BossPhase::Active { .. } => {
                Some(Rect::new(self.boss.x(now, self.width, b), b.top_y, b.width, b.height))
            }
            BossPhase::Dying { .. } => {
                Some(Rect::new((self.width - b.width) / 2.0, b.top_y, b.width, b.height))
            }
            _ => None,
        }
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.started_at
    }

    // --- Shared helpers ------------------------------------------------------

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn cue(&mut self, cue: Cue) {
        self.events.push(GameEvent::Cue(cue));
    }

    /// Uniform draw in `[lo, hi)`; a degenerate range returns `lo`.
    pub(crate) fn rand_between(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo && lo.is_finite() && hi.is_finite() {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    pub(crate) fn rand_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    pub(crate) fn roll(&mut self, chance: f64) -> bool {
        self.rng.gen_bool(chance.clamp(0.0, 1.0))
    }

    pub(crate) fn in_start_immunity(&self, now: f64) -> bool {
        now - self.started_at < self.config.start_immunity_ms
    }

    /// Insert an entity at an explicit position. Sizes come from the config.
    pub fn place(&mut self, kind: EntityKind, x: f64, y: f64, speed: f64) -> EntityId {
        let (w, h) = self.size_of(kind);
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity::new(id, kind, Rect::new(x, y, w, h), speed, self.last_ts));
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    fn size_of(&self, kind: EntityKind) -> (f64, f64) {
        let c = &self.config;
        match kind {
            EntityKind::Normal { tier } => {
                let label = c.size_tiers.get(tier).map_or("-KB", |t| t.label.as_str());
                (spawn::label_width(label, spawn::NORMAL_MIN_WIDTH, 14.0), 36.0)
            }
            EntityKind::Hazard { label, .. } => {
                let text = c.hazards.get(label).map_or("", |h| h.label.as_str());
                (spawn::label_width(text, 130.0, 16.0), 42.0)
            }
            EntityKind::Bomb(_) => (c.bomb.size, c.bomb.size),
            EntityKind::Life => (c.life.size, c.life.size),
            EntityKind::PowerUp(p) => {
                let s = match p {
                    PowerUpKind::Shield => c.shield.size,
                    PowerUpKind::TaskManager => c.task_manager.size,
                    PowerUpKind::Soundwave => c.soundwave.size,
                    PowerUpKind::Snip => c.snip.size,
                    PowerUpKind::Sticky => c.sticky.size,
                };
                (s, s)
            }
        }
    }

    pub(crate) fn add_score(&mut self, amount: u32) {
        self.score = self.score.saturating_add(amount);
    }

    /// Take `amount` lives, never below zero. Reaching zero ends the run on
    /// the spot, so nothing later in the frame can heal it back.
    pub(crate) fn lose_lives(&mut self, amount: u32, x: f64, y: f64) {
        if amount == 0 || self.lives == 0 {
            return;
        }
        self.lives = self.lives.saturating_sub(amount);
        self.life_ever_lost = true;
        self.cue(Cue::LifeLost);
        self.emit(GameEvent::LifeLost { lives_left: self.lives });
        self.emit(GameEvent::Shake { intensity: 9.0, duration_ms: 260.0 });
        self.emit(GameEvent::Flash { color: "rgba(255,60,60,0.35)" });
        self.emit(GameEvent::text(x, y, format!("-{amount} LIFE"), "#ff6666"));
        if self.lives == 0 {
            self.finish(false, self.last_ts);
        }
    }

    pub(crate) fn grant(&mut self, unlock: Unlock) {
        if self.unlocks.grant(unlock) {
            self.unlocks_dirty = true;
            info!(?unlock, "unlocked");
            self.emit(GameEvent::Unlocked(unlock));
        }
    }

    /// Score-gated alternate sticky unlock.
    fn check_score_unlocks(&mut self) {
        let u = self.unlocks;
        if !u.sticky_unlocked() && !u.soundwave && self.score >= self.config.sticky_score_unlock {
            self.grant(Unlock::Sticky);
        }
    }

    // --- Terminal policy -----------------------------------------------------

    /// Close the run exactly once.
    pub(crate) fn finish(&mut self, victory: bool, now: f64) {
        if !matches!(self.state, RunState::Running | RunState::Paused) {
            return;
        }
        if victory {
            self.grant(Unlock::Infinite);
            if !self.unlocks.sticky {
                self.grant(Unlock::Sticky);
            }
        }
        let flawless = victory && !self.life_ever_lost;
        let outcome = match self.mode {
            Mode::Infinite => Outcome::InfiniteRunEnded,
            Mode::Standard => {
                if flawless {
                    self.grant(Unlock::Soundwave);
                }
                let forced = victory && self.config.require_perfect_victory && self.life_ever_lost;
                if !victory || forced {
                    Outcome::Defeat
                } else if flawless {
                    Outcome::FlawlessVictory
                } else {
                    Outcome::Victory
                }
            }
        };
        let new_high_score = outcome != Outcome::Defeat && self.unlocks.record_score(self.score);
        if new_high_score {
            self.unlocks_dirty = true;
        }
        let result = RunResult { outcome, score: self.score, new_high_score };
        self.state = RunState::Ended(result);
        self.effects.clear();
        self.aim = AimState::Closed;
        self.cue(if outcome == Outcome::Defeat { Cue::Defeat } else { Cue::Victory });
        self.emit(GameEvent::RunEnded(result));
        info!(?outcome, score = self.score, elapsed_ms = now - self.started_at, "run ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> GameConfig {
        let mut c = GameConfig::default();
        for s in [
            &mut c.bomb.spawn,
            &mut c.snip.spawn,
            &mut c.shield.spawn,
            &mut c.task_manager.spawn,
            &mut c.soundwave.spawn,
            &mut c.sticky.spawn,
        ] {
            s.enabled = false;
        }
        c.difficulty.base_spawn_interval_ms = 1.0e9;
        c.difficulty.min_spawn_interval_ms = 1.0e9;
        c
    }

    fn run() -> Run {
        Run::new(quiet(), Mode::Standard, UnlockState::default(), 0.0, 800.0, 600.0, 7)
    }

    #[test]
    fn paddle_always_inside_margins() {
        let mut r = run();
        for x in [-500.0, 0.0, 33.0, 400.0, 790.0, 5000.0] {
            r.set_paddle_target(x);
            assert!(r.paddle_x >= 32.0);
            assert!(r.paddle_x <= 800.0 - 32.0 - 150.0);
        }
        r.resize(300.0, 600.0);
        assert!(r.paddle_x <= 300.0 - 32.0 - 150.0 + 1e-9);
    }

    #[test]
    fn nudge_moves_by_step() {
        let mut r = run();
        r.paddle_x = 300.0;
        r.nudge_paddle(1.0);
        assert_eq!(r.paddle_x, 355.0);
        r.nudge_paddle(-1.0);
        r.nudge_paddle(-1.0);
        assert_eq!(r.paddle_x, 245.0);
    }

    #[test]
    fn frame_delta_is_capped() {
        let mut r = run();
        r.tick(5_000.0);
        assert!((r.last_dt - 0.25).abs() < 1e-9);
    }

    #[test]
    fn resume_discards_paused_time() {
        let mut r = run();
        r.tick(16.0);
        assert!(r.pause());
        r.tick(100.0);
        assert_eq!(r.state, RunState::Paused);
        r.resume(10_000.0);
        r.tick(10_016.0);
        assert!((r.last_dt - 0.016).abs() < 1e-9);
    }

    #[test]
    fn finish_only_once() {
        let mut r = run();
        r.finish(false, 10.0);
        r.finish(true, 20.0);
        assert_eq!(r.result().map(|x| x.outcome), Some(Outcome::Defeat));
        let ended = r
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::RunEnded(_)))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn score_threshold_unlocks_sticky_once() {
        let mut r = run();
        r.score = 500;
        r.tick(16.0);
        assert!(r.unlocks.sticky);
        assert!(r.take_unlock_changes().is_some());
        r.tick(32.0);
        assert!(r.take_unlock_changes().is_none());
    }

    #[test]
    fn soundwave_owner_skips_score_unlock() {
        let unlocks = UnlockState { soundwave: true, ..Default::default() };
        let mut r = Run::new(quiet(), Mode::Standard, unlocks, 0.0, 800.0, 600.0, 7);
        r.score = 600;
        r.tick(16.0);
        assert!(!r.unlocks.sticky);
    }

    #[test]
    fn infinite_profile_already_has_sticky() {
        let unlocks = UnlockState { infinite: true, ..Default::default() };
        let mut r = Run::new(quiet(), Mode::Infinite, unlocks, 0.0, 800.0, 600.0, 7);
        r.score = 600;
        r.tick(16.0);
        assert!(r.unlocks.sticky_unlocked());
        assert!(!r.unlocks.sticky);
        assert!(r.take_unlock_changes().is_none());
    }

    #[test]
    fn hud_reports_boss_line() {
        let mut r = run();
        assert!(r.hud(0.0).boss_line.is_none());
        r.score = 30;
        r.tick(16.0);
        assert_eq!(r.hud(16.0).boss_line.as_deref(), Some("Boss HP: 60/60"));
    }
}
