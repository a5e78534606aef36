//! Spawn scheduling: per-kind interval timers with score decay, jitter and
//! bounded backfill, plus the normal-block, life-pickup and hazard spawners.

use super::{Mode, Run};
use super::config::{GameConfig, SpawnSchedule};
use super::difficulty::{burst_chance, decayed_interval, normal_spawn_interval, speed_multiplier};
use super::entity::{BombState, EntityKind, PowerUpKind, SpawnKind};
use super::events::Cue;

pub(crate) const NORMAL_MIN_WIDTH: f64 = 54.0;
const CHAR_PX: f64 = 10.0; // rough glyph advance for block labels

/// Width of a label block: text estimate plus padding, never below `min`.
pub fn label_width(label: &str, min: f64, pad: f64) -> f64 {
    (label.chars().count() as f64 * CHAR_PX + pad * 2.0).ceil().max(min)
}

pub fn schedule_for(cfg: &GameConfig, kind: SpawnKind) -> &SpawnSchedule {
    match kind {
        SpawnKind::Bomb => &cfg.bomb.spawn,
        SpawnKind::PowerUp(PowerUpKind::Snip) => &cfg.snip.spawn,
        SpawnKind::PowerUp(PowerUpKind::Shield) => &cfg.shield.spawn,
        SpawnKind::PowerUp(PowerUpKind::TaskManager) => &cfg.task_manager.spawn,
        SpawnKind::PowerUp(PowerUpKind::Soundwave) => &cfg.soundwave.spawn,
        SpawnKind::PowerUp(PowerUpKind::Sticky) => &cfg.sticky.spawn,
    }
}

/// Last-fire timestamp plus the delay until the next one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnTimer {
    pub last: f64,
    pub next_delay: f64,
}

impl SpawnTimer {
    pub fn new(now: f64, initial_delay: f64) -> Self {
        Self { last: now, next_delay: initial_delay }
    }

    pub fn due(&self, now: f64) -> bool {
        now - self.last >= self.next_delay
    }

    /// Fire the timer: returns how many cycles to perform and re-arms with
    /// `interval + jitter`. Call only when [`due`](Self::due) holds.
    pub fn fire(&mut self, now: f64, sched: &SpawnSchedule, score: u32, jitter: f64) -> u32 {
        let elapsed = now - self.last;
        let interval = decayed_interval(
            sched.base_interval_ms,
            sched.min_interval_ms,
            sched.decay_score,
            score,
        );
        let cycles = if sched.backfill && interval > 0.0 {
            let missed = (elapsed / interval).floor().max(1.0) as u32;
            missed.min(sched.backfill_cap.max(1))
        } else {
            1
        };
        self.last = now;
        self.next_delay = interval + jitter.clamp(0.0, sched.jitter_ms.max(0.0));
        cycles
    }
}

impl Run {
    /// Live, uncaught entities counting against `kind`'s cap.
    pub fn live_count(&self, kind: SpawnKind) -> usize {
        self.entities
            .iter()
            .filter(|e| e.is_collectible() && e.spawn_kind() == Some(kind))
            .count()
    }

    fn spawn_allowed(&self, kind: SpawnKind) -> bool {
        match kind {
            SpawnKind::PowerUp(PowerUpKind::Soundwave) => self.unlocks.soundwave,
            SpawnKind::PowerUp(PowerUpKind::Sticky) => self.unlocks.sticky_unlocked(),
            SpawnKind::PowerUp(PowerUpKind::Shield) => !self.shield.is_active(),
            _ => true,
        }
    }

    /// Poll every interval-driven kind. The caller has already checked that
    /// the boss is not engaged and aim mode is closed.
    pub(crate) fn run_spawners(&mut self, now: f64) {
        for kind in SpawnKind::ALL {
            let sched = schedule_for(&self.config, kind).clone();
            if !sched.enabled || !self.spawn_allowed(kind) {
                continue;
            }
            if self.live_count(kind) >= sched.max_concurrent {
                continue;
            }
            let slot = kind.index();
            if !self.timers[slot].due(now) {
                continue;
            }
            let jitter = self.rand_between(0.0, sched.jitter_ms);
            let cycles = self.timers[slot].fire(now, &sched, self.score, jitter);
            for _ in 0..cycles {
                match kind {
                    SpawnKind::Bomb => self.spawn_bomb_burst(),
                    SpawnKind::PowerUp(p) => {
                        if self.live_count(kind) >= sched.max_concurrent {
                            break;
                        }
                        self.spawn_power_up(p);
                    }
                }
            }
        }
    }

    fn spawn_bomb_burst(&mut self) {
        let cap = self.config.bomb.spawn.max_concurrent;
        if self.live_count(SpawnKind::Bomb) >= cap {
            return;
        }
        self.spawn_bomb();
        let b = &self.config.bomb;
        let chance = burst_chance(b.burst_chance_base, b.burst_chance_boost, b.burst_score_ramp, self.score);
        let max_extra = b.burst_max_extra;
        let mut extra = 0;
        while extra < max_extra {
            if self.live_count(SpawnKind::Bomb) >= cap || !self.roll(chance) {
                break;
            }
            self.spawn_bomb();
            extra += 1;
        }
        self.cue(Cue::BombSpawn);
    }

    fn spawn_bomb(&mut self) {
        let size = self.config.bomb.size;
        let (lo, hi) = self.config.bomb.speed_range;
        let x = self.spawn_x(size, self.config.field.spawn_side_margin);
        let speed = self.rand_between(lo, hi);
        self.place(EntityKind::Bomb(BombState::Armed), x, -size - 10.0, speed);
    }

    fn spawn_power_up(&mut self, kind: PowerUpKind) {
        let c = &self.config;
        let (size, (lo, hi), cue) = match kind {
            PowerUpKind::Shield => (c.shield.size, c.shield.speed_range, Cue::ShieldSpawn),
            PowerUpKind::TaskManager => {
                (c.task_manager.size, c.task_manager.speed_range, Cue::TaskManagerSpawn)
            }
            PowerUpKind::Soundwave => (c.soundwave.size, c.soundwave.speed_range, Cue::SoundwaveSpawn),
            PowerUpKind::Snip => (c.snip.size, c.snip.speed_range, Cue::SnipSpawn),
            PowerUpKind::Sticky => (c.sticky.size, c.sticky.speed_range, Cue::StickySpawn),
        };
        let x = self.spawn_x(size, self.config.field.spawn_side_margin);
        let speed = self.rand_between(lo, hi);
        self.place(EntityKind::PowerUp(kind), x, -size - 10.0, speed);
        self.cue(cue);
    }

    /// Random left edge keeping `margin` px clear on both sides.
    fn spawn_x(&mut self, w: f64, margin: f64) -> f64 {
        let hi = (self.width - w - margin).max(margin);
        self.rand_between(margin, hi)
    }

    // --- Normal blocks -------------------------------------------------------

    pub(crate) fn maybe_spawn_normal(&mut self, now: f64) {
        if now - self.last_normal_spawn > self.spawn_interval {
            self.last_normal_spawn = now;
            self.spawn_normal();
        }
    }

    /// Standard runs stop feeding blocks once the boss threshold is reached.
    fn spawn_normal(&mut self) {
        if self.boss.is_engaged()
            || (self.mode == Mode::Standard && self.score >= self.config.boss.trigger_score)
        {
            return;
        }
        let tier = self.rand_index(self.config.size_tiers.len()).unwrap_or(0);
        let factor = self.config.size_tiers.get(tier).map_or(1.0, |t| t.speed_factor);
        let (lo, hi) = self.config.difficulty.base_speed_range;
        let base = self.rand_between(lo, hi);
        let speed = base * factor * speed_multiplier(&self.config.difficulty, self.score);
        let kind = EntityKind::Normal { tier };
        let (w, h) = self.size_of(kind);
        let x = self.spawn_x(w, self.config.field.spawn_side_margin);
        self.place(kind, x, -h - 10.0, speed);
    }

    /// Re-derive the normal-block interval after the score changed.
    pub(crate) fn recompute_spawn_interval(&mut self) {
        self.spawn_interval = normal_spawn_interval(&self.config.difficulty, self.score);
    }

    pub fn spawn_interval(&self) -> f64 {
        self.spawn_interval
    }

    // --- Life pickups --------------------------------------------------------

    /// Drop a life pickup when the score lands on the mode's multiple.
    pub(crate) fn maybe_spawn_life(&mut self) {
        if self.boss.is_engaged() || self.lives >= self.config.life.max_lives {
            return;
        }
        let interval = match self.mode {
            Mode::Standard => self.config.life.normal_interval,
            Mode::Infinite => self.config.life.infinite_interval,
        };
        if interval == 0 || self.score == 0 || self.score % interval != 0 {
            return;
        }
        if self.last_life_score == self.score {
            return;
        }
        self.last_life_score = self.score;
        let size = self.config.life.size;
        let speed = self.config.difficulty.base_speed_range.1 * self.config.life.speed_multiplier;
        let x = self.spawn_x(size, self.config.field.spawn_side_margin);
        self.place(EntityKind::Life, x, -size - 8.0, speed);
    }

    // --- Boss hazards --------------------------------------------------------

    pub(crate) fn spawn_hazard(&mut self) {
        let Some(idx) = self.rand_index(self.config.hazards.len()) else {
            return;
        };
        let class = self.config.hazards[idx].class;
        let (lo, hi) = self.config.boss.drop_speed_range;
        let speed = self.rand_between(lo, hi) * class.speed_factor();
        let y = self.config.boss.top_y + self.config.boss.height;
        let kind = EntityKind::Hazard { class, label: idx };
        let (w, _) = self.size_of(kind);
        let x = self.spawn_x(w, self.config.field.spawn_side_margin * 2.0);
        self.place(kind, x, y, speed);
        self.cue(Cue::BossHazardDrop);
    }
}
