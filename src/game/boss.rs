//! Boss lifecycle: Dormant -> Active -> Dying -> Resolved, once per run.

use tracing::info;

use super::config::BossConfig;
use super::events::{Cue, GameEvent};
use super::powerups::AimState;
use super::{Mode, Run};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BossPhase {
    Dormant,
    Active { since: f64 },
    Dying { since: f64 },
    Resolved,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Boss {
    pub phase: BossPhase,
    pub health: u32,
    pub max_health: u32,
    pub drop_interval: f64,
    last_drop: f64,
}

impl Boss {
    pub fn new(cfg: &BossConfig) -> Self {
        Self {
            phase: BossPhase::Dormant,
            health: cfg.health,
            max_health: cfg.health,
            drop_interval: cfg.drop_interval_start_ms,
            last_drop: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, BossPhase::Active { .. })
    }

    pub fn is_dying(&self) -> bool {
        matches!(self.phase, BossPhase::Dying { .. })
    }

    /// Active or Dying: the window in which regular spawning is suspended.
    pub fn is_engaged(&self) -> bool {
        self.is_active() || self.is_dying()
    }

    /// Dormant -> Active. Refused once a lifecycle has begun.
    pub fn start(&mut self, now: f64, cfg: &BossConfig) -> bool {
        if self.phase != BossPhase::Dormant {
            return false;
        }
        self.phase = BossPhase::Active { since: now };
        self.health = self.max_health;
        self.drop_interval = cfg.drop_interval_start_ms;
        self.last_drop = now;
        true
    }

    /// One qualifying catch. Returns true on the hit that empties the health bar.
    pub fn hit(&mut self, now: f64, cfg: &BossConfig) -> bool {
        if !self.is_active() {
            return false;
        }
        let before = self.max_health - self.health;
        self.health = self.health.saturating_sub(cfg.damage_per_catch);
        let after = self.max_health - self.health;
        if cfg.drop_reduce_every > 0 {
            // One tightening per threshold crossed, whatever the damage step.
            let crossed = after / cfg.drop_reduce_every - before / cfg.drop_reduce_every;
            if crossed > 0 {
                self.drop_interval = (self.drop_interval - cfg.drop_reduce_ms * f64::from(crossed))
                    .max(cfg.drop_interval_min_ms);
            }
        }
        if self.health == 0 {
            self.phase = BossPhase::Dying { since: now };
            return true;
        }
        false
    }

    /// Left edge on the sinusoidal path; centred when not active.
    pub fn x(&self, now: f64, width: f64, cfg: &BossConfig) -> f64 {
        let centre = width / 2.0 - cfg.width / 2.0;
        match self.phase {
            BossPhase::Active { since } => {
                let t = (now - since) / 1000.0;
                centre + (t * cfg.move_speed).sin() * cfg.move_amplitude
            }
            _ => centre,
        }
    }

    /// True when a hazard should drop now; re-arms the drop timer.
    pub fn drop_due(&mut self, now: f64) -> bool {
        if self.is_active() && now - self.last_drop > self.drop_interval {
            self.last_drop = now;
            true
        } else {
            false
        }
    }

    /// Dying -> Resolved after the death sequence has run its course.
    pub fn death_done(&mut self, now: f64, cfg: &BossConfig) -> bool {
        match self.phase {
            BossPhase::Dying { since } if now - since >= cfg.death_duration_ms => {
                self.phase = BossPhase::Resolved;
                true
            }
            _ => false,
        }
    }
}

impl Run {
    pub(crate) fn maybe_start_boss(&mut self, now: f64) {
        if self.mode == Mode::Infinite || self.score < self.config.boss.trigger_score {
            return;
        }
        if !self.boss.start(now, &self.config.boss) {
            return;
        }
        self.entities.clear();
        self.effects.clear();
        self.aim = AimState::Closed;
        self.shield.clear();
        self.cue(Cue::BossSpawn);
        self.emit(GameEvent::Flash { color: "rgba(255,255,255,0.55)" });
        info!(score = self.score, health = self.boss.health, "boss active");
    }

    pub(crate) fn update_boss(&mut self, now: f64) {
        if self.boss.drop_due(now) {
            self.spawn_hazard();
        }
    }

    pub(crate) fn update_boss_death(&mut self, now: f64) {
        if self.boss.death_done(now, &self.config.boss) {
            info!("boss resolved");
            self.finish(true, now);
        }
    }

    /// A normal block or hazard caught while the boss is Active.
    pub(crate) fn damage_boss(&mut self, x: f64, y: f64, now: f64) {
        let dmg = self.config.boss.damage_per_catch;
        let died = self.boss.hit(now, &self.config.boss);
        self.add_score(dmg);
        self.cue(Cue::BossHit);
        self.emit(GameEvent::Shake { intensity: 6.0, duration_ms: 160.0 });
        self.emit(GameEvent::Burst { x, y, color: "#ff9f40", count: 14 });
        self.emit(GameEvent::text(x, y - 14.0, format!("-{dmg}"), "#ffb14a"));
        if died {
            self.cue(Cue::BossDefeated);
            self.emit(GameEvent::Shake { intensity: 16.0, duration_ms: 900.0 });
            info!(score = self.score, "boss dying");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BossConfig {
        BossConfig::default()
    }

    #[test]
    fn single_lifecycle() {
        let c = cfg();
        let mut b = Boss::new(&c);
        assert!(b.start(100.0, &c));
        assert!(!b.start(200.0, &c));
        for _ in 0..59 {
            assert!(!b.hit(300.0, &c));
        }
        assert_eq!(b.health, 1);
        assert!(b.hit(400.0, &c));
        assert_eq!(b.phase, BossPhase::Dying { since: 400.0 });
        assert!(!b.hit(500.0, &c));
        assert_eq!(b.health, 0);
        assert!(!b.death_done(1_999.0, &c));
        assert!(b.death_done(2_000.0, &c));
        assert!(!b.start(3_000.0, &c));
    }

    #[test]
    fn health_drops_by_damage_and_floors() {
        let mut c = cfg();
        c.damage_per_catch = 7;
        c.health = 10;
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        b.hit(1.0, &c);
        assert_eq!(b.health, 3);
        assert!(b.hit(2.0, &c));
        assert_eq!(b.health, 0);
    }

    #[test]
    fn drop_interval_tightens_every_ten_damage() {
        let c = cfg();
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        for _ in 0..9 {
            b.hit(0.0, &c);
        }
        assert_eq!(b.drop_interval, 820.0);
        b.hit(0.0, &c);
        assert_eq!(b.drop_interval, 770.0);
        for _ in 0..40 {
            b.hit(0.0, &c);
        }
        assert_eq!(b.drop_interval, 570.0);
    }

    #[test]
    fn drop_interval_counts_thresholds_crossed_by_uneven_damage() {
        let mut c = cfg();
        c.damage_per_catch = 7;
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        b.hit(0.0, &c); // 7
        assert_eq!(b.drop_interval, 820.0);
        b.hit(0.0, &c); // 14
        assert_eq!(b.drop_interval, 770.0);
        b.hit(0.0, &c); // 21
        assert_eq!(b.drop_interval, 720.0);
        b.hit(0.0, &c); // 28
        assert_eq!(b.drop_interval, 720.0);

        c.damage_per_catch = 25;
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        b.hit(0.0, &c);
        assert_eq!(b.drop_interval, 720.0, "one big hit crosses two thresholds");
    }

    #[test]
    fn drop_interval_respects_floor() {
        let mut c = cfg();
        c.drop_reduce_every = 1;
        c.drop_reduce_ms = 100.0;
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        for _ in 0..20 {
            b.hit(0.0, &c);
        }
        assert_eq!(b.drop_interval, c.drop_interval_min_ms);
    }

    #[test]
    fn path_stays_within_amplitude() {
        let c = cfg();
        let mut b = Boss::new(&c);
        b.start(0.0, &c);
        let centre = 1200.0 / 2.0 - c.width / 2.0;
        for i in 0..200 {
            let x = b.x(i as f64 * 97.0, 1200.0, &c);
            assert!((x - centre).abs() <= c.move_amplitude + 1e-9);
        }
    }

    #[test]
    fn drops_wait_for_interval() {
        let c = cfg();
        let mut b = Boss::new(&c);
        b.start(1_000.0, &c);
        assert!(!b.drop_due(1_820.0));
        assert!(b.drop_due(1_821.0));
        assert!(!b.drop_due(1_900.0));
    }
}
