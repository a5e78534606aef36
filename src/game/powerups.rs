//! Power-up effects. Durations are stored as absolute expiry timestamps and
//! checked every frame; multi-step effects live in a time-ordered queue.

use tracing::debug;

use super::Run;
use super::entity::{EntityKind, PowerUpKind, Rect};
use super::events::{Cue, GameEvent};

// --- Timed effects -----------------------------------------------------------

/// An effect with an absolute expiry. Re-activation replaces the expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timed {
    until: Option<f64>,
}

impl Timed {
    pub fn is_active(&self) -> bool {
        self.until.is_some()
    }

    pub fn until(&self) -> Option<f64> {
        self.until
    }

    /// Set expiry to `now + duration`. Returns true when this was a refresh.
    pub fn extend(&mut self, now: f64, duration: f64) -> bool {
        self.until.replace(now + duration).is_some()
    }

    /// Clear once `now` is past the expiry. True only on the transition.
    pub fn expire(&mut self, now: f64) -> bool {
        match self.until {
            Some(u) if now > u => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) -> bool {
        self.until.take().is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlowSource {
    TaskManager,
    Soundwave,
}

/// Two independent slow-motion windows whose factors multiply.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlowMo {
    task_manager: Timed,
    task_manager_factor: f64,
    soundwave: Timed,
    soundwave_factor: f64,
}

impl SlowMo {
    pub fn start(&mut self, source: SlowSource, now: f64, duration: f64, factor: f64) {
        let factor = factor.clamp(f64::MIN_POSITIVE, 1.0);
        match source {
            SlowSource::TaskManager => {
                self.task_manager.extend(now, duration);
                self.task_manager_factor = factor;
            }
            SlowSource::Soundwave => {
                self.soundwave.extend(now, duration);
                self.soundwave_factor = factor;
            }
        }
    }

    pub fn expire(&mut self, now: f64) {
        self.task_manager.expire(now);
        self.soundwave.expire(now);
    }

    /// Expire stale windows, then return the combined delta multiplier.
    pub fn factor(&mut self, now: f64) -> f64 {
        self.expire(now);
        let mut f = 1.0;
        if self.task_manager.is_active() {
            f *= self.task_manager_factor;
        }
        if self.soundwave.is_active() {
            f *= self.soundwave_factor;
        }
        f
    }

    pub fn is_active(&self) -> bool {
        self.task_manager.is_active() || self.soundwave.is_active()
    }

    /// Milliseconds until the last active window ends.
    pub fn remaining(&self, now: f64) -> Option<f64> {
        [self.task_manager.until(), self.soundwave.until()]
            .into_iter()
            .flatten()
            .map(|u| (u - now).max(0.0))
            .reduce(f64::max)
    }
}

// --- Snip aim ----------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drag {
    pub origin: (f64, f64),
    pub current: (f64, f64),
}

impl Drag {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.origin.0, self.origin.1, self.current.0, self.current.1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AimState {
    Closed,
    Open { since: f64, drag: Option<Drag> },
}

impl AimState {
    pub fn is_open(&self) -> bool {
        matches!(self, AimState::Open { .. })
    }

    pub fn drag_rect(&self) -> Option<Rect> {
        match self {
            AimState::Open { drag: Some(d), .. } => Some(d.rect()),
            _ => None,
        }
    }
}

// --- Deferred effects --------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    SoundwavePulse { x: f64, y: f64, radius: f64 },
}

/// Effects ordered by due time; equal times keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct EffectQueue {
    entries: Vec<(f64, Effect)>,
}

impl EffectQueue {
    pub fn push(&mut self, at: f64, effect: Effect) {
        let i = self.entries.partition_point(|(t, _)| *t <= at);
        self.entries.insert(i, (at, effect));
    }

    pub fn pop_due(&mut self, now: f64) -> Vec<Effect> {
        let n = self.entries.partition_point(|(t, _)| *t <= now);
        self.entries.drain(..n).map(|(_, e)| e).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- Activation --------------------------------------------------------------

impl Run {
    /// Apply a collected power-up at the pickup point `(x, y)`.
    pub(crate) fn activate_power_up(&mut self, kind: PowerUpKind, x: f64, y: f64, now: f64) {
        debug!(?kind, "power-up collected");
        self.emit(GameEvent::Burst { x, y, color: "#ffffff", count: 10 });
        match kind {
            PowerUpKind::Shield => self.activate_shield(now),
            PowerUpKind::TaskManager => self.activate_task_manager(now),
            PowerUpKind::Soundwave => self.activate_soundwave(x, y, now),
            PowerUpKind::Snip => self.open_aim(now),
            PowerUpKind::Sticky => self.activate_sticky(now),
        }
    }

    fn paddle_centre(&self) -> (f64, f64) {
        self.paddle_rect().center()
    }

    fn activate_shield(&mut self, now: f64) {
        let refresh = self.shield.extend(now, self.config.shield.duration_ms);
        self.cue(Cue::ShieldPickup);
        let (px, py) = self.paddle_centre();
        self.emit(GameEvent::Ring { x: px, y: py, radius: 180.0, color: "rgba(90,190,255,0.6)" });
        let label = if refresh { "SHIELD REFRESH" } else { "SHIELD ON" };
        self.emit(GameEvent::text(px, py - 50.0, label, "#64c9ff"));
    }

    /// Clear every live normal block (scored) and detonate every armed bomb.
    fn activate_task_manager(&mut self, now: f64) {
        self.cue(Cue::TaskManagerPickup);
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);
        self.emit(GameEvent::Ring { x: cx, y: cy, radius: 260.0, color: "rgba(255,210,77,0.5)" });
        self.emit(GameEvent::Shake { intensity: 8.0, duration_ms: 320.0 });

        let award = self.config.task_manager.award_per_normal;
        let cleared = self.clear_normals(|_| true, award, "#ffdf80");
        let bombs: Vec<_> = self
            .entities
            .iter()
            .filter(|e| e.is_collectible() && matches!(e.kind, EntityKind::Bomb(_)))
            .map(|e| e.id)
            .collect();
        for id in bombs {
            self.detonate(id, now);
        }
        let msg = if cleared > 0 {
            format!("TASK MANAGER: Cleared {cleared}")
        } else {
            "TASK MANAGER: No Blocks".to_string()
        };
        self.emit(GameEvent::text(cx, cy - 40.0, msg, "#ffe684"));

        let tm = &self.config.task_manager;
        let (ms, factor) = (tm.slow_mo_ms, tm.slow_mo_factor);
        self.slow_mo.start(SlowSource::TaskManager, now, ms, factor);
    }

    /// Remove uncaught normal blocks matching `pick`, awarding `award` each.
    pub(crate) fn clear_normals<F>(&mut self, pick: F, award: u32, color: &'static str) -> u32
    where
        F: Fn(&Rect) -> bool,
    {
        let mut hits = Vec::new();
        self.entities.retain(|e| {
            let take = e.is_collectible() && matches!(e.kind, EntityKind::Normal { .. }) && pick(&e.rect);
            if take {
                hits.push(e.rect.center());
            }
            !take
        });
        for &(x, y) in &hits {
            self.emit(GameEvent::Burst { x, y, color, count: 12 });
            self.emit(GameEvent::text(x, y, format!("+{award}"), color));
        }
        let n = hits.len() as u32;
        if n > 0 {
            self.add_score(award.saturating_mul(n));
            self.recompute_spawn_interval();
        }
        n
    }

    /// Queue the pulse train; the first pulse is due immediately.
    fn activate_soundwave(&mut self, x: f64, y: f64, now: f64) {
        self.cue(Cue::SoundwavePickup);
        let sw = self.config.soundwave.clone();
        self.slow_mo.start(SlowSource::Soundwave, now, sw.slow_mo_ms, sw.slow_mo_factor);
        for i in 0..sw.pulses {
            let radius = sw.first_radius + i as f64 * sw.radius_growth;
            self.effects
                .push(now + i as f64 * sw.pulse_interval_ms, Effect::SoundwavePulse { x, y, radius });
        }
    }

    /// Run queued effects whose time has come. Each one re-checks that the
    /// run is still live and no boss fight has started.
    pub(crate) fn run_due_effects(&mut self, now: f64) {
        for effect in self.effects.pop_due(now) {
            if !self.is_running() || self.boss.is_engaged() {
                continue;
            }
            match effect {
                Effect::SoundwavePulse { x, y, radius } => self.soundwave_pulse(x, y, radius, now),
            }
        }
    }

    fn soundwave_pulse(&mut self, x: f64, y: f64, radius: f64, now: f64) {
        self.cue(Cue::SoundwavePulse);
        self.emit(GameEvent::Ring { x, y, radius, color: "rgba(170,130,255,0.55)" });
        self.emit(GameEvent::Shake { intensity: 5.0, duration_ms: 180.0 });
        let inside = |r: &Rect| {
            let (cx, cy) = r.center();
            (cx - x).hypot(cy - y) <= radius
        };
        let award = self.config.soundwave.award_per_normal;
        self.clear_normals(inside, award, "#d9c4ff");
        let bombs: Vec<_> = self
            .entities
            .iter()
            .filter(|e| e.is_collectible() && matches!(e.kind, EntityKind::Bomb(_)) && inside(&e.rect))
            .map(|e| e.id)
            .collect();
        for id in bombs {
            self.detonate(id, now);
        }
    }

    pub fn pending_effects(&self) -> usize {
        self.effects.len()
    }

    fn activate_sticky(&mut self, now: f64) {
        let (px, py) = self.paddle_centre();
        if self.sticky.extend(now, self.config.sticky.duration_ms) {
            self.emit(GameEvent::text(px, py - 40.0, "STICKINESS EXTENDED", "#ffd1ff"));
            return;
        }
        self.sticky_x = self.paddle_x;
        self.cue(Cue::StickyPickup);
        self.emit(GameEvent::text(px, py - 40.0, "STICKY TASKBAR", "#ffb8ff"));
        self.emit(GameEvent::Shake { intensity: 10.0, duration_ms: 300.0 });
    }

    pub(crate) fn apply_sticky_lock(&mut self) {
        if self.sticky.is_active() {
            self.paddle_x = self.sticky_x;
        }
    }

    /// Idempotent: an already-expired effect produces nothing.
    pub(crate) fn expire_effects(&mut self, now: f64) {
        let (px, py) = self.paddle_centre();
        if self.shield.expire(now) {
            self.cue(Cue::ShieldExpire);
            self.emit(GameEvent::text(px, py - 50.0, "SHIELD OFF", "#9fb6c2"));
        }
        if self.sticky.expire(now) {
            self.cue(Cue::StickyEnd);
            self.emit(GameEvent::text(px, py - 30.0, "TASKBAR UNSTUCK", "#cccccc"));
        }
        self.slow_mo.expire(now);
    }

    // --- Snip aim ------------------------------------------------------------

    fn open_aim(&mut self, now: f64) {
        self.aim = AimState::Open { since: now, drag: None };
        self.cue(Cue::SnipPickup);
    }

    /// Pointer-down while aiming. Returns false when no drag was started.
    pub fn begin_drag(&mut self, x: f64, y: f64) -> bool {
        if !Rect::new(0.0, 0.0, self.width, self.height).contains_point(x, y) {
            return false;
        }
        if let AimState::Open { drag, .. } = &mut self.aim {
            if drag.is_none() {
                *drag = Some(Drag { origin: (x, y), current: (x, y) });
                return true;
            }
        }
        false
    }

    pub fn drag_to(&mut self, x: f64, y: f64) {
        if let AimState::Open { drag: Some(d), .. } = &mut self.aim {
            d.current = (x, y);
        }
    }

    /// Pointer-up: resolve the dragged rectangle, or cancel when it is too small.
    pub fn end_drag(&mut self, now: f64) {
        let Some(rect) = self.aim.drag_rect() else {
            return;
        };
        let min = self.config.snip.min_drag;
        if rect.w > min && rect.h > min {
            self.release_aim(rect, now);
        } else {
            self.cancel_aim();
        }
    }

    /// Close aim mode with no effect.
    pub fn cancel_aim(&mut self) {
        if !self.aim.is_open() {
            return;
        }
        self.aim = AimState::Closed;
        self.cue(Cue::SnipCancel);
        self.emit(GameEvent::text(self.width / 2.0, self.height * 0.4, "SNIP CANCELED", "#ff6f9f"));
    }

    /// The timeout only runs while no drag is in progress.
    pub(crate) fn check_aim_timeout(&mut self, now: f64) {
        if let AimState::Open { since, drag: None } = self.aim {
            if now - since > self.config.snip.aim_timeout_ms {
                self.cancel_aim();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::GameConfig;
    use crate::game::entity::BombState;
    use crate::game::unlocks::UnlockState;
    use crate::game::{Mode, RunState};
    use approx::assert_relative_eq;

    fn quiet_run() -> Run {
        let mut c = GameConfig::default();
        c.bomb.spawn.enabled = false;
        c.snip.spawn.enabled = false;
        c.shield.spawn.enabled = false;
        c.task_manager.spawn.enabled = false;
        c.soundwave.spawn.enabled = false;
        c.sticky.spawn.enabled = false;
        c.difficulty.base_spawn_interval_ms = 1.0e9;
        c.difficulty.min_spawn_interval_ms = 1.0e9;
        Run::new(c, Mode::Standard, UnlockState::default(), 0.0, 1000.0, 800.0, 3)
    }

    #[test]
    fn refresh_replaces_expiry() {
        let mut t = Timed::default();
        assert!(!t.extend(0.0, 5_000.0));
        assert!(t.extend(3_000.0, 5_000.0));
        assert_eq!(t.until(), Some(8_000.0));
    }

    #[test]
    fn expiry_fires_once() {
        let mut t = Timed::default();
        t.extend(0.0, 100.0);
        assert!(!t.expire(100.0));
        assert!(t.expire(100.5));
        assert!(!t.expire(200.0));
        assert!(!t.is_active());
    }

    #[test]
    fn slow_mo_factors_multiply_and_expire_independently() {
        let mut s = SlowMo::default();
        s.start(SlowSource::TaskManager, 0.0, 900.0, 0.55);
        s.start(SlowSource::Soundwave, 0.0, 1_000.0, 0.7);
        assert_relative_eq!(s.factor(500.0), 0.385, epsilon = 1e-12);
        assert_relative_eq!(s.factor(950.0), 0.7, epsilon = 1e-12);
        assert_relative_eq!(s.factor(1_001.0), 1.0);
        assert!(!s.is_active());
    }

    #[test]
    fn queue_orders_by_time() {
        let mut q = EffectQueue::default();
        q.push(300.0, Effect::SoundwavePulse { x: 0.0, y: 0.0, radius: 3.0 });
        q.push(100.0, Effect::SoundwavePulse { x: 0.0, y: 0.0, radius: 1.0 });
        q.push(200.0, Effect::SoundwavePulse { x: 0.0, y: 0.0, radius: 2.0 });
        let due = q.pop_due(250.0);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0], Effect::SoundwavePulse { x: 0.0, y: 0.0, radius: 1.0 });
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn task_manager_clears_normals_and_detonates_bombs() {
        let mut r = quiet_run();
        r.place(EntityKind::Normal { tier: 0 }, 100.0, 100.0, 100.0);
        r.place(EntityKind::Normal { tier: 1 }, 300.0, 100.0, 100.0);
        let bomb = r.place(EntityKind::Bomb(BombState::Armed), 500.0, 100.0, 100.0);
        r.place(EntityKind::Life, 700.0, 100.0, 100.0);
        r.activate_power_up(PowerUpKind::TaskManager, 0.0, 0.0, 1_000.0);
        assert_eq!(r.score, 2);
        assert_eq!(r.entities.len(), 2);
        assert!(r.entity(bomb).is_some_and(|b| b.is_exploding()));
        assert!(r.slow_mo.is_active());
    }

    #[test]
    fn soundwave_pulses_expand_over_time() {
        let mut r = quiet_run();
        r.place(EntityKind::Normal { tier: 0 }, 480.0, 380.0, 0.0); // near centre
        r.place(EntityKind::Normal { tier: 0 }, 480.0, 640.0, 0.0); // ~250 px away
        r.activate_power_up(PowerUpKind::Soundwave, 500.0, 400.0, 0.0);
        assert_eq!(r.pending_effects(), 3);
        r.run_due_effects(0.0);
        assert_eq!(r.score, 1);
        r.run_due_effects(260.0);
        assert_eq!(r.score, 2);
        r.run_due_effects(520.0);
        assert_eq!(r.pending_effects(), 0);
    }

    #[test]
    fn pulses_after_run_end_do_nothing() {
        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Soundwave, 500.0, 400.0, 0.0);
        r.run_due_effects(0.0);
        r.place(EntityKind::Normal { tier: 0 }, 480.0, 380.0, 0.0);
        r.state = RunState::Paused;
        r.run_due_effects(300.0);
        assert_eq!(r.score, 0);
        assert_eq!(r.entities.len(), 1);
    }

    #[test]
    fn sticky_locks_and_extends() {
        let mut r = quiet_run();
        r.paddle_x = 200.0;
        r.activate_power_up(PowerUpKind::Sticky, 0.0, 0.0, 0.0);
        r.set_paddle_target(800.0);
        r.nudge_paddle(1.0);
        assert_eq!(r.paddle_x, 200.0);
        r.activate_power_up(PowerUpKind::Sticky, 0.0, 0.0, 600.0);
        assert_eq!(r.sticky.until(), Some(1_600.0));
        r.expire_effects(1_500.0);
        assert!(r.sticky.is_active());
        r.expire_effects(1_601.0);
        assert!(!r.sticky.is_active());
        r.nudge_paddle(1.0);
        assert_eq!(r.paddle_x, 255.0);
    }

    #[test]
    fn aim_times_out_only_when_not_dragging() {
        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        assert!(r.begin_drag(10.0, 10.0));
        r.check_aim_timeout(10_000.0);
        assert!(r.aim.is_open());

        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        r.check_aim_timeout(6_500.0);
        assert!(r.aim.is_open());
        r.check_aim_timeout(6_501.0);
        assert!(!r.aim.is_open());
    }

    #[test]
    fn tiny_drag_cancels() {
        let mut r = quiet_run();
        r.place(EntityKind::Normal { tier: 0 }, 100.0, 100.0, 0.0);
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        r.begin_drag(100.0, 100.0);
        r.drag_to(104.0, 300.0);
        r.end_drag(50.0);
        assert!(!r.aim.is_open());
        assert_eq!(r.score, 0);
        assert_eq!(r.entities.len(), 1);
    }
}
