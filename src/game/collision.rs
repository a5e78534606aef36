//! Paddle and aim-rectangle interactions, plus the end-of-frame sweep that
//! turns fall-through misses into life loss.

use super::entity::{EntityId, EntityKind, PowerUpKind, Rect};
use super::events::{Cue, GameEvent};
use super::powerups::AimState;
use super::Run;

impl Run {
    // --- Paddle --------------------------------------------------------------

    pub(crate) fn resolve_paddle(&mut self, now: f64) {
        let paddle = self.paddle_rect();
        let hits: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_collectible() && e.rect.intersects(&paddle))
            .map(|e| e.id)
            .collect();
        for id in hits {
            // A defeat or a boss kill earlier in this frame ends contact resolution.
            if !self.is_running() || self.boss.is_dying() {
                break;
            }
            self.collect(id, now);
        }
    }

    /// Dispatch one paddle contact. Entities already removed or caught by an
    /// earlier contact this frame are skipped.
    fn collect(&mut self, id: EntityId, now: f64) {
        let Some(e) = self.entities.iter_mut().find(|e| e.id == id && e.is_collectible()) else {
            return;
        };
        let kind = e.kind;
        let (x, y) = e.rect.center();
        if let EntityKind::Bomb(_) = kind {
            self.bomb_hit(id, now);
            return;
        }
        e.caught = true;
        match kind {
            EntityKind::Normal { .. } | EntityKind::Hazard { .. } if self.boss.is_active() => {
                self.damage_boss(x, y, now);
            }
            EntityKind::Normal { .. } => self.catch_normal(x, y),
            EntityKind::Hazard { .. } => self.block_or_lose(1, x, y),
            EntityKind::Life => {
                self.heal(x, y);
            }
            EntityKind::PowerUp(p) => self.activate_power_up(p, x, y, now),
            EntityKind::Bomb(_) => {}
        }
    }

    fn catch_normal(&mut self, x: f64, y: f64) {
        self.add_score(1);
        self.cue(Cue::Catch);
        self.emit(GameEvent::Flash { color: "rgba(88,194,255,0.18)" });
        self.emit(GameEvent::Burst { x, y, color: "#58c2ff", count: 16 });
        self.emit(GameEvent::text(x, y - 12.0, "+1", "#58c2ff"));
        self.maybe_spawn_life();
        self.recompute_spawn_interval();
    }

    fn heal(&mut self, x: f64, y: f64) -> bool {
        if self.lives < self.config.life.max_lives {
            self.lives += 1;
            self.cue(Cue::LifeGain);
            self.emit(GameEvent::Ring { x, y, radius: 70.0, color: "rgba(32,214,114,0.55)" });
            self.emit(GameEvent::text(x, y - 10.0, "+1 LIFE", "#20d672"));
            true
        } else {
            self.emit(GameEvent::text(x, y - 10.0, "MAX", "#cccccc"));
            false
        }
    }

    /// A life-costing outcome: absorbed by the shield, otherwise paid.
    fn block_or_lose(&mut self, amount: u32, x: f64, y: f64) {
        if self.shield.is_active() {
            self.cue(Cue::ShieldBlock);
            self.emit(GameEvent::Blocked { x, y });
            self.emit(GameEvent::text(x, y, "BLOCKED", "#64c9ff"));
        } else {
            self.lose_lives(amount, x, y);
        }
    }

    fn bomb_hit(&mut self, id: EntityId, now: f64) {
        let Some((x, y)) = self.entity(id).map(|e| e.rect.center()) else {
            return;
        };
        if !self.detonate(id, now) {
            return;
        }
        let bomb = &self.config.bomb;
        let spared = !self.shield.is_active() && bomb.respect_immunity && self.in_start_immunity(now);
        if spared {
            self.emit(GameEvent::text(x, y + 8.0, "SAFE", "#8ae3ff"));
        } else {
            let cost = bomb.life_cost;
            self.block_or_lose(cost, x, y);
        }
    }

    /// Put an armed bomb into its explosion state. The entity stays in the
    /// field until the explosion finishes.
    pub(crate) fn detonate(&mut self, id: EntityId, now: f64) -> bool {
        let Some(e) = self.entities.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if !e.explode(now) {
            return false;
        }
        let (x, y) = e.rect.center();
        self.cue(Cue::BombExplode);
        self.emit(GameEvent::Ring { x, y, radius: 110.0, color: "rgba(255,90,50,0.55)" });
        self.emit(GameEvent::Burst { x, y, color: "#ff6430", count: 34 });
        self.emit(GameEvent::text(x, y - 12.0, "BOOM!", "#ff8259"));
        true
    }

    // --- Sweep ---------------------------------------------------------------

    /// Drop caught entities, finished explosions, and anything below the
    /// field. Normal blocks and hazards that fell through cost a life.
    pub(crate) fn sweep(&mut self, now: f64) {
        let limit = self.height + self.config.field.exit_margin;
        let explosion_ms = self.config.bomb.explosion_ms;
        let mut missed = Vec::new();
        self.entities.retain(|e| {
            if e.caught {
                return false;
            }
            if e.is_exploding() {
                return !e.explosion_finished(now, explosion_ms);
            }
            if e.rect.y > limit {
                missed.push(*e);
                return false;
            }
            true
        });
        if missed.is_empty() {
            return;
        }
        let excused = self.in_start_immunity(now) || self.boss.is_dying();
        let (px, _) = self.paddle_rect().center();
        let y = self.height - 100.0;
        for e in missed {
            if !self.is_running() {
                break;
            }
            if e.kind == EntityKind::Life {
                self.cue(Cue::LifeMiss);
            } else if e.costs_life_on_miss() && !excused {
                self.block_or_lose(1, px, y);
            }
        }
    }

    // --- Aim rectangle -------------------------------------------------------

    /// Resolve a released aim rectangle against every overlapping entity.
    /// Hazards and snip pickups are left alone; sticky pickups are discarded.
    pub fn release_aim(&mut self, rect: Rect, now: f64) {
        if !self.aim.is_open() {
            return;
        }
        self.aim = AimState::Closed;

        let targets: Vec<(EntityId, EntityKind)> = self
            .entities
            .iter()
            .filter(|e| e.is_collectible() && e.rect.intersects(&rect))
            .filter(|e| {
                !matches!(
                    e.kind,
                    EntityKind::Hazard { .. } | EntityKind::PowerUp(PowerUpKind::Snip)
                )
            })
            .map(|e| (e.id, e.kind))
            .collect();

        let award = self.config.snip.award_per_normal;
        let (mut cleared, mut bombs, mut healed) = (0u32, 0u32, 0u32);
        let mut activate: Vec<PowerUpKind> = Vec::new();
        for (id, kind) in targets {
            match kind {
                EntityKind::Bomb(_) => {
                    if self.detonate(id, now) {
                        bombs += 1;
                    }
                }
                EntityKind::Normal { .. } => {
                    if let Some((x, y)) = self.remove(id) {
                        cleared += 1;
                        self.emit(GameEvent::Burst { x, y, color: "#ff9de0", count: 12 });
                        self.emit(GameEvent::text(x, y, format!("+{award}"), "#ff8ed7"));
                    }
                }
                EntityKind::Life => {
                    if let Some((x, y)) = self.remove(id) {
                        healed += u32::from(self.heal(x, y));
                    }
                }
                EntityKind::PowerUp(PowerUpKind::Sticky) => {
                    self.remove(id);
                }
                EntityKind::PowerUp(p) => {
                    self.remove(id);
                    if !activate.contains(&p) {
                        activate.push(p);
                    }
                }
                EntityKind::Hazard { .. } => {}
            }
        }
        if cleared > 0 {
            self.add_score(award.saturating_mul(cleared));
            self.recompute_spawn_interval();
        }

        let (cx, cy) = rect.center();
        if cleared == 0 && bombs == 0 && healed == 0 && activate.is_empty() {
            self.cue(Cue::SnipEmpty);
            self.emit(GameEvent::AimEmpty);
            self.emit(GameEvent::text(cx, cy, "NO TARGETS", "#bcbcbc"));
        } else {
            self.cue(Cue::SnipCut);
            let radius = (rect.w.max(rect.h) * 0.9).min(260.0);
            self.emit(GameEvent::Ring { x: cx, y: cy, radius, color: "rgba(255,63,177,0.40)" });
            self.emit(GameEvent::AimResolved { cleared, bombs });
        }
        for p in activate {
            self.activate_power_up(p, cx, cy, now);
        }
    }

    fn remove(&mut self, id: EntityId) -> Option<(f64, f64)> {
        let idx = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(idx).rect.center())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::config::{GameConfig, HazardClass};
    use crate::game::entity::{BombState, EntityKind, PowerUpKind, Rect};
    use crate::game::events::{GameEvent, Outcome};
    use crate::game::unlocks::UnlockState;
    use crate::game::{Mode, Run};

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
        Run::new(c, Mode::Standard, UnlockState::default(), 0.0, 1000.0, 800.0, 11)
    }

    /// Drop `kind` straight onto the paddle.
    fn on_paddle(r: &mut Run, kind: EntityKind) -> u64 {
        let p = r.paddle_rect();
        r.place(kind, p.x + 10.0, p.y - 5.0, 0.0)
    }

    #[test]
    fn catch_scores_and_tightens_interval() {
        let mut r = quiet_run();
        r.config.difficulty.base_spawn_interval_ms = 950.0;
        r.config.difficulty.min_spawn_interval_ms = 230.0;
        on_paddle(&mut r, EntityKind::Normal { tier: 0 });
        r.tick(1_000.0);
        assert_eq!(r.score, 1);
        assert!(r.entities.is_empty());
        assert_eq!(r.spawn_interval(), 943.0);
    }

    #[test]
    fn bomb_explodes_in_place_and_costs_a_life() {
        let mut r = quiet_run();
        let id = on_paddle(&mut r, EntityKind::Bomb(BombState::Armed));
        r.tick(1_000.0);
        assert_eq!(r.lives, 4);
        assert!(r.life_ever_lost);
        assert!(r.entity(id).is_some_and(|b| b.is_exploding()));
        r.tick(1_100.0);
        assert_eq!(r.lives, 4, "an exploding bomb never hits twice");
        r.tick(1_620.0);
        assert!(r.entity(id).is_none());
    }

    #[test]
    fn shield_blocks_each_hit_once() {
        let mut r = quiet_run();
        r.shield.extend(0.0, 10_000.0);
        on_paddle(&mut r, EntityKind::Bomb(BombState::Armed));
        on_paddle(&mut r, EntityKind::Hazard { class: HazardClass::Fast, label: 0 });
        r.tick(1_000.0);
        assert_eq!(r.lives, 5);
        let blocked = r
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Blocked { .. }))
            .count();
        assert_eq!(blocked, 2);
    }

    #[test]
    fn respected_immunity_spares_bomb() {
        let mut r = quiet_run();
        r.config.bomb.respect_immunity = true;
        on_paddle(&mut r, EntityKind::Bomb(BombState::Armed));
        r.tick(100.0);
        assert_eq!(r.lives, 5);
    }

    #[test]
    fn life_pickup_heals_up_to_max() {
        let mut r = quiet_run();
        r.lives = 3;
        on_paddle(&mut r, EntityKind::Life);
        r.tick(1_000.0);
        assert_eq!(r.lives, 4);
        r.lives = 5;
        on_paddle(&mut r, EntityKind::Life);
        r.tick(1_016.0);
        assert_eq!(r.lives, 5);
    }

    #[test]
    fn last_life_lost_ends_run_before_later_pickups() {
        let mut r = quiet_run();
        r.lives = 1;
        on_paddle(&mut r, EntityKind::Bomb(BombState::Armed));
        on_paddle(&mut r, EntityKind::Life);
        r.tick(1_000.0);
        assert_eq!(r.lives, 0);
        assert_eq!(r.result().map(|x| x.outcome), Some(Outcome::Defeat));
        let ended = r
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::RunEnded(_)))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn contacts_after_the_killing_blow_are_ignored() {
        let mut r = quiet_run();
        r.config.boss.health = 1;
        r.config.boss.drop_interval_start_ms = 1.0e9;
        r.config.boss.drop_interval_min_ms = 1.0e9;
        r.boss.max_health = 1;
        r.score = 30;
        r.tick(1_000.0);
        assert!(r.boss.is_active());

        on_paddle(&mut r, EntityKind::Hazard { class: HazardClass::Fast, label: 0 });
        on_paddle(&mut r, EntityKind::Hazard { class: HazardClass::Fast, label: 1 });
        r.tick(1_016.0);
        assert!(r.boss.is_dying());
        assert_eq!(r.lives, 5);
        assert!(!r.life_ever_lost);

        let mut ts = 1_016.0;
        while r.result().is_none() && ts < 10_000.0 {
            ts += 16.0;
            r.tick(ts);
        }
        assert_eq!(r.result().map(|x| x.outcome), Some(Outcome::FlawlessVictory));
    }

    #[test]
    fn missed_life_and_power_ups_cost_nothing() {
        let mut r = quiet_run();
        r.place(EntityKind::Life, 100.0, 900.0, 0.0);
        r.place(EntityKind::PowerUp(PowerUpKind::Shield), 200.0, 900.0, 0.0);
        r.place(EntityKind::Bomb(BombState::Armed), 300.0, 900.0, 0.0);
        r.tick(1_000.0);
        assert!(r.entities.is_empty());
        assert_eq!(r.lives, 5);
    }

    #[test]
    fn misses_inside_start_immunity_are_free() {
        let mut r = quiet_run();
        r.place(EntityKind::Normal { tier: 0 }, 100.0, 900.0, 0.0);
        r.tick(200.0);
        assert_eq!(r.lives, 5);
        r.place(EntityKind::Normal { tier: 0 }, 100.0, 900.0, 0.0);
        r.tick(400.0);
        assert_eq!(r.lives, 4);
    }

    #[test]
    fn aim_sweep_skips_hazards_and_discards_sticky() {
        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        let hz = r.place(
            EntityKind::Hazard { class: HazardClass::Extreme, label: 3 },
            100.0,
            100.0,
            0.0,
        );
        r.place(EntityKind::PowerUp(PowerUpKind::Sticky), 300.0, 100.0, 0.0);
        r.release_aim(Rect::new(0.0, 0.0, 1000.0, 500.0), 10.0);
        assert!(r.entity(hz).is_some());
        assert_eq!(r.entities.len(), 1);
        assert!(!r.sticky.is_active());
        assert!(r.drain_events().contains(&GameEvent::AimEmpty));
    }

    #[test]
    fn aim_sweep_activates_swept_shield() {
        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        r.place(EntityKind::PowerUp(PowerUpKind::Shield), 300.0, 100.0, 0.0);
        r.release_aim(Rect::new(250.0, 50.0, 200.0, 200.0), 10.0);
        assert!(r.shield.is_active());
        assert!(r.entities.is_empty());
    }

    #[test]
    fn paddle_is_ignored_while_aiming() {
        let mut r = quiet_run();
        r.activate_power_up(PowerUpKind::Snip, 0.0, 0.0, 0.0);
        on_paddle(&mut r, EntityKind::Normal { tier: 0 });
        r.tick(1_000.0);
        assert_eq!(r.score, 0);
        assert_eq!(r.entities.len(), 1);
    }
}
