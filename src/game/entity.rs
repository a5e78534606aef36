//! Falling objects. One closed enum discriminates every kind; kind-specific
//! state (bomb explosion, hazard class, size tier) rides in the variant.

use super::config::HazardClass;

/// Axis-aligned rectangle in canvas pixels (origin top-left).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build from two drag corners in any order.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            w: (bx - ax).abs(),
            h: (by - ay).abs(),
        }
    }

    /// Inclusive overlap: touching edges count as a hit.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.x + self.w
            || other.x + other.w < self.x
            || other.y > self.y + self.h
            || other.y + other.h < self.y)
    }

    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Explosion sub-state of a bomb. Exploding bombs stop falling and can no
/// longer be collected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BombState {
    Armed,
    Exploding { since: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    Shield,
    TaskManager,
    Soundwave,
    Snip,
    Sticky,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntityKind {
    Normal { tier: usize },
    Hazard { class: HazardClass, label: usize },
    Bomb(BombState),
    Life,
    PowerUp(PowerUpKind),
}

/// Kinds driven by an interval timer (normal blocks and life pickups use
/// their own rules).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnKind {
    Bomb,
    PowerUp(PowerUpKind),
}

impl SpawnKind {
    pub const ALL: [SpawnKind; 6] = [
        SpawnKind::Bomb,
        SpawnKind::PowerUp(PowerUpKind::Snip),
        SpawnKind::PowerUp(PowerUpKind::Shield),
        SpawnKind::PowerUp(PowerUpKind::TaskManager),
        SpawnKind::PowerUp(PowerUpKind::Soundwave),
        SpawnKind::PowerUp(PowerUpKind::Sticky),
    ];

    pub fn index(self) -> usize {
        match self {
            SpawnKind::Bomb => 0,
            SpawnKind::PowerUp(PowerUpKind::Snip) => 1,
            SpawnKind::PowerUp(PowerUpKind::Shield) => 2,
            SpawnKind::PowerUp(PowerUpKind::TaskManager) => 3,
            SpawnKind::PowerUp(PowerUpKind::Soundwave) => 4,
            SpawnKind::PowerUp(PowerUpKind::Sticky) => 5,
        }
    }
}

pub type EntityId = u64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub rect: Rect,
    pub speed: f64,       // px per simulated second
    pub created_at: f64,  // run clock, ms
    pub caught: bool,     // collected this frame; swept at frame end
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, rect: Rect, speed: f64, created_at: f64) -> Self {
        Self { id, kind, rect, speed, created_at, caught: false }
    }

    /// Move down by `speed * dt`. Exploding bombs hold position.
    pub fn advance(&mut self, dt_secs: f64) {
        if !self.is_exploding() {
            self.rect.y += self.speed * dt_secs;
        }
    }

    pub fn is_exploding(&self) -> bool {
        matches!(self.kind, EntityKind::Bomb(BombState::Exploding { .. }))
    }

    /// Live, uncaught, and not mid-explosion.
    pub fn is_collectible(&self) -> bool {
        !self.caught && !self.is_exploding()
    }

    /// Push an armed bomb into its explosion sub-state. Returns false for
    /// anything else, including a bomb that is already exploding.
    pub fn explode(&mut self, now: f64) -> bool {
        match self.kind {
            EntityKind::Bomb(BombState::Armed) => {
                self.kind = EntityKind::Bomb(BombState::Exploding { since: now });
                true
            }
            _ => false,
        }
    }

    pub fn explosion_finished(&self, now: f64, duration_ms: f64) -> bool {
        match self.kind {
            EntityKind::Bomb(BombState::Exploding { since }) => now - since >= duration_ms,
            _ => false,
        }
    }

    /// Which scheduler cap this entity counts against, if any.
    pub fn spawn_kind(&self) -> Option<SpawnKind> {
        match self.kind {
            EntityKind::Bomb(_) => Some(SpawnKind::Bomb),
            EntityKind::PowerUp(p) => Some(SpawnKind::PowerUp(p)),
            _ => None,
        }
    }

    /// True for kinds whose fall-through costs a life.
    pub fn costs_life_on_miss(&self) -> bool {
        matches!(self.kind, EntityKind::Normal { .. } | EntityKind::Hazard { .. })
    }
}
