//! Cosmetic effects fed by drained `GameEvent`s. Pure bookkeeping; drawing
//! happens in `render`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::events::GameEvent;
use crate::game::unlocks::Unlock;

const MAX_PARTICLES: usize = 1600;
const MAX_TEXTS: usize = 180;

pub struct FloatText {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: &'static str,
    pub born: f64,
    pub life_ms: f64,
}

pub struct RingPulse {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: &'static str,
    pub born: f64,
    pub life_ms: f64,
}

pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub color: &'static str,
    pub born: f64,
    pub life_ms: f64,
}

pub struct Fx {
    pub texts: Vec<FloatText>,
    pub rings: Vec<RingPulse>,
    pub particles: Vec<Particle>,
    shake: Option<(f64, f64, f64)>, // start, intensity, duration
    flash: Option<(&'static str, f64)>,
    rng: StdRng,
}

impl Fx {
    pub fn new(seed: u64) -> Self {
        Self {
            texts: Vec::new(),
            rings: Vec::new(),
            particles: Vec::new(),
            shake: None,
            flash: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn clear(&mut self) {
        self.texts.clear();
        self.rings.clear();
        self.particles.clear();
        self.shake = None;
        self.flash = None;
    }

    /// Take the cosmetic events; the rest are ignored here.
    pub fn absorb(&mut self, events: &[GameEvent], now: f64, width: f64, height: f64) {
        for ev in events {
            match ev {
                GameEvent::FloatText { x, y, text, color } => self.text(*x, *y, text.clone(), *color, now),
                GameEvent::Ring { x, y, radius, color } => self.rings.push(RingPulse {
                    x: *x,
                    y: *y,
                    radius: *radius,
                    color: *color,
                    born: now,
                    life_ms: 650.0,
                }),
                GameEvent::Burst { x, y, color, count } => self.burst(*x, *y, *color, *count, now),
                GameEvent::Shake { intensity, duration_ms } => {
                    self.shake = Some((now, *intensity, *duration_ms));
                }
                GameEvent::Flash { color } => self.flash = Some((*color, now)),
                GameEvent::Unlocked(u) => {
                    let label = match u {
                        Unlock::Infinite => "INFINITE MODE UNLOCKED!",
                        Unlock::Soundwave => "SOUNDWAVE UNLOCKED!",
                        Unlock::Sticky => "STICKY KEYS UNLOCKED!",
                    };
                    self.text(width / 2.0, height * 0.3, label.to_string(), "#ffccff", now);
                }
                _ => {}
            }
        }
    }

    fn text(&mut self, x: f64, y: f64, text: String, color: &'static str, now: f64) {
        if self.texts.len() >= MAX_TEXTS {
            self.texts.remove(0);
        }
        self.texts.push(FloatText { x, y, text, color, born: now, life_ms: 900.0 });
    }

    fn burst(&mut self, x: f64, y: f64, color: &'static str, count: u32, now: f64) {
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            let ang = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let spd = self.rng.gen_range(60.0..180.0);
            let lift = self.rng.gen_range(20.0..60.0);
            self.particles.push(Particle {
                x,
                y,
                vx: ang.cos() * spd,
                vy: ang.sin() * spd - lift,
                size: self.rng.gen_range(3.0..7.0),
                color,
                born: now,
                life_ms: self.rng.gen_range(550.0..900.0),
            });
        }
    }

    /// Move particles by `dt` seconds and drop anything past its lifetime.
    pub fn update(&mut self, now: f64, dt: f64) {
        for p in &mut self.particles {
            p.x += p.vx * dt;
            p.y += p.vy * dt;
            p.vy += 240.0 * dt;
        }
        self.particles.retain(|p| now - p.born < p.life_ms);
        self.texts.retain(|t| now - t.born < t.life_ms);
        self.rings.retain(|r| now - r.born < r.life_ms);
        if self.shake.is_some_and(|(start, _, dur)| now - start >= dur) {
            self.shake = None;
        }
        if self.flash.is_some_and(|(_, start)| now - start >= 180.0) {
            self.flash = None;
        }
    }

    /// Damped random offset for the current frame.
    pub fn shake_offset(&mut self, now: f64) -> (f64, f64) {
        match self.shake {
            Some((start, intensity, dur)) if dur > 0.0 => {
                let j = intensity * (1.0 - (now - start) / dur).max(0.0);
                (self.rng.gen_range(-1.0..=1.0) * j, self.rng.gen_range(-1.0..=1.0) * j)
            }
            _ => (0.0, 0.0),
        }
    }

    pub fn flash(&self) -> Option<&'static str> {
        self.flash.map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_respect_particle_cap() {
        let mut fx = Fx::new(1);
        let ev = GameEvent::Burst { x: 0.0, y: 0.0, color: "#fff", count: 1000 };
        fx.absorb(&[ev.clone(), ev], 0.0, 800.0, 600.0);
        assert_eq!(fx.particles.len(), MAX_PARTICLES);
    }

    #[test]
    fn everything_expires() {
        let mut fx = Fx::new(2);
        fx.absorb(
            &[
                GameEvent::text(1.0, 1.0, "+1", "#fff"),
                GameEvent::Ring { x: 0.0, y: 0.0, radius: 10.0, color: "#fff" },
                GameEvent::Burst { x: 0.0, y: 0.0, color: "#fff", count: 5 },
                GameEvent::Shake { intensity: 4.0, duration_ms: 100.0 },
            ],
            0.0,
            800.0,
            600.0,
        );
        fx.update(5_000.0, 0.016);
        assert!(fx.texts.is_empty() && fx.rings.is_empty() && fx.particles.is_empty());
        assert_eq!(fx.shake_offset(5_000.0), (0.0, 0.0));
    }
}
