//! Score-driven curves shared by every scheduler.

use super::config::DifficultyConfig;

/// `base - (base - min) * min(1, score / decay_score)`, always inside
/// `[min, base]`. A non-positive `decay_score` jumps straight to the floor.
pub fn decayed_interval(base: f64, min: f64, decay_score: f64, score: u32) -> f64 {
    let ratio = if decay_score > 0.0 {
        (score as f64 / decay_score).min(1.0)
    } else {
        1.0
    };
    (base - (base - min) * ratio).clamp(min.min(base), base)
}

/// Interval between normal-block spawns; drops linearly per point down to the floor.
pub fn normal_spawn_interval(cfg: &DifficultyConfig, score: u32) -> f64 {
    (cfg.base_spawn_interval_ms - score as f64 * cfg.spawn_reduction_per_point)
        .max(cfg.min_spawn_interval_ms)
}

/// Fall-speed multiplier for normal blocks, capped at `max_speed_multiplier`.
pub fn speed_multiplier(cfg: &DifficultyConfig, score: u32) -> f64 {
    (1.0 + score as f64 * cfg.speed_per_point).clamp(1.0, cfg.max_speed_multiplier.max(1.0))
}

/// Probability of each extra bomb in a burst, clamped into [0, 1].
pub fn burst_chance(base: f64, boost: f64, ramp_score: f64, score: u32) -> f64 {
    let ratio = (score as f64 / ramp_score.max(1.0)).min(1.0);
    (base + ratio * boost).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_stays_in_bounds_and_never_rises() {
        let mut prev = f64::INFINITY;
        for score in 0..500 {
            let i = decayed_interval(4800.0, 1400.0, 60.0, score);
            assert!((1400.0..=4800.0).contains(&i), "score {score} gave {i}");
            assert!(i <= prev);
            prev = i;
        }
        assert_eq!(decayed_interval(4800.0, 1400.0, 60.0, 60), 1400.0);
        assert_eq!(decayed_interval(4800.0, 1400.0, 60.0, 0), 4800.0);
    }

    #[test]
    fn zero_decay_score_hits_floor() {
        assert_eq!(decayed_interval(100.0, 10.0, 0.0, 0), 10.0);
    }

    #[test]
    fn normal_interval_floors() {
        let cfg = DifficultyConfig::default();
        assert_eq!(normal_spawn_interval(&cfg, 0), 950.0);
        assert_eq!(normal_spawn_interval(&cfg, 10), 880.0);
        assert_eq!(normal_spawn_interval(&cfg, 1000), 230.0);
    }

    #[test]
    fn speed_never_decreases_and_caps() {
        let cfg = DifficultyConfig::default();
        let mut prev = 0.0;
        for score in 0..2000 {
            let m = speed_multiplier(&cfg, score);
            assert!(m >= prev);
            assert!(m <= cfg.max_speed_multiplier);
            prev = m;
        }
    }

    #[test]
    fn burst_chance_clamps() {
        assert_eq!(burst_chance(0.8, 0.3, 120.0, 1000), 1.0);
        assert!((burst_chance(0.8, 0.3, 120.0, 0) - 0.8).abs() < 1e-9);
        assert_eq!(burst_chance(-1.0, 0.0, 0.0, 0), 0.0);
    }
}
