//! Declarative tunables for every entity kind plus the global difficulty curve.
//!
//! Defaults mirror the shipped tuning. Any section may be overridden from JSON
//! (`GameConfig::from_json`); omitted keys keep their default value.

use serde::{Deserialize, Serialize};

use super::error::GameError;

// --- Shared spawn schedule ---------------------------------------------------

/// Timer tunables shared by every scheduled kind (bombs and power-ups).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnSchedule {
    pub enabled: bool,
    pub initial_delay_ms: f64,  // delay before the first spawn of a run
    pub base_interval_ms: f64,  // interval at score 0
    pub min_interval_ms: f64,   // floor reached at `decay_score`
    pub decay_score: f64,       // score at which the floor is reached
    pub jitter_ms: f64,         // uniform [0, jitter] added per cycle
    pub backfill: bool,         // compress missed cycles after a long gap
    pub backfill_cap: u32,      // max cycles performed in one catch-up
    pub max_concurrent: usize,  // live-entity cap for this kind
}

impl Default for SpawnSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 20_000.0,
            base_interval_ms: 30_000.0,
            min_interval_ms: 12_000.0,
            decay_score: 200.0,
            jitter_ms: 7_000.0,
            backfill: true,
            backfill_cap: 3,
            max_concurrent: 1,
        }
    }
}

impl SpawnSchedule {
    fn validate(&self, name: &str) -> Result<(), GameError> {
        if !self.enabled {
            return Ok(());
        }
        if self.min_interval_ms <= 0.0 || self.min_interval_ms > self.base_interval_ms {
            return Err(GameError::InvalidConfig(format!(
                "{name}: need 0 < minIntervalMs <= baseIntervalMs"
            )));
        }
        if self.jitter_ms < 0.0 || self.initial_delay_ms < 0.0 {
            return Err(GameError::InvalidConfig(format!(
                "{name}: jitter and initial delay must be non-negative"
            )));
        }
        if self.max_concurrent == 0 {
            return Err(GameError::InvalidConfig(format!("{name}: maxConcurrent must be >= 1")));
        }
        Ok(())
    }
}

// --- Global sections ---------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DifficultyConfig {
    pub base_spawn_interval_ms: f64,
    pub min_spawn_interval_ms: f64,
    pub spawn_reduction_per_point: f64,
    pub base_speed_range: (f64, f64), // px/s before tier and score scaling
    pub speed_per_point: f64,
    pub max_speed_multiplier: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    pub paddle_edge_margin: f64,
    pub paddle_nudge: f64, // keyboard step in px
    pub lives: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            base_spawn_interval_ms: 950.0,
            min_spawn_interval_ms: 230.0,
            spawn_reduction_per_point: 7.0,
            base_speed_range: (140.0, 260.0),
            speed_per_point: 0.02,
            max_speed_multiplier: 12.0,
            paddle_width: 150.0,
            paddle_height: 18.0,
            paddle_edge_margin: 32.0,
            paddle_nudge: 55.0,
            lives: 5,
        }
    }
}

/// Playfield geometry that is not tied to one entity kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldConfig {
    pub paddle_bottom_offset: f64, // paddle top = height - offset
    pub exit_margin: f64,          // entities below height + margin are gone
    pub spawn_side_margin: f64,    // boss hazards keep twice this
    pub max_step_ms: f64,          // motion simulated by one frame at most
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            paddle_bottom_offset: 90.0,
            exit_margin: 60.0,
            spawn_side_margin: 40.0,
            max_step_ms: 250.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeConfig {
    pub normal_interval: u32,   // score multiple that drops a pickup
    pub infinite_interval: u32, // same, in infinite mode
    pub size: f64,
    pub speed_multiplier: f64,  // relative to the top of base_speed_range
    pub max_lives: u32,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            normal_interval: 25,
            infinite_interval: 50,
            size: 40.0,
            speed_multiplier: 4.2,
            max_lives: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BombConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub life_cost: u32,
    pub respect_immunity: bool,
    pub burst_chance_base: f64,
    pub burst_chance_boost: f64, // added on top of base, scaled by score ramp
    pub burst_score_ramp: f64,
    pub burst_max_extra: u32,
    pub explosion_ms: f64,
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule {
                enabled: true,
                initial_delay_ms: 4_000.0,
                base_interval_ms: 4_800.0,
                min_interval_ms: 1_400.0,
                decay_score: 60.0,
                jitter_ms: 1_400.0,
                backfill: true,
                backfill_cap: 4,
                max_concurrent: 4,
            },
            size: 50.0,
            speed_range: (180.0, 900.0),
            life_cost: 1,
            respect_immunity: false,
            burst_chance_base: 0.80,
            burst_chance_boost: 0.30,
            burst_score_ramp: 120.0,
            burst_max_extra: 2,
            explosion_ms: 620.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnipConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub aim_timeout_ms: f64,
    pub award_per_normal: u32,
    pub min_drag: f64, // both rectangle sides must exceed this to resolve
}

impl Default for SnipConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule::default(),
            size: 30.0,
            speed_range: (140.0, 260.0),
            aim_timeout_ms: 6_500.0,
            award_per_normal: 1,
            min_drag: 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShieldConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub duration_ms: f64,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule {
                initial_delay_ms: 30_000.0,
                base_interval_ms: 40_000.0,
                min_interval_ms: 15_000.0,
                decay_score: 300.0,
                jitter_ms: 10_000.0,
                ..SpawnSchedule::default()
            },
            size: 34.0,
            speed_range: (150.0, 280.0),
            duration_ms: 5_000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskManagerConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub award_per_normal: u32,
    pub slow_mo_factor: f64,
    pub slow_mo_ms: f64,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule {
                initial_delay_ms: 48_000.0,
                base_interval_ms: 60_000.0,
                min_interval_ms: 30_000.0,
                decay_score: 400.0,
                jitter_ms: 15_000.0,
                backfill_cap: 2,
                ..SpawnSchedule::default()
            },
            size: 50.0,
            speed_range: (130.0, 240.0),
            award_per_normal: 1,
            slow_mo_factor: 0.55,
            slow_mo_ms: 900.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundwaveConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub pulses: u32,
    pub pulse_interval_ms: f64,
    pub first_radius: f64,
    pub radius_growth: f64,
    pub award_per_normal: u32,
    pub slow_mo_factor: f64,
    pub slow_mo_ms: f64,
}

impl Default for SoundwaveConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule {
                initial_delay_ms: 26_000.0,
                base_interval_ms: 34_000.0,
                min_interval_ms: 13_000.0,
                decay_score: 240.0,
                jitter_ms: 8_000.0,
                backfill_cap: 2,
                ..SpawnSchedule::default()
            },
            size: 34.0,
            speed_range: (150.0, 260.0),
            pulses: 3,
            pulse_interval_ms: 260.0,
            first_radius: 140.0,
            radius_growth: 160.0,
            award_per_normal: 1,
            slow_mo_factor: 0.7,
            slow_mo_ms: 1_000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StickyConfig {
    pub spawn: SpawnSchedule,
    pub size: f64,
    pub speed_range: (f64, f64),
    pub duration_ms: f64,
}

impl Default for StickyConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnSchedule {
                initial_delay_ms: 8_000.0,
                base_interval_ms: 9_000.0,
                min_interval_ms: 3_500.0,
                decay_score: 120.0,
                jitter_ms: 3_000.0,
                max_concurrent: 2,
                ..SpawnSchedule::default()
            },
            size: 250.0,
            speed_range: (1_200.0, 2_000.0),
            duration_ms: 1_000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BossConfig {
    pub trigger_score: u32,
    pub health: u32,
    pub width: f64,
    pub height: f64,
    pub top_y: f64,
    pub move_amplitude: f64,
    pub move_speed: f64, // radians per second of the sinusoidal path
    pub drop_interval_start_ms: f64,
    pub drop_interval_min_ms: f64,
    pub drop_reduce_every: u32, // cumulative damage step that tightens drops
    pub drop_reduce_ms: f64,
    pub drop_speed_range: (f64, f64),
    pub damage_per_catch: u32,
    pub death_duration_ms: f64,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            trigger_score: 30,
            health: 60,
            width: 420.0,
            height: 76.0,
            top_y: 80.0,
            move_amplitude: 280.0,
            move_speed: 0.55,
            drop_interval_start_ms: 820.0,
            drop_interval_min_ms: 320.0,
            drop_reduce_every: 10,
            drop_reduce_ms: 50.0,
            drop_speed_range: (260.0, 900.0),
            damage_per_catch: 1,
            death_duration_ms: 1_600.0,
        }
    }
}

// --- Tables ------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardClass {
    Fast,
    Extreme,
}

impl HazardClass {
    pub fn speed_factor(self) -> f64 {
        match self {
            HazardClass::Fast => 1.0,
            HazardClass::Extreme => 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HazardDesc {
    pub label: String,
    pub class: HazardClass,
    pub color: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTier {
    pub label: String,
    pub speed_factor: f64,
    pub text_color: String,
}

/// localStorage keys; opaque to the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
    pub high_score: String,
    pub infinite: String,
    pub soundwave: String,
    pub sticky: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            high_score: "defendUpdatesHighScore_modular".into(),
            infinite: "defendUpdatesInfinite".into(),
            soundwave: "defendUpdatesSoundwaveUnlocked".into(),
            sticky: "defendUpdatesStickyUnlocked".into(),
        }
    }
}

fn hazard(label: &str, class: HazardClass, color: &str, text: &str) -> HazardDesc {
    HazardDesc { label: label.into(), class, color: color.into(), text: text.into() }
}

fn tier(label: &str, speed_factor: f64, text_color: &str) -> SizeTier {
    SizeTier { label: label.into(), speed_factor, text_color: text_color.into() }
}

fn default_hazards() -> Vec<HazardDesc> {
    use HazardClass::*;
    vec![
        hazard("inconsistent design", Fast, "#ffbf3c", "#2c1b00"),
        hazard("forced updates", Fast, "#ff6b2d", "#2c1300"),
        hazard("bsod", Fast, "#1e90ff", "#ffffff"),
        hazard("ai crap", Extreme, "#b800ff", "#ffffff"),
        hazard("bad troubleshooter", Fast, "#ff4d6d", "#2c000b"),
        hazard("bad search function", Extreme, "#ff2f2f", "#2c0000"),
        hazard("edge browser", Extreme, "#00c17c", "#003524"),
        hazard("ads", Extreme, "#ff9f00", "#241400"),
        hazard("telemetry", Fast, "#74c0ff", "#071d2a"),
        hazard("bing", Fast, "#00b2ff", "#002333"),
    ]
}

fn default_tiers() -> Vec<SizeTier> {
    vec![
        tier("-4KB", 1.55, "#ffb347"),
        tier("-16KB", 1.42, "#ffd257"),
        tier("-64KB", 1.30, "#9ad42f"),
        tier("-256KB", 1.18, "#36c6ff"),
        tier("-1MB", 1.05, "#1e90ff"),
        tier("-16MB", 0.95, "#5b6cff"),
        tier("-128MB", 0.88, "#aa5bff"),
        tier("-1GB", 0.80, "#ff59c7"),
        tier("-5GB", 0.72, "#ff4d6d"),
    ]
}

// --- Root --------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub difficulty: DifficultyConfig,
    pub field: FieldConfig,
    pub life: LifeConfig,
    pub bomb: BombConfig,
    pub snip: SnipConfig,
    pub shield: ShieldConfig,
    pub task_manager: TaskManagerConfig,
    pub soundwave: SoundwaveConfig,
    pub sticky: StickyConfig,
    pub boss: BossConfig,
    pub hazards: Vec<HazardDesc>,
    pub size_tiers: Vec<SizeTier>,
    pub storage_keys: StorageKeys,
    /// A win with any life lost is turned into the defeat branch.
    pub require_perfect_victory: bool,
    pub start_immunity_ms: f64,
    pub sticky_score_unlock: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyConfig::default(),
            field: FieldConfig::default(),
            life: LifeConfig::default(),
            bomb: BombConfig::default(),
            snip: SnipConfig::default(),
            shield: ShieldConfig::default(),
            task_manager: TaskManagerConfig::default(),
            soundwave: SoundwaveConfig::default(),
            sticky: StickyConfig::default(),
            boss: BossConfig::default(),
            hazards: default_hazards(),
            size_tiers: default_tiers(),
            storage_keys: StorageKeys::default(),
            require_perfect_victory: false,
            start_immunity_ms: 300.0,
            sticky_score_unlock: 500,
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON override and validate the result.
    /// The override is layered onto the defaults object by object, so a
    /// nested section keeps its own tuned values for keys it omits.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let patch: serde_json::Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(GameConfig::default())?;
        merge_json(&mut merged, patch);
        let cfg: GameConfig = serde_json::from_value(merged)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        let d = &self.difficulty;
        if d.min_spawn_interval_ms <= 0.0 || d.min_spawn_interval_ms > d.base_spawn_interval_ms {
            return Err(GameError::InvalidConfig(
                "difficulty: need 0 < minSpawnIntervalMs <= baseSpawnIntervalMs".into(),
            ));
        }
        if d.base_speed_range.0 > d.base_speed_range.1 || d.base_speed_range.0 < 0.0 {
            return Err(GameError::InvalidConfig("difficulty: bad baseSpeedRange".into()));
        }
        if d.max_speed_multiplier < 1.0 {
            return Err(GameError::InvalidConfig(
                "difficulty: maxSpeedMultiplier must be >= 1".into(),
            ));
        }
        if d.paddle_width <= 0.0 || d.paddle_height <= 0.0 || d.lives == 0 {
            return Err(GameError::InvalidConfig(
                "difficulty: paddle size and lives must be positive".into(),
            ));
        }
        if self.life.max_lives < d.lives {
            return Err(GameError::InvalidConfig("life: maxLives below starting lives".into()));
        }
        for (name, factor) in [
            ("taskManager", self.task_manager.slow_mo_factor),
            ("soundwave", self.soundwave.slow_mo_factor),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(GameError::InvalidConfig(format!(
                    "{name}: slowMoFactor must lie in (0, 1]"
                )));
            }
        }
        if self.boss.health == 0 || self.boss.damage_per_catch == 0 {
            return Err(GameError::InvalidConfig("boss: health and damage must be positive".into()));
        }
        if self.boss.drop_interval_min_ms > self.boss.drop_interval_start_ms {
            return Err(GameError::InvalidConfig(
                "boss: dropIntervalMinMs above dropIntervalStartMs".into(),
            ));
        }
        self.bomb.spawn.validate("bomb")?;
        self.snip.spawn.validate("snip")?;
        self.shield.spawn.validate("shield")?;
        self.task_manager.spawn.validate("taskManager")?;
        self.soundwave.spawn.validate("soundwave")?;
        self.sticky.spawn.validate("sticky")?;
        Ok(())
    }
}

/// Objects merge key by key; arrays and scalars replace.
fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
