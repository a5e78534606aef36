//! Fire-and-forget outputs of a tick. The core only pushes these; the shell
//! drains them after each frame and maps them to sound, particles and text.

use serde::Serialize;

use super::unlocks::Unlock;

/// Symbolic audio cue names. The shell owns the actual files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    Catch,
    LifeLost,
    LifeGain,
    LifeMiss,
    BombSpawn,
    BombExplode,
    ShieldSpawn,
    ShieldPickup,
    ShieldBlock,
    ShieldExpire,
    TaskManagerSpawn,
    TaskManagerPickup,
    SoundwaveSpawn,
    SoundwavePickup,
    SoundwavePulse,
    SnipSpawn,
    SnipPickup,
    SnipCut,
    SnipEmpty,
    SnipCancel,
    StickySpawn,
    StickyPickup,
    StickyEnd,
    BossSpawn,
    BossHit,
    BossHazardDrop,
    BossDefeated,
    Victory,
    Defeat,
}

impl Cue {
    pub fn name(self) -> &'static str {
        match self {
            Cue::Catch => "catch",
            Cue::LifeLost => "lifeLost",
            Cue::LifeGain => "lifeGain",
            Cue::LifeMiss => "lifeMiss",
            Cue::BombSpawn => "bombSpawn",
            Cue::BombExplode => "bombExplode",
            Cue::ShieldSpawn => "shieldSpawn",
            Cue::ShieldPickup => "shieldPickup",
            Cue::ShieldBlock => "shieldBlock",
            Cue::ShieldExpire => "shieldExpire",
            Cue::TaskManagerSpawn => "taskmgrSpawn",
            Cue::TaskManagerPickup => "taskmgrPickup",
            Cue::SoundwaveSpawn => "soundwaveSpawn",
            Cue::SoundwavePickup => "soundwavePickup",
            Cue::SoundwavePulse => "soundwavePulse",
            Cue::SnipSpawn => "snipSpawn",
            Cue::SnipPickup => "snipPickup",
            Cue::SnipCut => "snipCut",
            Cue::SnipEmpty => "snipEmpty",
            Cue::SnipCancel => "snipCancel",
            Cue::StickySpawn => "stickySpawn",
            Cue::StickyPickup => "stickyPickup",
            Cue::StickyEnd => "stickyEnd",
            Cue::BossSpawn => "bossSpawn",
            Cue::BossHit => "bossHit",
            Cue::BossHazardDrop => "bossHazardDrop",
            Cue::BossDefeated => "bossDefeated",
            Cue::Victory => "victory",
            Cue::Defeat => "defeat",
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Victory,
    FlawlessVictory,
    Defeat,
    InfiniteRunEnded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub outcome: Outcome,
    pub score: u32,
    pub new_high_score: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Cue(Cue),
    FloatText { x: f64, y: f64, text: String, color: &'static str },
    Ring { x: f64, y: f64, radius: f64, color: &'static str },
    Burst { x: f64, y: f64, color: &'static str, count: u32 },
    Shake { intensity: f64, duration_ms: f64 },
    Flash { color: &'static str },
    /// A life-costing collision or miss absorbed by the shield.
    Blocked { x: f64, y: f64 },
    LifeLost { lives_left: u32 },
    AimResolved { cleared: u32, bombs: u32 },
    AimEmpty,
    Unlocked(Unlock),
    RunEnded(RunResult),
}

impl GameEvent {
    pub fn text(x: f64, y: f64, text: impl Into<String>, color: &'static str) -> Self {
        GameEvent::FloatText { x, y, text: text.into(), color }
    }
}
