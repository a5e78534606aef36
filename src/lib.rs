//! Defend Updates core crate.
//!
//! A canvas arcade game: catch falling "update" blocks with a paddle, use
//! power-ups, and survive the forced-update boss. The simulation in [`game`]
//! is host-independent and driven by explicit millisecond timestamps; the
//! private `web` module wires it to a browser canvas.

use wasm_bindgen::prelude::*;

pub mod game;
mod web;

pub use game::config::GameConfig;
pub use game::error::GameError;
pub use game::events::{Cue, GameEvent, Outcome, RunResult};
pub use game::session::Session;
pub use game::unlocks::{MemoryStore, UnlockState, UnlockStore};
pub use game::{Hud, Mode, Run, RunState};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// -----------------------------------------------------------------------------
// JS entrypoints
// -----------------------------------------------------------------------------

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    web::start(Mode::Standard, None)
}

/// Fails with a readable message until infinite mode has been unlocked.
#[wasm_bindgen]
pub fn start_infinite_game() -> Result<(), JsValue> {
    web::start(Mode::Infinite, None)
}

/// Start a standard run with a JSON config override (camelCase keys, any
/// subset of fields).
#[wasm_bindgen]
pub fn start_game_with_config(json: &str) -> Result<(), JsValue> {
    let config = GameConfig::from_json(json)?;
    web::start(Mode::Standard, Some(config))
}

#[wasm_bindgen]
pub fn exit_game() {
    web::exit();
}

/// JSON `{"outcome", "score", "newHighScore"}` of the last finished run,
/// returned once.
#[wasm_bindgen]
pub fn take_run_result() -> Option<String> {
    web::take_result().and_then(|r| serde_json::to_string(&r).ok())
}

#[wasm_bindgen]
pub fn hud_snapshot() -> Option<String> {
    web::hud().and_then(|h| serde_json::to_string(&h).ok())
}
