// Browser-only checks; run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn malformed_config_is_rejected_before_start() {
    assert!(defend_updates::start_game_with_config("{").is_err());
    assert!(defend_updates::take_run_result().is_none());
}

#[wasm_bindgen_test]
fn infinite_mode_refuses_fresh_profile() {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.clear();
    }
    assert!(defend_updates::start_infinite_game().is_err());
}

#[wasm_bindgen_test]
fn standard_run_exposes_hud() {
    defend_updates::start_game().expect("standard run starts");
    let hud = defend_updates::hud_snapshot().expect("hud available");
    assert!(hud.contains("\"score\":0"));
    defend_updates::exit_game();
}
