//! Browser shell: canvas setup, input listeners, the animation-frame loop and
//! audio cues. All gameplay lives in `crate::game`; this module only feeds it
//! timestamps and input and draws the result.

mod fx;
mod render;
mod storage;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlAudioElement, HtmlCanvasElement, window};

use crate::game::config::GameConfig;
use crate::game::events::{Cue, GameEvent, RunResult};
use crate::game::session::Session;
use crate::game::{Hud, Mode, RunState};

use fx::Fx;
use storage::LocalStorageStore;

macro_rules! console_log {
    ($($t:tt)*) => {
        web_sys::console::log_1(&format!($($t)*).into());
    }
}

const CANVAS_ID: &str = "du-canvas";

struct WebState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    session: Session<LocalStorageStore>,
    fx: Fx,
    loop_active: bool,
    muted: bool,
}

thread_local! {
    static WEB_STATE: RefCell<Option<WebState>> = const { RefCell::new(None) };
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

// --- Entry ------------------------------------------------------------------

/// Start (or restart) a run. A supplied config replaces the session, which
/// also re-reads persisted unlocks under that config's storage keys.
pub fn start(mode: Mode, config: Option<GameConfig>) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let first = WEB_STATE.with(|cell| cell.borrow().is_none());
    if first {
        let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
            el.dyn_into()?
        } else {
            let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
            c.set_id(CANVAS_ID);
            c.set_attribute("style", "position:fixed; left:0; top:0; display:block; background:#10131a; cursor:crosshair;")
                .ok();
            doc.body()
                .ok_or_else(|| JsValue::from_str("no body"))?
                .append_child(&c)?;
            c
        };
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;
        let cfg = config.clone().unwrap_or_default();
        let store = LocalStorageStore::new(cfg.storage_keys.clone());
        bind_listeners(&canvas)?;
        WEB_STATE.with(|cell| {
            *cell.borrow_mut() = Some(WebState {
                canvas,
                ctx,
                session: Session::new(cfg, store),
                fx: Fx::new(seed()),
                loop_active: false,
                muted: false,
            });
        });
    }

    let (w, h) = viewport();
    let now = performance_now();
    let need_loop = WEB_STATE.with(|cell| -> Result<bool, JsValue> {
        let mut guard = cell.borrow_mut();
        let st = guard.as_mut().ok_or_else(|| JsValue::from_str("no state"))?;
        if let (false, Some(cfg)) = (first, config) {
            let store = LocalStorageStore::new(cfg.storage_keys.clone());
            st.session = Session::new(cfg, store);
        }
        st.canvas.set_width(w as u32);
        st.canvas.set_height(h as u32);
        st.fx.clear();
        st.session.start(mode, now, w, h, seed())?;
        console_log!("defend-updates: {:?} run started ({}x{})", mode, w, h);
        Ok(!std::mem::replace(&mut st.loop_active, true))
    })?;
    if need_loop {
        start_loop();
    }
    Ok(())
}

pub fn exit() {
    WEB_STATE.with(|cell| {
        if let Some(st) = cell.borrow_mut().as_mut() {
            if let Ok(run) = st.session.run_mut() {
                run.exit();
            }
        }
    });
}

pub fn take_result() -> Option<RunResult> {
    WEB_STATE.with(|cell| cell.borrow_mut().as_mut().and_then(|st| st.session.take_result()))
}

pub fn hud() -> Option<Hud> {
    let now = performance_now();
    WEB_STATE.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|st| st.session.run().map(|r| r.hud(now)))
    })
}

// --- Listeners --------------------------------------------------------------

fn bind_listeners(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Keyboard controls
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            let now = performance_now();
            let mut restart = false;
            WEB_STATE.with(|cell| {
                let mut guard = cell.borrow_mut();
                let Some(st) = guard.as_mut() else {
                    return;
                };
                let Ok(run) = st.session.run_mut() else {
                    return;
                };
                match evt.key().as_str() {
                    "ArrowLeft" | "a" | "A" => run.nudge_paddle(-1.0),
                    "ArrowRight" | "d" | "D" => run.nudge_paddle(1.0),
                    "p" | "P" | " " => {
                        evt.prevent_default();
                        if run.state == RunState::Paused {
                            run.resume(now);
                            restart = !std::mem::replace(&mut st.loop_active, true);
                        } else {
                            run.pause();
                        }
                    }
                    "Escape" => {
                        if run.aim.is_open() {
                            run.cancel_aim();
                        } else {
                            run.exit();
                        }
                    }
                    "m" | "M" => st.muted = !st.muted,
                    _ => {}
                }
            });
            if restart {
                start_loop();
            }
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Pointer: paddle follows the cursor; while aiming it drives the snip rectangle
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            let (x, y) = (evt.offset_x() as f64, evt.offset_y() as f64);
            with_run(|run| {
                if run.aim.is_open() {
                    run.drag_to(x, y);
                } else {
                    run.set_paddle_target(x);
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            let (x, y) = (evt.offset_x() as f64, evt.offset_y() as f64);
            with_run(|run| {
                run.begin_drag(x, y);
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            let now = performance_now();
            with_run(|run| run.end_drag(now));
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Window resize keeps the field matched to the viewport
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            let (w, h) = viewport();
            WEB_STATE.with(|cell| {
                if let Some(st) = cell.borrow_mut().as_mut() {
                    st.canvas.set_width(w as u32);
                    st.canvas.set_height(h as u32);
                    if let Ok(run) = st.session.run_mut() {
                        run.resize(w, h);
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn with_run(f: impl FnOnce(&mut crate::game::Run)) {
    WEB_STATE.with(|cell| {
        if let Some(st) = cell.borrow_mut().as_mut() {
            if let Ok(run) = st.session.run_mut() {
                f(run);
            }
        }
    });
}

// --- Frame loop -------------------------------------------------------------

/// Runs until a frame reports the run is no longer running; `start` and
/// resume re-enter it.
fn start_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let keep = WEB_STATE.with(|cell| match cell.borrow_mut().as_mut() {
            Some(st) => {
                let keep = step(st, ts);
                st.loop_active = keep;
                keep
            }
            None => false,
        });
        if keep {
            request_frame(&f);
        }
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}

fn request_frame(cb: &FrameCallback) {
    if let (Some(w), Some(closure)) = (window(), cb.borrow().as_ref()) {
        let _ = w.request_animation_frame(closure.as_ref().unchecked_ref());
    }
}

/// Tick, feed FX and audio, draw. Returns whether another frame is wanted.
fn step(st: &mut WebState, ts: f64) -> bool {
    st.session.tick(ts);
    let Ok(run) = st.session.run_mut() else {
        return false;
    };
    if run.state == RunState::Exited {
        st.ctx.clear_rect(0.0, 0.0, run.width, run.height);
        return false;
    }
    let events = run.drain_events();
    st.fx.absorb(&events, ts, run.width, run.height);
    for ev in &events {
        match ev {
            GameEvent::Cue(cue) if !st.muted => play(*cue),
            GameEvent::RunEnded(r) => {
                info!(outcome = ?r.outcome, score = r.score, "run ended");
                console_log!("defend-updates: {:?} with score {}", r.outcome, r.score);
            }
            _ => {}
        }
    }
    st.fx.update(ts, run.last_dt);
    render::frame(&st.ctx, run, &mut st.fx, ts);
    run.is_running()
}

/// Fire-and-forget; missing files or autoplay blocks are ignored.
fn play(cue: Cue) {
    if let Ok(audio) = HtmlAudioElement::new_with_src(&format!("assets/sfx/{}.mp3", cue.name())) {
        let _ = audio.play();
    }
}

// --- Host helpers -----------------------------------------------------------

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn viewport() -> (f64, f64) {
    let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64());
    window()
        .and_then(|w| Some((dim(w.inner_width())?, dim(w.inner_height())?)))
        .unwrap_or((800.0, 600.0))
}

fn seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => performance_now().to_bits(),
    }
}
