//! Canvas drawing. Reads the run and the FX lists; never mutates game state.

use std::f64::consts::TAU;

use web_sys::CanvasRenderingContext2d;

use crate::game::entity::{BombState, Entity, EntityKind, PowerUpKind, Rect};
use crate::game::events::Outcome;
use crate::game::{Mode, Run, RunState};

use super::fx::Fx;

const BG: &str = "#10131a";
const PADDLE: &str = "#4fc3f7";
const MONO: &str = "'Fira Code', monospace";

pub fn frame(ctx: &CanvasRenderingContext2d, run: &Run, fx: &mut Fx, now: f64) {
    let (w, h) = (run.width, run.height);
    ctx.set_fill_style_str(BG);
    ctx.fill_rect(0.0, 0.0, w, h);

    let (sx, sy) = fx.shake_offset(now);
    ctx.save();
    ctx.translate(sx, sy).ok();

    // Faint lane grid
    ctx.set_stroke_style_str("rgba(255,255,255,0.04)");
    ctx.set_line_width(1.0);
    let mut gx = 0.0;
    while gx < w {
        line(ctx, gx, 0.0, gx, h);
        gx += 80.0;
    }

    if let Some(r) = run.boss_rect(now) {
        draw_boss(ctx, run, r, now);
    }
    for e in &run.entities {
        draw_entity(ctx, run, e, now);
    }
    draw_paddle(ctx, run, now);
    draw_fx(ctx, fx, now);
    ctx.restore();

    if let Some(rect) = run.aim.drag_rect() {
        ctx.set_fill_style_str("rgba(255,80,160,0.12)");
        ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
        ctx.set_stroke_style_str("#ff50a0");
        ctx.set_line_width(2.0);
        ctx.stroke_rect(rect.x, rect.y, rect.w, rect.h);
    } else if run.aim.is_open() {
        ctx.set_fill_style_str("rgba(255,80,160,0.06)");
        ctx.fill_rect(0.0, 0.0, w, h);
        centered(ctx, "DRAG TO SNIP", w / 2.0, h * 0.45, "22px", "#ff9ccf");
    }

    if let Some(color) = fx.flash() {
        ctx.set_global_alpha(0.25);
        ctx.set_fill_style_str(color);
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_global_alpha(1.0);
    }

    draw_hud(ctx, run, now);
    draw_overlay(ctx, run);
}

fn draw_entity(ctx: &CanvasRenderingContext2d, run: &Run, e: &Entity, now: f64) {
    let Rect { x, y, w, h } = e.rect;
    let (cx, cy) = e.rect.center();
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    match e.kind {
        EntityKind::Normal { tier } => {
            let t = run.config.size_tiers.get(tier);
            ctx.set_fill_style_str("#263043");
            ctx.fill_rect(x, y, w, h);
            ctx.set_stroke_style_str("#3d4b66");
            ctx.set_line_width(2.0);
            ctx.stroke_rect(x, y, w, h);
            ctx.set_font(&format!("14px {MONO}"));
            ctx.set_fill_style_str(t.map_or("#ffffff", |t| t.text_color.as_str()));
            ctx.fill_text(t.map_or("?", |t| t.label.as_str()), cx, cy).ok();
        }
        EntityKind::Hazard { label, .. } => {
            let Some(d) = run.config.hazards.get(label) else {
                return;
            };
            ctx.set_fill_style_str(&d.color);
            ctx.fill_rect(x, y, w, h);
            ctx.set_font(&format!("bold 15px {MONO}"));
            ctx.set_fill_style_str(&d.text);
            ctx.fill_text(&d.label, cx, cy).ok();
        }
        EntityKind::Bomb(BombState::Armed) => {
            ctx.set_fill_style_str("#222");
            disc(ctx, cx, cy, w / 2.0);
            // fuse spark
            let flicker = if (now / 90.0) as i64 % 2 == 0 { "#ffb300" } else { "#ff5722" };
            ctx.set_fill_style_str(flicker);
            disc(ctx, cx + w * 0.3, y + 2.0, 4.0);
        }
        EntityKind::Bomb(BombState::Exploding { since }) => {
            let p = ((now - since) / run.config.bomb.explosion_ms.max(1.0)).clamp(0.0, 1.0);
            ctx.set_global_alpha(1.0 - p);
            ctx.set_fill_style_str("#ff7043");
            disc(ctx, cx, cy, w / 2.0 + p * w);
            ctx.set_global_alpha(1.0);
        }
        EntityKind::Life => {
            ctx.set_font(&format!("{}px serif", h.round()));
            ctx.set_fill_style_str("#ff4d6d");
            ctx.fill_text("\u{2665}", cx, cy).ok();
        }
        EntityKind::PowerUp(p) => {
            let (bg, glyph) = match p {
                PowerUpKind::Shield => ("#1e88e5", "S"),
                PowerUpKind::TaskManager => ("#43a047", "T"),
                PowerUpKind::Soundwave => ("#8e24aa", "~"),
                PowerUpKind::Snip => ("#d81b60", "\u{2702}"),
                PowerUpKind::Sticky => ("#fdd835", "K"),
            };
            ctx.set_fill_style_str(bg);
            disc(ctx, cx, cy, w / 2.0);
            ctx.set_font(&format!("bold 20px {MONO}"));
            ctx.set_fill_style_str("#fff");
            ctx.fill_text(glyph, cx, cy).ok();
        }
    }
}

fn draw_boss(ctx: &CanvasRenderingContext2d, run: &Run, r: Rect, now: f64) {
    let dying = run.boss.is_dying();
    if dying && (now / 80.0) as i64 % 2 == 0 {
        return;
    }
    ctx.set_fill_style_str(if dying { "#555" } else { "#b71c1c" });
    ctx.fill_rect(r.x, r.y, r.w, r.h);
    ctx.set_font(&format!("bold 18px {MONO}"));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str("#fff");
    let (cx, cy) = r.center();
    ctx.fill_text("FORCED UPDATE", cx, cy).ok();

    let frac = run.boss.health as f64 / run.boss.max_health.max(1) as f64;
    ctx.set_fill_style_str("#333");
    ctx.fill_rect(r.x, r.y - 12.0, r.w, 6.0);
    ctx.set_fill_style_str("#ef5350");
    ctx.fill_rect(r.x, r.y - 12.0, r.w * frac, 6.0);
}

fn draw_paddle(ctx: &CanvasRenderingContext2d, run: &Run, now: f64) {
    let p = run.paddle_rect();
    if run.shield.is_active() {
        let pulse = (now / 160.0).sin() * 3.0;
        ctx.set_stroke_style_str("rgba(100,181,246,0.8)");
        ctx.set_line_width(3.0);
        ctx.stroke_rect(p.x - 6.0 - pulse, p.y - 6.0 - pulse, p.w + 12.0 + pulse * 2.0, p.h + 12.0 + pulse * 2.0);
    }
    ctx.set_fill_style_str(if run.sticky.is_active() { "#fdd835" } else { PADDLE });
    ctx.fill_rect(p.x, p.y, p.w, p.h);
}

fn draw_fx(ctx: &CanvasRenderingContext2d, fx: &Fx, now: f64) {
    for r in &fx.rings {
        let t = ((now - r.born) / r.life_ms).clamp(0.0, 1.0);
        ctx.set_global_alpha(1.0 - t);
        ctx.set_stroke_style_str(r.color);
        ctx.set_line_width(3.0);
        ctx.begin_path();
        ctx.arc(r.x, r.y, r.radius * (0.6 + 0.4 * t), 0.0, TAU).ok();
        ctx.stroke();
    }
    for p in &fx.particles {
        ctx.set_global_alpha((1.0 - (now - p.born) / p.life_ms).clamp(0.0, 1.0));
        ctx.set_fill_style_str(p.color);
        ctx.fill_rect(p.x, p.y, p.size, p.size);
    }
    ctx.set_font(&format!("bold 16px {MONO}"));
    ctx.set_text_align("center");
    for t in &fx.texts {
        let age = (now - t.born) / t.life_ms;
        ctx.set_global_alpha((1.0 - age).clamp(0.0, 1.0));
        ctx.set_fill_style_str(t.color);
        ctx.fill_text(&t.text, t.x, t.y - age * 40.0).ok();
    }
    ctx.set_global_alpha(1.0);
}

fn draw_hud(ctx: &CanvasRenderingContext2d, run: &Run, now: f64) {
    let hud = run.hud(now);
    ctx.set_font(&format!("16px {MONO}"));
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    ctx.set_fill_style_str("#e0e0e0");
    let mode = match hud.mode {
        Mode::Standard => "",
        Mode::Infinite => "  [INFINITE]",
    };
    ctx.fill_text(&format!("Score: {}  Best: {}{mode}", hud.score, hud.high_score), 12.0, 10.0).ok();

    let mut hearts = String::new();
    for i in 0..hud.max_lives.max(hud.lives) {
        hearts.push(if i < hud.lives { '\u{2665}' } else { '\u{2661}' });
    }
    ctx.set_fill_style_str("#ff4d6d");
    ctx.fill_text(&hearts, 12.0, 32.0).ok();

    let mut y = 54.0;
    ctx.set_fill_style_str("#b0bec5");
    if let Some(line) = &hud.boss_line {
        ctx.fill_text(line, 12.0, y).ok();
        y += 20.0;
    }
    for (tag, secs) in &hud.effects {
        ctx.fill_text(&format!("{tag} {secs:.1}s"), 12.0, y).ok();
        y += 20.0;
    }
}

fn draw_overlay(ctx: &CanvasRenderingContext2d, run: &Run) {
    let (w, h) = (run.width, run.height);
    let (title, sub) = match run.state {
        RunState::Paused => ("PAUSED", "Press P to resume".to_string()),
        RunState::Ended(r) => {
            let title = match r.outcome {
                Outcome::Defeat => "UPDATE INSTALLED",
                Outcome::InfiniteRunEnded => "RUN OVER",
                _ => "UPDATES DEFENDED",
            };
            let best = if r.new_high_score { "  New best!" } else { "" };
            (title, format!("Score: {}{best}", r.score))
        }
        RunState::Running | RunState::Exited => return,
    };
    ctx.set_fill_style_str("rgba(0,0,0,0.55)");
    ctx.fill_rect(0.0, 0.0, w, h);
    centered(ctx, title, w / 2.0, h / 2.0, "bold 48px", "#ffffff");
    centered(ctx, &sub, w / 2.0, h / 2.0 + 44.0, "20px", "#cfd8dc");
}

fn centered(ctx: &CanvasRenderingContext2d, text: &str, x: f64, y: f64, size: &str, color: &str) {
    ctx.set_font(&format!("{size} {MONO}"));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(color);
    ctx.fill_text(text, x, y).ok();
}

fn disc(ctx: &CanvasRenderingContext2d, cx: f64, cy: f64, r: f64) {
    ctx.begin_path();
    ctx.arc(cx, cy, r.max(0.0), 0.0, TAU).ok();
    ctx.fill();
}

fn line(ctx: &CanvasRenderingContext2d, x1: f64, y1: f64, x2: f64, y2: f64) {
    ctx.begin_path();
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y2);
    ctx.stroke();
}
