// What you SEE now:
// • Live camera is the base image, repainted once per display refresh.
// • Drag with the left mouse on empty video to draw a rectangle.
// • Drag inside it to move it; drag its bottom-right corner to resize it.
// • S starts capture, X stops it (Space toggles). The last frame stays up while stopped.
// • D switches between EDIT and DRAW (every press draws a new box). C clears. ESC quits.

mod camera;
mod capture;
mod config;
mod draw;
mod error;
mod interaction;
mod refresh;
mod render_loop;
mod types;

use camera::{CameraRequest, list_cameras};
use capture::Capture;
use clap::Parser;
use config::Args;
use draw::{Drawer, draw_text_5x7};
use error::Error;
use futures::executor::LocalPool;
use interaction::{Interaction, Tool};
use refresh::RefreshClock;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use types::FrameBuffer;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list {
        return list_cameras();
    }

    /* --- Window + shared state ---
       Visual: window opens black until the first frame lands. */
    let (w, h) = (args.width as usize, args.height as usize);
    let mut drawer = Drawer::new("Overlay Cam", w, h, args.refresh_rate)?;

    // The render loop paints into `surface`; we copy it into `screen` and add the HUD.
    let surface = Rc::new(RefCell::new(FrameBuffer::new(w, h)));
    let mut screen = FrameBuffer::new(w, h);
    let interaction = Rc::new(RefCell::new(Interaction::new(args.interaction())));

    /* --- Single-threaded executor ---
       Render cycles and pointer handling take turns on this thread. */
    let mut pool = LocalPool::new();
    let clock = RefreshClock::new();
    let mut capture: Capture<CameraRequest> = Capture::new(
        args.camera_request(),
        pool.spawner(),
        clock.clone(),
        Rc::downgrade(&surface),
        interaction.clone(),
        args.outline(),
    );

    if !args.paused {
        // A missing camera is not fatal here: the window stays up so S can retry.
        let _ = capture.start_capture();
    }

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut drawn_at_last_report = 0u64;
    let mut hud_fps_text = String::from("FPS: 0.0");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Capture controls */
        if drawer.s_pressed_once() {
            let _ = capture.start_capture();
        }
        if drawer.x_pressed_once() {
            capture.stop_capture();
        }
        if drawer.space_pressed_once() {
            let _ = capture.toggle_capture();
        }

        /* 2) Rectangle controls + pointer events (synchronous, never suspend) */
        {
            let mut ix = interaction.borrow_mut();
            if drawer.d_pressed_once() {
                let tool = ix.toggle_tool();
                log::info!("tool: {tool:?}");
            }
            if drawer.c_pressed_once() {
                ix.clear();
            }
            let before = ix.mode();
            for event in drawer.pointer_events((screen.width, screen.height)) {
                ix.handle(event);
            }
            if ix.mode() != before {
                log::debug!("interaction: {before:?} -> {:?}", ix.mode());
            }
        }

        /* 3) One display refresh: let pending render cycles run. */
        clock.tick();
        pool.run_until_stalled();

        /* 4) Compose surface + HUD and present.
           Visual: camera frame with outlines, HUD text on top. */
        screen.draw_image(&surface.borrow());
        let status = if capture.is_active() { "LIVE" } else { "STOPPED" };
        let (tool, rects) = {
            let ix = interaction.borrow();
            let tool = match ix.tool() {
                Tool::Edit => "EDIT",
                Tool::Draw => "DRAW",
            };
            (tool, ix.shapes().len())
        };
        let hud = format!("{status} | {tool} | RECTS: {rects} | {hud_fps_text}");
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);

        drawer.present(&screen)?;

        /* 5) FPS counter: frames actually drawn by the render loop */
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let drawn = capture.stats().map_or(0, |s| s.frames_drawn.get());
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = drawn.saturating_sub(drawn_at_last_report) as f32 / secs;
            log::info!("FPS: {fps:.1}");
            hud_fps_text = format!("FPS: {fps:.1}");
            drawn_at_last_report = drawn;
            last_fps_time = now;
        }
    }

    capture.stop_capture();
    Ok(())
}
