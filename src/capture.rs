// Capture on/off. Starting acquires a video source and launches exactly one
// render loop; stopping cancels it. Rectangles survive either way.

use crate::camera::Acquire;
use crate::error::Error;
use crate::refresh::RefreshClock;
use crate::render_loop::{GeometryReader, LoopStats, OutlineStyle, RenderLoop};
use crate::types::FrameBuffer;
use futures::executor::LocalSpawner;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub struct Capture<A: Acquire> {
    acquire: A,
    spawner: LocalSpawner,
    clock: RefreshClock,
    surface: Weak<RefCell<FrameBuffer>>,
    geometry: Rc<dyn GeometryReader>,
    style: OutlineStyle,
    running: Option<RenderLoop>,
}

impl<A: Acquire> Capture<A> {
    pub fn new(
        acquire: A,
        spawner: LocalSpawner,
        clock: RefreshClock,
        surface: Weak<RefCell<FrameBuffer>>,
        geometry: Rc<dyn GeometryReader>,
        style: OutlineStyle,
    ) -> Self {
        Self { acquire, spawner, clock, surface, geometry, style, running: None }
    }

    /// True while a render loop is drawing.
    pub fn is_active(&self) -> bool {
        self.running.as_ref().is_some_and(RenderLoop::is_running)
    }

    /// Acquire a source and start rendering. A no-op while already active.
    pub fn start_capture(&mut self) -> Result<(), Error> {
        if self.is_active() {
            return Ok(());
        }
        // A loop that ended on its own is dead weight; clear it first.
        self.running = None;

        let source = self.acquire.acquire().inspect_err(|e| {
            log::error!("could not start capture: {e}");
        })?;

        let render = RenderLoop::start(
            &self.spawner,
            &self.clock,
            source,
            self.surface.clone(),
            self.geometry.clone(),
            self.style,
        )
        .inspect_err(|e| log::error!("could not start render loop: {e}"))?;

        self.running = Some(render);
        Ok(())
    }

    /// Stop rendering and release the camera. Calling it while stopped does nothing.
    pub fn stop_capture(&mut self) {
        if let Some(render) = self.running.take() {
            render.stop();
        }
    }

    /// Flip between started and stopped (the Space key).
    pub fn toggle_capture(&mut self) -> Result<(), Error> {
        if self.is_active() {
            self.stop_capture();
            Ok(())
        } else {
            self.start_capture()
        }
    }

    /// Counters of the current loop, if one was started.
    pub fn stats(&self) -> Option<Rc<LoopStats>> {
        self.running.as_ref().map(RenderLoop::stats)
    }
}

impl<A: Acquire> Drop for Capture<A> {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
