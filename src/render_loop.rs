// The render loop: pull a frame, paint it, outline the rectangles, wait for
// the next display refresh, repeat. Runs as one task on the main thread's
// LocalPool, interleaved with pointer handling but never in parallel with it.

use crate::camera::{FrameRequest, VideoSource};
use crate::draw::stroke_rect;
use crate::error::Error;
use crate::interaction::Interaction;
use crate::refresh::RefreshClock;
use crate::types::{FrameBuffer, Rect};
use futures::executor::LocalSpawner;
use futures::future::{AbortHandle, Abortable};
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Read-only view of the geometry to outline each cycle.
pub trait GeometryReader {
    /// Normalized rectangles, bottom to top.
    fn outlines(&self) -> Vec<Rect>;
}

// `Rc<RefCell<Interaction>>` coerces to `Rc<dyn GeometryReader>`.
impl GeometryReader for RefCell<Interaction> {
    fn outlines(&self) -> Vec<Rect> {
        self.borrow().shapes().iter().map(|s| s.rect.normalized()).collect()
    }
}

/// How outlines are stroked.
#[derive(Clone, Copy, Debug)]
pub struct OutlineStyle {
    pub color: u32,
    pub thickness: u32,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self { color: 0x00_FF_CC_33, thickness: 2 }
    }
}

/// Counters shared between a running loop and whoever watches it.
#[derive(Debug, Default)]
pub struct LoopStats {
    pub cycles: Cell<u64>,
    pub frames_drawn: Cell<u64>,
    pub frame_failures: Cell<u64>,
    pub finished: Cell<bool>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// Handle to one running chain of render cycles.
pub struct RenderLoop {
    abort: AbortHandle,
    stats: Rc<LoopStats>,
    /// Drops the video source held by the task.
    release: Box<dyn Fn()>,
}

impl RenderLoop {
    /// Spawn the loop. Fails before scheduling anything if the surface is gone.
    pub fn start<S>(
        spawner: &LocalSpawner,
        clock: &RefreshClock,
        source: S,
        surface: Weak<RefCell<FrameBuffer>>,
        geometry: Rc<dyn GeometryReader>,
        style: OutlineStyle,
    ) -> Result<Self, Error>
    where
        S: VideoSource + 'static,
    {
        if surface.strong_count() == 0 {
            return Err(Error::SurfaceUnavailable);
        }

        let (abort, registration) = AbortHandle::new_pair();
        let stats = Rc::new(LoopStats::default());

        // The task only borrows the slot to ask for a frame, never across an await,
        // so `stop()` can empty it at any point between polls.
        let slot = Rc::new(RefCell::new(Some(source)));
        let held = slot.clone();
        let release = Box::new(move || drop(held.borrow_mut().take()));

        let cycles = run_cycles(slot, surface, geometry, clock.clone(), style, abort.clone(), stats.clone());
        let done = stats.clone();
        spawner.spawn_local(async move {
            let _ = Abortable::new(cycles, registration).await;
            done.finished.set(true);
            log::debug!("render loop task finished");
        })?;

        log::info!("render loop started");
        Ok(Self { abort, stats, release })
    }

    /// Cancel the loop and release its video source.
    /// No cycle body runs after this returns; calling it again does nothing.
    pub fn stop(&self) {
        if !self.abort.is_aborted() {
            self.abort.abort();
            log::info!("render loop stopped");
        }
        (self.release)();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }

    /// False once stopped or once the loop ended by itself (surface dropped).
    pub fn is_running(&self) -> bool {
        !self.is_stopped() && !self.stats.finished.get()
    }

    pub fn stats(&self) -> Rc<LoopStats> {
        self.stats.clone()
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ask the source for its next frame; `None` once the source was released.
fn request<S: VideoSource>(slot: &RefCell<Option<S>>) -> Option<FrameRequest> {
    slot.borrow_mut().as_mut().map(|s| s.next_frame())
}

async fn run_cycles<S: VideoSource>(
    source: Rc<RefCell<Option<S>>>,
    surface: Weak<RefCell<FrameBuffer>>,
    geometry: Rc<dyn GeometryReader>,
    clock: RefreshClock,
    style: OutlineStyle,
    stop: AbortHandle,
    stats: Rc<LoopStats>,
) {
    let Some(mut pending) = request(&source) else { return };
    loop {
        let grabbed = pending.await;
        // A frame that lands after stop() is dropped, never drawn.
        if stop.is_aborted() {
            break;
        }
        let Some(target) = surface.upgrade() else {
            log::info!("drawing surface dropped, render loop ending");
            break;
        };

        // The device works on the next frame while we draw and wait for the refresh.
        let Some(next) = request(&source) else { break };
        pending = next;

        bump(&stats.cycles);
        match grabbed {
            Ok(frame) => {
                let mut fb = target.borrow_mut();
                fb.draw_image(&frame);
                for rect in geometry.outlines() {
                    stroke_rect(&mut fb, rect, style.color, style.thickness);
                }
                bump(&stats.frames_drawn);
            }
            Err(e) => {
                // Previous frame stays on screen; try again next refresh.
                log::warn!("{e}");
                bump(&stats.frame_failures);
            }
        }
        drop(target);

        clock.next_refresh().await;
        if stop.is_aborted() {
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interaction::PointerEvent;
    use crate::types::Point;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use std::collections::VecDeque;

    pub(crate) type Pending = Rc<RefCell<VecDeque<oneshot::Sender<Result<FrameBuffer, Error>>>>>;

    /// Frames are handed out by the test, one request at a time.
    pub(crate) struct ManualSource {
        pub(crate) pending: Pending,
        pub(crate) requests: Rc<Cell<u64>>,
    }

    impl ManualSource {
        pub(crate) fn new() -> (Self, Pending, Rc<Cell<u64>>) {
            let pending = Pending::default();
            let requests = Rc::new(Cell::new(0));
            (Self { pending: pending.clone(), requests: requests.clone() }, pending, requests)
        }
    }

    impl VideoSource for ManualSource {
        fn next_frame(&mut self) -> FrameRequest {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push_back(tx);
            bump(&self.requests);
            Box::pin(async move { rx.await.unwrap_or_else(|_| Err(Error::CameraFrame("cancelled".into()))) })
        }
    }

    /// Holds `open` high while alive, like a device only one handle can own.
    pub(crate) struct Exclusive {
        inner: ManualSource,
        open: Rc<Cell<bool>>,
    }

    impl Exclusive {
        pub(crate) fn new(inner: ManualSource, open: Rc<Cell<bool>>) -> Self {
            open.set(true);
            Self { inner, open }
        }
    }

    impl VideoSource for Exclusive {
        fn next_frame(&mut self) -> FrameRequest {
            self.inner.next_frame()
        }
    }

    impl Drop for Exclusive {
        fn drop(&mut self) {
            self.open.set(false);
        }
    }

    pub(crate) fn solid(width: usize, height: usize, color: u32) -> FrameBuffer {
        FrameBuffer { width, height, pixels: vec![color; width * height] }
    }

    /// Answer the oldest outstanding request. Returns false if there was none.
    pub(crate) fn deliver(pending: &Pending, frame: Result<FrameBuffer, Error>) -> bool {
        match pending.borrow_mut().pop_front() {
            Some(tx) => {
                let _ = tx.send(frame);
                true
            }
            None => false,
        }
    }

    struct Fixture {
        pool: LocalPool,
        clock: RefreshClock,
        surface: Rc<RefCell<FrameBuffer>>,
        geometry: Rc<RefCell<Interaction>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                pool: LocalPool::new(),
                clock: RefreshClock::new(),
                surface: Rc::new(RefCell::new(FrameBuffer::new(1, 1))),
                geometry: Rc::new(RefCell::new(Interaction::default())),
            }
        }

        fn start(&self, source: impl VideoSource + 'static) -> Result<RenderLoop, Error> {
            RenderLoop::start(
                &self.pool.spawner(),
                &self.clock,
                source,
                Rc::downgrade(&self.surface),
                self.geometry.clone(),
                OutlineStyle { color: 0x00FF_FFFF, thickness: 1 },
            )
        }

        /// Let the loop finish its cycle and reach the next frame request.
        fn refresh(&mut self) {
            self.pool.run_until_stalled();
            self.clock.tick();
            self.pool.run_until_stalled();
        }
    }

    #[test]
    fn cycle_draws_frame_then_outline() {
        let mut fx = Fixture::new();
        {
            let mut ix = fx.geometry.borrow_mut();
            ix.handle(PointerEvent::Down(Point::new(4.0, 3.0)));
            ix.handle(PointerEvent::Move(Point::new(1.0, 1.0))); // reversed, still drawing
        }
        let (source, pending, _) = ManualSource::new();
        let lp = fx.start(source).unwrap();

        fx.pool.run_until_stalled();
        assert!(deliver(&pending, Ok(solid(6, 5, 0x0000_00AA))));
        fx.pool.run_until_stalled();

        let fb = fx.surface.borrow();
        assert_eq!((fb.width, fb.height), (6, 5));
        assert_eq!(fb.pixels[0], 0x0000_00AA);
        assert_eq!(fb.pixels[6 + 1], 0x00FF_FFFF); // (1,1) corner of the normalized box
        assert_eq!(fb.pixels[2 * 6 + 2], 0x0000_00AA); // interior untouched
        assert_eq!(lp.stats().frames_drawn.get(), 1);
    }

    #[test]
    fn next_frame_is_requested_before_refresh_but_drawn_after() {
        let mut fx = Fixture::new();
        let (source, pending, requests) = ManualSource::new();
        let _lp = fx.start(source).unwrap();

        fx.pool.run_until_stalled();
        deliver(&pending, Ok(solid(2, 2, 1)));
        fx.pool.run_until_stalled();
        // frame 1 drawn, frame 2 already on its way
        assert_eq!(fx.surface.borrow().pixels, vec![1; 4]);
        assert_eq!(requests.get(), 2);

        // ready early, but held until the display refreshes
        deliver(&pending, Ok(solid(2, 2, 2)));
        fx.pool.run_until_stalled();
        assert_eq!(fx.surface.borrow().pixels, vec![1; 4]);

        fx.clock.tick();
        fx.pool.run_until_stalled();
        assert_eq!(fx.surface.borrow().pixels, vec![2; 4]);
        assert_eq!(requests.get(), 3);
    }

    #[test]
    fn geometry_edit_between_cycles_shows_on_next_frame() {
        const A: u32 = 0x0000_00AA;
        const B: u32 = 0x0000_BB00;
        const WHITE: u32 = 0x00FF_FFFF;
        let at = |x: usize, y: usize| y * 32 + x;

        let mut fx = Fixture::new();
        {
            let mut ix = fx.geometry.borrow_mut();
            ix.handle(PointerEvent::Down(Point::new(0.0, 0.0)));
            ix.handle(PointerEvent::Move(Point::new(20.0, 20.0)));
            ix.handle(PointerEvent::Up);
        }
        let (source, pending, _) = ManualSource::new();
        let _lp = fx.start(source).unwrap();

        fx.pool.run_until_stalled();
        deliver(&pending, Ok(solid(32, 32, A)));
        fx.pool.run_until_stalled();
        assert_eq!(fx.surface.borrow().pixels[at(0, 0)], WHITE);
        assert_eq!(fx.surface.borrow().pixels[at(0, 10)], WHITE);

        // grab the body (outside the 10x10 handle) and drag by (4, 3)
        fx.geometry.borrow_mut().handle(PointerEvent::Down(Point::new(5.0, 5.0)));
        fx.geometry.borrow_mut().handle(PointerEvent::Move(Point::new(9.0, 8.0)));

        fx.refresh();
        deliver(&pending, Ok(solid(32, 32, B)));
        fx.pool.run_until_stalled();

        let fb = fx.surface.borrow();
        // old outline is gone, the new frame shows through
        assert_eq!(fb.pixels[at(0, 0)], B);
        assert_eq!(fb.pixels[at(0, 10)], B);
        assert_eq!(fb.pixels[at(10, 0)], B);
        // outline follows the moved rectangle
        assert_eq!(fb.pixels[at(4, 3)], WHITE);
        assert_eq!(fb.pixels[at(4, 10)], WHITE);
        assert_eq!(fb.pixels[at(24, 23)], WHITE);
        assert_eq!(fb.pixels[at(10, 10)], B);
    }

    #[test]
    fn frame_failure_does_not_end_the_loop() {
        let mut fx = Fixture::new();
        let (source, pending, requests) = ManualSource::new();
        let lp = fx.start(source).unwrap();

        fx.pool.run_until_stalled();
        deliver(&pending, Ok(solid(2, 2, 7)));
        fx.refresh();
        deliver(&pending, Err(Error::CameraFrame("decode".into())));
        fx.refresh();

        // previous image survives, and a new request went out
        assert_eq!(fx.surface.borrow().pixels, vec![7; 4]);
        assert_eq!(requests.get(), 3);
        assert_eq!(lp.stats().frame_failures.get(), 1);
        assert!(lp.is_running());

        deliver(&pending, Ok(solid(2, 2, 9)));
        fx.pool.run_until_stalled();
        assert_eq!(fx.surface.borrow().pixels, vec![9; 4]);
    }

    #[test]
    fn frame_resolving_after_stop_is_not_drawn() {
        let mut fx = Fixture::new();
        let (source, pending, _) = ManualSource::new();
        let lp = fx.start(source).unwrap();
        fx.pool.run_until_stalled();

        lp.stop();
        deliver(&pending, Ok(solid(3, 3, 5)));
        fx.refresh();

        let fb = fx.surface.borrow();
        assert_eq!((fb.width, fb.height), (1, 1));
        assert!(lp.stats().finished.get());
        assert_eq!(lp.stats().cycles.get(), 0);
    }

    #[test]
    fn scheduled_cycle_never_runs_after_stop() {
        let mut fx = Fixture::new();
        let (source, pending, requests) = ManualSource::new();
        let lp = fx.start(source).unwrap();

        fx.pool.run_until_stalled();
        deliver(&pending, Ok(solid(2, 2, 1)));
        fx.pool.run_until_stalled(); // now parked on the next refresh

        lp.stop();
        lp.stop();
        deliver(&pending, Ok(solid(2, 2, 5))); // the request sent before stop
        fx.refresh();
        fx.refresh();

        assert_eq!(requests.get(), 2);
        assert_eq!(fx.surface.borrow().pixels, vec![1; 4]);
        assert!(lp.is_stopped());
        assert!(!lp.is_running());
    }

    #[test]
    fn stop_releases_the_source_before_returning() {
        let mut fx = Fixture::new();
        let (inner, pending, _) = ManualSource::new();
        let open = Rc::new(Cell::new(false));
        let lp = fx.start(Exclusive::new(inner, open.clone())).unwrap();

        fx.pool.run_until_stalled();
        deliver(&pending, Ok(solid(2, 2, 1)));
        fx.pool.run_until_stalled();
        assert!(open.get());

        // no executor turn in between
        lp.stop();
        assert!(!open.get());

        fx.refresh();
        assert!(lp.stats().finished.get());
    }

    #[test]
    fn dropping_the_handle_releases_the_source() {
        let fx = Fixture::new();
        let (inner, _, _) = ManualSource::new();
        let open = Rc::new(Cell::new(false));
        let lp = fx.start(Exclusive::new(inner, open.clone())).unwrap();
        assert!(open.get());

        drop(lp);
        assert!(!open.get());
    }

    #[test]
    fn missing_surface_fails_before_scheduling() {
        let fx = Fixture::new();
        let (source, _, requests) = ManualSource::new();
        let dead = Rc::downgrade(&Rc::new(RefCell::new(FrameBuffer::default())));

        let err = RenderLoop::start(
            &fx.pool.spawner(),
            &fx.clock,
            source,
            dead,
            fx.geometry.clone(),
            OutlineStyle::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::SurfaceUnavailable));
        assert_eq!(requests.get(), 0);
    }

    #[test]
    fn dropping_the_surface_ends_the_loop() {
        let mut fx = Fixture::new();
        let (source, pending, requests) = ManualSource::new();
        let lp = fx.start(source).unwrap();
        fx.pool.run_until_stalled();

        fx.surface = Rc::new(RefCell::new(FrameBuffer::default()));
        deliver(&pending, Ok(solid(2, 2, 1)));
        fx.refresh();

        assert!(lp.stats().finished.get());
        assert!(!lp.is_running());
        assert_eq!(requests.get(), 1);
    }
}
