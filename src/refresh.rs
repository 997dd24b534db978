// Display-refresh clock.
// The main loop calls `tick()` once per presented window frame; render cycles
// `await` the next tick before starting over.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct ClockState {
    ticks: u64,
    waiting: Vec<Waker>,
}

/// Cheap to clone; every clone observes the same ticks.
#[derive(Clone, Default)]
pub struct RefreshClock {
    state: Rc<RefCell<ClockState>>,
}

impl RefreshClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// One display refresh happened: wake everything waiting for it.
    pub fn tick(&self) {
        let waiting = {
            let mut state = self.state.borrow_mut();
            state.ticks += 1;
            std::mem::take(&mut state.waiting)
        };
        for waker in waiting {
            waker.wake();
        }
    }

    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// Resolves on the first tick after this call.
    pub fn next_refresh(&self) -> NextRefresh {
        NextRefresh { clock: self.clone(), target: self.ticks() + 1 }
    }
}

pub struct NextRefresh {
    clock: RefreshClock,
    target: u64,
}

impl Future for NextRefresh {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.clock.state.borrow_mut();
        if state.ticks >= self.target {
            return Poll::Ready(());
        }
        if !state.waiting.iter().any(|w| w.will_wake(cx.waker())) {
            state.waiting.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
