//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame scheduling (requestAnimationFrame on web, a manual queue elsewhere)
//! - Loop cancellation
//! - Rendering surfaces (DOM elements on web, an in-memory table elsewhere)

pub mod headless;
pub mod surface;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{HeadlessRunner, HeadlessSurface, RunSummary};
pub use surface::Surface;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared stop flag checked by long-running loops
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Something that can run a callback at the next display frame.
///
/// The callback receives the frame timestamp in milliseconds.
pub trait FrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>);
}

/// Frame scheduler whose frames fire only when asked to
#[derive(Default)]
pub struct QueuedFrames {
    pending: RefCell<VecDeque<Box<dyn FnOnce(f64)>>>,
}

impl QueuedFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Fire the oldest pending frame. Returns false if none was queued.
    pub fn fire(&self, time: f64) -> bool {
        // Release the borrow before running: the callback may queue the next frame
        let next = self.pending.borrow_mut().pop_front();
        match next {
            Some(callback) => {
                callback(time);
                true
            }
            None => false,
        }
    }
}

impl FrameScheduler for QueuedFrames {
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) {
        self.pending.borrow_mut().push_back(callback);
    }
}

/// Call `step` once per frame until `token` is cancelled.
///
/// The token is checked before every step, so cancelling from inside a step
/// (or from any other callback) stops the loop at the next frame without
/// running it.
pub fn run_until_cancelled<S, F>(scheduler: Rc<S>, token: CancelToken, step: F)
where
    S: FrameScheduler + 'static,
    F: FnMut(f64) + 'static,
{
    let step: Rc<RefCell<dyn FnMut(f64)>> = Rc::new(RefCell::new(step));
    schedule_next(scheduler, token, step);
}

fn schedule_next<S>(scheduler: Rc<S>, token: CancelToken, step: Rc<RefCell<dyn FnMut(f64)>>)
where
    S: FrameScheduler + 'static,
{
    let next = Rc::clone(&scheduler);
    scheduler.request_frame(Box::new(move |time: f64| {
        if token.is_cancelled() {
            log::debug!("Frame loop cancelled");
            return;
        }
        (&mut *step.borrow_mut())(time);
        schedule_next(next, token, step);
    }));
}
