//! Blocking waits
//!
//! All settle times of the power sequencer go through [`Delay`] so that the
//! CLI can show progress while waiting and tests can run without sleeping.

use std::time::Duration;

/// Something that can block the calling thread for a while
pub trait Delay {
    /// Block for `duration`
    fn sleep(&mut self, duration: Duration);
}

impl<D: Delay + ?Sized> Delay for Box<D> {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// [`Delay`] backed by [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
