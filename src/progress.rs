//! Progress display for settle delays

use indicatif::{ProgressBar, ProgressStyle};
use rtectl_core::delay::Delay;
use std::time::{Duration, Instant};

/// Waits shorter than this are not worth a spinner
const SPINNER_THRESHOLD: Duration = Duration::from_secs(1);

const TICK: Duration = Duration::from_millis(100);

const TEMPLATE: &str = "{spinner:.green} Waiting {msg} [{bar:30.cyan/blue}]";

/// [`Delay`] that shows a spinner with the remaining time
///
/// Short waits, like the polling of a running flashrom, sleep silently.
#[derive(Debug, Default)]
pub struct SpinnerDelay;

impl Delay for SpinnerDelay {
    fn sleep(&mut self, duration: Duration) {
        if duration < SPINNER_THRESHOLD {
            std::thread::sleep(duration);
            return;
        }

        let pb = ProgressBar::new(duration.as_millis() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= duration {
                break;
            }
            let left = duration - elapsed;
            pb.set_message(format!("{}s", left.as_secs() + 1));
            pb.set_position(elapsed.as_millis() as u64);
            std::thread::sleep(left.min(TICK));
        }
        pb.finish_and_clear();
    }
}
