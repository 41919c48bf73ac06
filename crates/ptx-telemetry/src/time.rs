//! A small RAII timer for observing the duration of a scope into a
//! histogram, without tying callers to a specific sink trait.

use std::time::Instant;

/// Observes elapsed wall-clock time on drop by calling `observe` with the
/// duration in seconds. Useful for wrapping a function body so the
/// observation fires on every return path, including early returns via `?`.
pub struct Timer<F: FnMut(f64)> {
    start: Instant,
    observe: F,
}

impl<F: FnMut(f64)> Timer<F> {
    /// Starts a new timer that will call `observe` with the elapsed seconds
    /// when dropped.
    pub fn new(observe: F) -> Self {
        Self { start: Instant::now(), observe }
    }
}

impl<F: FnMut(f64)> Drop for Timer<F> {
    fn drop(&mut self) {
        (self.observe)(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn timer_observes_on_drop() {
        let observed = Cell::new(false);
        {
            let _t = Timer::new(|_secs| observed.set(true));
        }
        assert!(observed.get());
    }
}
