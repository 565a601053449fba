use std::sync::atomic::{AtomicU32, Ordering};

/// Free-running millisecond counter advanced by the SysTick interrupt.
///
/// The counter is a single `AtomicU32`, so foreground readers never observe
/// a torn value. It wraps at `u32::MAX`; all interval arithmetic uses
/// wrapping subtraction.
#[derive(Debug, Default)]
pub struct TickClock {
    ticks: AtomicU32,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the counter at an arbitrary value, e.g. just below the wrap point.
    pub fn starting_at(ticks: u32) -> Self {
        Self {
            ticks: AtomicU32::new(ticks),
        }
    }

    /// SysTick handler body. Only the tick interrupt calls this.
    #[inline]
    pub fn on_tick(&self) {
        // fetch_add wraps on overflow
        self.ticks.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    #[inline]
    pub fn elapsed_since(&self, mark: u32) -> u32 {
        self.now().wrapping_sub(mark)
    }

    /// Spin until at least `ticks` ticks have elapsed.
    pub fn delay_blocking(&self, ticks: u32) {
        self.delay_with(ticks, std::hint::spin_loop);
    }

    /// Wait for `ticks` ticks, calling `idle` once per poll of the counter.
    pub fn delay_with<F: FnMut()>(&self, ticks: u32, mut idle: F) {
        let mark = self.now();
        while self.elapsed_since(mark) < ticks {
            idle();
        }
    }
}

/// Blocking delay measured in ticks.
///
/// Callers such as the duty sweep only see this trait, so a runtime with a
/// scheduler can substitute a sleeping implementation.
pub trait DelayTicks {
    fn delay_ticks(&mut self, ticks: u32);
}

/// Busy-wait delay on a `TickClock`.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay<'a> {
    clock: &'a TickClock,
}

impl<'a> SpinDelay<'a> {
    pub fn new(clock: &'a TickClock) -> Self {
        Self { clock }
    }
}

impl DelayTicks for SpinDelay<'_> {
    fn delay_ticks(&mut self, ticks: u32) {
        self.clock.delay_blocking(ticks);
    }
}
