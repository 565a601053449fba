use crate::{CompareTimer, TimerFlags};

/// Up-counting timer with one compare channel in PWM mode.
///
/// Each `tick` is one timer clock. The counter runs `0..top`; the output is
/// high while `counter < ccv`. `CC0` latches when the counter reaches the
/// compare value; a compare at or above `top` matches on the last count of
/// the period, so the handler still runs before the wrap. On wrap
/// `OVERFLOW` latches and a pending buffered compare replaces `ccv`.
#[derive(Debug)]
pub struct SimTimer {
    clock_hz: u32,
    running: bool,
    counter: u32,
    top: u32,
    ccv: u32,
    ccvb: u32,
    ccvb_valid: bool,
    flags: TimerFlags,
    ien: TimerFlags,
    high_counts: u32,
    completed_period: Option<u32>,
}

impl SimTimer {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            running: false,
            counter: 0,
            top: 0xFFFF,
            ccv: 0,
            ccvb: 0,
            ccvb_valid: false,
            flags: TimerFlags::empty(),
            ien: TimerFlags::empty(),
            high_counts: 0,
            completed_period: None,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Compare value waiting to latch at the next wrap, if any.
    pub fn buffered_compare(&self) -> Option<u32> {
        self.ccvb_valid.then_some(self.ccvb)
    }

    pub fn interrupts_enabled(&self) -> TimerFlags {
        self.ien
    }

    /// Output level during the current count.
    pub fn output(&self) -> bool {
        self.running && self.counter < self.ccv
    }

    /// High-count of the most recently completed period, consumed once.
    pub fn take_completed_period(&mut self) -> Option<u32> {
        self.completed_period.take()
    }

    /// True while any enabled flag is latched.
    pub fn irq_pending(&self) -> bool {
        self.flags.intersects(self.ien)
    }

    /// Advance one timer clock. Returns `true` if an interrupt is requested.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }

        if self.output() {
            self.high_counts += 1;
        }

        self.counter += 1;
        if self.counter >= self.top {
            self.counter = 0;
            self.flags |= TimerFlags::OVERFLOW;
            self.completed_period = Some(self.high_counts);
            self.high_counts = 0;
            if self.ccvb_valid {
                self.ccv = self.ccvb;
                self.ccvb_valid = false;
            }
        }

        if self.counter == self.ccv.min(self.top.saturating_sub(1)) {
            self.flags |= TimerFlags::CC0;
        }

        self.irq_pending()
    }
}

impl CompareTimer for SimTimer {
    fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn set_top(&mut self, top: u32) {
        self.top = top;
    }

    fn top(&self) -> u32 {
        self.top
    }

    fn set_compare(&mut self, value: u32) {
        self.ccv = value;
    }

    fn compare(&self) -> u32 {
        self.ccv
    }

    fn set_compare_buffered(&mut self, value: u32) {
        self.ccvb = value;
        self.ccvb_valid = true;
    }

    fn pending(&self) -> TimerFlags {
        self.flags
    }

    fn clear_flags(&mut self, flags: TimerFlags) {
        self.flags.remove(flags);
    }

    fn enable_interrupts(&mut self, flags: TimerFlags) {
        self.ien.insert(flags);
    }

    fn disable_interrupts(&mut self, flags: TimerFlags) {
        self.ien.remove(flags);
    }

    fn start(&mut self) {
        self.running = true;
        self.counter = 0;
        self.high_counts = 0;
    }
}
