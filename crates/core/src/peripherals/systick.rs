use crate::{CoreError, CoreResult};

/// Largest value the 24-bit reload register holds.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

bitflags::bitflags! {
    /// SysTick control and status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SystickCsr: u32 {
        const ENABLE = 1 << 0;
        const TICKINT = 1 << 1;
        const CLKSOURCE = 1 << 2;
    }
}

/// SysTick down-counter raising the 1 ms tick request.
#[derive(Debug, Default)]
pub struct Systick {
    csr: SystickCsr,
    rvr: u32,
    cvr: u32,
}

impl Systick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt every `ticks` core clocks, the way `SysTick_Config` does.
    /// A reload of 0 never fires, so at least two clocks are needed.
    pub fn configure(&mut self, ticks: u32) -> CoreResult<()> {
        if ticks < 2 || ticks - 1 > MAX_RELOAD {
            return Err(CoreError::TickReloadOutOfRange(ticks));
        }
        self.rvr = ticks - 1;
        self.cvr = 0;
        self.csr = SystickCsr::ENABLE | SystickCsr::TICKINT | SystickCsr::CLKSOURCE;
        Ok(())
    }

    /// Current reload value, one less than the tick period.
    pub fn reload(&self) -> u32 {
        self.rvr
    }

    /// Advance the timer by one core clock. Returns `true` when the counter
    /// reaches zero with the interrupt enabled.
    pub fn tick(&mut self) -> bool {
        if !self.csr.contains(SystickCsr::ENABLE) {
            return false;
        }

        if self.cvr == 0 {
            self.cvr = self.rvr;
            return false;
        }

        self.cvr -= 1;
        self.cvr == 0 && self.csr.contains(SystickCsr::TICKINT)
    }
}
