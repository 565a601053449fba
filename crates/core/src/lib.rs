pub mod board;
pub mod metrics;
pub mod peripherals;
pub mod pwm;
pub mod ring;
pub mod snapshot;
pub mod spi;
pub mod tick;

mod tests;

pub use board::Board;
pub use pwm::{DutyCycle, PwmController, Sweep, SweepDirection};
pub use ring::{RxRing, TxRing};
pub use spi::{LinkState, SpiSlave};
pub use tick::{DelayTicks, SpinDelay, TickClock};

/// Target PWM output frequency in Hz.
pub const PWM_FREQ_HZ: u32 = 1000;
/// Duty cycle applied by `PwmController::initialize` before the sweep starts.
pub const INITIAL_DUTY: u8 = 30;
/// Upper bound of the duty sweep.
pub const SWEEP_MAX_PERCENT: u8 = 100;
/// Ticks spent on each sweep step.
pub const SWEEP_STEP_DELAY_MS: u32 = 60;
/// Tick interrupt rate.
pub const TICK_HZ: u32 = 1000;
/// Length of both serial rings; one master transaction.
pub const BUFFER_LEN: usize = 10;
/// Bytes streamed out of the serial slave, repeated forever.
pub const TX_SEED: [u8; BUFFER_LEN] = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("PWM frequency must be non-zero")]
    ZeroFrequency,
    #[error("PWM frequency {requested} Hz exceeds timer clock {clock} Hz")]
    FrequencyAboveClock { requested: u32, clock: u32 },
    #[error("duty cycle {0}% outside 0..=100")]
    DutyOutOfRange(u8),
    #[error("sweep bound {0}% outside 1..=100")]
    InvalidSweepRange(u8),
    #[error("tick period of {0} core clocks does not fit the 24-bit reload register")]
    TickReloadOutOfRange(u32),
    #[error("timer clock {timer} Hz does not evenly divide core clock {core} Hz")]
    TimerClockRatio { core: u32, timer: u32 },
}

pub type CoreResult<T> = Result<T, CoreError>;

bitflags::bitflags! {
    /// Timer interrupt sources.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TimerFlags: u32 {
        const OVERFLOW = 1 << 0;
        const CC0 = 1 << 4;
    }
}

bitflags::bitflags! {
    /// USART status bits and interrupt sources (same bit positions).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UsartFlags: u32 {
        /// Transmit buffer empty.
        const TXBL = 1 << 1;
        /// Receive data valid.
        const RXDATAV = 1 << 2;
        /// Receive overflow.
        const RXOF = 1 << 5;
        /// Transmit underflow.
        const TXUF = 1 << 6;
    }
}

/// Counter/timer with a buffered compare channel.
///
/// The buffered compare value is latched into the immediate compare register
/// when the counter wraps, so writes to it never affect the running period.
pub trait CompareTimer {
    fn clock_hz(&self) -> u32;
    fn set_top(&mut self, top: u32);
    fn top(&self) -> u32;
    fn set_compare(&mut self, value: u32);
    fn compare(&self) -> u32;
    fn set_compare_buffered(&mut self, value: u32);
    fn pending(&self) -> TimerFlags;
    fn clear_flags(&mut self, flags: TimerFlags);
    fn enable_interrupts(&mut self, flags: TimerFlags);
    fn disable_interrupts(&mut self, flags: TimerFlags);
    fn start(&mut self);
}

/// Synchronous serial peripheral operating as a clocked slave.
pub trait SyncSlavePort {
    /// Load the transmit buffer; shifted out on the master's next exchange.
    fn write_tx(&mut self, byte: u8);
    /// Read the receive register, clearing `RXDATAV`.
    fn read_rx(&mut self) -> u8;
    fn status(&self) -> UsartFlags;
    fn clear_flags(&mut self, flags: UsartFlags);
    fn enable_interrupts(&mut self, flags: UsartFlags);
    fn disable_interrupts(&mut self, flags: UsartFlags);
    fn set_enabled(&mut self, enabled: bool);
}

/// Interrupt lines the board dispatches, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrqSource {
    SysTick,
    Timer,
    UsartRx,
    UsartTx,
}

/// Trait for observing board events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_interrupt(&self, _source: IrqSource) {}
    /// Called when a PWM period completes with `high` of `top` counts asserted.
    fn on_pwm_period(&self, _high: u32, _top: u32) {}
    /// Called with the full RX ring each time its cursor wraps.
    fn on_rx_epoch(&self, _bytes: &[u8]) {}
}
