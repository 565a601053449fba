use crate::tick::DelayTicks;
use crate::{CompareTimer, CoreError, CoreResult, TimerFlags};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Compare threshold for `percent` of a period of `top` counts.
///
/// Truncating integer division; `0` maps to `0` and `100` to `top` exactly.
pub fn compare_for(top: u32, percent: u8) -> u32 {
    (u64::from(top) * u64::from(percent) / 100) as u32
}

/// Target duty percent shared between the foreground writer and the
/// compare-match handler.
///
/// A single `AtomicU8`: the handler either sees the old or the new value,
/// never a partial update.
#[derive(Debug)]
pub struct DutyCycle {
    percent: AtomicU8,
}

impl DutyCycle {
    pub fn new(percent: u8) -> CoreResult<Self> {
        check_percent(percent)?;
        Ok(Self {
            percent: AtomicU8::new(percent),
        })
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Store a new target. Values above 100 are rejected and leave the
    /// current target in place.
    pub fn set(&self, percent: u8) -> CoreResult<()> {
        check_percent(percent)?;
        self.percent.store(percent, Ordering::Relaxed);
        Ok(())
    }
}

fn check_percent(percent: u8) -> CoreResult<()> {
    if percent > 100 {
        return Err(CoreError::DutyOutOfRange(percent));
    }
    Ok(())
}

/// Single-channel PWM generator driven by a buffered compare register.
#[derive(Debug)]
pub struct PwmController<T: CompareTimer> {
    timer: T,
    period_top: u32,
    duty: Arc<DutyCycle>,
}

impl<T: CompareTimer> PwmController<T> {
    /// Program `timer` for `frequency_hz` with `initial_duty` percent on-time,
    /// arm the compare-match interrupt and start counting.
    pub fn initialize(mut timer: T, frequency_hz: u32, initial_duty: u8) -> CoreResult<Self> {
        let clock = timer.clock_hz();
        if frequency_hz == 0 {
            return Err(CoreError::ZeroFrequency);
        }
        if frequency_hz > clock {
            return Err(CoreError::FrequencyAboveClock {
                requested: frequency_hz,
                clock,
            });
        }
        let duty = Arc::new(DutyCycle::new(initial_duty)?);

        let period_top = clock / frequency_hz;
        let compare = compare_for(period_top, initial_duty);
        timer.set_top(period_top);
        timer.set_compare(compare);
        timer.set_compare_buffered(compare);

        timer.clear_flags(TimerFlags::all());
        timer.enable_interrupts(TimerFlags::CC0);
        timer.start();

        tracing::info!(
            "PWM: {} Hz, top={}, initial duty {}% (compare={})",
            frequency_hz,
            period_top,
            initial_duty,
            compare
        );

        Ok(Self {
            timer,
            period_top,
            duty,
        })
    }

    /// Handle the foreground uses to change the duty cycle.
    pub fn duty_handle(&self) -> Arc<DutyCycle> {
        self.duty.clone()
    }

    pub fn set_duty(&self, percent: u8) -> CoreResult<()> {
        self.duty.set(percent)
    }

    pub fn duty(&self) -> u8 {
        self.duty.get()
    }

    pub fn period_top(&self) -> u32 {
        self.period_top
    }

    /// Compare-match interrupt handler.
    ///
    /// Writes only the buffered compare register; the period in flight keeps
    /// its threshold and the new one latches at the next wrap.
    pub fn on_compare_match(&mut self) {
        let flags = self.timer.pending();
        self.timer.clear_flags(flags);

        let compare = compare_for(self.period_top, self.duty.get());
        self.timer.set_compare_buffered(compare);
        tracing::trace!("PWM: flags={:?}, buffered compare={}", flags, compare);
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepDirection {
    Up,
    Down,
}

/// Foreground triangle ramp of the duty cycle between 0 and `max` percent.
#[derive(Debug, Clone)]
pub struct Sweep {
    percent: u8,
    direction: SweepDirection,
    max: u8,
    step_delay: u32,
}

impl Sweep {
    /// Ramp starting at 0% heading up; each step holds for `step_delay` ticks.
    pub fn new(max: u8, step_delay: u32) -> CoreResult<Self> {
        if max == 0 || max > 100 {
            return Err(CoreError::InvalidSweepRange(max));
        }
        Ok(Self {
            percent: 0,
            direction: SweepDirection::Up,
            max,
            step_delay,
        })
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn direction(&self) -> SweepDirection {
        self.direction
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Move one percent in the current direction, publish it to `duty` and
    /// wait out the step delay. Direction flips on reaching either bound.
    pub fn step<D: DelayTicks + ?Sized>(
        &mut self,
        duty: &DutyCycle,
        delay: &mut D,
    ) -> CoreResult<u8> {
        let next = match self.direction {
            SweepDirection::Up => self.percent + 1,
            SweepDirection::Down => self.percent - 1,
        };
        duty.set(next)?;
        self.percent = next;

        if next == self.max {
            self.direction = SweepDirection::Down;
            tracing::debug!("Sweep: reached {}%, ramping down", next);
        } else if next == 0 {
            self.direction = SweepDirection::Up;
            tracing::debug!("Sweep: reached 0%, ramping up");
        }

        delay.delay_ticks(self.step_delay);
        Ok(next)
    }
}
