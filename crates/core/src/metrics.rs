use crate::{IrqSource, SimulationObserver};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct InterruptMetrics {
    systick: AtomicU64,
    timer: AtomicU64,
    usart_rx: AtomicU64,
    usart_tx: AtomicU64,
    pwm_periods: AtomicU64,
    rx_epochs: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterruptCounts {
    pub systick: u64,
    pub timer: u64,
    pub usart_rx: u64,
    pub usart_tx: u64,
    pub pwm_periods: u64,
    pub rx_epochs: u64,
}

impl Default for InterruptMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptMetrics {
    pub fn new() -> Self {
        Self {
            systick: AtomicU64::new(0),
            timer: AtomicU64::new(0),
            usart_rx: AtomicU64::new(0),
            usart_tx: AtomicU64::new(0),
            pwm_periods: AtomicU64::new(0),
            rx_epochs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.systick,
            &self.timer,
            &self.usart_rx,
            &self.usart_tx,
            &self.pwm_periods,
            &self.rx_epochs,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub fn counts(&self) -> InterruptCounts {
        InterruptCounts {
            systick: self.systick.load(Ordering::SeqCst),
            timer: self.timer.load(Ordering::SeqCst),
            usart_rx: self.usart_rx.load(Ordering::SeqCst),
            usart_tx: self.usart_tx.load(Ordering::SeqCst),
            pwm_periods: self.pwm_periods.load(Ordering::SeqCst),
            rx_epochs: self.rx_epochs.load(Ordering::SeqCst),
        }
    }

    /// Interrupts dispatched per wall-clock second.
    pub fn get_irq_rate(&self) -> f64 {
        let c = self.counts();
        let total = c.systick + c.timer + c.usart_rx + c.usart_tx;
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for InterruptMetrics {
    fn on_interrupt(&self, source: IrqSource) {
        let counter = match source {
            IrqSource::SysTick => &self.systick,
            IrqSource::Timer => &self.timer,
            IrqSource::UsartRx => &self.usart_rx,
            IrqSource::UsartTx => &self.usart_tx,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn on_pwm_period(&self, _high: u32, _top: u32) {
        self.pwm_periods.fetch_add(1, Ordering::SeqCst);
    }

    fn on_rx_epoch(&self, _bytes: &[u8]) {
        self.rx_epochs.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_source() {
        let metrics = InterruptMetrics::new();
        metrics.on_interrupt(IrqSource::SysTick);
        metrics.on_interrupt(IrqSource::SysTick);
        metrics.on_interrupt(IrqSource::UsartTx);
        metrics.on_pwm_period(300, 1000);
        metrics.on_rx_epoch(&[0; 10]);

        let c = metrics.counts();
        assert_eq!(c.systick, 2);
        assert_eq!(c.usart_tx, 1);
        assert_eq!(c.timer, 0);
        assert_eq!(c.pwm_periods, 1);
        assert_eq!(c.rx_epochs, 1);

        metrics.reset();
        assert_eq!(metrics.counts().systick, 0);
    }
}
