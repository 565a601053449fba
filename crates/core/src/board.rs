use crate::peripherals::master::{SpiMaster, DEFAULT_BYTE_INTERVAL, DEFAULT_PATTERN};
use crate::peripherals::systick::Systick;
use crate::peripherals::timer::SimTimer;
use crate::peripherals::usart::SimUsart;
use crate::pwm::{PwmController, Sweep};
use crate::snapshot::{BoardSnapshot, PwmSnapshot, SpiSnapshot, SweepSnapshot};
use crate::spi::SpiSlave;
use crate::tick::{DelayTicks, TickClock};
use crate::{
    CompareTimer, CoreError, CoreResult, IrqSource, SimulationObserver, BUFFER_LEN, INITIAL_DUTY,
    PWM_FREQ_HZ, SWEEP_MAX_PERCENT, SWEEP_STEP_DELAY_MS, TICK_HZ, TX_SEED,
};
use pulselink_config::{BoardConfig, DEFAULT_CORE_HZ};
use std::sync::Arc;

/// Clocking and firmware constants a board is built from.
#[derive(Debug, Clone)]
pub struct BoardParams {
    pub core_hz: u32,
    /// Must divide `core_hz`.
    pub timer_hz: u32,
    pub pwm_frequency_hz: u32,
    pub initial_duty: u8,
    pub tx_seed: [u8; BUFFER_LEN],
    pub master: Option<SpiMaster>,
}

impl Default for BoardParams {
    fn default() -> Self {
        Self {
            core_hz: DEFAULT_CORE_HZ,
            timer_hz: DEFAULT_CORE_HZ,
            pwm_frequency_hz: PWM_FREQ_HZ,
            initial_duty: INITIAL_DUTY,
            tx_seed: TX_SEED,
            master: Some(SpiMaster::default()),
        }
    }
}

impl BoardParams {
    /// Resolve a board config, filling absent values from the firmware
    /// constants.
    pub fn from_config(config: &BoardConfig) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let core_hz = config.clocks.core_hz.unwrap_or(defaults.core_hz);
        // The timer runs off the core clock unless given its own
        let timer_hz = config.clocks.timer_hz.unwrap_or(core_hz);

        let tx_seed = match &config.spi.tx_seed {
            Some(seed) => <[u8; BUFFER_LEN]>::try_from(seed.as_slice()).map_err(|_| {
                anyhow::anyhow!(
                    "tx_seed has {} bytes, the rings hold exactly {}",
                    seed.len(),
                    BUFFER_LEN
                )
            })?,
            None => defaults.tx_seed,
        };

        let master_cfg = &config.spi.master;
        let master = if master_cfg.enabled.unwrap_or(true) {
            Some(SpiMaster::new(
                master_cfg
                    .pattern
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PATTERN.to_vec()),
                master_cfg.byte_interval.unwrap_or(DEFAULT_BYTE_INTERVAL),
            ))
        } else {
            None
        };

        Ok(Self {
            core_hz,
            timer_hz,
            pwm_frequency_hz: config.pwm.frequency_hz.unwrap_or(defaults.pwm_frequency_hz),
            initial_duty: config.pwm.initial_duty.unwrap_or(defaults.initial_duty),
            tx_seed,
            master,
        })
    }
}

/// Duty sweep described by `config`.
pub fn sweep_from_config(config: &BoardConfig) -> CoreResult<Sweep> {
    Sweep::new(
        config.sweep.max_percent.unwrap_or(SWEEP_MAX_PERCENT),
        config.sweep.step_delay_ms.unwrap_or(SWEEP_STEP_DELAY_MS),
    )
}

/// Simulated microcontroller running the control core.
///
/// Each `step` is one core clock: peripherals advance, then every pending
/// interrupt line is dispatched to its owning handler in priority order.
pub struct Board {
    pub clock: Arc<TickClock>,
    pub systick: Systick,
    pub pwm: PwmController<SimTimer>,
    pub spi: SpiSlave<SimUsart, BUFFER_LEN>,
    pub master: Option<SpiMaster>,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    cycles: u64,
    timer_divider: u32,
}

impl Board {
    pub fn from_config(config: &BoardConfig) -> anyhow::Result<Self> {
        let params = BoardParams::from_config(config)?;
        Ok(Self::new(params)?)
    }

    pub fn new(params: BoardParams) -> CoreResult<Self> {
        let (core, timer) = (params.core_hz, params.timer_hz);
        if timer == 0 || timer > core || core % timer != 0 {
            return Err(CoreError::TimerClockRatio { core, timer });
        }

        let mut systick = Systick::new();
        systick.configure(params.core_hz / TICK_HZ)?;

        let pwm = PwmController::initialize(
            SimTimer::new(params.timer_hz),
            params.pwm_frequency_hz,
            params.initial_duty,
        )?;
        let spi = SpiSlave::initialize(SimUsart::new(), params.tx_seed);

        let timer_divider = core / timer;
        tracing::info!(
            "Board: core {} Hz, timer {} Hz (divider {}), tick reload {}, master {}",
            params.core_hz,
            params.timer_hz,
            timer_divider,
            systick.reload(),
            if params.master.is_some() { "attached" } else { "absent" }
        );

        Ok(Self {
            clock: Arc::new(TickClock::new()),
            systick,
            pwm,
            spi,
            master: params.master,
            observers: Vec::new(),
            cycles: 0,
            timer_divider,
        })
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pwm_output(&self) -> bool {
        self.pwm.timer().output()
    }

    /// Advance one core clock and dispatch whatever became pending.
    pub fn step(&mut self) {
        self.cycles += 1;

        for irq in self.tick_peripherals() {
            self.dispatch(irq);
        }
    }

    /// Returns the interrupt lines requesting service, highest priority first.
    fn tick_peripherals(&mut self) -> Vec<IrqSource> {
        let mut pending = Vec::new();

        if self.systick.tick() {
            pending.push(IrqSource::SysTick);
        }

        if self.cycles % u64::from(self.timer_divider) == 0 {
            let timer = self.pwm.timer_mut();
            timer.tick();
            if let Some(high) = timer.take_completed_period() {
                let top = timer.top();
                for observer in &self.observers {
                    observer.on_pwm_period(high, top);
                }
            }
        }
        if self.pwm.timer().irq_pending() {
            pending.push(IrqSource::Timer);
        }

        if let Some(master) = self.master.as_mut() {
            master.tick(self.spi.port_mut());
        }
        if self.spi.port().rx_irq_pending() {
            pending.push(IrqSource::UsartRx);
        }
        if self.spi.port().tx_irq_pending() {
            pending.push(IrqSource::UsartTx);
        }

        pending
    }

    fn dispatch(&mut self, irq: IrqSource) {
        match irq {
            IrqSource::SysTick => self.clock.on_tick(),
            IrqSource::Timer => self.pwm.on_compare_match(),
            IrqSource::UsartRx => {
                if let Some(epoch) = self.spi.on_rx_byte_ready() {
                    for observer in &self.observers {
                        observer.on_rx_epoch(&epoch);
                    }
                }
            }
            IrqSource::UsartTx => self.spi.on_tx_slot_available(),
        }
        for observer in &self.observers {
            observer.on_interrupt(irq);
        }
    }

    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    /// Idle foreground: let interrupts run for `ms` ticks.
    pub fn run_ms(&mut self, ms: u32) {
        self.notify_start();
        let clock = self.clock.clone();
        clock.delay_with(ms, || self.step());
        self.notify_stop();
    }

    /// Run `steps` iterations of the duty sweep as the foreground loop.
    pub fn run_sweep(&mut self, sweep: &mut Sweep, steps: usize) -> CoreResult<()> {
        self.notify_start();
        let duty = self.pwm.duty_handle();
        let mut delay = BoardDelay { board: self };
        for _ in 0..steps {
            sweep.step(&duty, &mut delay)?;
        }
        self.notify_stop();
        Ok(())
    }

    /// Sweep until at least `ms` ticks have passed. The last step's delay
    /// may run past `ms`.
    pub fn run_sweep_for(&mut self, sweep: &mut Sweep, ms: u32) -> CoreResult<()> {
        self.notify_start();
        let duty = self.pwm.duty_handle();
        let clock = self.clock.clone();
        let start = clock.now();
        let mut delay = BoardDelay { board: self };
        while clock.elapsed_since(start) < ms {
            sweep.step(&duty, &mut delay)?;
        }
        self.notify_stop();
        Ok(())
    }

    pub fn snapshot(&self, sweep: Option<&Sweep>) -> BoardSnapshot {
        let timer = self.pwm.timer();
        BoardSnapshot {
            cycles: self.cycles,
            ticks: self.clock.now(),
            pwm: PwmSnapshot {
                duty_percent: self.pwm.duty(),
                period_top: self.pwm.period_top(),
                compare: timer.compare(),
                buffered_compare: timer.buffered_compare(),
                counter: timer.counter(),
                output: timer.output(),
            },
            spi: SpiSnapshot {
                state: self.spi.state(),
                tx_cursor: self.spi.tx_cursor(),
                rx_cursor: self.spi.rx_cursor(),
                rx_epochs: self.spi.rx_epochs(),
                rx_ring: self.spi.rx_snapshot().to_vec(),
                exchanges: self.spi.port().exchanges(),
            },
            sweep: sweep.map(|s| SweepSnapshot {
                percent: s.percent(),
                direction: s.direction(),
                max: s.max(),
            }),
        }
    }

    fn notify_start(&self) {
        for observer in &self.observers {
            observer.on_simulation_start();
        }
    }

    fn notify_stop(&self) {
        for observer in &self.observers {
            observer.on_simulation_stop();
        }
    }
}

/// Foreground delay that spins the simulated board until the tick clock
/// has advanced far enough.
struct BoardDelay<'a> {
    board: &'a mut Board,
}

impl DelayTicks for BoardDelay<'_> {
    fn delay_ticks(&mut self, ticks: u32) {
        let clock = self.board.clock.clone();
        clock.delay_with(ticks, || self.board.step());
    }
}
