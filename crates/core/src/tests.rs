#[cfg(test)]
mod tests {
    use crate::board::{sweep_from_config, Board, BoardParams};
    use crate::metrics::InterruptMetrics;
    use crate::peripherals::master::SpiMaster;
    use crate::pwm::{compare_for, Sweep, SweepDirection};
    use crate::spi::LinkState;
    use crate::{CompareTimer, CoreError, SimulationObserver, TX_SEED};
    use pulselink_config::BoardConfig;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct PeriodRecorder {
        highs: Mutex<Vec<u32>>,
        epochs: Mutex<Vec<Vec<u8>>>,
    }

    impl SimulationObserver for PeriodRecorder {
        fn on_pwm_period(&self, high: u32, _top: u32) {
            self.highs.lock().unwrap().push(high);
        }

        fn on_rx_epoch(&self, bytes: &[u8]) {
            self.epochs.lock().unwrap().push(bytes.to_vec());
        }
    }

    /// 100 kHz core and timer, 1 kHz PWM: 100 counts per period, 100 cycles per tick.
    fn small_board(master: Option<SpiMaster>) -> Board {
        Board::new(BoardParams {
            core_hz: 100_000,
            timer_hz: 100_000,
            master,
            ..BoardParams::default()
        })
        .unwrap()
    }

    #[test]
    fn test_duty_change_waits_for_period_boundary() {
        let mut board = small_board(None);
        let recorder = Arc::new(PeriodRecorder::default());
        board.add_observer(recorder.clone());
        assert_eq!(board.pwm.period_top(), 100);

        // One full period at the initial 30%
        board.run_cycles(100);
        board.run_cycles(10);
        assert_eq!(board.pwm.timer().counter(), 10);

        board.pwm.set_duty(70).unwrap();
        assert_eq!(board.pwm.timer().compare(), 30);

        // Past the compare point: handler ran, only the buffer changed
        board.run_cycles(40);
        assert_eq!(board.pwm.timer().compare(), 30);
        assert_eq!(board.pwm.timer().buffered_compare(), Some(70));
        assert!(!board.pwm_output());

        board.run_cycles(50);
        assert_eq!(board.pwm.timer().compare(), 70);
        board.run_cycles(100);

        assert_eq!(*recorder.highs.lock().unwrap(), vec![30, 30, 70]);
    }

    #[test]
    fn test_full_on_and_full_off_periods() {
        let mut board = small_board(None);
        let recorder = Arc::new(PeriodRecorder::default());
        board.add_observer(recorder.clone());

        board.pwm.set_duty(100).unwrap();
        board.run_cycles(300);
        board.pwm.set_duty(0).unwrap();
        board.run_cycles(300);

        let highs = recorder.highs.lock().unwrap();
        assert_eq!(highs[1], 100);
        assert_eq!(highs[2], 100);
        assert_eq!(highs[4], 0);
        assert_eq!(highs[5], 0);
    }

    #[test]
    fn test_slave_streams_seed_and_logs_rx() {
        let mut board = Board::new(BoardParams::default()).unwrap();
        let recorder = Arc::new(PeriodRecorder::default());
        board.add_observer(recorder.clone());

        board.run_ms(30);

        let master = board.master.as_ref().unwrap();
        let exchanged = master.exchanged();
        assert!(exchanged >= 290, "only {} exchanges", exchanged);

        let expected: Vec<u8> = TX_SEED.iter().copied().cycle().take(30).collect();
        assert_eq!(&master.miso_log()[..30], expected.as_slice());

        assert_eq!(board.spi.state(), LinkState::Active);
        assert_eq!(u64::from(board.spi.rx_epochs()), exchanged / 10);
        assert_eq!(board.spi.rx_cursor() as u64, exchanged % 10);

        let epochs = recorder.epochs.lock().unwrap();
        assert_eq!(epochs.len() as u64, exchanged / 10);
        assert!(epochs.iter().all(|e| e == &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]));
    }

    #[test]
    fn test_tx_preloaded_before_master_clocks() {
        let mut board = Board::new(BoardParams::default()).unwrap();
        board.run_cycles(2);
        assert_eq!(board.spi.state(), LinkState::Idle);
        assert_eq!(board.spi.port().exchanges(), 0);
        // A0 in the shifter, A1 waiting in the buffer
        assert_eq!(board.spi.tx_cursor(), 2);
    }

    #[test]
    fn test_sweep_paced_by_tick_clock() {
        let mut board = small_board(None);
        let mut sweep = Sweep::new(20, 60).unwrap();

        board.run_sweep(&mut sweep, 5).unwrap();

        assert_eq!(board.clock.now(), 300);
        assert_eq!(board.pwm.duty(), 5);
        assert_eq!(board.pwm.timer().compare(), compare_for(100, 5));
    }

    #[test]
    fn test_sweep_reverses_on_board() {
        let mut board = small_board(None);
        let mut sweep = Sweep::new(20, 1).unwrap();

        board.run_sweep(&mut sweep, 20).unwrap();
        assert_eq!(board.pwm.duty(), 20);
        assert_eq!(sweep.direction(), SweepDirection::Down);

        board.run_sweep(&mut sweep, 20).unwrap();
        assert_eq!(board.pwm.duty(), 0);
        assert_eq!(sweep.direction(), SweepDirection::Up);
    }

    #[test]
    fn test_sweep_for_duration() {
        let mut board = small_board(None);
        let mut sweep = Sweep::new(100, 60).unwrap();
        board.run_sweep_for(&mut sweep, 600).unwrap();
        assert_eq!(sweep.percent(), 10);
        assert_eq!(board.clock.now(), 600);
    }

    #[test]
    fn test_metrics_observer_counts_ticks() {
        let mut board = small_board(Some(SpiMaster::new(vec![1, 2, 3], 50)));
        let metrics = Arc::new(InterruptMetrics::new());
        board.add_observer(metrics.clone());

        board.run_ms(20);

        let counts = metrics.counts();
        assert_eq!(counts.systick, 20);
        assert_eq!(counts.pwm_periods, 20);
        assert!(counts.timer >= 19);
        assert_eq!(counts.usart_rx, board.master.as_ref().unwrap().exchanged());
        assert!(counts.usart_tx > counts.usart_rx);
    }

    #[test]
    fn test_board_rejects_bad_params() {
        let err = Board::new(BoardParams {
            core_hz: 500,
            timer_hz: 500,
            ..BoardParams::default()
        })
        .err()
        .unwrap();
        assert_eq!(err, CoreError::TickReloadOutOfRange(0));

        let err = Board::new(BoardParams {
            pwm_frequency_hz: 0,
            ..BoardParams::default()
        })
        .err()
        .unwrap();
        assert_eq!(err, CoreError::ZeroFrequency);
    }

    #[test]
    fn test_board_rejects_bad_clock_ratio() {
        // Timer faster than the core
        let err = Board::new(BoardParams {
            core_hz: 100_000,
            timer_hz: 1_000_000,
            master: None,
            ..BoardParams::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            CoreError::TimerClockRatio {
                core: 100_000,
                timer: 1_000_000
            }
        );

        // Divider would truncate
        let err = Board::new(BoardParams {
            core_hz: 1_000_000,
            timer_hz: 300_000,
            master: None,
            ..BoardParams::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            CoreError::TimerClockRatio {
                core: 1_000_000,
                timer: 300_000
            }
        );
    }

    #[test]
    fn test_divided_timer_keeps_pwm_frequency() {
        let mut board = Board::new(BoardParams {
            core_hz: 200_000,
            timer_hz: 100_000,
            master: None,
            ..BoardParams::default()
        })
        .unwrap();
        let metrics = Arc::new(InterruptMetrics::new());
        board.add_observer(metrics.clone());

        board.run_ms(100);
        assert_eq!(metrics.counts().pwm_periods, 100);
    }

    #[test]
    fn test_timer_clock_follows_core_clock() {
        let config = BoardConfig::from_yaml(
            r#"
schema_version: "1.0"
clocks:
  core_hz: 500000
"#,
        )
        .unwrap();
        let params = BoardParams::from_config(&config).unwrap();
        assert_eq!(params.timer_hz, 500_000);

        let board = Board::from_config(&config).unwrap();
        assert_eq!(board.pwm.period_top(), 500);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut board = small_board(None);
        let sweep = Sweep::new(20, 60).unwrap();
        board.run_ms(3);

        let snapshot = board.snapshot(Some(&sweep));
        assert_eq!(snapshot.ticks, 3);
        assert_eq!(snapshot.pwm.duty_percent, 30);
        assert_eq!(snapshot.spi.rx_ring.len(), 10);

        let json = snapshot.to_json().unwrap();
        assert_eq!(json["pwm"]["period_top"], 100);
        assert_eq!(json["spi"]["state"], "idle");
        assert_eq!(json["sweep"]["direction"], "up");
    }

    #[test]
    fn test_params_from_config() {
        let config = BoardConfig::from_yaml(
            r#"
schema_version: "1.0"
clocks:
  core_hz: 2000000
  timer_hz: 1000000
pwm:
  initial_duty: 55
spi:
  master:
    byte_interval: 40
"#,
        )
        .unwrap();
        let params = BoardParams::from_config(&config).unwrap();
        assert_eq!(params.core_hz, 2_000_000);
        assert_eq!(params.timer_hz, 1_000_000);
        assert_eq!(params.pwm_frequency_hz, 1000);
        assert_eq!(params.initial_duty, 55);
        assert_eq!(params.tx_seed, TX_SEED);
        assert_eq!(
            params.master.as_ref().unwrap().pattern(),
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]
        );

        let board = Board::from_config(&config).unwrap();
        assert_eq!(board.pwm.period_top(), 1000);
        assert_eq!(board.pwm.duty(), 55);
    }

    #[test]
    fn test_config_disables_master_and_sizes_seed() {
        let config = BoardConfig::from_yaml(
            r#"
schema_version: "1.0"
spi:
  master:
    enabled: false
"#,
        )
        .unwrap();
        assert!(BoardParams::from_config(&config).unwrap().master.is_none());

        let config = BoardConfig::from_yaml(
            r#"
schema_version: "1.0"
spi:
  tx_seed: [1, 2, 3]
"#,
        )
        .unwrap();
        let err = BoardParams::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("tx_seed"));
    }

    #[test]
    fn test_sweep_from_config() {
        let sweep = sweep_from_config(&BoardConfig::default()).unwrap();
        assert_eq!(sweep.max(), 100);
        assert_eq!(sweep.percent(), 0);

        let mut config = BoardConfig::default();
        config.sweep.max_percent = Some(20);
        assert_eq!(sweep_from_config(&config).unwrap().max(), 20);
    }
}
