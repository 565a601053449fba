use anyhow::Context;
use clap::Parser;
use pulselink_config::BoardConfig;
use pulselink_core::board::{sweep_from_config, Board};
use pulselink_core::metrics::{InterruptCounts, InterruptMetrics};
use pulselink_core::snapshot::BoardSnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// MISO bytes echoed in the report.
const REPORT_MISO_BYTES: usize = 32;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PulseLink: run the PWM/SPI control core on a simulated board",
    long_about = None
)]
struct Args {
    /// Path to the board configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated milliseconds to run
    #[arg(short, long, default_value = "1000")]
    duration_ms: u32,

    /// Hold the initial duty instead of running the sweep
    #[arg(long)]
    no_sweep: bool,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable handler-level tracing
    #[arg(short, long)]
    trace: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    name: String,
    config_hash: String,
    elapsed_ms: u32,
    sweep: bool,
    interrupts: InterruptCounts,
    irq_rate: f64,
    snapshot: BoardSnapshot,
    miso_head: Vec<u8>,
}

fn config_hash(config: &BoardConfig) -> anyhow::Result<String> {
    let canonical = serde_yaml::to_string(config).context("Failed to serialize config")?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Starting PulseLink");

    let config = match &args.config {
        Some(path) => {
            info!("Loading board config: {:?}", path);
            BoardConfig::from_file(path)?
        }
        None => {
            info!("Using default board configuration");
            BoardConfig::default()
        }
    };

    let mut board = Board::from_config(&config)
        .with_context(|| format!("Invalid board config '{}'", config.name))?;
    let metrics = Arc::new(InterruptMetrics::new());
    board.add_observer(metrics.clone());

    info!("Running for {} ms...", args.duration_ms);
    let sweep = if args.no_sweep {
        board.run_ms(args.duration_ms);
        None
    } else {
        let mut sweep = sweep_from_config(&config)?;
        board.run_sweep_for(&mut sweep, args.duration_ms)?;
        Some(sweep)
    };

    let report = RunReport {
        name: config.name.clone(),
        config_hash: config_hash(&config)?,
        elapsed_ms: board.clock.now(),
        sweep: sweep.is_some(),
        interrupts: metrics.counts(),
        irq_rate: metrics.get_irq_rate(),
        snapshot: board.snapshot(sweep.as_ref()),
        miso_head: board
            .master
            .as_ref()
            .map(|m| m.miso_log().iter().take(REPORT_MISO_BYTES).copied().collect())
            .unwrap_or_default(),
    };
    info!("Simulation finished after {} cycles", report.snapshot.cycles);

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = &args.output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Report written to {:?}", path);
    }

    if args.json {
        println!("{}", json);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let pwm = &report.snapshot.pwm;
    let spi = &report.snapshot.spi;
    println!("board        {} ({})", report.name, &report.config_hash[..12]);
    println!("elapsed      {} ms, {} cycles", report.elapsed_ms, report.snapshot.cycles);
    println!(
        "pwm          duty {}%, top {}, compare {}",
        pwm.duty_percent, pwm.period_top, pwm.compare
    );
    if let Some(sweep) = &report.snapshot.sweep {
        println!(
            "sweep        {}% of {}%, heading {:?}",
            sweep.percent, sweep.max, sweep.direction
        );
    }
    println!(
        "spi          {:?}, {} exchanges, {} rx epochs",
        spi.state, spi.exchanges, spi.rx_epochs
    );
    println!(
        "interrupts   systick {}, timer {}, rx {}, tx {}",
        report.interrupts.systick,
        report.interrupts.timer,
        report.interrupts.usart_rx,
        report.interrupts.usart_tx
    );
    println!("miso         {:02x?}", report.miso_head);
}
