use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

/// Core clock used when `clocks.core_hz` is absent. The timer clock
/// defaults to the core clock.
pub const DEFAULT_CORE_HZ: u32 = 1_000_000;

/// Clock tree. Absent values fall back to the firmware defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    pub core_hz: Option<u32>,
    pub timer_hz: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PwmConfig {
    pub frequency_hz: Option<u32>,
    pub initial_duty: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub max_percent: Option<u8>,
    pub step_delay_ms: Option<u32>,
}

/// External SPI master attached to the slave port.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MasterConfig {
    pub enabled: Option<bool>,
    pub pattern: Option<Vec<u8>>,
    /// Core clocks between two exchanged bytes.
    pub byte_interval: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpiConfig {
    pub tx_seed: Option<Vec<u8>>,
    #[serde(default)]
    pub master: MasterConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub schema_version: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub clocks: ClockConfig,
    #[serde(default)]
    pub pwm: PwmConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub spi: SpiConfig,
}

fn default_name() -> String {
    "default".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            name: default_name(),
            clocks: ClockConfig::default(),
            pwm: PwmConfig::default(),
            sweep: SweepConfig::default(),
            spi: SpiConfig::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board config at {:?}", path.as_ref()))?;
        let config: Self =
            serde_yaml::from_reader(f).context("Failed to parse Board Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse Board Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Board 'name' cannot be empty");
        }

        if self.clocks.core_hz == Some(0) {
            anyhow::bail!("Clock 'core_hz' must be greater than zero");
        }
        if self.clocks.timer_hz == Some(0) {
            anyhow::bail!("Clock 'timer_hz' must be greater than zero");
        }
        let core = self.clocks.core_hz.unwrap_or(DEFAULT_CORE_HZ);
        let timer = self.clocks.timer_hz.unwrap_or(core);
        if timer > core || core % timer != 0 {
            anyhow::bail!(
                "Clock 'timer_hz' ({}) must evenly divide 'core_hz' ({})",
                timer,
                core
            );
        }

        if self.pwm.frequency_hz == Some(0) {
            anyhow::bail!("PWM 'frequency_hz' must be greater than zero");
        }
        if let Some(freq) = self.pwm.frequency_hz {
            if freq > timer {
                anyhow::bail!(
                    "PWM 'frequency_hz' ({}) exceeds 'timer_hz' ({})",
                    freq,
                    timer
                );
            }
        }
        if let Some(duty) = self.pwm.initial_duty {
            if duty > 100 {
                anyhow::bail!("PWM 'initial_duty' {} is outside 0..=100", duty);
            }
        }

        if let Some(max) = self.sweep.max_percent {
            if max == 0 || max > 100 {
                anyhow::bail!("Sweep 'max_percent' {} is outside 1..=100", max);
            }
        }

        if let Some(seed) = &self.spi.tx_seed {
            if seed.is_empty() {
                anyhow::bail!("SPI 'tx_seed' cannot be empty");
            }
        }
        if let Some(pattern) = &self.spi.master.pattern {
            if pattern.is_empty() {
                anyhow::bail!("SPI master 'pattern' cannot be empty");
            }
        }
        if self.spi.master.byte_interval == Some(0) {
            anyhow::bail!("SPI master 'byte_interval' must be greater than zero");
        }

        Ok(())
    }
}
