use crate::pwm::SweepDirection;
use crate::spi::LinkState;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub cycles: u64,
    pub ticks: u32,
    pub pwm: PwmSnapshot,
    pub spi: SpiSnapshot,
    #[serde(default)]
    pub sweep: Option<SweepSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PwmSnapshot {
    pub duty_percent: u8,
    pub period_top: u32,
    pub compare: u32,
    pub buffered_compare: Option<u32>,
    pub counter: u32,
    pub output: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpiSnapshot {
    pub state: LinkState,
    pub tx_cursor: usize,
    pub rx_cursor: usize,
    pub rx_epochs: u32,
    pub rx_ring: Vec<u8>,
    pub exchanges: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SweepSnapshot {
    pub percent: u8,
    pub direction: SweepDirection,
    pub max: u8,
}

impl BoardSnapshot {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
