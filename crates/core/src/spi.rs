use crate::ring::{RxRing, TxRing};
use crate::{SyncSlavePort, UsartFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Armed, no byte clocked by the master yet.
    Idle,
    /// The master has clocked at least one exchange. Never left.
    Active,
}

/// Interrupt-driven SPI slave streaming two fixed rings.
///
/// The TX ring is replayed forever; the RX ring is a circular log that
/// overwrites the previous epoch. Each ring is touched only by its own
/// handler. Overrun and underrun are not detected: the master is expected
/// to clock exactly `N` bytes per transaction.
#[derive(Debug)]
pub struct SpiSlave<P: SyncSlavePort, const N: usize> {
    port: P,
    tx: TxRing<N>,
    rx: RxRing<N>,
    state: LinkState,
}

impl<P: SyncSlavePort, const N: usize> SpiSlave<P, N> {
    /// Seed the TX ring, arm both interrupt sources and enable the port.
    ///
    /// The transmit buffer is empty at enable, so the TX handler fires right
    /// away and preloads the first byte before the master clocks anything.
    pub fn initialize(mut port: P, tx_seed: [u8; N]) -> Self {
        port.set_enabled(false);
        port.clear_flags(UsartFlags::all());
        port.enable_interrupts(UsartFlags::TXBL | UsartFlags::RXDATAV);
        port.set_enabled(true);

        tracing::info!("SPI slave: {} byte rings armed", N);

        Self {
            port,
            tx: TxRing::new(tx_seed),
            rx: RxRing::new(),
            state: LinkState::Idle,
        }
    }

    /// Transmit-buffer-empty handler: load the next TX ring byte.
    pub fn on_tx_slot_available(&mut self) {
        let byte = self.tx.next_byte();
        self.port.write_tx(byte);
        tracing::trace!("SPI TX: {:#04x}, cursor={}", byte, self.tx.cursor());
    }

    /// Receive-data-valid handler.
    ///
    /// Does nothing unless the port reports data valid. Returns the full ring
    /// when this byte completed an epoch.
    pub fn on_rx_byte_ready(&mut self) -> Option<[u8; N]> {
        if !self.port.status().contains(UsartFlags::RXDATAV) {
            tracing::trace!("SPI RX: spurious interrupt ignored");
            return None;
        }

        let byte = self.port.read_rx();
        self.state = LinkState::Active;
        let wrapped = self.rx.push(byte);
        tracing::trace!("SPI RX: {:#04x}, cursor={}", byte, self.rx.cursor());

        if wrapped {
            tracing::debug!(
                "SPI RX: epoch {} complete: {:02x?}",
                self.rx.epochs(),
                self.rx.bytes()
            );
            return Some(*self.rx.bytes());
        }
        None
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn tx_cursor(&self) -> usize {
        self.tx.cursor()
    }

    pub fn rx_cursor(&self) -> usize {
        self.rx.cursor()
    }

    pub fn rx_epochs(&self) -> u32 {
        self.rx.epochs()
    }

    /// Copy of the RX ring as it stands.
    pub fn rx_snapshot(&self) -> [u8; N] {
        *self.rx.bytes()
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
