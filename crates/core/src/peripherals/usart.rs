use crate::{SyncSlavePort, UsartFlags};

/// Byte shifted out when the master clocks an exchange with nothing loaded.
pub const UNDERFLOW_BYTE: u8 = 0xFF;

/// USART in synchronous slave mode.
///
/// A one-byte transmit buffer feeds the shift register as soon as it is
/// empty, so the byte written now goes out on the exchange after the one in
/// progress. `TXBL` and `RXDATAV` are level-sensitive status bits; `RXOF`
/// and `TXUF` latch until cleared.
#[derive(Debug, Default)]
pub struct SimUsart {
    enabled: bool,
    tx_buffer: Option<u8>,
    shifter: Option<u8>,
    rx_data: Option<u8>,
    sticky: UsartFlags,
    ien: UsartFlags,
    exchanges: u64,
}

impl SimUsart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interrupts_enabled(&self) -> UsartFlags {
        self.ien
    }

    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// TX line request: transmit buffer empty and `TXBL` enabled.
    pub fn tx_irq_pending(&self) -> bool {
        self.ien.contains(UsartFlags::TXBL) && self.status().contains(UsartFlags::TXBL)
    }

    /// RX line request: data valid and `RXDATAV` enabled.
    pub fn rx_irq_pending(&self) -> bool {
        self.ien.contains(UsartFlags::RXDATAV) && self.status().contains(UsartFlags::RXDATAV)
    }

    /// One full-duplex byte clocked by the external master.
    ///
    /// Returns the byte shifted out on MISO. A byte arriving while the
    /// previous one is still unread is lost and `RXOF` latches.
    pub fn exchange(&mut self, mosi: u8) -> u8 {
        if !self.enabled {
            return UNDERFLOW_BYTE;
        }
        self.exchanges += 1;

        let miso = match self.shifter.take() {
            Some(byte) => byte,
            None => {
                self.sticky |= UsartFlags::TXUF;
                UNDERFLOW_BYTE
            }
        };

        if self.rx_data.is_some() {
            self.sticky |= UsartFlags::RXOF;
        } else {
            self.rx_data = Some(mosi);
        }

        self.load_shifter();
        miso
    }

    fn load_shifter(&mut self) {
        if self.shifter.is_none() {
            self.shifter = self.tx_buffer.take();
        }
    }
}

impl SyncSlavePort for SimUsart {
    fn write_tx(&mut self, byte: u8) {
        self.tx_buffer = Some(byte);
        if self.enabled {
            self.load_shifter();
        }
    }

    fn read_rx(&mut self) -> u8 {
        self.rx_data.take().unwrap_or(0)
    }

    fn status(&self) -> UsartFlags {
        let mut status = self.sticky;
        if self.enabled && self.tx_buffer.is_none() {
            status |= UsartFlags::TXBL;
        }
        if self.rx_data.is_some() {
            status |= UsartFlags::RXDATAV;
        }
        status
    }

    fn clear_flags(&mut self, flags: UsartFlags) {
        // TXBL and RXDATAV follow the buffers and cannot be cleared
        self.sticky.remove(flags & (UsartFlags::RXOF | UsartFlags::TXUF));
    }

    fn enable_interrupts(&mut self, flags: UsartFlags) {
        self.ien.insert(flags);
    }

    fn disable_interrupts(&mut self, flags: UsartFlags) {
        self.ien.remove(flags);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.load_shifter();
        }
    }
}
