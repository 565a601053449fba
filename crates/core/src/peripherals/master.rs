use super::usart::SimUsart;

/// MISO bytes kept by `SpiMaster` for inspection.
pub const MISO_LOG_CAPACITY: usize = 4096;

/// Default MOSI pattern: one ten-byte transaction counting up from zero.
pub const DEFAULT_PATTERN: [u8; 10] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];

/// Core clocks between exchanged bytes unless configured otherwise.
pub const DEFAULT_BYTE_INTERVAL: u32 = 100;

/// External SPI master clocking the slave at a fixed cadence.
///
/// Sends `pattern` on MOSI forever, one byte every `byte_interval` core
/// clocks, and records what comes back on MISO.
#[derive(Debug, Clone)]
pub struct SpiMaster {
    pattern: Vec<u8>,
    byte_interval: u32,
    countdown: u32,
    position: usize,
    exchanged: u64,
    miso_log: Vec<u8>,
}

impl Default for SpiMaster {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN.to_vec(), DEFAULT_BYTE_INTERVAL)
    }
}

impl SpiMaster {
    pub fn new(pattern: Vec<u8>, byte_interval: u32) -> Self {
        let byte_interval = byte_interval.max(1);
        Self {
            pattern,
            byte_interval,
            countdown: byte_interval,
            position: 0,
            exchanged: 0,
            miso_log: Vec::new(),
        }
    }

    /// Advance one core clock. Returns `true` if a byte was exchanged.
    pub fn tick(&mut self, slave: &mut SimUsart) -> bool {
        self.countdown -= 1;
        if self.countdown > 0 {
            return false;
        }
        self.countdown = self.byte_interval;

        let Some(&mosi) = self.pattern.get(self.position) else {
            return false;
        };
        self.position = (self.position + 1) % self.pattern.len();

        let miso = slave.exchange(mosi);
        self.exchanged += 1;
        if self.miso_log.len() < MISO_LOG_CAPACITY {
            self.miso_log.push(miso);
        }
        true
    }

    pub fn exchanged(&self) -> u64 {
        self.exchanged
    }

    /// First `MISO_LOG_CAPACITY` bytes received from the slave.
    pub fn miso_log(&self) -> &[u8] {
        &self.miso_log
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }
}
