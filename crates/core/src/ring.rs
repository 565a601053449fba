/// Fixed outbound byte sequence replayed through a wrapping cursor.
///
/// A zero-length ring is rejected at compile time:
///
/// ```compile_fail
/// let _ = pulselink_core::TxRing::<0>::new([]);
/// ```
#[derive(Debug, Clone)]
pub struct TxRing<const N: usize> {
    bytes: [u8; N],
    cursor: usize,
}

impl<const N: usize> TxRing<N> {
    const NON_EMPTY: () = assert!(N > 0, "TxRing needs at least one byte");

    pub fn new(seed: [u8; N]) -> Self {
        let () = Self::NON_EMPTY;
        Self {
            bytes: seed,
            cursor: 0,
        }
    }

    /// Return the byte under the cursor and advance, wrapping at `N`.
    pub fn next_byte(&mut self) -> u8 {
        let byte = self.bytes[self.cursor];
        self.cursor += 1;
        if self.cursor == N {
            self.cursor = 0;
        }
        byte
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Inbound circular log. Once full, new bytes overwrite the oldest epoch;
/// nothing acknowledges or drains it.
///
/// ```compile_fail
/// let _ = pulselink_core::RxRing::<0>::new();
/// ```
#[derive(Debug, Clone)]
pub struct RxRing<const N: usize> {
    bytes: [u8; N],
    cursor: usize,
    epochs: u32,
}

impl<const N: usize> Default for RxRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxRing<N> {
    const NON_EMPTY: () = assert!(N > 0, "RxRing needs at least one slot");

    pub fn new() -> Self {
        let () = Self::NON_EMPTY;
        Self {
            bytes: [0; N],
            cursor: 0,
            epochs: 0,
        }
    }

    /// Store `byte` at the cursor and advance. Returns `true` when this write
    /// completed an epoch and the cursor wrapped back to 0.
    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor == N {
            self.cursor = 0;
            self.epochs = self.epochs.wrapping_add(1);
            return true;
        }
        false
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of times the cursor has wrapped.
    pub fn epochs(&self) -> u32 {
        self.epochs
    }

    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }
}
