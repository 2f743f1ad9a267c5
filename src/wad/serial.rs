use std::sync::atomic::{AtomicU64, Ordering};

/// First serial handed out. Starting well above zero keeps serials visibly
/// distinct from indices in logs.
const FIRST_SERIAL: u64 = 0x80_0000;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(FIRST_SERIAL);

/// Allocate a serial number unique for the lifetime of the process
pub fn next_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}
