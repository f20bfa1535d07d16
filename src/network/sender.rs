//! Sender ids for remote clients.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates connection-scoped sender ids.
///
/// Format: prefix + 6 chars base36, e.g. "TAAAAAB".
#[derive(Debug)]
pub struct SenderIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SenderIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next unique sender id.
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, base36_encode_6(n))
    }
}

impl Default for SenderIdGenerator {
    fn default() -> Self {
        Self::new("T")
    }
}

/// Encode a number as a 6-character base36 string (wraps past 36^6).
fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; 6];

    for slot in result.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}
