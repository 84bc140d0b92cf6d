//! Suppression of codes that were just rejected.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Ignores decoded texts that recently failed parsing or verification.
///
/// Without it a rejected code held in view would be re-read on every
/// tick and re-reported each time.
#[derive(Debug)]
pub struct RescanGuard {
    cooldown: Duration,
    blocked: HashMap<String, Instant>,
}

impl RescanGuard {
    /// Creates a guard with the given cooldown.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            blocked: HashMap::new(),
        }
    }

    /// Suppresses `text` for the cooldown period.
    pub fn block(&mut self, text: &str) {
        if self.cooldown.is_zero() {
            return;
        }
        self.blocked
            .insert(text.to_string(), Instant::now() + self.cooldown);
    }

    /// Returns true if `text` is still suppressed. Expired entries are pruned.
    pub fn is_blocked(&mut self, text: &str) -> bool {
        let now = Instant::now();
        self.blocked.retain(|_, until| *until > now);
        self.blocked.contains_key(text)
    }

    /// Forgets every suppressed text.
    pub fn clear(&mut self) {
        self.blocked.clear();
    }
}
