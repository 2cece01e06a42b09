//! Time-windowed suppression of duplicate physical key events

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default suppression window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(150);

/// Keys already delivered synthetically, waiting for the platform's duplicate
#[derive(Debug, Clone)]
pub struct SuppressionRegistry {
    /// key value -> expiry
    entries: HashMap<String, Instant>,
    window: Duration,
    /// Total physical events suppressed
    suppressed: u64,
}

impl SuppressionRegistry {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            window,
            suppressed: 0,
        }
    }

    /// Mark `key` as delivered at `now`. Re-marking resets the expiry.
    pub fn mark(&mut self, key: &str, now: Instant) {
        self.entries.insert(key.to_string(), now + self.window);
    }

    /// Consume the entry for `key` if it is still live.
    ///
    /// Each mark blocks at most one physical delivery.
    pub fn should_suppress(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.remove(key) {
            Some(expires_at) if now < expires_at => {
                self.suppressed += 1;
                log::debug!("suppressed duplicate native key {:?}", key);
                true
            }
            _ => false,
        }
    }

    /// Drop every expired entry
    pub fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, expires_at| now < *expires_at);
    }

    /// Number of live entries at `now`
    pub fn active(&self, now: Instant) -> usize {
        self.entries.values().filter(|expires_at| now < **expires_at).count()
    }

    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SuppressionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn suppresses_exactly_once() {
        let t0 = Instant::now();
        let mut registry = SuppressionRegistry::default();
        registry.mark("a", t0);

        assert!(registry.should_suppress("a", t0 + ms(20)));
        assert!(!registry.should_suppress("a", t0 + ms(30)));
        assert_eq!(registry.suppressed_count(), 1);
    }

    #[test]
    fn expired_entry_does_not_suppress() {
        let t0 = Instant::now();
        let mut registry = SuppressionRegistry::default();
        registry.mark("a", t0);

        assert!(!registry.should_suppress("a", t0 + ms(150)));
        assert_eq!(registry.active(t0), 0);
    }

    #[test]
    fn remark_resets_expiry() {
        let t0 = Instant::now();
        let mut registry = SuppressionRegistry::default();
        registry.mark("a", t0);
        registry.mark("a", t0 + ms(100));

        assert_eq!(registry.active(t0 + ms(100)), 1);
        assert!(registry.should_suppress("a", t0 + ms(200)));
    }

    #[test]
    fn keys_are_independent() {
        let t0 = Instant::now();
        let mut registry = SuppressionRegistry::default();
        registry.mark("a", t0);

        assert!(!registry.should_suppress("b", t0));
        assert!(registry.should_suppress("a", t0));
    }

    #[test]
    fn purge_drops_only_expired() {
        let t0 = Instant::now();
        let mut registry = SuppressionRegistry::new(ms(50));
        registry.mark("a", t0);
        registry.mark("b", t0 + ms(40));

        registry.purge_expired(t0 + ms(60));
        assert_eq!(registry.active(t0 + ms(60)), 1);
        assert!(registry.should_suppress("b", t0 + ms(60)));
    }
}
