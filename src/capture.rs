use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use facegate_vision::Embedding;

struct PendingCapture {
    embedding: Embedding,
    captured_at: Instant,
}

/// Pending-capture cache: at most one live captured embedding per client
/// context, awaiting registration or discard.
///
/// Entries expire after a TTL so an abandoned flow can't complete later with
/// a stale face. Expired entries are swept on access.
pub struct CaptureCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, PendingCapture>>,
}

impl CaptureCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Store a capture for the context, replacing any existing one.
    pub fn set(&self, client: &str, embedding: Embedding) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.insert(
                client.to_string(),
                PendingCapture {
                    embedding,
                    captured_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the context's capture, if any.
    pub fn clear(&self, client: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.remove(client);
        }
    }

    /// Read and clear atomically, so one capture can't feed two
    /// registrations. Expired captures count as absent.
    pub fn consume(&self, client: &str) -> Option<Embedding> {
        let mut inner = self.inner.lock().ok()?;
        inner.retain(|_, c| c.captured_at.elapsed() < self.ttl);
        inner.remove(client).map(|c| c.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb() -> Embedding {
        Embedding::from_raw(vec![1.0, 0.0])
    }

    #[test]
    fn consume_returns_the_capture_at_most_once() {
        let cache = CaptureCache::new(Duration::from_secs(300));
        cache.set("kiosk-1", emb());
        assert!(cache.consume("kiosk-1").is_some());
        assert!(cache.consume("kiosk-1").is_none());
    }

    #[test]
    fn set_overwrites_the_previous_capture() {
        let cache = CaptureCache::new(Duration::from_secs(300));
        cache.set("kiosk-1", Embedding::from_raw(vec![0.0, 1.0]));
        cache.set("kiosk-1", emb());
        let got = cache.consume("kiosk-1").unwrap();
        assert_eq!(got, emb());
    }

    #[test]
    fn contexts_are_independent() {
        let cache = CaptureCache::new(Duration::from_secs(300));
        cache.set("a", emb());
        cache.set("b", emb());
        cache.clear("a");
        assert!(cache.consume("a").is_none());
        assert!(cache.consume("b").is_some());
    }

    #[test]
    fn expired_captures_are_treated_as_absent() {
        let cache = CaptureCache::new(Duration::from_millis(1));
        cache.set("kiosk-1", emb());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.consume("kiosk-1").is_none());
    }
}
