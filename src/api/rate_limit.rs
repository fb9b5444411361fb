//! Fixed-Window Rate Limiter
//!
//! Counts admissions per wall-clock window; when the window has elapsed
//! the counter resets and the window restarts. The lock is held only for
//! the compare-reset-increment sequence. A fixed window admits boundary
//! bursts of up to twice the nominal rate, which the contract accepts.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

struct Window {
    count: u32,
    started: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Window {
                count: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Admits the request and counts it, or rejects it when the current
    /// window's budget is spent.
    pub fn try_acquire(&self) -> bool {
        let mut window = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if window.started.elapsed() >= self.window {
            window.count = 0;
            window.started = Instant::now();
        }

        if window.count >= self.max_requests {
            return false;
        }

        window.count += 1;
        true
    }

    /// Admissions counted in the current window, for the stats snapshot.
    pub fn current_count(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_budget() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.current_count(), 5);
    }

    #[test]
    fn test_window_resets_after_elapse() {
        let limiter = RateLimiter::new(2, Duration::from_millis(40));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(Duration::from_millis(50));

        assert!(limiter.try_acquire(), "new window should admit again");
        assert_eq!(limiter.current_count(), 1);
    }

    #[test]
    fn test_counter_never_exceeds_budget() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(60)));
        let admitted = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let limiter = limiter.clone();
            let admitted = admitted.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    if limiter.try_acquire() {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 100);
        assert_eq!(limiter.current_count(), 100);
    }
}
