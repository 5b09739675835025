use std::sync::atomic::{AtomicUsize, Ordering};

/// Completion counter for one category's execution.
///
/// Executors may report finer-grained completions than the nominal total, so
/// the fraction is clamped to `0.0..=1.0`.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    pub fn advance(&self) -> f64 {
        self.advance_by(1)
    }

    pub fn advance_by(&self, n: usize) -> f64 {
        let completed = self.completed.fetch_add(n, Ordering::SeqCst).saturating_add(n);
        self.fraction_of(completed)
    }

    pub fn fraction(&self) -> f64 {
        self.fraction_of(self.completed())
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn fraction_of(&self, completed: usize) -> f64 {
        if self.total == 0 {
            return if completed > 0 { 1.0 } else { 0.0 };
        }
        (completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_advances_and_clamps() {
        let tracker = ProgressTracker::new(4);
        assert_eq!(tracker.fraction(), 0.0);
        assert_eq!(tracker.advance(), 0.25);
        assert_eq!(tracker.advance_by(2), 0.75);
        assert_eq!(tracker.advance_by(10), 1.0);
        assert_eq!(tracker.completed(), 13);
        assert_eq!(tracker.fraction(), 1.0);
    }

    #[test]
    fn test_zero_total() {
        let tracker = ProgressTracker::new(0);
        assert_eq!(tracker.fraction(), 0.0);
        assert_eq!(tracker.advance(), 1.0);
    }

    #[test]
    fn test_concurrent_signals() {
        let tracker = Arc::new(ProgressTracker::new(100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        t.advance();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.completed(), 100);
        assert_eq!(tracker.fraction(), 1.0);
    }
}
