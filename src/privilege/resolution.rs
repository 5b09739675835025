use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// A one-shot result cell where the first writer wins.
///
/// Every path that can settle an operation (a reply, a dropped connection,
/// a timeout) calls [`Resolution::resolve`]; only the first call delivers a
/// value, later ones are discarded and return `false`.
#[derive(Debug)]
pub struct Resolution<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Resolution<T> {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let cell = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
        });
        (cell, rx)
    }

    /// Deliver `value` if nothing has been delivered yet
    pub fn resolve(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                // The receiver may already be gone (caller abandoned the wait);
                // the cell still counts as resolved.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_writer_wins() {
        let (cell, rx) = Resolution::new();
        assert!(cell.resolve("reply"));
        assert!(!cell.resolve("interrupted"));
        assert_eq!(rx.await.unwrap(), "reply");
    }

    #[tokio::test]
    async fn test_racing_writers_deliver_exactly_one() {
        let (cell, rx) = Resolution::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let cell = cell.clone();
            handles.push(tokio::spawn(async move { cell.resolve(i) }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(rx.await.is_ok());
    }

    #[test]
    fn test_resolve_after_receiver_dropped() {
        let (cell, rx) = Resolution::new();
        drop(rx);
        assert!(cell.resolve(1));
        assert!(!cell.resolve(2));
    }
}
