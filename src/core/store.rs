//! Observable value stores
//!
//! A `Store` is the single writer of a value; any number of `StoreReader`s
//! can read the current value or subscribe to changes. Readers have no way
//! to mutate the value.

use std::sync::Arc;
use tokio::sync::watch;

/// Writer half of an observable value
#[derive(Debug)]
pub struct Store<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the value and notify every subscriber
    pub(crate) fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Reset to the default value, notifying subscribers
    pub(crate) fn reset(&self)
    where
        T: Default,
    {
        self.set(T::default());
    }

    /// Replace the value, notifying only if it differs from the current one.
    /// Returns whether the value changed.
    pub(crate) fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Read-only view over this store
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Read-only handle to a `Store`
#[derive(Debug)]
pub struct StoreReader<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> StoreReader<T> {
    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Subscribe to changes. The receiver starts with the current value marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_reader_sees_writes() {
        let store = Store::new(1u32);
        let reader = store.reader();
        assert_eq!(reader.get(), 1);
        store.set(5);
        assert_eq!(reader.get(), 5);
    }

    #[test]
    fn test_reset_restores_default() {
        let store = Store::new(String::from("stale"));
        store.reset();
        assert_eq!(store.reader().get(), "");
    }

    #[test]
    fn test_set_wakes_subscriber() {
        let store = Store::new(0u32);
        let mut rx = store.reader().subscribe();

        let mut changed = task::spawn(rx.changed());
        assert_pending!(changed.poll());

        store.set(0);
        assert!(changed.is_woken());
        assert!(assert_ready!(changed.poll()).is_ok());
    }

    #[test]
    fn test_set_if_changed_skips_equal_values() {
        let store = Store::new(false);
        let mut rx = store.reader().subscribe();

        assert!(!store.set_if_changed(false));
        assert!(!rx.has_changed().unwrap());

        assert!(store.set_if_changed(true));
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn test_clones_share_value() {
        let store = Store::new(3u8);
        let other = store.clone();
        other.set(9);
        assert_eq!(store.reader().get(), 9);
    }
}
