use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::model::{PlaybackEvent, StoreEvent};

/// Fan-out of events to every live subscriber.
///
/// `broadcast` runs synchronously on the caller's thread; receivers that were
/// dropped are pruned on the next send.
pub struct EventBus<E> {
    subscribers: Arc<Mutex<Vec<Sender<E>>>>,
}

pub type StoreEventBus = EventBus<StoreEvent>;
pub type PlaybackEventBus = EventBus<PlaybackEvent>;

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<E>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = unbounded::<E>();
        self.subscribers().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl<E: Clone> EventBus<E> {
    pub fn broadcast(&self, event: E) {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
