//! Host notifications: "index reached" and "speaking done".

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    /// Speech up to the index marker with this id has been synthesized.
    IndexReached(i32),
    /// Everything from one `speak` call has finished playing.
    DoneSpeaking,
}

/// Returns `false` once it can no longer deliver, so the registry drops it.
type Listener = Arc<dyn Fn(&SynthEvent) -> bool + Send + Sync>;

/// Registry of host listeners.  Events are delivered on the worker thread,
/// in the order they are raised.
///
/// Listeners run outside the registry lock, so a listener may subscribe
/// further listeners; those receive events from the next one on.
#[derive(Default)]
pub struct Listeners {
    listeners: RwLock<Vec<Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SynthEvent) + Send + Sync + 'static,
    {
        self.register(Arc::new(move |event| {
            listener(event);
            true
        }));
    }

    /// A channel that receives every event raised from now on.  The
    /// listener behind it is removed once the receiver is dropped.
    pub fn channel(&self) -> Receiver<SynthEvent> {
        let (tx, rx) = unbounded();
        self.register(Arc::new(move |event| tx.send(*event).is_ok()));
        rx
    }

    fn register(&self, listener: Listener) {
        self.listeners.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    pub fn notify(&self, event: SynthEvent) {
        let snapshot: Vec<Listener> = self.listeners.read().clone();
        let closed: Vec<Listener> = snapshot.into_iter().filter(|listener| !listener(&event)).collect();
        if !closed.is_empty() {
            self.listeners
                .write()
                .retain(|listener| !closed.iter().any(|gone| Arc::ptr_eq(listener, gone)));
        }
    }
}
