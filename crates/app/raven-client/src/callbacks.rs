use tokio::sync::mpsc;

/// Completions produced on background tasks, consumed on the host thread.
///
/// Any number of [`CallbackSender`]s push; the single owner of the queue
/// drains it once per tick.
pub struct CallbackQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
}

/// Cloneable producer side of a [`CallbackQueue`].
#[derive(Debug)]
pub struct CallbackSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for CallbackSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> CallbackSender<T> {
    /// Queue `event`. Returns `false` once the queue has been dropped.
    pub fn send(&self, event: T) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl<T> Default for CallbackQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> CallbackSender<T> {
        CallbackSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything queued so far, oldest first. Never waits.
    pub fn drain(&mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
