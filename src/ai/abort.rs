use tokio::sync::watch;

/// Owning side of a cancellation pair. Held by whoever may supersede the call.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

/// Observing side, passed down the call chain.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // closed channel: `aborted` pends forever
        drop(tx);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller aborts. Pending forever if the controller is dropped
    /// without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn abort_wakes_waiters() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.aborted().await }
        });
        controller.abort();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_aborted());
        assert!(controller.is_aborted());
    }

    #[tokio::test]
    async fn signal_created_after_abort_is_already_aborted() {
        let controller = AbortController::new();
        controller.abort();
        let signal = controller.signal();
        assert!(signal.is_aborted());
        signal.aborted().await;
    }

    #[tokio::test]
    async fn never_does_not_fire() {
        let signal = AbortSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.aborted()).await;
        assert!(waited.is_err());
        assert!(!signal.is_aborted());
    }
}
