use tokio::sync::watch;

/// Cooperative shutdown signal shared between the embedder and the
/// scheduler loop.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Hooks CTRL+C (and SIGTERM on Unix) to trigger this signal. Optional;
    /// hosts embedding the engine usually drive shutdown themselves.
    pub fn install_signal_handlers(&self) {
        let ctrlc = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrlc.trigger();
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let term = self.clone();
            tokio::spawn(async move {
                if let Ok(mut sig) = signal(SignalKind::terminate()) {
                    sig.recv().await;
                    term.trigger();
                }
            });
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub async fn notified(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        let _ = self.receiver.changed().await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}
