use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owner of at most one running timer task.
///
/// Starting a new timer cancels the previous one, and so does dropping the
/// slot. Timer tasks must `select!` on the token while sleeping and re-check
/// `is_cancelled()` after taking the widget lock, so a superseded task can
/// never write into the session.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cancel: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn replace<F, Fut>(&mut self, start: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        self.task = Some(tokio::spawn(start(token.clone())));
        self.cancel = Some(token);
        debug!(timer = self.name, "timer started");
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
            debug!(timer = self.name, "timer cancelled");
        }
        // Detach; the task exits on its own once it sees the token.
        self.task = None;
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
