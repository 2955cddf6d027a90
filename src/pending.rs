//! Handle for a background operation polled from the UI tick.
//!
//! The view layer never awaits. It spawns work into a [`Pending`] and checks
//! it on every tick, the same way cache reads are re-polled on every render.

use std::future::Future;
use tokio::sync::mpsc;

pub struct Pending<T> {
  receiver: Option<mpsc::UnboundedReceiver<T>>,
}

impl<T> Default for Pending<T> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static> Pending<T> {
  pub fn idle() -> Self {
    Self::default()
  }

  /// Run `future` on the runtime. Replaces (and abandons) any earlier run.
  pub fn spawn<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = T> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      // Receiver may be gone if the view closed
      let _ = tx.send(future.await);
    });
  }

  pub fn is_running(&self) -> bool {
    self.receiver.is_some()
  }

  /// Take the result if it has arrived.
  pub fn poll(&mut self) -> Option<T> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(value) => {
        self.receiver = None;
        Some(value)
      }
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        tracing::warn!("background operation ended without a result");
        self.receiver = None;
        None
      }
    }
  }
}
