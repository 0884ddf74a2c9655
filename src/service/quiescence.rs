use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Lets a federated summary pause pipeline workers at their checkpoints.
///
/// Workers pass through `checkpoint` before decoding a payment and hold
/// `enter_write` for the duration of each store write. A summary holding
/// `pause` therefore sees no store mutation, and no worker crosses a
/// checkpoint until the pause guard is dropped. Tokio's lock is
/// write-preferring, so a waiting pause also blocks new crossings.
#[derive(Clone, Default)]
pub struct QuiescenceGate {
    lock: Arc<RwLock<()>>,
}

pub struct PauseGuard {
    _guard: OwnedRwLockWriteGuard<()>,
}

pub struct WriteToken {
    _guard: OwnedRwLockReadGuard<()>,
}

impl QuiescenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn checkpoint(&self) {
        drop(self.lock.read().await);
    }

    pub async fn enter_write(&self) -> WriteToken {
        WriteToken {
            _guard: self.lock.clone().read_owned().await,
        }
    }

    pub async fn pause(&self) -> PauseGuard {
        PauseGuard {
            _guard: self.lock.clone().write_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn checkpoint_waits_while_paused() {
        let gate = QuiescenceGate::new();
        let pause = gate.pause().await;

        let g = gate.clone();
        let crossing = tokio::spawn(async move { g.checkpoint().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!crossing.is_finished());

        drop(pause);
        tokio::time::timeout(Duration::from_secs(1), crossing)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn pause_waits_for_in_flight_write() {
        let gate = QuiescenceGate::new();
        let token = gate.enter_write().await;

        let g = gate.clone();
        let pausing = tokio::spawn(async move {
            let _p = g.pause().await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pausing.is_finished());

        drop(token);
        tokio::time::timeout(Duration::from_secs(1), pausing)
            .await
            .unwrap()
            .unwrap();
    }
}
