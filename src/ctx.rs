//! Per-operation cancellation and deadline context for store calls.
use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Carried into every store operation. Cloning shares the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct OpCtx {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpCtx {
    /// Context cancelled together with `cancel` that expires `timeout` from now.
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: Some(Instant::now() + timeout),
        }
    }

    #[cfg(test)]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs a store future under this context.
    ///
    /// A context that is already cancelled or past its deadline never polls `fut`,
    /// so the operation has no side effects. Otherwise `fut` is dropped as soon as
    /// cancellation or the deadline wins the race.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if matches!(self.deadline, Some(d) if d <= Instant::now()) {
            return Err(StoreError::DeadlineExceeded);
        }

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            _ = deadline => Err(StoreError::DeadlineExceeded),
            res = fut => res,
        }
    }
}
