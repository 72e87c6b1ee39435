// src/poll.rs
use std::future::Future;

use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ReceiptPolling;
use crate::error::{Result, SmartWalletError};

/// Runs `check` every `polling.interval` until it yields `Some`, the deadline
/// passes (`Ok(None)`) or `cancel` fires (`Err(Cancelled)`). Errors from
/// `check` end the wait immediately.
pub async fn poll_until<T, F, Fut>(
    polling: ReceiptPolling,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + polling.timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(SmartWalletError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, check()).await {
            Ok(Ok(Some(value))) => return Ok(Some(value)),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(None),
        }
        if Instant::now() + polling.interval > deadline {
            return Ok(None);
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(SmartWalletError::Cancelled),
            _ = sleep(polling.interval) => {}
        }
    }
}
