//! Timeout enforcement for external calls.
//!
//! Every system command and authentication request carries a deadline so no
//! configuration request can block indefinitely.

use std::future::Future;
use std::time::Duration;

/// Returned when an operation exceeds its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    pub after: Duration,
}

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timed out after {:?}", self.after)
    }
}

impl std::error::Error for Elapsed {}

/// Run `fut` with a deadline.
pub async fn with_timeout<F, T>(after: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Elapsed { after })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_elapsed_reports_deadline() {
        let after = Duration::from_millis(10);
        let res = with_timeout(after, tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(res, Err(Elapsed { after }));
    }
}
