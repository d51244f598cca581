use crate::config::TimeoutConfig;
use crate::core_error::FtpError;
use log::{debug, warn};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout};

/// Retry discipline shared by control replies and data streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive transient failures tolerated before giving up.
    pub retries: u32,
    pub delay: Duration,
    /// Bound on a single write attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(timeouts: &TimeoutConfig) -> Self {
        Self {
            retries: timeouts.tx_retry,
            delay: Duration::from_millis(timeouts.tx_retry_delay_ms),
            attempt_timeout: Duration::from_millis(timeouts.tx_timeout_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::Interrupted | ErrorKind::TimedOut
    )
}

/// Writes all of `buf` to `channel`.
///
/// Transient failures are retried after `policy.delay`; any accepted byte
/// resets the failure count. Hard channel errors stop at once. Succeeds only
/// once every byte has been handed to the channel and flushed.
pub async fn send_buffer<W>(channel: &mut W, buf: &[u8], policy: &RetryPolicy) -> Result<(), FtpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let total = buf.len();
    let mut sent = 0;
    let mut failures = 0u32;

    while sent < total {
        let kind = match timeout(policy.attempt_timeout, channel.write(&buf[sent..])).await {
            Ok(Ok(0)) => {
                return Err(FtpError::ChannelState(
                    "channel accepted no bytes".to_string(),
                ))
            }
            Ok(Ok(n)) => {
                sent += n;
                failures = 0;
                continue;
            }
            Ok(Err(e)) if is_transient(e.kind()) => e.kind(),
            Ok(Err(e)) => return Err(FtpError::ChannelState(e.to_string())),
            Err(_) => ErrorKind::TimedOut,
        };

        failures += 1;
        if failures > policy.retries {
            warn!(
                "Giving up after {} transient failures ({:?}), {}/{} bytes sent",
                failures, kind, sent, total
            );
            return Err(FtpError::RetryExhausted { sent, total });
        }
        debug!("Transient write failure ({:?}), retry {}", kind, failures);
        sleep(policy.delay).await;
    }

    match timeout(policy.attempt_timeout, channel.flush()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FtpError::ChannelState(e.to_string())),
        Err(_) => Err(FtpError::RetryExhausted { sent, total }),
    }
}
