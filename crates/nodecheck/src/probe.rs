use std::io;
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tracing::debug;

use crate::retry::RetryAttempt;

/// Pause after a successful connect, so a half-open connection that is about
/// to drop is not counted twice as stable
pub const DEFAULT_CONNECT_PAUSE: Duration = Duration::from_millis(100);

/// Outcome of a full series of TCP reachability attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityResult {
    attempts: Vec<RetryAttempt>,
    success_rate: f64,
    mean_latency_ms: Option<f64>,
}

impl ConnectivityResult {
    pub fn from_attempts(attempts: Vec<RetryAttempt>) -> Self {
        let successes: Vec<f64> =
            attempts.iter().filter(|a| a.succeeded).map(|a| a.latency_ms).collect();
        let success_rate =
            if attempts.is_empty() { 0.0 } else { successes.len() as f64 / attempts.len() as f64 };

        Self { success_rate, mean_latency_ms: mean(&successes), attempts }
    }

    pub fn attempts(&self) -> &[RetryAttempt] {
        &self.attempts
    }

    pub fn successes(&self) -> usize {
        self.attempts.iter().filter(|a| a.succeeded).count()
    }

    /// `successes / attempts`, in `[0, 1]`
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    /// Mean latency over successful attempts only
    pub fn mean_latency_ms(&self) -> Option<f64> {
        self.mean_latency_ms
    }

    /// Mean latency over every attempt, failed ones included
    pub fn mean_attempt_latency_ms(&self) -> Option<f64> {
        let all: Vec<f64> = self.attempts.iter().map(|a| a.latency_ms).collect();
        mean(&all)
    }

    pub fn any_success(&self) -> bool {
        self.successes() > 0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() { None } else { Some(values.iter().sum::<f64>() / values.len() as f64) }
}

/// TCP port prober
pub struct TcpProber {
    timeout_duration: Duration,
    attempts: u32,
    pause: Duration,
}

impl TcpProber {
    pub fn new(timeout_duration: Duration, attempts: u32) -> Self {
        Self { timeout_duration, attempts: attempts.max(1), pause: DEFAULT_CONNECT_PAUSE }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Make every configured attempt against `host:port`, sequentially.
    ///
    /// Network errors never escape; they are recorded on the attempt. Name
    /// resolution counts against the attempt's timeout.
    pub async fn probe(&self, host: &str, port: u16) -> ConnectivityResult {
        self.run_attempts(host, port, || async move { TcpStream::connect((host, port)).await.map(drop) })
            .await
    }

    /// The attempt loop, over any connect future. Pauses only between a
    /// success and the next attempt.
    async fn run_attempts<F, Fut>(&self, host: &str, port: u16, mut connect: F) -> ConnectivityResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let mut attempts = Vec::with_capacity(self.attempts as usize);

        for index in 1..=self.attempts {
            let start = Instant::now();

            let attempt = match timeout(self.timeout_duration, connect()).await {
                Ok(Ok(())) => RetryAttempt::success(index, start.elapsed()),
                Ok(Err(e)) => {
                    RetryAttempt::failure(index, start.elapsed(), format!("TCP connection failed: {e}"))
                }
                Err(_) => RetryAttempt::failure(index, start.elapsed(), "TCP connection timeout"),
            };

            debug!(
                host,
                port,
                attempt = index,
                succeeded = attempt.succeeded,
                latency_ms = attempt.latency_ms,
                "TCP probe attempt"
            );

            let succeeded = attempt.succeeded;
            attempts.push(attempt);

            if succeeded && index < self.attempts && !self.pause.is_zero() {
                sleep(self.pause).await;
            }
        }

        ConnectivityResult::from_attempts(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn attempt(succeeded: bool, latency_ms: f64) -> RetryAttempt {
        RetryAttempt {
            attempt: 1,
            succeeded,
            latency_ms,
            error: (!succeeded).then(|| "refused".to_string()),
        }
    }

    #[test]
    fn test_success_rate_and_means() {
        let result = ConnectivityResult::from_attempts(vec![
            attempt(true, 10.0),
            attempt(false, 500.0),
            attempt(true, 30.0),
            attempt(false, 100.0),
        ]);

        assert_eq!(result.successes(), 2);
        assert_eq!(result.success_rate(), 0.5);
        assert_eq!(result.mean_latency_ms(), Some(20.0));
        assert_eq!(result.mean_attempt_latency_ms(), Some(160.0));
    }

    #[test]
    fn test_no_successes_has_no_mean_latency() {
        let result = ConnectivityResult::from_attempts(vec![attempt(false, 5.0)]);
        assert_eq!(result.success_rate(), 0.0);
        assert_eq!(result.mean_latency_ms(), None);
        assert!(!result.any_success());
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TcpProber::new(Duration::from_secs(2), 3).with_pause(Duration::ZERO);
        let result = prober.probe("127.0.0.1", port).await;

        assert_eq!(result.attempts().len(), 3);
        assert_eq!(result.success_rate(), 1.0);
        assert!(result.mean_latency_ms().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_follows_successes_only() {
        let prober = TcpProber::new(Duration::from_secs(60), 3).with_pause(Duration::from_millis(100));

        let start = Instant::now();
        let result = prober.run_attempts("node", 5052, || async { Ok(()) }).await;
        assert_eq!(result.successes(), 3);
        // none after the last attempt
        assert_eq!(start.elapsed(), Duration::from_millis(200));

        let mut script = vec![
            Ok(()),
            Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
            Ok(()),
        ]
        .into_iter();
        let start = Instant::now();
        let result = prober
            .run_attempts("node", 5052, || {
                let next = script.next().unwrap();
                async move { next }
            })
            .await;
        assert_eq!(result.successes(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        let start = Instant::now();
        let result = prober
            .run_attempts("node", 5052, || async {
                Err(io::Error::from(io::ErrorKind::ConnectionRefused))
            })
            .await;
        assert!(!result.any_success());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let prober = TcpProber::new(Duration::from_secs(2), 2);
        let result = prober.probe("127.0.0.1", port).await;

        assert_eq!(result.attempts().len(), 2);
        assert_eq!(result.success_rate(), 0.0);
        assert!(result.attempts().iter().all(|a| a.error.is_some()));
    }
}
