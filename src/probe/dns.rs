//! DNS resolution timing.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Times how long the system takes to resolve a domain.
#[async_trait]
pub trait DnsTimer: Send + Sync {
    /// Resolution time in milliseconds, `None` if resolution failed.
    async fn resolve_ms(&self, domain: &str) -> Option<f64>;
}

/// Uses the operating system resolver through tokio.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DnsTimer for SystemResolver {
    async fn resolve_ms(&self, domain: &str) -> Option<f64> {
        let start = Instant::now();
        let lookup = tokio::net::lookup_host((domain, 0));

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => {
                if addrs.next().is_none() {
                    tracing::error!("DNS resolution for {} returned no addresses", domain);
                    return None;
                }
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                tracing::debug!("DNS resolution for {}: {:.2}ms", domain, elapsed);
                Some(elapsed)
            }
            Ok(Err(e)) => {
                tracing::error!("DNS resolution error for {}: {}", domain, e);
                None
            }
            Err(_) => {
                tracing::error!("DNS resolution for {} timed out after {:?}", domain, self.timeout);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let resolver = SystemResolver::default();
        let elapsed = resolver.resolve_ms("localhost").await;
        assert!(elapsed.is_some_and(|ms| ms >= 0.0));
    }

    #[tokio::test]
    async fn test_resolve_invalid_domain() {
        let resolver = SystemResolver::new(Duration::from_secs(2));
        assert!(resolver.resolve_ms("invalid..domain").await.is_none());
    }
}
