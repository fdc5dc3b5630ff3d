use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("voxcast/", env!("CARGO_PKG_VERSION"));

/// Performance metrics for monitoring request behavior
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total number of requests made
    pub total_requests: AtomicU64,
    /// Number of successful requests
    pub successful_requests: AtomicU64,
    /// Number of failed requests
    pub failed_requests: AtomicU64,
    /// Number of currently active requests
    pub active_requests: AtomicUsize,
    /// Peak concurrent requests observed
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        let total = self.total_requests.load(Ordering::Relaxed);
        let success = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let active = self.active_requests.load(Ordering::Relaxed);
        let peak = self.peak_concurrent.load(Ordering::Relaxed);

        format!(
            "Requests - Total: {}, Success: {}, Failed: {}, Active: {}, Peak: {}",
            total, success, failed, active, peak
        )
    }
}

/// Shared HTTP client for upstream collaborators (speech engine, translation,
/// transcripts, grammar checking).
///
/// A single pooled `reqwest::Client` is handed out through a semaphore so the
/// number of in-flight upstream requests stays bounded.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// use voxcast::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(10)?;
///
/// let guard = manager.acquire().await?;
/// let response = guard.send(guard.client().get("https://api.example.com/data")).await?;
///
/// println!("Metrics: {}", manager.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    /// Maximum number of concurrent requests allowed
    max_concurrent_requests: usize,

    /// A single, long-lived HTTP client with connection pooling
    client: Arc<Client>,

    /// Semaphore to control concurrent access to the client
    semaphore: Arc<Semaphore>,

    /// Performance metrics
    metrics: Arc<RequestMetrics>,
}

/// A guard that holds a permit for one upstream request.
/// Tracks metrics and releases the permit when dropped.
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    client: Arc<Client>,
    _permit: SemaphorePermit<'a>,
}

impl<'a> ClientGuard<'a> {
    /// Get the HTTP client for building requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request built from [`ClientGuard::client`] with metrics tracking
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        self.manager
            .metrics
            .total_requests
            .fetch_add(1, Ordering::Relaxed);
        let result = request.send().await;
        self.update_metrics(&result);
        result
    }

    /// Update metrics based on request result
    fn update_metrics(&self, result: &Result<Response, reqwest::Error>) {
        let counter = match result {
            Ok(response) if !response.status().is_server_error() => {
                &self.manager.metrics.successful_requests
            }
            _ => &self.manager.metrics.failed_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Connection settings for the shared client
#[derive(Debug, Clone)]
struct ReqManagerConfig {
    max_concurrent_requests: usize,
    pool_max_idle_per_host: usize,
    /// Idle connections are closed after this long
    pool_idle_timeout: Duration,
    tcp_keepalive: Duration,
    connect_timeout: Duration,
    /// Default for requests that do not set their own timeout
    request_timeout: Duration,
}

impl Default for ReqManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ReqManager {
    /// Create a new request manager with the specified maximum concurrent requests
    ///
    /// # Arguments
    /// * `max_concurrent_requests` - Maximum number of concurrent requests allowed (1-1000)
    pub fn new(
        max_concurrent_requests: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = ReqManagerConfig {
            max_concurrent_requests,
            ..Default::default()
        };
        Self::with_config(config)
    }

    fn with_config(
        config: ReqManagerConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if config.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".into());
        }
        if config.max_concurrent_requests > 1000 {
            return Err("max_concurrent_requests must not exceed 1000".into());
        }

        let client = Arc::new(Self::create_client(&config)?);

        Ok(Self {
            max_concurrent_requests: config.max_concurrent_requests,
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    fn create_client(config: &ReqManagerConfig) -> Result<Client, reqwest::Error> {
        Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
    }

    /// Acquire the client, waiting while all permits are in use.
    pub async fn acquire(
        &self,
    ) -> Result<ClientGuard<'_>, Box<dyn std::error::Error + Send + Sync>> {
        let permit = self.semaphore.acquire().await?;

        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            client: Arc::clone(&self.client),
            _permit: permit,
        })
    }

    /// Get performance metrics
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Get the maximum number of concurrent requests
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Get the number of available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invalid_concurrency_limits() {
        assert!(ReqManager::new(0).is_err());
        assert!(ReqManager::new(1001).is_err());
        assert!(ReqManager::new(1).is_ok());
    }

    #[tokio::test]
    async fn test_permits_are_released() {
        let manager = ReqManager::new(2).unwrap();
        {
            let _a = manager.acquire().await.unwrap();
            let _b = manager.acquire().await.unwrap();
            assert_eq!(manager.available_permits(), 0);
            assert_eq!(manager.metrics().active_requests.load(Ordering::Relaxed), 2);
        }
        assert_eq!(manager.available_permits(), 2);
        assert_eq!(manager.metrics().active_requests.load(Ordering::Relaxed), 0);
        assert_eq!(manager.metrics().peak_concurrent.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_send_tracks_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let manager = ReqManager::new(4).unwrap();
        let guard = manager.acquire().await.unwrap();
        guard
            .send(guard.client().get(format!("{}/ok", server.uri())))
            .await
            .unwrap();
        guard
            .send(guard.client().get(format!("{}/broken", server.uri())))
            .await
            .unwrap();
        drop(guard);

        let metrics = manager.metrics();
        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.successful_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed_requests.load(Ordering::Relaxed), 1);
        assert!(metrics.summary().contains("Total: 2"));
    }
}
