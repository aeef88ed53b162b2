//! HTTP client for the trail catalog.
//!
//! This module provides:
//! - `GET /api/v1/trails` for the full catalog
//! - Concurrent `GET /api/v1/trails/{id}` fetches, turned straight into
//!   route geometry for the map layer
//! - Dispatch spacing so a burst of detail requests doesn't hammer the service
//! - Retry with exponential backoff on 429, 5xx and connection errors

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::{GeometryConfig, Result, RouteGeometry, Trail, TrailGeometryError};

const TRAILS_PATH: &str = "/api/v1/trails";
const DISPATCH_INTERVAL: Duration = Duration::from_millis(20);
const MAX_CONCURRENCY: usize = 8;
const MAX_RETRIES: u32 = 3;
/// Base wait before retrying a failed request; doubles per retry.
const RETRY_BASE: Duration = Duration::from_millis(200);
/// Base wait after a 429; doubles per consecutive 429.
const THROTTLE_BASE: Duration = Duration::from_millis(500);

/// Result of fetching one trail and computing its geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailFetchResult {
    pub id: String,
    pub name: Option<String>,
    pub geometry: Option<RouteGeometry>,
    pub error: Option<String>,
}

impl TrailFetchResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Progress callback type: `(completed, total)`.
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Largest doubling applied to a backoff base (32x).
const MAX_BACKOFF_SHIFT: u32 = 5;

/// `base * 2^attempt`, with the exponent capped at [`MAX_BACKOFF_SHIFT`].
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.min(MAX_BACKOFF_SHIFT))
}

/// Paces catalog requests: request starts are spaced `interval` apart, and
/// consecutive 429s from the catalog grow a shared backoff.
struct CatalogPacer {
    interval: Duration,
    throttle_base: Duration,
    next_slot: Mutex<Instant>,
    started: AtomicU32,
    throttled_in_a_row: AtomicU32,
}

impl CatalogPacer {
    fn new(interval: Duration, throttle_base: Duration) -> Self {
        Self {
            interval,
            throttle_base,
            next_slot: Mutex::new(Instant::now()),
            started: AtomicU32::new(0),
            throttled_in_a_row: AtomicU32::new(0),
        }
    }

    /// Claim the next start slot and sleep until it. Returns the 1-based
    /// request number.
    async fn claim_slot(&self) -> u32 {
        let (delay, request_num) = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.interval;
            let num = self.started.fetch_add(1, Ordering::Relaxed) + 1;
            (slot.saturating_duration_since(now), num)
        };

        if !delay.is_zero() {
            debug!("[TrailCatalogClient] request #{} waits {:?}", request_num, delay);
            tokio::time::sleep(delay).await;
        }
        request_num
    }

    fn catalog_answered(&self) {
        self.throttled_in_a_row.store(0, Ordering::Relaxed);
    }

    /// Record a 429 and return how long to hold off.
    fn catalog_throttled(&self) -> Duration {
        let streak = self.throttled_in_a_row.fetch_add(1, Ordering::Relaxed) + 1;
        let wait = backoff(self.throttle_base, streak);
        warn!(
            "[TrailCatalogClient] catalog throttled us ({} in a row), waiting {:?}",
            streak, wait
        );
        wait
    }
}

/// Client for the trail catalog service.
pub struct TrailCatalogClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_base: Duration,
    pacer: CatalogPacer,
}

impl TrailCatalogClient {
    /// Create a client for the catalog at `base_url` (e.g. `http://localhost:8081`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY * 2)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TrailGeometryError::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
            retry_base: RETRY_BASE,
            pacer: CatalogPacer::new(DISPATCH_INTERVAL, THROTTLE_BASE),
        })
    }

    /// Override how many times a transient failure is retried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the spacing between request starts and the base waits used
    /// after failures (`retry_base`) and 429s (`throttle_base`).
    pub fn with_pacing(
        mut self,
        interval: Duration,
        retry_base: Duration,
        throttle_base: Duration,
    ) -> Self {
        self.retry_base = retry_base;
        self.pacer = CatalogPacer::new(interval, throttle_base);
        self
    }

    fn trails_url(&self) -> String {
        format!("{}{}", self.base_url, TRAILS_PATH)
    }

    fn trail_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, TRAILS_PATH, id)
    }

    /// `GET /api/v1/trails`.
    pub async fn fetch_trails(&self) -> Result<Vec<Trail>> {
        let start = Instant::now();
        let trails: Vec<Trail> = self.get_json(&self.trails_url()).await?;
        info!("[TrailCatalogClient] Fetched {} trails in {:?}", trails.len(), start.elapsed());
        Ok(trails)
    }

    /// `GET /api/v1/trails/{id}`.
    pub async fn fetch_trail(&self, id: &str) -> Result<Trail> {
        self.get_json(&self.trail_url(id)).await
    }

    /// Fetch many trails concurrently and compute their geometry.
    ///
    /// Failures are reported per trail; the output order is completion
    /// order, not input order.
    pub async fn fetch_trail_geometries(
        &self,
        ids: Vec<String>,
        config: &GeometryConfig,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<TrailFetchResult> {
        use futures::stream::{self, StreamExt};

        let total = ids.len() as u32;
        let completed = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        info!(
            "[TrailCatalogClient] Fetching {} trails (spacing {:?}, max concurrent: {})",
            total, self.pacer.interval, MAX_CONCURRENCY
        );

        let results: Vec<TrailFetchResult> = stream::iter(ids)
            .map(|id| {
                let completed = Arc::clone(&completed);
                let callback = on_progress.clone();

                async move {
                    self.pacer.claim_slot().await;

                    let result = match self.fetch_trail(&id).await {
                        Ok(trail) => TrailFetchResult {
                            id,
                            name: Some(trail.name.clone()),
                            geometry: Some(trail.geometry(config)),
                            error: None,
                        },
                        Err(e) => TrailFetchResult {
                            id,
                            name: None,
                            geometry: None,
                            error: Some(e.to_string()),
                        },
                    };

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("[Progress] {}/{} ({})", done, total, result.id);
                    if let Some(ref cb) = callback {
                        cb(done, total);
                    }

                    result
                }
            })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        let success_count = results.iter().filter(|r| r.success()).count();
        info!(
            "[TrailCatalogClient] DONE: {}/{} success in {:.2}s",
            success_count,
            total,
            start.elapsed().as_secs_f64()
        );

        results
    }

    /// GET `url` and decode JSON, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut retries = 0;

        loop {
            let err = match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = self.pacer.catalog_throttled();
                        if retries < self.max_retries {
                            retries += 1;
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        http_error(status, "Max retries exceeded")
                    } else if !status.is_success() {
                        http_error(status, "Request failed")
                    } else {
                        self.pacer.catalog_answered();
                        let bytes = resp.bytes().await.map_err(|e| TrailGeometryError::Http {
                            message: format!("Body download error: {}", e),
                            status_code: Some(status.as_u16()),
                        })?;
                        return Ok(serde_json::from_slice(&bytes)?);
                    }
                }
                Err(e) => TrailGeometryError::Http {
                    message: format!("Request error: {}", e),
                    status_code: e.status().map(|s| s.as_u16()),
                },
            };

            if !err.is_transient() || retries >= self.max_retries {
                return Err(err);
            }

            retries += 1;
            let wait = backoff(self.retry_base, retries);
            warn!("[Fetch {}] {}, retry {} after {:?}", url, err, retries, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

fn http_error(status: StatusCode, what: &str) -> TrailGeometryError {
    TrailGeometryError::Http {
        message: format!("{}: HTTP {}", what, status),
        status_code: Some(status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ONE_TRAIL: &str = r#"[{"name":"Babele","latitude":45.405,"longitude":25.474}]"#;
    const TRAIL_DETAIL: &str = r#"{"name":"Jepii Mici","latitude":45.41,"longitude":25.50,
        "waypoints":[[45.41,25.50],[45.42,25.49],[45.43,25.50]]}"#;

    /// Local catalog stand-in: answers one connection per canned
    /// `(status, body)`, then stops listening. Returns the base URL and the
    /// instant each connection was accepted.
    async fn canned_catalog(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, Arc<StdMutex<Vec<Instant>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(StdMutex::new(Vec::new()));
        let log = Arc::clone(&accepted);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                log.lock().unwrap().push(Instant::now());

                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base_url, accepted)
    }

    fn fast_client(base_url: &str) -> TrailCatalogClient {
        TrailCatalogClient::new(base_url).unwrap().with_pacing(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let base = Duration::from_millis(200);
        assert_eq!(backoff(base, 0), base);
        assert_eq!(backoff(base, 1), Duration::from_millis(400));
        assert_eq!(backoff(base, 3), Duration::from_millis(1600));
        assert_eq!(backoff(base, 5), Duration::from_millis(6400));
        assert_eq!(backoff(base, 64), Duration::from_millis(6400));
        assert_eq!(backoff(base, u32::MAX), Duration::from_millis(6400));
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = TrailCatalogClient::new("http://localhost:8081/").unwrap();
        assert_eq!(client.trails_url(), "http://localhost:8081/api/v1/trails");
        assert_eq!(client.trail_url("abc"), "http://localhost:8081/api/v1/trails/abc");
    }

    #[tokio::test]
    async fn test_retries_429_then_decodes() {
        let (base_url, accepted) =
            canned_catalog(vec![(429, ""), (429, ""), (200, ONE_TRAIL)]).await;

        let trails = fast_client(&base_url).fetch_trails().await.unwrap();

        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].name, "Babele");
        assert_eq!(accepted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_server_error() {
        let (base_url, accepted) = canned_catalog(vec![(503, ""), (200, ONE_TRAIL)]).await;

        let trails = fast_client(&base_url).fetch_trails().await.unwrap();

        assert_eq!(trails.len(), 1);
        assert_eq!(accepted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (base_url, accepted) = canned_catalog(vec![(404, "{}")]).await;

        let err = fast_client(&base_url).fetch_trail("missing").await.unwrap_err();

        assert!(!err.is_transient(), "unexpected error: {}", err);
        assert!(matches!(err, TrailGeometryError::Http { status_code: Some(404), .. }));
        assert_eq!(accepted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (base_url, accepted) = canned_catalog(vec![(500, ""), (500, ""), (500, "")]).await;

        let err = fast_client(&base_url)
            .with_max_retries(2)
            .fetch_trails()
            .await
            .unwrap_err();

        assert!(matches!(err, TrailGeometryError::Http { status_code: Some(500), .. }));
        assert_eq!(accepted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_geometry_requests_are_spaced() {
        let (base_url, accepted) = canned_catalog(vec![
            (200, TRAIL_DETAIL),
            (200, TRAIL_DETAIL),
            (200, TRAIL_DETAIL),
        ])
        .await;
        let client = TrailCatalogClient::new(&base_url).unwrap().with_pacing(
            Duration::from_millis(60),
            Duration::from_millis(5),
            Duration::from_millis(5),
        );

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = client
            .fetch_trail_geometries(ids, &GeometryConfig::default(), None)
            .await;

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.success(), "{:?}", result.error);
            assert_eq!(result.name.as_deref(), Some("Jepii Mici"));
            assert_eq!(result.geometry.as_ref().unwrap().smoothed.len(), 11);
        }

        let accepted = accepted.lock().unwrap();
        assert_eq!(accepted.len(), 3);
        for pair in accepted.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_millis(45), "requests only {:?} apart", gap);
        }
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_transient_error() {
        // Port 9 (discard) is essentially never listening on localhost.
        let client = TrailCatalogClient::new("http://127.0.0.1:9")
            .unwrap()
            .with_max_retries(0);
        let err = client.fetch_trails().await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_geometries_report_per_trail_errors() {
        let client = TrailCatalogClient::new("http://127.0.0.1:9")
            .unwrap()
            .with_max_retries(0);

        let seen = Arc::new(AtomicU32::new(0));
        let seen_cb = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |_, _| {
            seen_cb.fetch_add(1, Ordering::Relaxed);
        });

        let results = client
            .fetch_trail_geometries(
                vec!["a".into(), "b".into()],
                &GeometryConfig::default(),
                Some(progress),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success() && r.geometry.is_none()));
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }
}
