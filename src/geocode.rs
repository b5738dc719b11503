//! Plus-code to place-name lookup with a time-bounded cache.
//!
//! Lookups go over the network and are never made while the snapshot lock
//! is held. Any failure or timeout yields [`UNKNOWN_PLACE`]; only successful
//! answers are cached.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

pub const UNKNOWN_PLACE: &str = "Unknown place";

const USER_AGENT: &str = "ecowitt-meshtastic";
const PLUS_CODES_URL: &str = "https://plus.codes/api";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

// ---

#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Resolve an opaque location id to a human readable place.
    async fn lookup(&self, location: &str) -> Result<String>;
}

/// Resolves through the plus.codes API and Nominatim reverse geocoding.
#[derive(Debug, Clone)]
pub struct HttpPlaceLookup {
    client: reqwest::Client,
}

impl HttpPlaceLookup {
    pub fn new(timeout: Duration) -> Result<Self> {
        // ---
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build geocoding HTTP client")?;
        Ok(Self { client })
    }

    async fn coordinates(&self, plus_code: &str) -> Result<(f64, f64)> {
        // ---
        let body: Value = self
            .client
            .get(PLUS_CODES_URL)
            .query(&[("address", plus_code)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let location = &body["plus_code"]["geometry"]["location"];
        match (location["lat"].as_f64(), location["lng"].as_f64()) {
            (Some(lat), Some(lng)) => Ok((lat, lng)),
            _ => Err(anyhow!("No coordinates for plus code '{plus_code}'")),
        }
    }

    async fn place_name(&self, lat: f64, lng: f64) -> Result<String> {
        // ---
        let body: Value = self
            .client
            .get(NOMINATIM_URL)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body["display_name"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No display_name for {lat},{lng}"))
    }
}

#[async_trait]
impl PlaceLookup for HttpPlaceLookup {
    async fn lookup(&self, location: &str) -> Result<String> {
        let (lat, lng) = self.coordinates(location).await?;
        self.place_name(lat, lng).await
    }
}

#[derive(Debug, Clone)]
struct CachedPlace {
    location: String,
    name: String,
    fetched: Instant,
}

/// Caching front for a [`PlaceLookup`]; `None` disables lookups entirely.
pub struct PlaceResolver {
    lookup: Option<Box<dyn PlaceLookup>>,
    timeout: Duration,
    ttl: Duration,
    cache: Mutex<Option<CachedPlace>>,
}

impl PlaceResolver {
    pub fn new(lookup: Option<Box<dyn PlaceLookup>>, timeout: Duration, ttl: Duration) -> Self {
        Self {
            lookup,
            timeout,
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO, Duration::ZERO)
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedPlace>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, location: &str) -> Option<String> {
        self.cache()
            .as_ref()
            .filter(|c| c.location == location && c.fetched.elapsed() < self.ttl)
            .map(|c| c.name.clone())
    }

    /// Place name for `location`, or [`UNKNOWN_PLACE`]. Never fails.
    pub async fn resolve(&self, location: &str) -> String {
        // ---
        let Some(lookup) = self.lookup.as_ref() else {
            return UNKNOWN_PLACE.to_string();
        };
        if let Some(name) = self.cached(location) {
            return name;
        }

        match tokio::time::timeout(self.timeout, lookup.lookup(location)).await {
            Ok(Ok(name)) => {
                tracing::info!("Resolved location {} to '{}'", location, name);
                *self.cache() = Some(CachedPlace {
                    location: location.to_string(),
                    name: name.clone(),
                    fetched: Instant::now(),
                });
                name
            }
            Ok(Err(e)) => {
                tracing::warn!("Geocoding failed for {}: {:#}", location, e);
                UNKNOWN_PLACE.to_string()
            }
            Err(_) => {
                tracing::warn!("Geocoding timed out for {} after {:?}", location, self.timeout);
                UNKNOWN_PLACE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingLookup {
        calls: Arc<AtomicUsize>,
        answer: Option<&'static str>,
        delay: Duration,
    }

    #[async_trait]
    impl PlaceLookup for CountingLookup {
        async fn lookup(&self, _location: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer
                .map(str::to_string)
                .ok_or_else(|| anyhow!("lookup failed"))
        }
    }

    fn resolver(answer: Option<&'static str>, delay: Duration) -> (PlaceResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = CountingLookup {
            calls: calls.clone(),
            answer,
            delay,
        };
        let resolver = PlaceResolver::new(
            Some(Box::new(lookup)),
            Duration::from_millis(200),
            Duration::from_secs(86_400),
        );
        (resolver, calls)
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        // ---
        let (resolver, calls) = resolver(Some("Bologna, Italy"), Duration::ZERO);
        assert_eq!(resolver.resolve("8FHJVFRR+3W").await, "Bologna, Italy");
        assert_eq!(resolver.resolve("8FHJVFRR+3W").await, "Bologna, Italy");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // a different location is not served from the cache
        resolver.resolve("8FHJVHR9+VM").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_is_not_cached() {
        // ---
        let (resolver, calls) = resolver(None, Duration::ZERO);
        assert_eq!(resolver.resolve("x").await, UNKNOWN_PLACE);
        assert_eq!(resolver.resolve("x").await, UNKNOWN_PLACE);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        // ---
        let (resolver, _) = resolver(Some("late"), Duration::from_secs(5));
        let started = Instant::now();
        assert_eq!(resolver.resolve("x").await, UNKNOWN_PLACE);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_disabled_resolver() {
        // ---
        assert_eq!(PlaceResolver::disabled().resolve("x").await, UNKNOWN_PLACE);
    }
}
