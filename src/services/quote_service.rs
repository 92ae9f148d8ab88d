//! Delivery-quote aggregation across interchangeable provider strategies.
//!
//! The booking flow needs a price per candidate dropoff before the user has
//! committed to one, so quoting runs against a whole list of destinations at
//! once. Strategy selection happens once at startup (`QUOTE_MODE`), not at
//! call sites:
//! - `manual`: constant-formula estimate, no network
//! - `mock`: simplified distance-based formula, no network
//! - `uber` / `doordash` / `roadie`: real quote API over HTTP
//!
//! A destination that fails to quote never aborts the batch; it is logged and
//! filled in with the mock estimate so the user always sees some price.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, time::Duration};

use crate::services::distance_service::haversine_miles;

// Upstream quote APIs rate-limit aggressively; keep batches small and spaced
const QUOTE_BATCH_SIZE: usize = 5;
const BATCH_DELAY_MS: u64 = 400;

const MANUAL_FLAT_RATE: f64 = 14.99;
const MOCK_BASE_FARE: f64 = 7.99;
const MOCK_PER_MILE: f64 = 1.89;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupPoint {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropoffCandidate {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemCounts {
    pub bags: u32,
    pub boxes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub price: f64,
    pub provider_quote_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveProvider {
    UberDirect,
    DoorDashDrive,
    Roadie,
}

impl LiveProvider {
    pub fn as_str(&self) -> &str {
        match self {
            LiveProvider::UberDirect => "uber_direct",
            LiveProvider::DoorDashDrive => "doordash_drive",
            LiveProvider::Roadie => "roadie",
        }
    }

    fn quote_path(&self) -> &str {
        match self {
            LiveProvider::UberDirect => "/v1/delivery_quotes",
            LiveProvider::DoorDashDrive => "/drive/v2/quotes",
            LiveProvider::Roadie => "/v1/estimates",
        }
    }

    fn env_prefix(&self) -> &str {
        match self {
            LiveProvider::UberDirect => "UBER_DIRECT",
            LiveProvider::DoorDashDrive => "DOORDASH_DRIVE",
            LiveProvider::Roadie => "ROADIE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum QuoteStrategy {
    Manual,
    Mock,
    Live(LiveProvider),
}

#[derive(Serialize)]
struct ProviderQuoteRequest {
    pickup_address: String,
    pickup_latitude: f64,
    pickup_longitude: f64,
    dropoff_address: String,
    dropoff_latitude: f64,
    dropoff_longitude: f64,
    item_count: u32,
}

#[derive(Deserialize)]
struct ProviderQuoteResponse {
    id: Option<String>,
    // Uber and DoorDash quote fees in cents; Roadie prices in dollars
    fee: Option<i64>,
    price: Option<f64>,
}

pub struct QuoteService {
    strategy: QuoteStrategy,
    http_client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl QuoteService {
    /// Build a quote service from `QUOTE_MODE` (manual | mock | uber |
    /// doordash | roadie). Unset or unrecognized modes fall back to mock so
    /// a misconfigured deploy still prices bookings.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mode = env::var("QUOTE_MODE").unwrap_or_else(|_| "mock".to_string());
        let strategy = match mode.as_str() {
            "manual" => QuoteStrategy::Manual,
            "mock" => QuoteStrategy::Mock,
            "uber" => QuoteStrategy::Live(LiveProvider::UberDirect),
            "doordash" => QuoteStrategy::Live(LiveProvider::DoorDashDrive),
            "roadie" => QuoteStrategy::Live(LiveProvider::Roadie),
            other => {
                eprintln!("Unknown QUOTE_MODE '{}', falling back to mock quotes", other);
                QuoteStrategy::Mock
            }
        };
        Self::new(strategy)
    }

    pub fn new(strategy: QuoteStrategy) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let (base_url, api_key) = match &strategy {
            QuoteStrategy::Live(provider) => {
                let prefix = provider.env_prefix();
                let base_url = env::var(format!("{}_API_URL", prefix))
                    .map_err(|_| format!("{}_API_URL environment variable not set", prefix))?;
                let api_key = env::var(format!("{}_API_KEY", prefix)).ok();
                (Some(base_url), api_key)
            }
            _ => (None, None),
        };

        Ok(Self {
            strategy,
            http_client,
            base_url,
            api_key,
        })
    }

    /// Build a live-provider service with explicit endpoint and key, without
    /// touching the environment.
    pub fn live_with(
        provider: LiveProvider,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            strategy: QuoteStrategy::Live(provider),
            http_client,
            base_url: Some(base_url.into()),
            api_key,
        })
    }

    pub fn strategy(&self) -> &QuoteStrategy {
        &self.strategy
    }

    /// Price every candidate destination for a pickup.
    ///
    /// Runs in batches of `QUOTE_BATCH_SIZE` concurrent requests with a short
    /// pause between batches. Individual failures are logged and replaced
    /// with the mock estimate; this never returns fewer entries than it was
    /// given destinations, and never errors.
    pub async fn quote_destinations(
        &self,
        pickup: &PickupPoint,
        destinations: &[DropoffCandidate],
        items: &ItemCounts,
    ) -> HashMap<String, DeliveryQuote> {
        let mut quotes = HashMap::new();

        for (batch_index, batch) in destinations.chunks(QUOTE_BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(Duration::from_millis(BATCH_DELAY_MS)).await;
            }

            let batch_futures = batch.iter().map(|destination| async move {
                (destination, self.quote_one(pickup, destination, items).await)
            });

            for (destination, result) in join_all(batch_futures).await {
                match result {
                    Ok(quote) => {
                        quotes.insert(destination.id.clone(), quote);
                    }
                    Err(e) => {
                        eprintln!(
                            "Quote failed for '{}' ({}), substituting mock estimate: {}",
                            destination.name, destination.id, e
                        );
                        quotes.insert(destination.id.clone(), self.mock_quote(pickup, destination));
                    }
                }
            }
        }

        quotes
    }

    /// Distance-based mock estimate, also the per-destination fallback
    pub fn mock_quote(&self, pickup: &PickupPoint, destination: &DropoffCandidate) -> DeliveryQuote {
        let miles = haversine_miles(pickup.lat, pickup.lng, destination.lat, destination.lng);
        let price = ((MOCK_BASE_FARE + MOCK_PER_MILE * miles) * 100.0).round() / 100.0;
        DeliveryQuote {
            price,
            provider_quote_id: None,
        }
    }

    async fn quote_one(
        &self,
        pickup: &PickupPoint,
        destination: &DropoffCandidate,
        items: &ItemCounts,
    ) -> Result<DeliveryQuote, Box<dyn std::error::Error>> {
        match &self.strategy {
            QuoteStrategy::Manual => Ok(DeliveryQuote {
                price: MANUAL_FLAT_RATE,
                provider_quote_id: None,
            }),
            QuoteStrategy::Mock => Ok(self.mock_quote(pickup, destination)),
            QuoteStrategy::Live(provider) => {
                self.fetch_provider_quote(*provider, pickup, destination, items)
                    .await
            }
        }
    }

    async fn fetch_provider_quote(
        &self,
        provider: LiveProvider,
        pickup: &PickupPoint,
        destination: &DropoffCandidate,
        items: &ItemCounts,
    ) -> Result<DeliveryQuote, Box<dyn std::error::Error>> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or("No API URL configured for live quote provider")?;
        let url = format!("{}{}", base_url, provider.quote_path());

        let body = ProviderQuoteRequest {
            pickup_address: format!(
                "{}, {}, {} {}",
                pickup.street, pickup.city, pickup.state, pickup.zip
            ),
            pickup_latitude: pickup.lat,
            pickup_longitude: pickup.lng,
            dropoff_address: format!(
                "{}, {}, {} {}",
                destination.street, destination.city, destination.state, destination.zip
            ),
            dropoff_latitude: destination.lat,
            dropoff_longitude: destination.lng,
            item_count: items.bags + items.boxes,
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(format!(
                "{} quote request failed with status {}",
                provider.as_str(),
                response.status()
            )
            .into());
        }

        let quote: ProviderQuoteResponse = response.json().await?;
        let price = match (quote.fee, quote.price) {
            (Some(cents), _) => cents as f64 / 100.0,
            (None, Some(dollars)) => dollars,
            (None, None) => {
                return Err(format!(
                    "{} quote response carried no fee or price",
                    provider.as_str()
                )
                .into())
            }
        };

        Ok(DeliveryQuote {
            price,
            provider_quote_id: quote.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn pickup() -> PickupPoint {
        PickupPoint {
            street: "600 Congress Ave".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: "78701".to_string(),
            lat: 30.2672,
            lng: -97.7431,
        }
    }

    fn dropoff(id: &str, lat: f64, lng: f64) -> DropoffCandidate {
        DropoffCandidate {
            id: id.to_string(),
            name: format!("Charity {}", id),
            street: "1 Donation Way".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: "78702".to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn test_mock_quote_follows_distance_formula() {
        let service = QuoteService::new(QuoteStrategy::Mock).unwrap();
        let destination = dropoff("a", 30.2672, -97.7431);
        // Same point: just the base fare
        let quote = service.mock_quote(&pickup(), &destination);
        assert_eq!(quote.price, MOCK_BASE_FARE);
        assert!(quote.provider_quote_id.is_none());

        let farther = dropoff("b", 30.5, -97.9);
        let near = service.mock_quote(&pickup(), &destination);
        let far = service.mock_quote(&pickup(), &farther);
        assert!(far.price > near.price);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_to_mock() {
        env::remove_var("QUOTE_MODE");
        let service = QuoteService::from_env().unwrap();
        assert!(matches!(service.strategy(), QuoteStrategy::Mock));
    }

    #[test]
    #[serial]
    fn test_from_env_selects_live_provider() {
        env::set_var("QUOTE_MODE", "doordash");
        env::set_var("DOORDASH_DRIVE_API_URL", "https://openapi.doordash.com");
        let service = QuoteService::from_env().unwrap();
        assert!(matches!(
            service.strategy(),
            QuoteStrategy::Live(LiveProvider::DoorDashDrive)
        ));
        env::remove_var("QUOTE_MODE");
        env::remove_var("DOORDASH_DRIVE_API_URL");
    }

    #[actix_web::test]
    async fn test_manual_mode_prices_every_destination_flat() {
        let service = QuoteService::new(QuoteStrategy::Manual).unwrap();
        let destinations = vec![
            dropoff("a", 30.3, -97.7),
            dropoff("b", 30.4, -97.8),
            dropoff("c", 30.5, -97.9),
        ];
        let quotes = service
            .quote_destinations(&pickup(), &destinations, &ItemCounts { bags: 2, boxes: 1 })
            .await;
        assert_eq!(quotes.len(), 3);
        for quote in quotes.values() {
            assert_eq!(quote.price, MANUAL_FLAT_RATE);
        }
    }
}
