use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::pricing_service::PriceBreakdown;
use crate::services::quote_service::{DeliveryQuote, PickupPoint};

/// Request for per-charity quotes: pickup address plus whatever order
/// details the wizard has collected so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pickup: PickupPoint,
    #[serde(default)]
    pub bags: u32,
    #[serde(default)]
    pub boxes: u32,
    #[serde(default)]
    pub rush: bool,
    #[serde(default)]
    pub tip: f64,
    pub pickup_date: Option<NaiveDate>,
}

/// One candidate charity with its delivery quote and preview breakdown,
/// enough for the UI to render a priced charity card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharityQuote {
    pub charity_id: String,
    pub name: String,
    pub verified: bool,
    pub quote: DeliveryQuote,
    pub breakdown: PriceBreakdown,
}
