use bson::oid::ObjectId;
use chrono::NaiveDate;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::services::pricing_service::{PriceBreakdown, SubsidizedBreakdown};

/// A scheduled donation pickup with its price breakdown persisted as
/// discrete columns. The money columns are written whole from a computed
/// breakdown, never patched one field at a time (tip adjustments included -
/// those rewrite every money column from a fresh breakdown).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupBooking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub charity_id: ObjectId,

    // Pickup details
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub pickup_date: NaiveDate,
    pub rush: bool,
    pub bags: u32,
    pub boxes: u32,

    // Inputs the breakdown was computed from, kept so recomputation is
    // deterministic regardless of when it happens
    pub base_cost: f64,
    pub service_fee_pct: f64,
    pub days_in_advance: u32,
    pub charity_subsidy_pct: f64,
    pub company_subsidy_pct: f64,
    pub provider_quote_id: Option<String>,

    // Price breakdown columns
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub rush_fee: f64,
    pub driver_tip: f64,
    pub stripe_fee: f64,
    pub subtotal: f64,
    pub total_price: f64,

    // Subsidy columns, present only when a subsidy applied
    pub original_price: Option<f64>,
    pub charity_subsidy: Option<f64>,
    pub company_subsidy: Option<f64>,
    pub subsidy_total: Option<f64>,
    pub subsidized: bool,

    // Payment
    pub customer_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub status: String,

    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingInput {
    pub charity_id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub pickup_date: NaiveDate,
    #[serde(default)]
    pub rush: bool,
    #[serde(default)]
    pub bags: u32,
    #[serde(default)]
    pub boxes: u32,
    pub base_cost: f64,
    #[serde(default)]
    pub tip: f64,
    pub provider_quote_id: Option<String>,
    #[serde(default)]
    pub charity_subsidy_pct: f64,
    #[serde(default)]
    pub company_subsidy_pct: f64,
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TipUpdateInput {
    pub tip: f64,
}

impl PickupBooking {
    fn base(
        user_id: ObjectId,
        charity_id: ObjectId,
        service_fee_pct: f64,
        days_in_advance: u32,
        input: &BookingInput,
    ) -> Self {
        let time = DateTime::now();
        Self {
            id: None,
            user_id,
            charity_id,
            street: input.street.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            zip: input.zip.clone(),
            pickup_date: input.pickup_date,
            rush: input.rush,
            bags: input.bags,
            boxes: input.boxes,
            base_cost: input.base_cost,
            service_fee_pct,
            days_in_advance,
            charity_subsidy_pct: input.charity_subsidy_pct,
            company_subsidy_pct: input.company_subsidy_pct,
            provider_quote_id: input.provider_quote_id.clone(),
            delivery_fee: 0.0,
            service_fee: 0.0,
            rush_fee: 0.0,
            driver_tip: 0.0,
            stripe_fee: 0.0,
            subtotal: 0.0,
            total_price: 0.0,
            original_price: None,
            charity_subsidy: None,
            company_subsidy: None,
            subsidy_total: None,
            subsidized: false,
            customer_id: input.customer_id.clone(),
            payment_intent_id: None,
            status: "pending".to_string(),
            created_at: Some(time),
            updated_at: Some(time),
        }
    }

    pub fn from_breakdown(
        user_id: ObjectId,
        charity_id: ObjectId,
        service_fee_pct: f64,
        days_in_advance: u32,
        input: &BookingInput,
        breakdown: &PriceBreakdown,
    ) -> Self {
        let mut booking = Self::base(user_id, charity_id, service_fee_pct, days_in_advance, input);
        booking.delivery_fee = breakdown.delivery_fee;
        booking.service_fee = breakdown.service_fee;
        booking.rush_fee = breakdown.rush_fee;
        booking.driver_tip = breakdown.driver_tip;
        booking.stripe_fee = breakdown.stripe_fee;
        booking.subtotal = breakdown.subtotal;
        booking.total_price = breakdown.total_price;
        booking
    }

    pub fn from_subsidized_breakdown(
        user_id: ObjectId,
        charity_id: ObjectId,
        service_fee_pct: f64,
        days_in_advance: u32,
        input: &BookingInput,
        breakdown: &SubsidizedBreakdown,
    ) -> Self {
        let mut booking = Self::base(user_id, charity_id, service_fee_pct, days_in_advance, input);
        booking.delivery_fee = breakdown.delivery_fee;
        booking.service_fee = breakdown.service_fee;
        booking.rush_fee = breakdown.rush_fee;
        booking.driver_tip = breakdown.driver_tip;
        booking.stripe_fee = breakdown.stripe_fee;
        booking.subtotal = breakdown.subtotal;
        booking.total_price = breakdown.total_price;
        booking.original_price = Some(breakdown.original_price);
        booking.charity_subsidy = Some(breakdown.charity_subsidy);
        booking.company_subsidy = Some(breakdown.company_subsidy);
        booking.subsidy_total = Some(breakdown.subsidy_total);
        booking.subsidized = breakdown.subsidized;
        booking
    }

    /// Total in minor currency units, the only figure the payment step gets
    pub fn total_price_cents(&self) -> i64 {
        (self.total_price * 100.0).round() as i64
    }

    /// Why the tip can no longer change, if it can't. Once a payment intent
    /// exists its amount is fixed at the total it was created from, so any
    /// later rewrite of the money columns would capture a mismatched charge.
    pub fn tip_locked_reason(&self) -> Option<&'static str> {
        if self.status == "confirmed" {
            return Some("Booking is already paid");
        }
        if self.payment_intent_id.is_some() {
            return Some("Booking is checked out; the payment amount is locked");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_booking() -> PickupBooking {
        PickupBooking::base(
            ObjectId::new(),
            ObjectId::new(),
            0.225,
            0,
            &BookingInput {
                charity_id: ObjectId::new().to_hex(),
                street: "600 Congress Ave".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip: "78701".to_string(),
                pickup_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
                rush: false,
                bags: 0,
                boxes: 0,
                base_cost: 0.0,
                tip: 0.0,
                provider_quote_id: None,
                charity_subsidy_pct: 0.0,
                company_subsidy_pct: 0.0,
                customer_id: None,
            },
        )
    }

    #[test]
    fn test_total_price_cents_rounds_to_minor_units() {
        let mut booking = sample_booking();
        booking.total_price = 40.65;
        assert_eq!(booking.total_price_cents(), 4065);
    }

    #[test]
    fn test_tip_locks_once_a_payment_intent_exists() {
        let mut booking = sample_booking();
        assert!(booking.tip_locked_reason().is_none());

        // Checkout created an intent for the current total; the tip (and
        // with it the total) must not drift away from that amount
        booking.payment_intent_id = Some("pi_test_123".to_string());
        assert!(booking.tip_locked_reason().is_some());
    }

    #[test]
    fn test_tip_locks_on_confirmed_booking() {
        let mut booking = sample_booking();
        booking.status = "confirmed".to_string();
        assert!(booking.tip_locked_reason().is_some());
    }
}
