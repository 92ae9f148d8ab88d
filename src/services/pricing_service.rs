use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which service-fee rate the engine charges.
///
/// The booking flow historically carried a per-destination rate (verified
/// charities get a lower rate than unverified ones) alongside a fixed display
/// rate, and only one of them can win. The mode makes that choice explicit
/// instead of letting one parameter silently shadow the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFeeMode {
    /// Always charge the configured `service_fee_pct`.
    Fixed,
    /// Charge the per-order rate carried on `OrderModifiers::service_fee_pct`.
    PerDestination,
}

/// Immutable rate table injected into the pricing engine.
///
/// All percentages are fractions (0.75 = 75%). Kept as a value passed in at
/// startup so tests can run varied tables without global state.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub delivery_markup_pct: f64,
    pub service_fee_pct: f64,
    pub service_fee_mode: ServiceFeeMode,
    pub state_fee_pct: f64,
    /// State codes that get the regional surcharge applied to the base cost
    pub surcharge_states: Vec<String>,
    /// Per-unit fees that pass 100% through to the driver
    pub bag_unit_fee: f64,
    pub box_unit_fee: f64,
    pub max_tip: f64,
    /// Reserved: rush pickups currently cost nothing extra
    pub rush_fee: f64,
    pub stripe_fixed_fee: f64,
    pub stripe_pct_fee: f64,
    /// Advance-booking discount breakpoints, sorted ascending by day count.
    /// The greatest breakpoint <= days_in_advance applies, so the table is
    /// total over any day count (0 and 1 land on the 0% entry, 7+ saturates).
    pub discount_tiers: Vec<(u32, f64)>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_markup_pct: 0.75,
            service_fee_pct: 0.225,
            service_fee_mode: ServiceFeeMode::Fixed,
            state_fee_pct: 0.075,
            surcharge_states: vec!["TX".to_string(), "CA".to_string()],
            bag_unit_fee: 0.57,
            box_unit_fee: 1.13,
            max_tip: 100.0,
            rush_fee: 0.0,
            stripe_fixed_fee: 0.30,
            stripe_pct_fee: 0.029,
            discount_tiers: vec![
                (0, 0.0),
                (2, 0.05),
                (3, 0.10),
                (4, 0.15),
                (5, 0.20),
                (6, 0.225),
                (7, 0.25),
            ],
        }
    }
}

/// Order parameters collected across the booking steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderModifiers {
    pub base_cost: f64,
    pub rush: bool,
    pub tip: f64,
    /// Per-destination service-fee rate; only read in `PerDestination` mode
    pub service_fee_pct: f64,
    pub state: Option<String>,
    pub bags: u32,
    pub boxes: u32,
    pub days_in_advance: u32,
}

impl Default for OrderModifiers {
    fn default() -> Self {
        Self {
            base_cost: 0.0,
            rush: false,
            tip: 0.0,
            service_fee_pct: 0.225,
            state: None,
            bags: 0,
            boxes: 0,
            days_in_advance: 0,
        }
    }
}

/// Line-item price breakdown shown to the customer and persisted verbatim
/// onto the booking record. Immutable once computed; any change other than a
/// tip-only adjustment goes back through the engine from the stored base cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub rush_fee: f64,
    pub driver_tip: f64,
    pub stripe_fee: f64,
    pub subtotal: f64,
    pub total_price: f64,
}

/// Result of stacking the charity-sponsor and employer subsidies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidySplit {
    pub charity_amount: f64,
    pub company_amount: f64,
    pub total_amount: f64,
    pub customer_pays: f64,
}

/// Breakdown for a subsidized order: the pre-subsidy "original price" plus
/// per-source subsidy amounts, with the tip grossed up on its own after the
/// subsidies have been taken off the non-tip portion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsidizedBreakdown {
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub rush_fee: f64,
    pub driver_tip: f64,
    pub stripe_fee: f64,
    pub subtotal: f64,
    pub original_price: f64,
    pub charity_subsidy: f64,
    pub company_subsidy: f64,
    pub subsidy_total: f64,
    pub subsidized: bool,
    pub total_price: f64,
}

pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Compute the full price breakdown for an order.
    ///
    /// The advance-booking discount and state surcharge only ever touch the
    /// pre-tip delivery/service lines; bag and box fees pass through to the
    /// driver undiscounted but are shown inside the delivery fee line.
    pub fn price(&self, order: &OrderModifiers) -> PriceBreakdown {
        let c = &self.config;
        let tip = order.tip.clamp(0.0, c.max_tip);
        let (delivery_fee, service_fee, rush_fee) = self.fee_lines(order);

        let subtotal = delivery_fee + service_fee + rush_fee + tip;
        let total = self.gross_up(subtotal);

        PriceBreakdown {
            delivery_fee: round2(delivery_fee),
            service_fee: round2(service_fee),
            rush_fee: round2(rush_fee),
            driver_tip: round2(tip),
            stripe_fee: round2(total - subtotal),
            subtotal: round2(subtotal),
            total_price: round2(total),
        }
    }

    /// Compute the breakdown for an order with subsidies applied.
    ///
    /// Diverges from `price` after the pre-tip subtotal: that subtotal is
    /// grossed up into the "original price", the subsidies stack against it,
    /// and the tip (if any) is grossed up separately and added on top so the
    /// subsidies never touch the tip.
    pub fn price_with_subsidies(
        &self,
        order: &OrderModifiers,
        charity_pct: f64,
        company_pct: f64,
    ) -> SubsidizedBreakdown {
        let c = &self.config;
        let tip = order.tip.clamp(0.0, c.max_tip);
        let (delivery_fee, service_fee, rush_fee) = self.fee_lines(order);

        let pre_tip_subtotal = delivery_fee + service_fee + rush_fee;
        let original_price = round2(self.gross_up(pre_tip_subtotal));

        let split = stack_subsidies(original_price, charity_pct, company_pct);

        // A zero tip contributes exactly nothing - no fixed-fee artifact
        let tip_total = if tip > 0.0 { self.gross_up(tip) } else { 0.0 };
        let total = split.customer_pays + tip_total;

        SubsidizedBreakdown {
            delivery_fee: round2(delivery_fee),
            service_fee: round2(service_fee),
            rush_fee: round2(rush_fee),
            driver_tip: round2(tip),
            stripe_fee: round2((original_price - pre_tip_subtotal) + (tip_total - tip)),
            subtotal: round2(pre_tip_subtotal + tip),
            original_price,
            charity_subsidy: split.charity_amount,
            company_subsidy: split.company_amount,
            subsidy_total: split.total_amount,
            subsidized: split.total_amount > 0.0,
            total_price: round2(total),
        }
    }

    /// Attach a tip to an already-finalized non-tip breakdown.
    ///
    /// This is the one permitted incremental adjustment: the tip is clamped
    /// and grossed up with its own processor fee, leaving the non-tip lines
    /// untouched. A zero tip returns the breakdown unchanged.
    pub fn apply_tip(&self, base: &PriceBreakdown, tip: f64) -> PriceBreakdown {
        let tip = tip.clamp(0.0, self.config.max_tip);
        if tip <= 0.0 {
            return base.clone();
        }

        let tip_total = self.gross_up(tip);

        PriceBreakdown {
            delivery_fee: base.delivery_fee,
            service_fee: base.service_fee,
            rush_fee: base.rush_fee,
            driver_tip: round2(tip),
            stripe_fee: round2(base.stripe_fee + (tip_total - tip)),
            subtotal: round2(base.subtotal + tip),
            total_price: round2(base.total_price + tip_total),
        }
    }

    /// Advance-booking discount rate for a day count: greatest breakpoint
    /// at or below `days` wins.
    pub fn discount_pct(&self, days: u32) -> f64 {
        self.config
            .discount_tiers
            .iter()
            .take_while(|(d, _)| *d <= days)
            .last()
            .map(|(_, pct)| *pct)
            .unwrap_or(0.0)
    }

    /// Pre-tip fee lines (delivery, service, rush), unrounded.
    fn fee_lines(&self, order: &OrderModifiers) -> (f64, f64, f64) {
        let c = &self.config;

        let bag_box_total =
            order.bags as f64 * c.bag_unit_fee + order.boxes as f64 * c.box_unit_fee;
        let delivery_markup = order.base_cost * c.delivery_markup_pct;
        let state_fee = if self.surcharge_applies(order.state.as_deref()) {
            order.base_cost * c.state_fee_pct
        } else {
            0.0
        };

        let service_pct = match c.service_fee_mode {
            ServiceFeeMode::Fixed => c.service_fee_pct,
            ServiceFeeMode::PerDestination => order.service_fee_pct,
        };

        let discount = self.discount_pct(order.days_in_advance);

        // Bag/box fees ride inside the delivery fee line but are never
        // discounted; they pass 100% through to the driver.
        let delivery_fee =
            (order.base_cost + delivery_markup + state_fee) * (1.0 - discount) + bag_box_total;
        let service_fee = order.base_cost * service_pct * (1.0 - discount);
        let rush_fee = if order.rush { c.rush_fee } else { 0.0 };

        (delivery_fee, service_fee, rush_fee)
    }

    fn surcharge_applies(&self, state: Option<&str>) -> bool {
        match state {
            Some(code) => self
                .config
                .surcharge_states
                .iter()
                .any(|s| s.eq_ignore_ascii_case(code)),
            None => false,
        }
    }

    /// Gross up an amount so the merchant nets it after the processor takes
    /// its cut: `total = (amount + fixed) / (1 - pct)`.
    fn gross_up(&self, amount: f64) -> f64 {
        (amount + self.config.stripe_fixed_fee) / (1.0 - self.config.stripe_pct_fee)
    }
}

/// Stack the charity and employer subsidies against a base price.
///
/// Order matters: the charity subsidy always comes off the full base price
/// first, then the company subsidy comes off what remains. 50% charity +
/// 100% company on $20 owes $0, not a double-discounted negative.
pub fn stack_subsidies(base_price: f64, charity_pct: f64, company_pct: f64) -> SubsidySplit {
    let charity_pct = charity_pct.clamp(0.0, 100.0);
    let company_pct = company_pct.clamp(0.0, 100.0);

    let charity_amount = base_price * charity_pct / 100.0;
    let remaining = base_price - charity_amount;
    let company_amount = remaining * company_pct / 100.0;
    let total_amount = charity_amount + company_amount;
    let customer_pays = (base_price - total_amount).max(0.0);

    SubsidySplit {
        charity_amount: round2(charity_amount),
        company_amount: round2(company_amount),
        total_amount: round2(total_amount),
        customer_pays: round2(customer_pays),
    }
}

/// Calendar days between today and the scheduled pickup, floored at 0.
pub fn days_in_advance(scheduled: NaiveDate, today: NaiveDate) -> u32 {
    (scheduled - today).num_days().max(0) as u32
}

fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
