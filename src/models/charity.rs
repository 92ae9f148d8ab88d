use bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::services::quote_service::DropoffCandidate;

// Verified charities carry a reduced service-fee rate
const VERIFIED_SERVICE_FEE_PCT: f64 = 0.175;
const UNVERIFIED_SERVICE_FEE_PCT: f64 = 0.225;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub coordinates: (f64, f64),
    pub verified: bool,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

impl Charity {
    /// Per-destination service-fee rate, keyed off verification status.
    /// Only charged when the pricing engine runs in `PerDestination` mode.
    pub fn service_fee_pct(&self) -> f64 {
        if self.verified {
            VERIFIED_SERVICE_FEE_PCT
        } else {
            UNVERIFIED_SERVICE_FEE_PCT
        }
    }

    pub fn dropoff_candidate(&self) -> DropoffCandidate {
        DropoffCandidate {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: self.name.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            lat: self.coordinates.0,
            lng: self.coordinates.1,
        }
    }
}
