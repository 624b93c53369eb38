use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vexo_core::{DomainError, DomainResult, OrderId};

/// Carrier-side shipment progress.
///
/// This is the parcel's own lifecycle and stays decoupled from the order
/// status: a shipment reaching `delivered` does not implicitly advance the
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    LabelCreated,
    InTransit,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::LabelCreated => "label_created",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
        }
    }
}

impl core::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label_created" => Ok(ShipmentStatus::LabelCreated),
            "in_transit" => Ok(ShipmentStatus::InTransit),
            "delivered" => Ok(ShipmentStatus::Delivered),
            other => Err(DomainError::validation(format!(
                "unknown shipment status '{other}'"
            ))),
        }
    }
}

/// The (single) shipment of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub order_id: OrderId,
    pub carrier: String,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    /// A freshly created shipment: label exists, parcel not yet moving.
    pub fn create(order_id: OrderId, new: NewShipment, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            carrier: new.carrier,
            tracking_number: new.tracking_number,
            status: ShipmentStatus::LabelCreated,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
        }
    }
}

/// Input for creating a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShipment {
    pub carrier: String,
    pub tracking_number: String,
}

impl NewShipment {
    pub fn validate(&self) -> DomainResult<()> {
        if self.carrier.trim().is_empty() {
            return Err(DomainError::validation("carrier cannot be empty"));
        }
        if self.tracking_number.trim().is_empty() {
            return Err(DomainError::validation("tracking_number cannot be empty"));
        }
        Ok(())
    }
}

/// Partial update of shipment progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ShipmentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.shipped_at.is_none() && self.delivered_at.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        Ok(())
    }

    pub fn apply(&self, shipment: &mut Shipment) {
        if let Some(status) = self.status {
            shipment.status = status;
        }
        if let Some(shipped_at) = self.shipped_at {
            shipment.shipped_at = Some(shipped_at);
        }
        if let Some(delivered_at) = self.delivered_at {
            shipment.delivered_at = Some(delivered_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shipment() -> Shipment {
        Shipment::create(
            OrderId::new(),
            NewShipment {
                carrier: "dhl".to_string(),
                tracking_number: "JD014600003GB".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_shipment_starts_with_label_created() {
        let shipment = test_shipment();
        assert_eq!(shipment.status, ShipmentStatus::LabelCreated);
        assert!(shipment.shipped_at.is_none());
        assert!(shipment.delivered_at.is_none());
    }

    #[test]
    fn rejects_blank_carrier_or_tracking() {
        let new = NewShipment {
            carrier: " ".to_string(),
            tracking_number: "x".to_string(),
        };
        assert!(new.validate().is_err());

        let new = NewShipment {
            carrier: "dhl".to_string(),
            tracking_number: "".to_string(),
        };
        assert!(new.validate().is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(ShipmentPatch::default().validate().is_err());
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut shipment = test_shipment();
        let delivered = Utc::now();
        ShipmentPatch {
            status: Some(ShipmentStatus::Delivered),
            delivered_at: Some(delivered),
            ..Default::default()
        }
        .apply(&mut shipment);

        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert_eq!(shipment.delivered_at, Some(delivered));
        assert!(shipment.shipped_at.is_none());
        assert_eq!(shipment.carrier, "dhl");
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ShipmentStatus::LabelCreated,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<ShipmentStatus>().unwrap(), status);
        }
        assert!("returned".parse::<ShipmentStatus>().is_err());
    }
}
