//! Order, line item and shipping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use velvet_haze_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, VariantId};

const MAX_FIELD_LENGTH: usize = 200;

/// Errors from [`ShippingAddress::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShippingAddressError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be at most 200 characters")]
    TooLong(&'static str),
    #[error("country must be a two-letter ISO code")]
    InvalidCountry,
}

/// Destination of an order, stored as JSONB on `commerce.order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2, upper case.
    pub country: String,
}

impl ShippingAddress {
    /// Trim every field, upper-case the country and check required values.
    ///
    /// # Errors
    ///
    /// Returns `ShippingAddressError` if a required field is blank, any field is
    /// too long, or the country is not two ASCII letters.
    pub fn validate(self) -> Result<Self, ShippingAddressError> {
        let required = |value: String, field: &'static str| {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(ShippingAddressError::Missing(field));
            }
            if value.chars().count() > MAX_FIELD_LENGTH {
                return Err(ShippingAddressError::TooLong(field));
            }
            Ok(value)
        };
        let optional = |value: Option<String>, field: &'static str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| {
                    if v.chars().count() > MAX_FIELD_LENGTH {
                        Err(ShippingAddressError::TooLong(field))
                    } else {
                        Ok(v)
                    }
                })
                .transpose()
        };

        let country = self.country.trim().to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ShippingAddressError::InvalidCountry);
        }

        Ok(Self {
            name: required(self.name, "name")?,
            line1: required(self.line1, "line1")?,
            line2: optional(self.line2, "line2")?,
            city: required(self.city, "city")?,
            region: optional(self.region, "region")?,
            postal_code: required(self.postal_code, "postal_code")?,
            country,
        })
    }
}

/// Carrier tracking attached when an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub tracking_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// A line item. Quantity is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i32,
}

/// An order with its items, ordered by item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub shipping_address: Option<ShippingAddress>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Stock put back for one variant by a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoredStock {
    pub variant_id: VariantId,
    pub quantity: i32,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelledOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub reason: String,
    pub restored: Vec<RestoredStock>,
    pub cancelled_at: DateTime<Utc>,
}

impl CancelledOrder {
    /// Total units returned to stock.
    #[must_use]
    pub fn restored_units(&self) -> i64 {
        self.restored.iter().map(|r| i64::from(r.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "  Ada Lovelace ".to_string(),
            line1: "12 Analytical Row".to_string(),
            line2: Some("   ".to_string()),
            city: "London".to_string(),
            region: None,
            postal_code: "N1 9GU".to_string(),
            country: "gb".to_string(),
        }
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let valid = address().validate().unwrap();
        assert_eq!(valid.name, "Ada Lovelace");
        assert_eq!(valid.line2, None);
        assert_eq!(valid.country, "GB");
    }

    #[test]
    fn test_validate_rejects_blank_required_field() {
        let mut addr = address();
        addr.city = " ".to_string();
        assert_eq!(
            addr.validate().unwrap_err(),
            ShippingAddressError::Missing("city")
        );
    }

    #[test]
    fn test_validate_rejects_bad_country() {
        let mut addr = address();
        addr.country = "GBR".to_string();
        assert_eq!(
            addr.validate().unwrap_err(),
            ShippingAddressError::InvalidCountry
        );
    }

    #[test]
    fn test_address_json_shape() {
        let json = serde_json::to_value(address().validate().unwrap()).unwrap();
        assert!(json.get("line2").is_none());
        assert_eq!(json["postal_code"], "N1 9GU");
    }

    #[test]
    fn test_restored_units() {
        let cancelled = CancelledOrder {
            order_id: OrderId::new(1),
            status: OrderStatus::Cancelled,
            reason: "customer request".to_string(),
            restored: vec![
                RestoredStock {
                    variant_id: VariantId::new(10),
                    quantity: 2,
                },
                RestoredStock {
                    variant_id: VariantId::new(11),
                    quantity: 1,
                },
            ],
            cancelled_at: Utc::now(),
        };
        assert_eq!(cancelled.restored_units(), 3);
    }
}
