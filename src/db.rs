//! The per-simulation database core: simulated clock, active user,
//! world context tables and the mutable order book.
//!
//! Every simulation owns a fresh DB built from its task's environment
//! blob. Domain DBs embed [`Db`] (serde-flattened) and add their own
//! catalogs; nothing here is shared between simulations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VendError};
use crate::message::JsonMap;
use crate::utils::{self, TIME_FORMAT};

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} longitude:{},latitude:{}",
            self.address, self.longitude, self.latitude
        )
    }
}

/// One city-and-date weather record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub city: String,
    pub category: String,
    pub datetime: String,
    /// (low, high) in Celsius.
    pub temperature: (f64, f64),
    /// Relative humidity in %.
    pub humidity: f64,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "city: {}, weather: {}, datetime: {}, temperature: {}~{}, humidity: {}",
            self.city, self.category, self.datetime, self.temperature.0, self.temperature.1, self.humidity
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Unconsumed,
    Consumed,
    Processed,
    InProgress,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Paid => "paid",
            OrderStatus::Unconsumed => "unconsumed",
            OrderStatus::Consumed => "consumed",
            OrderStatus::Processed => "processed",
            OrderStatus::InProgress => "in-progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Delivery,
    Instore,
    Hotel,
    Attraction,
    Flight,
    Train,
}

impl OrderType {
    /// How the store reference is labelled when an order is rendered.
    pub fn store_field_label(self) -> &'static str {
        match self {
            OrderType::Delivery => "store_id",
            OrderType::Instore => "shop_id",
            OrderType::Hotel => "hotel_id",
            OrderType::Attraction => "attraction_id",
            OrderType::Flight => "flight_id",
            OrderType::Train => "train_id",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderType::Delivery => "delivery",
            OrderType::Instore => "instore",
            OrderType::Hotel => "hotel",
            OrderType::Attraction => "attraction",
            OrderType::Flight => "flight",
            OrderType::Train => "train",
        };
        write!(f, "{text}")
    }
}

/// An order with its line items, status, fulfilment and payment details.
/// Line items are domain product snapshots kept as JSON so one order type
/// covers every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub order_type: OrderType,
    pub user_id: String,
    pub store_id: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub dispatch_time: Option<String>,
    /// Minutes from dispatch to delivery.
    #[serde(default)]
    pub shipping_time: Option<f64>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    #[serde(default)]
    pub products: Vec<Value>,
}

fn default_status() -> OrderStatus {
    OrderStatus::Unpaid
}

impl Order {
    /// Compact single-line form used in order listings.
    pub fn summary(&self) -> String {
        format!(
            "Order(order_id:{}, order_type:{}, user_id:{}, {}:{}, total_price:{}, create_time:{}, update_time:{}, status:{})",
            self.order_id,
            self.order_type,
            self.user_id,
            self.order_type.store_field_label(),
            self.store_id,
            self.total_price,
            self.create_time,
            self.update_time,
            self.status,
        )
    }

    /// Full form including line items (and the delivery fulfilment fields
    /// when applicable).
    pub fn detail(&self) -> String {
        let products = serde_json::to_string(&self.products).unwrap_or_default();
        if self.order_type == OrderType::Delivery {
            format!(
                "Order(order_id:{}, order_type:{}, user_id:{}, {}:{}, dispatch_time:{}, shipping_time:{}, delivery_time:{}, total_price:{}, create_time:{}, update_time:{}, note:{}, status:{}, products:{})",
                self.order_id,
                self.order_type,
                self.user_id,
                self.order_type.store_field_label(),
                self.store_id,
                self.dispatch_time.as_deref().unwrap_or(""),
                self.shipping_time.unwrap_or(0.0),
                self.delivery_time.as_deref().unwrap_or(""),
                self.total_price,
                self.create_time,
                self.update_time,
                self.note.as_deref().unwrap_or(""),
                self.status,
                products,
            )
        } else {
            format!(
                "Order(order_id:{}, order_type:{}, user_id:{}, {}:{}, total_price:{}, create_time:{}, update_time:{}, status:{}, products:{})",
                self.order_id,
                self.order_type,
                self.user_id,
                self.order_type.store_field_label(),
                self.store_id,
                self.total_price,
                self.create_time,
                self.update_time,
                self.status,
                products,
            )
        }
    }
}

/// Per-scenario order-id layout: hash prefix, visible id prefix, and the
/// parameters concatenated into the hash input, in order.
fn scenario_config(scenario: &str) -> Option<(&'static str, &'static str, &'static [&'static str])> {
    match scenario {
        "delivery" => Some(("#DELIVERY#", "OT", &["user_id"])),
        "hotel" => Some(("#HOTEL#", "OO", &["hotel_id", "product_id", "user_id"])),
        "attraction" => Some(("#ATTRACTION#", "OO", &["user_id"])),
        "flight" => Some(("#FLIGHT#", "OO", &["user_id"])),
        "train" => Some(("#TRAIN#", "OO", &["user_id"])),
        "instore" => Some(("#INSTORE#", "OI", &[])),
        "instore_book" => Some(("#INSTORE_BOOK#", "OI", &[])),
        "instore_reservation" => Some(("#INSTORE_RESV#", "OI", &[])),
        _ => None,
    }
}

/// The shared core every domain database embeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Db {
    /// Current simulated wall-clock time, `%Y-%m-%d %H:%M:%S`.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub weather: Option<Vec<Weather>>,
    /// Address → coordinates lookup table.
    #[serde(default)]
    pub location: Option<Vec<Location>>,
    #[serde(default)]
    pub user_historical_behaviors: Option<JsonMap>,
    #[serde(default)]
    pub orders: BTreeMap<String, Order>,
}

impl Db {
    /// The simulated clock when pinned, otherwise the real clock.
    pub fn now(&self, format: &str) -> String {
        match &self.time {
            Some(time) if !time.is_empty() => time.clone(),
            _ => utils::get_now(format),
        }
    }

    pub fn now_time(&self) -> String {
        self.now(TIME_FORMAT)
    }

    /// Deterministic order-id assignment. The clock component comes from
    /// the simulated time when pinned, so re-execution with the same
    /// inputs yields the same id.
    pub fn assign_order_id(
        &self,
        scenario: &str,
        user_id: &str,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let (hash_prefix, id_prefix, params) = scenario_config(scenario)
            .ok_or_else(|| VendError::UnknownScenario(scenario.to_string()))?;

        let mut hash_input = String::from(hash_prefix);
        for param in params {
            if *param == "user_id" {
                hash_input.push_str(user_id);
            } else if let Some((_, value)) = extra.iter().find(|(name, _)| name == param) {
                hash_input.push_str(value);
            } else {
                return Err(VendError::MissingOrderParam((*param).to_string()));
            }
        }

        let timestamp = utils::unix_timestamp(self.time.as_deref());
        let digest = utils::get_hash(&format!("{hash_input}{timestamp}"));
        Ok(format!("{id_prefix}{}", &digest[..10]))
    }

    pub fn get_statistics(&self) -> JsonMap {
        JsonMap::new()
    }
}

/// SHA-256 of the canonical JSON dump of any serializable DB.
pub fn db_hash<T: Serialize>(db: &T) -> String {
    let value = serde_json::to_value(db).unwrap_or(Value::Null);
    utils::get_value_hash(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned_db() -> Db {
        Db {
            time: Some("2025-08-01 10:00:00".into()),
            user_id: Some("user_001".into()),
            ..Default::default()
        }
    }

    #[test]
    fn order_id_is_deterministic_under_pinned_clock() {
        let db = pinned_db();
        let first = db.assign_order_id("delivery", "user_001", &[]).unwrap();
        let second = db.assign_order_id("delivery", "user_001", &[]).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("OT"));
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn order_id_prefix_matches_scenario() {
        let db = pinned_db();
        let hotel = db
            .assign_order_id("hotel", "user_001", &[("hotel_id", "h1"), ("product_id", "r1")])
            .unwrap();
        assert!(hotel.starts_with("OO"));
        let book = db.assign_order_id("instore_book", "user_001", &[]).unwrap();
        assert!(book.starts_with("OI"));
    }

    #[test]
    fn missing_required_param_is_a_programmer_error() {
        let db = pinned_db();
        let err = db.assign_order_id("hotel", "user_001", &[]).unwrap_err();
        assert!(matches!(err, VendError::MissingOrderParam(_)));
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let db = pinned_db();
        assert!(matches!(
            db.assign_order_id("cruise", "user_001", &[]),
            Err(VendError::UnknownScenario(_))
        ));
    }

    #[test]
    fn db_hash_changes_with_content() {
        let db = pinned_db();
        let mut other = db.clone();
        let before = db_hash(&db);
        other.user_id = Some("user_002".into());
        assert_ne!(before, db_hash(&other));
        assert_eq!(before, db_hash(&db.clone()));
    }
}
