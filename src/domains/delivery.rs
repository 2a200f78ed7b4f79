//! Food-delivery domain: stores, their products, and the delivery order
//! lifecycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Language;
use crate::db::{db_hash, Db, Location, Order, OrderStatus, OrderType};
use crate::error::Result;
use crate::fuzzy::rerank;
use crate::message::JsonMap;
use crate::require;
use crate::toolkit::generic::{self, GENERIC_SPECS};
use crate::toolkit::{args, ParamSpec, ToolError, ToolResult, ToolSpec, ToolType, Toolkit};
use crate::utils::{check_time_format, format_time, str_to_datetime};

const SEARCH_TOP_K: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    #[serde(default)]
    pub product_id: String,
    pub name: String,
    pub store_id: String,
    pub store_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, deserialize_with = "crate::domains::string_or_list")]
    pub attributes: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl fmt::Display for StoreProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreProduct(store_name={}, store_id={}, product_name={}, product_id={}, attributes={}, quantity={}, price={}, tags={:?})",
            self.store_name,
            self.store_id,
            self.name,
            self.product_id,
            self.attributes,
            self.quantity,
            self.price,
            self.tags,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub store_id: String,
    pub name: String,
    #[serde(default)]
    pub score: f64,
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<StoreProduct>,
}

impl Store {
    /// Header-only form used in search listings.
    pub fn summary(&self) -> String {
        format!(
            "Store(name={}, store_id={}, score={}, location={}, tags={:?})",
            self.name, self.store_id, self.score, self.location, self.tags
        )
    }

    /// Full form including the product list.
    pub fn detail(&self) -> String {
        let products = self
            .products
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Store(name={}, store_id={}, score={}, location={}, tags={:?}), products={}",
            self.name, self.store_id, self.score, self.location, self.tags, products
        )
    }
}

/// Delivery-domain database: the shared core plus the store catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDb {
    #[serde(flatten)]
    pub core: Db,
    #[serde(default)]
    pub stores: BTreeMap<String, Store>,
}

impl DeliveryDb {
    /// Build from a task's environment blob; unknown keys are ignored and
    /// missing catalogs default empty.
    pub fn from_env(environment: &Value) -> Result<Self> {
        if environment.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(environment.clone())?)
    }
}

pub struct DeliveryToolkit {
    pub db: DeliveryDb,
    language: Language,
}

const DELIVERY_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "delivery_distance_to_time",
        tool_type: ToolType::Generic,
        params: &[ParamSpec::required("distance", "number")],
    },
    ToolSpec {
        name: "get_delivery_store_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("store_id", "string")],
    },
    ToolSpec {
        name: "get_delivery_product_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("product_id", "string")],
    },
    ToolSpec {
        name: "delivery_store_search_recommend",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required_list("keywords", "string")],
    },
    ToolSpec {
        name: "delivery_product_search_recommend",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required_list("keywords", "string")],
    },
    ToolSpec {
        name: "create_delivery_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("store_id", "string"),
            ParamSpec::required_list("product_ids", "string"),
            ParamSpec::required_list("product_cnts", "integer"),
            ParamSpec::required("address", "string"),
            ParamSpec::required("dispatch_time", "string"),
            ParamSpec::optional_list("attributes", "string"),
            ParamSpec::optional("note", "string"),
        ],
    },
    ToolSpec {
        name: "pay_delivery_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "get_delivery_order_status",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "cancel_delivery_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "modify_delivery_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("note", "string"),
        ],
    },
    ToolSpec {
        name: "search_delivery_orders",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("status", "string"),
        ],
    },
    ToolSpec {
        name: "get_delivery_order_detail",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
];

impl DeliveryToolkit {
    pub fn new(db: DeliveryDb, language: Language) -> Self {
        Self { db, language }
    }

    fn check_user(&self, user_id: &str) -> bool {
        self.db.core.user_id.as_deref() == Some(user_id)
    }

    fn store(&self, store_id: &str) -> std::result::Result<&Store, ToolError> {
        self.db
            .stores
            .get(store_id)
            .ok_or_else(|| ToolError::Failed(format!("Store {store_id} not found")))
    }

    /// "All products" means every product list of every store in this DB.
    fn product(&self, product_id: &str) -> std::result::Result<&StoreProduct, ToolError> {
        self.db
            .stores
            .values()
            .flat_map(|store| store.products.iter())
            .find(|product| product.product_id == product_id)
            .ok_or_else(|| ToolError::Failed(format!("{product_id} not found")))
    }

    fn order(&self, order_id: &str) -> std::result::Result<&Order, ToolError> {
        let order = self
            .db
            .core
            .orders
            .get(order_id)
            .ok_or_else(|| ToolError::Failed(format!("Order {order_id} not found")))?;
        if order.order_type != OrderType::Delivery {
            return Err(ToolError::Failed(format!(
                "Order {order_id} is not a delivery order"
            )));
        }
        Ok(order)
    }

    fn delivery_distance_to_time(&self, arguments: &JsonMap) -> ToolResult {
        let distance = args::req_f64(arguments, "distance")?;
        Ok(shipping_minutes(distance).to_string())
    }

    fn get_delivery_store_info(&self, arguments: &JsonMap) -> ToolResult {
        let store_id = args::req_str(arguments, "store_id")?;
        require!(!store_id.is_empty(), "Store ID cannot be empty");
        match self.store(&store_id) {
            Ok(store) => Ok(store.detail()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn get_delivery_product_info(&self, arguments: &JsonMap) -> ToolResult {
        let product_id = args::req_str(arguments, "product_id")?;
        require!(!product_id.is_empty(), "Product ID cannot be empty");
        match self.product(&product_id) {
            Ok(product) => Ok(product.to_string()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn keywords_query(arguments: &JsonMap) -> std::result::Result<String, ToolError> {
        let keywords = args::req_str_list(arguments, "keywords")?;
        require!(!keywords.is_empty(), "Keywords cannot be empty");
        require!(
            keywords.iter().all(|kw| !kw.trim().is_empty()),
            "All keywords must be non-empty strings"
        );
        Ok(keywords.concat())
    }

    fn delivery_store_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let query = Self::keywords_query(arguments)?;
        let candidates: Vec<(String, String)> = self
            .db
            .stores
            .values()
            .map(|store| {
                (
                    store.store_id.clone(),
                    format!("{}{}", store.name, store.tags.join(",")),
                )
            })
            .collect();
        if candidates.is_empty() {
            return Ok("No stores available".to_string());
        }
        let ranked = rerank(&query, &candidates);
        let selected: Vec<String> = ranked
            .iter()
            .take(SEARCH_TOP_K)
            .filter_map(|doc| self.db.stores.get(&doc.key).map(Store::summary))
            .collect();
        if selected.is_empty() {
            return Ok("No stores found matching the keywords".to_string());
        }
        Ok(selected.join("\n"))
    }

    fn delivery_product_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let query = Self::keywords_query(arguments)?;
        let candidates: Vec<(String, String)> = self
            .db
            .stores
            .values()
            .flat_map(|store| store.products.iter())
            .map(|product| {
                (
                    product.product_id.clone(),
                    format!("{} {} {:?}", product.store_name, product.name, product.tags),
                )
            })
            .collect();
        if candidates.is_empty() {
            return Ok("No products available".to_string());
        }
        let ranked = rerank(&query, &candidates);
        let selected: Vec<String> = ranked
            .iter()
            .take(SEARCH_TOP_K)
            .filter_map(|doc| self.product(&doc.key).ok().map(ToString::to_string))
            .collect();
        if selected.is_empty() {
            return Ok("No products found matching the keywords".to_string());
        }
        Ok(selected.join("\n"))
    }

    fn create_delivery_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let store_id = args::req_str(arguments, "store_id")?;
        let product_ids = args::req_str_list(arguments, "product_ids")?;
        let product_cnts = args::req_i64_list(arguments, "product_cnts")?;
        let address = args::req_str(arguments, "address")?;
        let dispatch_time = args::req_str(arguments, "dispatch_time")?;
        let attributes = args::opt_str_list(arguments, "attributes")?.unwrap_or_default();
        let note = args::opt_str(arguments, "note")?.unwrap_or_default();

        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        require!(
            self.db.stores.contains_key(&store_id),
            "Store {store_id} not found"
        );
        for product_id in &product_ids {
            require!(
                self.product(product_id).is_ok(),
                "products {product_ids:?} not found"
            );
        }
        require!(!address.is_empty(), "Location {address} is empty");
        require!(
            product_ids.len() == product_cnts.len() && product_cnts.iter().all(|cnt| *cnt > 0),
            "product_cnts {product_cnts:?} list is invalid"
        );
        require!(
            !dispatch_time.is_empty() && check_time_format(&dispatch_time),
            "dispatch_time {dispatch_time} time format is invalid, yyyy-mm-dd HH:MM:SS required"
        );
        let now = self.db.core.now_time();
        require!(
            str_to_datetime(&dispatch_time) >= str_to_datetime(&now),
            "dispatch_time {dispatch_time} must be in the future"
        );

        let (longitude, latitude) = generic::address_to_longitude_latitude(&self.db.core, &address)?;
        let store = self.store(&store_id)?;
        let distance = generic::longitude_latitude_to_distance(
            longitude,
            latitude,
            store.location.longitude,
            store.location.latitude,
        );
        let shipping_time = shipping_minutes(distance);
        let dispatch = str_to_datetime(&dispatch_time)
            .ok_or_else(|| ToolError::Failed(format!("dispatch_time {dispatch_time} unparsable")))?;
        let delivery_time = format_time(
            dispatch + chrono::Duration::minutes(shipping_time as i64),
            crate::utils::TIME_FORMAT,
        );

        let mut ordered_products = Vec::new();
        let mut total_amount = 0.0;
        for (index, (product_id, cnt)) in product_ids.iter().zip(&product_cnts).enumerate() {
            let product = self.product(product_id)?;
            total_amount += product.price * *cnt as f64;
            let attribute = attributes.get(index).cloned().unwrap_or_default();
            let line = StoreProduct {
                quantity: *cnt,
                attributes: attribute,
                ..product.clone()
            };
            ordered_products.push(serde_json::to_value(line).unwrap_or(Value::Null));
        }

        let order = Order {
            order_id: self
                .db
                .core
                .assign_order_id("delivery", &user_id, &[])
                .map_err(|e| ToolError::Failed(e.to_string()))?,
            order_type: OrderType::Delivery,
            user_id,
            store_id,
            note: Some(note),
            location: Some(Location {
                address,
                longitude,
                latitude,
            }),
            dispatch_time: Some(dispatch_time),
            shipping_time: Some(shipping_time),
            delivery_time: Some(delivery_time),
            total_price: total_amount,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: ordered_products,
        };

        if self.db.core.orders.contains_key(&order.order_id) {
            return Ok("Order already exists".to_string());
        }
        let rendered = order.detail();
        self.db.core.orders.insert(order.order_id.clone(), order);
        Ok(rendered)
    }

    fn pay_delivery_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.status == OrderStatus::Unpaid => {
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.status = OrderStatus::Paid;
                order.update_time = now;
                Ok("Payment successful".to_string())
            }
            Ok(order) => Ok(format!(
                "Order {order_id} is not in `unpaid` status. Current status: {}",
                order.status
            )),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn get_delivery_order_status(&self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        match self.order(&order_id) {
            Ok(order) => Ok(format!("Order {order_id} status: {}", order.status)),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn cancel_delivery_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.status == OrderStatus::Cancelled => {
                Ok(format!("Order {order_id} is already cancelled"))
            }
            Ok(_) => {
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.status = OrderStatus::Cancelled;
                order.update_time = now;
                Ok(format!("Order {order_id} has been cancelled."))
            }
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn modify_delivery_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        let note = args::req_str(arguments, "note")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.status == OrderStatus::Cancelled => Ok(format!(
                "Cannot modify order {order_id} as it is already cancelled"
            )),
            Ok(_) => {
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.note = Some(note);
                order.update_time = now;
                Ok(format!("Order {order_id} has been modified."))
            }
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn search_delivery_orders(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let status = args::opt_str(arguments, "status")?.unwrap_or_else(|| "unpaid".to_string());
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");

        let matching: Vec<String> = self
            .db
            .core
            .orders
            .values()
            .filter(|order| {
                order.order_type == OrderType::Delivery
                    && order.status.to_string() == status
                    && order.user_id == user_id
            })
            .map(Order::summary)
            .collect();
        if matching.is_empty() {
            return Ok("No delivery orders available".to_string());
        }
        Ok(matching.join("\n"))
    }

    fn get_delivery_order_detail(&self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        match self.order(&order_id) {
            Ok(order) => Ok(order.detail()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn get_nearby(&self, arguments: &JsonMap) -> ToolResult {
        let longitude = args::req_f64(arguments, "longitude")?;
        let latitude = args::req_f64(arguments, "latitude")?;
        let range = args::req_f64(arguments, "range")?;
        let matching: Vec<String> = self
            .db
            .stores
            .values()
            .filter(|store| generic::within_range(longitude, latitude, &store.location, range))
            .map(Store::summary)
            .collect();
        if matching.is_empty() {
            return Ok("No search results found".to_string());
        }
        Ok(matching.join("\n"))
    }
}

/// Courier travel time in minutes for a distance in metres. The linear
/// constants are part of the benchmark's observable behavior.
fn shipping_minutes(distance: f64) -> f64 {
    (25.00 + distance.trunc() * 0.006510).round()
}

impl Toolkit for DeliveryToolkit {
    fn domain(&self) -> &str {
        "delivery"
    }

    fn specs(&self) -> Vec<&'static ToolSpec> {
        GENERIC_SPECS.iter().chain(DELIVERY_SPECS.iter()).collect()
    }

    fn dispatch(&mut self, name: &str, arguments: &JsonMap) -> Option<ToolResult> {
        if name == "get_nearby" {
            return Some(self.get_nearby(arguments));
        }
        if let Some(result) = generic::dispatch_generic(&self.db.core, self.language, name, arguments)
        {
            return Some(result);
        }
        Some(match name {
            "delivery_distance_to_time" => self.delivery_distance_to_time(arguments),
            "get_delivery_store_info" => self.get_delivery_store_info(arguments),
            "get_delivery_product_info" => self.get_delivery_product_info(arguments),
            "delivery_store_search_recommend" => self.delivery_store_search_recommend(arguments),
            "delivery_product_search_recommend" => self.delivery_product_search_recommend(arguments),
            "create_delivery_order" => self.create_delivery_order(arguments),
            "pay_delivery_order" => self.pay_delivery_order(arguments),
            "get_delivery_order_status" => self.get_delivery_order_status(arguments),
            "cancel_delivery_order" => self.cancel_delivery_order(arguments),
            "modify_delivery_order" => self.modify_delivery_order(arguments),
            "search_delivery_orders" => self.search_delivery_orders(arguments),
            "get_delivery_order_detail" => self.get_delivery_order_detail(arguments),
            _ => return None,
        })
    }

    fn db_value(&self) -> Value {
        serde_json::to_value(&self.db).unwrap_or(Value::Null)
    }

    fn db_hash(&self) -> String {
        db_hash(&self.db)
    }

    fn db_statistics(&self) -> JsonMap {
        let mut stats = JsonMap::new();
        stats.insert("num_stores".into(), self.db.stores.len().into());
        stats
    }
}
