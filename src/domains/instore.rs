//! In-store domain: shops with purchasable packages, table bookings and
//! service reservations.

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
use crate::utils::check_time_format;

const SEARCH_TOP_K: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopProduct {
    #[serde(default)]
    pub product_id: String,
    pub name: String,
    pub shop_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl fmt::Display for ShopProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShopProduct(shop_id={}, product_id={}, name={}, price={}, quantity={}, tags={:?})",
            self.shop_id, self.product_id, self.name, self.price, self.quantity, self.tags
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub shop_id: String,
    pub shop_name: String,
    #[serde(default)]
    pub score: f64,
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub enable_book: bool,
    #[serde(default)]
    pub book_price: f64,
    #[serde(default)]
    pub enable_reservation: bool,
    #[serde(default)]
    pub products: Vec<ShopProduct>,
}

impl Shop {
    pub fn summary(&self) -> String {
        format!(
            "Shop(shop_name={}, shop_id={}, score={}, location={}, tags={:?}, enable_book={}, book_price={}, enable_reservation={})",
            self.shop_name,
            self.shop_id,
            self.score,
            self.location,
            self.tags,
            self.enable_book,
            self.book_price,
            self.enable_reservation,
        )
    }

    pub fn detail(&self) -> String {
        let products = self
            .products
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Shop(shop_name={}, shop_id={}, score={}, location={}, tags={:?}, enable_book={}, book_price={}, enable_reservation={}, products={})",
            self.shop_name,
            self.shop_id,
            self.score,
            self.location,
            self.tags,
            self.enable_book,
            self.book_price,
            self.enable_reservation,
            products,
        )
    }
}

/// A table booking. Paid bookings exist only for shops that charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInfo {
    pub book_id: String,
    pub shop_id: String,
    pub book_time: String,
    pub update_time: String,
    pub customer_id: String,
    pub customer_count: i64,
    pub book_price: f64,
    pub status: OrderStatus,
}

impl fmt::Display for BookInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BookInfo(book_id={}, shop_id={}, book_time={}, customer_id={}, customer_count={}, book_price={}, status={})",
            self.book_id,
            self.shop_id,
            self.book_time,
            self.customer_id,
            self.customer_count,
            self.book_price,
            self.status,
        )
    }
}

/// A service appointment with the {unconsumed, consumed, cancelled}
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationInfo {
    pub reservation_id: String,
    pub shop_id: String,
    pub reservation_time: String,
    pub update_time: String,
    pub customer_id: String,
    pub customer_count: i64,
    pub status: OrderStatus,
}

impl fmt::Display for ReservationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReservationInfo(reservation_id={}, shop_id={}, reservation_time={}, customer_id={}, customer_count={}, status={})",
            self.reservation_id,
            self.shop_id,
            self.reservation_time,
            self.customer_id,
            self.customer_count,
            self.status,
        )
    }
}

/// In-store database: the shared core plus shops, bookings and
/// reservations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstoreDb {
    #[serde(flatten)]
    pub core: Db,
    #[serde(default)]
    pub shops: BTreeMap<String, Shop>,
    #[serde(default)]
    pub books: BTreeMap<String, BookInfo>,
    #[serde(default)]
    pub reservations: BTreeMap<String, ReservationInfo>,
}

impl InstoreDb {
    pub fn from_env(environment: &Value) -> Result<Self> {
        if environment.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(environment.clone())?)
    }
}

pub struct InstoreToolkit {
    pub db: InstoreDb,
    language: Language,
}

const INSTORE_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "instore_shop_search_recommend",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required_list("keywords", "string")],
    },
    ToolSpec {
        name: "instore_product_search_recommend",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required_list("keywords", "string")],
    },
    ToolSpec {
        name: "create_instore_product_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("shop_id", "string"),
            ParamSpec::required("product_id", "string"),
            ParamSpec::optional("quantity", "integer"),
        ],
    },
    ToolSpec {
        name: "pay_instore_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "instore_cancel_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "instore_book",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("shop_id", "string"),
            ParamSpec::required("time", "string"),
            ParamSpec::optional("customer_count", "integer"),
        ],
    },
    ToolSpec {
        name: "pay_instore_book",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("book_id", "string")],
    },
    ToolSpec {
        name: "instore_cancel_book",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("book_id", "string")],
    },
    ToolSpec {
        name: "instore_reservation",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("shop_id", "string"),
            ParamSpec::required("time", "string"),
            ParamSpec::optional("customer_count", "integer"),
        ],
    },
    ToolSpec {
        name: "instore_modify_reservation",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("reservation_id", "string"),
            ParamSpec::required("time", "string"),
            ParamSpec::optional("customer_count", "integer"),
        ],
    },
    ToolSpec {
        name: "instore_cancel_reservation",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("reservation_id", "string")],
    },
    ToolSpec {
        name: "get_instore_orders",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("user_id", "string")],
    },
    ToolSpec {
        name: "get_instore_reservations",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("user_id", "string")],
    },
    ToolSpec {
        name: "get_instore_books",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("user_id", "string")],
    },
    ToolSpec {
        name: "search_instore_book",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("book_id", "string"),
        ],
    },
    ToolSpec {
        name: "search_instore_reservation",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("reservation_id", "string"),
        ],
    },
];

impl InstoreToolkit {
    pub fn new(db: InstoreDb, language: Language) -> Self {
        Self { db, language }
    }

    fn check_user(&self, user_id: &str) -> bool {
        self.db.core.user_id.as_deref() == Some(user_id)
    }

    fn shop(&self, shop_id: &str) -> std::result::Result<&Shop, ToolError> {
        self.db
            .shops
            .get(shop_id)
            .ok_or_else(|| ToolError::Failed(format!("Shop {shop_id} not found")))
    }

    fn product(&self, product_id: &str) -> std::result::Result<&ShopProduct, ToolError> {
        self.db
            .shops
            .values()
            .flat_map(|shop| shop.products.iter())
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
        if order.order_type != OrderType::Instore {
            return Err(ToolError::Failed(format!(
                "Order {order_id} is not an instore order"
            )));
        }
        Ok(order)
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

    fn instore_shop_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let query = Self::keywords_query(arguments)?;
        let candidates: Vec<(String, String)> = self
            .db
            .shops
            .values()
            .map(|shop| {
                (
                    shop.shop_id.clone(),
                    format!("{}{}", shop.shop_name, shop.tags.join(",")),
                )
            })
            .collect();
        if candidates.is_empty() {
            return Ok("No shops available".to_string());
        }
        let ranked = rerank(&query, &candidates);
        let selected: Vec<String> = ranked
            .iter()
            .take(SEARCH_TOP_K)
            .filter_map(|doc| self.db.shops.get(&doc.key).map(Shop::summary))
            .collect();
        if selected.is_empty() {
            return Ok("No shops found matching the keywords".to_string());
        }
        Ok(selected.join("\n"))
    }

    fn instore_product_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let query = Self::keywords_query(arguments)?;
        let candidates: Vec<(String, String)> = self
            .db
            .shops
            .values()
            .flat_map(|shop| {
                shop.products.iter().map(move |product| {
                    (
                        product.product_id.clone(),
                        format!("{} {} {:?}", shop.shop_name, product.name, product.tags),
                    )
                })
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

    fn create_instore_product_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let shop_id = args::req_str(arguments, "shop_id")?;
        let product_id = args::req_str(arguments, "product_id")?;
        let quantity = args::opt_i64(arguments, "quantity", 1)?;

        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        require!(!shop_id.is_empty(), "Shop ID cannot be empty");
        require!(!product_id.is_empty(), "Product ID cannot be empty");
        require!(quantity > 0, "Quantity must be greater than 0");

        let shop = match self.shop(&shop_id) {
            Ok(shop) => shop,
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => {
                return Ok(format!("Error: {e}"))
            }
        };
        if !shop.products.iter().any(|p| p.product_id == product_id) {
            return Ok(format!("Product {product_id} does not exist in shop {shop_id}"));
        }
        let product = match self.product(&product_id) {
            Ok(product) => product,
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => {
                return Ok(format!("Error: {e}"))
            }
        };

        let mut line = product.clone();
        line.quantity = quantity;
        let now = self.db.core.now_time();
        let order = Order {
            order_id: self
                .db
                .core
                .assign_order_id("instore", &user_id, &[])
                .map_err(|e| ToolError::Failed(e.to_string()))?,
            order_type: OrderType::Instore,
            user_id,
            store_id: shop_id,
            note: Some(String::new()),
            location: None,
            dispatch_time: None,
            shipping_time: None,
            delivery_time: None,
            total_price: quantity as f64 * line.price,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: vec![serde_json::to_value(line).unwrap_or(Value::Null)],
        };

        if self.db.core.orders.contains_key(&order.order_id) {
            return Ok("Order already exists".to_string());
        }
        let rendered = order.detail();
        self.db.core.orders.insert(order.order_id.clone(), order);
        Ok(rendered)
    }

    fn pay_instore_order(&mut self, arguments: &JsonMap) -> ToolResult {
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

    fn instore_cancel_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.status == OrderStatus::Cancelled => {
                Ok(format!("Order {order_id} is already cancelled."))
            }
            Ok(_) => {
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.status = OrderStatus::Cancelled;
                order.update_time = now;
                Ok(format!("Order {order_id} is cancelled."))
            }
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn instore_book(&mut self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let shop_id = args::req_str(arguments, "shop_id")?;
        let time = args::req_str(arguments, "time")?;
        let customer_count = args::opt_i64(arguments, "customer_count", 1)?;

        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        require!(!shop_id.is_empty(), "Shop ID cannot be empty");
        require!(!time.is_empty(), "Table booking time cannot be empty");
        require!(
            customer_count > 0,
            "Number of customers for table booking must be greater than 0"
        );
        require!(
            check_time_format(&time),
            "Table booking time format is incorrect, correct format is %Y-%m-%d %H:%M:%S"
        );

        let (enable_book, book_price) = match self.shop(&shop_id) {
            Ok(shop) => (shop.enable_book, shop.book_price),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => {
                return Ok(format!("Error: {e}"))
            }
        };
        if !enable_book {
            return Ok(format!("Shop {shop_id} does not support table booking"));
        }

        let status = if book_price > 0.0 {
            OrderStatus::Unpaid
        } else {
            OrderStatus::Paid
        };
        let book_info = BookInfo {
            book_id: self
                .db
                .core
                .assign_order_id("instore_book", &user_id, &[])
                .map_err(|e| ToolError::Failed(e.to_string()))?,
            shop_id,
            book_time: time,
            update_time: self.db.core.now_time(),
            customer_id: user_id,
            customer_count,
            book_price,
            status,
        };

        if self.db.books.contains_key(&book_info.book_id) {
            return Ok(format!("BookInfo {} already exists", book_info.book_id));
        }
        let rendered = book_info.to_string();
        self.db.books.insert(book_info.book_id.clone(), book_info);
        Ok(rendered)
    }

    fn pay_instore_book(&mut self, arguments: &JsonMap) -> ToolResult {
        let book_id = args::req_str(arguments, "book_id")?;
        require!(!book_id.is_empty(), "Booking ID cannot be empty");
        let now = self.db.core.now_time();
        match self.db.books.get_mut(&book_id) {
            Some(book_info) if book_info.status == OrderStatus::Unpaid => {
                book_info.status = OrderStatus::Paid;
                book_info.update_time = now;
                Ok("Payment successful".to_string())
            }
            Some(book_info) => Ok(format!(
                "BookInfo {book_id} is not in `unpaid` status. Current status: {}",
                book_info.status
            )),
            None => Ok(format!("Error: BookInfo {book_id} not found")),
        }
    }

    fn instore_cancel_book(&mut self, arguments: &JsonMap) -> ToolResult {
        let book_id = args::req_str(arguments, "book_id")?;
        require!(!book_id.is_empty(), "Booking ID cannot be empty");
        let now = self.db.core.now_time();
        match self.db.books.get_mut(&book_id) {
            Some(book_info) if book_info.status == OrderStatus::Cancelled => {
                Ok(format!("BookInfo {book_id} is already cancelled."))
            }
            Some(book_info) => {
                book_info.status = OrderStatus::Cancelled;
                book_info.update_time = now;
                Ok(format!("BookInfo {book_id} is cancelled."))
            }
            None => Ok(format!("Error: BookInfo {book_id} not found")),
        }
    }

    fn instore_reservation(&mut self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let shop_id = args::req_str(arguments, "shop_id")?;
        let time = args::req_str(arguments, "time")?;
        let customer_count = args::opt_i64(arguments, "customer_count", 1)?;

        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        require!(!shop_id.is_empty(), "Shop ID cannot be empty");
        require!(!time.is_empty(), "Reservation time cannot be empty");
        require!(
            customer_count > 0,
            "Number of customers for reservation must be greater than 0"
        );
        require!(
            check_time_format(&time),
            "Reservation time format is incorrect, correct format is %Y-%m-%d %H:%M:%S"
        );

        if let Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) = self.shop(&shop_id) {
            return Ok(format!("Error: {e}"));
        }

        let reservation = ReservationInfo {
            reservation_id: self
                .db
                .core
                .assign_order_id("instore_reservation", &user_id, &[])
                .map_err(|e| ToolError::Failed(e.to_string()))?,
            shop_id,
            reservation_time: time,
            update_time: self.db.core.now_time(),
            customer_id: user_id,
            customer_count,
            status: OrderStatus::Unconsumed,
        };

        if self.db.reservations.contains_key(&reservation.reservation_id) {
            return Ok(format!(
                "ReservationInfo {} already exists",
                reservation.reservation_id
            ));
        }
        let rendered = reservation.to_string();
        self.db
            .reservations
            .insert(reservation.reservation_id.clone(), reservation);
        Ok(rendered)
    }

    fn instore_modify_reservation(&mut self, arguments: &JsonMap) -> ToolResult {
        let reservation_id = args::req_str(arguments, "reservation_id")?;
        let time = args::req_str(arguments, "time")?;
        let customer_count = args::opt_i64(arguments, "customer_count", 0)?;

        require!(!reservation_id.is_empty(), "Reservation ID cannot be empty");
        require!(!time.is_empty(), "Reservation time cannot be empty");
        require!(
            customer_count >= 0,
            "Number of customers for reservation must be greater than or equal to 0"
        );
        require!(
            check_time_format(&time),
            "Reservation time format is incorrect, correct format is %Y-%m-%d %H:%M:%S"
        );

        let now = self.db.core.now_time();
        match self.db.reservations.get_mut(&reservation_id) {
            Some(reservation)
                if reservation.status == OrderStatus::Consumed
                    || reservation.status == OrderStatus::Cancelled =>
            {
                Ok(format!(
                    "ReservationInfo {reservation_id} is already {}.",
                    reservation.status
                ))
            }
            Some(reservation) => {
                reservation.reservation_time = time;
                reservation.customer_count = customer_count;
                reservation.update_time = now;
                Ok(reservation.to_string())
            }
            None => Ok(format!("Error: ReservationInfo {reservation_id} not found")),
        }
    }

    fn instore_cancel_reservation(&mut self, arguments: &JsonMap) -> ToolResult {
        let reservation_id = args::req_str(arguments, "reservation_id")?;
        require!(!reservation_id.is_empty(), "Reservation ID cannot be empty");
        let now = self.db.core.now_time();
        match self.db.reservations.get_mut(&reservation_id) {
            Some(reservation) if reservation.status == OrderStatus::Cancelled => {
                Ok(format!("ReservationInfo {reservation_id} is already cancelled."))
            }
            Some(reservation) => {
                reservation.status = OrderStatus::Cancelled;
                reservation.update_time = now;
                Ok(format!("ReservationInfo {reservation_id} is cancelled."))
            }
            None => Ok(format!("Error: ReservationInfo {reservation_id} not found")),
        }
    }

    fn get_instore_orders(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        let matching: Vec<String> = self
            .db
            .core
            .orders
            .values()
            .filter(|order| order.order_type == OrderType::Instore && order.user_id == user_id)
            .map(Order::detail)
            .collect();
        if matching.is_empty() {
            return Ok(format!("User {user_id} has no order information."));
        }
        Ok(matching.join("\n"))
    }

    fn get_instore_reservations(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        let matching: Vec<String> = self
            .db
            .reservations
            .values()
            .filter(|reservation| reservation.customer_id == user_id)
            .map(ToString::to_string)
            .collect();
        if matching.is_empty() {
            return Ok(format!("User {user_id} has no reservation information."));
        }
        Ok(matching.join("\n"))
    }

    fn get_instore_books(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        let matching: Vec<String> = self
            .db
            .books
            .values()
            .filter(|book| book.customer_id == user_id)
            .map(ToString::to_string)
            .collect();
        if matching.is_empty() {
            return Ok(format!("User {user_id} has no book information."));
        }
        Ok(matching.join("\n"))
    }

    fn search_instore_book(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let book_id = args::opt_str(arguments, "book_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");

        match book_id {
            None => self.get_instore_books(arguments),
            Some(book_id) => match self.db.books.get(&book_id) {
                Some(book) if book.customer_id != user_id => {
                    Ok(format!("BookInfo {book_id} is not belong to user {user_id}."))
                }
                Some(book) => Ok(book.to_string()),
                None => Err(ToolError::Failed(format!("BookInfo {book_id} not found"))),
            },
        }
    }

    fn search_instore_reservation(&self, arguments: &JsonMap) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        let reservation_id = args::opt_str(arguments, "reservation_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");

        match reservation_id {
            None => self.get_instore_reservations(arguments),
            Some(reservation_id) => match self.db.reservations.get(&reservation_id) {
                Some(reservation) if reservation.customer_id != user_id => Ok(format!(
                    "ReservationInfo {reservation_id} is not belong to user {user_id}."
                )),
                Some(reservation) => Ok(reservation.to_string()),
                None => Err(ToolError::Failed(format!(
                    "ReservationInfo {reservation_id} not found"
                ))),
            },
        }
    }

    fn get_nearby(&self, arguments: &JsonMap) -> ToolResult {
        let longitude = args::req_f64(arguments, "longitude")?;
        let latitude = args::req_f64(arguments, "latitude")?;
        let range = args::req_f64(arguments, "range")?;
        let matching: Vec<String> = self
            .db
            .shops
            .values()
            .filter(|shop| generic::within_range(longitude, latitude, &shop.location, range))
            .map(Shop::summary)
            .collect();
        if matching.is_empty() {
            return Ok("No search results found".to_string());
        }
        Ok(matching.join("\n"))
    }
}

impl Toolkit for InstoreToolkit {
    fn domain(&self) -> &str {
        "instore"
    }

    fn specs(&self) -> Vec<&'static ToolSpec> {
        GENERIC_SPECS.iter().chain(INSTORE_SPECS.iter()).collect()
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
            "instore_shop_search_recommend" => self.instore_shop_search_recommend(arguments),
            "instore_product_search_recommend" => self.instore_product_search_recommend(arguments),
            "create_instore_product_order" => self.create_instore_product_order(arguments),
            "pay_instore_order" => self.pay_instore_order(arguments),
            "instore_cancel_order" => self.instore_cancel_order(arguments),
            "instore_book" => self.instore_book(arguments),
            "pay_instore_book" => self.pay_instore_book(arguments),
            "instore_cancel_book" => self.instore_cancel_book(arguments),
            "instore_reservation" => self.instore_reservation(arguments),
            "instore_modify_reservation" => self.instore_modify_reservation(arguments),
            "instore_cancel_reservation" => self.instore_cancel_reservation(arguments),
            "get_instore_orders" => self.get_instore_orders(arguments),
            "get_instore_reservations" => self.get_instore_reservations(arguments),
            "get_instore_books" => self.get_instore_books(arguments),
            "search_instore_book" => self.search_instore_book(arguments),
            "search_instore_reservation" => self.search_instore_reservation(arguments),
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
        stats.insert("num_stores".into(), self.db.shops.len().into());
        stats
    }
}
