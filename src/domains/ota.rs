//! Online-travel domain: hotels, attractions, flights and trains, each
//! selling dated products with finite inventory.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Language;
use crate::db::{db_hash, Db, Location, Order, OrderStatus, OrderType};
use crate::error::Result;
use crate::fuzzy::{fuzzy_match, rerank};
use crate::message::JsonMap;
use crate::require;
use crate::toolkit::generic::{self, GENERIC_SPECS};
use crate::toolkit::{args, ParamSpec, ToolError, ToolResult, ToolSpec, ToolType, Toolkit};
use crate::utils::check_date_format;

const SEARCH_TOP_K: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelProduct {
    pub product_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    pub date: String,
    pub room_type: String,
}

impl fmt::Display for HotelProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HotelProduct(room_type={}, date={}, price={}, quantity={}, product_id={})",
            self.room_type, self.date, self.price, self.quantity, self.product_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionProduct {
    pub product_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    pub date: String,
    pub ticket_type: String,
}

impl fmt::Display for AttractionProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AttractionProduct(ticket_type={}, date={}, price={}, quantity={}, product_id={})",
            self.ticket_type, self.date, self.price, self.quantity, self.product_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightProduct {
    pub product_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    pub date: String,
    pub seat_type: String,
}

impl fmt::Display for FlightProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FlightProduct(seat_type={}, date={}, price={}, quantity={}, product_id={})",
            self.seat_type, self.date, self.price, self.quantity, self.product_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainProduct {
    pub product_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    pub date: String,
    pub seat_type: String,
}

impl fmt::Display for TrainProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrainProduct(seat_type={}, date={}, price={}, quantity={}, product_id={})",
            self.seat_type, self.date, self.price, self.quantity, self.product_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub hotel_id: String,
    pub hotel_name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub star_rating: i64,
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<HotelProduct>,
}

impl Hotel {
    pub fn summary(&self) -> String {
        format!(
            "Hotel(hotel_id={}, hotel_name={}, score={}, star_rating={}, location={}, tags={:?})",
            self.hotel_id, self.hotel_name, self.score, self.star_rating, self.location, self.tags
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
            "Hotel(hotel_id={}, hotel_name={}, score={}, star_rating={}, location={}, tags={:?}, products={})",
            self.hotel_id,
            self.hotel_name,
            self.score,
            self.star_rating,
            self.location,
            self.tags,
            products,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub attraction_id: String,
    pub attraction_name: String,
    pub location: Location,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub opening_hours: String,
    #[serde(default)]
    pub ticket_price: f64,
    #[serde(default)]
    pub products: Vec<AttractionProduct>,
}

impl Attraction {
    pub fn summary(&self) -> String {
        format!(
            "Attraction(attraction_id={}, attraction_name={}, location={}, description={}, score={}, opening_hours={})",
            self.attraction_id,
            self.attraction_name,
            self.location,
            self.description,
            self.score,
            self.opening_hours,
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
            "Attraction(attraction_id={}, attraction_name={}, location={}, description={}, score={}, opening_hours={}, ticket_price={}, products={})",
            self.attraction_id,
            self.attraction_name,
            self.location,
            self.description,
            self.score,
            self.opening_hours,
            self.ticket_price,
            products,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub flight_id: String,
    pub flight_number: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_airport_location: Location,
    pub arrival_airport_location: Location,
    pub departure_time: String,
    pub arrival_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<FlightProduct>,
}

impl Flight {
    pub fn summary(&self) -> String {
        format!(
            "Flight(flight_id={}, flight_number={}, departure_city={}, arrival_city={}, departure_airport_location={}, arrival_airport_location={}, departure_time={}, arrival_time={}, tags={:?})",
            self.flight_id,
            self.flight_number,
            self.departure_city,
            self.arrival_city,
            self.departure_airport_location,
            self.arrival_airport_location,
            self.departure_time,
            self.arrival_time,
            self.tags,
        )
    }

    pub fn detail(&self) -> String {
        let products = self
            .products
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}, products={}", self.summary().trim_end_matches(')'), products)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub train_id: String,
    pub train_number: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_station_location: Location,
    pub arrival_station_location: Location,
    pub departure_time: String,
    pub arrival_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<TrainProduct>,
}

impl Train {
    pub fn summary(&self) -> String {
        format!(
            "Train(train_id={}, train_number={}, departure_city={}, arrival_city={}, departure_station_location={}, arrival_station_location={}, departure_time={}, arrival_time={}, tags={:?})",
            self.train_id,
            self.train_number,
            self.departure_city,
            self.arrival_city,
            self.departure_station_location,
            self.arrival_station_location,
            self.departure_time,
            self.arrival_time,
            self.tags,
        )
    }

    pub fn detail(&self) -> String {
        let products = self
            .products
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}, products={}", self.summary().trim_end_matches(')'), products)
    }
}

/// OTA database: the shared core plus all four travel catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtaDb {
    #[serde(flatten)]
    pub core: Db,
    #[serde(default)]
    pub hotels: BTreeMap<String, Hotel>,
    #[serde(default)]
    pub attractions: BTreeMap<String, Attraction>,
    #[serde(default)]
    pub flights: BTreeMap<String, Flight>,
    #[serde(default)]
    pub trains: BTreeMap<String, Train>,
}

impl OtaDb {
    pub fn from_env(environment: &Value) -> Result<Self> {
        if environment.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(environment.clone())?)
    }
}

pub struct OtaToolkit {
    pub db: OtaDb,
    language: Language,
}

const OTA_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_ota_hotel_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("hotel_id", "string")],
    },
    ToolSpec {
        name: "get_ota_attraction_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("attraction_id", "string")],
    },
    ToolSpec {
        name: "get_ota_flight_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("flight_id", "string")],
    },
    ToolSpec {
        name: "get_ota_train_info",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("train_id", "string")],
    },
    ToolSpec {
        name: "hotel_search_recommend",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("city_name", "string"),
            ParamSpec::optional_list("key_words", "string"),
        ],
    },
    ToolSpec {
        name: "attractions_search_recommend",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("city_name", "string"),
            ParamSpec::required_list("key_words", "string"),
        ],
    },
    ToolSpec {
        name: "flight_search_recommend",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("departure", "string"),
            ParamSpec::required("destination", "string"),
        ],
    },
    ToolSpec {
        name: "train_ticket_search",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("departure", "string"),
            ParamSpec::required("destination", "string"),
            ParamSpec::required("date", "string"),
        ],
    },
    ToolSpec {
        name: "create_hotel_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("hotel_id", "string"),
            ParamSpec::required("room_id", "string"),
            ParamSpec::required("user_id", "string"),
        ],
    },
    ToolSpec {
        name: "create_attraction_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("attraction_id", "string"),
            ParamSpec::required("ticket_id", "string"),
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("date", "string"),
            ParamSpec::required("quantity", "integer"),
        ],
    },
    ToolSpec {
        name: "create_flight_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("flight_id", "string"),
            ParamSpec::required("seat_id", "string"),
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("date", "string"),
            ParamSpec::required("quantity", "integer"),
        ],
    },
    ToolSpec {
        name: "create_train_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("train_id", "string"),
            ParamSpec::required("seat_id", "string"),
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("date", "string"),
            ParamSpec::required("quantity", "integer"),
        ],
    },
    ToolSpec {
        name: "pay_hotel_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "pay_attraction_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "pay_flight_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "pay_train_order",
        tool_type: ToolType::Write,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "search_hotel_order",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("date", "string"),
            ParamSpec::optional("status", "string"),
        ],
    },
    ToolSpec {
        name: "search_attraction_order",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("date", "string"),
            ParamSpec::optional("status", "string"),
        ],
    },
    ToolSpec {
        name: "search_flight_order",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("date", "string"),
            ParamSpec::optional("status", "string"),
        ],
    },
    ToolSpec {
        name: "search_train_order",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("user_id", "string"),
            ParamSpec::optional("date", "string"),
            ParamSpec::optional("status", "string"),
        ],
    },
    ToolSpec {
        name: "get_hotel_order_detail",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "get_attraction_order_detail",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "get_flight_order_detail",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "get_train_order_detail",
        tool_type: ToolType::Read,
        params: &[ParamSpec::required("order_id", "string")],
    },
    ToolSpec {
        name: "modify_train_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("new_date", "string"),
        ],
    },
    ToolSpec {
        name: "modify_flight_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
            ParamSpec::required("new_date", "string"),
        ],
    },
    ToolSpec {
        name: "cancel_hotel_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
        ],
    },
    ToolSpec {
        name: "cancel_attraction_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
        ],
    },
    ToolSpec {
        name: "cancel_flight_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
        ],
    },
    ToolSpec {
        name: "cancel_train_order",
        tool_type: ToolType::Write,
        params: &[
            ParamSpec::required("order_id", "string"),
            ParamSpec::required("user_id", "string"),
        ],
    },
];

/// Labels for the shared order helpers, keyed by order type.
fn type_label(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Hotel => "a hotel order",
        OrderType::Attraction => "an attraction order",
        OrderType::Flight => "a flight order",
        OrderType::Train => "a train order",
        OrderType::Delivery => "a delivery order",
        OrderType::Instore => "an instore order",
    }
}

fn scene_name(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Hotel => "hotel",
        OrderType::Attraction => "attraction",
        OrderType::Flight => "flight",
        OrderType::Train => "train",
        OrderType::Delivery => "delivery",
        OrderType::Instore => "instore",
    }
}

impl OtaToolkit {
    pub fn new(db: OtaDb, language: Language) -> Self {
        Self { db, language }
    }

    fn check_user(&self, user_id: &str) -> bool {
        self.db.core.user_id.as_deref() == Some(user_id)
    }

    fn order(&self, order_id: &str) -> std::result::Result<&Order, ToolError> {
        self.db
            .core
            .orders
            .get(order_id)
            .ok_or_else(|| ToolError::Failed(format!("Order {order_id} not found")))
    }

    // ── Info ────────────────────────────────────────────────────────

    fn get_ota_hotel_info(&self, arguments: &JsonMap) -> ToolResult {
        let hotel_id = args::req_str(arguments, "hotel_id")?;
        require!(!hotel_id.is_empty(), "Hotel ID cannot be empty");
        match self.db.hotels.get(&hotel_id) {
            Some(hotel) => Ok(format!("Hotel Info:\n{}", hotel.detail())),
            None => Ok(format!("Error: hotel {hotel_id} not found")),
        }
    }

    fn get_ota_attraction_info(&self, arguments: &JsonMap) -> ToolResult {
        let attraction_id = args::req_str(arguments, "attraction_id")?;
        require!(!attraction_id.is_empty(), "Attraction ID cannot be empty");
        match self.db.attractions.get(&attraction_id) {
            Some(attraction) => Ok(format!("Attraction Info:\n{}", attraction.detail())),
            None => Ok(format!("Error: attraction {attraction_id} not found")),
        }
    }

    fn get_ota_flight_info(&self, arguments: &JsonMap) -> ToolResult {
        let flight_id = args::req_str(arguments, "flight_id")?;
        require!(!flight_id.is_empty(), "Flight ID cannot be empty");
        match self.db.flights.get(&flight_id) {
            Some(flight) => Ok(format!("Flight Info:\n{}", flight.detail())),
            None => Ok(format!("Error: flight {flight_id} not found")),
        }
    }

    fn get_ota_train_info(&self, arguments: &JsonMap) -> ToolResult {
        let train_id = args::req_str(arguments, "train_id")?;
        require!(!train_id.is_empty(), "Train ID cannot be empty");
        match self.db.trains.get(&train_id) {
            Some(train) => Ok(format!("Train Info:\n{}", train.detail())),
            None => Ok(format!("Error: train {train_id} not found")),
        }
    }

    // ── Search ──────────────────────────────────────────────────────

    fn hotel_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let city_name = args::req_str(arguments, "city_name")?;
        let key_words = args::opt_str_list(arguments, "key_words")?;
        require!(!city_name.is_empty(), "City name cannot be empty");
        if let Some(words) = &key_words {
            require!(
                words.iter().all(|kw| !kw.trim().is_empty()),
                "All key words must be non-empty strings"
            );
        }

        let in_city: Vec<&Hotel> = self
            .db
            .hotels
            .values()
            .filter(|hotel| fuzzy_match(&city_name, &hotel.location.address))
            .collect();
        if in_city.is_empty() {
            return Ok("No hotels found matching the criteria.".to_string());
        }

        let query = key_words.unwrap_or_default().concat();
        require!(!query.trim().is_empty(), "Keywords cannot be empty");

        let candidates: Vec<(String, String)> = in_city
            .iter()
            .map(|hotel| {
                (
                    hotel.hotel_id.clone(),
                    format!("{}{}", hotel.hotel_name, hotel.tags.join(",")),
                )
            })
            .collect();
        let ranked = rerank(&query, &candidates);
        let selected: Vec<String> = ranked
            .iter()
            .take(SEARCH_TOP_K)
            .filter_map(|doc| self.db.hotels.get(&doc.key).map(Hotel::summary))
            .collect();
        if selected.is_empty() {
            return Ok("No hotels found matching the keywords".to_string());
        }
        Ok(selected.join("\n"))
    }

    fn attractions_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let city_name = args::req_str(arguments, "city_name")?;
        let key_words = args::req_str_list(arguments, "key_words")?;
        require!(!city_name.is_empty(), "City name cannot be empty");
        require!(!key_words.is_empty(), "Key words cannot be empty");
        require!(
            key_words.iter().all(|kw| !kw.trim().is_empty()),
            "All key words must be non-empty strings"
        );

        let in_city: Vec<&Attraction> = self
            .db
            .attractions
            .values()
            .filter(|attraction| fuzzy_match(&city_name, &attraction.location.address))
            .collect();
        if in_city.is_empty() {
            return Ok("No attractions found matching the criteria.".to_string());
        }

        let query = key_words.concat();
        require!(!query.trim().is_empty(), "Keywords cannot be empty");

        let candidates: Vec<(String, String)> = in_city
            .iter()
            .map(|attraction| {
                (
                    attraction.attraction_id.clone(),
                    format!(
                        "{},{},{}",
                        attraction.attraction_name,
                        attraction.description,
                        attraction.location.address
                    ),
                )
            })
            .collect();
        let ranked = rerank(&query, &candidates);
        let selected: Vec<String> = ranked
            .iter()
            .take(SEARCH_TOP_K)
            .filter_map(|doc| self.db.attractions.get(&doc.key).map(Attraction::summary))
            .collect();
        if selected.is_empty() {
            return Ok("No attractions found matching the keywords".to_string());
        }
        Ok(selected.join("\n"))
    }

    fn flight_search_recommend(&self, arguments: &JsonMap) -> ToolResult {
        let departure = args::req_str(arguments, "departure")?;
        let destination = args::req_str(arguments, "destination")?;
        require!(!departure.is_empty(), "Departure city cannot be empty");
        require!(!destination.is_empty(), "Destination city cannot be empty");

        let matching: Vec<String> = self
            .db
            .flights
            .values()
            .filter(|flight| {
                fuzzy_match(&departure, &flight.departure_city)
                    && fuzzy_match(&destination, &flight.arrival_city)
            })
            .map(Flight::summary)
            .collect();
        if matching.is_empty() {
            return Ok(
                "No flights found matching the criteria. Please check if the departure and destination cities are correct."
                    .to_string(),
            );
        }
        Ok(matching.join("\n"))
    }

    fn train_ticket_search(&self, arguments: &JsonMap) -> ToolResult {
        let departure = args::req_str(arguments, "departure")?;
        let destination = args::req_str(arguments, "destination")?;
        let date = args::req_str(arguments, "date")?;
        require!(!departure.is_empty(), "Departure city cannot be empty");
        require!(!destination.is_empty(), "Destination city cannot be empty");
        require!(!date.is_empty(), "Departure date cannot be empty");
        require!(
            check_date_format(&date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );

        let matching: Vec<String> = self
            .db
            .trains
            .values()
            .filter(|train| {
                train.products.iter().any(|product| product.date == date)
                    && fuzzy_match(&departure, &train.departure_city)
                    && fuzzy_match(&destination, &train.arrival_city)
            })
            .map(Train::summary)
            .collect();
        if matching.is_empty() {
            return Ok("No trains found matching the criteria".to_string());
        }
        Ok(matching.join("\n"))
    }

    // ── Create ──────────────────────────────────────────────────────

    fn finish_create(&mut self, order: Order) -> ToolResult {
        if self.db.core.orders.contains_key(&order.order_id) {
            return Ok("Order already exists".to_string());
        }
        let rendered = order.detail();
        self.db.core.orders.insert(order.order_id.clone(), order);
        Ok(rendered)
    }

    fn create_hotel_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let hotel_id = args::req_str(arguments, "hotel_id")?;
        let room_id = args::req_str(arguments, "room_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!hotel_id.is_empty(), "Hotel ID cannot be empty");
        require!(!room_id.is_empty(), "Room ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");

        let order_id = self
            .db
            .core
            .assign_order_id("hotel", &user_id, &[("hotel_id", &hotel_id), ("product_id", &room_id)])
            .map_err(|e| ToolError::Failed(e.to_string()))?;
        let now = self.db.core.now_time();

        let Some(hotel) = self.db.hotels.get_mut(&hotel_id) else {
            return Ok(format!("Error: hotel {hotel_id} not found"));
        };
        let Some(room) = hotel.products.iter_mut().find(|p| p.product_id == room_id) else {
            return Ok(format!("Room {room_id} not found in hotel {hotel_id}"));
        };
        if room.quantity <= 0 {
            return Ok(format!("No available rooms at the moment for room {room_id}"));
        }
        room.quantity -= 1;
        let booked = HotelProduct {
            quantity: 1,
            ..room.clone()
        };

        let order = Order {
            order_id,
            order_type: OrderType::Hotel,
            user_id,
            store_id: hotel_id,
            note: Some(String::new()),
            location: None,
            dispatch_time: None,
            shipping_time: None,
            delivery_time: None,
            total_price: booked.price,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: vec![serde_json::to_value(booked).unwrap_or(Value::Null)],
        };
        self.finish_create(order)
    }

    fn create_attraction_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let attraction_id = args::req_str(arguments, "attraction_id")?;
        let ticket_id = args::req_str(arguments, "ticket_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        let date = args::req_str(arguments, "date")?;
        let quantity = args::req_i64(arguments, "quantity")?;
        require!(!attraction_id.is_empty(), "Attraction ID cannot be empty");
        require!(!ticket_id.is_empty(), "Ticket ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(!date.is_empty(), "Date cannot be empty");
        require!(quantity > 0, "Booking quantity must be greater than 0");
        require!(
            check_date_format(&date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );
        require!(self.check_user(&user_id), "User ID does not match");

        let order_id = self
            .db
            .core
            .assign_order_id("attraction", &user_id, &[])
            .map_err(|e| ToolError::Failed(e.to_string()))?;
        let now = self.db.core.now_time();

        let Some(attraction) = self.db.attractions.get_mut(&attraction_id) else {
            return Ok(format!("Error: attraction {attraction_id} not found"));
        };
        let Some(ticket) = attraction
            .products
            .iter_mut()
            .find(|p| p.date == date && p.product_id == ticket_id)
        else {
            return Ok(format!(
                "The attraction {attraction_id} does not have ticket {ticket_id} on date {date}"
            ));
        };
        if ticket.quantity < quantity {
            return Ok(format!(
                "Insufficient ticket inventory for the specified date {date}. Available: {}, Requested: {quantity}",
                ticket.quantity
            ));
        }
        ticket.quantity -= quantity;
        let booked = AttractionProduct {
            quantity,
            date: date.clone(),
            ..ticket.clone()
        };

        let order = Order {
            order_id,
            order_type: OrderType::Attraction,
            user_id,
            store_id: attraction_id,
            note: Some(String::new()),
            location: None,
            dispatch_time: None,
            shipping_time: None,
            delivery_time: None,
            total_price: booked.price * quantity as f64,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: vec![serde_json::to_value(booked).unwrap_or(Value::Null)],
        };
        self.finish_create(order)
    }

    fn create_flight_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let flight_id = args::req_str(arguments, "flight_id")?;
        let seat_id = args::req_str(arguments, "seat_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        let date = args::req_str(arguments, "date")?;
        let quantity = args::req_i64(arguments, "quantity")?;
        require!(!flight_id.is_empty(), "Flight ID cannot be empty");
        require!(!seat_id.is_empty(), "Seat ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(!date.is_empty(), "Date cannot be empty");
        require!(quantity > 0, "Booking quantity must be greater than 0");
        require!(
            check_date_format(&date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );
        require!(self.check_user(&user_id), "User ID does not match");

        let order_id = self
            .db
            .core
            .assign_order_id("flight", &user_id, &[])
            .map_err(|e| ToolError::Failed(e.to_string()))?;
        let now = self.db.core.now_time();

        let Some(flight) = self.db.flights.get_mut(&flight_id) else {
            return Ok(format!("Error: flight {flight_id} not found"));
        };
        let Some(seat) = flight
            .products
            .iter_mut()
            .find(|p| p.date == date && p.product_id == seat_id)
        else {
            return Ok(format!(
                "The flight {flight_id} does not have seat {seat_id} on date {date}"
            ));
        };
        if seat.quantity < quantity {
            return Ok(format!(
                "Insufficient seat inventory for the specified date {date}. Available: {}, Requested: {quantity}",
                seat.quantity
            ));
        }
        seat.quantity -= quantity;
        let booked = FlightProduct {
            quantity,
            date: date.clone(),
            ..seat.clone()
        };

        let order = Order {
            order_id,
            order_type: OrderType::Flight,
            user_id,
            store_id: flight_id,
            note: Some(String::new()),
            location: None,
            dispatch_time: None,
            shipping_time: None,
            delivery_time: None,
            total_price: booked.price * quantity as f64,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: vec![serde_json::to_value(booked).unwrap_or(Value::Null)],
        };
        self.finish_create(order)
    }

    fn create_train_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let train_id = args::req_str(arguments, "train_id")?;
        let seat_id = args::req_str(arguments, "seat_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        let date = args::req_str(arguments, "date")?;
        let quantity = args::req_i64(arguments, "quantity")?;
        require!(!train_id.is_empty(), "Train ID cannot be empty");
        require!(!seat_id.is_empty(), "Seat ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(!date.is_empty(), "Date cannot be empty");
        require!(quantity > 0, "Booking quantity must be greater than 0");
        require!(
            check_date_format(&date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );
        require!(self.check_user(&user_id), "User ID does not match");

        let order_id = self
            .db
            .core
            .assign_order_id("train", &user_id, &[])
            .map_err(|e| ToolError::Failed(e.to_string()))?;
        let now = self.db.core.now_time();

        let Some(train) = self.db.trains.get_mut(&train_id) else {
            return Ok(format!("Error: train {train_id} not found"));
        };
        let Some(seat) = train
            .products
            .iter_mut()
            .find(|p| p.date == date && p.product_id == seat_id)
        else {
            return Ok(format!(
                "The train {train_id} does not have seat {seat_id} on date {date}"
            ));
        };
        if seat.quantity < quantity {
            return Ok(format!(
                "Insufficient seat inventory for the specified date {date}. Available: {}, Requested: {quantity}",
                seat.quantity
            ));
        }
        seat.quantity -= quantity;
        let booked = TrainProduct {
            quantity,
            date: date.clone(),
            ..seat.clone()
        };

        let order = Order {
            order_id,
            order_type: OrderType::Train,
            user_id,
            store_id: train_id,
            note: Some(String::new()),
            location: None,
            dispatch_time: None,
            shipping_time: None,
            delivery_time: None,
            total_price: booked.price * quantity as f64,
            create_time: now.clone(),
            update_time: now,
            status: OrderStatus::Unpaid,
            products: vec![serde_json::to_value(booked).unwrap_or(Value::Null)],
        };
        self.finish_create(order)
    }

    // ── Pay / cancel / detail / search (shared over order types) ────

    fn pay_order(&mut self, arguments: &JsonMap, order_type: OrderType) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.order_type != order_type => Ok(format!(
                "Order {order_id} is not {}",
                type_label(order_type)
            )),
            Ok(order) if order.status != OrderStatus::Unpaid => Ok(format!(
                "Order status must be unpaid. Current status: {}",
                order.status
            )),
            Ok(_) => {
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.status = OrderStatus::Paid;
                order.update_time = now;
                Ok("Payment successful".to_string())
            }
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    /// Cancelling refunds the paid amount but never re-credits product
    /// inventory taken at creation.
    fn cancel_order(&mut self, arguments: &JsonMap, order_type: OrderType) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");

        let now = self.db.core.now_time();
        match self.order(&order_id) {
            Ok(order) if order.order_type != order_type => Ok(format!(
                "Order {order_id} is not {}",
                type_label(order_type)
            )),
            Ok(order) if order.user_id != user_id => Ok(format!(
                "Order {order_id} does not belong to user {user_id}"
            )),
            Ok(order) if order.status == OrderStatus::Cancelled => {
                Ok(format!("Order {order_id} is already cancelled"))
            }
            Ok(order) => {
                let refund = if order.status == OrderStatus::Paid {
                    order.total_price
                } else {
                    0.0
                };
                let order = self.db.core.orders.get_mut(&order_id).unwrap();
                order.status = OrderStatus::Cancelled;
                order.update_time = now;
                Ok(format!("Cancellation successful, refund amount: {refund}"))
            }
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn order_detail(&self, arguments: &JsonMap, order_type: OrderType) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        match self.order(&order_id) {
            Ok(order) if order.order_type != order_type => Ok(format!(
                "Order {order_id} is not {}",
                type_label(order_type)
            )),
            Ok(order) => Ok(order.detail()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => Ok(format!("Error: {e}")),
        }
    }

    fn search_orders(&self, arguments: &JsonMap, order_type: OrderType) -> ToolResult {
        let user_id = args::req_str(arguments, "user_id")?;
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        let date = args::opt_str(arguments, "date")?;
        // Absent defaults to "paid"; an explicit null clears the filter.
        let status = if arguments.contains_key("status") {
            args::opt_str(arguments, "status")?
        } else {
            Some("paid".to_string())
        };
        if let Some(date) = &date {
            require!(
                check_date_format(date),
                "Date format is incorrect, correct format is %Y-%m-%d"
            );
        }

        let matching: Vec<String> = self
            .db
            .core
            .orders
            .values()
            .filter(|order| order.order_type == order_type && order.user_id == user_id)
            .filter(|order| {
                status
                    .as_ref()
                    .map_or(true, |status| order.status.to_string() == *status)
            })
            .filter(|order| {
                date.as_ref().map_or(true, |date| {
                    order.products.iter().any(|product| {
                        product.get("date").and_then(Value::as_str) == Some(date.as_str())
                    })
                })
            })
            .map(Order::summary)
            .collect();

        if matching.is_empty() {
            let date_filter = date.map(|d| format!(" on date {d}")).unwrap_or_default();
            let status_filter = status
                .map(|s| format!(" with status {s}"))
                .unwrap_or_default();
            return Ok(format!(
                "No {} orders found for user {user_id}{date_filter}{status_filter}",
                scene_name(order_type)
            ));
        }
        Ok(matching.join("\n"))
    }

    // ── Modify (train / flight rebooking) ───────────────────────────

    fn modify_train_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        let new_date = args::req_str(arguments, "new_date")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(!new_date.is_empty(), "New departure date cannot be empty");
        require!(self.check_user(&user_id), "User ID does not match");
        require!(
            check_date_format(&new_date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );

        let now = self.db.core.now_time();
        let (train_id, old_line) = match self.order(&order_id) {
            Ok(order) if order.order_type != OrderType::Train => {
                return Ok(format!("Order {order_id} is not a train order"))
            }
            Ok(order) if order.user_id != user_id => {
                return Ok(format!("Order {order_id} does not belong to user {user_id}"))
            }
            Ok(order) if order.status != OrderStatus::Paid => {
                return Ok(format!(
                    "Only paid orders can be modified. Current status: {}",
                    order.status
                ))
            }
            Ok(order) if order.products.len() != 1 => {
                return Ok("Only single train ticket order modification is supported".to_string())
            }
            Ok(order) => (order.store_id.clone(), order.products[0].clone()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => {
                return Ok(format!("Error: {e}"))
            }
        };

        let seat_type = old_line
            .get("seat_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let quantity = old_line.get("quantity").and_then(Value::as_i64).unwrap_or(0);
        let old_date = old_line
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let old_price = old_line.get("price").and_then(Value::as_f64).unwrap_or(0.0);

        let Some(train) = self.db.trains.get_mut(&train_id) else {
            return Ok(format!("Error: train {train_id} not found"));
        };
        let Some(new_product) = train
            .products
            .iter()
            .find(|p| p.date == new_date && p.seat_type == seat_type)
            .cloned()
        else {
            return Ok(format!("New date {new_date} does not have {seat_type} type seats"));
        };
        if new_product.quantity < quantity {
            return Ok(format!(
                "Insufficient {seat_type} seat inventory for new date {new_date}. Available: {}, Required: {quantity}",
                new_product.quantity
            ));
        }

        if let Some(old_product) = train
            .products
            .iter_mut()
            .find(|p| p.date == old_date && p.seat_type == seat_type)
        {
            old_product.quantity += quantity;
        }
        if let Some(target) = train
            .products
            .iter_mut()
            .find(|p| p.date == new_date && p.seat_type == seat_type)
        {
            target.quantity -= quantity;
        }

        let new_total = new_product.price * quantity as f64;
        let diff = new_total - old_price * quantity as f64;

        let order = self.db.core.orders.get_mut(&order_id).unwrap();
        if diff > 0.0 {
            order.status = OrderStatus::Unpaid;
        }
        let new_line = TrainProduct {
            product_id: new_product.product_id.clone(),
            price: new_product.price,
            quantity,
            date: new_date,
            seat_type,
        };
        order.products = vec![serde_json::to_value(new_line).unwrap_or(Value::Null)];
        order.total_price = new_total;
        order.update_time = now;

        if diff > 0.0 {
            Ok(format!("Modification successful, need to pay additional amount: {diff}."))
        } else {
            Ok(format!("Modification successful, price difference: {diff}, refunded."))
        }
    }

    fn modify_flight_order(&mut self, arguments: &JsonMap) -> ToolResult {
        let order_id = args::req_str(arguments, "order_id")?;
        let user_id = args::req_str(arguments, "user_id")?;
        let new_date = args::req_str(arguments, "new_date")?;
        require!(!order_id.is_empty(), "Order ID cannot be empty");
        require!(!user_id.is_empty(), "User ID cannot be empty");
        require!(!new_date.is_empty(), "New departure date cannot be empty");
        require!(
            check_date_format(&new_date),
            "Date format is incorrect, correct format is %Y-%m-%d"
        );
        require!(self.check_user(&user_id), "User ID does not match");

        let now = self.db.core.now_time();
        let (flight_id, old_line) = match self.order(&order_id) {
            Ok(order) if order.order_type != OrderType::Flight => {
                return Ok(format!("Order {order_id} is not a flight order"))
            }
            Ok(order) if order.user_id != user_id => {
                return Ok(format!("Order {order_id} does not belong to user {user_id}"))
            }
            Ok(order) if order.status != OrderStatus::Paid => {
                return Ok(format!(
                    "Only paid orders can be modified. Current status: {}",
                    order.status
                ))
            }
            Ok(order) if order.products.len() != 1 => {
                return Ok("Only single flight ticket order modification is supported".to_string())
            }
            Ok(order) => (order.store_id.clone(), order.products[0].clone()),
            Err(ToolError::Failed(e)) | Err(ToolError::Precondition(e)) => {
                return Ok(format!("Error: {e}"))
            }
        };

        let seat_type = old_line
            .get("seat_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let quantity = old_line.get("quantity").and_then(Value::as_i64).unwrap_or(0);
        let old_date = old_line
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let old_price = old_line.get("price").and_then(Value::as_f64).unwrap_or(0.0);

        let Some(flight) = self.db.flights.get_mut(&flight_id) else {
            return Ok(format!("Error: flight {flight_id} not found"));
        };
        let Some(new_product) = flight
            .products
            .iter()
            .find(|p| p.date == new_date && p.seat_type == seat_type)
            .cloned()
        else {
            return Ok(format!("New date {new_date} does not have {seat_type} type seats"));
        };
        if new_product.quantity < quantity {
            return Ok(format!(
                "Insufficient {seat_type} seat inventory for new date {new_date}. Available: {}, Required: {quantity}",
                new_product.quantity
            ));
        }

        if let Some(old_product) = flight
            .products
            .iter_mut()
            .find(|p| p.date == old_date && p.seat_type == seat_type)
        {
            old_product.quantity += quantity;
        }
        if let Some(target) = flight
            .products
            .iter_mut()
            .find(|p| p.date == new_date && p.seat_type == seat_type)
        {
            target.quantity -= quantity;
        }

        let new_total = new_product.price * quantity as f64;
        let diff = new_total - old_price * quantity as f64;

        let order = self.db.core.orders.get_mut(&order_id).unwrap();
        if diff > 0.0 {
            order.status = OrderStatus::Unpaid;
        }
        let new_line = FlightProduct {
            product_id: new_product.product_id.clone(),
            price: new_product.price,
            quantity,
            date: new_date,
            seat_type,
        };
        order.products = vec![serde_json::to_value(new_line).unwrap_or(Value::Null)];
        order.total_price = new_total;
        order.update_time = now;

        if diff > 0.0 {
            Ok(format!(
                "Modification successful, need to pay additional amount: {diff}, please pay as soon as possible"
            ))
        } else {
            Ok(format!("Modification successful, price difference: {diff}, refunded"))
        }
    }

    fn get_nearby(&self, arguments: &JsonMap) -> ToolResult {
        let longitude = args::req_f64(arguments, "longitude")?;
        let latitude = args::req_f64(arguments, "latitude")?;
        let range = args::req_f64(arguments, "range")?;

        let mut matching = Vec::new();
        for hotel in self.db.hotels.values() {
            if generic::within_range(longitude, latitude, &hotel.location, range) {
                matching.push(hotel.summary());
            }
        }
        for attraction in self.db.attractions.values() {
            if generic::within_range(longitude, latitude, &attraction.location, range) {
                matching.push(attraction.summary());
            }
        }
        for flight in self.db.flights.values() {
            if generic::within_range(longitude, latitude, &flight.departure_airport_location, range)
                || generic::within_range(longitude, latitude, &flight.arrival_airport_location, range)
            {
                matching.push(flight.summary());
            }
        }
        for train in self.db.trains.values() {
            if generic::within_range(longitude, latitude, &train.departure_station_location, range)
                || generic::within_range(longitude, latitude, &train.arrival_station_location, range)
            {
                matching.push(train.summary());
            }
        }

        if matching.is_empty() {
            return Ok("No search results found".to_string());
        }
        Ok(matching.join("\n"))
    }
}

impl Toolkit for OtaToolkit {
    fn domain(&self) -> &str {
        "ota"
    }

    fn specs(&self) -> Vec<&'static ToolSpec> {
        GENERIC_SPECS.iter().chain(OTA_SPECS.iter()).collect()
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
            "get_ota_hotel_info" => self.get_ota_hotel_info(arguments),
            "get_ota_attraction_info" => self.get_ota_attraction_info(arguments),
            "get_ota_flight_info" => self.get_ota_flight_info(arguments),
            "get_ota_train_info" => self.get_ota_train_info(arguments),
            "hotel_search_recommend" => self.hotel_search_recommend(arguments),
            "attractions_search_recommend" => self.attractions_search_recommend(arguments),
            "flight_search_recommend" => self.flight_search_recommend(arguments),
            "train_ticket_search" => self.train_ticket_search(arguments),
            "create_hotel_order" => self.create_hotel_order(arguments),
            "create_attraction_order" => self.create_attraction_order(arguments),
            "create_flight_order" => self.create_flight_order(arguments),
            "create_train_order" => self.create_train_order(arguments),
            "pay_hotel_order" => self.pay_order(arguments, OrderType::Hotel),
            "pay_attraction_order" => self.pay_order(arguments, OrderType::Attraction),
            "pay_flight_order" => self.pay_order(arguments, OrderType::Flight),
            "pay_train_order" => self.pay_order(arguments, OrderType::Train),
            "search_hotel_order" => self.search_orders(arguments, OrderType::Hotel),
            "search_attraction_order" => self.search_orders(arguments, OrderType::Attraction),
            "search_flight_order" => self.search_orders(arguments, OrderType::Flight),
            "search_train_order" => self.search_orders(arguments, OrderType::Train),
            "get_hotel_order_detail" => self.order_detail(arguments, OrderType::Hotel),
            "get_attraction_order_detail" => self.order_detail(arguments, OrderType::Attraction),
            "get_flight_order_detail" => self.order_detail(arguments, OrderType::Flight),
            "get_train_order_detail" => self.order_detail(arguments, OrderType::Train),
            "modify_train_order" => self.modify_train_order(arguments),
            "modify_flight_order" => self.modify_flight_order(arguments),
            "cancel_hotel_order" => self.cancel_order(arguments, OrderType::Hotel),
            "cancel_attraction_order" => self.cancel_order(arguments, OrderType::Attraction),
            "cancel_flight_order" => self.cancel_order(arguments, OrderType::Flight),
            "cancel_train_order" => self.cancel_order(arguments, OrderType::Train),
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
        stats.insert("num_hotels".into(), self.db.hotels.len().into());
        stats.insert("num_attractions".into(), self.db.attractions.len().into());
        stats.insert("num_flights".into(), self.db.flights.len().into());
        stats.insert("num_trains".into(), self.db.trains.len().into());
        stats
    }
}
