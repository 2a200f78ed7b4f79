//! Integration tests for the domain toolkits: order lifecycles,
//! deterministic ids, inventory rules, and schema/validation agreement.

use serde_json::{json, Value};
use vendsim::domains::delivery::{DeliveryDb, DeliveryToolkit};
use vendsim::domains::instore::{InstoreDb, InstoreToolkit};
use vendsim::domains::ota::{OtaDb, OtaToolkit};
use vendsim::{Language, Toolkit};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

fn delivery_toolkit() -> DeliveryToolkit {
    let blob = json!({
        "time": "2025-08-01 10:00:00",
        "user_id": "user_001",
        "location": [
            {"address": "1 River Road", "longitude": 120.16, "latitude": 30.25}
        ],
        "weather": [
            {"city": "Hangzhou", "category": "Sunny", "datetime": "2025-08-01",
             "temperature": [26.0, 35.0], "humidity": 60.0}
        ],
        "stores": {
            "S001": {
                "store_id": "S001",
                "name": "Golden Wok",
                "score": 4.7,
                "location": {"address": "8 Lake Street", "longitude": 120.15, "latitude": 30.25},
                "tags": ["chinese", "wok"],
                "products": [
                    {
                        "product_id": "P001",
                        "name": "Kung Pao Chicken",
                        "store_id": "S001",
                        "store_name": "Golden Wok",
                        "price": 32.0,
                        "quantity": 100,
                        "attributes": ["large", "extra spicy"],
                        "tags": ["spicy"]
                    },
                    {
                        "product_id": "P002",
                        "name": "Spring Rolls",
                        "store_id": "S001",
                        "store_name": "Golden Wok",
                        "price": 12.0,
                        "quantity": 50,
                        "attributes": "",
                        "tags": ["starter"]
                    }
                ]
            }
        }
    });
    DeliveryToolkit::new(DeliveryDb::from_env(&blob).unwrap(), Language::English)
}

fn instore_toolkit() -> InstoreToolkit {
    let blob = json!({
        "time": "2025-08-01 10:00:00",
        "user_id": "user_001",
        "shops": {
            "SH01": {
                "shop_id": "SH01",
                "shop_name": "Lotus Spa",
                "score": 4.9,
                "location": {"address": "2 Hill Street", "longitude": 120.14, "latitude": 30.26},
                "tags": ["spa", "massage"],
                "enable_book": true,
                "book_price": 20.0,
                "enable_reservation": true,
                "products": [
                    {"product_id": "SP01", "name": "Foot Massage", "shop_id": "SH01",
                     "price": 88.0, "quantity": 10, "tags": ["massage"]}
                ]
            },
            "SH02": {
                "shop_id": "SH02",
                "shop_name": "Quick Cuts",
                "score": 4.0,
                "location": {"address": "3 Hill Street", "longitude": 120.14, "latitude": 30.26},
                "tags": ["haircut"],
                "enable_book": false,
                "book_price": 0.0,
                "enable_reservation": true,
                "products": []
            }
        }
    });
    InstoreToolkit::new(InstoreDb::from_env(&blob).unwrap(), Language::English)
}

fn ota_toolkit() -> OtaToolkit {
    let blob = json!({
        "time": "2025-08-01 10:00:00",
        "user_id": "user_001",
        "trains": {
            "T001": {
                "train_id": "T001",
                "train_number": "G101",
                "departure_city": "Hangzhou",
                "arrival_city": "Shanghai",
                "departure_station_location": {"address": "Hangzhou East", "longitude": 120.21, "latitude": 30.29},
                "arrival_station_location": {"address": "Shanghai Hongqiao", "longitude": 121.32, "latitude": 31.19},
                "departure_time": "08:00",
                "arrival_time": "09:05",
                "tags": ["high-speed"],
                "products": [
                    {"product_id": "TP1", "price": 100.0, "quantity": 5,
                     "date": "2025-08-02", "seat_type": "second"},
                    {"product_id": "TP2", "price": 120.0, "quantity": 1,
                     "date": "2025-08-03", "seat_type": "second"}
                ]
            }
        },
        "hotels": {
            "H001": {
                "hotel_id": "H001",
                "hotel_name": "Lakeview Hotel",
                "score": 4.5,
                "star_rating": 4,
                "location": {"address": "9 Lakeside Avenue, Hangzhou", "longitude": 120.15, "latitude": 30.24},
                "tags": ["wifi", "pool"],
                "products": [
                    {"product_id": "R101", "price": 520.0, "quantity": 1,
                     "date": "2025-08-02", "room_type": "king"}
                ]
            }
        }
    });
    OtaToolkit::new(OtaDb::from_env(&blob).unwrap(), Language::English)
}

fn obj(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn sole_order_id(toolkit: &dyn Toolkit) -> String {
    let snapshot = toolkit.db_value();
    let orders = snapshot["orders"].as_object().unwrap();
    assert_eq!(orders.len(), 1, "expected exactly one order");
    orders.keys().next().unwrap().clone()
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery: order creation, payment, cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn create_delivery_order_prices_and_ids() {
    let mut tk = delivery_toolkit();
    let args = obj(json!({
        "user_id": "user_001",
        "store_id": "S001",
        "product_ids": ["P001"],
        "product_cnts": [2],
        "address": "1 River Road",
        "dispatch_time": "2025-08-01 12:00:00",
    }));
    let outcome = tk.call("create_delivery_order", &args);
    assert!(!outcome.is_error, "unexpected error: {}", outcome.content);
    assert!(outcome.content.contains("status:unpaid"));
    assert!(outcome.content.contains("total_price:64"));

    let order_id = sole_order_id(&tk);
    assert!(order_id.starts_with("OT"));
    assert_eq!(order_id.len(), 12);

    // Pinned clock: the same inputs map to the same id, so a repeat is a
    // duplicate.
    let repeat = tk.call("create_delivery_order", &args);
    assert_eq!(repeat.content, "Order already exists");
}

#[test]
fn delivery_order_rejects_past_dispatch_time() {
    let mut tk = delivery_toolkit();
    let args = obj(json!({
        "user_id": "user_001",
        "store_id": "S001",
        "product_ids": ["P001"],
        "product_cnts": [1],
        "address": "1 River Road",
        "dispatch_time": "2025-08-01 09:00:00",
    }));
    let outcome = tk.call("create_delivery_order", &args);
    assert!(!outcome.is_error);
    assert!(outcome.content.contains("must be in the future"));
    assert!(tk.db_value()["orders"].as_object().unwrap().is_empty());
}

#[test]
fn pay_and_cancel_are_idempotent_with_descriptive_noops() {
    let mut tk = delivery_toolkit();
    tk.call(
        "create_delivery_order",
        &obj(json!({
            "user_id": "user_001",
            "store_id": "S001",
            "product_ids": ["P002"],
            "product_cnts": [1],
            "address": "1 River Road",
            "dispatch_time": "2025-08-01 12:00:00",
        })),
    );
    let order_id = sole_order_id(&tk);
    let pay_args = obj(json!({ "order_id": order_id }));

    assert_eq!(tk.call("pay_delivery_order", &pay_args).content, "Payment successful");
    // Paying again is a no-op with a descriptive message.
    let again = tk.call("pay_delivery_order", &pay_args);
    assert!(again.content.contains("not in `unpaid` status"));
    assert!(again.content.contains("paid"));

    let cancel = tk.call("cancel_delivery_order", &pay_args);
    assert!(cancel.content.contains("has been cancelled"));
    // Cancelled is terminal.
    let recancel = tk.call("cancel_delivery_order", &pay_args);
    assert!(recancel.content.contains("already cancelled"));
    let modify = tk.call(
        "modify_delivery_order",
        &obj(json!({"order_id": order_id, "note": "no peanuts"})),
    );
    assert!(modify.content.contains("already cancelled"));
}

#[test]
fn delivery_distance_time_uses_the_fixed_formula() {
    let mut tk = delivery_toolkit();
    let outcome = tk.call(
        "delivery_distance_to_time",
        &obj(json!({"distance": 2000.0})),
    );
    // 25.00 + 2000 * 0.006510 = 38.02 -> 38.
    assert_eq!(outcome.content, "38");
}

#[test]
fn list_attributes_are_joined() {
    let mut tk = delivery_toolkit();
    let outcome = tk.call(
        "get_delivery_product_info",
        &obj(json!({"product_id": "P001"})),
    );
    assert!(outcome.content.contains("attributes=large, extra spicy"));
}

#[test]
fn store_search_ranks_by_keyword() {
    let mut tk = delivery_toolkit();
    let outcome = tk.call(
        "delivery_store_search_recommend",
        &obj(json!({"keywords": ["wok"]})),
    );
    assert!(outcome.content.contains("Golden Wok"));
}

// ─────────────────────────────────────────────────────────────────────────────
// In-store: bookings and reservations
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn booking_respects_shop_support_and_price() {
    let mut tk = instore_toolkit();
    let denied = tk.call(
        "instore_book",
        &obj(json!({
            "user_id": "user_001", "shop_id": "SH02",
            "time": "2025-08-02 18:00:00", "customer_count": 2
        })),
    );
    assert!(denied.content.contains("does not support table booking"));

    let booked = tk.call(
        "instore_book",
        &obj(json!({
            "user_id": "user_001", "shop_id": "SH01",
            "time": "2025-08-02 18:00:00", "customer_count": 2
        })),
    );
    // Paid booking fee -> created unpaid.
    assert!(booked.content.contains("status=unpaid"));
    assert!(booked.content.contains("book_price=20"));
}

#[test]
fn reservation_lifecycle_and_terminal_states() {
    let mut tk = instore_toolkit();
    let created = tk.call(
        "instore_reservation",
        &obj(json!({
            "user_id": "user_001", "shop_id": "SH01",
            "time": "2025-08-02 15:00:00", "customer_count": 1
        })),
    );
    assert!(created.content.contains("status=unconsumed"));
    let snapshot = tk.db_value();
    let reservation_id = snapshot["reservations"]
        .as_object()
        .unwrap()
        .keys()
        .next()
        .unwrap()
        .clone();
    assert!(reservation_id.starts_with("OI"));

    let modified = tk.call(
        "instore_modify_reservation",
        &obj(json!({
            "reservation_id": reservation_id,
            "time": "2025-08-02 16:00:00",
            "customer_count": 3
        })),
    );
    assert!(modified.content.contains("customer_count=3"));

    let cancelled = tk.call(
        "instore_cancel_reservation",
        &obj(json!({"reservation_id": reservation_id})),
    );
    assert!(cancelled.content.contains("is cancelled"));

    // Terminal: neither modify nor cancel applies again.
    let remodify = tk.call(
        "instore_modify_reservation",
        &obj(json!({
            "reservation_id": reservation_id,
            "time": "2025-08-02 17:00:00",
            "customer_count": 1
        })),
    );
    assert!(remodify.content.contains("already cancelled"));
    let recancel = tk.call(
        "instore_cancel_reservation",
        &obj(json!({"reservation_id": reservation_id})),
    );
    assert!(recancel.content.contains("already cancelled"));
}

#[test]
fn instore_order_requires_product_in_shop() {
    let mut tk = instore_toolkit();
    let wrong = tk.call(
        "create_instore_product_order",
        &obj(json!({
            "user_id": "user_001", "shop_id": "SH02", "product_id": "SP01", "quantity": 1
        })),
    );
    assert!(wrong.content.contains("does not exist in shop SH02"));

    let created = tk.call(
        "create_instore_product_order",
        &obj(json!({
            "user_id": "user_001", "shop_id": "SH01", "product_id": "SP01", "quantity": 2
        })),
    );
    assert!(created.content.contains("total_price:176"));
    assert!(sole_order_id(&tk).starts_with("OI"));
}

// ─────────────────────────────────────────────────────────────────────────────
// OTA: inventory, rebooking, refund rules
// ─────────────────────────────────────────────────────────────────────────────

fn create_paid_train_order(tk: &mut OtaToolkit) -> String {
    let created = tk.call(
        "create_train_order",
        &obj(json!({
            "train_id": "T001", "seat_id": "TP1", "user_id": "user_001",
            "date": "2025-08-02", "quantity": 2
        })),
    );
    assert!(created.content.contains("status:unpaid"), "{}", created.content);
    let order_id = sole_order_id(tk);
    assert!(order_id.starts_with("OO"));
    let paid = tk.call("pay_train_order", &obj(json!({"order_id": order_id})));
    assert_eq!(paid.content, "Payment successful");
    order_id
}

fn train_quantity(tk: &OtaToolkit, product_id: &str) -> i64 {
    let snapshot = tk.db_value();
    snapshot["trains"]["T001"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["product_id"] == product_id)
        .unwrap()["quantity"]
        .as_i64()
        .unwrap()
}

#[test]
fn creating_a_train_order_decrements_inventory() {
    let mut tk = ota_toolkit();
    create_paid_train_order(&mut tk);
    assert_eq!(train_quantity(&tk, "TP1"), 3);
}

#[test]
fn modify_to_a_date_with_insufficient_seats_changes_nothing() {
    let mut tk = ota_toolkit();
    let order_id = create_paid_train_order(&mut tk);

    let modified = tk.call(
        "modify_train_order",
        &obj(json!({
            "order_id": order_id, "user_id": "user_001", "new_date": "2025-08-03"
        })),
    );
    assert!(modified.content.contains("Insufficient second seat inventory"));
    assert!(modified.content.contains("Available: 1, Required: 2"));

    // The original order is unchanged.
    let snapshot = tk.db_value();
    let order = &snapshot["orders"][&order_id];
    assert_eq!(order["status"], "paid");
    assert_eq!(order["total_price"], 200.0);
    assert_eq!(order["products"][0]["date"], "2025-08-02");
    assert_eq!(train_quantity(&tk, "TP1"), 3);
    assert_eq!(train_quantity(&tk, "TP2"), 1);
}

#[test]
fn modify_only_applies_to_paid_orders() {
    let mut tk = ota_toolkit();
    tk.call(
        "create_train_order",
        &obj(json!({
            "train_id": "T001", "seat_id": "TP1", "user_id": "user_001",
            "date": "2025-08-02", "quantity": 1
        })),
    );
    let order_id = sole_order_id(&tk);
    let modified = tk.call(
        "modify_train_order",
        &obj(json!({
            "order_id": order_id, "user_id": "user_001", "new_date": "2025-08-03"
        })),
    );
    assert!(modified.content.contains("Only paid orders can be modified"));
}

#[test]
fn cancelling_refunds_paid_total_but_keeps_inventory_taken() {
    let mut tk = ota_toolkit();
    let order_id = create_paid_train_order(&mut tk);

    let cancelled = tk.call(
        "cancel_train_order",
        &obj(json!({"order_id": order_id, "user_id": "user_001"})),
    );
    assert_eq!(cancelled.content, "Cancellation successful, refund amount: 200");
    // Inventory taken at creation is not re-credited.
    assert_eq!(train_quantity(&tk, "TP1"), 3);

    let recancel = tk.call(
        "cancel_train_order",
        &obj(json!({"order_id": order_id, "user_id": "user_001"})),
    );
    assert!(recancel.content.contains("already cancelled"));
}

#[test]
fn cancelling_an_unpaid_order_refunds_zero() {
    let mut tk = ota_toolkit();
    tk.call(
        "create_train_order",
        &obj(json!({
            "train_id": "T001", "seat_id": "TP1", "user_id": "user_001",
            "date": "2025-08-02", "quantity": 1
        })),
    );
    let order_id = sole_order_id(&tk);
    let cancelled = tk.call(
        "cancel_train_order",
        &obj(json!({"order_id": order_id, "user_id": "user_001"})),
    );
    assert_eq!(cancelled.content, "Cancellation successful, refund amount: 0");
}

#[test]
fn hotel_room_inventory_blocks_overbooking() {
    let mut tk = ota_toolkit();
    let first = tk.call(
        "create_hotel_order",
        &obj(json!({"hotel_id": "H001", "room_id": "R101", "user_id": "user_001"})),
    );
    assert!(first.content.contains("status:unpaid"));
    let second = tk.call(
        "create_hotel_order",
        &obj(json!({"hotel_id": "H001", "room_id": "R101", "user_id": "user_001"})),
    );
    assert!(second.content.contains("No available rooms at the moment"));
}

#[test]
fn train_search_matches_city_and_date() {
    let mut tk = ota_toolkit();
    let hit = tk.call(
        "train_ticket_search",
        &obj(json!({"departure": "Hangzhou", "destination": "Shanghai", "date": "2025-08-02"})),
    );
    assert!(hit.content.contains("G101"));
    let miss = tk.call(
        "train_ticket_search",
        &obj(json!({"departure": "Hangzhou", "destination": "Shanghai", "date": "2025-08-09"})),
    );
    assert_eq!(miss.content, "No trains found matching the criteria");
}

// ─────────────────────────────────────────────────────────────────────────────
// Schemas agree with runtime validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn every_schema_matches_its_runtime_validation() {
    let toolkits: Vec<Box<dyn Toolkit>> = vec![
        Box::new(delivery_toolkit()),
        Box::new(instore_toolkit()),
        Box::new(ota_toolkit()),
    ];
    for mut toolkit in toolkits {
        let specs: Vec<_> = toolkit.specs();
        for spec in specs {
            let schema = spec.openai_schema(toolkit.domain(), Language::English);
            assert_eq!(schema["type"], "function");
            assert_eq!(schema["function"]["name"], spec.name);
            assert!(
                schema["function"]["description"].as_str().unwrap().len() > spec.name.len(),
                "tool {} has no real description",
                spec.name
            );

            let required: Vec<&str> = schema["function"]["parameters"]["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            for param in spec.params {
                let prop = &schema["function"]["parameters"]["properties"][param.name];
                assert_eq!(prop["type"], param.json_type, "param {} of {}", param.name, spec.name);
                assert_eq!(param.required, required.contains(&param.name));
            }

            // Calling with no arguments must trip validation on some
            // schema-required parameter, never panic or invent output.
            if spec.params.iter().any(|p| p.required) {
                let outcome = toolkit.call(spec.name, &serde_json::Map::new());
                assert!(!outcome.is_error, "{}: {}", spec.name, outcome.content);
                assert!(
                    outcome.content.contains("Missing required parameter"),
                    "{} returned: {}",
                    spec.name,
                    outcome.content
                );
                let named = spec
                    .params
                    .iter()
                    .filter(|p| p.required)
                    .any(|p| outcome.content.contains(p.name));
                assert!(named, "{} message names no required param: {}", spec.name, outcome.content);
            }
        }
    }
}

#[test]
fn chinese_schemas_are_localized() {
    let tk = delivery_toolkit();
    let schemas = tk.openai_schemas(Language::Chinese);
    let create = schemas
        .iter()
        .find(|s| s["function"]["name"] == "create_delivery_order")
        .unwrap();
    assert!(create["function"]["description"]
        .as_str()
        .unwrap()
        .contains("外卖"));
}
