//! Localized tool description bundles.
//!
//! A static lookup `(domain, tool_name, language) -> bundle` consulted
//! when building the LLM tool schema. Domains fall back to the shared
//! bundle for the generic tools they inherit.

use crate::config::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescription {
    pub description: &'static str,
    pub preconditions: &'static str,
    pub postconditions: &'static str,
    pub args: &'static [(&'static str, &'static str)],
    pub returns: &'static str,
}

impl ToolDescription {
    /// The text placed in the schema's `function.description`.
    pub fn render_description(&self) -> String {
        format!(
            "{}\n\nPreconditions:\n    - {}\nPostconditions:\n    - {}\n\nReturns:\n    {}",
            self.description, self.preconditions, self.postconditions, self.returns
        )
    }
}

const fn desc(
    description: &'static str,
    preconditions: &'static str,
    postconditions: &'static str,
    args: &'static [(&'static str, &'static str)],
    returns: &'static str,
) -> ToolDescription {
    ToolDescription {
        description,
        preconditions,
        postconditions,
        args,
        returns,
    }
}

pub fn lookup(domain: &str, tool: &str, language: Language) -> Option<ToolDescription> {
    let domain_specific = match (domain, language) {
        ("delivery", Language::English) => delivery_en(tool),
        ("delivery", Language::Chinese) => delivery_zh(tool),
        ("instore", Language::English) => instore_en(tool),
        ("instore", Language::Chinese) => instore_zh(tool),
        ("ota", Language::English) => ota_en(tool),
        ("ota", Language::Chinese) => ota_zh(tool),
        ("cross_domain", Language::English) => delivery_en(tool)
            .or_else(|| instore_en(tool))
            .or_else(|| ota_en(tool)),
        ("cross_domain", Language::Chinese) => delivery_zh(tool)
            .or_else(|| instore_zh(tool))
            .or_else(|| ota_zh(tool)),
        _ => None,
    };
    domain_specific.or_else(|| match language {
        Language::English => generic_en(tool),
        Language::Chinese => generic_zh(tool),
    })
}

// ── Shared base tools ───────────────────────────────────────────────

fn generic_en(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "longitude_latitude_to_distance" => desc(
            "Compute the straight-line distance in meters between two coordinates",
            "Both coordinate pairs are known",
            "Returns the distance in meters",
            &[
                ("longitude1", "Longitude of the first point"),
                ("latitude1", "Latitude of the first point"),
                ("longitude2", "Longitude of the second point"),
                ("latitude2", "Latitude of the second point"),
            ],
            "Distance in meters",
        ),
        "weather" => desc(
            "Query the weather for a city between two dates",
            "The city name (or an address containing it) and a date range are known",
            "Returns one weather line per matching date",
            &[
                ("address", "City name or an address containing it"),
                ("date_start", "Start date, yyyy-mm-dd"),
                ("date_end", "End date, yyyy-mm-dd"),
            ],
            "Weather description per date, or a not-found notice",
        ),
        "address_to_longitude_latitude" => desc(
            "Resolve an address to longitude and latitude",
            "A concrete address is known",
            "Returns the coordinates of the best-matching known address",
            &[("address", "The address to geocode")],
            "[longitude, latitude]",
        ),
        "get_date_holiday_info" => desc(
            "Check whether a date is a holiday and which one",
            "A date is known",
            "Returns the holiday name or a not-a-holiday notice",
            &[("date", "Date, yyyy-mm-dd")],
            "Holiday name, or a notice that the date is not a holiday",
        ),
        "get_holiday_date" => desc(
            "Look up the date of a named holiday in a given year",
            "Year and holiday name are known",
            "Returns the date of the holiday",
            &[
                ("year", "Four-digit year"),
                ("holiday_name", "The holiday name, fuzzy-matched"),
            ],
            "The holiday date yyyy-mm-dd, or a not-found notice",
        ),
        "get_user_historical_behaviors" => desc(
            "Dump the user's historical behavior profile",
            "The current user is bound to the session",
            "Returns the recorded historical behaviors",
            &[],
            "Historical behavior entries as JSON",
        ),
        "get_user_all_orders" => desc(
            "List every order of the current user across all scenarios",
            "The current user is bound to the session",
            "Returns all orders with full details",
            &[],
            "One order per line, or a notice that no orders exist",
        ),
        "get_nearby" => desc(
            "Find stores and venues within a radius of a coordinate",
            "A coordinate and a search radius in meters are known",
            "Returns every catalog entry within the radius",
            &[
                ("longitude", "Center longitude"),
                ("latitude", "Center latitude"),
                ("range", "Search radius in meters"),
            ],
            "Matching entries, one per line, or a no-results notice",
        ),
        _ => return None,
    })
}

fn generic_zh(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "longitude_latitude_to_distance" => desc(
            "计算两个经纬度坐标之间的直线距离（米）",
            "已知两点的经纬度",
            "返回两点间距离（米）",
            &[
                ("longitude1", "第一个点的经度"),
                ("latitude1", "第一个点的纬度"),
                ("longitude2", "第二个点的经度"),
                ("latitude2", "第二个点的纬度"),
            ],
            "距离（以米为单位）",
        ),
        "weather" => desc(
            "查询某城市在日期范围内的天气",
            "已知城市名（或包含城市的地址）及起止日期",
            "返回每个日期一行天气信息",
            &[
                ("address", "城市名或包含城市的地址"),
                ("date_start", "开始日期，格式yyyy-mm-dd"),
                ("date_end", "结束日期，格式yyyy-mm-dd"),
            ],
            "按日期排列的天气信息，未找到时返回提示",
        ),
        "address_to_longitude_latitude" => desc(
            "将地址解析为经纬度",
            "已知具体地址",
            "返回最匹配地址的经纬度",
            &[("address", "需要解析的地址")],
            "[经度, 纬度]",
        ),
        "get_date_holiday_info" => desc(
            "查询某日期是否为节日及节日名称",
            "已知日期",
            "返回节日名称或非节日提示",
            &[("date", "日期，格式yyyy-mm-dd")],
            "节日名称，非节日时返回提示",
        ),
        "get_holiday_date" => desc(
            "查询某年份某节日的具体日期",
            "已知年份与节日名称",
            "返回节日日期",
            &[("year", "四位年份"), ("holiday_name", "节日名称，支持模糊匹配")],
            "节日日期yyyy-mm-dd，未找到时返回提示",
        ),
        "get_user_historical_behaviors" => desc(
            "获取用户历史行为信息",
            "当前会话已绑定用户",
            "返回用户历史行为记录",
            &[],
            "历史行为记录（JSON）",
        ),
        "get_user_all_orders" => desc(
            "获取当前用户在所有场景下的全部订单",
            "当前会话已绑定用户",
            "返回所有订单的详细信息",
            &[],
            "每行一个订单，无订单时返回提示",
        ),
        "get_nearby" => desc(
            "查询某坐标附近指定范围内的商家和场所",
            "已知坐标及搜索半径（米）",
            "返回范围内的所有目录条目",
            &[
                ("longitude", "中心点经度"),
                ("latitude", "中心点纬度"),
                ("range", "搜索半径（米）"),
            ],
            "每行一个匹配条目，无结果时返回提示",
        ),
        _ => return None,
    })
}

// ── Delivery ────────────────────────────────────────────────────────

fn delivery_en(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "delivery_distance_to_time" => desc(
            "Estimate delivery time in minutes from the store-to-address distance in meters",
            "The distance from the store to the delivery address is known",
            "Returns the estimated delivery time",
            &[("distance", "Distance in meters")],
            "Time in minutes",
        ),
        "get_delivery_store_info" => desc(
            "Get store details: id, score, address, coordinates, tags and product list",
            "A store id is known",
            "Returns the store's full details",
            &[("store_id", "The store id")],
            "Full store details",
        ),
        "get_delivery_product_info" => desc(
            "Get product details: name, id, store, price, quantity and tags",
            "A product id is known",
            "Returns the product's full details",
            &[("product_id", "The product id")],
            "Full product details",
        ),
        "delivery_store_search_recommend" => desc(
            "Search or recommend delivery stores from keywords describing them",
            "Keywords describing the desired store have been extracted from the user",
            "Returns a store list to let the user pick one",
            &[("keywords", "Keywords describing the store")],
            "Structured store information",
        ),
        "delivery_product_search_recommend" => desc(
            "Search or recommend delivery products from keywords describing them",
            "Keywords describing the desired product have been extracted from the user",
            "Returns a product list to let the user pick and order",
            &[("keywords", "Keywords describing the product")],
            "Structured product information",
        ),
        "create_delivery_order" => desc(
            "Create a delivery order for one store with one or more products",
            "Exactly one store id and one or more product ids are confirmed, dietary restrictions are reflected in the order",
            "Returns the order and asks the user whether to pay",
            &[
                ("user_id", "The user id"),
                ("store_id", "The store id"),
                ("product_ids", "Product id list"),
                ("product_cnts", "Quantity per product id"),
                ("address", "Delivery target address"),
                ("dispatch_time", "When the courier departs from the store, yyyy-mm-dd HH:MM:SS"),
                ("attributes", "Variant attributes per product id"),
                ("note", "Order note, e.g. dietary restrictions (never put timing requests here)"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "pay_delivery_order" => desc(
            "Pay an unpaid delivery order after the user confirms payment",
            "An order exists and the user confirmed payment (or asked to retry payment)",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "get_delivery_order_status" => desc(
            "Get a delivery order's status",
            "An order id is known",
            "Returns the order status",
            &[("order_id", "The order id")],
            "Order status",
        ),
        "cancel_delivery_order" => desc(
            "Cancel a delivery order, or abandon its payment. Never cancel an already-cancelled order.",
            "The order status is not cancelled",
            "Returns the cancellation result",
            &[("order_id", "The order id")],
            "Cancellation result",
        ),
        "modify_delivery_order" => desc(
            "Modify a delivery order's note",
            "Exactly one order id is confirmed and the user wants the note changed",
            "Returns the modification result",
            &[("order_id", "The order id"), ("note", "The new note")],
            "Modification result",
        ),
        "search_delivery_orders" => desc(
            "List the user's delivery orders filtered by status",
            "The user id is known",
            "Returns matching delivery orders",
            &[("user_id", "The user id"), ("status", "Order status filter, default unpaid")],
            "Matching orders, one per line",
        ),
        "get_delivery_order_detail" => desc(
            "Get a delivery order's full details",
            "An order id is known",
            "Returns the order details",
            &[("order_id", "The order id")],
            "Full order details",
        ),
        _ => return None,
    })
}

fn delivery_zh(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "delivery_distance_to_time" => desc(
            "根据距离（米）计算外卖配送时间（分钟）",
            "根据从商家到用户地址的距离计算外卖配送时间",
            "返回配送时间（分钟）",
            &[("distance", "距离（以米为单位）")],
            "时间（以分钟为单位）",
        ),
        "get_delivery_store_info" => desc(
            "获取商家信息，包括商家id、评分、地址、经纬度、标签、商品列表",
            "处于外卖场景，需要获取商家的详细信息",
            "返回商家的详细信息",
            &[("store_id", "商家id")],
            "商家的详细信息",
        ),
        "get_delivery_product_info" => desc(
            "获取商品信息，包括商品名称、商品id、商店名称、商店id、商品价格、商品标签",
            "处于外卖场景，需要获取商品的详细信息",
            "返回商品的详细信息",
            &[("product_id", "商品id")],
            "商品的详细信息",
        ),
        "delivery_store_search_recommend" => desc(
            "在外卖场景下，根据描述商家的关键词，搜索或推荐多个商家",
            "处于外卖场景，获取描述商家的关键词",
            "返回商家列表，引导用户选择确定商家",
            &[("keywords", "描述商家的关键词")],
            "结构化输出的商家信息",
        ),
        "delivery_product_search_recommend" => desc(
            "在外卖场景下，根据描述商品的关键词，搜索或推荐多个商品",
            "处于外卖场景，获取描述商品的关键词",
            "返回商品列表，引导用户选择商品并创建订单",
            &[("keywords", "描述商品的关键词")],
            "结构化输出的商品信息",
        ),
        "create_delivery_order" => desc(
            "外卖订单创建，仅支持单个商家下单，单个商家可以下单多个商品",
            "处于外卖场景，确定唯一一个店家id和一个或多个商品id，确定用户的饮食禁忌并在订单中体现",
            "返回订单信息，询问用户是否支付订单",
            &[
                ("user_id", "用户id"),
                ("store_id", "商店id"),
                ("product_ids", "商品id列表"),
                ("product_cnts", "商品id对应数量列表"),
                ("address", "外卖配送目标地址"),
                ("dispatch_time", "外卖订单开始配送的时间（骑手从商家取餐出发的时间），格式为yyyy-mm-dd HH:MM:SS"),
                ("attributes", "商品id对应商品规格属性"),
                ("note", "订单备注（禁止将用户关于时间等需求直接放在备注中），如饮食禁忌信息说明"),
            ],
            "如果创建成功，返回订单信息，否则返回相关提示信息",
        ),
        "pay_delivery_order" => desc(
            "在外卖场景下，上文有订单信息，用户表达确认支付，或者重新支付",
            "处于外卖场景，用户表达确认支付，订单创建完成并进入支付环节",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "get_delivery_order_status" => desc(
            "获取订单状态",
            "查询外卖订单状态",
            "返回订单状态信息",
            &[("order_id", "订单id")],
            "订单状态信息",
        ),
        "cancel_delivery_order" => desc(
            "用户取消订单，或者用户取消支付。禁止对处于已取消状态的订单再次取消。",
            "查询外卖订单状态，确保订单状态为非cancelled",
            "返回取消订单结果信息",
            &[("order_id", "订单id")],
            "取消订单结果信息",
        ),
        "modify_delivery_order" => desc(
            "修改订单备注信息",
            "上文确定唯一一个外卖order_id，用户需要修改外卖订单备注",
            "返回修改结果信息",
            &[("order_id", "订单id"), ("note", "新的备注内容")],
            "修改结果信息",
        ),
        "search_delivery_orders" => desc(
            "按状态筛选用户的外卖订单",
            "已知用户id",
            "返回符合条件的外卖订单",
            &[("user_id", "用户id"), ("status", "订单状态筛选，默认unpaid")],
            "每行一个订单",
        ),
        "get_delivery_order_detail" => desc(
            "获取外卖订单的详细信息",
            "已知订单id",
            "返回订单详细信息",
            &[("order_id", "订单id")],
            "订单的详细信息",
        ),
        _ => return None,
    })
}

// ── In-store ────────────────────────────────────────────────────────

fn instore_en(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "instore_shop_search_recommend" => desc(
            "Search or recommend in-store shops from keywords describing them",
            "Keywords describing the desired shop have been extracted from the user",
            "Returns a shop list to let the user pick one",
            &[("keywords", "Keywords describing the shop")],
            "Structured shop information",
        ),
        "instore_product_search_recommend" => desc(
            "Search or recommend in-store packages from keywords describing them",
            "Keywords describing the desired package have been extracted from the user",
            "Returns a package list to let the user pick and order",
            &[("keywords", "Keywords describing the package")],
            "Structured package information",
        ),
        "create_instore_product_order" => desc(
            "Create an order for one in-store package",
            "Exactly one shop id and one of its package ids are confirmed",
            "Returns the order and asks the user whether to pay",
            &[
                ("user_id", "The user id"),
                ("shop_id", "The shop id"),
                ("product_id", "The package id"),
                ("quantity", "Quantity, default 1"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "pay_instore_order" => desc(
            "Pay an unpaid in-store order",
            "An order exists and the user confirmed payment",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "instore_cancel_order" => desc(
            "Cancel an in-store order. Never cancel an already-cancelled order.",
            "The order status is not cancelled",
            "Returns the cancellation result",
            &[("order_id", "The order id")],
            "Cancellation result",
        ),
        "instore_book" => desc(
            "Book a table at a shop that supports table booking",
            "The shop supports booking; time and party size are confirmed",
            "Returns the booking; paid bookings require payment when the shop charges",
            &[
                ("user_id", "The user id"),
                ("shop_id", "The shop id"),
                ("time", "Booking time, yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "Party size, default 1"),
            ],
            "The created booking on success, otherwise the failure reason",
        ),
        "pay_instore_book" => desc(
            "Pay an unpaid table booking",
            "A booking exists and the user confirmed payment",
            "Returns the payment result",
            &[("book_id", "The booking id")],
            "Payment result",
        ),
        "instore_cancel_book" => desc(
            "Cancel a table booking. Never cancel an already-cancelled booking.",
            "The booking status is not cancelled",
            "Returns the cancellation result",
            &[("book_id", "The booking id")],
            "Cancellation result",
        ),
        "instore_reservation" => desc(
            "Create a service appointment at a shop",
            "The shop id, time and party size are confirmed",
            "Returns the reservation",
            &[
                ("user_id", "The user id"),
                ("shop_id", "The shop id"),
                ("time", "Reservation time, yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "Party size, default 1"),
            ],
            "The created reservation on success, otherwise the failure reason",
        ),
        "instore_modify_reservation" => desc(
            "Modify an existing reservation's time and party size",
            "The reservation is neither consumed nor cancelled",
            "Returns the updated reservation",
            &[
                ("reservation_id", "The reservation id"),
                ("time", "New reservation time, yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "New party size"),
            ],
            "The updated reservation, or the failure reason",
        ),
        "instore_cancel_reservation" => desc(
            "Cancel a reservation. Never cancel an already-cancelled reservation.",
            "The reservation status is not cancelled",
            "Returns the cancellation result",
            &[("reservation_id", "The reservation id")],
            "Cancellation result",
        ),
        "get_instore_orders" => desc(
            "List all in-store orders of the user",
            "The user id is known",
            "Returns the user's in-store orders",
            &[("user_id", "The user id")],
            "Matching orders, one per line",
        ),
        "get_instore_reservations" => desc(
            "List all reservations of the user",
            "The user id is known",
            "Returns the user's reservations",
            &[("user_id", "The user id")],
            "Matching reservations, one per line",
        ),
        "get_instore_books" => desc(
            "List all table bookings of the user",
            "The user id is known",
            "Returns the user's bookings",
            &[("user_id", "The user id")],
            "Matching bookings, one per line",
        ),
        "search_instore_book" => desc(
            "Look up table bookings, optionally one booking by id",
            "The user id is known",
            "Returns the user's bookings or the one requested",
            &[("user_id", "The user id"), ("book_id", "Optional booking id")],
            "Booking details",
        ),
        "search_instore_reservation" => desc(
            "Look up reservations, optionally one reservation by id",
            "The user id is known",
            "Returns the user's reservations or the one requested",
            &[("user_id", "The user id"), ("reservation_id", "Optional reservation id")],
            "Reservation details",
        ),
        _ => return None,
    })
}

fn instore_zh(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "instore_shop_search_recommend" => desc(
            "在到店场景下，根据描述店铺的关键词，搜索或推荐多个店铺",
            "处于到店场景，获取描述店铺的关键词",
            "返回店铺列表，引导用户选择确定店铺",
            &[("keywords", "描述店铺的关键词")],
            "结构化输出的店铺信息",
        ),
        "instore_product_search_recommend" => desc(
            "在到店场景下，根据描述套餐的关键词，搜索或推荐多个套餐",
            "处于到店场景，获取描述套餐的关键词",
            "返回套餐列表，引导用户选择套餐并创建订单",
            &[("keywords", "描述套餐的关键词")],
            "结构化输出的套餐信息",
        ),
        "create_instore_product_order" => desc(
            "创建到店套餐订单",
            "确定唯一店铺id及其套餐id",
            "返回订单信息，询问用户是否支付",
            &[
                ("user_id", "用户id"),
                ("shop_id", "店铺id"),
                ("product_id", "套餐id"),
                ("quantity", "数量，默认1"),
            ],
            "创建成功返回订单信息，否则返回相关提示",
        ),
        "pay_instore_order" => desc(
            "支付未支付的到店订单",
            "订单已创建且用户确认支付",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "instore_cancel_order" => desc(
            "取消到店订单。禁止对已取消订单再次取消。",
            "订单状态为非cancelled",
            "返回取消结果信息",
            &[("order_id", "订单id")],
            "取消结果信息",
        ),
        "instore_book" => desc(
            "在支持订座的店铺预订餐桌",
            "店铺支持订座，时间和人数已确认",
            "返回订座信息，店铺收费时需要支付",
            &[
                ("user_id", "用户id"),
                ("shop_id", "店铺id"),
                ("time", "订座时间，格式yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "用餐人数，默认1"),
            ],
            "创建成功返回订座信息，否则返回相关提示",
        ),
        "pay_instore_book" => desc(
            "支付未支付的订座",
            "订座已创建且用户确认支付",
            "返回支付结果信息",
            &[("book_id", "订座id")],
            "支付结果信息",
        ),
        "instore_cancel_book" => desc(
            "取消订座。禁止对已取消订座再次取消。",
            "订座状态为非cancelled",
            "返回取消结果信息",
            &[("book_id", "订座id")],
            "取消结果信息",
        ),
        "instore_reservation" => desc(
            "在店铺创建服务预约",
            "店铺id、时间、人数已确认",
            "返回预约信息",
            &[
                ("user_id", "用户id"),
                ("shop_id", "店铺id"),
                ("time", "预约时间，格式yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "人数，默认1"),
            ],
            "创建成功返回预约信息，否则返回相关提示",
        ),
        "instore_modify_reservation" => desc(
            "修改现有预约的时间和人数",
            "预约状态非consumed且非cancelled",
            "返回修改后的预约信息",
            &[
                ("reservation_id", "预约id"),
                ("time", "新的预约时间，格式yyyy-mm-dd HH:MM:SS"),
                ("customer_count", "新的人数"),
            ],
            "修改后的预约信息，失败时返回原因",
        ),
        "instore_cancel_reservation" => desc(
            "取消预约。禁止对已取消预约再次取消。",
            "预约状态为非cancelled",
            "返回取消结果信息",
            &[("reservation_id", "预约id")],
            "取消结果信息",
        ),
        "get_instore_orders" => desc(
            "获取用户的全部到店订单",
            "已知用户id",
            "返回用户的到店订单",
            &[("user_id", "用户id")],
            "每行一个订单",
        ),
        "get_instore_reservations" => desc(
            "获取用户的全部预约",
            "已知用户id",
            "返回用户的预约",
            &[("user_id", "用户id")],
            "每行一个预约",
        ),
        "get_instore_books" => desc(
            "获取用户的全部订座",
            "已知用户id",
            "返回用户的订座",
            &[("user_id", "用户id")],
            "每行一个订座",
        ),
        "search_instore_book" => desc(
            "查询订座，可按订座id查询单条",
            "已知用户id",
            "返回用户的订座或指定订座",
            &[("user_id", "用户id"), ("book_id", "可选的订座id")],
            "订座详细信息",
        ),
        "search_instore_reservation" => desc(
            "查询预约，可按预约id查询单条",
            "已知用户id",
            "返回用户的预约或指定预约",
            &[("user_id", "用户id"), ("reservation_id", "可选的预约id")],
            "预约详细信息",
        ),
        _ => return None,
    })
}

// ── OTA ─────────────────────────────────────────────────────────────

fn ota_en(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "get_ota_hotel_info" => desc(
            "Get a hotel's details including its rooms by date",
            "A hotel id is known",
            "Returns the hotel's full details",
            &[("hotel_id", "The hotel id")],
            "Full hotel details",
        ),
        "get_ota_attraction_info" => desc(
            "Get an attraction's details including its tickets by date",
            "An attraction id is known",
            "Returns the attraction's full details",
            &[("attraction_id", "The attraction id")],
            "Full attraction details",
        ),
        "get_ota_flight_info" => desc(
            "Get a flight's details including its seat classes by date",
            "A flight id is known",
            "Returns the flight's full details",
            &[("flight_id", "The flight id")],
            "Full flight details",
        ),
        "get_ota_train_info" => desc(
            "Get a train's details including its seat classes by date",
            "A train id is known",
            "Returns the train's full details",
            &[("train_id", "The train id")],
            "Full train details",
        ),
        "hotel_search_recommend" => desc(
            "Search hotels in a city, optionally filtered by keywords",
            "The city is known; keywords refine the match",
            "Returns a hotel list to let the user pick one",
            &[("city_name", "The city to search in"), ("key_words", "Keywords describing the hotel")],
            "Structured hotel information",
        ),
        "attractions_search_recommend" => desc(
            "Search attractions in a city by keywords",
            "The city and keywords are known",
            "Returns an attraction list to let the user pick one",
            &[("city_name", "The city to search in"), ("key_words", "Keywords describing the attraction")],
            "Structured attraction information",
        ),
        "flight_search_recommend" => desc(
            "Search flights between two cities",
            "Departure and destination cities are known",
            "Returns matching flights",
            &[("departure", "Departure city"), ("destination", "Destination city")],
            "Matching flights, one per line",
        ),
        "train_ticket_search" => desc(
            "Search trains between two cities on a date",
            "Departure city, destination city and date are known",
            "Returns trains with seats on that date",
            &[
                ("departure", "Departure city"),
                ("destination", "Destination city"),
                ("date", "Travel date, yyyy-mm-dd"),
            ],
            "Matching trains, one per line",
        ),
        "create_hotel_order" => desc(
            "Book one hotel room night; inventory is decremented",
            "Hotel id and room id are confirmed and the room has inventory",
            "Returns the order and asks the user whether to pay",
            &[
                ("hotel_id", "The hotel id"),
                ("room_id", "The room product id"),
                ("user_id", "The user id"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "create_attraction_order" => desc(
            "Book attraction tickets for a date; inventory is decremented",
            "Attraction id, ticket id, date and quantity are confirmed",
            "Returns the order and asks the user whether to pay",
            &[
                ("attraction_id", "The attraction id"),
                ("ticket_id", "The ticket product id"),
                ("user_id", "The user id"),
                ("date", "Visit date, yyyy-mm-dd"),
                ("quantity", "Ticket count"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "create_flight_order" => desc(
            "Book flight seats for a date; inventory is decremented",
            "Flight id, seat id, date and quantity are confirmed",
            "Returns the order and asks the user whether to pay",
            &[
                ("flight_id", "The flight id"),
                ("seat_id", "The seat product id"),
                ("user_id", "The user id"),
                ("date", "Travel date, yyyy-mm-dd"),
                ("quantity", "Seat count"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "create_train_order" => desc(
            "Book train seats for a date; inventory is decremented",
            "Train id, seat id, date and quantity are confirmed",
            "Returns the order and asks the user whether to pay",
            &[
                ("train_id", "The train id"),
                ("seat_id", "The seat product id"),
                ("user_id", "The user id"),
                ("date", "Travel date, yyyy-mm-dd"),
                ("quantity", "Seat count"),
            ],
            "The created order on success, otherwise the failure reason",
        ),
        "pay_hotel_order" => desc(
            "Pay an unpaid hotel order",
            "The order is a hotel order in unpaid status",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "pay_attraction_order" => desc(
            "Pay an unpaid attraction order",
            "The order is an attraction order in unpaid status",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "pay_flight_order" => desc(
            "Pay an unpaid flight order",
            "The order is a flight order in unpaid status",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "pay_train_order" => desc(
            "Pay an unpaid train order",
            "The order is a train order in unpaid status",
            "Returns the payment result",
            &[("order_id", "The order id")],
            "Payment result",
        ),
        "search_hotel_order" => desc(
            "List the user's hotel orders, optionally filtered by date and status",
            "The user id is known",
            "Returns matching hotel orders",
            &[
                ("user_id", "The user id"),
                ("date", "Optional stay date filter, yyyy-mm-dd"),
                ("status", "Order status filter, default paid"),
            ],
            "Matching orders, one per line",
        ),
        "search_attraction_order" => desc(
            "List the user's attraction orders, optionally filtered by date and status",
            "The user id is known",
            "Returns matching attraction orders",
            &[
                ("user_id", "The user id"),
                ("date", "Optional visit date filter, yyyy-mm-dd"),
                ("status", "Order status filter, default paid"),
            ],
            "Matching orders, one per line",
        ),
        "search_flight_order" => desc(
            "List the user's flight orders, optionally filtered by date and status",
            "The user id is known",
            "Returns matching flight orders",
            &[
                ("user_id", "The user id"),
                ("date", "Optional travel date filter, yyyy-mm-dd"),
                ("status", "Order status filter, default paid"),
            ],
            "Matching orders, one per line",
        ),
        "search_train_order" => desc(
            "List the user's train orders, optionally filtered by date and status",
            "The user id is known",
            "Returns matching train orders",
            &[
                ("user_id", "The user id"),
                ("date", "Optional travel date filter, yyyy-mm-dd"),
                ("status", "Order status filter, default paid"),
            ],
            "Matching orders, one per line",
        ),
        "get_hotel_order_detail" => desc(
            "Get a hotel order's full details",
            "An order id is known",
            "Returns the order details",
            &[("order_id", "The order id")],
            "Full order details",
        ),
        "get_attraction_order_detail" => desc(
            "Get an attraction order's full details",
            "An order id is known",
            "Returns the order details",
            &[("order_id", "The order id")],
            "Full order details",
        ),
        "get_flight_order_detail" => desc(
            "Get a flight order's full details",
            "An order id is known",
            "Returns the order details",
            &[("order_id", "The order id")],
            "Full order details",
        ),
        "get_train_order_detail" => desc(
            "Get a train order's full details",
            "An order id is known",
            "Returns the order details",
            &[("order_id", "The order id")],
            "Full order details",
        ),
        "modify_train_order" => desc(
            "Move a paid single-ticket train order to a new date in the same seat class",
            "The order is paid, holds one line item, and the new date has the same seat class available",
            "Returns the result; a price increase resets the order to unpaid",
            &[
                ("order_id", "The order id"),
                ("user_id", "The user id"),
                ("new_date", "New travel date, yyyy-mm-dd"),
            ],
            "Modification result including any price difference",
        ),
        "modify_flight_order" => desc(
            "Move a paid single-ticket flight order to a new date in the same seat class",
            "The order is paid, holds one line item, and the new date has the same seat class available",
            "Returns the result; a price increase resets the order to unpaid",
            &[
                ("order_id", "The order id"),
                ("user_id", "The user id"),
                ("new_date", "New travel date, yyyy-mm-dd"),
            ],
            "Modification result including any price difference",
        ),
        "cancel_hotel_order" => desc(
            "Cancel a hotel order; paid orders are refunded. Never cancel an already-cancelled order.",
            "The order belongs to the user and is not cancelled",
            "Returns the cancellation result and refund amount",
            &[("order_id", "The order id"), ("user_id", "The user id")],
            "Cancellation result with refund amount",
        ),
        "cancel_attraction_order" => desc(
            "Cancel an attraction order; paid orders are refunded. Never cancel an already-cancelled order.",
            "The order belongs to the user and is not cancelled",
            "Returns the cancellation result and refund amount",
            &[("order_id", "The order id"), ("user_id", "The user id")],
            "Cancellation result with refund amount",
        ),
        "cancel_flight_order" => desc(
            "Cancel a flight order; paid orders are refunded. Never cancel an already-cancelled order.",
            "The order belongs to the user and is not cancelled",
            "Returns the cancellation result and refund amount",
            &[("order_id", "The order id"), ("user_id", "The user id")],
            "Cancellation result with refund amount",
        ),
        "cancel_train_order" => desc(
            "Cancel a train order; paid orders are refunded. Never cancel an already-cancelled order.",
            "The order belongs to the user and is not cancelled",
            "Returns the cancellation result and refund amount",
            &[("order_id", "The order id"), ("user_id", "The user id")],
            "Cancellation result with refund amount",
        ),
        _ => return None,
    })
}

fn ota_zh(tool: &str) -> Option<ToolDescription> {
    Some(match tool {
        "get_ota_hotel_info" => desc(
            "获取酒店详细信息，包括各日期的房型",
            "已知酒店id",
            "返回酒店详细信息",
            &[("hotel_id", "酒店id")],
            "酒店的详细信息",
        ),
        "get_ota_attraction_info" => desc(
            "获取景点详细信息，包括各日期的门票",
            "已知景点id",
            "返回景点详细信息",
            &[("attraction_id", "景点id")],
            "景点的详细信息",
        ),
        "get_ota_flight_info" => desc(
            "获取航班详细信息，包括各日期的舱位",
            "已知航班id",
            "返回航班详细信息",
            &[("flight_id", "航班id")],
            "航班的详细信息",
        ),
        "get_ota_train_info" => desc(
            "获取列车详细信息，包括各日期的座席",
            "已知列车id",
            "返回列车详细信息",
            &[("train_id", "列车id")],
            "列车的详细信息",
        ),
        "hotel_search_recommend" => desc(
            "在城市内搜索酒店，可按关键词筛选",
            "已知城市，关键词用于进一步匹配",
            "返回酒店列表，引导用户选择",
            &[("city_name", "搜索城市"), ("key_words", "描述酒店的关键词")],
            "结构化输出的酒店信息",
        ),
        "attractions_search_recommend" => desc(
            "按关键词在城市内搜索景点",
            "已知城市和关键词",
            "返回景点列表，引导用户选择",
            &[("city_name", "搜索城市"), ("key_words", "描述景点的关键词")],
            "结构化输出的景点信息",
        ),
        "flight_search_recommend" => desc(
            "搜索两城市间的航班",
            "已知出发城市和到达城市",
            "返回匹配的航班",
            &[("departure", "出发城市"), ("destination", "到达城市")],
            "每行一个航班",
        ),
        "train_ticket_search" => desc(
            "搜索某日期两城市间的列车",
            "已知出发城市、到达城市和日期",
            "返回该日期有座席的列车",
            &[
                ("departure", "出发城市"),
                ("destination", "到达城市"),
                ("date", "出行日期，格式yyyy-mm-dd"),
            ],
            "每行一个列车",
        ),
        "create_hotel_order" => desc(
            "预订酒店房间，扣减库存",
            "已确认酒店id和房型id且有库存",
            "返回订单信息，询问用户是否支付",
            &[("hotel_id", "酒店id"), ("room_id", "房型id"), ("user_id", "用户id")],
            "创建成功返回订单信息，否则返回相关提示",
        ),
        "create_attraction_order" => desc(
            "预订某日期的景点门票，扣减库存",
            "已确认景点id、门票id、日期和数量",
            "返回订单信息，询问用户是否支付",
            &[
                ("attraction_id", "景点id"),
                ("ticket_id", "门票id"),
                ("user_id", "用户id"),
                ("date", "游玩日期，格式yyyy-mm-dd"),
                ("quantity", "门票数量"),
            ],
            "创建成功返回订单信息，否则返回相关提示",
        ),
        "create_flight_order" => desc(
            "预订某日期的航班座位，扣减库存",
            "已确认航班id、舱位id、日期和数量",
            "返回订单信息，询问用户是否支付",
            &[
                ("flight_id", "航班id"),
                ("seat_id", "舱位id"),
                ("user_id", "用户id"),
                ("date", "出行日期，格式yyyy-mm-dd"),
                ("quantity", "座位数量"),
            ],
            "创建成功返回订单信息，否则返回相关提示",
        ),
        "create_train_order" => desc(
            "预订某日期的列车座席，扣减库存",
            "已确认列车id、座席id、日期和数量",
            "返回订单信息，询问用户是否支付",
            &[
                ("train_id", "列车id"),
                ("seat_id", "座席id"),
                ("user_id", "用户id"),
                ("date", "出行日期，格式yyyy-mm-dd"),
                ("quantity", "座位数量"),
            ],
            "创建成功返回订单信息，否则返回相关提示",
        ),
        "pay_hotel_order" => desc(
            "支付未支付的酒店订单",
            "订单为酒店订单且状态为unpaid",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "pay_attraction_order" => desc(
            "支付未支付的景点订单",
            "订单为景点订单且状态为unpaid",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "pay_flight_order" => desc(
            "支付未支付的机票订单",
            "订单为机票订单且状态为unpaid",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "pay_train_order" => desc(
            "支付未支付的火车票订单",
            "订单为火车票订单且状态为unpaid",
            "返回支付结果信息",
            &[("order_id", "订单id")],
            "支付结果信息",
        ),
        "search_hotel_order" => desc(
            "查询用户的酒店订单，可按日期和状态筛选",
            "已知用户id",
            "返回符合条件的酒店订单",
            &[
                ("user_id", "用户id"),
                ("date", "可选的入住日期筛选，格式yyyy-mm-dd"),
                ("status", "订单状态筛选，默认paid"),
            ],
            "每行一个订单",
        ),
        "search_attraction_order" => desc(
            "查询用户的景点订单，可按日期和状态筛选",
            "已知用户id",
            "返回符合条件的景点订单",
            &[
                ("user_id", "用户id"),
                ("date", "可选的游玩日期筛选，格式yyyy-mm-dd"),
                ("status", "订单状态筛选，默认paid"),
            ],
            "每行一个订单",
        ),
        "search_flight_order" => desc(
            "查询用户的机票订单，可按日期和状态筛选",
            "已知用户id",
            "返回符合条件的机票订单",
            &[
                ("user_id", "用户id"),
                ("date", "可选的出行日期筛选，格式yyyy-mm-dd"),
                ("status", "订单状态筛选，默认paid"),
            ],
            "每行一个订单",
        ),
        "search_train_order" => desc(
            "查询用户的火车票订单，可按日期和状态筛选",
            "已知用户id",
            "返回符合条件的火车票订单",
            &[
                ("user_id", "用户id"),
                ("date", "可选的出行日期筛选，格式yyyy-mm-dd"),
                ("status", "订单状态筛选，默认paid"),
            ],
            "每行一个订单",
        ),
        "get_hotel_order_detail" => desc(
            "获取酒店订单详细信息",
            "已知订单id",
            "返回订单详细信息",
            &[("order_id", "订单id")],
            "订单的详细信息",
        ),
        "get_attraction_order_detail" => desc(
            "获取景点订单详细信息",
            "已知订单id",
            "返回订单详细信息",
            &[("order_id", "订单id")],
            "订单的详细信息",
        ),
        "get_flight_order_detail" => desc(
            "获取机票订单详细信息",
            "已知订单id",
            "返回订单详细信息",
            &[("order_id", "订单id")],
            "订单的详细信息",
        ),
        "get_train_order_detail" => desc(
            "获取火车票订单详细信息",
            "已知订单id",
            "返回订单详细信息",
            &[("order_id", "订单id")],
            "订单的详细信息",
        ),
        "modify_train_order" => desc(
            "将已支付的单张火车票订单改签到新日期（同座席类型）",
            "订单已支付且仅含一张票，新日期有同类型座席",
            "返回改签结果；价格上涨时订单重置为unpaid",
            &[
                ("order_id", "订单id"),
                ("user_id", "用户id"),
                ("new_date", "新的出行日期，格式yyyy-mm-dd"),
            ],
            "改签结果，包含差价信息",
        ),
        "modify_flight_order" => desc(
            "将已支付的单张机票订单改签到新日期（同舱位类型）",
            "订单已支付且仅含一张票，新日期有同类型舱位",
            "返回改签结果；价格上涨时订单重置为unpaid",
            &[
                ("order_id", "订单id"),
                ("user_id", "用户id"),
                ("new_date", "新的出行日期，格式yyyy-mm-dd"),
            ],
            "改签结果，包含差价信息",
        ),
        "cancel_hotel_order" => desc(
            "取消酒店订单，已支付订单退款。禁止对已取消订单再次取消。",
            "订单属于该用户且状态为非cancelled",
            "返回取消结果及退款金额",
            &[("order_id", "订单id"), ("user_id", "用户id")],
            "取消结果及退款金额",
        ),
        "cancel_attraction_order" => desc(
            "取消景点订单，已支付订单退款。禁止对已取消订单再次取消。",
            "订单属于该用户且状态为非cancelled",
            "返回取消结果及退款金额",
            &[("order_id", "订单id"), ("user_id", "用户id")],
            "取消结果及退款金额",
        ),
        "cancel_flight_order" => desc(
            "取消机票订单，已支付订单退款。禁止对已取消订单再次取消。",
            "订单属于该用户且状态为非cancelled",
            "返回取消结果及退款金额",
            &[("order_id", "订单id"), ("user_id", "用户id")],
            "取消结果及退款金额",
        ),
        "cancel_train_order" => desc(
            "取消火车票订单，已支付订单退款。禁止对已取消订单再次取消。",
            "订单属于该用户且状态为非cancelled",
            "返回取消结果及退款金额",
            &[("order_id", "订单id"), ("user_id", "用户id")],
            "取消结果及退款金额",
        ),
        _ => return None,
    })
}
