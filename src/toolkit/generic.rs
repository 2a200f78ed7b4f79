//! Base tools shared by every domain toolkit: geodesy, weather, geocoding,
//! holiday lookups and order/history dumps over the core DB.

use crate::config::Language;
use crate::db::Db;
use crate::fuzzy::{self, rerank};
use crate::require;
use crate::toolkit::{ParamSpec, ToolError, ToolResult, ToolSpec, ToolType};
use crate::utils::{check_date_format, str_to_date};

/// Specs for the tools below, prepended to every domain's own list.
pub const GENERIC_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "longitude_latitude_to_distance",
        tool_type: ToolType::Generic,
        params: &[
            ParamSpec::required("longitude1", "number"),
            ParamSpec::required("latitude1", "number"),
            ParamSpec::required("longitude2", "number"),
            ParamSpec::required("latitude2", "number"),
        ],
    },
    ToolSpec {
        name: "weather",
        tool_type: ToolType::Generic,
        params: &[
            ParamSpec::required("address", "string"),
            ParamSpec::required("date_start", "string"),
            ParamSpec::required("date_end", "string"),
        ],
    },
    ToolSpec {
        name: "address_to_longitude_latitude",
        tool_type: ToolType::Generic,
        params: &[ParamSpec::required("address", "string")],
    },
    ToolSpec {
        name: "get_date_holiday_info",
        tool_type: ToolType::Generic,
        params: &[ParamSpec::required("date", "string")],
    },
    ToolSpec {
        name: "get_holiday_date",
        tool_type: ToolType::Generic,
        params: &[
            ParamSpec::required("year", "string"),
            ParamSpec::required("holiday_name", "string"),
        ],
    },
    ToolSpec {
        name: "get_user_historical_behaviors",
        tool_type: ToolType::Read,
        params: &[],
    },
    ToolSpec {
        name: "get_user_all_orders",
        tool_type: ToolType::Read,
        params: &[],
    },
    ToolSpec {
        name: "get_nearby",
        tool_type: ToolType::Read,
        params: &[
            ParamSpec::required("longitude", "number"),
            ParamSpec::required("latitude", "number"),
            ParamSpec::required("range", "number"),
        ],
    },
];

/// Haversine distance in metres, rounded to whole metres.
pub fn longitude_latitude_to_distance(
    longitude1: f64,
    latitude1: f64,
    longitude2: f64,
    latitude2: f64,
) -> f64 {
    if longitude1 == longitude2 && latitude1 == latitude2 {
        return 0.0;
    }
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lon1, lat1) = (longitude1.to_radians(), latitude1.to_radians());
    let (lon2, lat2) = (longitude2.to_radians(), latitude2.to_radians());
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    (EARTH_RADIUS_M * c).round()
}

/// Weather records for a fuzzy-matched city between two dates, inclusive.
pub fn weather(db: &Db, address: &str, date_start: &str, date_end: &str) -> ToolResult {
    require!(
        check_date_format(date_start),
        "Invalid date_start format. Expected yyyy-mm-dd, got: {date_start}"
    );
    require!(
        check_date_format(date_end),
        "Invalid date_end format. Expected yyyy-mm-dd, got: {date_end}"
    );
    require!(!address.trim().is_empty(), "Address cannot be empty");

    let records = db.weather.as_deref().unwrap_or(&[]);
    let candidates: Vec<(String, String)> = records
        .iter()
        .map(|w| (w.city.clone(), w.city.clone()))
        .collect();
    let ranked = rerank(address, &candidates);
    let best = ranked
        .first()
        .filter(|doc| doc.score >= 50)
        .ok_or_else(|| ToolError::Failed(format!("Weather information not found for {address}")))?;

    let start = str_to_date(date_start);
    let end = str_to_date(date_end);
    let mut matched: Vec<&crate::db::Weather> = records
        .iter()
        .filter(|w| w.city == best.key)
        .filter(|w| {
            let Some(date) = str_to_date(&w.datetime) else {
                return false;
            };
            start.is_some_and(|s| date >= s) && end.is_some_and(|e| date <= e)
        })
        .collect();

    if matched.is_empty() {
        return Ok(format!(
            "No weather information found for {} between {date_start} and {date_end}",
            best.key
        ));
    }
    matched.sort_by(|a, b| a.datetime.cmp(&b.datetime));
    Ok(matched
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Geocode an address against the DB's location table with fuzzy matching.
pub fn address_to_longitude_latitude(db: &Db, address: &str) -> Result<(f64, f64), ToolError> {
    require!(!address.trim().is_empty(), "Address cannot be empty");

    let locations = db.location.as_deref().unwrap_or(&[]);
    let candidates: Vec<(String, String)> = locations
        .iter()
        .map(|l| (l.address.clone(), l.address.clone()))
        .collect();
    let ranked = rerank(address, &candidates);
    let best = ranked
        .first()
        .filter(|doc| doc.score >= 30 && fuzzy::fuzzy_ratio_match(address, &doc.key))
        .ok_or_else(|| {
            ToolError::Failed(format!("Longitude and latitude not found for address {address}"))
        })?;
    let location = locations
        .iter()
        .find(|l| l.address == best.key)
        .ok_or_else(|| {
            ToolError::Failed(format!("Longitude and latitude not found for address {address}"))
        })?;
    Ok((location.longitude, location.latitude))
}

// Chinese-holiday calendar, by (language, year). Names on the left,
// dates on the right.
fn holiday_table(language: Language, year: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match (language, year) {
        (Language::English, "2025") => Some(&[
            ("New Year's Day", "2025-01-01"),
            ("Laba Festival", "2025-01-07"),
            ("Lantern Festival", "2025-02-15"),
            ("Dragon Head Festival", "2025-03-01"),
            ("Women's Day", "2025-03-08"),
            ("Qingming Festival", "2025-04-04"),
            ("Labor Day", "2025-05-01"),
            ("Mother's Day", "2025-05-11"),
            ("Dragon Boat Festival", "2025-05-31"),
            ("Party Founding Day", "2025-07-01"),
            ("Start of Autumn", "2025-08-07"),
            ("Qixi Festival", "2025-08-29"),
            ("National Day", "2025-10-01"),
            ("Mid-Autumn Festival", "2025-10-06"),
            ("Double Ninth Festival", "2025-10-29"),
            ("Winter Solstice", "2025-12-21"),
            ("Christmas Day", "2025-12-25"),
        ]),
        (Language::English, "2024") => Some(&[
            ("Valentine's Day", "2024-02-14"),
            ("Lantern Festival", "2024-02-24"),
            ("Qingming Festival", "2024-04-04"),
            ("Dragon Boat Festival", "2024-06-10"),
            ("Qixi Festival", "2024-08-10"),
            ("Mid-Autumn Festival", "2024-09-17"),
            ("Double Ninth Festival", "2024-10-11"),
        ]),
        (Language::English, "2023") => Some(&[
            ("Qingming Festival", "2023-04-05"),
            ("Father's Day", "2023-06-18"),
            ("Dragon Boat Festival", "2023-06-22"),
            ("Mid-Autumn Festival", "2023-09-29"),
            ("National Day", "2023-10-01"),
            ("Double Ninth Festival", "2023-10-23"),
        ]),
        (Language::Chinese, "2025") => Some(&[
            ("元旦节", "2025-01-01"),
            ("腊八节", "2025-01-07"),
            ("元宵节", "2025-02-15"),
            ("龙头节", "2025-03-01"),
            ("妇女节", "2025-03-08"),
            ("清明节", "2025-04-04"),
            ("劳动节", "2025-05-01"),
            ("母亲节", "2025-05-11"),
            ("端午节", "2025-05-31"),
            ("建党节", "2025-07-01"),
            ("立秋", "2025-08-07"),
            ("七夕节", "2025-08-29"),
            ("国庆节", "2025-10-01"),
            ("中秋节", "2025-10-06"),
            ("重阳节", "2025-10-29"),
            ("冬至", "2025-12-21"),
            ("圣诞节", "2025-12-25"),
        ]),
        (Language::Chinese, "2024") => Some(&[
            ("情人节", "2024-02-14"),
            ("元宵节", "2024-02-24"),
            ("清明节", "2024-04-04"),
            ("端午节", "2024-06-10"),
            ("七夕节", "2024-08-10"),
            ("中秋节", "2024-09-17"),
            ("重阳节", "2024-10-11"),
        ]),
        (Language::Chinese, "2023") => Some(&[
            ("清明节", "2023-04-05"),
            ("父亲节", "2023-06-18"),
            ("端午节", "2023-06-22"),
            ("中秋节", "2023-09-29"),
            ("国庆节", "2023-10-01"),
            ("重阳节", "2023-10-23"),
        ]),
        _ => None,
    }
}

/// Name of the holiday falling on a date, if any.
pub fn get_date_holiday_info(date: &str, language: Language) -> ToolResult {
    require!(
        check_date_format(date),
        "Date format error, should be yyyy-mm-dd, actual: {date}"
    );
    let year = &date[..4];
    let found = holiday_table(language, year)
        .and_then(|table| table.iter().find(|(_, d)| *d == date))
        .map(|(name, _)| (*name).to_string());
    Ok(found.unwrap_or_else(|| format!("Date {date} is not a holiday")))
}

/// Date of a fuzzy-named holiday in a given year.
pub fn get_holiday_date(year: &str, holiday_name: &str, language: Language) -> ToolResult {
    require!(!holiday_name.trim().is_empty(), "Holiday name cannot be empty");
    let Some(table) = holiday_table(language, year) else {
        return Ok(format!("Holiday data for year {year} not found"));
    };

    let candidates: Vec<(String, String)> = table
        .iter()
        .map(|(name, _)| ((*name).to_string(), (*name).to_string()))
        .collect();
    let ranked = rerank(holiday_name, &candidates);
    if let Some(best) = ranked.first().filter(|doc| doc.score >= 80) {
        if let Some((_, date)) = table.iter().find(|(name, _)| *name == best.key) {
            return Ok((*date).to_string());
        }
    }
    Ok(format!("Holiday named '{holiday_name}' not found in year {year}"))
}

pub fn get_user_historical_behaviors(db: &Db) -> ToolResult {
    match &db.user_historical_behaviors {
        Some(behaviors) if !behaviors.is_empty() => {
            Ok(serde_json::to_string(behaviors).unwrap_or_default())
        }
        _ => Ok("{}".to_string()),
    }
}

pub fn get_user_all_orders(db: &Db) -> ToolResult {
    if db.orders.is_empty() {
        return Ok("User currently has no order information".to_string());
    }
    Ok(db
        .orders
        .values()
        .map(|order| order.detail())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Route the non-domain-specific tools. `get_nearby` is excluded: each
/// domain iterates its own catalog for it.
pub fn dispatch_generic(
    db: &Db,
    language: Language,
    name: &str,
    arguments: &crate::message::JsonMap,
) -> Option<ToolResult> {
    use crate::toolkit::args;

    Some(match name {
        "longitude_latitude_to_distance" => (|| {
            let lon1 = args::req_f64(arguments, "longitude1")?;
            let lat1 = args::req_f64(arguments, "latitude1")?;
            let lon2 = args::req_f64(arguments, "longitude2")?;
            let lat2 = args::req_f64(arguments, "latitude2")?;
            Ok(longitude_latitude_to_distance(lon1, lat1, lon2, lat2).to_string())
        })(),
        "weather" => (|| {
            let address = args::req_str(arguments, "address")?;
            let date_start = args::req_str(arguments, "date_start")?;
            let date_end = args::req_str(arguments, "date_end")?;
            weather(db, &address, &date_start, &date_end)
        })(),
        "address_to_longitude_latitude" => (|| {
            let address = args::req_str(arguments, "address")?;
            let (lon, lat) = address_to_longitude_latitude(db, &address)?;
            Ok(format!("[{lon}, {lat}]"))
        })(),
        "get_date_holiday_info" => (|| {
            let date = args::req_str(arguments, "date")?;
            get_date_holiday_info(&date, language)
        })(),
        "get_holiday_date" => (|| {
            let year = args::req_str(arguments, "year")?;
            let holiday_name = args::req_str(arguments, "holiday_name")?;
            get_holiday_date(&year, &holiday_name, language)
        })(),
        "get_user_historical_behaviors" => get_user_historical_behaviors(db),
        "get_user_all_orders" => get_user_all_orders(db),
        _ => return None,
    })
}

/// True when the point is within `range` metres of the target.
pub fn within_range(
    longitude: f64,
    latitude: f64,
    target: &crate::db::Location,
    range: f64,
) -> bool {
    longitude_latitude_to_distance(longitude, latitude, target.longitude, target.latitude) <= range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Location, Weather};

    fn db_with_weather() -> Db {
        Db {
            weather: Some(vec![
                Weather {
                    city: "Hangzhou".into(),
                    category: "Sunny".into(),
                    datetime: "2025-08-02".into(),
                    temperature: (26.0, 35.0),
                    humidity: 60.0,
                },
                Weather {
                    city: "Hangzhou".into(),
                    category: "Rainy".into(),
                    datetime: "2025-08-01".into(),
                    temperature: (24.0, 30.0),
                    humidity: 85.0,
                },
                Weather {
                    city: "Shanghai".into(),
                    category: "Cloudy".into(),
                    datetime: "2025-08-01".into(),
                    temperature: (25.0, 33.0),
                    humidity: 70.0,
                },
            ]),
            location: Some(vec![Location {
                address: "No.1 West Lake Avenue, Hangzhou".into(),
                longitude: 120.15,
                latitude: 30.25,
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(longitude_latitude_to_distance(120.0, 30.0, 120.0, 30.0), 0.0);
    }

    #[test]
    fn haversine_is_rounded_metres() {
        let d = longitude_latitude_to_distance(120.15, 30.25, 120.16, 30.25);
        assert!(d > 900.0 && d < 1100.0, "unexpected distance {d}");
        assert_eq!(d.fract(), 0.0);
    }

    #[test]
    fn weather_filters_by_city_and_range_sorted() {
        let db = db_with_weather();
        let report = weather(&db, "Hangzhou", "2025-08-01", "2025-08-02").unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("2025-08-01"));
        assert!(lines[1].contains("2025-08-02"));
    }

    #[test]
    fn weather_unknown_city_fails() {
        let db = db_with_weather();
        let err = weather(&db, "????????", "2025-08-01", "2025-08-02").unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[test]
    fn geocode_fuzzy_match() {
        let db = db_with_weather();
        let (lon, lat) =
            address_to_longitude_latitude(&db, "West Lake Avenue Hangzhou").unwrap();
        assert_eq!((lon, lat), (120.15, 30.25));
    }

    #[test]
    fn holiday_round_trip() {
        let date = get_holiday_date("2025", "Mid-Autumn", Language::English).unwrap();
        assert_eq!(date, "2025-10-06");
        let name = get_date_holiday_info("2025-10-06", Language::English).unwrap();
        assert_eq!(name, "Mid-Autumn Festival");
        assert_eq!(
            get_date_holiday_info("2025-10-07", Language::English).unwrap(),
            "Date 2025-10-07 is not a holiday"
        );
    }
}
