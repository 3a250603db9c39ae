use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::error::ValidationErrors;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const DEFAULT_TIMEZONE: Tz = Tz::UTC;

#[derive(Debug, Clone, PartialEq)]
pub struct TravelerDetails {
    pub adults: u32,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightSearchRequest {
    pub from_location: String,
    pub to_location: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub user_timezone: Tz,
    pub travelers: TravelerDetails,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuestDetails {
    pub adults: u32,
    pub children: Vec<u32>,
    pub rooms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotelSearchRequest {
    pub destination: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type: Option<String>,
    pub guests: GuestDetails,
    pub user: Option<String>,
}

/// Car search as submitted. Dates and times stay textual here; whether they
/// combine into instants is decided by [`CarSearchRequest::pick_up_at`] and
/// [`CarSearchRequest::drop_off_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct CarSearchRequest {
    pub pick_up_location: String,
    pub pick_up_date: String,
    pub pick_up_time: String,
    pub drop_off_location: String,
    pub drop_off_date: String,
    pub drop_off_time: String,
    pub user: Option<String>,
}

impl CarSearchRequest {
    pub fn pick_up_at(&self) -> Option<NaiveDateTime> {
        combine(&self.pick_up_date, &self.pick_up_time)
    }

    pub fn drop_off_at(&self) -> Option<NaiveDateTime> {
        combine(&self.drop_off_date, &self.drop_off_time)
    }
}

fn combine(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT).ok()?;
    Some(date.and_time(time))
}

pub fn validate_flight(body: &Value) -> Result<FlightSearchRequest, ValidationErrors> {
    let mut errs = ValidationErrors::default();
    let Some(obj) = as_object(body, "body", &mut errs) else {
        return Err(errs);
    };

    let from_location = required_str(obj, "fromLocation", "fromLocation", &mut errs);
    let to_location = required_str(obj, "toLocation", "toLocation", &mut errs);
    let departure_date = required_date(obj, "departureDate", "departureDate", &mut errs);
    let return_date = optional_date(obj, "returnDate", "returnDate", &mut errs);
    let user_timezone = match optional_str(obj, "userTimezone", "userTimezone", &mut errs) {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                errs.push("userTimezone", format!("unknown timezone '{name}'"));
                None
            }
        },
        None => Some(DEFAULT_TIMEZONE),
    };

    let travelers = match nested_object(obj, "traverlerDetails", &mut errs) {
        Some(details) => {
            let adults = count(details, "adults", "traverlerDetails.adults", 1, &mut errs);
            let children = children(details, "traverlerDetails.children", &mut errs);
            Some((adults, children))
        }
        None => None,
    };

    match (
        from_location,
        to_location,
        departure_date,
        user_timezone,
        travelers,
    ) {
        (Some(from), Some(to), Some(departure), Some(tz), Some((Some(adults), Some(children))))
            if errs.is_empty() =>
        {
            Ok(FlightSearchRequest {
                from_location: from,
                to_location: to,
                departure_date: departure,
                return_date,
                user_timezone: tz,
                travelers: TravelerDetails { adults, children },
                user: user_id(obj),
            })
        }
        _ => Err(errs),
    }
}

pub fn validate_hotel(body: &Value) -> Result<HotelSearchRequest, ValidationErrors> {
    let mut errs = ValidationErrors::default();
    let Some(obj) = as_object(body, "body", &mut errs) else {
        return Err(errs);
    };

    let destination = required_str(obj, "destination", "destination", &mut errs);
    let check_in = required_date(obj, "checkIn", "checkIn", &mut errs);
    let check_out = required_date(obj, "checkout", "checkout", &mut errs);
    let room_type =
        optional_str(obj, "roomType", "roomType", &mut errs).filter(|r| !r.is_empty());

    let guests = match nested_object(obj, "guestDetails", &mut errs) {
        Some(details) => {
            let adults = count(details, "adults", "guestDetails.adults", 1, &mut errs);
            let children = children(details, "guestDetails.children", &mut errs);
            let rooms = count(details, "rooms", "guestDetails.rooms", 1, &mut errs);
            Some((adults, children, rooms))
        }
        None => None,
    };

    match (destination, check_in, check_out, guests) {
        (Some(destination), Some(check_in), Some(check_out), Some((Some(adults), Some(children), Some(rooms))))
            if errs.is_empty() =>
        {
            Ok(HotelSearchRequest {
                destination,
                check_in,
                check_out,
                room_type,
                guests: GuestDetails {
                    adults,
                    children,
                    rooms,
                },
                user: user_id(obj),
            })
        }
        _ => Err(errs),
    }
}

pub fn validate_car(body: &Value) -> Result<CarSearchRequest, ValidationErrors> {
    let mut errs = ValidationErrors::default();
    let Some(obj) = as_object(body, "body", &mut errs) else {
        return Err(errs);
    };

    let pick_up_location = required_str(obj, "pickUpLocation", "pickUpLocation", &mut errs);
    let pick_up_date = required_str(obj, "pickUpDate", "pickUpDate", &mut errs);
    let pick_up_time = required_str(obj, "pickUpTime", "pickUpTime", &mut errs);
    let drop_off_location = required_str(obj, "dropOffLocation", "dropOffLocation", &mut errs);
    let drop_off_date = required_str(obj, "dropOffDate", "dropOffDate", &mut errs);
    let drop_off_time = required_str(obj, "dropOffTime", "dropOffTime", &mut errs);
    // accepted for compatibility; the log derives it from the locations
    if !matches!(
        obj.get("returnToSameLocation"),
        None | Some(Value::Null) | Some(Value::Bool(_))
    ) {
        errs.push("returnToSameLocation", "must be a boolean");
    }

    match (
        pick_up_location,
        pick_up_date,
        pick_up_time,
        drop_off_location,
        drop_off_date,
        drop_off_time,
    ) {
        (
            Some(pick_up_location),
            Some(pick_up_date),
            Some(pick_up_time),
            Some(drop_off_location),
            Some(drop_off_date),
            Some(drop_off_time),
        ) if errs.is_empty() => Ok(CarSearchRequest {
            pick_up_location,
            pick_up_date,
            pick_up_time,
            drop_off_location,
            drop_off_date,
            drop_off_time,
            user: user_id(obj),
        }),
        _ => Err(errs),
    }
}

// =============================================================================
// Field helpers
// =============================================================================

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            errs.push(path, "must be an object");
            None
        }
    }
}

fn nested_object<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    errs: &mut ValidationErrors,
) -> Option<&'a Map<String, Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => {
            errs.push(key, "is required");
            None
        }
        Some(value) => as_object(value, key, errs),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errs.push(path, "must be a string");
            None
        }
    }
}

fn required_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<String> {
    if matches!(obj.get(key), None | Some(Value::Null)) {
        errs.push(path, "is required");
        return None;
    }
    let value = optional_str(obj, key, path, errs)?;
    if value.is_empty() {
        errs.push(path, "must not be empty");
        return None;
    }
    Some(value)
}

fn parse_date(raw: &str, path: &str, errs: &mut ValidationErrors) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errs.push(path, "must be a valid date (YYYY-MM-DD)");
            None
        }
    }
}

fn required_date(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<NaiveDate> {
    let raw = required_str(obj, key, path, errs)?;
    parse_date(&raw, path, errs)
}

fn optional_date(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<NaiveDate> {
    let raw = optional_str(obj, key, path, errs).filter(|s| !s.is_empty())?;
    parse_date(&raw, path, errs)
}

/// Whole number at `key`, at least `min`.
fn count(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    min: u32,
    errs: &mut ValidationErrors,
) -> Option<u32> {
    let value = match obj.get(key) {
        None | Some(Value::Null) => {
            errs.push(path, "is required");
            return None;
        }
        Some(value) => value,
    };
    match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
        Some(n) if n >= min => Some(n),
        Some(_) => {
            errs.push(path, format!("must be at least {min}"));
            None
        }
        None => {
            errs.push(path, "must be a whole number");
            None
        }
    }
}

/// `[{ age }]`, missing means no children.
fn children(
    obj: &Map<String, Value>,
    path: &str,
    errs: &mut ValidationErrors,
) -> Option<Vec<u32>> {
    let items = match obj.get("children") {
        None | Some(Value::Null) => return Some(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errs.push(path, "must be an array");
            return None;
        }
    };

    let mut ages = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        match as_object(item, &item_path, errs) {
            Some(child) => match count(child, "age", &format!("{item_path}.age"), 0, errs) {
                Some(age) => ages.push(age),
                None => ok = false,
            },
            None => ok = false,
        }
    }
    ok.then_some(ages)
}

fn user_id(obj: &Map<String, Value>) -> Option<String> {
    obj.get("user")
        .and_then(|u| u.get("id"))
        .and_then(|id| match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
