use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

use crate::currency::RateMemo;
use crate::offers::{FlightOffer, HotelOffer, Quotation, TransferOffer};

/// Shared inputs for normalizing one provider response.
#[derive(Clone)]
pub struct NormalizeContext {
    pub rates: RateMemo,
    /// Zone flight times are rendered in.
    pub timezone: Tz,
}

impl NormalizeContext {
    pub fn new(rates: RateMemo, timezone: Tz) -> Self {
        Self { rates, timezone }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightResult {
    pub id: Option<String>,
    pub airline_name: Option<String>,
    pub airline_code: Option<String>,
    pub flight_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub total_duration: Option<String>,
    pub number_of_stops: Option<usize>,
    pub cabin_class: Option<String>,
    pub checked_bags: Option<u32>,
    pub cabin_bags: Option<u32>,
    pub total_price: Option<String>,
    pub currency: Option<String>,
    pub is_upsell_offer: bool,
    pub rate_to_eur: f64,
    pub last_ticketing_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelResult {
    pub hotel_name: Option<String>,
    pub city_code: Option<String>,
    pub room_category: String,
    pub bed_info: String,
    pub bed_type: String,
    pub description: String,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub refundable: bool,
    pub guests: u32,
    pub rate_to_eur: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResult {
    pub id: Option<String>,
    pub provider_name: String,
    pub provider_logo: String,
    pub vehicle_image: String,
    pub vehicle_description: String,
    pub seat_count: u32,
    pub start_time: String,
    pub start_location: String,
    pub end_time: String,
    pub end_location: String,
    pub price: String,
    pub rate_to_eur: f64,
    pub currency: String,
    pub distance_km: f64,
}

pub const DISPLAY_TIME_FORMAT: &str = "%A, %d %b %Y, %I:%M %p";
pub const REFUNDABLE_SENTINEL: &str = "REFUNDABLE_UP_TO_DEADLINE";

pub async fn normalize_flight(offer: &FlightOffer, ctx: &NormalizeContext) -> FlightResult {
    let itinerary = offer.itineraries.first();
    let segments = itinerary.map(|i| i.segments.as_slice()).unwrap_or_default();
    let first_segment = segments.first();
    let last_segment = segments.last();
    let traveler = offer.traveler_pricings.first();
    let fare = traveler.and_then(|t| t.fare_details_by_segment.first());

    let departure = first_segment.and_then(|s| s.departure.as_ref());
    let arrival = last_segment.and_then(|s| s.arrival.as_ref());

    let traveler_price = traveler.and_then(|t| t.price.as_ref());
    let offer_price = offer.price.as_ref();
    let total_price = traveler_price
        .and_then(|p| p.total.clone())
        .or_else(|| offer_price.and_then(|p| p.total.clone()));
    let currency = traveler_price
        .and_then(|p| p.currency.clone())
        .or_else(|| offer_price.and_then(|p| p.currency.clone()));

    let rate_to_eur = ctx.rates.rate_to_reference(currency.as_deref()).await;

    FlightResult {
        id: offer.id.clone(),
        airline_name: first_segment
            .and_then(|s| s.operating.as_ref())
            .and_then(|o| o.carrier_name.clone()),
        airline_code: first_segment.and_then(|s| s.carrier_code.clone()),
        flight_number: first_segment.and_then(|s| s.number.clone()),
        from: departure.and_then(|d| d.iata_code.clone()),
        to: arrival.and_then(|a| a.iata_code.clone()),
        departure_time: departure
            .and_then(|d| d.at.as_deref())
            .and_then(|at| format_local_time(at, ctx.timezone)),
        arrival_time: arrival
            .and_then(|a| a.at.as_deref())
            .and_then(|at| format_local_time(at, ctx.timezone)),
        total_duration: itinerary
            .and_then(|i| i.duration.as_deref())
            .and_then(readable_duration),
        number_of_stops: segments.len().checked_sub(1),
        cabin_class: fare.and_then(|f| f.cabin.clone()),
        checked_bags: fare
            .and_then(|f| f.included_checked_bags.as_ref())
            .and_then(|b| b.quantity),
        cabin_bags: fare
            .and_then(|f| f.included_cabin_bags.as_ref())
            .and_then(|b| b.quantity),
        total_price,
        currency,
        is_upsell_offer: offer.is_upsell_offer.unwrap_or(false),
        rate_to_eur,
        last_ticketing_date: offer.last_ticketing_date.clone(),
    }
}

pub async fn normalize_hotel(offer: &HotelOffer, ctx: &NormalizeContext) -> HotelResult {
    let hotel = offer.hotel.as_ref();
    let room_offer = offer.offers.first();
    let room = room_offer.and_then(|o| o.room.as_ref());
    let estimate = room.and_then(|r| r.type_estimated.as_ref());
    let price = room_offer.and_then(|o| o.price.as_ref());

    let bed_type = estimate.and_then(|e| non_empty(e.bed_type.as_deref()));
    let beds = estimate.and_then(|e| e.beds).filter(|b| *b > 0);
    let bed_info = format!(
        "{} {}(s)",
        beds.map(|b| b.to_string()).as_deref().unwrap_or("N/A"),
        bed_type.unwrap_or("Bed")
    );

    let currency = price.and_then(|p| p.currency.clone());
    let rate_to_eur = ctx.rates.rate_to_reference(currency.as_deref()).await;

    HotelResult {
        hotel_name: hotel.and_then(|h| h.name.clone()),
        city_code: hotel.and_then(|h| h.city_code.clone()),
        room_category: estimate
            .and_then(|e| non_empty(e.category.as_deref()))
            .unwrap_or("Not specified")
            .to_string(),
        bed_info,
        bed_type: bed_type.unwrap_or("N/A").to_string(),
        description: room
            .and_then(|r| r.description.as_ref())
            .and_then(|d| non_empty(d.text.as_deref()))
            .unwrap_or("No description provided")
            .to_string(),
        check_in: room_offer.and_then(|o| o.check_in_date.clone()),
        check_out: room_offer.and_then(|o| o.check_out_date.clone()),
        price: price.and_then(|p| p.total.clone()),
        currency,
        refundable: room_offer
            .and_then(|o| o.policies.as_ref())
            .and_then(|p| p.refundable.as_ref())
            .and_then(|r| r.cancellation_refund.as_deref())
            == Some(REFUNDABLE_SENTINEL),
        guests: room_offer
            .and_then(|o| o.guests.as_ref())
            .and_then(|g| g.adults)
            .filter(|a| *a > 0)
            .unwrap_or(1),
        rate_to_eur,
    }
}

pub async fn normalize_car(offer: &TransferOffer, ctx: &NormalizeContext) -> CarResult {
    let vehicle = offer.vehicle.as_ref();
    let provider = offer.service_provider.as_ref();
    let quotation: Option<&Quotation> = offer.converted.as_ref().or(offer.quotation.as_ref());
    let currency = quotation.and_then(|q| non_empty(q.currency_code.as_deref()));

    let rate_to_eur = ctx.rates.rate_to_reference(currency).await;

    let text = |value: Option<&String>, fallback: &str| -> String {
        non_empty(value.map(String::as_str))
            .unwrap_or(fallback)
            .to_string()
    };

    CarResult {
        id: offer.id.clone(),
        provider_name: text(provider.and_then(|p| p.name.as_ref()), "Unknown Provider"),
        provider_logo: text(provider.and_then(|p| p.logo_url.as_ref()), ""),
        vehicle_image: text(vehicle.and_then(|v| v.image_url.as_ref()), ""),
        vehicle_description: text(
            vehicle.and_then(|v| v.description.as_ref()),
            "Vehicle description not available",
        ),
        seat_count: vehicle
            .and_then(|v| v.seats.first())
            .and_then(|s| s.count)
            .unwrap_or(0),
        start_time: text(offer.start.as_ref().and_then(|s| s.date_time.as_ref()), ""),
        start_location: text(
            offer.start.as_ref().and_then(|s| s.location_code.as_ref()),
            "Unknown",
        ),
        end_time: text(offer.end.as_ref().and_then(|e| e.date_time.as_ref()), ""),
        end_location: text(
            offer.end.as_ref().and_then(|e| e.location_code.as_ref()),
            "Unknown",
        ),
        price: text(quotation.and_then(|q| q.monetary_amount.as_ref()), "0"),
        rate_to_eur,
        currency: currency.unwrap_or("EUR").to_string(),
        distance_km: offer.distance.as_ref().and_then(|d| d.value).unwrap_or(0.0),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Renders a provider timestamp in `tz`. Timestamps without an offset are
/// taken as wall-clock time in `tz`.
pub fn format_local_time(at: &str, tz: Tz) -> Option<String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(at) {
        return Some(
            instant
                .with_timezone(&tz)
                .format(DISPLAY_TIME_FORMAT)
                .to_string(),
        );
    }

    let naive = NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M"))
        .ok()?;
    let formatted = match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.format(DISPLAY_TIME_FORMAT).to_string(),
        // inside a DST gap
        None => naive.format(DISPLAY_TIME_FORMAT).to_string(),
    };
    Some(formatted)
}

/// `PT7H30M` -> `7h 30m`. Days count as 24 hours; seconds are dropped.
pub fn readable_duration(iso: &str) -> Option<String> {
    let rest = iso.strip_prefix('P')?;
    let (date_part, time_part) = rest.split_once('T').unwrap_or((rest, ""));

    let mut hours = 0u64;
    let mut minutes = 0u64;
    for (value, unit) in duration_components(date_part)? {
        match unit {
            'W' => hours += value * 7 * 24,
            'D' => hours += value * 24,
            _ => return None,
        }
    }
    for (value, unit) in duration_components(time_part)? {
        match unit {
            'H' => hours += value,
            'M' => minutes += value,
            'S' => {}
            _ => return None,
        }
    }

    hours += minutes / 60;
    minutes %= 60;
    Some(format!("{hours}h {minutes}m"))
}

fn duration_components(part: &str) -> Option<Vec<(u64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let value: f64 = digits.parse().ok()?;
        out.push((value as u64, c));
        digits.clear();
    }
    digits.is_empty().then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateLookup;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedRates;

    #[async_trait]
    impl RateLookup for FixedRates {
        async fn rate_to_reference(&self, currency: Option<&str>) -> f64 {
            match currency {
                Some("USD") => 0.9,
                Some("GBP") => 1.2,
                _ => 1.0,
            }
        }
    }

    /// Slower for earlier currencies, so completion order is reversed.
    struct SlowRates;

    #[async_trait]
    impl RateLookup for SlowRates {
        async fn rate_to_reference(&self, currency: Option<&str>) -> f64 {
            let delay = match currency {
                Some("USD") => 60,
                Some("GBP") => 30,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            FixedRates.rate_to_reference(currency).await
        }
    }

    fn ctx(tz: Tz) -> NormalizeContext {
        NormalizeContext::new(RateMemo::new(Arc::new(FixedRates)), tz)
    }

    fn flight(value: serde_json::Value) -> FlightOffer {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_flight_full_offer() {
        let offer = flight(json!({
            "id": "7",
            "lastTicketingDate": "2025-05-30",
            "itineraries": [{
                "duration": "PT9H5M",
                "segments": [
                    {
                        "departure": { "iataCode": "JFK", "at": "2025-06-01T18:30:00" },
                        "arrival": { "iataCode": "KEF", "at": "2025-06-02T04:00:00" },
                        "carrierCode": "FI",
                        "number": "614",
                        "operating": { "carrierName": "ICELANDAIR" }
                    },
                    {
                        "departure": { "iataCode": "KEF", "at": "2025-06-02T07:40:00" },
                        "arrival": { "iataCode": "LHR", "at": "2025-06-02T11:35:00" },
                        "carrierCode": "FI",
                        "number": "450"
                    }
                ]
            }],
            "price": { "total": "612.00", "currency": "EUR" },
            "travelerPricings": [{
                "price": { "total": "500.00", "currency": "USD" },
                "fareDetailsBySegment": [{
                    "cabin": "ECONOMY",
                    "includedCheckedBags": { "quantity": 1 },
                    "includedCabinBags": { "quantity": 1 }
                }]
            }]
        }));

        let result = normalize_flight(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.id.as_deref(), Some("7"));
        assert_eq!(result.airline_name.as_deref(), Some("ICELANDAIR"));
        assert_eq!(result.airline_code.as_deref(), Some("FI"));
        assert_eq!(result.flight_number.as_deref(), Some("614"));
        assert_eq!(result.from.as_deref(), Some("JFK"));
        assert_eq!(result.to.as_deref(), Some("LHR"));
        assert_eq!(
            result.departure_time.as_deref(),
            Some("Sunday, 01 Jun 2025, 06:30 PM")
        );
        assert_eq!(
            result.arrival_time.as_deref(),
            Some("Monday, 02 Jun 2025, 11:35 AM")
        );
        assert_eq!(result.total_duration.as_deref(), Some("9h 5m"));
        assert_eq!(result.number_of_stops, Some(1));
        assert_eq!(result.cabin_class.as_deref(), Some("ECONOMY"));
        assert_eq!(result.checked_bags, Some(1));
        assert_eq!(result.cabin_bags, Some(1));
        // traveler price wins over the offer price
        assert_eq!(result.total_price.as_deref(), Some("500.00"));
        assert_eq!(result.currency.as_deref(), Some("USD"));
        assert_eq!(result.rate_to_eur, 0.9);
        assert!(!result.is_upsell_offer);
        assert_eq!(result.last_ticketing_date.as_deref(), Some("2025-05-30"));
    }

    #[tokio::test]
    async fn test_flight_without_segments() {
        let offer = flight(json!({
            "isUpsellOffer": true,
            "itineraries": [],
            "price": { "total": "99.00", "currency": "GBP" }
        }));
        let result = normalize_flight(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.number_of_stops, None);
        assert_eq!(result.from, None);
        assert_eq!(result.departure_time, None);
        assert_eq!(result.total_duration, None);
        assert_eq!(result.total_price.as_deref(), Some("99.00"));
        assert_eq!(result.currency.as_deref(), Some("GBP"));
        assert_eq!(result.rate_to_eur, 1.2);
        assert!(result.is_upsell_offer);
    }

    #[tokio::test]
    async fn test_flight_serializes_nulls() {
        let result = normalize_flight(&flight(json!({})), &ctx(Tz::UTC)).await;
        let value = serde_json::to_value(&result).unwrap();
        assert!(value["numberOfStops"].is_null());
        assert!(value["airlineName"].is_null());
        assert_eq!(value["rateToEur"], 1.0);
        assert_eq!(value["isUpsellOffer"], false);
    }

    #[test]
    fn test_format_local_time_in_zone() {
        // offset-aware instants are converted
        assert_eq!(
            format_local_time("2025-06-01T12:00:00Z", Tz::Asia__Tokyo).as_deref(),
            Some("Sunday, 01 Jun 2025, 09:00 PM")
        );
        // wall-clock timestamps stay as given
        assert_eq!(
            format_local_time("2025-06-01T08:05:00", Tz::America__New_York).as_deref(),
            Some("Sunday, 01 Jun 2025, 08:05 AM")
        );
        assert_eq!(format_local_time("yesterday", Tz::UTC), None);
    }

    #[test]
    fn test_readable_duration() {
        assert_eq!(readable_duration("PT7H30M").as_deref(), Some("7h 30m"));
        assert_eq!(readable_duration("PT45M").as_deref(), Some("0h 45m"));
        assert_eq!(readable_duration("PT2H").as_deref(), Some("2h 0m"));
        assert_eq!(readable_duration("P1DT2H10M").as_deref(), Some("26h 10m"));
        assert_eq!(readable_duration("PT90M").as_deref(), Some("1h 30m"));
        assert_eq!(readable_duration("7 hours"), None);
        assert_eq!(readable_duration("PTH"), None);
    }

    #[tokio::test]
    async fn test_hotel_defaults() {
        let offer: HotelOffer = serde_json::from_value(json!({
            "hotel": { "name": "Hotel Lutetia", "cityCode": "PAR" },
            "offers": [{ "room": { "typeEstimated": {} } }]
        }))
        .unwrap();
        let result = normalize_hotel(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.hotel_name.as_deref(), Some("Hotel Lutetia"));
        assert_eq!(result.room_category, "Not specified");
        assert_eq!(result.bed_info, "N/A Bed(s)");
        assert_eq!(result.bed_type, "N/A");
        assert_eq!(result.description, "No description provided");
        assert!(!result.refundable);
        assert_eq!(result.guests, 1);
        assert_eq!(result.price, None);
        assert_eq!(result.rate_to_eur, 1.0);
    }

    #[tokio::test]
    async fn test_hotel_full_offer() {
        let offer: HotelOffer = serde_json::from_value(json!({
            "hotel": { "name": "The Savoy", "cityCode": "LON" },
            "offers": [{
                "checkInDate": "2025-06-01",
                "checkOutDate": "2025-06-03",
                "room": {
                    "typeEstimated": { "category": "DELUXE_ROOM", "beds": 1, "bedType": "KING" },
                    "description": { "text": "River view" }
                },
                "price": { "total": "840.00", "currency": "GBP" },
                "policies": { "refundable": { "cancellationRefund": "REFUNDABLE_UP_TO_DEADLINE" } },
                "guests": { "adults": 2 }
            }]
        }))
        .unwrap();
        let result = normalize_hotel(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.room_category, "DELUXE_ROOM");
        assert_eq!(result.bed_info, "1 KING(s)");
        assert_eq!(result.bed_type, "KING");
        assert_eq!(result.description, "River view");
        assert_eq!(result.check_in.as_deref(), Some("2025-06-01"));
        assert_eq!(result.price.as_deref(), Some("840.00"));
        assert!(result.refundable);
        assert_eq!(result.guests, 2);
        assert_eq!(result.rate_to_eur, 1.2);
    }

    #[tokio::test]
    async fn test_hotel_other_refund_policies_are_not_refundable() {
        let offer: HotelOffer = serde_json::from_value(json!({
            "offers": [{ "policies": { "refundable": { "cancellationRefund": "NON_REFUNDABLE" } } }]
        }))
        .unwrap();
        assert!(!normalize_hotel(&offer, &ctx(Tz::UTC)).await.refundable);
    }

    #[tokio::test]
    async fn test_car_defaults() {
        let offer: TransferOffer = serde_json::from_value(json!({ "id": "t1" })).unwrap();
        let result = normalize_car(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.seat_count, 0);
        assert_eq!(result.provider_name, "Unknown Provider");
        assert_eq!(result.provider_logo, "");
        assert_eq!(result.vehicle_image, "");
        assert_eq!(result.vehicle_description, "Vehicle description not available");
        assert_eq!(result.start_location, "Unknown");
        assert_eq!(result.end_time, "");
        assert_eq!(result.price, "0");
        assert_eq!(result.currency, "EUR");
        assert_eq!(result.distance_km, 0.0);
        assert_eq!(result.rate_to_eur, 1.0);
    }

    #[tokio::test]
    async fn test_car_prefers_converted_quotation() {
        let offer: TransferOffer = serde_json::from_value(json!({
            "id": "t2",
            "vehicle": { "description": "Sedan", "seats": [{ "count": 3 }] },
            "serviceProvider": { "name": "Blacklane", "logoUrl": "https://logo" },
            "quotation": { "monetaryAmount": "120.00", "currencyCode": "GBP" },
            "converted": { "monetaryAmount": "110.00", "currencyCode": "USD" },
            "start": { "dateTime": "2025-06-01T10:00:00", "locationCode": "CDG" },
            "distance": { "value": 32.5 }
        }))
        .unwrap();
        let result = normalize_car(&offer, &ctx(Tz::UTC)).await;
        assert_eq!(result.seat_count, 3);
        assert_eq!(result.provider_name, "Blacklane");
        assert_eq!(result.price, "110.00");
        assert_eq!(result.currency, "USD");
        assert_eq!(result.rate_to_eur, 0.9);
        assert_eq!(result.start_location, "CDG");
        assert_eq!(result.distance_km, 32.5);
    }

    #[tokio::test]
    async fn test_concurrent_normalization_keeps_provider_order() {
        let ctx = NormalizeContext::new(RateMemo::new(Arc::new(SlowRates)), Tz::UTC);
        let offers: Vec<FlightOffer> = ["USD", "GBP", "EUR"]
            .iter()
            .enumerate()
            .map(|(i, currency)| {
                flight(json!({
                    "id": i.to_string(),
                    "price": { "total": "1.00", "currency": currency }
                }))
            })
            .collect();

        let results =
            futures::future::join_all(offers.iter().map(|o| normalize_flight(o, &ctx))).await;
        let ids: Vec<_> = results.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(
            results.iter().map(|r| r.rate_to_eur).collect::<Vec<_>>(),
            vec![0.9, 1.2, 1.0]
        );
    }
}
