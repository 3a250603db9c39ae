//! Inventory provider response shapes.
//!
//! Every field is optional: the provider omits data freely and the
//! normalizers decide what each gap turns into.

use serde::{Deserialize, Deserializer};

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Price {
    pub total: Option<String>,
    pub currency: Option<String>,
}

// --- flights ---------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: Option<String>,
    pub is_upsell_offer: Option<bool>,
    pub last_ticketing_date: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub itineraries: Vec<Itinerary>,
    pub price: Option<Price>,
    #[serde(deserialize_with = "null_as_empty")]
    pub traveler_pricings: Vec<TravelerPricing>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Itinerary {
    pub duration: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Segment {
    pub departure: Option<FlightEndpoint>,
    pub arrival: Option<FlightEndpoint>,
    pub carrier_code: Option<String>,
    pub number: Option<String>,
    pub operating: Option<OperatingCarrier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlightEndpoint {
    pub iata_code: Option<String>,
    pub at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatingCarrier {
    pub carrier_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TravelerPricing {
    pub price: Option<Price>,
    #[serde(deserialize_with = "null_as_empty")]
    pub fare_details_by_segment: Vec<FareDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FareDetails {
    pub cabin: Option<String>,
    pub included_checked_bags: Option<BagAllowance>,
    pub included_cabin_bags: Option<BagAllowance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BagAllowance {
    pub quantity: Option<u32>,
}

// --- hotels ----------------------------------------------------------------

/// Entry of the hotels-by-city listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotelLocation {
    pub hotel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotelOffer {
    pub hotel: Option<HotelInfo>,
    #[serde(deserialize_with = "null_as_empty")]
    pub offers: Vec<RoomOffer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotelInfo {
    pub name: Option<String>,
    pub city_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomOffer {
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub room: Option<Room>,
    pub price: Option<Price>,
    pub policies: Option<RoomPolicies>,
    pub guests: Option<RoomGuests>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Room {
    pub type_estimated: Option<RoomTypeEstimate>,
    pub description: Option<RoomDescription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomTypeEstimate {
    pub category: Option<String>,
    pub beds: Option<u32>,
    pub bed_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomDescription {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomPolicies {
    pub refundable: Option<RefundPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefundPolicy {
    pub cancellation_refund: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomGuests {
    pub adults: Option<u32>,
}

// --- transfers -------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferOffer {
    pub id: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub service_provider: Option<ServiceProvider>,
    pub quotation: Option<Quotation>,
    pub converted: Option<Quotation>,
    pub start: Option<TransferStop>,
    pub end: Option<TransferStop>,
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    pub description: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub seats: Vec<SeatConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeatConfig {
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceProvider {
    pub name: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Quotation {
    pub monetary_amount: Option<String>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferStop {
    pub date_time: Option<String>,
    pub location_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Distance {
    pub value: Option<f64>,
}
