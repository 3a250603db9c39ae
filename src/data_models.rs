use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TravelerCounts {
    pub adults: u32,
    pub children: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlightSearchLog {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub from: String,
    pub to: String,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub traveler_details: TravelerCounts,
    pub user: Option<String>,
    pub created_at: DateTime,
}

impl FlightSearchLog {
    pub fn new(
        from: String,
        to: String,
        departure_date: String,
        return_date: Option<String>,
        traveler_details: TravelerCounts,
        user: Option<String>,
    ) -> FlightSearchLog {
        FlightSearchLog {
            id: ObjectId::new(),
            from,
            to,
            departure_date,
            return_date,
            traveler_details,
            user,
            created_at: DateTime::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HotelSearchLog {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub destination: String,
    pub check_in: String,
    pub check_out: String,
    pub guest_details: TravelerCounts,
    pub rooms: u32,
    pub room_type: String,
    pub user: Option<String>,
    pub created_at: DateTime,
}

impl HotelSearchLog {
    pub fn new(
        destination: String,
        check_in: String,
        check_out: String,
        guest_details: TravelerCounts,
        rooms: u32,
        room_type: Option<String>,
        user: Option<String>,
    ) -> HotelSearchLog {
        HotelSearchLog {
            id: ObjectId::new(),
            destination,
            check_in,
            check_out,
            guest_details,
            rooms,
            room_type: room_type.unwrap_or_default(),
            user,
            created_at: DateTime::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CarSearchLog {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub pick_up_location: String,
    pub pick_up_date: String,
    pub pick_up_time: String,
    pub drop_off_location: String,
    pub drop_off_date: String,
    pub drop_off_time: String,
    pub return_to_same_location: bool,
    pub user: Option<String>,
    pub created_at: DateTime,
}

impl CarSearchLog {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pick_up_location: String,
        pick_up_date: String,
        pick_up_time: String,
        drop_off_location: String,
        drop_off_date: String,
        drop_off_time: String,
        user: Option<String>,
    ) -> CarSearchLog {
        // stored from the locations, not from the client flag
        let return_to_same_location = pick_up_location == drop_off_location;
        CarSearchLog {
            id: ObjectId::new(),
            pick_up_location,
            pick_up_date,
            pick_up_time,
            drop_off_location,
            drop_off_date,
            drop_off_time,
            return_to_same_location,
            user,
            created_at: DateTime::now(),
        }
    }
}

/// One audit record per completed search, written after the response.
#[derive(Debug, Clone)]
pub enum SearchLogRecord {
    Flight(FlightSearchLog),
    Hotel(HotelSearchLog),
    Car(CarSearchLog),
}

impl SearchLogRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            SearchLogRecord::Flight(_) => "flight",
            SearchLogRecord::Hotel(_) => "hotel",
            SearchLogRecord::Car(_) => "car",
        }
    }
}
