//! The three search strategies plugged into [`crate::pipeline::SearchPipeline`].

pub mod car;
pub mod flight;
pub mod hotel;

pub use car::CarSearch;
pub use flight::FlightSearch;
pub use hotel::HotelSearch;

/// Every provider search prices in this currency.
pub const PROVIDER_CURRENCY: &str = "EUR";
