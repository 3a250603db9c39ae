use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::options::ClientOptions;
use mongodb::{
    Client, Collection, Database as MongoDatabase,
    bson::{doc, oid::ObjectId},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::CONFIG;
use crate::data_models::{CarSearchLog, FlightSearchLog, HotelSearchLog, SearchLogRecord};

/// Collection names as constants for consistency
pub mod collections {
    pub const FLIGHT_SEARCHES: &str = "flight_searches";
    pub const HOTEL_SEARCHES: &str = "hotel_searches";
    pub const CAR_SEARCHES: &str = "car_searches";
}

/// Main database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Create a new Database instance with custom URI and database name.
    /// Useful for testing with a different database.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        tracing::info!("Connected to MongoDB database: {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Create a Database instance using environment configuration
    pub async fn from_config() -> Result<Self> {
        Self::new(&CONFIG.mongo_uri, &CONFIG.mongo_db_name).await
    }

    /// Get a typed collection by name
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn flight_searches(&self) -> Collection<FlightSearchLog> {
        self.collection(collections::FLIGHT_SEARCHES)
    }

    pub fn hotel_searches(&self) -> Collection<HotelSearchLog> {
        self.collection(collections::HOTEL_SEARCHES)
    }

    pub fn car_searches(&self) -> Collection<CarSearchLog> {
        self.collection(collections::CAR_SEARCHES)
    }
}

// =============================================================================
// Generic operations
// =============================================================================

pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    /// Insert a single document
    pub async fn insert(&self, doc: &T) -> Result<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .await
            .context("Failed to insert document")?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted ObjectId"))
    }
}

// =============================================================================
// Search logs
// =============================================================================

/// Destination for best-effort search audit records.
#[async_trait]
pub trait SearchLogStore: Send + Sync {
    async fn save(&self, record: &SearchLogRecord) -> Result<ObjectId>;
}

pub struct SearchLogRepo {
    flights: Repository<FlightSearchLog>,
    hotels: Repository<HotelSearchLog>,
    cars: Repository<CarSearchLog>,
}

impl SearchLogRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            flights: Repository::new(db.flight_searches()),
            hotels: Repository::new(db.hotel_searches()),
            cars: Repository::new(db.car_searches()),
        }
    }
}

#[async_trait]
impl SearchLogStore for SearchLogRepo {
    async fn save(&self, record: &SearchLogRecord) -> Result<ObjectId> {
        match record {
            SearchLogRecord::Flight(log) => self.flights.insert(log).await,
            SearchLogRecord::Hotel(log) => self.hotels.insert(log).await,
            SearchLogRecord::Car(log) => self.cars.insert(log).await,
        }
    }
}

// =============================================================================
// Test utilities
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::TravelerCounts;
    use test_utils::*;

    #[tokio::test]
    #[ignore = "requires a running MongoDB"]
    async fn test_search_log_round_trip() -> Result<()> {
        let (db, db_name) = create_test_db().await?;
        let repo = SearchLogRepo::new(&db);

        let flight = FlightSearchLog::new(
            "JFK".to_string(),
            "LHR".to_string(),
            "2025-06-01".to_string(),
            None,
            TravelerCounts {
                adults: 2,
                children: vec![7],
            },
            Some("user-1".to_string()),
        );
        let id = repo.save(&SearchLogRecord::Flight(flight)).await?;

        let found = db.flight_searches().find_one(doc! { "_id": id }).await?;
        let found = found.expect("flight search log stored");
        assert_eq!(found.from, "JFK");
        assert_eq!(found.traveler_details.children, vec![7]);

        let car = CarSearchLog::new(
            "CDG".to_string(),
            "2025-06-01".to_string(),
            "10:00".to_string(),
            "CDG".to_string(),
            "2025-06-02".to_string(),
            "10:00".to_string(),
            None,
        );
        repo.save(&SearchLogRecord::Car(car)).await?;
        assert_eq!(
            db.car_searches()
                .count_documents(doc! { "return_to_same_location": true })
                .await?,
            1
        );
        assert_eq!(db.hotel_searches().count_documents(doc! {}).await?, 0);

        cleanup_test_db(&db, &db_name).await?;
        Ok(())
    }
}
