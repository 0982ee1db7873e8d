//! # Database connection module
//!
//! `CommunityDb` is attached as a Rocket fairing and injected into handlers
//! through the `Connection<CommunityDb>` guard, which derefs to a
//! [`mongodb::Database`].
//!
//! Attaching the fairing never touches the network. The first request that
//! needs the database connects through a [`ConnectionCache`], so concurrent
//! first requests share one connect attempt and a failed attempt is retried
//! by the next request.
//!
//! ## Configuration
//!
//! Read from Rocket's figment under `databases.community`:
//! - `url`: MongoDB connection string (`MONGODB_URI` is merged here by `main`)
//! - `database`: optional database name (defaults to the one in the URI)
//! - `max_connections`, `min_connections`, `connect_timeout`, `idle_timeout`
//!
//! A successful connect also creates the unique indexes that back email and
//! username uniqueness, so a check-then-insert race ends in a duplicate-key
//! error instead of a second account.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database as MongoDatabase, IndexModel};
use rocket::figment::Figment;
use rocket_db_pools::{Database, Pool};
use serde::Deserialize;
use thiserror::Error;

use crate::connection::ConnectionCache;

pub const DEFAULT_DATABASE: &str = "community";

#[derive(Database)]
#[database("community")]
pub struct CommunityDb(MongoPool);

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub url: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub min_connections: Option<u32>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: Option<u64>,
}

fn default_max_connections() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> Option<u64> {
    Some(45)
}

impl MongoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
            max_connections: default_max_connections(),
            min_connections: None,
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid database configuration: {0}")]
    Config(#[from] Box<rocket::figment::Error>),
    #[error("database connection failed: {0}")]
    Connect(Arc<mongodb::error::Error>),
}

pub struct MongoPool {
    config: MongoConfig,
    cache: ConnectionCache<MongoDatabase, mongodb::error::Error>,
}

impl MongoPool {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            cache: ConnectionCache::new(),
        }
    }

    pub async fn database(&self) -> Result<MongoDatabase, DbError> {
        let config = self.config.clone();
        self.cache
            .get_or_connect(move || connect(config))
            .await
            .map_err(|e| {
                tracing::warn!(attempts = self.cache.attempts(), "database unavailable");
                DbError::Connect(e)
            })
    }
}

#[rocket::async_trait]
impl Pool for MongoPool {
    type Connection = MongoDatabase;
    type Error = DbError;

    async fn init(figment: &Figment) -> Result<Self, Self::Error> {
        let config: MongoConfig = figment.extract().map_err(Box::new)?;

        tracing::info!(
            max_connections = config.max_connections,
            connect_timeout = config.connect_timeout,
            "database pool configured, connecting on first use"
        );

        Ok(Self::new(config))
    }

    async fn get(&self) -> Result<Self::Connection, Self::Error> {
        self.database().await
    }

    async fn close(&self) {}
}

/// Opens a client with the configured pool parameters and pings the server so
/// an unreachable database fails the attempt instead of the first query.
pub async fn connect(config: MongoConfig) -> Result<MongoDatabase, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.url).await?;
    let timeout = Duration::from_secs(config.connect_timeout);

    options.app_name = Some("community-hub".to_string());
    options.max_pool_size = Some(config.max_connections as u32);
    options.min_pool_size = config.min_connections;
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    options.max_idle_time = config.idle_timeout.map(Duration::from_secs);

    let client = Client::with_options(options)?;
    let database = match &config.database {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
    };

    match database.run_command(doc! { "ping": 1 }).await {
        Ok(_) => {
            tracing::info!(database = database.name(), "connected to MongoDB");
            ensure_indexes(&database).await;
            Ok(database)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to MongoDB");
            Err(e)
        }
    }
}

/// Collections and keys that must stay unique.
pub fn unique_indexes() -> Vec<(&'static str, Document)> {
    vec![
        ("admins", doc! { "username": 1 }),
        ("mentors", doc! { "email": 1 }),
        ("mentees", doc! { "email": 1 }),
        ("dsoc_mentors", doc! { "email": 1 }),
        ("dsoc_mentees", doc! { "email": 1 }),
        ("dsoc_applications", doc! { "project": 1, "mentee": 1 }),
    ]
}

/// Creates every unique index. Creating an index that already exists is a
/// no-op, so this runs on each successful connect. A failure (usually
/// duplicates already stored) is logged and the connection is still used.
async fn ensure_indexes(database: &MongoDatabase) {
    for (collection, keys) in unique_indexes() {
        let model = IndexModel::builder()
            .keys(keys.clone())
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match database
            .collection::<Document>(collection)
            .create_index(model)
            .await
        {
            Ok(_) => tracing::debug!(collection, keys = %keys, "unique index ready"),
            Err(e) => tracing::warn!(
                collection,
                keys = %keys,
                error = %e,
                "could not create unique index"
            ),
        }
    }
}
