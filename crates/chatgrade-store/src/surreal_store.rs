//! SurrealDB-backed ScoreStore implementation
//!
//! Uses a private `DbScoreRow` for persistence, converting to/from
//! [`ScoreRecord`] at the boundary so datetimes are stored natively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::migrations;
use crate::record::{RecordId, ScoreRecord};
use crate::storage_traits::{ScoreStore, StoreResult};

const TABLE: &str = "score_records";

/// Default local database path when no URL is configured
pub const DEFAULT_DB_PATH: &str = ".chatgrade/db";

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(&SurrealDatetime::from(*date), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = date.map(SurrealDatetime::from);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbScoreRow {
    record_id: String,
    subject: String,
    job_id: Option<String>,
    item_index: u64,
    coherence: f64,
    politeness: f64,
    relevance: f64,
    resolution: f64,
    scenario: Option<String>,
    shift: Option<String>,
    #[serde(default, with = "surreal_datetime_opt")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(with = "surreal_datetime")]
    created_at: DateTime<Utc>,
}

impl From<ScoreRecord> for DbScoreRow {
    fn from(r: ScoreRecord) -> Self {
        DbScoreRow {
            record_id: r.record_id.0,
            subject: r.subject,
            job_id: r.job_id,
            item_index: r.item_index,
            coherence: r.coherence,
            politeness: r.politeness,
            relevance: r.relevance,
            resolution: r.resolution,
            scenario: r.scenario,
            shift: r.shift,
            timestamp: r.timestamp,
            created_at: r.created_at,
        }
    }
}

impl From<DbScoreRow> for ScoreRecord {
    fn from(row: DbScoreRow) -> Self {
        ScoreRecord {
            record_id: RecordId(row.record_id),
            subject: row.subject,
            job_id: row.job_id,
            item_index: row.item_index,
            coherence: row.coherence,
            politeness: row.politeness,
            relevance: row.relevance,
            resolution: row.resolution,
            scenario: row.scenario,
            shift: row.shift,
            timestamp: row.timestamp,
            created_at: row.created_at,
        }
    }
}

/// Connection settings for [`SurrealScoreStore`]
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Engine URL (`mem://`, `surrealkv://path`, `wss://host`)
    pub url: String,
    /// Namespace (default: "chatgrade")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Root credentials for remote servers
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: format!("surrealkv://{}", DEFAULT_DB_PATH),
            namespace: "chatgrade".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
        }
    }
}

impl StoreConfig {
    /// In-memory database, for tests.
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            ..Self::default()
        }
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_URL (optional, default: local `surrealkv://.chatgrade/db`)
    /// - SURREALDB_NAMESPACE (optional, default: "chatgrade")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_USERNAME / SURREALDB_PASSWORD (optional, root sign-in)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("SURREALDB_URL").unwrap_or(defaults.url),
            namespace: std::env::var("SURREALDB_NAMESPACE").unwrap_or(defaults.namespace),
            database: std::env::var("SURREALDB_DATABASE").unwrap_or(defaults.database),
            username: std::env::var("SURREALDB_USERNAME").ok(),
            password: std::env::var("SURREALDB_PASSWORD").ok(),
        }
    }

    fn local_path(&self) -> Option<&str> {
        self.url.strip_prefix("surrealkv://")
    }
}

/// SurrealDB-backed implementation of [`ScoreStore`].
#[derive(Clone)]
pub struct SurrealScoreStore {
    db: Surreal<Any>,
}

impl SurrealScoreStore {
    /// Connect with the given configuration and initialize the schema.
    #[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace))]
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(path) = config.local_path() {
            std::fs::create_dir_all(path).map_err(|e| {
                StoreError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| StoreError::Connection(format!("Root auth failed: {e}")))?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealScoreStore connected ({})", config.url);
        Ok(Self { db })
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(&StoreConfig::in_memory()).await
    }

    /// Connect using [`StoreConfig::from_env`].
    pub async fn from_env() -> StoreResult<Self> {
        Self::connect(&StoreConfig::from_env()).await
    }

    async fn create_one(&self, record: ScoreRecord) -> StoreResult<RecordId> {
        let id = record.record_id.clone();
        let row = DbScoreRow::from(record);

        let created: Option<DbScoreRow> = self.db.create(TABLE).content(row).await?;

        created
            .map(|_| id)
            .ok_or_else(|| StoreError::Backend("create returned no record".to_string()))
    }
}

#[async_trait]
impl ScoreStore for SurrealScoreStore {
    async fn create_many(&self, records: Vec<ScoreRecord>) -> Vec<StoreResult<RecordId>> {
        debug!(count = records.len(), "creating score records");

        let results = join_all(records.into_iter().map(|r| self.create_one(r))).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, "some score records were not stored");
        }
        results
    }

    async fn delete(&self, record_id: &RecordId) -> StoreResult<()> {
        let rid_owned = record_id.0.clone();
        let mut res = self
            .db
            .query("DELETE score_records WHERE record_id = $rid RETURN BEFORE")
            .bind(("rid", rid_owned))
            .await?;

        let removed: Vec<DbScoreRow> = res.take(0)?;
        if removed.is_empty() {
            return Err(StoreError::RecordNotFound {
                record_id: record_id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_all_for_subject(&self, subject: &str) -> StoreResult<usize> {
        let subject_owned = subject.to_string();
        let mut res = self
            .db
            .query("DELETE score_records WHERE subject = $subject RETURN BEFORE")
            .bind(("subject", subject_owned))
            .await?;

        let removed: Vec<DbScoreRow> = res.take(0)?;
        info!(subject, removed = removed.len(), "deleted subject records");
        Ok(removed.len())
    }

    async fn list_by_subject(&self, subject: &str) -> StoreResult<Vec<ScoreRecord>> {
        let subject_owned = subject.to_string();
        let mut res = self
            .db
            .query(
                "SELECT * FROM score_records WHERE subject = $subject \
                 ORDER BY created_at ASC, item_index ASC",
            )
            .bind(("subject", subject_owned))
            .await?;

        let rows: Vec<DbScoreRow> = res.take(0)?;
        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }
}
