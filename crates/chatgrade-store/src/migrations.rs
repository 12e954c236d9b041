//! SurrealDB schema initialization
//!
//! Safe to call on every connection (idempotent).

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::storage_traits::StoreResult;

/// Initialize all chatgrade tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> StoreResult<()> {
    info!("Initializing chatgrade SurrealDB schema");
    init_score_records_table(db).await?;
    Ok(())
}

/// Initialize `score_records` table with indexes
///
/// Schema:
/// ```text
/// TABLE score_records {
///   record_id:   STRING (unique)
///   subject:     STRING (indexed)
///   job_id:      STRING?
///   item_index:  INT
///   coherence:   FLOAT
///   politeness:  FLOAT
///   relevance:   FLOAT
///   resolution:  FLOAT
///   scenario:    STRING?
///   shift:       STRING?
///   timestamp:   DATETIME?
///   created_at:  DATETIME (indexed with subject)
/// }
/// ```
async fn init_score_records_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing score_records table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS score_records AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_record_id ON TABLE score_records COLUMNS record_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_subject ON TABLE score_records COLUMNS subject;
        DEFINE INDEX IF NOT EXISTS idx_subject_created_at ON TABLE score_records COLUMNS subject, created_at;
        DEFINE INDEX IF NOT EXISTS idx_job_id ON TABLE score_records COLUMNS job_id;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

    debug!("score_records table initialized");
    Ok(())
}
