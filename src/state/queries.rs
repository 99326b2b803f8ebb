// Database CRUD operations
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::db::{DbConnection, DbResult};
use super::models::{ArtifactKey, ArtifactKind, Partition, SymbolEntry};
use super::storage::calculate_sha256;

fn symbol_column(key: &ArtifactKey) -> &str {
    key.symbol.as_deref().unwrap_or("")
}

fn text_conversion_error(
    column: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(error))
}

// ==================== REGISTRY QUERIES ====================

/// Symbols of a partition in registry order
pub fn list_symbols(db: &DbConnection, partition: Partition) -> DbResult<Vec<SymbolEntry>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT name, active, created_at
         FROM symbols WHERE partition = ?1
         ORDER BY position ASC",
    )?;

    let symbols = stmt
        .query_map([partition.as_str()], |row| {
            let created_at: String = row.get(2)?;
            Ok(SymbolEntry {
                name: row.get(0)?,
                active: row.get(1)?,
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| text_conversion_error(2, e))?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(symbols)
}

/// Replace the whole registry of a partition
pub fn replace_symbols(
    db: &DbConnection,
    partition: Partition,
    symbols: &[SymbolEntry],
) -> DbResult<()> {
    let mut conn = db.lock();
    let tx = conn.transaction()?;
    write_symbols(&tx, partition, symbols)?;
    tx.commit()?;
    Ok(())
}

fn write_symbols(conn: &Connection, partition: Partition, symbols: &[SymbolEntry]) -> DbResult<()> {
    conn.execute(
        "DELETE FROM symbols WHERE partition = ?1",
        [partition.as_str()],
    )?;

    for (position, symbol) in symbols.iter().enumerate() {
        conn.execute(
            "INSERT INTO symbols (partition, name, position, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                partition.as_str(),
                symbol.name,
                position as i64,
                symbol.active,
                symbol.created_at.to_rfc3339(),
            ],
        )?;
    }
    Ok(())
}

/// Swap a partition's registry and artifacts for new ones. Nothing changes
/// unless every row is written.
pub fn replace_partition(
    db: &DbConnection,
    partition: Partition,
    symbols: &[SymbolEntry],
    artifacts: &[(ArtifactKey, Vec<u8>)],
) -> DbResult<()> {
    let mut conn = db.lock();
    let tx = conn.transaction()?;

    tx.execute(
        "DELETE FROM artifacts WHERE partition = ?1",
        [partition.as_str()],
    )?;
    for (key, data) in artifacts {
        write_artifact(&tx, key, data)?;
    }
    write_symbols(&tx, partition, symbols)?;

    tx.commit()?;
    Ok(())
}

// ==================== ARTIFACT QUERIES ====================

/// Insert or overwrite an artifact
pub fn upsert_artifact(db: &DbConnection, key: &ArtifactKey, data: &[u8]) -> DbResult<()> {
    write_artifact(&db.lock(), key, data)
}

fn write_artifact(conn: &Connection, key: &ArtifactKey, data: &[u8]) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO artifacts (partition, symbol, kind, data, sha256, bytes, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            key.partition.as_str(),
            symbol_column(key),
            key.kind.as_str(),
            data,
            calculate_sha256(data),
            data.len() as i64,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(())
}

/// Get an artifact's bytes
pub fn get_artifact(db: &DbConnection, key: &ArtifactKey) -> DbResult<Option<Vec<u8>>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT data FROM artifacts
         WHERE partition = ?1 AND symbol = ?2 AND kind = ?3",
    )?;

    let result = stmt.query_row(
        params![key.partition.as_str(), symbol_column(key), key.kind.as_str()],
        |row| row.get::<_, Vec<u8>>(0),
    );

    match result {
        Ok(data) => Ok(Some(data)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete an artifact, returning whether it existed
pub fn delete_artifact(db: &DbConnection, key: &ArtifactKey) -> DbResult<bool> {
    let conn = db.lock();
    let rows = conn.execute(
        "DELETE FROM artifacts WHERE partition = ?1 AND symbol = ?2 AND kind = ?3",
        params![key.partition.as_str(), symbol_column(key), key.kind.as_str()],
    )?;

    Ok(rows > 0)
}

/// Keys of every artifact stored for a partition
pub fn list_artifacts(db: &DbConnection, partition: Partition) -> DbResult<Vec<ArtifactKey>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT symbol, kind FROM artifacts
         WHERE partition = ?1
         ORDER BY symbol ASC, kind ASC",
    )?;

    let keys = stmt
        .query_map([partition.as_str()], |row| {
            let symbol: String = row.get(0)?;
            let kind: String = row.get(1)?;
            Ok((symbol, kind))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keys
        .into_iter()
        .filter_map(|(symbol, kind)| {
            let Some(kind) = ArtifactKind::from_string(&kind) else {
                log::warn!("Skipping artifact with unknown kind '{}'", kind);
                return None;
            };
            Some(ArtifactKey {
                partition,
                symbol: (!symbol.is_empty()).then_some(symbol),
                kind,
            })
        })
        .collect())
}
