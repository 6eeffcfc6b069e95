//! SQLite adapter implementing both repositories over one connection.
//!
//! Timestamps are stored as RFC 3339 text. Risk levels and decisions are stored
//! by their display labels so the table reads the same as the API payloads.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{RepositoryError, StorageError};
use crate::accounts::{NewUser, User, UserId, UserRepository};
use crate::predictions::{
    NewPrediction, PredictionId, PredictionQuery, PredictionRecord, PredictionRepository,
};
use crate::scoring::{Decision, RiskLevel};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL,
        hashed_password TEXT NOT NULL,
        created_at TEXT NOT NULL,
        last_login TEXT
    );

    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_name TEXT NOT NULL,
        credit_score INTEGER NOT NULL,
        risk_level TEXT NOT NULL,
        decision TEXT NOT NULL,
        income REAL NOT NULL,
        loan_amount REAL NOT NULL,
        interest_rate REAL NOT NULL,
        employment TEXT NOT NULL,
        loan_purpose TEXT NOT NULL,
        user_id INTEGER REFERENCES users(id),
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_predictions_user
        ON predictions(user_id, timestamp DESC);
";

const USER_COLUMNS: &str = "id, email, username, hashed_password, created_at, last_login";
const PREDICTION_COLUMNS: &str = "id, client_name, credit_score, risk_level, decision, income, \
     loan_amount, interest_rate, employment, loan_purpose, user_id, timestamp";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA).map_err(StorageError::Schema)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }
}

fn unavailable(err: rusqlite::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(4)?;
    let last_login: Option<String> = row.get(5)?;
    Ok(User {
        id: UserId(row.get(0)?),
        email: row.get(1)?,
        username: row.get(2)?,
        hashed_password: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
        last_login: last_login
            .as_deref()
            .map(|raw| parse_timestamp(5, raw))
            .transpose()?,
    })
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<PredictionRecord> {
    let risk_level: String = row.get(3)?;
    let decision: String = row.get(4)?;
    let user_id: Option<i64> = row.get(10)?;
    let timestamp: String = row.get(11)?;
    Ok(PredictionRecord {
        id: PredictionId(row.get(0)?),
        client_name: row.get(1)?,
        credit_score: row.get(2)?,
        risk_level: RiskLevel::from_label(&risk_level)
            .ok_or_else(|| conversion_error(3, format!("unknown risk level '{risk_level}'")))?,
        decision: Decision::from_label(&decision)
            .ok_or_else(|| conversion_error(4, format!("unknown decision '{decision}'")))?,
        income: row.get(5)?,
        loan_amount: row.get(6)?,
        interest_rate: row.get(7)?,
        employment: row.get(8)?,
        loan_purpose: row.get(9)?,
        user_id: user_id.map(UserId),
        timestamp: parse_timestamp(11, &timestamp)?,
    })
}

impl UserRepository for SqliteStore {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (email, username, hashed_password, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.email,
                user.username,
                user.hashed_password,
                format_timestamp(user.created_at),
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Conflict
            } else {
                unavailable(err)
            }
        })?;

        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            email: user.email,
            username: user.username,
            hashed_password: user.hashed_password,
            created_at: user.created_at,
            last_login: None,
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.0],
            user_from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    fn update(&self, user: User) -> Result<(), RepositoryError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE users SET email = ?1, username = ?2, hashed_password = ?3, last_login = ?4 WHERE id = ?5",
                params![
                    user.email,
                    user.username,
                    user.hashed_password,
                    user.last_login.map(format_timestamp),
                    user.id.0,
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepositoryError::Conflict
                } else {
                    unavailable(err)
                }
            })?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl PredictionRepository for SqliteStore {
    fn insert(&self, prediction: NewPrediction) -> Result<PredictionRecord, RepositoryError> {
        let conn = self.lock()?;
        let timestamp = Utc::now();
        conn.execute(
            r"
            INSERT INTO predictions (
                client_name, credit_score, risk_level, decision, income, loan_amount,
                interest_rate, employment, loan_purpose, user_id, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                prediction.client_name,
                prediction.credit_score,
                prediction.risk_level.label(),
                prediction.decision.label(),
                prediction.income,
                prediction.loan_amount,
                prediction.interest_rate,
                prediction.employment,
                prediction.loan_purpose,
                prediction.user_id.map(|id| id.0),
                format_timestamp(timestamp),
            ],
        )
        .map_err(unavailable)?;

        let id = PredictionId(conn.last_insert_rowid());
        debug!(prediction_id = id.0, "stored prediction");
        Ok(PredictionRecord::from_new(id, prediction, timestamp))
    }

    fn list_for_user(
        &self,
        user_id: UserId,
        query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let conn = self.lock()?;
        // Column and direction come from closed enums, never from raw input.
        let sql = format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = ?1 \
             ORDER BY {column} {direction}, id {direction} LIMIT ?2 OFFSET ?3",
            column = query.order_by.column(),
            direction = query.direction.keyword(),
        );
        let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
        let records = stmt
            .query_map(
                params![user_id.0, query.limit as i64, query.skip as i64],
                prediction_from_row,
            )
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)?;
        Ok(records)
    }

    fn count_for_user(&self, user_id: UserId) -> Result<usize, RepositoryError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM predictions WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .map_err(unavailable)?;
        Ok(count as usize)
    }

    fn fetch(&self, id: PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = ?1"),
            params![id.0],
            prediction_from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    fn delete(&self, id: PredictionId, user_id: UserId) -> Result<(), RepositoryError> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM predictions WHERE id = ?1 AND user_id = ?2",
                params![id.0, user_id.0],
            )
            .map_err(unavailable)?;
        if removed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
