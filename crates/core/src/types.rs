/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Users are addressed by their database id.
pub type UserId = DbId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
