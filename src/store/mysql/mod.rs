use std::str::FromStr;

use crate::error::AppError;

mod attendance;
mod directory;
mod payroll;

pub use attendance::MySqlAttendanceStore;
pub use directory::MySqlDirectory;
pub use payroll::MySqlPayrollStore;

/// MySQL reports unique key violations as SQLSTATE 23000.
pub(crate) fn is_duplicate_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

/// Enum columns are stored as their snake_case names.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, AppError>
where
    T: FromStr<Err = strum::ParseError>,
{
    T::from_str(value).map_err(|e| AppError::Database(sqlx::Error::Decode(Box::new(e))))
}
