use std::str::FromStr;

use campus::database::{DatabaseError, Result};
use sqlx::postgres::PgQueryResult;

pub mod bus;
pub mod driver;
pub mod feedback;
pub mod lecturer;
pub mod location;
pub mod route;
pub mod schedule;
pub mod user;
pub mod voice_note;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Constraint names of the schema and the fields they guard.
const CONSTRAINT_FIELDS: &[(&str, &str)] = &[
    ("buses_bus_number_key", "busNumber"),
    ("buses_license_plate_key", "licensePlate"),
    ("drivers_license_number_key", "licenseNumber"),
    ("drivers_assigned_bus_id_key", "assignedBus"),
    ("drivers_assigned_bus_id_fkey", "assignedBus"),
    ("drivers_user_id_fkey", "user"),
    ("schedules_bus_id_fkey", "bus"),
    ("schedules_route_id_fkey", "route"),
    ("locations_bus_id_fkey", "bus"),
    ("lecturers_staff_id_key", "staffId"),
    ("replies_feedback_id_fkey", "feedback"),
];

fn constraint_field(constraint: Option<&str>) -> String {
    let constraint = constraint.unwrap_or_default();
    CONSTRAINT_FIELDS
        .iter()
        .find(|(name, _)| *name == constraint)
        .map(|(_, field)| (*field).to_owned())
        .unwrap_or_else(|| constraint.to_owned())
}

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                DatabaseError::UniqueViolation(constraint_field(db.constraint()))
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                DatabaseError::ForeignKeyViolation(constraint_field(db.constraint()))
            }
            _ => {
                log::error!("database error: {}", db);
                DatabaseError::Other(Box::new(sqlx::Error::Database(db)))
            }
        },
        _ => {
            log::error!("database error: {}", why);
            DatabaseError::Other(Box::new(why))
        }
    }
}

/// Parses an enum stored by its code.
pub(crate) fn parse_code<T>(code: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    T::from_str(code).map_err(|why| DatabaseError::Other(why.into()))
}

/// `%needle%` for `ILIKE`, with the wildcards of `needle` escaped.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The search needle of a filter, if it restricts anything.
pub(crate) fn search_needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
        .map(like_pattern)
}

/// Deleting a record that does not exist is an error.
pub(crate) fn deleted(result: PgQueryResult) -> Result<()> {
    if result.rows_affected() == 0 {
        Err(DatabaseError::NotFound)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_needle(Some("  ")), None);
        assert_eq!(search_needle(Some("cb")), Some("%cb%".to_owned()));
    }

    #[test]
    fn constraints_map_to_fields() {
        assert_eq!(constraint_field(Some("buses_bus_number_key")), "busNumber");
        assert_eq!(constraint_field(Some("unknown_key")), "unknown_key");
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            convert_error(sqlx::Error::RowNotFound),
            DatabaseError::NotFound
        ));
    }
}
