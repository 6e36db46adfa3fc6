use std::{error::Error, fmt};

use model::validation::ValidationErrors;

pub mod client;
pub mod database;
pub mod memory;

#[derive(Debug)]
pub enum RequestError {
    NotFound,
    Invalid(ValidationErrors),
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }

    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Invalid(ValidationErrors::single(field, message))
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::Invalid(errors) => write!(f, "Invalid input: {}", errors),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl Error for RequestError {}

impl From<ValidationErrors> for RequestError {
    fn from(value: ValidationErrors) -> Self {
        Self::Invalid(value)
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::UniqueViolation(field) => {
                Self::invalid(field, "A record with this value already exists.")
            }
            database::DatabaseError::ForeignKeyViolation(field) => {
                Self::invalid(field, "Referenced record does not exist.")
            }
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    if let Err(RequestError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseError;

    #[test]
    fn unique_violation_becomes_field_error() {
        let error = RequestError::from(DatabaseError::UniqueViolation("busNumber".to_owned()));
        match error {
            RequestError::Invalid(errors) => {
                assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["busNumber"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn not_found_is_none() {
        let result: RequestResult<()> = Err(RequestError::NotFound);
        assert!(matches!(not_found_to_none(result), Ok(None)));
        assert!(matches!(not_found_to_none(Ok(1)), Ok(Some(1))));
    }
}
