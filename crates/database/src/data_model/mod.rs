use campus::database::Result;
use model::WithId;
use utility::id::{HasId, Id};

pub mod bus;
pub mod driver;
pub mod feedback;
pub mod lecturer;
pub mod location;
pub mod route;
pub mod schedule;
pub mod user;
pub mod voice_note;

/// A row of a table which maps to a model with a numeric id.
pub trait DatabaseRow {
    type Model: HasId<IdType = i64>;

    fn get_id(&self) -> Id<Self::Model>;
    /// Fails if a stored code can not be parsed.
    fn to_model(self) -> Result<Self::Model>;
}

pub fn with_ids<R: DatabaseRow>(rows: Vec<R>) -> Result<Vec<WithId<R::Model>>> {
    rows.into_iter().map(with_id).collect()
}

pub fn with_id<R: DatabaseRow>(row: R) -> Result<WithId<R::Model>> {
    let id = row.get_id();
    Ok(WithId::new(id, row.to_model()?))
}
