use std::{error, fmt, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    bus::{Bus, BusFilter},
    driver::{Driver, DriverFilter},
    feedback::{Feedback, Reply},
    lecturer::{Lecturer, LecturerFilter},
    location::{LocationFilter, LocationRecord},
    route::{Route, RouteFilter},
    schedule::{Schedule, ScheduleFilter},
    user::{User, UserFilter},
    voice_note::VoiceNote,
    WithId,
};
use utility::id::{HasId, Id};

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    /// A unique constraint failed. Carries the (wire) name of the field.
    UniqueViolation(String),
    /// A referenced record does not exist, or a record is still referenced.
    /// Carries the (wire) name of the field.
    ForeignKeyViolation(String),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::UniqueViolation(field) => {
                write!(f, "unique constraint violated on '{}'", field)
            }
            Self::ForeignKeyViolation(field) => {
                write!(f, "foreign key constraint violated on '{}'", field)
            }
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl error::Error for DatabaseError {}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait Repo<T>
where
    T: HasId<IdType = i64> + Send + Sync + 'static,
{
    async fn get(&mut self, id: Id<T>) -> Result<WithId<T>>;
    async fn insert(&mut self, element: T) -> Result<WithId<T>>;
    /// Replaces all writable fields. Read only fields (creation timestamps,
    /// generated identifiers) are kept.
    async fn update(&mut self, element: WithId<T>) -> Result<WithId<T>>;
    async fn delete(&mut self, id: Id<T>) -> Result<()>;
}

#[async_trait]
pub trait UserRepo: Repo<User> {
    async fn users(&mut self, filter: &UserFilter) -> Result<Vec<WithId<User>>>;
}

#[async_trait]
pub trait BusRepo: Repo<Bus> {
    async fn buses(&mut self, filter: &BusFilter) -> Result<Vec<WithId<Bus>>>;
}

#[async_trait]
pub trait DriverRepo: Repo<Driver> {
    async fn drivers(&mut self, filter: &DriverFilter) -> Result<Vec<WithId<Driver>>>;

    async fn driver_of_bus(&mut self, bus: Id<Bus>) -> Result<Option<WithId<Driver>>>;

    /// Clears `assigned_bus` of the driver assigned to `bus`, if any.
    async fn unassign_bus(&mut self, bus: Id<Bus>) -> Result<()>;

    async fn delete_drivers_of_user(&mut self, user: Id<User>) -> Result<u64>;
}

#[async_trait]
pub trait RouteRepo: Repo<Route> {
    async fn routes(&mut self, filter: &RouteFilter) -> Result<Vec<WithId<Route>>>;
}

#[async_trait]
pub trait ScheduleRepo: Repo<Schedule> {
    /// Schedules ordered by departure.
    async fn schedules(
        &mut self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<WithId<Schedule>>>;

    /// Latest departure strictly before `now`.
    async fn last_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>>;

    /// Earliest departure at or after `now`.
    async fn next_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>>;

    async fn delete_schedules_of_bus(&mut self, bus: Id<Bus>) -> Result<u64>;

    async fn delete_schedules_of_route(&mut self, route: Id<Route>) -> Result<u64>;
}

/// Location history is append only, thus there is no `update`.
#[async_trait]
pub trait LocationRepo {
    async fn location(
        &mut self,
        id: Id<LocationRecord>,
    ) -> Result<WithId<LocationRecord>>;

    /// `record.timestamp` must be set.
    async fn append_location(
        &mut self,
        record: LocationRecord,
    ) -> Result<WithId<LocationRecord>>;

    /// Most recent first, at most `filter.limit` records.
    async fn locations(
        &mut self,
        filter: &LocationFilter,
    ) -> Result<Vec<WithId<LocationRecord>>>;

    /// The `n` most recent records of each bus in `buses`. Every requested bus
    /// is a key of the result, in request order.
    ///
    /// Implementations should not touch the store when `buses` is empty.
    async fn latest_locations(
        &mut self,
        buses: &[Id<Bus>],
        n: usize,
    ) -> Result<IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>>>;

    async fn delete_locations_of_bus(&mut self, bus: Id<Bus>) -> Result<u64>;
}

#[async_trait]
pub trait LecturerRepo: Repo<Lecturer> {
    /// Most recently joined first.
    async fn lecturers(
        &mut self,
        filter: &LecturerFilter,
    ) -> Result<Vec<WithId<Lecturer>>>;
}

#[async_trait]
pub trait VoiceNoteRepo: Repo<VoiceNote> {
    /// Newest first.
    async fn voice_notes(&mut self) -> Result<Vec<WithId<VoiceNote>>>;
}

/// Feedbacks are read with their replies, deleting a feedback deletes its
/// replies.
#[async_trait]
pub trait FeedbackRepo: Repo<Feedback> {
    /// Newest first.
    async fn feedbacks(&mut self) -> Result<Vec<WithId<Feedback>>>;

    async fn insert_reply(&mut self, reply: Reply) -> Result<WithId<Reply>>;
}

#[async_trait]
pub trait DatabaseOperations:
    UserRepo
    + BusRepo
    + DriverRepo
    + RouteRepo
    + ScheduleRepo
    + LocationRepo
    + LecturerRepo
    + VoiceNoteRepo
    + FeedbackRepo
{
}

impl<T> DatabaseOperations for T where
    T: UserRepo
        + BusRepo
        + DriverRepo
        + RouteRepo
        + ScheduleRepo
        + LocationRepo
        + LecturerRepo
        + VoiceNoteRepo
        + FeedbackRepo
{
}

/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

/// trait to implement a campus database.
/// multiple concurrent accesses should be possible by e.g. cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;
}
