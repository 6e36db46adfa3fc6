//! A store kept in process memory. Used by the tests and for running the
//! service without PostgreSQL. Enforces the same unique and foreign key
//! constraints as the database schema.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    bus::{Bus, BusFilter},
    driver::{Driver, DriverFilter},
    feedback::{self, Feedback, Reply},
    lecturer::{self, Lecturer, LecturerFilter},
    location::{self, LocationFilter, LocationRecord},
    route::{Route, RouteFilter},
    schedule::{self, Schedule, ScheduleFilter},
    user::{User, UserFilter},
    voice_note::{self, VoiceNote},
    WithId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use utility::id::{HasId, Id};

use crate::database::{
    BusRepo, Database, DatabaseError, DatabaseTransaction, DriverRepo, FeedbackRepo,
    LecturerRepo, LocationRepo, Repo, Result, RouteRepo, ScheduleRepo, UserRepo,
    VoiceNoteRepo,
};

#[derive(Debug, Clone)]
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T>
where
    T: HasId<IdType = i64> + Clone,
{
    fn push(&mut self, row: T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        id
    }

    fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    fn all(&self) -> impl Iterator<Item = WithId<T>> + '_ {
        self.rows
            .iter()
            .map(|(id, row)| WithId::new(Id::new(*id), row.clone()))
    }

    fn unique<F>(&self, replacing: Option<i64>, field: &str, same: F) -> Result<()>
    where
        F: Fn(&T) -> bool,
    {
        let taken = self
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != replacing && same(row));
        if taken {
            Err(DatabaseError::UniqueViolation(field.to_owned()))
        } else {
            Ok(())
        }
    }

    fn referenced<F>(&self, field: &str, references: F) -> Result<()>
    where
        F: Fn(&T) -> bool,
    {
        if self.rows.values().any(references) {
            Err(DatabaseError::ForeignKeyViolation(field.to_owned()))
        } else {
            Ok(())
        }
    }

    fn retain<F>(&mut self, keep: F) -> u64
    where
        F: Fn(&T) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|_, row| keep(row));
        (before - self.rows.len()) as u64
    }
}

fn exists<T>(table: &Table<T>, id: i64, field: &str) -> Result<()>
where
    T: HasId<IdType = i64> + Clone,
{
    if table.contains(id) {
        Ok(())
    } else {
        Err(DatabaseError::ForeignKeyViolation(field.to_owned()))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Table<User>,
    buses: Table<Bus>,
    drivers: Table<Driver>,
    routes: Table<Route>,
    schedules: Table<Schedule>,
    locations: Table<LocationRecord>,
    lecturers: Table<Lecturer>,
    voice_notes: Table<VoiceNote>,
    feedbacks: Table<Feedback>,
    replies: Table<Reply>,
}

/// Per entity table access and constraints.
trait Stored: HasId<IdType = i64> + Clone + Send + Sync + 'static {
    fn table(state: &MemoryState) -> &Table<Self>;
    fn table_mut(state: &mut MemoryState) -> &mut Table<Self>;

    /// Unique and foreign key checks. `replacing` is the id of the updated
    /// record.
    fn check(&self, _state: &MemoryState, _replacing: Option<i64>) -> Result<()> {
        Ok(())
    }

    /// Sets store maintained fields. `previous` is the stored version on update.
    fn prepare(&mut self, _previous: Option<&Self>, _now: DateTime<Utc>) {}

    fn check_delete(_state: &MemoryState, _id: i64) -> Result<()> {
        Ok(())
    }

    fn delete_children(_state: &mut MemoryState, _id: i64) {}

    fn load(_state: &MemoryState, record: WithId<Self>) -> WithId<Self> {
        record
    }
}

impl Stored for User {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.users
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.users
    }

    fn prepare(&mut self, previous: Option<&Self>, _now: DateTime<Utc>) {
        self.is_active = previous.map_or(true, |previous| previous.is_active);
    }

    fn check_delete(state: &MemoryState, id: i64) -> Result<()> {
        state
            .drivers
            .referenced("user", |driver| driver.user.raw() == id)
    }
}

impl Stored for Bus {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.buses
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.buses
    }

    fn check(&self, state: &MemoryState, replacing: Option<i64>) -> Result<()> {
        state.buses.unique(replacing, "busNumber", |bus| {
            bus.bus_number == self.bus_number
        })?;
        state.buses.unique(replacing, "licensePlate", |bus| {
            bus.license_plate == self.license_plate
        })
    }

    fn prepare(&mut self, previous: Option<&Self>, now: DateTime<Utc>) {
        self.added_on = previous.and_then(|previous| previous.added_on).or(Some(now));
    }

    fn check_delete(state: &MemoryState, id: i64) -> Result<()> {
        state
            .drivers
            .referenced("assignedBus", |driver| {
                driver.assigned_bus.map(|bus| bus.raw()) == Some(id)
            })?;
        state
            .schedules
            .referenced("bus", |schedule| schedule.bus.raw() == id)?;
        state
            .locations
            .referenced("bus", |record| record.bus.raw() == id)
    }
}

impl Stored for Driver {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.drivers
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.drivers
    }

    fn check(&self, state: &MemoryState, replacing: Option<i64>) -> Result<()> {
        exists(&state.users, self.user.raw(), "user")?;
        if let Some(bus) = self.assigned_bus {
            exists(&state.buses, bus.raw(), "assignedBus")?;
            state.drivers.unique(replacing, "assignedBus", |driver| {
                driver.assigned_bus == Some(bus)
            })?;
        }
        state.drivers.unique(replacing, "licenseNumber", |driver| {
            driver.license_number == self.license_number
        })
    }
}

impl Stored for Route {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.routes
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.routes
    }

    fn check_delete(state: &MemoryState, id: i64) -> Result<()> {
        state
            .schedules
            .referenced("route", |schedule| schedule.route.raw() == id)
    }
}

impl Stored for Schedule {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.schedules
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.schedules
    }

    fn check(&self, state: &MemoryState, _replacing: Option<i64>) -> Result<()> {
        exists(&state.buses, self.bus.raw(), "bus")?;
        exists(&state.routes, self.route.raw(), "route")
    }
}

impl Stored for Lecturer {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.lecturers
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.lecturers
    }

    fn check(&self, state: &MemoryState, replacing: Option<i64>) -> Result<()> {
        match &self.staff_id {
            Some(staff_id) => state.lecturers.unique(replacing, "staffId", |lecturer| {
                lecturer.staff_id.as_ref() == Some(staff_id)
            }),
            None => Ok(()),
        }
    }

    fn prepare(&mut self, previous: Option<&Self>, now: DateTime<Utc>) {
        if let Some(previous) = previous {
            self.staff_id = previous.staff_id.clone();
            self.created_at = previous.created_at;
        } else {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

impl Stored for VoiceNote {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.voice_notes
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.voice_notes
    }

    fn prepare(&mut self, previous: Option<&Self>, now: DateTime<Utc>) {
        self.created_at = previous.and_then(|previous| previous.created_at).or(Some(now));
    }
}

impl Stored for Feedback {
    fn table(state: &MemoryState) -> &Table<Self> {
        &state.feedbacks
    }

    fn table_mut(state: &mut MemoryState) -> &mut Table<Self> {
        &mut state.feedbacks
    }

    fn prepare(&mut self, previous: Option<&Self>, now: DateTime<Utc>) {
        self.created_at = previous.and_then(|previous| previous.created_at).or(Some(now));
        self.replies.clear();
    }

    fn delete_children(state: &mut MemoryState, id: i64) {
        state.replies.retain(|reply| reply.feedback.raw() != id);
    }

    fn load(state: &MemoryState, mut record: WithId<Self>) -> WithId<Self> {
        let mut replies = state
            .replies
            .all()
            .filter(|reply| reply.content.feedback == record.id)
            .collect::<Vec<_>>();
        replies.sort_by(|a, b| {
            a.content
                .created_at
                .cmp(&b.content.created_at)
                .then(a.id.cmp(&b.id))
        });
        record.content.replies = replies;
        record
    }
}

fn get<T: Stored>(state: &MemoryState, id: Id<T>) -> Result<WithId<T>> {
    let row = T::table(state)
        .rows
        .get(&id.raw())
        .cloned()
        .ok_or(DatabaseError::NotFound)?;
    Ok(T::load(state, WithId::new(id, row)))
}

fn insert<T: Stored>(state: &mut MemoryState, mut element: T) -> Result<WithId<T>> {
    element.prepare(None, Utc::now());
    element.check(state, None)?;
    let id = T::table_mut(state).push(element.clone());
    Ok(T::load(state, WithId::new(Id::new(id), element)))
}

fn update<T: Stored>(state: &mut MemoryState, element: WithId<T>) -> Result<WithId<T>> {
    let id = element.id.raw();
    let previous = T::table(state)
        .rows
        .get(&id)
        .cloned()
        .ok_or(DatabaseError::NotFound)?;
    let mut content = element.content;
    content.prepare(Some(&previous), Utc::now());
    content.check(state, Some(id))?;
    T::table_mut(state).rows.insert(id, content.clone());
    Ok(T::load(state, WithId::new(element.id, content)))
}

fn delete<T: Stored>(state: &mut MemoryState, id: Id<T>) -> Result<()> {
    let id = id.raw();
    if !T::table(state).contains(id) {
        return Err(DatabaseError::NotFound);
    }
    T::check_delete(state, id)?;
    T::delete_children(state, id);
    T::table_mut(state).rows.remove(&id);
    Ok(())
}

macro_rules! memory_repo {
    ($entity:ty) => {
        #[async_trait]
        impl Repo<$entity> for MemoryTransaction {
            async fn get(&mut self, id: Id<$entity>) -> Result<WithId<$entity>> {
                get(&self.state, id)
            }

            async fn insert(&mut self, element: $entity) -> Result<WithId<$entity>> {
                insert(&mut self.state, element)
            }

            async fn update(&mut self, element: WithId<$entity>) -> Result<WithId<$entity>> {
                update(&mut self.state, element)
            }

            async fn delete(&mut self, id: Id<$entity>) -> Result<()> {
                delete(&mut self.state, id)
            }
        }
    };
}

memory_repo!(User);
memory_repo!(Bus);
memory_repo!(Driver);
memory_repo!(Route);
memory_repo!(Schedule);
memory_repo!(Lecturer);
memory_repo!(VoiceNote);
memory_repo!(Feedback);

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    top_n_queries: Arc<AtomicUsize>,
    per_bus_lookups: Arc<AtomicUsize>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of per-bus top-N selections that reached the store.
    pub fn top_n_queries(&self) -> usize {
        self.top_n_queries.load(Ordering::SeqCst)
    }

    /// Number of driver or schedule lookups restricted to a single bus.
    pub fn per_bus_lookups(&self) -> usize {
        self.per_bus_lookups.load(Ordering::SeqCst)
    }
}

/// Holds the store lock for its whole lifetime, so transactions are
/// serialized. Changes are made to a copy and written back on commit.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    state: MemoryState,
    top_n_queries: Arc<AtomicUsize>,
    per_bus_lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let guard = self.state.clone().lock_owned().await;
        let state = guard.clone();
        Ok(MemoryTransaction {
            guard,
            state,
            top_n_queries: self.top_n_queries.clone(),
            per_bus_lookups: self.per_bus_lookups.clone(),
        })
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let MemoryTransaction {
            mut guard, state, ..
        } = self;
        *guard = state;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryTransaction {
    async fn users(&mut self, filter: &UserFilter) -> Result<Vec<WithId<User>>> {
        Ok(self
            .state
            .users
            .all()
            .filter(|user| filter.matches(&user.content))
            .collect())
    }
}

#[async_trait]
impl BusRepo for MemoryTransaction {
    async fn buses(&mut self, filter: &BusFilter) -> Result<Vec<WithId<Bus>>> {
        let mut buses = self
            .state
            .buses
            .all()
            .filter(|bus| filter.matches(&bus.content))
            .collect::<Vec<_>>();
        filter.ordering.sort(&mut buses);
        Ok(buses)
    }
}

#[async_trait]
impl DriverRepo for MemoryTransaction {
    async fn drivers(&mut self, filter: &DriverFilter) -> Result<Vec<WithId<Driver>>> {
        let users = &self.state.users;
        Ok(self
            .state
            .drivers
            .all()
            .filter(|driver| {
                let user = users.rows.get(&driver.content.user.raw());
                filter.matches(&driver.content, user)
            })
            .collect())
    }

    async fn driver_of_bus(&mut self, bus: Id<Bus>) -> Result<Option<WithId<Driver>>> {
        self.per_bus_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .drivers
            .all()
            .find(|driver| driver.content.assigned_bus == Some(bus)))
    }

    async fn unassign_bus(&mut self, bus: Id<Bus>) -> Result<()> {
        for driver in self.state.drivers.rows.values_mut() {
            if driver.assigned_bus == Some(bus) {
                driver.assigned_bus = None;
            }
        }
        Ok(())
    }

    async fn delete_drivers_of_user(&mut self, user: Id<User>) -> Result<u64> {
        Ok(self.state.drivers.retain(|driver| driver.user != user))
    }
}

#[async_trait]
impl RouteRepo for MemoryTransaction {
    async fn routes(&mut self, filter: &RouteFilter) -> Result<Vec<WithId<Route>>> {
        Ok(self
            .state
            .routes
            .all()
            .filter(|route| filter.matches(&route.content))
            .collect())
    }
}

#[async_trait]
impl ScheduleRepo for MemoryTransaction {
    async fn schedules(
        &mut self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<WithId<Schedule>>> {
        if filter.bus.is_some() {
            self.per_bus_lookups.fetch_add(1, Ordering::SeqCst);
        }
        let mut schedules = self
            .state
            .schedules
            .all()
            .filter(|schedule| filter.matches(&schedule.content))
            .collect::<Vec<_>>();
        schedule::sort_by_departure(&mut schedules);
        Ok(schedules)
    }

    async fn last_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>> {
        let schedules = self.schedules(&ScheduleFilter::for_bus(bus)).await?;
        Ok(schedule::last_trip(&schedules, now).cloned())
    }

    async fn next_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>> {
        let schedules = self.schedules(&ScheduleFilter::for_bus(bus)).await?;
        Ok(schedule::next_trip(&schedules, now).cloned())
    }

    async fn delete_schedules_of_bus(&mut self, bus: Id<Bus>) -> Result<u64> {
        Ok(self.state.schedules.retain(|schedule| schedule.bus != bus))
    }

    async fn delete_schedules_of_route(&mut self, route: Id<Route>) -> Result<u64> {
        Ok(self.state.schedules.retain(|schedule| schedule.route != route))
    }
}

#[async_trait]
impl LocationRepo for MemoryTransaction {
    async fn location(
        &mut self,
        id: Id<LocationRecord>,
    ) -> Result<WithId<LocationRecord>> {
        self.state
            .locations
            .rows
            .get(&id.raw())
            .cloned()
            .map(|record| WithId::new(id, record))
            .ok_or(DatabaseError::NotFound)
    }

    async fn append_location(
        &mut self,
        mut record: LocationRecord,
    ) -> Result<WithId<LocationRecord>> {
        exists(&self.state.buses, record.bus.raw(), "bus")?;
        record.timestamp.get_or_insert_with(Utc::now);
        let id = self.state.locations.push(record.clone());
        Ok(WithId::new(Id::new(id), record))
    }

    async fn locations(
        &mut self,
        filter: &LocationFilter,
    ) -> Result<Vec<WithId<LocationRecord>>> {
        let mut records = self
            .state
            .locations
            .all()
            .filter(|record| filter.matches(&record.content))
            .collect::<Vec<_>>();
        location::sort_most_recent_first(&mut records);
        records.truncate(filter.limit);
        Ok(records)
    }

    async fn latest_locations(
        &mut self,
        buses: &[Id<Bus>],
        n: usize,
    ) -> Result<IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>>> {
        if buses.is_empty() {
            return Ok(IndexMap::new());
        }
        self.top_n_queries.fetch_add(1, Ordering::SeqCst);
        Ok(location::latest_per_bus(
            buses,
            self.state.locations.all(),
            n,
        ))
    }

    async fn delete_locations_of_bus(&mut self, bus: Id<Bus>) -> Result<u64> {
        Ok(self.state.locations.retain(|record| record.bus != bus))
    }
}

#[async_trait]
impl LecturerRepo for MemoryTransaction {
    async fn lecturers(
        &mut self,
        filter: &LecturerFilter,
    ) -> Result<Vec<WithId<Lecturer>>> {
        let mut lecturers = self
            .state
            .lecturers
            .all()
            .filter(|lecturer| filter.matches(&lecturer.content))
            .collect::<Vec<_>>();
        lecturer::sort_by_joined_date(&mut lecturers);
        Ok(lecturers)
    }
}

#[async_trait]
impl VoiceNoteRepo for MemoryTransaction {
    async fn voice_notes(&mut self) -> Result<Vec<WithId<VoiceNote>>> {
        let mut notes = self.state.voice_notes.all().collect::<Vec<_>>();
        voice_note::sort_newest_first(&mut notes);
        Ok(notes)
    }
}

#[async_trait]
impl FeedbackRepo for MemoryTransaction {
    async fn feedbacks(&mut self) -> Result<Vec<WithId<Feedback>>> {
        let state = &self.state;
        let mut feedbacks = state
            .feedbacks
            .all()
            .map(|feedback| Feedback::load(state, feedback))
            .collect::<Vec<_>>();
        feedback::sort_newest_first(&mut feedbacks);
        Ok(feedbacks)
    }

    async fn insert_reply(&mut self, mut reply: Reply) -> Result<WithId<Reply>> {
        exists(&self.state.feedbacks, reply.feedback.raw(), "feedback")?;
        reply.created_at = Some(Utc::now());
        let id = self.state.replies.push(reply.clone());
        Ok(WithId::new(Id::new(id), reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ExampleData;

    #[tokio::test]
    async fn uncommitted_changes_are_discarded() {
        let database = MemoryDatabase::new();
        {
            let mut tx = database.transaction().await.unwrap();
            tx.insert(Bus::example_data()).await.unwrap();
        }
        let mut tx = database.transaction().await.unwrap();
        assert!(tx.buses(&BusFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_changes_are_visible() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        let bus = tx.insert(Bus::example_data()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = database.transaction().await.unwrap();
        let stored: WithId<Bus> = tx.get(bus.id).await.unwrap();
        assert_eq!(stored.content.bus_number, "CB-12");
        assert!(stored.content.added_on.is_some());
    }

    #[tokio::test]
    async fn bus_number_is_unique() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        tx.insert(Bus::example_data()).await.unwrap();
        let duplicate = Bus {
            license_plate: "OTHER-1".to_owned(),
            ..Bus::example_data()
        };
        match Repo::<Bus>::insert(&mut tx, duplicate).await {
            Err(DatabaseError::UniqueViolation(field)) => assert_eq!(field, "busNumber"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn referenced_bus_cannot_be_deleted() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        let bus = tx.insert(Bus::example_data()).await.unwrap();
        tx.append_location(LocationRecord {
            bus: bus.id,
            ..LocationRecord::example_data()
        })
        .await
        .unwrap();
        assert!(matches!(
            Repo::<Bus>::delete(&mut tx, bus.id).await,
            Err(DatabaseError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn replies_are_loaded_and_deleted_with_feedback() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        let feedback = tx.insert(Feedback::example_data()).await.unwrap();
        assert!(feedback.content.replies.is_empty());
        tx.insert_reply(Reply {
            feedback: feedback.id,
            ..Reply::example_data()
        })
        .await
        .unwrap();
        let loaded: WithId<Feedback> = tx.get(feedback.id).await.unwrap();
        assert_eq!(loaded.content.replies.len(), 1);

        Repo::<Feedback>::delete(&mut tx, feedback.id).await.unwrap();
        assert!(tx.state.replies.rows.is_empty());
    }
}
