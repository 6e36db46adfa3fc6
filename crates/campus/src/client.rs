use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    bus::{Bus, BusFilter, BusOrdering},
    driver::{Driver, DriverFilter},
    feedback::{Feedback, Reply},
    lecturer::{Lecturer, LecturerFilter},
    location::{LocationFilter, LocationRecord, MAX_RECENT_LOCATIONS},
    overview::{BusOverview, BusOverviewDetail, BusWithTrips, DriverSummary, ScheduleSummary},
    route::{Route, RouteFilter},
    schedule::{self, Schedule, ScheduleFilter},
    user::{User, UserFilter},
    validation::{Validate, ValidationErrors},
    voice_note::VoiceNote,
    WithId,
};
use utility::{
    id::{HasId, Id},
    let_also::LetAlso,
};

use crate::{
    database::{
        BusRepo, Database, DatabaseError, DatabaseOperations, DatabaseTransaction,
        DriverRepo, FeedbackRepo, LecturerRepo, LocationRepo, Repo, RouteRepo,
        ScheduleRepo, UserRepo, VoiceNoteRepo,
    },
    not_found_to_none, RequestError, RequestResult,
};

/// Staff ids are random, a collision is retried this many times in total.
const STAFF_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database,
{
    pub database: D,
}

impl<D> Client<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self { database }
    }

    async fn get<T>(&self, id: Id<T>) -> RequestResult<WithId<T>>
    where
        T: HasId<IdType = i64> + Send + Sync + 'static,
        D::Transaction: Repo<T>,
    {
        let mut tx = self.database.transaction().await?;
        Ok(Repo::<T>::get(&mut tx, id).await?)
    }

    async fn create<T>(&self, element: T) -> RequestResult<WithId<T>>
    where
        T: HasId<IdType = i64> + Validate + Send + Sync + 'static,
        D::Transaction: Repo<T>,
    {
        element.validate()?;
        let mut tx = self.database.transaction().await?;
        let created = Repo::<T>::insert(&mut tx, element).await?;
        tx.commit().await?;
        log::debug!("created {} {}", std::any::type_name::<T>(), created.id);
        Ok(created)
    }

    async fn replace<T>(&self, element: WithId<T>) -> RequestResult<WithId<T>>
    where
        T: HasId<IdType = i64> + Validate + Send + Sync + 'static,
        D::Transaction: Repo<T>,
    {
        element.content.validate()?;
        let mut tx = self.database.transaction().await?;
        let updated = Repo::<T>::update(&mut tx, element).await?;
        tx.commit().await?;
        log::debug!("updated {} {}", std::any::type_name::<T>(), updated.id);
        Ok(updated)
    }

    async fn remove<T>(&self, id: Id<T>) -> RequestResult<()>
    where
        T: HasId<IdType = i64> + Send + Sync + 'static,
        D::Transaction: Repo<T>,
    {
        let mut tx = self.database.transaction().await?;
        Repo::<T>::delete(&mut tx, id).await?;
        tx.commit().await?;
        log::debug!("deleted {} {}", std::any::type_name::<T>(), id);
        Ok(())
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_users(&self, filter: &UserFilter) -> RequestResult<Vec<WithId<User>>> {
        Ok(self.database.transaction().await?.users(filter).await?)
    }

    pub async fn get_user(&self, id: Id<User>) -> RequestResult<WithId<User>> {
        self.get(id).await
    }

    pub async fn create_user(&self, user: User) -> RequestResult<WithId<User>> {
        self.create(user).await
    }

    pub async fn update_user(&self, user: WithId<User>) -> RequestResult<WithId<User>> {
        self.replace(user).await
    }

    /// Deletes the user together with its driver profiles.
    pub async fn delete_user(&self, id: Id<User>) -> RequestResult<()> {
        let mut tx = self.database.transaction().await?;
        Repo::<User>::get(&mut tx, id).await?;
        let drivers = tx.delete_drivers_of_user(id).await?;
        Repo::<User>::delete(&mut tx, id).await?;
        tx.commit().await?;
        log::info!("deleted user {} and {} driver profile(s)", id, drivers);
        Ok(())
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_buses(&self, filter: &BusFilter) -> RequestResult<Vec<WithId<Bus>>> {
        Ok(self.database.transaction().await?.buses(filter).await?)
    }

    pub async fn get_bus(&self, id: Id<Bus>) -> RequestResult<WithId<Bus>> {
        self.get(id).await
    }

    /// The bus with its driver and its last and next trip relative to `now`.
    pub async fn get_bus_with_trips(
        &self,
        id: Id<Bus>,
        now: DateTime<Utc>,
    ) -> RequestResult<BusWithTrips> {
        let mut tx = self.database.transaction().await?;
        let bus = Repo::<Bus>::get(&mut tx, id).await?;
        Ok(BusWithTrips {
            driver: tx.driver_of_bus(id).await?,
            last_trip: tx.last_trip(id, now).await?,
            next_trip: tx.next_trip(id, now).await?,
            bus,
        })
    }

    pub async fn create_bus(&self, bus: Bus) -> RequestResult<WithId<Bus>> {
        self.create(bus).await
    }

    pub async fn update_bus(&self, bus: WithId<Bus>) -> RequestResult<WithId<Bus>> {
        self.replace(bus).await
    }

    /// Deletes the bus with its schedules and location history. Its driver is
    /// kept without an assigned bus.
    pub async fn delete_bus(&self, id: Id<Bus>) -> RequestResult<()> {
        let mut tx = self.database.transaction().await?;
        Repo::<Bus>::get(&mut tx, id).await?;
        tx.unassign_bus(id).await?;
        let locations = tx.delete_locations_of_bus(id).await?;
        let schedules = tx.delete_schedules_of_bus(id).await?;
        Repo::<Bus>::delete(&mut tx, id).await?;
        tx.commit().await?;
        log::info!(
            "deleted bus {} with {} schedule(s) and {} location record(s)",
            id,
            schedules,
            locations
        );
        Ok(())
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_drivers(
        &self,
        filter: &DriverFilter,
    ) -> RequestResult<Vec<WithId<Driver>>> {
        Ok(self.database.transaction().await?.drivers(filter).await?)
    }

    pub async fn get_driver(&self, id: Id<Driver>) -> RequestResult<WithId<Driver>> {
        self.get(id).await
    }

    pub async fn create_driver(&self, driver: Driver) -> RequestResult<WithId<Driver>> {
        self.create(driver).await
    }

    pub async fn update_driver(&self, driver: WithId<Driver>) -> RequestResult<WithId<Driver>> {
        self.replace(driver).await
    }

    pub async fn delete_driver(&self, id: Id<Driver>) -> RequestResult<()> {
        self.remove(id).await
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_routes(&self, filter: &RouteFilter) -> RequestResult<Vec<WithId<Route>>> {
        Ok(self.database.transaction().await?.routes(filter).await?)
    }

    pub async fn get_route(&self, id: Id<Route>) -> RequestResult<WithId<Route>> {
        self.get(id).await
    }

    pub async fn create_route(&self, route: Route) -> RequestResult<WithId<Route>> {
        self.create(route).await
    }

    pub async fn update_route(&self, route: WithId<Route>) -> RequestResult<WithId<Route>> {
        self.replace(route).await
    }

    /// Deletes the route and every schedule running on it.
    pub async fn delete_route(&self, id: Id<Route>) -> RequestResult<()> {
        let mut tx = self.database.transaction().await?;
        Repo::<Route>::get(&mut tx, id).await?;
        let schedules = tx.delete_schedules_of_route(id).await?;
        Repo::<Route>::delete(&mut tx, id).await?;
        tx.commit().await?;
        log::info!("deleted route {} with {} schedule(s)", id, schedules);
        Ok(())
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_schedules(
        &self,
        filter: &ScheduleFilter,
    ) -> RequestResult<Vec<WithId<Schedule>>> {
        Ok(self.database.transaction().await?.schedules(filter).await?)
    }

    pub async fn get_schedule(&self, id: Id<Schedule>) -> RequestResult<WithId<Schedule>> {
        self.get(id).await
    }

    pub async fn create_schedule(&self, schedule: Schedule) -> RequestResult<WithId<Schedule>> {
        self.create(schedule).await
    }

    /// Replaces the schedule including all of its stop times.
    pub async fn update_schedule(
        &self,
        schedule: WithId<Schedule>,
    ) -> RequestResult<WithId<Schedule>> {
        self.replace(schedule).await
    }

    pub async fn delete_schedule(&self, id: Id<Schedule>) -> RequestResult<()> {
        self.remove(id).await
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_locations(
        &self,
        filter: &LocationFilter,
    ) -> RequestResult<Vec<WithId<LocationRecord>>> {
        filter.validate()?;
        Ok(self.database.transaction().await?.locations(filter).await?)
    }

    pub async fn get_location(
        &self,
        id: Id<LocationRecord>,
    ) -> RequestResult<WithId<LocationRecord>> {
        Ok(self.database.transaction().await?.location(id).await?)
    }

    /// Appends a record to the history of its bus. Without a timestamp the
    /// record is stamped with `now`.
    pub async fn create_location(
        &self,
        mut record: LocationRecord,
        now: DateTime<Utc>,
    ) -> RequestResult<WithId<LocationRecord>> {
        record.validate()?;
        record.timestamp.get_or_insert(now);
        let mut tx = self.database.transaction().await?;
        let created = tx.append_location(record).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// The `n` most recent location records of each of the given buses.
    /// No store query is made for an empty set of buses.
    pub async fn get_latest_locations(
        &self,
        buses: &[Id<Bus>],
        n: usize,
    ) -> RequestResult<IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>>> {
        validate_recent_locations(n)?;
        if buses.is_empty() {
            return Ok(IndexMap::new());
        }
        Ok(self
            .database
            .transaction()
            .await?
            .latest_locations(buses, n)
            .await?)
    }
}

fn validate_recent_locations(n: usize) -> Result<(), ValidationErrors> {
    if n == 0 || n > MAX_RECENT_LOCATIONS {
        Err(ValidationErrors::single(
            "locations",
            format!(
                "Ensure this value is between 1 and {}.",
                MAX_RECENT_LOCATIONS
            ),
        ))
    } else {
        Ok(())
    }
}

impl<D> Client<D>
where
    D: Database,
{
    /// Every bus ordered by bus number, each with its driver, its schedules and
    /// its `n` most recent locations. The number of store queries does not
    /// depend on the number of buses.
    pub async fn get_bus_overviews(&self, n: usize) -> RequestResult<Vec<BusOverview>> {
        validate_recent_locations(n)?;
        let mut tx = self.database.transaction().await?;
        let buses = tx
            .buses(&BusFilter {
                ordering: BusOrdering::BusNumber,
                ..Default::default()
            })
            .await?;
        let ids = buses.iter().map(|bus| bus.id).collect::<Vec<_>>();
        let mut locations = if ids.is_empty() {
            IndexMap::new()
        } else {
            tx.latest_locations(&ids, n).await?
        };
        let routes = routes_by_id(&mut tx).await?;
        let mut drivers = drivers_by_bus(&mut tx).await?;
        let mut schedules = tx
            .schedules(&ScheduleFilter::default())
            .await?
            .into_iter()
            .fold(HashMap::<_, Vec<_>>::new(), |mut by_bus, schedule| {
                by_bus
                    .entry(schedule.content.bus)
                    .or_default()
                    .push(summarize(schedule, &routes));
                by_bus
            });

        let overviews = buses
            .into_iter()
            .map(|bus| BusOverview {
                locations: locations.swap_remove(&bus.id).unwrap_or_default(),
                driver: drivers.remove(&bus.id),
                schedules: schedules.remove(&bus.id).unwrap_or_default(),
                bus,
            })
            .collect();
        Ok(overviews)
    }

    /// One bus with its driver, schedules, full location history and its last
    /// and next trip relative to `now`.
    pub async fn get_bus_overview(
        &self,
        id: Id<Bus>,
        now: DateTime<Utc>,
    ) -> RequestResult<BusOverviewDetail> {
        let mut tx = self.database.transaction().await?;
        let bus = Repo::<Bus>::get(&mut tx, id).await?;
        let driver = driver_summary(&mut tx, id).await?;
        let routes = routes_by_id(&mut tx).await?;
        let schedules = tx.schedules(&ScheduleFilter::for_bus(id)).await?;
        let last_trip = schedule::last_trip(&schedules, now)
            .cloned()
            .map(|trip| summarize(trip, &routes));
        let next_trip = schedule::next_trip(&schedules, now)
            .cloned()
            .map(|trip| summarize(trip, &routes));
        let locations = tx
            .locations(&LocationFilter {
                bus_id: Some(id),
                limit: usize::MAX,
            })
            .await?;
        Ok(BusOverviewDetail {
            overview: BusOverview {
                bus,
                driver,
                schedules: schedules
                    .into_iter()
                    .map(|schedule| summarize(schedule, &routes))
                    .collect(),
                locations,
            },
            last_trip,
            next_trip,
        })
    }
}

async fn routes_by_id<T>(tx: &mut T) -> RequestResult<HashMap<Id<Route>, Route>>
where
    T: DatabaseOperations + Send,
{
    tx.routes(&RouteFilter::default())
        .await?
        .into_iter()
        .map(|route| (route.id, route.content))
        .collect::<HashMap<_, _>>()
        .let_owned(Ok)
}

/// Summaries of all drivers with an assigned bus, keyed by that bus.
async fn drivers_by_bus<T>(tx: &mut T) -> RequestResult<HashMap<Id<Bus>, DriverSummary>>
where
    T: DatabaseOperations + Send,
{
    let users = tx
        .users(&UserFilter::default())
        .await?
        .into_iter()
        .map(|user| (user.id, user.content))
        .collect::<HashMap<_, _>>();
    Ok(tx
        .drivers(&DriverFilter::default())
        .await?
        .into_iter()
        .filter_map(|driver| {
            let bus = driver.content.assigned_bus?;
            let user = users.get(&driver.content.user);
            Some((bus, DriverSummary::new(&driver, user)))
        })
        .collect())
}

async fn driver_summary<T>(tx: &mut T, bus: Id<Bus>) -> RequestResult<Option<DriverSummary>>
where
    T: DatabaseOperations + Send,
{
    let Some(driver) = tx.driver_of_bus(bus).await? else {
        return Ok(None);
    };
    let user = not_found_to_none(
        Repo::<User>::get(tx, driver.content.user)
            .await
            .map_err(RequestError::from),
    )?;
    Ok(Some(DriverSummary::new(
        &driver,
        user.as_ref().map(|user| &user.content),
    )))
}

fn summarize(schedule: WithId<Schedule>, routes: &HashMap<Id<Route>, Route>) -> ScheduleSummary {
    let route = routes.get(&schedule.content.route);
    ScheduleSummary::new(schedule, route)
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_lecturers(
        &self,
        filter: &LecturerFilter,
    ) -> RequestResult<Vec<WithId<Lecturer>>> {
        Ok(self.database.transaction().await?.lecturers(filter).await?)
    }

    pub async fn get_lecturer(&self, id: Id<Lecturer>) -> RequestResult<WithId<Lecturer>> {
        self.get(id).await
    }

    /// Creates the lecturer with a freshly generated staff id.
    pub async fn create_lecturer(&self, lecturer: Lecturer) -> RequestResult<WithId<Lecturer>> {
        self.create_lecturer_with(lecturer, Lecturer::generate_staff_id)
            .await
    }

    async fn create_lecturer_with<G>(
        &self,
        mut lecturer: Lecturer,
        mut generate_staff_id: G,
    ) -> RequestResult<WithId<Lecturer>>
    where
        G: FnMut(&str) -> String + Send,
    {
        lecturer.validate()?;
        let mut attempt = 1;
        loop {
            lecturer.staff_id = Some(generate_staff_id(&lecturer.department_name));
            // a failed insert may leave the transaction unusable, so every
            // attempt gets its own
            let mut tx = self.database.transaction().await?;
            match Repo::<Lecturer>::insert(&mut tx, lecturer.clone()).await {
                Ok(created) => {
                    tx.commit().await?;
                    log::info!(
                        "created lecturer {} with staff id {:?}",
                        created.id,
                        created.content.staff_id
                    );
                    return Ok(created);
                }
                Err(DatabaseError::UniqueViolation(field))
                    if field == "staffId" && attempt < STAFF_ID_ATTEMPTS =>
                {
                    log::debug!(
                        "staff id {:?} already taken (attempt {})",
                        lecturer.staff_id,
                        attempt
                    );
                    attempt += 1;
                }
                Err(why) => return Err(why.into()),
            }
        }
    }

    /// The staff id is kept as is.
    pub async fn update_lecturer(
        &self,
        lecturer: WithId<Lecturer>,
    ) -> RequestResult<WithId<Lecturer>> {
        self.replace(lecturer).await
    }

    pub async fn delete_lecturer(&self, id: Id<Lecturer>) -> RequestResult<()> {
        self.remove(id).await
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_voice_notes(&self) -> RequestResult<Vec<WithId<VoiceNote>>> {
        Ok(self.database.transaction().await?.voice_notes().await?)
    }

    pub async fn get_voice_note(&self, id: Id<VoiceNote>) -> RequestResult<WithId<VoiceNote>> {
        self.get(id).await
    }

    pub async fn create_voice_note(&self, note: VoiceNote) -> RequestResult<WithId<VoiceNote>> {
        self.create(note).await
    }

    pub async fn update_voice_note(
        &self,
        note: WithId<VoiceNote>,
    ) -> RequestResult<WithId<VoiceNote>> {
        self.replace(note).await
    }

    pub async fn delete_voice_note(&self, id: Id<VoiceNote>) -> RequestResult<()> {
        self.remove(id).await
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_feedbacks(&self) -> RequestResult<Vec<WithId<Feedback>>> {
        Ok(self.database.transaction().await?.feedbacks().await?)
    }

    pub async fn get_feedback(&self, id: Id<Feedback>) -> RequestResult<WithId<Feedback>> {
        self.get(id).await
    }

    pub async fn create_feedback(&self, feedback: Feedback) -> RequestResult<WithId<Feedback>> {
        self.create(feedback).await
    }

    pub async fn update_feedback(
        &self,
        feedback: WithId<Feedback>,
    ) -> RequestResult<WithId<Feedback>> {
        self.replace(feedback).await
    }

    /// Deletes the feedback with all of its replies.
    pub async fn delete_feedback(&self, id: Id<Feedback>) -> RequestResult<()> {
        self.remove(id).await
    }

    pub async fn create_reply(
        &self,
        feedback: Id<Feedback>,
        mut reply: Reply,
    ) -> RequestResult<WithId<Reply>> {
        reply.feedback = feedback;
        reply.validate()?;
        let mut tx = self.database.transaction().await?;
        Repo::<Feedback>::get(&mut tx, feedback).await?;
        let created = tx.insert_reply(reply).await?;
        tx.commit().await?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use model::{
        location::LocationStatus,
        schedule::{StopStatus, StopTime},
        ExampleData,
    };

    use super::*;
    use crate::memory::MemoryDatabase;

    fn client() -> Client<MemoryDatabase> {
        Client::new(MemoryDatabase::new())
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 14, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn bus(number: &str) -> Bus {
        Bus {
            bus_number: number.to_owned(),
            license_plate: format!("LP-{}", number),
            ..Bus::example_data()
        }
    }

    fn schedule_at(bus: Id<Bus>, route: Id<Route>, departure: DateTime<Utc>) -> Schedule {
        Schedule {
            bus,
            route,
            departure_time: departure,
            arrival_time: departure + Duration::minutes(20),
            ..Schedule::example_data()
        }
    }

    fn location_at(bus: Id<Bus>, timestamp: DateTime<Utc>) -> LocationRecord {
        LocationRecord {
            bus,
            timestamp: Some(timestamp),
            ..LocationRecord::example_data()
        }
    }

    fn field_errors(result: RequestResult<impl std::fmt::Debug>) -> Vec<String> {
        match result {
            Err(RequestError::Invalid(errors)) => errors.fields().map(str::to_owned).collect(),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn deleting_a_bus_cascades() {
        let client = client();
        let user = client.create_user(User::example_data()).await.unwrap();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        let driver = client
            .create_driver(Driver {
                user: user.id,
                assigned_bus: Some(bus.id),
                ..Driver::example_data()
            })
            .await
            .unwrap();
        client
            .create_schedule(schedule_at(bus.id, route.id, at(0)))
            .await
            .unwrap();
        client
            .create_location(location_at(bus.id, at(0)), at(0))
            .await
            .unwrap();

        client.delete_bus(bus.id).await.unwrap();

        assert!(matches!(
            client.get_bus(bus.id).await,
            Err(RequestError::NotFound)
        ));
        assert!(client
            .get_schedules(&ScheduleFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(client
            .get_locations(&LocationFilter::default())
            .await
            .unwrap()
            .is_empty());
        let driver = client.get_driver(driver.id).await.unwrap();
        assert_eq!(driver.content.assigned_bus, None);
    }

    #[tokio::test]
    async fn deleting_a_user_deletes_driver_profiles() {
        let client = client();
        let user = client.create_user(User::example_data()).await.unwrap();
        let driver = client
            .create_driver(Driver {
                user: user.id,
                assigned_bus: None,
                ..Driver::example_data()
            })
            .await
            .unwrap();
        client.delete_user(user.id).await.unwrap();
        assert!(matches!(
            client.get_driver(driver.id).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_a_route_deletes_its_schedules() {
        let client = client();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        client
            .create_schedule(schedule_at(bus.id, route.id, at(0)))
            .await
            .unwrap();
        client.delete_route(route.id).await.unwrap();
        assert!(client
            .get_schedules(&ScheduleFilter::for_bus(bus.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_bus_number_is_a_field_error() {
        let client = client();
        client.create_bus(bus("CB-1")).await.unwrap();
        let duplicate = Bus {
            license_plate: "OTHER".to_owned(),
            ..bus("CB-1")
        };
        assert_eq!(field_errors(client.create_bus(duplicate).await), vec!["busNumber"]);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let client = client();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let record = LocationRecord {
            latitude: 91.0,
            longitude: -181.0,
            ..location_at(bus.id, at(0))
        };
        assert_eq!(
            field_errors(client.create_location(record, at(0)).await),
            vec!["latitude", "longitude"]
        );
    }

    #[tokio::test]
    async fn a_bus_has_at_most_one_driver() {
        let client = client();
        let user = client.create_user(User::example_data()).await.unwrap();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        client
            .create_driver(Driver {
                user: user.id,
                assigned_bus: Some(bus.id),
                ..Driver::example_data()
            })
            .await
            .unwrap();
        let second = Driver {
            user: user.id,
            license_number: "C7654321".to_owned(),
            assigned_bus: Some(bus.id),
            ..Driver::example_data()
        };
        assert_eq!(field_errors(client.create_driver(second).await), vec!["assignedBus"]);
    }

    #[tokio::test]
    async fn unknown_references_are_field_errors() {
        let client = client();
        let schedule = schedule_at(Id::new(42), Id::new(7), at(0));
        assert_eq!(field_errors(client.create_schedule(schedule).await), vec!["bus"]);
    }

    #[tokio::test]
    async fn location_without_timestamp_is_stamped() {
        let client = client();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let record = LocationRecord {
            timestamp: None,
            status: LocationStatus::Scheduled,
            ..location_at(bus.id, at(0))
        };
        let created = client.create_location(record, at(5)).await.unwrap();
        assert_eq!(created.content.timestamp, Some(at(5)));
    }

    #[tokio::test]
    async fn latest_locations_per_bus() {
        let client = client();
        let first = client.create_bus(bus("CB-1")).await.unwrap();
        let second = client.create_bus(bus("CB-2")).await.unwrap();
        let idle = client.create_bus(bus("CB-3")).await.unwrap();
        for minute in 0..5 {
            client
                .create_location(location_at(first.id, at(minute)), at(minute))
                .await
                .unwrap();
        }
        client
            .create_location(location_at(second.id, at(0)), at(0))
            .await
            .unwrap();

        let latest = client
            .get_latest_locations(&[first.id, second.id, idle.id], 3)
            .await
            .unwrap();

        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), vec![first.id, second.id, idle.id]);
        let timestamps = latest[&first.id]
            .iter()
            .map(|record| record.content.timestamp)
            .collect::<Vec<_>>();
        assert_eq!(timestamps, vec![Some(at(4)), Some(at(3)), Some(at(2))]);
        assert_eq!(latest[&second.id].len(), 1);
        assert!(latest[&idle.id].is_empty());
    }

    #[tokio::test]
    async fn empty_bus_set_makes_no_query() {
        let database = MemoryDatabase::new();
        let client = Client::new(database.clone());
        let latest = client.get_latest_locations(&[], 10).await.unwrap();
        assert!(latest.is_empty());
        assert_eq!(database.top_n_queries(), 0);

        let overviews = client.get_bus_overviews(10).await.unwrap();
        assert!(overviews.is_empty());
        assert_eq!(database.top_n_queries(), 0);
    }

    #[tokio::test]
    async fn recent_location_bound_is_validated() {
        let client = client();
        assert_eq!(
            field_errors(client.get_latest_locations(&[Id::new(1)], 0).await),
            vec!["locations"]
        );
        assert_eq!(
            field_errors(client.get_bus_overviews(101).await),
            vec!["locations"]
        );
    }

    #[tokio::test]
    async fn last_and_next_trip() {
        let client = client();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        let earlier = client
            .create_schedule(schedule_at(bus.id, route.id, at(-60)))
            .await
            .unwrap();
        let later = client
            .create_schedule(schedule_at(bus.id, route.id, at(60)))
            .await
            .unwrap();

        let with_trips = client.get_bus_with_trips(bus.id, at(0)).await.unwrap();
        assert_eq!(with_trips.last_trip.map(|trip| trip.id), Some(earlier.id));
        assert_eq!(with_trips.next_trip.map(|trip| trip.id), Some(later.id));

        let with_trips = client.get_bus_with_trips(bus.id, at(120)).await.unwrap();
        assert_eq!(with_trips.last_trip.map(|trip| trip.id), Some(later.id));
        assert!(with_trips.next_trip.is_none());
    }

    #[tokio::test]
    async fn bus_overviews_are_ordered_by_bus_number() {
        let client = client();
        let user = client.create_user(User::example_data()).await.unwrap();
        let second = client.create_bus(bus("CB-2")).await.unwrap();
        let first = client.create_bus(bus("CB-1")).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        client
            .create_driver(Driver {
                user: user.id,
                assigned_bus: Some(second.id),
                ..Driver::example_data()
            })
            .await
            .unwrap();
        client
            .create_schedule(schedule_at(second.id, route.id, at(30)))
            .await
            .unwrap();
        for minute in 0..3 {
            client
                .create_location(location_at(second.id, at(minute)), at(minute))
                .await
                .unwrap();
        }

        let overviews = client.get_bus_overviews(2).await.unwrap();
        assert_eq!(
            overviews.iter().map(|o| o.bus.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert!(overviews[0].driver.is_none());
        assert!(overviews[0].locations.is_empty());
        let overview = &overviews[1];
        assert_eq!(overview.driver.as_ref().unwrap().name, "Jane Doe");
        assert_eq!(overview.locations.len(), 2);
        assert_eq!(
            overview.schedules[0].route_name.as_deref(),
            Some(Route::example_data().name.as_str())
        );

        let detail = client.get_bus_overview(second.id, at(0)).await.unwrap();
        assert_eq!(detail.overview.locations.len(), 3);
        assert!(detail.last_trip.is_none());
        assert_eq!(detail.next_trip.unwrap().departure_time, at(30));
    }

    #[tokio::test]
    async fn bus_overviews_load_drivers_and_schedules_for_all_buses_at_once() {
        let database = MemoryDatabase::new();
        let client = Client::new(database.clone());
        let user = client.create_user(User::example_data()).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        for (index, number) in ["CB-3", "CB-1", "CB-2"].into_iter().enumerate() {
            let bus = client.create_bus(bus(number)).await.unwrap();
            client
                .create_driver(Driver {
                    user: user.id,
                    license_number: format!("B{}", index),
                    assigned_bus: Some(bus.id),
                    ..Driver::example_data()
                })
                .await
                .unwrap();
            for minute in [45, 15] {
                client
                    .create_schedule(schedule_at(bus.id, route.id, at(minute)))
                    .await
                    .unwrap();
            }
        }
        let lookups_before = database.per_bus_lookups();

        let overviews = client.get_bus_overviews(1).await.unwrap();

        assert_eq!(database.per_bus_lookups(), lookups_before);
        assert_eq!(
            overviews
                .iter()
                .map(|o| o.bus.content.bus_number.as_str())
                .collect::<Vec<_>>(),
            vec!["CB-1", "CB-2", "CB-3"]
        );
        for overview in &overviews {
            assert_eq!(overview.driver.as_ref().unwrap().name, "Jane Doe");
            assert_eq!(
                overview
                    .schedules
                    .iter()
                    .map(|s| s.departure_time)
                    .collect::<Vec<_>>(),
                vec![at(15), at(45)]
            );
        }
    }

    #[tokio::test]
    async fn schedule_update_replaces_stop_times() {
        let client = client();
        let bus = client.create_bus(bus("CB-1")).await.unwrap();
        let route = client.create_route(Route::example_data()).await.unwrap();
        let created = client
            .create_schedule(schedule_at(bus.id, route.id, at(0)))
            .await
            .unwrap();
        let replaced = created.map(|mut schedule| {
            schedule.stop_times = vec![StopTime {
                stop_name: "Main Gate".to_owned(),
                arrival_time: at(5),
                actual_arrival_time: Some(at(10)),
                stop_status: StopStatus::Arrived,
            }];
            schedule
        });
        let updated = client.update_schedule(replaced).await.unwrap();
        let stored = client.get_schedule(updated.id).await.unwrap();
        assert_eq!(stored.content.stop_times.len(), 1);
        assert_eq!(
            stored.content.stop_times[0].late_by().describe().as_deref(),
            Some("5 min late")
        );
    }

    #[tokio::test]
    async fn lecturer_gets_staff_id_which_survives_updates() {
        let client = client();
        let created = client.create_lecturer(Lecturer::example_data()).await.unwrap();
        let staff_id = created.content.staff_id.clone().unwrap();
        assert!(staff_id.starts_with("COM-"));

        let updated = client
            .update_lecturer(created.map(|mut lecturer| {
                lecturer.staff_id = Some("OTHER-1".to_owned());
                lecturer.specialization = "Compilers".to_owned();
                lecturer
            }))
            .await
            .unwrap();
        assert_eq!(updated.content.staff_id.as_deref(), Some(staff_id.as_str()));
        assert_eq!(updated.content.specialization, "Compilers");
    }

    #[tokio::test]
    async fn staff_id_collisions_are_retried() {
        let client = client();
        let mut ids = vec!["COM-AAAA", "COM-AAAA", "COM-AAAA", "COM-BBBB"].into_iter();
        client
            .create_lecturer_with(Lecturer::example_data(), |_| {
                ids.next().unwrap_or_default().to_owned()
            })
            .await
            .unwrap();
        let second = client
            .create_lecturer_with(Lecturer::example_data(), |_| {
                ids.next().unwrap_or_default().to_owned()
            })
            .await
            .unwrap();
        assert_eq!(second.content.staff_id.as_deref(), Some("COM-BBBB"));
    }

    #[tokio::test]
    async fn staff_id_collisions_give_up_eventually() {
        let client = client();
        client
            .create_lecturer_with(Lecturer::example_data(), |_| "COM-AAAA".to_owned())
            .await
            .unwrap();
        let result = client
            .create_lecturer_with(Lecturer::example_data(), |_| "COM-AAAA".to_owned())
            .await;
        assert_eq!(field_errors(result), vec!["staffId"]);
    }

    #[tokio::test]
    async fn replies_require_an_existing_feedback() {
        let client = client();
        assert!(matches!(
            client.create_reply(Id::new(9), Reply::example_data()).await,
            Err(RequestError::NotFound)
        ));
        let feedback = client.create_feedback(Feedback::example_data()).await.unwrap();
        client
            .create_reply(feedback.id, Reply::example_data())
            .await
            .unwrap();
        let feedbacks = client.get_feedbacks().await.unwrap();
        assert_eq!(feedbacks[0].content.replies.len(), 1);
    }
}
