use axum::{routing::on, Router};
use campus::database::Database;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod bus_data;
mod bus_routes;
mod buses;
mod drivers;
mod feedbacks;
mod lecturers;
mod locations;
mod schedules;
mod users;
mod voice_notes;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/users", users::routes(state.clone()))
        .nest_service("/buses", buses::routes(state.clone()))
        .nest_service("/drivers", drivers::routes(state.clone()))
        .nest_service("/routes", bus_routes::routes(state.clone()))
        .nest_service("/schedules", schedules::routes(state.clone()))
        .nest_service("/locations", locations::routes(state.clone()))
        .nest_service("/lecturers", lecturers::routes(state.clone()))
        .nest_service("/voice-notes", voice_notes::routes(state.clone()))
        .nest_service("/feedbacks", feedbacks::routes(state.clone()))
        .nest_service("/bus-data", bus_data::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use campus::{client::Client, memory::MemoryDatabase};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{router, WebConfig, WebState};

    fn app() -> Router {
        router(
            WebState {
                campus_client: Client::new(MemoryDatabase::new()),
            },
            &WebConfig::default(),
        )
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "campus.test");
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        respond(app, request).await
    }

    async fn respond(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, uri: &str, body: Value) -> Value {
        let (status, created) = send(app, Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        created
    }

    fn bus(number: &str, plate: &str) -> Value {
        json!({"busNumber": number, "capacity": 40, "licensePlate": plate})
    }

    fn link<'a>(resource: &'a Value, relation: &str) -> Option<&'a str> {
        resource["links"]
            .as_array()?
            .iter()
            .find(|link| link["rel"] == relation)
            .and_then(|link| link["href"].as_str())
    }

    /// A driver user with a driver profile assigned to a new bus.
    async fn bus_with_driver(app: &Router) -> (i64, i64) {
        let bus = create(app, "/api/v1/buses", bus("CB-12", "WP-1234")).await;
        let user = create(
            app,
            "/api/v1/users",
            json!({"userType": "DRIVER", "firstName": "Jane", "lastName": "Doe", "phone": "0771234567"}),
        )
        .await;
        let driver = create(
            app,
            "/api/v1/drivers",
            json!({
                "user": user["id"],
                "licenseNumber": "B1234567",
                "yearsOfExperience": 8,
                "assignedBus": bus["id"],
            }),
        )
        .await;
        (bus["id"].as_i64().unwrap(), driver["id"].as_i64().unwrap())
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUri"], "/api/v1/nowhere");
        assert_eq!(body["httpMethod"], "GET");
    }

    #[tokio::test]
    async fn created_bus_links_to_itself() {
        let app = app();
        let created = create(&app, "/api/v1/buses", bus("CB-12", "WP-1234")).await;
        assert_eq!(created["busNumber"], "CB-12");
        assert_eq!(created["busType"], "REG");
        assert!(created["addedOn"].is_string());
        let id = created["id"].as_i64().unwrap();
        assert_eq!(
            link(&created, "self"),
            Some(format!("http://campus.test/api/v1/buses/{}", id).as_str())
        );

        let (status, list) = send(&app, Method::GET, "/api/v1/buses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_item_is_404() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/users/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "The requested item does not exist.");
        assert_eq!(body["requestedUri"], "/api/v1/users/42");
    }

    #[tokio::test]
    async fn duplicate_bus_number_is_a_field_error() {
        let app = app();
        create(&app, "/api/v1/buses", bus("CB-12", "WP-1234")).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/buses",
            Some(bus("CB-12", "WP-9999")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["busNumber"].is_array());
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let app = app();
        let created = create(&app, "/api/v1/buses", bus("CB-12", "WP-1234")).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/locations",
            Some(json!({"bus": created["id"], "latitude": 91.0, "longitude": 181.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["latitude"].is_array());
        assert!(body["fields"]["longitude"].is_array());
    }

    #[tokio::test]
    async fn buses_can_be_ordered_by_number() {
        let app = app();
        create(&app, "/api/v1/buses", bus("A-1", "P-1")).await;
        create(&app, "/api/v1/buses", bus("C-3", "P-3")).await;
        create(&app, "/api/v1/buses", bus("B-2", "P-2")).await;

        let (_, list) = send(&app, Method::GET, "/api/v1/buses?ordering=-bus_number", None).await;
        let numbers = list["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|bus| bus["busNumber"].as_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(numbers, ["C-3", "B-2", "A-1"]);

        let (_, found) = send(&app, Method::GET, "/api/v1/buses?search=b-", None).await;
        assert_eq!(found["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bus_embeds_driver_and_trips() {
        let app = app();
        let (bus, driver) = bus_with_driver(&app).await;

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/buses/{}", bus), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["driver"]["id"], driver);
        assert_eq!(body["driver"]["licenseNumber"], "B1234567");
        assert!(body["lastTrip"].is_null());
        assert!(body["nextTrip"].is_null());
        assert_eq!(
            link(&body, "driver"),
            Some(format!("http://campus.test/api/v1/drivers/{}", driver).as_str())
        );
    }

    #[tokio::test]
    async fn deleting_a_bus_keeps_its_driver() {
        let app = app();
        let (bus, driver) = bus_with_driver(&app).await;
        let route = create(
            &app,
            "/api/v1/routes",
            json!({
                "name": "Campus Express",
                "origin": "Main Gate",
                "destination": "Library",
                "stops": ["Main Gate", "Library"],
                "distance": 2.5,
                "estimatedDuration": "00:15:00",
            }),
        )
        .await;
        create(
            &app,
            "/api/v1/schedules",
            json!({
                "bus": bus,
                "route": route["id"],
                "departureTime": "2025-04-14T07:30:00Z",
                "arrivalTime": "2025-04-14T07:45:00Z",
            }),
        )
        .await;
        let location = create(
            &app,
            "/api/v1/locations",
            json!({"bus": bus, "latitude": 6.9147, "longitude": 79.9733}),
        )
        .await;

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/buses/{}", bus), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, kept) = send(&app, Method::GET, &format!("/api/v1/drivers/{}", driver), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(kept["assignedBus"].is_null());

        let (_, schedules) = send(&app, Method::GET, "/api/v1/schedules", None).await;
        assert!(schedules["data"].as_array().unwrap().is_empty());

        let uri = format!("/api/v1/locations/{}", location["id"]);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn schedules_report_lateness() {
        let app = app();
        let bus = create(&app, "/api/v1/buses", bus("CB-12", "WP-1234")).await;
        let route = create(
            &app,
            "/api/v1/routes",
            json!({
                "name": "Campus Express",
                "origin": "Main Gate",
                "destination": "Library",
                "stops": [],
                "distance": 2.5,
                "estimatedDuration": "00:15:00",
            }),
        )
        .await;
        let schedule = create(
            &app,
            "/api/v1/schedules",
            json!({
                "bus": bus["id"],
                "route": route["id"],
                "departureTime": "2025-04-14T07:30:00Z",
                "arrivalTime": "2025-04-14T07:45:00Z",
                "stopTimes": [
                    {
                        "stopName": "Library",
                        "arrivalTime": "2025-04-14T07:40:00Z",
                        "actualArrivalTime": "2025-04-14T07:45:00Z",
                        "stopStatus": "ARRIVED",
                    },
                    {"stopName": "Hostel B", "arrivalTime": "2025-04-14T07:44:00Z"},
                ],
            }),
        )
        .await;
        assert_eq!(schedule["stopTimes"][0]["lateBy"], "5 min late");
        assert!(schedule["stopTimes"][1]["lateBy"].is_null());
        assert_eq!(
            link(&schedule, "route"),
            Some(format!("http://campus.test/api/v1/routes/{}", route["id"]).as_str())
        );
    }

    #[tokio::test]
    async fn bus_data_lists_recent_locations() {
        let app = app();
        let (bus, _) = bus_with_driver(&app).await;
        for minute in 0..4 {
            create(
                &app,
                "/api/v1/locations",
                json!({
                    "bus": bus,
                    "latitude": 6.9,
                    "longitude": 79.9,
                    "timestamp": format!("2025-04-14T07:0{}:00Z", minute),
                }),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/api/v1/bus-data?locations=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let overview = &body["data"][0];
        assert_eq!(overview["busNumber"], "CB-12");
        assert_eq!(overview["driver"]["name"], "Jane Doe");
        let timestamps = overview["locations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["timestamp"].as_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(timestamps, ["2025-04-14T07:03:00Z", "2025-04-14T07:02:00Z"]);

        let (status, detail) = send(&app, Method::GET, &format!("/api/v1/bus-data/{}", bus), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["locations"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn bus_data_rejects_out_of_range_counts() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/bus-data?locations=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["locations"].is_array());
    }

    #[tokio::test]
    async fn lecturers_get_a_staff_id() {
        let app = app();
        let lecturer = create(
            &app,
            "/api/v1/lecturers",
            json!({
                "displayName": "Dr. Nimal Perera",
                "departmentName": "Computer Science",
                "joinedDate": "2019-09-01",
                "staffId": "IGNORED",
            }),
        )
        .await;
        let staff_id = lecturer["staffId"].as_str().unwrap();
        assert!(staff_id.starts_with("COM-"), "{}", staff_id);
        assert_eq!(staff_id.len(), 8);
    }

    #[tokio::test]
    async fn feedback_collects_replies() {
        let app = app();
        let feedback = create(
            &app,
            "/api/v1/feedbacks",
            json!({"authorName": "Kasun", "message": "The 7:30 bus was full."}),
        )
        .await;
        let id = feedback["id"].as_i64().unwrap();
        let reply = create(
            &app,
            &format!("/api/v1/feedbacks/{}/replies", id),
            json!({"authorName": "Transport Office", "message": "A second bus is coming."}),
        )
        .await;
        assert_eq!(reply["feedback"], id);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/feedbacks/{}", id), None).await;
        assert_eq!(body["replies"].as_array().unwrap().len(), 1);
        assert_eq!(body["replies"][0]["authorName"], "Transport Office");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/feedbacks/99/replies",
            Some(json!({"authorName": "Someone", "message": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn schema_can_include_example() {
        let app = app();
        let (status, schema) = send(&app, Method::GET, "/api/v1/buses/schema", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(schema["properties"]["busNumber"].is_object());

        let (status, _) = send(&app, Method::GET, "/api/v1/buses/schema?exampleData=true", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_json_error() {
        let request = Request::post("/api/v1/buses")
            .header("host", "campus.test")
            .header("content-type", "application/json")
            .body(Body::from("{\"busNumber\": "))
            .unwrap();
        let (status, body) = respond(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn wrongly_typed_json_body_is_a_json_error() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/v1/buses",
            Some(json!({"busNumber": "CB-1", "capacity": "many", "licensePlate": "WP-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("capacity"));
    }

    #[tokio::test]
    async fn malformed_query_and_path_are_json_errors() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/bus-data?locations=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, Method::GET, "/api/v1/buses/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unsupported_method_is_a_json_error() {
        let (status, body) = send(&app(), Method::PUT, "/api/v1/locations/1", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method Not Allowed");
        assert_eq!(body["httpMethod"], "PUT");
        assert_eq!(body["requestedUri"], "/api/v1/locations/1");
    }
}
