//! Shared harness for RentWheels integration tests.
//!
//! Tests run against an in-process mock of the rental backend bound to a
//! random loopback port. The mock speaks the production wire contract:
//! bearer-token auth on the protected endpoints, camelCase car and booking
//! records (with the legacy field spellings still accepted), conflict on
//! booking an already-booked car, and `{"deletedCount": n}` bodies from the
//! DELETE endpoints.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rent-wheels-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use rent_wheels_client::AppState;
use rent_wheels_client::config::ClientConfig;
use rent_wheels_client::session::{IdentityProvider, ProviderError, ProviderKind, UserIdentity};
use rent_wheels_core::ProviderUserId;

type Shared = Arc<Mutex<BackendData>>;

#[derive(Default)]
struct BackendData {
    cars: Vec<Value>,
    bookings: Vec<Value>,
    /// token -> email it was issued for
    tokens: HashMap<String, String>,
    fail_cars: bool,
    fail_listings: bool,
    fail_token: bool,
}

/// In-process mock of the rental backend.
///
/// Dropping it stops the server; [`MockBackend::shutdown`] does the same but
/// waits until the port is actually closed.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: Option<JoinHandle<()>>,
}

impl MockBackend {
    /// Bind to a random loopback port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendData::default()));
        let app = router(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend serve");
        });

        Self {
            addr,
            state,
            server: Some(server),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointed at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the mock address does not parse as a URL.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(Url::parse(&self.base_url()).expect("mock backend url"))
    }

    /// Fully wired client state pointed at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the client state cannot be built.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        AppState::new(self.client_config()).expect("build app state")
    }

    /// Stop serving and wait for the port to close.
    pub async fn shutdown(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
            let _ = server.await;
        }
    }

    // =========================================================================
    // Seeding and failure switches
    // =========================================================================

    pub fn seed_car(&self, car: Value) {
        self.lock().cars.push(car);
    }

    pub fn seed_booking(&self, booking: Value) {
        self.lock().bookings.push(booking);
    }

    pub fn set_fail_cars(&self, fail: bool) {
        self.lock().fail_cars = fail;
    }

    pub fn set_fail_listings(&self, fail: bool) {
        self.lock().fail_listings = fail;
    }

    pub fn set_fail_token(&self, fail: bool) {
        self.lock().fail_token = fail;
    }

    /// Invalidate every issued token, as a backend session sweep would.
    pub fn revoke_all_tokens(&self) {
        self.lock().tokens.clear();
    }

    // =========================================================================
    // Backend-side snapshots
    // =========================================================================

    /// The stored car record, as the backend holds it right now.
    #[must_use]
    pub fn car(&self, id: &str) -> Option<Value> {
        self.lock()
            .cars
            .iter()
            .find(|c| record_id(c) == Some(id))
            .cloned()
    }

    #[must_use]
    pub fn bookings(&self) -> Vec<Value> {
        self.lock().bookings.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BackendData> {
        self.state.lock().expect("backend state lock")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

/// A loopback URL nothing listens on, for connection-refused scenarios.
///
/// # Panics
///
/// Panics if a probe listener cannot be bound.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}

/// Install a test-friendly tracing subscriber, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Record builders
// =============================================================================

/// A car record in the canonical wire shape.
#[must_use]
pub fn car_record(id: &str, name: &str, category: &str, price: f64, provider_email: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} in great condition"),
        "category": category,
        "pricePerDay": price,
        "location": "Portland, OR",
        "status": "Available",
        "imageURL": format!("https://img.example.com/{id}.jpg"),
        "providerName": "Dana Byers",
        "providerEmail": provider_email,
    })
}

/// A car record in the legacy wire shape (`_id`, `rentPrice`, `image`).
#[must_use]
pub fn legacy_car_record(id: &str, name: &str, category: &str, price: f64) -> Value {
    json!({
        "_id": id,
        "name": name,
        "category": category,
        "rentPrice": price,
        "status": "Available",
        "image": format!("https://img.example.com/{id}.jpg"),
        "providerName": "Sam Field",
        "providerEmail": "legacy@example.com",
    })
}

/// A settled booking row for dashboard scenarios.
#[must_use]
pub fn booking_record(id: &str, car_id: &str, status: &str, amount: Option<f64>) -> Value {
    let mut row = json!({
        "_id": id,
        "carId": car_id,
        "carName": "Toyota Corolla",
        "rentPrice": 50.0,
        "renterEmail": "renter@example.com",
        "providerEmail": "provider@example.com",
        "status": status,
        "date": "2026-08-01T10:00:00Z",
    });
    if let (Some(obj), Some(amount)) = (row.as_object_mut(), amount) {
        obj.insert("amount".to_owned(), json!(amount));
    }
    row
}

/// A verified identity for `email`.
///
/// # Panics
///
/// Panics if `email` is not a well-formed address.
#[must_use]
pub fn identity(email: &str) -> UserIdentity {
    UserIdentity {
        id: ProviderUserId::new(format!("uid-{email}")),
        email: email.parse().expect("test email"),
        display_name: Some("Robin Vale".to_string()),
        photo_url: None,
    }
}

// =============================================================================
// Stub identity provider
// =============================================================================

/// An [`IdentityProvider`] with scripted outcomes.
pub struct StubProvider {
    restored: Option<UserIdentity>,
    sign_in: Result<UserIdentity, ProviderError>,
}

impl StubProvider {
    /// No persisted session; interactive sign-in yields `identity`.
    #[must_use]
    pub fn signing_in_as(identity: UserIdentity) -> Self {
        Self {
            restored: None,
            sign_in: Ok(identity),
        }
    }

    /// A persisted session for `identity` survives restore.
    #[must_use]
    pub fn restoring(identity: UserIdentity) -> Self {
        Self {
            restored: Some(identity.clone()),
            sign_in: Ok(identity),
        }
    }

    /// No persisted session; interactive sign-in fails with `error`.
    #[must_use]
    pub fn failing_with(error: ProviderError) -> Self {
        Self {
            restored: None,
            sign_in: Err(error),
        }
    }
}

impl IdentityProvider for StubProvider {
    fn restore(&self) -> impl Future<Output = Option<UserIdentity>> + Send {
        let restored = self.restored.clone();
        async move { restored }
    }

    fn sign_in(
        &self,
        _kind: ProviderKind,
    ) -> impl Future<Output = Result<UserIdentity, ProviderError>> + Send {
        let outcome = self.sign_in.clone();
        async move { outcome }
    }

    fn sign_out(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

// =============================================================================
// Mock routes
// =============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/token", post(issue_token))
        .route("/cars", get(list_cars).post(create_car))
        .route("/cars/{id}", get(get_car).put(update_car).delete(delete_car))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/{id}", delete(delete_booking))
        .route("/my-listings", get(my_listings))
        .with_state(state)
}

fn record_id(record: &Value) -> Option<&str> {
    record
        .get("id")
        .or_else(|| record.get("_id"))
        .and_then(Value::as_str)
}

fn authorize(data: &BackendData, headers: &HeaderMap) -> Result<String, Response> {
    let Some(raw) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing bearer token"));
    };
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    data.tokens.get(token).cloned().map_or_else(
        || Err(reject(StatusCode::FORBIDDEN, "token revoked")),
        Ok,
    )
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn issue_token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = state.lock().expect("state lock");
    if data.fail_token {
        return reject(StatusCode::SERVICE_UNAVAILABLE, "token mint offline");
    }
    let Some(email) = body.get("email").and_then(Value::as_str) else {
        return reject(StatusCode::BAD_REQUEST, "email required");
    };

    let token = format!("tok-{}", Uuid::new_v4());
    data.tokens.insert(token.clone(), email.to_owned());
    Json(json!({ "token": token })).into_response()
}

async fn list_cars(State(state): State<Shared>) -> Response {
    let data = state.lock().expect("state lock");
    if data.fail_cars {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "catalog backend down");
    }
    Json(Value::Array(data.cars.clone())).into_response()
}

async fn get_car(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let data = state.lock().expect("state lock");
    data.cars
        .iter()
        .find(|c| record_id(c) == Some(id.as_str()))
        .map_or_else(
            || reject(StatusCode::NOT_FOUND, "car not found"),
            |car| Json(car.clone()).into_response(),
        )
}

async fn create_car(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut car): Json<Value>,
) -> Response {
    let mut data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }

    if let Some(obj) = car.as_object_mut()
        && !obj.contains_key("id")
    {
        obj.insert("id".to_owned(), json!(format!("car-{}", Uuid::new_v4())));
    }
    data.cars.push(car.clone());
    (StatusCode::CREATED, Json(car)).into_response()
}

async fn update_car(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    let mut data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }

    let Some(pos) = data
        .cars
        .iter()
        .position(|c| record_id(c) == Some(id.as_str()))
    else {
        return reject(StatusCode::NOT_FOUND, "car not found");
    };
    let Some(car) = data.cars.get_mut(pos) else {
        return reject(StatusCode::NOT_FOUND, "car not found");
    };
    if let (Some(target), Some(changes)) = (car.as_object_mut(), patch.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(car.clone()).into_response()
}

async fn delete_car(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }

    let before = data.cars.len();
    data.cars.retain(|c| record_id(c) != Some(id.as_str()));
    let deleted = before - data.cars.len();
    Json(json!({ "deletedCount": deleted })).into_response()
}

async fn my_listings(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }
    if data.fail_listings {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "listings backend down");
    }

    let email = params.get("email").cloned().unwrap_or_default();
    let rows: Vec<Value> = data
        .cars
        .iter()
        .filter(|c| c.get("providerEmail").and_then(Value::as_str) == Some(email.as_str()))
        .cloned()
        .collect();
    Json(Value::Array(rows)).into_response()
}

async fn list_bookings(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }
    Json(Value::Array(data.bookings.clone())).into_response()
}

async fn create_booking(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut draft): Json<Value>,
) -> Response {
    let mut data = state.lock().expect("state lock");
    let renter_email = match authorize(&data, &headers) {
        Ok(email) => email,
        Err(denied) => return denied,
    };

    let car_id = draft
        .get("carId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let Some(pos) = data
        .cars
        .iter()
        .position(|c| record_id(c) == Some(car_id.as_str()))
    else {
        return reject(StatusCode::NOT_FOUND, "car not found");
    };
    let Some(car) = data.cars.get_mut(pos) else {
        return reject(StatusCode::NOT_FOUND, "car not found");
    };
    if car.get("status").and_then(Value::as_str) == Some("Booked") {
        return reject(StatusCode::CONFLICT, "car is already booked");
    }
    if let Some(obj) = car.as_object_mut() {
        obj.insert("status".to_owned(), json!("Booked"));
    }

    if let Some(obj) = draft.as_object_mut() {
        obj.insert("_id".to_owned(), json!(format!("bk-{}", Uuid::new_v4())));
        obj.insert("renterEmail".to_owned(), json!(renter_email));
    }
    data.bookings.push(draft.clone());
    (StatusCode::CREATED, Json(draft)).into_response()
}

async fn delete_booking(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut data = state.lock().expect("state lock");
    if let Err(denied) = authorize(&data, &headers) {
        return denied;
    }

    let before = data.bookings.len();
    let mut freed_car = None;
    if let Some(pos) = data
        .bookings
        .iter()
        .position(|b| record_id(b) == Some(id.as_str()))
    {
        let removed = data.bookings.remove(pos);
        freed_car = removed
            .get("carId")
            .and_then(Value::as_str)
            .map(str::to_owned);
    }
    let deleted = before - data.bookings.len();

    // The car goes back to Available only once its last live booking dies.
    if let Some(car_id) = freed_car {
        let still_booked = data.bookings.iter().any(|b| {
            b.get("carId").and_then(Value::as_str) == Some(car_id.as_str())
                && matches!(
                    b.get("status").and_then(Value::as_str),
                    Some("Booked" | "Active")
                )
        });
        if !still_booked
            && let Some(pos) = data
                .cars
                .iter()
                .position(|c| record_id(c) == Some(car_id.as_str()))
            && let Some(car) = data.cars.get_mut(pos)
            && let Some(obj) = car.as_object_mut()
        {
            obj.insert("status".to_owned(), json!("Available"));
        }
    }

    Json(json!({ "deletedCount": deleted })).into_response()
}
