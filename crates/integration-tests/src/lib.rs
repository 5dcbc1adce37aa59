//! Integration test support for the Lumina storefront client.
//!
//! [`MockBackend`] serves the backend's REST surface from an in-process axum
//! app on an ephemeral port, so the real [`BackendClient`] is exercised over
//! HTTP. Individual routes can be switched to canned failures, and every
//! request that mutates state is recorded for assertions.
//!
//! [`spawn_payer`] stands in for the person at the hosted payment UI.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lumina-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lumina_core::{OrderId, PaymentId};
use lumina_storefront::backend::BackendClient;
use lumina_storefront::checkout::CheckoutOrchestrator;
use lumina_storefront::config::{BackendConfig, CheckoutConfig};
use lumina_storefront::gateway::{
    ChannelGateway, GatewayConfig, GatewayOutcome, PaymentConfirmation, PaymentPrompt,
    sign_payment, verify_payment_signature,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Key secret the mock backend verifies payment signatures with.
pub const GATEWAY_SECRET: &[u8] = b"mock-gateway-secret";

/// Backend routes that can be given canned responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    CreateOrder,
    Register,
    Login,
    User,
    AdminUsers,
    Products,
    Checkout,
    Chat,
    Analyze,
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    retry_after: Option<u64>,
    delay: Option<Duration>,
}

impl IntoResponse for Canned {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    id: i64,
    name: String,
    role: String,
}

#[derive(Debug, Clone)]
struct StockedProduct {
    id: i64,
    name: String,
    price: f64,
    stock_qty: i64,
    vendor_id: i64,
}

impl StockedProduct {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "slug": self.name.to_lowercase().replace(' ', "-"),
            "description": format!("{} from vendor {}", self.name, self.vendor_id),
            "price": self.price,
            "stock_qty": self.stock_qty,
            "images": null,
            "vendor_id": self.vendor_id,
        })
    }
}

#[derive(Debug, Default)]
struct MockState {
    create_order_calls: AtomicUsize,
    register_calls: AtomicUsize,
    checkout_calls: AtomicUsize,
    product_list_calls: AtomicUsize,
    next_order: AtomicUsize,
    next_marketplace_order: AtomicI64,
    canned: Mutex<HashMap<Route, Canned>>,
    order_requests: Mutex<Vec<Value>>,
    register_requests: Mutex<Vec<Value>>,
    checkout_requests: Mutex<Vec<Value>>,
    chat_requests: Mutex<Vec<Value>>,
    users: Mutex<Vec<Value>>,
    accounts: Mutex<HashMap<String, Account>>,
    products: Mutex<Vec<StockedProduct>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    async fn canned(&self, route: Route) -> Option<Canned> {
        let canned = lock(&self.canned).get(&route).cloned()?;
        if let Some(delay) = canned.delay {
            tokio::time::sleep(delay).await;
        }
        Some(canned)
    }
}

/// An in-process Lumina backend.
///
/// The server task stops when the mock is dropped.
pub struct MockBackend {
    base_url: String,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend seeded with a small catalog.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            next_marketplace_order: AtomicI64::new(1001),
            ..MockState::default()
        });
        *lock(&state.products) = vec![
            StockedProduct {
                id: 1,
                name: "Brass Diya".to_string(),
                price: 249.5,
                stock_qty: 10,
                vendor_id: 7,
            },
            StockedProduct {
                id: 2,
                name: "Handloom Stole".to_string(),
                price: 899.0,
                stock_qty: 1,
                vendor_id: 7,
            },
        ];

        let app = Router::new()
            .route("/create-order", post(create_order))
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/user/{email}", get(fetch_user))
            .route("/admin/users", get(list_users))
            .route("/admin/analyze", post(analyze))
            .route("/api/p1/marketplace/products", get(list_products))
            .route("/api/p1/marketplace/checkout", post(marketplace_checkout))
            .route("/chat", post(chat))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/"),
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[must_use]
    pub fn config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(&self.base_url).expect("mock base url");
        config.request_timeout = Duration::from_secs(2);
        config
    }

    /// A fresh client for this backend.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.config()).expect("backend client")
    }

    /// Answer `route` with `status` and a raw body until cleared.
    pub fn respond_with(&self, route: Route, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        lock(&self.state.canned).insert(
            route,
            Canned {
                status,
                body: body.to_string(),
                retry_after: None,
                delay: None,
            },
        );
    }

    /// Answer `route` with 429 and a `Retry-After` header.
    pub fn rate_limit(&self, route: Route, retry_after_secs: u64) {
        lock(&self.state.canned).insert(
            route,
            Canned {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: r#"{"detail":"Too many requests"}"#.to_string(),
                retry_after: Some(retry_after_secs),
                delay: None,
            },
        );
    }

    /// Answer `route` with a 500 only after `delay`.
    pub fn stall(&self, route: Route, delay: Duration) {
        lock(&self.state.canned).insert(
            route,
            Canned {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: r#"{"detail":"stalled"}"#.to_string(),
                retry_after: None,
                delay: Some(delay),
            },
        );
    }

    /// Restore normal handling for `route`.
    pub fn clear(&self, route: Route) {
        lock(&self.state.canned).remove(&route);
    }

    /// Add a login the backend accepts.
    pub fn add_account(&self, email: &str, password: &str, id: i64, name: &str, role: &str) {
        lock(&self.state.accounts).insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                id,
                name: name.to_string(),
                role: role.to_string(),
            },
        );
    }

    /// Set a product's stock level.
    pub fn set_stock(&self, product_id: i64, stock_qty: i64) {
        if let Some(product) = lock(&self.state.products)
            .iter_mut()
            .find(|p| p.id == product_id)
        {
            product.stock_qty = stock_qty;
        }
    }

    #[must_use]
    pub fn stock(&self, product_id: i64) -> Option<i64> {
        lock(&self.state.products)
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock_qty)
    }

    #[must_use]
    pub fn create_order_calls(&self) -> usize {
        self.state.create_order_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn register_calls(&self) -> usize {
        self.state.register_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn checkout_calls(&self) -> usize {
        self.state.checkout_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_list_calls(&self) -> usize {
        self.state.product_list_calls.load(Ordering::SeqCst)
    }

    /// Bodies received by `/create-order`, oldest first.
    #[must_use]
    pub fn order_requests(&self) -> Vec<Value> {
        lock(&self.state.order_requests).clone()
    }

    /// Bodies received by `/register`, oldest first.
    #[must_use]
    pub fn register_requests(&self) -> Vec<Value> {
        lock(&self.state.register_requests).clone()
    }

    /// Bodies received by the marketplace checkout, oldest first.
    #[must_use]
    pub fn checkout_requests(&self) -> Vec<Value> {
        lock(&self.state.checkout_requests).clone()
    }

    /// Bodies received by `/chat`, oldest first.
    #[must_use]
    pub fn chat_requests(&self) -> Vec<Value> {
        lock(&self.state.chat_requests).clone()
    }

    /// Users stored by successful registrations.
    #[must_use]
    pub fn users(&self) -> Vec<Value> {
        lock(&self.state.users).clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "error", "message": message}))).into_response()
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({"detail": detail}))).into_response()
}

async fn create_order(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.create_order_calls.fetch_add(1, Ordering::SeqCst);
    lock(&state.order_requests).push(body.clone());
    if let Some(canned) = state.canned(Route::CreateOrder).await {
        return canned.into_response();
    }

    let Some(amount) = body.get("amount").and_then(Value::as_u64).filter(|a| *a > 0) else {
        return error(StatusCode::BAD_REQUEST, "Razorpay Error: invalid amount");
    };
    let n = state.next_order.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "status": "success",
        "order": {
            "id": format!("order_mock{n}"),
            "amount": amount,
            "currency": body.get("currency").cloned().unwrap_or_else(|| json!("INR")),
            "receipt": body.get("receipt").cloned().unwrap_or(Value::Null),
            "status": "created",
        }
    }))
    .into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    lock(&state.register_requests).push(body.clone());
    if let Some(canned) = state.canned(Route::Register).await {
        return canned.into_response();
    }

    let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default();
    let email = field("email");

    if let Some(signature) = body.get("signature").and_then(Value::as_str) {
        let verified =
            verify_payment_signature(GATEWAY_SECRET, field("order_id"), field("payment_id"), signature);
        if verified.is_err() {
            return error(StatusCode::BAD_REQUEST, "Payment verification failed");
        }
    }

    let mut users = lock(&state.users);
    if users.iter().any(|u| u["email"] == email) {
        return error(StatusCode::BAD_REQUEST, "Email already registered");
    }
    users.push(json!({
        "name": field("name"),
        "email": email,
        "phone": field("phone"),
        "payment_id": field("payment_id"),
        "subscription_status": "active",
        "plan": "pro",
    }));

    Json(json!({"status": "success", "message": "User registered successfully"})).into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if let Some(canned) = state.canned(Route::Login).await {
        return canned.into_response();
    }

    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let account = lock(&state.accounts).get(email).cloned();

    match account {
        Some(account) if account.password == password => Json(json!({
            "status": "success",
            "data": {
                "id": account.id,
                "name": account.name,
                "role": account.role,
                "token": format!("tok_{}", account.id),
            }
        }))
        .into_response(),
        _ => detail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn fetch_user(State(state): State<Arc<MockState>>, Path(email): Path<String>) -> Response {
    if let Some(canned) = state.canned(Route::User).await {
        return canned.into_response();
    }

    let user = lock(&state.users)
        .iter()
        .find(|u| u["email"] == email.as_str())
        .cloned();
    match user {
        Some(user) => Json(json!({"status": "success", "user": user})).into_response(),
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn list_users(State(state): State<Arc<MockState>>) -> Response {
    if let Some(canned) = state.canned(Route::AdminUsers).await {
        return canned.into_response();
    }
    let users = lock(&state.users).clone();
    Json(json!({"status": "success", "users": users})).into_response()
}

async fn analyze(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if let Some(canned) = state.canned(Route::Analyze).await {
        return canned.into_response();
    }
    let query = body.get("query").and_then(Value::as_str).unwrap_or_default();
    let registered = lock(&state.users).len();
    Json(json!({
        "status": "success",
        "analysis": {"query": query, "registered_users": registered}
    }))
    .into_response()
}

async fn list_products(State(state): State<Arc<MockState>>) -> Response {
    state.product_list_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(canned) = state.canned(Route::Products).await {
        return canned.into_response();
    }
    let products: Vec<Value> = lock(&state.products)
        .iter()
        .map(StockedProduct::to_json)
        .collect();
    Json(products).into_response()
}

#[allow(clippy::cast_precision_loss)]
async fn marketplace_checkout(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    state.checkout_calls.fetch_add(1, Ordering::SeqCst);
    lock(&state.checkout_requests).push(body.clone());
    if let Some(canned) = state.canned(Route::Checkout).await {
        return canned.into_response();
    }

    let items: Vec<(i64, i64)> = body
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    (
                        item["product_id"].as_i64().unwrap_or_default(),
                        item["quantity"].as_i64().unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let mut products = lock(&state.products);
    for (product_id, quantity) in &items {
        let in_stock = products
            .iter()
            .any(|p| p.id == *product_id && p.stock_qty >= *quantity);
        if !in_stock {
            return detail(
                StatusCode::BAD_REQUEST,
                &format!("Product {product_id} is out of stock or does not exist."),
            );
        }
    }

    let mut total = 0.0;
    for (product_id, quantity) in &items {
        if let Some(product) = products.iter_mut().find(|p| p.id == *product_id) {
            product.stock_qty -= quantity;
            total += product.price * *quantity as f64;
        }
    }
    drop(products);

    let order_id = state.next_marketplace_order.fetch_add(1, Ordering::SeqCst);
    Json(json!({"order_id": order_id, "total_amount": total, "status": "success"})).into_response()
}

async fn chat(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    lock(&state.chat_requests).push(body.clone());
    if let Some(canned) = state.canned(Route::Chat).await {
        return canned.into_response();
    }
    let last = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    Json(json!({"response": format!("echo: {last}")})).into_response()
}

// ============================================================================
// Payment UI
// ============================================================================

/// How the simulated customer answers each payment prompt.
#[derive(Debug, Clone)]
pub enum Payer {
    /// Pay, with a valid signature for the prompted order.
    Pay(&'static str),
    /// Pay without a signature.
    PayUnsigned(&'static str),
    /// Pay, but report a different order than the one prompted.
    PayOtherOrder(&'static str),
    /// Pay with a signature for a different payment.
    PayForged(&'static str),
    /// Decline with a reason.
    Decline(&'static str),
    /// Close the payment UI.
    Cancel,
    /// Never answer.
    Walk,
}

/// Signature the gateway would attach for `order_id` and `payment_id`.
///
/// # Panics
///
/// Panics if the HMAC key is rejected.
#[must_use]
pub fn gateway_signature(order_id: &str, payment_id: &str) -> String {
    sign_payment(GATEWAY_SECRET, order_id, payment_id).expect("sign payment")
}

fn payment_id(id: &str) -> PaymentId {
    PaymentId::parse(id).expect("valid payment id")
}

fn answer(prompt: PaymentPrompt, payer: &Payer, held: &mut Vec<PaymentPrompt>) {
    let order_id = prompt.config().order_id.to_string();
    match payer {
        Payer::Pay(id) => {
            let signature = gateway_signature(&order_id, id);
            let _ = prompt.succeed(payment_id(id), Some(signature));
        }
        Payer::PayUnsigned(id) => {
            let _ = prompt.succeed(payment_id(id), None);
        }
        Payer::PayOtherOrder(id) => {
            let confirmation = PaymentConfirmation {
                payment_id: payment_id(id),
                order_id: OrderId::parse("order_someone_else").expect("order id"),
                signature: None,
            };
            let _ = prompt.resolve(GatewayOutcome::Success(confirmation));
        }
        Payer::PayForged(id) => {
            let signature = gateway_signature(&order_id, "pay_other");
            let _ = prompt.succeed(payment_id(id), Some(signature));
        }
        Payer::Decline(reason) => prompt.fail(*reason),
        Payer::Cancel => prompt.cancel(),
        Payer::Walk => held.push(prompt),
    }
}

/// Answer every prompt from `prompts` as `payer` would.
///
/// The task ends once the gateway is dropped and yields the configurations
/// the payment UI was opened with.
pub fn spawn_payer(
    mut prompts: mpsc::Receiver<PaymentPrompt>,
    payer: Payer,
) -> JoinHandle<Vec<GatewayConfig>> {
    tokio::spawn(async move {
        let mut opened = Vec::new();
        let mut held = Vec::new();
        while let Some(prompt) = prompts.recv().await {
            opened.push(prompt.config().clone());
            answer(prompt, &payer, &mut held);
        }
        opened
    })
}

/// Checkout settings used across tests.
#[must_use]
pub fn checkout_config() -> CheckoutConfig {
    CheckoutConfig {
        gateway_key_id: "rzp_test_mock".to_string(),
        payment_timeout: Duration::from_secs(5),
        ..CheckoutConfig::default()
    }
}

/// An orchestrator against `backend` whose payment UI is answered by `payer`.
#[must_use]
pub fn orchestrator(
    backend: &BackendClient,
    payer: Payer,
    config: &CheckoutConfig,
) -> (CheckoutOrchestrator, JoinHandle<Vec<GatewayConfig>>) {
    let (gateway, prompts) = ChannelGateway::new(1);
    let payer = spawn_payer(prompts, payer);
    let orchestrator =
        CheckoutOrchestrator::new(Arc::new(backend.clone()), Arc::new(gateway), config);
    (orchestrator, payer)
}
