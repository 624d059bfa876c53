#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use storefront_cart::{
    client::{AuthApi, CartApi, OrderApi},
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest, UpdateOutcome},
        orders::PlaceOrderRequest,
    },
    error::{AppError, AppResult},
    guest::GuestId,
    identity::{Credential, Identity, IdentityResolver},
    models::{CartLine, LineId, Principal, ProductId, ProductSnapshot, Role},
    storage::{MemoryStorage, SharedStorage},
    store::{CartStore, SessionStore},
};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetCart(Identity),
    AddItem(Identity, ProductId, u32),
    UpdateItem(Identity, LineId, i64),
    RemoveItem(Identity, LineId),
    ClearCart(Identity),
    Merge(GuestId),
    Login(String),
    Register(String),
    Logout,
    PlaceOrder(PlaceOrderRequest),
    ListOrders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetCart,
    AddItem,
    UpdateItem,
    RemoveItem,
    ClearCart,
    Merge,
    Login,
    PlaceOrder,
    ListOrders,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    carts: HashMap<String, Vec<CartLine>>,
    next_line_id: i64,
    failures: HashMap<Op, String>,
    gates: HashMap<LineId, oneshot::Receiver<()>>,
    accounts: HashMap<String, (String, String)>,
    orders: Vec<Value>,
}

/// In-memory storefront backend. Carts are keyed by the identity a call is
/// made as, so guest and user carts stay apart until merged.
#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

pub fn product(id: i64) -> ProductSnapshot {
    ProductSnapshot {
        name: Some(format!("Product {id}")),
        unit_price: Some(Decimal::new(id * 1000, 2)),
    }
}

fn owner(identity: &Identity) -> String {
    match identity {
        Identity::Bearer(credential) => format!("bearer:{}", credential.expose()),
        Identity::Guest(guest_id) => format!("guest:{guest_id}"),
    }
}

fn rejected(status: StatusCode, message: &str) -> AppError {
    AppError::Api {
        status,
        message: message.to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account(self: &Arc<Self>, email: &str, password: &str, role: &str) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(email.to_string(), (password.to_string(), role.to_string()));
    }

    pub fn fail_next(&self, op: Op, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(op, message.to_string());
    }

    /// Holds the next update/remove response for `line_id` until the returned
    /// sender fires. The server-side change is applied before waiting.
    pub fn gate(&self, line_id: LineId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().gates.insert(line_id, rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn merge_calls(&self) -> Vec<GuestId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Merge(guest_id) => Some(guest_id),
                _ => None,
            })
            .collect()
    }

    pub fn server_cart(&self, identity: &Identity) -> Vec<CartLine> {
        self.inner
            .lock()
            .unwrap()
            .carts
            .get(&owner(identity))
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_cart(&self, identity: &Identity, items: &[(i64, u32)]) -> Vec<CartLine> {
        let mut inner = self.inner.lock().unwrap();
        let mut lines = Vec::new();
        for (product_id, quantity) in items {
            inner.next_line_id += 1;
            lines.push(CartLine {
                id: Some(LineId(inner.next_line_id)),
                product_id: ProductId(*product_id),
                quantity: *quantity,
                product: Some(product(*product_id)),
            });
        }
        inner
            .carts
            .entry(owner(identity))
            .or_default()
            .extend(lines.clone());
        lines
    }

    pub fn orders(&self) -> Vec<Value> {
        self.inner.lock().unwrap().orders.clone()
    }

    fn record(&self, call: Call, op: Op) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match inner.failures.remove(&op) {
            Some(message) => Err(rejected(StatusCode::INTERNAL_SERVER_ERROR, &message)),
            None => Ok(()),
        }
    }

    async fn wait_gate(&self, line_id: LineId) {
        let gate = self.inner.lock().unwrap().gates.remove(&line_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

impl CartApi for FakeBackend {
    async fn get_cart(&self, identity: &Identity) -> AppResult<Vec<CartLine>> {
        self.record(Call::GetCart(identity.clone()), Op::GetCart)?;
        Ok(self.server_cart(identity))
    }

    async fn add_item(
        &self,
        identity: &Identity,
        request: &AddToCartRequest,
    ) -> AppResult<CartLine> {
        self.record(
            Call::AddItem(identity.clone(), request.product_id, request.quantity),
            Op::AddItem,
        )?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_line_id += 1;
        let next_id = LineId(inner.next_line_id);
        let cart = inner.carts.entry(owner(identity)).or_default();
        if let Some(line) = cart.iter_mut().find(|l| l.product_id == request.product_id) {
            line.quantity += request.quantity;
            return Ok(line.clone());
        }
        let line = CartLine {
            id: Some(next_id),
            product_id: request.product_id,
            quantity: request.quantity,
            product: Some(product(request.product_id.0)),
        };
        cart.push(line.clone());
        Ok(line)
    }

    async fn update_item(
        &self,
        identity: &Identity,
        line_id: LineId,
        request: &UpdateCartItemRequest,
    ) -> AppResult<UpdateOutcome> {
        self.record(
            Call::UpdateItem(identity.clone(), line_id, request.quantity),
            Op::UpdateItem,
        )?;
        let outcome = {
            let mut inner = self.inner.lock().unwrap();
            let cart = inner.carts.entry(owner(identity)).or_default();
            let Some(position) = cart.iter().position(|l| l.id == Some(line_id)) else {
                return Err(rejected(StatusCode::NOT_FOUND, "Cart item not found"));
            };
            if request.quantity <= 0 {
                cart.remove(position);
                UpdateOutcome::Removed(line_id)
            } else {
                cart[position].quantity = request.quantity as u32;
                UpdateOutcome::Updated(cart[position].clone())
            }
        };
        self.wait_gate(line_id).await;
        Ok(outcome)
    }

    async fn remove_item(&self, identity: &Identity, line_id: LineId) -> AppResult<()> {
        self.record(Call::RemoveItem(identity.clone(), line_id), Op::RemoveItem)?;
        {
            let mut inner = self.inner.lock().unwrap();
            let cart = inner.carts.entry(owner(identity)).or_default();
            let before = cart.len();
            cart.retain(|l| l.id != Some(line_id));
            if cart.len() == before {
                return Err(rejected(StatusCode::NOT_FOUND, "Cart item not found"));
            }
        }
        self.wait_gate(line_id).await;
        Ok(())
    }

    async fn clear_cart(&self, identity: &Identity) -> AppResult<()> {
        self.record(Call::ClearCart(identity.clone()), Op::ClearCart)?;
        self.inner.lock().unwrap().carts.remove(&owner(identity));
        Ok(())
    }

    async fn merge_guest_cart(
        &self,
        credential: &Credential,
        guest_id: &GuestId,
    ) -> AppResult<Vec<CartLine>> {
        self.record(Call::Merge(guest_id.clone()), Op::Merge)?;
        let mut inner = self.inner.lock().unwrap();
        let guest_lines = inner
            .carts
            .remove(&owner(&Identity::Guest(guest_id.clone())))
            .unwrap_or_default();
        let user_cart = inner
            .carts
            .entry(owner(&Identity::Bearer(credential.clone())))
            .or_default();
        for line in guest_lines {
            match user_cart
                .iter_mut()
                .find(|existing| existing.product_id == line.product_id)
            {
                Some(existing) => existing.quantity += line.quantity,
                None => user_cart.push(line),
            }
        }
        Ok(user_cart.clone())
    }
}

impl AuthApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        self.record(Call::Login(request.email.clone()), Op::Login)?;
        let inner = self.inner.lock().unwrap();
        match inner.accounts.get(&request.email) {
            Some((password, role)) if *password == request.password => Ok(LoginResponse {
                access_token: Credential::new(format!("token-{}", request.email)),
                user: principal(&request.email, role),
            }),
            _ => Err(rejected(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            )),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> AppResult<LoginResponse> {
        self.record(Call::Register(request.email.clone()), Op::Login)?;
        self.inner.lock().unwrap().accounts.insert(
            request.email.clone(),
            (request.password.clone(), "Cliente".to_string()),
        );
        Ok(LoginResponse {
            access_token: Credential::new(format!("token-{}", request.email)),
            user: principal(&request.email, "Cliente"),
        })
    }

    async fn logout(&self, _credential: &Credential) -> AppResult<()> {
        self.inner.lock().unwrap().calls.push(Call::Logout);
        Ok(())
    }
}

impl OrderApi for FakeBackend {
    async fn place_order(
        &self,
        credential: Option<&Credential>,
        request: &PlaceOrderRequest,
    ) -> AppResult<Value> {
        self.record(Call::PlaceOrder(request.clone()), Op::PlaceOrder)?;
        let Some(credential) = credential else {
            return Err(rejected(StatusCode::UNAUTHORIZED, "Unauthenticated."));
        };
        let mut inner = self.inner.lock().unwrap();
        inner
            .carts
            .remove(&owner(&Identity::Bearer(credential.clone())));
        let order = json!({
            "idPedido": inner.orders.len() + 1,
            "metodo_pago": request.payment_method,
            "productos": request.lines,
        });
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self, _credential: &Credential) -> AppResult<Vec<Value>> {
        self.record(Call::ListOrders, Op::ListOrders)?;
        Ok(self.inner.lock().unwrap().orders.clone())
    }
}

pub fn principal(email: &str, role: &str) -> Principal {
    Principal {
        id: Some(1),
        email: email.to_string(),
        role: Role::from(role.to_string()),
        profile: Map::new(),
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: SharedStorage,
    pub identity: IdentityResolver,
    pub cart: CartStore<FakeBackend>,
    pub session: SessionStore<FakeBackend>,
}

impl Harness {
    pub fn new() -> Self {
        let backend = FakeBackend::new();
        let storage = MemoryStorage::shared();
        let identity = IdentityResolver::new(storage.clone());
        let cart = CartStore::new(backend.clone(), identity.clone());
        let session = SessionStore::new(backend.clone(), identity.clone());
        Self {
            backend,
            storage,
            identity,
            cart,
            session,
        }
    }

    pub fn guest_identity(&self) -> Identity {
        Identity::Guest(self.identity.guest().get_or_create())
    }

    pub fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// Yields to the other branches of a `join!` until `done` holds.
pub async fn until(done: impl Fn() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}
