use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    client::CartApi,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest, UpdateOutcome},
    error::{AppError, AppResult},
    identity::IdentityResolver,
    models::{CartLine, LineId, OpStatus, ProductId},
};

/// Which remote operation last drove the cart `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOperation {
    Fetch,
    Add,
    Update,
    Remove,
    Clear,
    Merge,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    pub status: OpStatus,
    pub operation: Option<CartOperation>,
    pub error: Option<String>,
    /// Order submission is tracked apart from cart mutations.
    pub order_status: OpStatus,
    pub order_error: Option<String>,
    pub last_order: Option<Value>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl CartState {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn line(&self, id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == Some(id))
    }
}

/// Marks a line id whose removal the server confirmed.
const RETIRED: u64 = u64::MAX;

/// Per-line record of which responses have been folded into the state.
///
/// Each update takes a ticket when it is sent. Its response applies only if
/// no newer response for that line has been applied already. A confirmed
/// removal always applies and retires the line id, so later update responses
/// for it are dropped. Failed requests leave the record untouched.
#[derive(Debug, Default)]
pub(super) struct LineTickets {
    next: AtomicU64,
    applied: Mutex<HashMap<LineId, u64>>,
}

impl LineTickets {
    fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn applied(&self) -> MutexGuard<'_, HashMap<LineId, u64>> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `apply` unless a response at least as new was applied to the
    /// line. Returns whether it ran.
    fn apply_update(&self, line_id: LineId, ticket: u64, apply: impl FnOnce()) -> bool {
        let mut applied = self.applied();
        if applied.get(&line_id).is_some_and(|&last| last >= ticket) {
            return false;
        }
        applied.insert(line_id, ticket);
        apply();
        true
    }

    fn apply_removal(&self, line_id: LineId, apply: impl FnOnce()) {
        let mut applied = self.applied();
        applied.insert(line_id, RETIRED);
        apply();
    }

    fn clear(&self) {
        self.applied().clear();
    }
}

/// Owns the cart state and folds remote responses into it.
///
/// Requests are not queued: several may be in flight and each response is
/// applied on its own when it arrives.
pub struct CartStore<C> {
    pub(super) client: Arc<C>,
    pub(super) identity: IdentityResolver,
    pub(super) state: watch::Sender<CartState>,
    tickets: LineTickets,
}

impl<C> CartStore<C> {
    pub fn new(client: Arc<C>, identity: IdentityResolver) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            client,
            identity,
            state,
            tickets: LineTickets::default(),
        }
    }

    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// Installs lines without touching the network.
    pub fn set_initial(&self, lines: Vec<CartLine>) {
        self.state.send_modify(|state| {
            state.lines = lines;
            state.status = OpStatus::Idle;
            state.operation = None;
            state.error = None;
        });
    }

    /// Drops the local cart and the guest identifier. No network call.
    pub fn clear_local(&self) {
        self.state.send_modify(|state| {
            state.lines.clear();
            state.status = OpStatus::Idle;
            state.operation = None;
            state.error = None;
        });
        self.tickets.clear();
        self.identity.guest().remove();
        tracing::debug!("local cart cleared");
    }

    pub(super) fn begin(&self, operation: CartOperation) {
        tracing::debug!(?operation, "cart operation started");
        self.state.send_modify(|state| {
            state.status = OpStatus::Loading;
            state.operation = Some(operation);
            state.error = None;
        });
    }

    pub(super) fn succeed(&self, operation: CartOperation, apply: impl FnOnce(&mut CartState)) {
        self.state.send_modify(|state| {
            apply(state);
            state.status = OpStatus::Succeeded;
            state.operation = Some(operation);
            state.error = None;
            state.synced_at = Some(Utc::now());
        });
    }

    /// Records the failure and hands the error back. Lines are left as they were.
    pub(super) fn fail(&self, operation: CartOperation, err: AppError) -> AppError {
        tracing::warn!(error = %err, ?operation, "cart operation failed");
        self.state.send_modify(|state| {
            state.status = OpStatus::Failed;
            state.operation = Some(operation);
            state.error = Some(err.to_string());
        });
        err
    }
}

impl<C: CartApi> CartStore<C> {
    /// Replaces every line with the server's cart.
    pub async fn fetch(&self) -> AppResult<Vec<CartLine>> {
        self.begin(CartOperation::Fetch);
        let identity = self.identity.resolve();
        match self.client.get_cart(&identity).await {
            Ok(lines) => {
                tracing::info!(lines = lines.len(), "cart fetched");
                self.succeed(CartOperation::Fetch, |state| state.lines = lines.clone());
                Ok(lines)
            }
            Err(err) => Err(self.fail(CartOperation::Fetch, err)),
        }
    }

    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> AppResult<CartLine> {
        self.begin(CartOperation::Add);
        if quantity == 0 {
            return Err(self.fail(
                CartOperation::Add,
                AppError::BadRequest("quantity must be greater than 0".to_string()),
            ));
        }

        let identity = self.identity.resolve();
        let request = AddToCartRequest {
            product_id,
            quantity,
        };
        match self.client.add_item(&identity, &request).await {
            Ok(line) => {
                tracing::info!(product_id = %line.product_id, quantity = line.quantity, "cart line added");
                // The server consolidates quantities per product.
                self.succeed(CartOperation::Add, |state| {
                    match state
                        .lines
                        .iter_mut()
                        .find(|existing| existing.product_id == line.product_id)
                    {
                        Some(existing) => *existing = line.clone(),
                        None => state.lines.push(line.clone()),
                    }
                });
                Ok(line)
            }
            Err(err) => Err(self.fail(CartOperation::Add, err)),
        }
    }

    /// A quantity of zero or below makes the server delete the line.
    pub async fn update_item(&self, line_id: LineId, quantity: i64) -> AppResult<UpdateOutcome> {
        self.begin(CartOperation::Update);
        let ticket = self.tickets.issue();
        let identity = self.identity.resolve();
        let request = UpdateCartItemRequest { quantity };

        let outcome = match self.client.update_item(&identity, line_id, &request).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail(CartOperation::Update, err)),
        };

        let applied = match &outcome {
            UpdateOutcome::Updated(line) => self.tickets.apply_update(line_id, ticket, || {
                self.succeed(CartOperation::Update, |state| {
                    if let Some(existing) = state.lines.iter_mut().find(|l| l.id == Some(line_id)) {
                        *existing = line.clone();
                    }
                });
            }),
            UpdateOutcome::Removed(removed) => {
                self.tickets.apply_removal(*removed, || {
                    self.succeed(CartOperation::Update, |state| {
                        state.lines.retain(|l| l.id != Some(*removed));
                    });
                });
                true
            }
        };

        if applied {
            tracing::info!(%line_id, removed = matches!(outcome, UpdateOutcome::Removed(_)), "cart line updated");
        } else {
            tracing::debug!(%line_id, ticket, "discarding stale update response");
            self.succeed(CartOperation::Update, |_| {});
        }
        Ok(outcome)
    }

    /// A confirmed removal always drops the line, whatever else is in flight.
    pub async fn remove_item(&self, line_id: LineId) -> AppResult<()> {
        self.begin(CartOperation::Remove);
        let identity = self.identity.resolve();

        match self.client.remove_item(&identity, line_id).await {
            Ok(()) => {
                self.tickets.apply_removal(line_id, || {
                    self.succeed(CartOperation::Remove, |state| {
                        state.lines.retain(|l| l.id != Some(line_id));
                    });
                });
                tracing::info!(%line_id, "cart line removed");
                Ok(())
            }
            Err(err) => Err(self.fail(CartOperation::Remove, err)),
        }
    }

    /// Empties the remote cart. Clearing an empty cart succeeds.
    pub async fn clear(&self) -> AppResult<()> {
        self.begin(CartOperation::Clear);
        let identity = self.identity.resolve();
        match self.client.clear_cart(&identity).await {
            Ok(()) => {
                self.tickets.clear();
                self.succeed(CartOperation::Clear, |state| state.lines.clear());
                tracing::info!("cart cleared");
                Ok(())
            }
            Err(err) => Err(self.fail(CartOperation::Clear, err)),
        }
    }
}
