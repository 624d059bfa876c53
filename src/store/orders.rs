use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    client::OrderApi,
    dto::orders::PlaceOrderRequest,
    error::{AppError, AppResult},
    identity::IdentityResolver,
    models::OpStatus,
    store::cart::CartStore,
};

impl<C: OrderApi> CartStore<C> {
    /// Submits the order. A confirmed order means the server already emptied
    /// the persisted cart, so the local one is cleared without a re-fetch.
    /// A failure lands in the order status pair and leaves the lines alone.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> AppResult<Value> {
        self.state.send_modify(|state| {
            state.order_status = OpStatus::Loading;
            state.order_error = None;
        });

        let credential = self.identity.credential();
        match self.client.place_order(credential.as_ref(), &request).await {
            Ok(receipt) => {
                tracing::info!(lines = request.lines.len(), "order placed");
                self.clear_local();
                self.state.send_modify(|state| {
                    state.order_status = OpStatus::Succeeded;
                    state.order_error = None;
                    state.last_order = Some(receipt.clone());
                });
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(error = %err, "order placement failed");
                self.state.send_modify(|state| {
                    state.order_status = OpStatus::Failed;
                    state.order_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    /// Places an order for every line currently in the cart.
    pub async fn checkout(&self, payment_method: &str) -> AppResult<Value> {
        let request = PlaceOrderRequest::from_cart(&self.state.borrow().lines, payment_method);
        self.place_order(request).await
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderHistoryState {
    pub orders: Vec<Value>,
    pub status: OpStatus,
    pub error: Option<String>,
}

/// Order history of the signed-in principal.
pub struct OrderHistoryStore<O> {
    client: Arc<O>,
    identity: IdentityResolver,
    state: watch::Sender<OrderHistoryState>,
}

impl<O: OrderApi> OrderHistoryStore<O> {
    pub fn new(client: Arc<O>, identity: IdentityResolver) -> Self {
        let (state, _) = watch::channel(OrderHistoryState::default());
        Self {
            client,
            identity,
            state,
        }
    }

    pub fn snapshot(&self) -> OrderHistoryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrderHistoryState> {
        self.state.subscribe()
    }

    pub async fn fetch(&self) -> AppResult<Vec<Value>> {
        self.state.send_modify(|state| state.status = OpStatus::Loading);

        let result = match self.identity.credential() {
            Some(credential) => self.client.list_orders(&credential).await,
            None => Err(AppError::AuthenticationRequired),
        };

        match result {
            Ok(orders) => {
                tracing::info!(orders = orders.len(), "order history fetched");
                self.state.send_modify(|state| {
                    state.orders = orders.clone();
                    state.status = OpStatus::Succeeded;
                    state.error = None;
                });
                Ok(orders)
            }
            Err(err) => {
                tracing::warn!(error = %err, "order history fetch failed");
                self.state.send_modify(|state| {
                    state.status = OpStatus::Failed;
                    state.error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }
}
