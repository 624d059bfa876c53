//! Remote contracts the state stores depend on.
//!
//! The stores are generic over these traits; [`http::HttpClient`] is the
//! production transport.

pub mod http;

use serde_json::Value;

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest, UpdateOutcome},
        orders::PlaceOrderRequest,
    },
    error::AppResult,
    guest::GuestId,
    identity::{Credential, Identity},
    models::{CartLine, LineId},
};

pub use http::HttpClient;

pub trait CartApi {
    async fn get_cart(&self, identity: &Identity) -> AppResult<Vec<CartLine>>;

    async fn add_item(&self, identity: &Identity, request: &AddToCartRequest)
    -> AppResult<CartLine>;

    /// May delete the line server-side when the quantity drops to zero.
    async fn update_item(
        &self,
        identity: &Identity,
        line_id: LineId,
        request: &UpdateCartItemRequest,
    ) -> AppResult<UpdateOutcome>;

    async fn remove_item(&self, identity: &Identity, line_id: LineId) -> AppResult<()>;

    async fn clear_cart(&self, identity: &Identity) -> AppResult<()>;

    /// Always made as the authenticated principal.
    async fn merge_guest_cart(
        &self,
        credential: &Credential,
        guest_id: &GuestId,
    ) -> AppResult<Vec<CartLine>>;
}

pub trait AuthApi {
    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse>;

    async fn register(&self, request: &RegisterRequest) -> AppResult<LoginResponse>;

    async fn logout(&self, credential: &Credential) -> AppResult<()>;
}

pub trait OrderApi {
    /// Returns the server's order confirmation as sent.
    async fn place_order(
        &self,
        credential: Option<&Credential>,
        request: &PlaceOrderRequest,
    ) -> AppResult<Value>;

    async fn list_orders(&self, credential: &Credential) -> AppResult<Vec<Value>>;
}
