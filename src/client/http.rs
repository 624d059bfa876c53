use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, header};
use serde_json::Value;

use crate::{
    client::{AuthApi, CartApi, OrderApi},
    config::AppConfig,
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, MergeCartRequest, UpdateCartItemRequest, UpdateOutcome},
        orders::PlaceOrderRequest,
    },
    error::{AppError, AppResult},
    guest::GuestId,
    identity::{Credential, Identity},
    models::{CartLine, LineId},
    response::{ApiResponse, error_message},
};

pub const GUEST_HEADER: &str = "X-Guest-ID";

/// reqwest-backed transport for the storefront REST API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http: Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
    }

    fn as_identity(builder: RequestBuilder, identity: &Identity) -> RequestBuilder {
        match identity {
            Identity::Bearer(credential) => {
                builder.header(header::AUTHORIZATION, credential.bearer_header())
            }
            Identity::Guest(guest_id) => builder.header(GUEST_HEADER, guest_id.as_str()),
        }
    }

    /// Sends the request and returns the JSON body of a successful response.
    async fn send(&self, builder: RequestBuilder, context: &'static str) -> AppResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_slice::<Value>(&bytes)
        };

        if !status.is_success() {
            let message = body
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            tracing::warn!(%status, context, %message, "request rejected");
            return Err(AppError::Api { status, message });
        }

        let body = body.map_err(|err| {
            tracing::warn!(error = %err, context, "response body is not JSON");
            AppError::UnexpectedResponse(context)
        })?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message =
                error_message(&body).unwrap_or_else(|| "Request was not successful".to_string());
            return Err(AppError::Api { status, message });
        }

        Ok(body)
    }

    async fn send_for_success(
        &self,
        builder: RequestBuilder,
        context: &'static str,
    ) -> AppResult<()> {
        let body = self.send(builder, context).await?;
        let envelope = ApiResponse::<Value>::from_value(body, context)?;
        if envelope.success {
            Ok(())
        } else {
            Err(AppError::UnexpectedResponse(context))
        }
    }
}

impl CartApi for HttpClient {
    async fn get_cart(&self, identity: &Identity) -> AppResult<Vec<CartLine>> {
        const CONTEXT: &str = "fetching the cart";
        let builder = Self::as_identity(self.request(Method::GET, "carrito"), identity);
        let body = self.send(builder, CONTEXT).await?;
        ApiResponse::<Vec<CartLine>>::from_value(body, CONTEXT)?.into_data(CONTEXT)
    }

    async fn add_item(
        &self,
        identity: &Identity,
        request: &AddToCartRequest,
    ) -> AppResult<CartLine> {
        const CONTEXT: &str = "adding to the cart";
        let builder = Self::as_identity(self.request(Method::POST, "carrito"), identity).json(request);
        let body = self.send(builder, CONTEXT).await?;
        ApiResponse::<CartLine>::from_value(body, CONTEXT)?.into_data(CONTEXT)
    }

    async fn update_item(
        &self,
        identity: &Identity,
        line_id: LineId,
        request: &UpdateCartItemRequest,
    ) -> AppResult<UpdateOutcome> {
        const CONTEXT: &str = "updating the cart";
        let path = format!("carrito/{line_id}");
        let builder = Self::as_identity(self.request(Method::PATCH, &path), identity).json(request);
        let body = self.send(builder, CONTEXT).await?;

        match ApiResponse::<CartLine>::from_value(body, CONTEXT)? {
            ApiResponse {
                success: true,
                data: Some(line),
                ..
            } => Ok(UpdateOutcome::from_line(line_id, line)),
            ApiResponse {
                success: true,
                data: None,
                message: Some(_),
                ..
            } => Ok(UpdateOutcome::Removed(line_id)),
            _ => Err(AppError::UnexpectedResponse(CONTEXT)),
        }
    }

    async fn remove_item(&self, identity: &Identity, line_id: LineId) -> AppResult<()> {
        let path = format!("carrito/{line_id}");
        let builder = Self::as_identity(self.request(Method::DELETE, &path), identity);
        self.send_for_success(builder, "removing from the cart").await
    }

    async fn clear_cart(&self, identity: &Identity) -> AppResult<()> {
        let builder = Self::as_identity(self.request(Method::POST, "carrito/vaciar"), identity)
            .json(&serde_json::json!({}));
        self.send_for_success(builder, "clearing the cart").await
    }

    async fn merge_guest_cart(
        &self,
        credential: &Credential,
        guest_id: &GuestId,
    ) -> AppResult<Vec<CartLine>> {
        const CONTEXT: &str = "merging the guest cart";
        let payload = MergeCartRequest {
            guest_id: guest_id.to_string(),
        };
        let builder = self
            .request(Method::POST, "carrito/fusionar")
            .header(header::AUTHORIZATION, credential.bearer_header())
            .json(&payload);
        let body = self.send(builder, CONTEXT).await?;
        ApiResponse::<Vec<CartLine>>::from_value(body, CONTEXT)?.into_data(CONTEXT)
    }
}

impl AuthApi for HttpClient {
    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        const CONTEXT: &str = "logging in";
        let builder = self.request(Method::POST, "auth/login").json(request);
        let body = self.send(builder, CONTEXT).await?;
        ApiResponse::<LoginResponse>::from_value(body, CONTEXT)?
            .data
            .ok_or(AppError::UnexpectedResponse(CONTEXT))
    }

    async fn register(&self, request: &RegisterRequest) -> AppResult<LoginResponse> {
        const CONTEXT: &str = "registering";
        let builder = self.request(Method::POST, "auth/register/cliente").json(request);
        let body = self.send(builder, CONTEXT).await?;
        ApiResponse::<LoginResponse>::from_value(body, CONTEXT)?
            .data
            .ok_or(AppError::UnexpectedResponse(CONTEXT))
    }

    async fn logout(&self, credential: &Credential) -> AppResult<()> {
        let builder = self
            .request(Method::POST, "auth/logout")
            .header(header::AUTHORIZATION, credential.bearer_header())
            .json(&serde_json::json!({}));
        self.send(builder, "logging out").await.map(|_| ())
    }
}

impl OrderApi for HttpClient {
    async fn place_order(
        &self,
        credential: Option<&Credential>,
        request: &PlaceOrderRequest,
    ) -> AppResult<Value> {
        let mut builder = self.request(Method::POST, "p/pedidos").json(request);
        if let Some(credential) = credential {
            builder = builder.header(header::AUTHORIZATION, credential.bearer_header());
        }
        let body = self.send(builder, "placing the order").await?;
        Ok(match body {
            Value::Object(mut fields) if fields.contains_key("data") => {
                fields.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        })
    }

    async fn list_orders(&self, credential: &Credential) -> AppResult<Vec<Value>> {
        const CONTEXT: &str = "listing orders";
        let builder = self
            .request(Method::GET, "p/pedidos")
            .header(header::AUTHORIZATION, credential.bearer_header());
        match self.send(builder, CONTEXT).await? {
            Value::Array(orders) => Ok(orders),
            Value::Object(mut fields) => match fields.remove("data") {
                Some(Value::Array(orders)) => Ok(orders),
                _ => Err(AppError::UnexpectedResponse(CONTEXT)),
            },
            _ => Err(AppError::UnexpectedResponse(CONTEXT)),
        }
    }
}
