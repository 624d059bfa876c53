use serde::{Deserialize, Serialize};

use crate::identity::Credential;
use crate::models::Principal;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Customer self-registration payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    #[serde(rename = "nombreCliente")]
    pub first_name: String,
    #[serde(rename = "apellidoCliente")]
    pub last_name: String,
    #[serde(rename = "cedulaCliente")]
    pub national_id: String,
    #[serde(rename = "telefonoCliente")]
    pub phone: String,
    #[serde(rename = "direccion")]
    pub address: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "c_password")]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: Credential,
    pub user: Principal,
}

/// Claims read from a JWT credential. Only expiry matters client side.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: usize,
}
