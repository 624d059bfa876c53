use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned identifier of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub i64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product data denormalized onto a cart line by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    #[serde(rename = "nombreProducto", default)]
    pub name: Option<String>,
    #[serde(rename = "valorProducto", default)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Absent only for lines that were never persisted.
    #[serde(rename = "idCarrito", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LineId>,
    #[serde(rename = "idProducto")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "producto", default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
}

impl CartLine {
    pub fn unit_price(&self) -> Decimal {
        self.product
            .as_ref()
            .and_then(|p| p.unit_price)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }

    pub fn display_name(&self) -> &str {
        self.product
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("Unknown product")
    }
}

/// Lifecycle of an asynchronous store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Role marker carried by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    SuperAdmin,
    Customer(String),
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        match self {
            Role::Admin | Role::SuperAdmin => true,
            Role::Customer(_) => false,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Admin" => Role::Admin,
            "SuperAdmin" => Role::SuperAdmin,
            _ => Role::Customer(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => "Admin".to_string(),
            Role::SuperAdmin => "SuperAdmin".to_string(),
            Role::Customer(name) => name,
        }
    }
}

/// Authenticated identity record returned by login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(rename = "rol", default = "default_role")]
    pub role: Role,
    /// Profile fields the cart core does not interpret.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

fn default_role() -> Role {
    Role::Customer(String::new())
}
