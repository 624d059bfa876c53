use serde::{Deserialize, Serialize};

use crate::models::{CartLine, LineId, ProductId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    #[serde(rename = "idProducto")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    #[serde(rename = "cantidad")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeCartRequest {
    pub guest_id: String,
}

/// Result of a quantity update: the server either returns the line or
/// deletes it when the quantity dropped to zero or below.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(CartLine),
    Removed(LineId),
}

impl UpdateOutcome {
    /// A line coming back with quantity zero is a deletion as well.
    pub fn from_line(requested: LineId, line: CartLine) -> Self {
        if line.quantity == 0 {
            UpdateOutcome::Removed(line.id.unwrap_or(requested))
        } else {
            UpdateOutcome::Updated(line)
        }
    }

    pub fn line_id(&self) -> Option<LineId> {
        match self {
            UpdateOutcome::Updated(line) => line.id,
            UpdateOutcome::Removed(id) => Some(*id),
        }
    }
}
