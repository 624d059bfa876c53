use serde::{Deserialize, Serialize};

use crate::models::{CartLine, ProductId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(rename = "idProducto")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "productos")]
    pub lines: Vec<OrderLine>,
    #[serde(rename = "metodo_pago")]
    pub payment_method: String,
}

impl PlaceOrderRequest {
    pub fn from_cart(lines: &[CartLine], payment_method: impl Into<String>) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            payment_method: payment_method.into(),
        }
    }
}
