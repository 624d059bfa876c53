pub mod cart;
pub mod merge;
pub mod orders;
pub mod session;

pub use cart::{CartOperation, CartState, CartStore};
pub use orders::{OrderHistoryState, OrderHistoryStore};
pub use session::{AuthUpdate, SessionState, SessionStore};
