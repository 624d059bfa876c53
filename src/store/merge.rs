use crate::{
    client::CartApi,
    error::{AppError, AppResult},
    guest::GuestId,
    models::CartLine,
    store::cart::{CartOperation, CartStore},
};

impl<C: CartApi> CartStore<C> {
    /// Folds the guest cart into the authenticated user's cart and installs
    /// the merged result.
    ///
    /// The guest identifier is discarded only once the server confirms the
    /// merge. On failure both the identifier and the current lines are kept
    /// so the merge can be retried.
    pub async fn merge_guest_cart(&self, guest_id: &GuestId) -> AppResult<Vec<CartLine>> {
        let Some(credential) = self.identity.credential() else {
            tracing::error!(%guest_id, "guest cart merge attempted without a credential");
            return Err(AppError::AuthenticationRequired);
        };

        self.begin(CartOperation::Merge);
        match self.client.merge_guest_cart(&credential, guest_id).await {
            Ok(lines) => {
                self.identity.guest().remove();
                tracing::info!(%guest_id, lines = lines.len(), "guest cart merged");
                self.succeed(CartOperation::Merge, |state| state.lines = lines.clone());
                Ok(lines)
            }
            Err(err) => Err(self.fail(CartOperation::Merge, err)),
        }
    }
}
