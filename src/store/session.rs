use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    client::{AuthApi, CartApi},
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    error::AppResult,
    identity::{Credential, IdentityResolver},
    models::{OpStatus, Principal, Role},
    store::cart::CartStore,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub status: OpStatus,
    pub is_authenticated: bool,
    pub principal: Option<Principal>,
    #[serde(skip)]
    pub credential: Option<Credential>,
    pub error: Option<String>,
}

/// Direct replacement of the authentication fields, used for hydration.
#[derive(Debug, Clone, Default)]
pub struct AuthUpdate {
    pub is_authenticated: bool,
    pub principal: Option<Principal>,
    pub credential: Option<Credential>,
}

/// Tracks who is signed in and drives the cart across identity changes.
pub struct SessionStore<A> {
    client: Arc<A>,
    identity: IdentityResolver,
    state: watch::Sender<SessionState>,
}

impl<A> SessionStore<A> {
    pub fn new(client: Arc<A>, identity: IdentityResolver) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            client,
            identity,
            state,
        }
    }

    /// Builds the store from the session persisted in durable storage.
    ///
    /// A JWT credential whose `exp` has passed is discarded together with the
    /// cached principal. Opaque tokens are taken as they are.
    pub fn hydrate(client: Arc<A>, identity: IdentityResolver) -> Self {
        let store = Self::new(client, identity);
        match store.identity.load_session() {
            Some((credential, _)) if credential_expired(&credential) => {
                tracing::info!("stored credential has expired, discarding session");
                store.identity.forget_session();
            }
            Some((credential, principal)) => {
                tracing::debug!(has_principal = principal.is_some(), "session restored");
                store.state.send_modify(|state| {
                    state.is_authenticated = true;
                    state.principal = principal;
                    state.credential = Some(credential);
                });
            }
            None => {}
        }
        store
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Sets the fields as given. No merge, fetch or clear follows.
    pub fn set_auth(&self, update: AuthUpdate) {
        self.state.send_modify(|state| {
            state.is_authenticated = update.is_authenticated;
            state.principal = update.principal;
            state.credential = update.credential;
            state.status = OpStatus::Succeeded;
            state.error = None;
        });
    }

    /// Forgets the session locally. Discarding the cart is up to the caller.
    pub fn logout(&self) {
        self.identity.forget_session();
        self.state.send_modify(|state| {
            state.is_authenticated = false;
            state.principal = None;
            state.credential = None;
            state.status = OpStatus::Idle;
            state.error = None;
        });
        tracing::info!("logged out");
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| {
            state.error = None;
            state.status = OpStatus::Idle;
        });
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.status = OpStatus::Loading;
            state.error = None;
        });
    }

    async fn complete_authentication<C: CartApi>(
        &self,
        result: AppResult<LoginResponse>,
        cart: &CartStore<C>,
    ) -> AppResult<Principal> {
        match result {
            Ok(LoginResponse { access_token, user }) => {
                self.identity.persist_session(&access_token, &user);
                self.state.send_modify(|state| {
                    state.status = OpStatus::Succeeded;
                    state.is_authenticated = true;
                    state.principal = Some(user.clone());
                    state.credential = Some(access_token);
                    state.error = None;
                });
                tracing::info!(email = %user.email, privileged = user.role.is_privileged(), "authenticated");
                self.sync_cart(&user, cart).await;
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(error = %err, "authentication failed");
                self.state.send_modify(|state| {
                    state.status = OpStatus::Failed;
                    state.error = Some(err.to_string());
                    state.is_authenticated = false;
                    state.principal = None;
                    state.credential = None;
                });
                self.identity.forget_session();
                cart.clear_local();
                Err(err)
            }
        }
    }

    /// Administrative sessions never carry a cart; customers inherit the guest
    /// cart when one exists.
    async fn sync_cart<C: CartApi>(&self, principal: &Principal, cart: &CartStore<C>) {
        let result = match &principal.role {
            Role::Admin | Role::SuperAdmin => {
                cart.clear_local();
                return;
            }
            Role::Customer(_) => match self.identity.guest().current() {
                Some(guest_id) => cart.merge_guest_cart(&guest_id).await.map(|_| ()),
                None => cart.fetch().await.map(|_| ()),
            },
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, "cart sync after sign-in failed");
        }
    }
}

impl<A: AuthApi> SessionStore<A> {
    pub async fn login<C: CartApi>(
        &self,
        request: LoginRequest,
        cart: &CartStore<C>,
    ) -> AppResult<Principal> {
        self.begin();
        let result = self.client.login(&request).await;
        self.complete_authentication(result, cart).await
    }

    pub async fn register<C: CartApi>(
        &self,
        request: RegisterRequest,
        cart: &CartStore<C>,
    ) -> AppResult<Principal> {
        self.begin();
        let result = self.client.register(&request).await;
        self.complete_authentication(result, cart).await
    }

    /// Revokes the credential server-side when possible, then forgets the
    /// session and discards the cart it owned.
    pub async fn sign_out<C>(&self, cart: &CartStore<C>) {
        let credential = self.state.borrow().credential.clone();
        if let Some(credential) = credential {
            if let Err(err) = self.client.logout(&credential).await {
                tracing::warn!(error = %err, "remote logout failed");
            }
        }
        self.logout();
        cart.clear_local();
    }
}

fn credential_expired(credential: &Credential) -> bool {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;

    match decode::<Claims>(
        credential.expose(),
        &DecodingKey::from_secret(&[]),
        &validation,
    ) {
        Ok(_) => false,
        Err(err) => matches!(err.kind(), ErrorKind::ExpiredSignature),
    }
}
