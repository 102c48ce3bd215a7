//! Authenticated request pipeline.
//!
//! Every request goes through [`AuthClient::send`]:
//!
//! 1. The stored access token, if any, is installed as the bearer credential
//!    and the request is dispatched.
//! 2. Any status other than `401` is returned unchanged.
//! 3. On `401` the pipeline recovers a fresh access token. Concurrent
//!    requests share one refresh: the first to see the `401` starts it and
//!    the rest await the same result. A request whose token was already
//!    replaced by someone else's refresh skips straight to the retry.
//! 4. With a fresh token the request is sent once more and that response is
//!    final, whatever its status.
//! 5. Without one (no stored pair, or the token endpoint refused) the store
//!    is cleared, the logout hook runs, and the caller gets the original
//!    `401` response.
//!
//! The refresh itself runs on a spawned task so that dropping the request
//! that started it does not cancel it for everyone else.
//!
//! Every login and sign-out starts a new session epoch. A refresh only
//! writes its result back if the epoch it started in is still current, so
//! an explicit logout or a fresh login during a refresh is never undone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, trace, warn};

use drivedesk_core::error::AuthError;
use drivedesk_core::{
    AccessToken, ApiUrl, CredentialPair, CredentialStore, Credentials, LogoutHook, LogoutReason,
    RefreshToken, Result, TokenEndpoint, TracingLogoutHook,
};

use crate::client::{build_http_client, expect_success, handle_response, map_reqwest};
use crate::config::ClientConfig;
use crate::request::PendingRequest;
use crate::token::OAuthTokenClient;

/// Result of one shared refresh, as seen by every request awaiting it.
#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed(AccessToken),
    Failed,
}

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// HTTP client for the business API that keeps the session alive.
///
/// Cheap to clone; clones share the connection pool, the credential store,
/// and the in-flight refresh.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use drivedesk_core::{ApiUrl, ClientCredentials, Credentials, MemoryCredentialStore};
/// use drivedesk_http::{AuthClient, ClientConfig};
///
/// # async fn example() -> Result<(), drivedesk_core::Error> {
/// let config = ClientConfig::new(
///     ApiUrl::new("https://admin.example.com")?,
///     ClientCredentials::new("2", "client-secret"),
/// )?;
/// let client = AuthClient::new(&config, Arc::new(MemoryCredentialStore::new()))?;
///
/// client.login(&Credentials::new("admin@example.com", "password")).await?;
/// let registrations: serde_json::Value = client.get_json("/api/registrations").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    api_url: ApiUrl,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenEndpoint>,
    logout_hook: Arc<dyn LogoutHook>,
    refresh: Mutex<Option<SharedRefresh>>,
    /// Session epoch. Held while the store is written on behalf of a
    /// session change or a refresh result.
    epoch: Mutex<u64>,
}

/// Builder for [`AuthClient`] when the defaults need replacing.
pub struct AuthClientBuilder {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    tokens: Option<Arc<dyn TokenEndpoint>>,
    logout_hook: Arc<dyn LogoutHook>,
}

impl AuthClientBuilder {
    /// Use a different token endpoint than the OAuth form client.
    pub fn token_endpoint(mut self, tokens: Arc<dyn TokenEndpoint>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Run `hook` whenever the pipeline signs the user out.
    pub fn logout_hook(mut self, hook: Arc<dyn LogoutHook>) -> Self {
        self.logout_hook = hook;
        self
    }

    pub fn build(self) -> Result<AuthClient> {
        let http = build_http_client(&self.config)?;
        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(OAuthTokenClient::with_http(http.clone(), &self.config)),
        };

        Ok(AuthClient {
            inner: Arc::new(ClientInner {
                http,
                api_url: self.config.api_url().clone(),
                store: self.store,
                tokens,
                logout_hook: self.logout_hook,
                refresh: Mutex::new(None),
                epoch: Mutex::new(0),
            }),
        })
    }
}

impl AuthClient {
    /// Create a client with the OAuth token endpoint from `config` and a
    /// logout hook that only logs.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::builder(config, store).build()
    }

    pub fn builder(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> AuthClientBuilder {
        AuthClientBuilder {
            config: config.clone(),
            store,
            tokens: None,
            logout_hook: Arc::new(TracingLogoutHook),
        }
    }

    /// Returns the API base URL.
    pub fn api_url(&self) -> &ApiUrl {
        &self.inner.api_url
    }

    /// Returns true if a credential pair is stored.
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_present()
    }

    /// Fail with [`AuthError::NotAuthenticated`] unless a pair is stored.
    pub fn require_session(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::NotAuthenticated.into())
        }
    }

    /// Exchange a username and password for a credential pair and store it.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        info!("Logging in");
        let pair = self.inner.tokens.login(credentials).await?;
        self.inner.start_session(pair);
        debug!("Login succeeded");
        Ok(())
    }

    /// Clear the stored credentials and notify the logout hook.
    pub fn logout(&self) {
        info!("Logging out");
        self.inner.sign_out(LogoutReason::UserRequested);
    }

    /// Force a refresh of the stored pair.
    ///
    /// Shares an in-flight refresh if one is running. On failure the session
    /// is signed out, exactly as for a request that could not recover.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let current = self
            .inner
            .store
            .get()
            .ok_or(AuthError::NotAuthenticated)?;

        match ClientInner::recover(&self.inner, Some(&current.access_token)).await {
            Some(_) => Ok(()),
            None => Err(AuthError::RefreshTokenInvalid.into()),
        }
    }

    /// Send a request through the pipeline and return the final response.
    ///
    /// Only transport failures are errors here; every HTTP status, including
    /// a `401` the pipeline could not recover from, comes back as `Ok`.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn send(&self, mut request: PendingRequest) -> Result<Response> {
        let sent_with = self.inner.store.get().map(|pair| pair.access_token);
        if let Some(token) = &sent_with {
            request.authorize(token)?;
        }

        let response = self.inner.dispatch(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Access token rejected");

        match ClientInner::recover(&self.inner, sent_with.as_ref()).await {
            Some(token) => {
                request.authorize(&token)?;
                debug!("Retrying with refreshed token");
                self.inner.dispatch(&request).await
            }
            None => Ok(response),
        }
    }

    /// Send a request and decode a JSON success body.
    ///
    /// A non-success final status becomes a protocol error carrying that
    /// status and the server's message.
    pub async fn send_json<R: DeserializeOwned>(&self, request: PendingRequest) -> Result<R> {
        let response = self.send(request).await?;
        handle_response(response).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send_json(PendingRequest::get(path)).await
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(PendingRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(PendingRequest::put(path).json(body)?).await
    }

    pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(PendingRequest::patch(path).json(body)?).await
    }

    /// Send a `DELETE` and discard the response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(PendingRequest::delete(path)).await?;
        expect_success(response).await
    }
}

impl ClientInner {
    async fn dispatch(&self, request: &PendingRequest) -> Result<Response> {
        let url = self.api_url.endpoint(request.path());
        trace!(%url, "Dispatching");

        let mut builder = self
            .http
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body);
        }

        builder.send().await.map_err(map_reqwest)
    }

    /// Obtain an access token to retry with after a `401`, or `None` once the
    /// session has been signed out.
    ///
    /// `sent_with` is the token the failed request carried.
    async fn recover(this: &Arc<Self>, sent_with: Option<&AccessToken>) -> Option<AccessToken> {
        let in_flight = {
            let mut slot = this.refresh.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("Joining in-flight refresh");
                    in_flight.clone()
                }
                None => match this.snapshot() {
                    (Some(pair), _) if Some(&pair.access_token) != sent_with => {
                        debug!("Token already replaced by another refresh");
                        return Some(pair.access_token);
                    }
                    (Some(pair), epoch) => {
                        let refresh = Self::start_refresh(this, pair.refresh_token, epoch);
                        *slot = Some(refresh.clone());
                        refresh
                    }
                    (None, _) => {
                        drop(slot);
                        warn!("No refresh token stored");
                        this.sign_out(LogoutReason::MissingRefreshToken);
                        return None;
                    }
                },
            }
        };

        match in_flight.await {
            RefreshOutcome::Refreshed(token) => Some(token),
            RefreshOutcome::Failed => None,
        }
    }

    /// Spawn the refresh and wrap it so any number of requests can await it.
    ///
    /// Must be called with the refresh slot locked.
    fn start_refresh(this: &Arc<Self>, refresh_token: RefreshToken, epoch: u64) -> SharedRefresh {
        let inner = Arc::clone(this);
        let fallback = Arc::clone(this);

        tokio::spawn(async move { inner.run_refresh(refresh_token, epoch).await })
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Refresh task did not complete");
                    fallback.finish_refresh();
                    RefreshOutcome::Failed
                }
            })
            .boxed()
            .shared()
    }

    async fn run_refresh(&self, refresh_token: RefreshToken, epoch: u64) -> RefreshOutcome {
        info!("Refreshing credentials");

        let result = self.tokens.refresh(&refresh_token).await;

        let mut current = self.lock_epoch();
        let outcome = if *current != epoch {
            drop(current);
            debug!("Session changed during refresh; discarding result");
            RefreshOutcome::Failed
        } else {
            match result {
                Ok(pair) => {
                    let token = pair.access_token.clone();
                    self.store.set(pair);
                    drop(current);
                    debug!("Credentials refreshed");
                    RefreshOutcome::Refreshed(token)
                }
                Err(e) => {
                    *current += 1;
                    self.store.clear();
                    drop(current);
                    warn!(error = %e, "Refresh rejected; signing out");
                    self.logout_hook.on_logout(LogoutReason::RefreshFailed);
                    RefreshOutcome::Failed
                }
            }
        };

        // The store is updated before the slot is released, so a request
        // arriving after this point sees the new token without refreshing.
        self.finish_refresh();
        outcome
    }

    fn finish_refresh(&self) {
        *self.refresh.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored pair together with the epoch it belongs to.
    fn snapshot(&self) -> (Option<CredentialPair>, u64) {
        let epoch = self.lock_epoch();
        (self.store.get(), *epoch)
    }

    fn start_session(&self, pair: CredentialPair) {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        self.store.set(pair);
    }

    /// Clear the store in a new epoch, then run the hook outside the lock.
    fn sign_out(&self, reason: LogoutReason) {
        {
            let mut epoch = self.lock_epoch();
            *epoch += 1;
            self.store.clear();
        }
        self.logout_hook.on_logout(reason);
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("api_url", &self.inner.api_url)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
