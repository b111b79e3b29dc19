use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::gateway::{Gateway, GatewayError, Identity, IdentityChannel, IdentitySubscription};
use crate::{
    error::ErrorResponse,
    models::{Book, BookInput, BookQuery, ReadRequest, Role, UserProfile},
};

/// Body of the GoTrue password grant.
#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// The parts of a GoTrue token response the client keeps.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: Uuid,
    email: Option<String>,
}

/// HttpGateway
///
/// `Gateway` over HTTP: table operations go to the catalog API, the session
/// is managed against Supabase Auth (GoTrue).
pub struct HttpGateway {
    client: Client,
    api_base: String,
    supabase_url: String,
    anon_key: String,
    identity: IdentityChannel,
}

impl HttpGateway {
    pub fn new(
        api_base: impl Into<String>,
        supabase_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: trim_base(api_base.into()),
            supabase_url: trim_base(supabase_url.into()),
            anon_key: anon_key.into(),
            identity: IdentityChannel::new(),
        }
    }

    /// sign_in_with_password
    ///
    /// Exchanges credentials for a session and announces it to subscribers.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, GatewayError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.supabase_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let token: TokenResponse = decode(response).await?;
        let identity = Identity {
            user_id: token.user.id,
            email: token.user.email,
            access_token: token.access_token,
        };

        tracing::info!(user_id = %identity.user_id, "signed in");
        self.identity.publish(Some(identity.clone()));
        Ok(identity)
    }

    /// Installs a session obtained elsewhere, e.g. restored from storage.
    pub fn adopt_session(&self, identity: Identity) {
        self.identity.publish(Some(identity));
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        let identity = self.identity.current().ok_or(GatewayError::Unauthenticated)?;
        Ok(request.bearer_auth(identity.access_token))
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Turns a non-2xx response into `GatewayError::Status`, keeping the
/// server's message when the body is an `ErrorResponse`.
async fn check(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(GatewayError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Checks the status, then decodes the body as `T`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn read(&self, request: &ReadRequest) -> Result<Vec<Book>, GatewayError> {
        let query = BookQuery {
            category: request.filter.category,
            q: request.filter.search.clone(),
            sort: Some(request.order.field),
            ascending: Some(request.order.ascending),
        };

        let response = self
            .client
            .get(self.api("/books"))
            .query(&query)
            .send()
            .await?;
        decode(response).await
    }

    async fn insert(&self, record: &BookInput) -> Result<Book, GatewayError> {
        let request = self.client.post(self.api("/admin/books")).json(record);
        let response = self.authorized(request)?.send().await?;
        decode(response).await
    }

    async fn update(&self, id: Uuid, record: &BookInput) -> Result<Book, GatewayError> {
        let request = self
            .client
            .put(self.api(&format!("/admin/books/{id}")))
            .json(record);
        let response = self.authorized(request)?.send().await?;
        decode(response).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        let request = self.client.delete(self.api(&format!("/admin/books/{id}")));
        let response = self.authorized(request)?.send().await?;
        check(response).await?;
        Ok(())
    }

    /// The API only reveals the caller's own role, so asking about anyone
    /// else is an error rather than a silent `User`.
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, GatewayError> {
        let request = self.client.get(self.api("/me"));
        let response = self.authorized(request)?.send().await?;
        let profile: UserProfile = decode(response).await?;

        if profile.id != user_id {
            return Err(GatewayError::Backend(format!(
                "role of {user_id} is not visible to {}",
                profile.id
            )));
        }
        Ok(Some(profile.role))
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    fn on_identity_change(&self) -> IdentitySubscription {
        self.identity.subscribe()
    }

    /// Revokes the session at the provider. On failure the local session is
    /// kept, so the user stays signed in.
    async fn sign_out(&self) -> Result<(), GatewayError> {
        let request = self
            .client
            .post(format!("{}/auth/v1/logout", self.supabase_url))
            .header("apikey", &self.anon_key);
        let response = self.authorized(request)?.send().await?;
        check(response).await?;

        tracing::info!("signed out");
        self.identity.publish(None);
        Ok(())
    }
}
