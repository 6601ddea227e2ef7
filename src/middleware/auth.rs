use crate::core::{AppError, Operator, Role};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use sqlx::MySqlPool;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Header carrying `<key_id>.<secret>`
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Paths reachable without credentials
const PUBLIC_PATHS: [&str; 2] = ["/health", "/ready"];

/// Stored API key of a back-office operator
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub operator_id: String,
    pub display_name: String,
    pub role: String,
    pub secret_hash: String,
    pub is_active: bool,
}

impl ApiKeyRecord {
    pub fn operator(&self) -> crate::core::Result<Operator> {
        let role = self.role.parse::<Role>().map_err(|e| {
            AppError::internal(format!("API key '{}' has a bad role: {}", self.key_id, e))
        })?;

        Ok(Operator {
            id: self.operator_id.clone(),
            display_name: self.display_name.clone(),
            role,
        })
    }
}

/// Lookup of API keys by their public id
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_key(&self, key_id: &str) -> crate::core::Result<Option<ApiKeyRecord>>;

    /// Record that the key was just used
    async fn touch(&self, key_id: &str) -> crate::core::Result<()>;
}

pub struct MySqlCredentialStore {
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn find_key(&self, key_id: &str) -> crate::core::Result<Option<ApiKeyRecord>> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(
            r#"
            SELECT key_id, operator_id, display_name, role, secret_hash, is_active
            FROM api_keys
            WHERE key_id = ?
            LIMIT 1
            "#,
        )
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn touch(&self, key_id: &str) -> crate::core::Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = CURRENT_TIMESTAMP(6) WHERE key_id = ?")
            .bind(key_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Resolve an `X-API-Key` header value to the operator it belongs to
pub async fn authenticate(
    store: &dyn CredentialStore,
    header_value: &str,
) -> crate::core::Result<Operator> {
    let (key_id, secret) = header_value
        .split_once('.')
        .filter(|(id, secret)| !id.is_empty() && !secret.is_empty())
        .ok_or_else(|| AppError::unauthorized("Malformed API key"))?;

    let record = store
        .find_key(key_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid API key"))?;

    if !record.is_active {
        return Err(AppError::unauthorized("API key is inactive"));
    }

    if !verify_secret(secret, &record.secret_hash)? {
        return Err(AppError::unauthorized("Invalid API key"));
    }

    // A failed touch must not reject an otherwise valid request
    if let Err(e) = store.touch(key_id).await {
        tracing::warn!(key_id = %key_id, "Failed to update API key usage: {}", e);
    }

    record.operator()
}

/// API key authentication middleware
///
/// Puts the authenticated [`Operator`] into the request extensions.
#[derive(Clone)]
pub struct OperatorAuth {
    store: Arc<dyn CredentialStore>,
}

impl OperatorAuth {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OperatorAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = OperatorAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OperatorAuthMiddleware {
            service: Rc::new(service),
            store: self.store.clone(),
        }))
    }
}

pub struct OperatorAuthMiddleware<S> {
    service: Rc<S>,
    store: Arc<dyn CredentialStore>,
}

impl<S, B> Service<ServiceRequest> for OperatorAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let store = self.store.clone();

        Box::pin(async move {
            if PUBLIC_PATHS.contains(&req.path()) {
                return svc.call(req).await;
            }

            let api_key = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| Error::from(AppError::unauthorized("Missing X-API-Key header")))?
                .to_string();

            let operator = match authenticate(store.as_ref(), &api_key).await {
                Ok(operator) => operator,
                Err(e) => {
                    tracing::warn!(path = %req.path(), "Authentication failed: {}", e);
                    return Err(Error::from(e));
                }
            };

            tracing::debug!(operator = %operator.id, role = ?operator.role, "Operator authenticated");
            req.extensions_mut().insert(operator);

            svc.call(req).await
        })
    }
}

/// Hash an API key secret using Argon2
pub fn hash_secret(secret: &str) -> crate::core::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash API key: {}", e)))
}

/// Verify an API key secret against its Argon2 hash
pub fn verify_secret(secret: &str, hash: &str) -> crate::core::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("Invalid hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}
