//! Request identity resolution
//!
//! Sign-in and sign-out live at the Cloudflare Access proxy in front of the
//! server; this module only resolves who the proxy says is calling. The
//! resolved [`Identity`] is inserted as a request extension so handlers take
//! it as an explicit argument instead of re-reading headers.
//!
//! Resolution order:
//! 1. `require_auth = false` → the `local-dev` identity (development only)
//! 2. `Cf-Access-Jwt-Assertion` validated against the team's public keys
//!    (when a team and audience are configured)
//! 3. `Cf-Access-Authenticated-User-Email` header as-is
//! 4. Otherwise 401; the dashboard client stays inert until an identity
//!    is present

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{AppState, CfAccessConfig};

/// Cloudflare Access header for the authenticated user email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Cloudflare Access JWT header (cryptographic proof of authentication)
const CF_ACCESS_JWT_HEADER: &str = "cf-access-jwt-assertion";

/// Identity used when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// How long fetched Access public keys stay valid
const JWKS_TTL: Duration = Duration::from_secs(3600);

/// How the caller's identity was established
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// Cloudflare Access JWT, signature verified
    CloudflareJwt,
    /// Cloudflare Access email header, trusted without verification
    CloudflareHeader,
    /// Authentication disabled
    None,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::CloudflareJwt => "cloudflare_jwt",
            AuthMethod::CloudflareHeader => "cloudflare_header",
            AuthMethod::None => "none",
        }
    }
}

/// The resolved caller identity, inserted as a request extension
#[derive(Clone, Debug)]
pub struct Identity {
    /// Email, or [`LOCAL_DEV_USER`] when authentication is disabled
    pub user: String,
    pub method: AuthMethod,
}

impl Identity {
    pub fn local_dev() -> Self {
        Self {
            user: LOCAL_DEV_USER.to_string(),
            method: AuthMethod::None,
        }
    }
}

/// Cached Cloudflare Access public keys
///
/// Keys rotate rarely; a fetch per request would put the certs endpoint on
/// the hot path. Entries expire after [`JWKS_TTL`].
#[derive(Default)]
pub struct JwksCache {
    inner: RwLock<Option<CachedJwks>>,
}

struct CachedJwks {
    keys: Vec<jsonwebtoken::jwk::Jwk>,
    fetched_at: Instant,
}

impl JwksCache {
    async fn get_or_fetch(&self, certs_url: &str) -> Result<Vec<jsonwebtoken::jwk::Jwk>, String> {
        if let Some(cached) = self.inner.read().await.as_ref() {
            if cached.fetched_at.elapsed() < JWKS_TTL {
                return Ok(cached.keys.clone());
            }
        }

        let keys = fetch_access_keys(certs_url).await?;
        *self.inner.write().await = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}

/// Identity middleware: resolves the caller and stores it as an extension,
/// or rejects the request with 401
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        request.extensions_mut().insert(Identity::local_dev());
        return next.run(request).await;
    }

    // Cloudflare Access JWT first (cryptographic verification)
    if state.config.cf_access.jwt_enabled() {
        if let Some(jwt) = request
            .headers()
            .get(CF_ACCESS_JWT_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            match validate_access_jwt(jwt, &state.config.cf_access, &state.jwks).await {
                Ok(email) => {
                    info!(user = %email, path = %request.uri().path(), "Authenticated via Cloudflare JWT");
                    request.extensions_mut().insert(Identity {
                        user: email,
                        method: AuthMethod::CloudflareJwt,
                    });
                    return next.run(request).await;
                }
                Err(e) => {
                    warn!(error = %e, path = %request.uri().path(), "Invalid Cloudflare JWT");
                    // Fall through to the header check
                }
            }
        }
    }

    // Cloudflare Access user header (trusted when behind CF Tunnel).
    // Still checked when JWT validation failed, to degrade gracefully
    // during key rotation.
    let cf_user = request
        .headers()
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    if let Some(email) = cf_user {
        if state.config.cf_access.jwt_enabled() {
            warn!(
                user = %email,
                path = %request.uri().path(),
                "Authenticated via CF header (JWT validation configured but no valid JWT)"
            );
        } else {
            info!(user = %email, path = %request.uri().path(), "Authenticated via Cloudflare Access header");
        }
        request.extensions_mut().insert(Identity {
            user: email.to_string(),
            method: AuthMethod::CloudflareHeader,
        });
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no identity");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate a Cloudflare Access JWT
///
/// Checks the signature against the team's public keys plus the audience
/// and issuer claims, and returns the authenticated email.
async fn validate_access_jwt(
    token: &str,
    config: &CfAccessConfig,
    jwks: &JwksCache,
) -> Result<String, String> {
    use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

    let team_name = config
        .team_name
        .as_ref()
        .ok_or("Team name not configured")?;
    let audience = config.audience.as_ref().ok_or("Audience not configured")?;

    // Decode header to get the key ID (kid)
    let header = decode_header(token).map_err(|e| format!("Invalid JWT header: {}", e))?;
    let kid = header.kid.ok_or("JWT missing key ID (kid)")?;

    let certs_url = format!(
        "https://{}.cloudflareaccess.com/cdn-cgi/access/certs",
        team_name
    );

    let keys = jwks
        .get_or_fetch(&certs_url)
        .await
        .map_err(|e| format!("Failed to fetch CF public keys: {}", e))?;

    // Find the key matching the JWT's kid
    let jwk = keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(&kid))
        .ok_or_else(|| format!("No matching key found for kid: {}", kid))?;

    let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| format!("Invalid JWK: {}", e))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[format!("https://{}.cloudflareaccess.com", team_name)]);

    #[derive(serde::Deserialize)]
    struct Claims {
        email: Option<String>,
        sub: String,
    }

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("JWT validation failed: {}", e))?;

    // Return email if present, otherwise subject
    Ok(token_data.claims.email.unwrap_or(token_data.claims.sub))
}

/// Fetch Cloudflare Access public keys from the certs endpoint
async fn fetch_access_keys(url: &str) -> Result<Vec<jsonwebtoken::jwk::Jwk>, String> {
    #[derive(serde::Deserialize)]
    struct JwkSet {
        keys: Vec<jsonwebtoken::jwk::Jwk>,
    }

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let jwk_set: JwkSet = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JWK set: {}", e))?;

    Ok(jwk_set.keys)
}

/// Logout URL at the Access proxy, when a team is configured
///
/// Sign-out is the proxy's concern; the server only tells clients where
/// it lives.
pub fn logout_url(config: &CfAccessConfig) -> Option<String> {
    config
        .team_name
        .as_ref()
        .map(|team| format!("https://{}.cloudflareaccess.com/cdn-cgi/access/logout", team))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logout_url_requires_team() {
        assert_eq!(logout_url(&CfAccessConfig::default()), None);

        let config = CfAccessConfig {
            team_name: Some("myteam".to_string()),
            audience: None,
        };
        assert_eq!(
            logout_url(&config).as_deref(),
            Some("https://myteam.cloudflareaccess.com/cdn-cgi/access/logout")
        );
    }

    #[test]
    fn test_jwt_enabled_needs_both_fields() {
        let mut config = CfAccessConfig {
            team_name: Some("myteam".to_string()),
            audience: None,
        };
        assert!(!config.jwt_enabled());

        config.audience = Some("aud-tag".to_string());
        assert!(config.jwt_enabled());
    }

    #[test]
    fn test_local_dev_identity() {
        let identity = Identity::local_dev();
        assert_eq!(identity.user, LOCAL_DEV_USER);
        assert_eq!(identity.method, AuthMethod::None);
        assert_eq!(identity.method.as_str(), "none");
    }
}
