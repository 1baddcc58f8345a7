use crate::error::SilentGuardError;
use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use silent_guard_domain::User;
use silent_guard_infra::{IdentityProviderKey, SilentGuardContext};
use tracing::{info, warn};

/// Claims of a bearer token issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (as UTC timestamp in seconds)
    pub exp: usize,
    /// Subject (whom token refers to)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

fn parse_authtoken_header(token_header_value: &str) -> String {
    token_header_value
        .replace("Bearer", "")
        .replace("bearer", "")
        .trim()
        .to_string()
}

fn decode_token(ctx: &SilentGuardContext, token: &str) -> anyhow::Result<Claims> {
    let (decoding_key, algorithm) = match &ctx.config.idp_key {
        IdentityProviderKey::Secret(secret) => {
            (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        }
        IdentityProviderKey::RsaPem(pem) => (DecodingKey::from_rsa_pem(pem)?, Algorithm::RS256),
    };
    let mut validation = Validation::new(algorithm);
    if let Some(issuer) = &ctx.config.idp_issuer {
        validation.set_issuer(&[issuer]);
    }
    let claims = decode::<Claims>(token, &decoding_key, &validation)?.claims;

    Ok(claims)
}

/// Users are registered the first time they call the api. Registering
/// does not count as a check in.
async fn create_user_if_not_exists(
    subject: &str,
    email: &str,
    ctx: &SilentGuardContext,
) -> Result<User, SilentGuardError> {
    if let Some(mut user) = ctx.repos.users.find_by_subject(subject).await {
        if user.email != email {
            user.email = email.to_string();
            ctx.repos
                .users
                .save(&user)
                .await
                .map_err(|_| SilentGuardError::InternalError)?;
        }
        return Ok(user);
    }

    let user = User::new(
        subject.to_string(),
        email.to_string(),
        ctx.sys.get_timestamp_millis(),
    );
    match ctx.repos.users.insert(&user).await {
        Ok(_) => {
            info!("Registered new user: {}", user.id);
            Ok(user)
        }
        // Another request registered the same subject concurrently
        Err(e) => ctx
            .repos
            .users
            .find_by_subject(subject)
            .await
            .ok_or_else(|| {
                warn!("Unable to register user with subject: {}. Error: {:?}", subject, e);
                SilentGuardError::InternalError
            }),
    }
}

pub async fn protect_route(
    req: &HttpRequest,
    ctx: &SilentGuardContext,
) -> Result<User, SilentGuardError> {
    let token = match req.headers().get("authorization") {
        Some(token) => match token.to_str() {
            Ok(token) => parse_authtoken_header(token),
            Err(_) => {
                return Err(SilentGuardError::Unauthorized(
                    "Malformed authorization header provided".into(),
                ))
            }
        },
        None => {
            return Err(SilentGuardError::Unauthorized(
                "Unable to find bearer token in the authorization header".into(),
            ))
        }
    };

    let claims = decode_token(ctx, &token).map_err(|e| {
        warn!("Unable to decode bearer token: {:?}", e);
        SilentGuardError::Unauthorized("Unable to find user from credentials".into())
    })?;
    let email = match claims.email {
        Some(email) if !email.trim().is_empty() => email,
        _ => {
            return Err(SilentGuardError::Unauthorized(
                "The bearer token does not contain an email".into(),
            ))
        }
    };

    create_user_if_not_exists(&claims.sub, email.trim(), ctx).await
}
