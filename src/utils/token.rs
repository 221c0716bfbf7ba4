use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues an HS256 token. Login lives in the identity service, so this is
/// only used by tooling and tests that need a token the server will accept.
pub fn create_token(user_id: &str, secret: &[u8], expires_in_seconds: i64) -> Result<String, Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, Error> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(decoded.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_returns_subject() {
        let secret = b"a-test-secret";
        let token = create_token("4a9c3f43-5d4c-4b6c-9d8c-5c2e9f6a1b11", secret, 60).unwrap();
        let sub = decode_token(token, secret).unwrap();
        assert_eq!(sub, "4a9c3f43-5d4c-4b6c-9d8c-5c2e9f6a1b11");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("user", b"right", 60).unwrap();
        assert!(decode_token(token, b"wrong").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Validation allows 60s of leeway by default.
        let token = create_token("user", b"secret", -600).unwrap();
        assert!(decode_token(token, b"secret").is_err());
    }

    #[test]
    fn empty_subject_is_refused() {
        assert!(create_token("", b"secret", 60).is_err());
    }
}
