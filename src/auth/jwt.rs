use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

const SESSION_TTL_SECS: usize = 60 * 60 * 24 * 7; // 7 days

pub fn create_jwt(user_id: &str, secret: &str) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() as usize + SESSION_TTL_SECS,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let token = create_jwt("u1", "secret").unwrap();
        let claims = decode_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn wrong_secret_fails() {
        let token = create_jwt("u1", "secret").unwrap();
        assert!(decode_jwt(&token, "other").is_err());
    }
}
