// common/src/utils.rs
use chrono::Utc;
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use serde::{Serialize, Deserialize};
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// Bearer tokens stay valid for 24 hours
pub const JWT_TTL_SECONDS: i64 = 86400;

/// Setup tracing for the service; unknown level names fall back to INFO
pub fn setup_tracing(level: &str) -> Result<(), SetGlobalDefaultError> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,       // client context id
    pub wallet: String,    // wallet_address
    pub exp: usize,        // expiration time
    pub iat: usize,        // issued at time
}

/// Issue a bearer token binding a client context to the wallet it logged in with
pub fn generate_jwt_token(client_id: &Uuid, wallet_address: &str, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();

    let claims = JwtClaims {
        sub: client_id.to_string(),
        wallet: wallet_address.to_string(),
        iat: now as usize,
        exp: (now + JWT_TTL_SECONDS) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret)
    )
}

/// Validate a bearer token and extract the client id and wallet address
pub fn validate_jwt_token(token: &str, secret: &[u8]) -> Result<(Uuid, String), jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    let uuid = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidSubject)?;

    Ok((uuid, token_data.claims.wallet))
}

/// `0x1234...abcd` form used in headers and logs
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_round_trip() {
        let client_id = Uuid::new_v4();
        let token = generate_jwt_token(&client_id, "0xabc", b"secret").unwrap();
        let (id, wallet) = validate_jwt_token(&token, b"secret").unwrap();
        assert_eq!(id, client_id);
        assert_eq!(wallet, "0xabc");
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let token = generate_jwt_token(&Uuid::new_v4(), "0xabc", b"secret").unwrap();
        assert!(validate_jwt_token(&token, b"other").is_err());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(short_address("0x12"), "0x12");
    }
}
