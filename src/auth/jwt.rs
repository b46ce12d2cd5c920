use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::TokenType;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    pub(crate) fn issue(
        user_id: u64,
        role: u8,
        company_id: u64,
        token_type: TokenType,
        secret: &str,
        ttl: i64,
    ) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            user_id,
            sub: format!("user{user_id}"),
            role,
            company_id,
            exp: (now + ttl) as usize,
            jti: Uuid::new_v4().to_string(),
            token_type,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let token = issue(7, 3, 10, TokenType::Access, "secret", 900);
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.company_id, 10);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_fail() {
        let token = issue(7, 3, 10, TokenType::Access, "secret", 900);
        assert!(verify_token(&token, "other").is_err());

        let expired = issue(7, 3, 10, TokenType::Access, "secret", -3600);
        assert!(verify_token(&expired, "secret").is_err());
    }
}
