use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use palaver_types::api::{Claims, Role};

/// Tokens are good for 7 days from issuance.
const TOKEN_TTL_DAYS: i64 = 7;

pub fn issue(secret: &str, user_id: Uuid, username: &str, role: Role) -> anyhow::Result<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    issue_with_exp(secret, user_id, username, role, exp)
}

fn issue_with_exp(
    secret: &str,
    user_id: Uuid,
    username: &str,
    role: Role,
    exp: usize,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// `None` on signature mismatch, malformed structure, or expiry. Zero leeway,
/// and a token is rejected at its expiry instant, not one second later —
/// jsonwebtoken alone still accepts `exp == now`.
pub fn verify(secret: &str, token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)?;

    if claims.exp as i64 <= chrono::Utc::now().timestamp() {
        return None;
    }

    Some(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_verify_roundtrip() {
        let id = Uuid::new_v4();
        let token = issue(SECRET, id, "alice", Role::User).unwrap();

        let claims = verify(SECRET, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn admin_role_survives_roundtrip() {
        let token = issue(SECRET, Uuid::new_v4(), "root", Role::Admin).unwrap();
        assert_eq!(verify(SECRET, &token).unwrap().role, Role::Admin);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue(SECRET, Uuid::new_v4(), "alice", Role::User).unwrap();
        assert!(verify("other-secret", &token).is_none());
    }

    #[test]
    fn garbage_rejected() {
        assert!(verify(SECRET, "not-a-jwt").is_none());
        assert!(verify(SECRET, "").is_none());
    }

    #[test]
    fn expired_token_rejected_even_with_valid_signature() {
        let exp = (chrono::Utc::now() - chrono::Duration::seconds(1)).timestamp() as usize;
        let token = issue_with_exp(SECRET, Uuid::new_v4(), "alice", Role::User, exp).unwrap();
        assert!(verify(SECRET, &token).is_none());
    }

    #[test]
    fn token_rejected_at_its_exact_expiry_instant() {
        // exp == now: already invalid, not valid for one more second
        let exp = chrono::Utc::now().timestamp() as usize;
        let token = issue_with_exp(SECRET, Uuid::new_v4(), "alice", Role::User, exp).unwrap();
        assert!(verify(SECRET, &token).is_none());
    }

    #[test]
    fn unexpired_token_accepted() {
        let exp = (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp() as usize;
        let token = issue_with_exp(SECRET, Uuid::new_v4(), "alice", Role::User, exp).unwrap();
        assert!(verify(SECRET, &token).is_some());
    }

    #[test]
    fn claims_with_unknown_fields_rejected() {
        // Same signature scheme, but a payload shape we did not issue.
        #[derive(serde::Serialize)]
        struct LooseClaims {
            sub: Uuid,
            username: String,
            role: Role,
            exp: usize,
            is_superuser: bool,
        }

        let loose = LooseClaims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            role: Role::User,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
            is_superuser: true,
        };

        let token = encode(
            &Header::default(),
            &loose,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(verify(SECRET, &token).is_none());
    }
}
