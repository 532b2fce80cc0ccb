//! Unit tests for JWT functionality.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{Claims, Role};
use crate::jwt::{JwtConfig, JwtError, JwtService};

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: 15,
    })
}

#[test]
fn test_claims_new_sets_correct_fields() {
    let user_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);

    let claims = Claims::new(user_id, Role::Admin, expires_at);

    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, Role::Admin);
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
    assert!(claims.is_admin());
}

#[test]
fn test_generate_and_validate_roundtrip_keeps_role() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();

    let token = service.generate_access_token(user_id, Role::Client).unwrap();
    let claims = service.validate_token(&token).unwrap();

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.role, Role::Client);
    assert!(!claims.is_admin());
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    let result = service.validate_token("invalid.token.here");
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let service = create_test_service();
    let other = JwtService::new(JwtConfig {
        secret: "another-secret".to_string(),
        access_token_expires_minutes: 15,
    });

    let token = other
        .generate_access_token(Uuid::new_v4(), Role::Admin)
        .unwrap();
    assert!(service.validate_token(&token).is_err());
}

#[test]
fn test_expired_token() {
    let service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: -10,
    });

    let token = service
        .generate_access_token(Uuid::new_v4(), Role::Admin)
        .unwrap();
    assert!(matches!(service.validate_token(&token), Err(JwtError::Expired)));
}

#[test]
fn test_expires_in_seconds() {
    let service = create_test_service();
    assert_eq!(service.access_token_expires_in(), 900);
}

#[test]
fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!("CLIENT".parse::<Role>().unwrap(), Role::Client);
    assert!("owner".parse::<Role>().is_err());
    assert_eq!(Role::Admin.to_string(), "admin");
}
