//! The whole engine over file-backed stores: state survives process
//! restarts (fresh store handles over the same files) and weaker hashes
//! are upgraded in place on login.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use keyward::audit::NoopAuditSink;
use keyward::service::{LoginRequest, RegisterRequest};
use keyward::store::{JsonlStore, RecordStore};
use keyward::{
    Argon2Hasher, AuthConfig, AuthError, AuthResult, AuthService, HashCost, OtpProvider, Session,
    User,
};

struct StaticOtp;

impl OtpProvider for StaticOtp {
    fn generate_secret(&self) -> String {
        "JBSWY3DPEHPK3PXP".into()
    }

    fn provisioning_uri(&self, label: &str, issuer: &str, secret: &str) -> AuthResult<String> {
        Ok(format!("otpauth://totp/{issuer}:{label}?secret={secret}&issuer={issuer}"))
    }

    fn verify(&self, code: &str, _secret: &str) -> bool {
        code == "112233"
    }
}

fn service_at(dir: &Path, cost: HashCost) -> (AuthService, Arc<JsonlStore<User>>) {
    let users: Arc<JsonlStore<User>> = Arc::new(JsonlStore::in_dir(dir, "users"));
    let sessions: Arc<JsonlStore<Session>> = Arc::new(JsonlStore::in_dir(dir, "sessions"));
    let config = AuthConfig { hash_cost: cost, ..AuthConfig::default() };
    let service = AuthService::new(
        users.clone(),
        sessions,
        Arc::new(Argon2Hasher::new(cost)),
        Arc::new(StaticOtp),
        Arc::new(NoopAuditSink),
        config,
    );
    (service, users)
}

fn fast_cost() -> HashCost {
    HashCost { m_cost_kib: 1024, t_cost: 1, p_cost: 1 }
}

#[tokio::test]
async fn state_survives_reopening_the_record_files() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let session_id;
    {
        let (service, _) = service_at(tmp.path(), fast_cost());
        service
            .register(RegisterRequest {
                email: "pia@example.com".into(),
                password: "S3gura!2024".into(),
                roles: vec!["user".into()],
                extra_permissions: vec![],
            })
            .await?;
        let resp = service.login(LoginRequest::new("pia@example.com", "S3gura!2024")).await?;
        session_id = resp.session.id;
    }

    // fresh handles over the same files, as after a restart
    let (service, _) = service_at(tmp.path(), fast_cost());
    let found = service.find_by_email("pia@example.com").await?.expect("user persisted");
    assert_eq!(found.email, "pia@example.com");

    // the issued session is still live and revocable
    service.logout(&session_id).await?;
    let again = service.logout(&session_id).await;
    assert!(matches!(again, Err(AuthError::SessionInactive)));
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_refused_at_the_file_level_too() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (service, users) = service_at(tmp.path(), fast_cost());
    service
        .register(RegisterRequest {
            email: "quinn@example.com".into(),
            password: "S3gura!2024".into(),
            roles: vec![],
            extra_permissions: vec![],
        })
        .await?;

    let (reopened, _) = service_at(tmp.path(), fast_cost());
    let dup = reopened
        .register(RegisterRequest {
            email: "Quinn@Example.com".into(),
            password: "S3gura!2024".into(),
            roles: vec![],
            extra_permissions: vec![],
        })
        .await;
    assert!(matches!(dup, Err(AuthError::EmailTaken)));
    assert_eq!(users.list_all().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn outdated_hash_is_upgraded_on_the_next_successful_login() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let uid;
    {
        let (service, _) = service_at(tmp.path(), fast_cost());
        let view = service
            .register(RegisterRequest {
                email: "ruth@example.com".into(),
                password: "S3gura!2024".into(),
                roles: vec!["user".into()],
                extra_permissions: vec![],
            })
            .await?;
        uid = view.id;
    }

    // policy tightened: same files, stricter cost
    let strict = HashCost { m_cost_kib: 2048, t_cost: 2, p_cost: 1 };
    let (service, users) = service_at(tmp.path(), strict);

    let before = users.get_by_id(&uid).await?.expect("user persisted");
    assert!(before.password_hash.contains("m=1024"));

    let resp = service.login(LoginRequest::new("ruth@example.com", "S3gura!2024")).await?;
    assert!(resp.session.active);

    let after = users.get_by_id(&uid).await?.expect("user persisted");
    assert!(after.password_hash.contains("m=2048"), "hash was: {}", after.password_hash);
    // the upgraded hash still verifies on a second login
    let again = service.login(LoginRequest::new("ruth@example.com", "S3gura!2024")).await?;
    assert!(again.session.active);
    Ok(())
}

#[tokio::test]
async fn failed_attempts_are_persisted_across_restarts() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    {
        let (service, _) = service_at(tmp.path(), fast_cost());
        service
            .register(RegisterRequest {
                email: "sven@example.com".into(),
                password: "S3gura!2024".into(),
                roles: vec![],
                extra_permissions: vec![],
            })
            .await?;
        for _ in 0..3 {
            let _ = service.login(LoginRequest::new("sven@example.com", "Wr0ng!pass")).await;
        }
    }

    let (service, users) = service_at(tmp.path(), fast_cost());
    let stored = users.list_all().await?.pop().expect("user persisted");
    assert_eq!(stored.failed_login_attempts, 3);

    // two more after the restart reach the threshold
    for _ in 0..2 {
        let _ = service.login(LoginRequest::new("sven@example.com", "Wr0ng!pass")).await;
    }
    let locked = service.login(LoginRequest::new("sven@example.com", "S3gura!2024")).await;
    assert!(matches!(locked, Err(AuthError::AccountLocked { .. })));
    Ok(())
}
