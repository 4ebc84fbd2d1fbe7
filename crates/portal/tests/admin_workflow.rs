//! End-to-end admin flow against the in-memory backend.

use std::sync::Arc;

use aluguetudo_auth::{Role, SessionState, UserDraft, UserStatus};
use aluguetudo_gateway::{BackendClient, InMemoryBackend, Op};
use aluguetudo_portal::{
    NoticeLevel, NoticeLog, ProvisionOutcome, ProvisionPath, Provisioner, ProvisioningConfig, SaveOutcome,
    SessionHolder, UserDirectory,
};

#[tokio::test]
async fn save_creates_then_updates_then_deletes() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_user("admin@aluguetudo.com", "admin123", "Administrador", &["admin"]);

    let notices = Arc::new(NoticeLog::new());
    let client = BackendClient::new(backend.clone());
    let mut session = SessionHolder::new(client.clone(), notices.clone());
    let mut directory = UserDirectory::new(client, notices.clone());
    let provisioner = Provisioner::new(ProvisioningConfig::default(), notices.clone());

    session.sign_in("admin@aluguetudo.com", "admin123").await.unwrap();

    let mut draft = UserDraft {
        id: None,
        name: "Eduarda Pires".to_string(),
        email: "eduarda@aluguetudo.com".to_string(),
        password: Some("senha123".to_string()),
        roles: vec![Role::new("financeiro")],
        status: UserStatus::Active,
    };

    let created = directory.save(&draft, &provisioner, &mut session).await.unwrap();
    let SaveOutcome::Provisioned(ProvisionOutcome::Created { user_id, via }) = created else {
        panic!("expected a created account, got {created:?}");
    };
    assert_eq!(via, ProvisionPath::ServerProcedure);
    assert_eq!(directory.users().len(), 2);

    draft.id = Some(user_id);
    draft.password = None;
    draft.roles.push(Role::new("comercial"));
    let updated = directory.save(&draft, &provisioner, &mut session).await.unwrap();
    assert_eq!(updated, SaveOutcome::Updated);
    assert!(directory.get(user_id).unwrap().has_role("comercial"));

    directory.delete(user_id).await.unwrap();
    assert!(directory.get(user_id).is_none());
    assert_eq!(backend.call_count(Op::DeleteUser), 1);

    assert!(matches!(session.state(), SessionState::Authenticated(_)));
    assert!(!notices.has(NoticeLevel::Error));
}

#[tokio::test]
async fn non_admin_cannot_list_users_through_backend_policy() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_user("op@aluguetudo.com", "senha123", "Otávio", &["operacional"]);

    let notices = Arc::new(NoticeLog::new());
    let client = BackendClient::new(backend.clone());
    let mut session = SessionHolder::new(client.clone(), notices.clone());
    session.sign_in("op@aluguetudo.com", "senha123").await.unwrap();

    let mut directory = UserDirectory::new(client, notices.clone());
    assert!(directory.fetch().await.is_err());
    assert!(notices.has(NoticeLevel::Error));
}
