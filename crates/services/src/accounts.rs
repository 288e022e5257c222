//! Account use cases: login, per-request identity resolution and staff user
//! management backed by the credential store.

use std::sync::{Arc, OnceLock};

use domains::{
    authorize, AppError, AuditAction, CredentialHasher, Identity, NewUserRecord, Requirement,
    Result, Role, SessionClaims, TokenCodec, User, UserChanges, UserId, UserRepo,
};
use tracing::{info, instrument};

use crate::audit::AuditRecorder;
use crate::utils::{check_password, required};

/// Same message for unknown user and wrong secret.
const BAD_CREDENTIALS: &str = "invalid username or password";

/// Verified against when the username is unknown, so both failures cost one verification.
const DECOY_SECRET: &str = "decoy-credential-never-issued";

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct EditUser {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenCodec>,
    audit: AuditRecorder,
    decoy_hash: Arc<OnceLock<String>>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenCodec>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            audit,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Exchange credentials for a session token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let found = self.users.find_credentials(username.trim()).await?;
        let user = match found {
            Some((user, hash)) if self.hasher.verify(password, &hash) => user,
            Some(_) => return Err(AppError::Authentication(BAD_CREDENTIALS.into())),
            None => {
                self.verify_decoy(password);
                return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
            }
        };

        let token = self.tokens.issue(&SessionClaims {
            user_id: user.id,
            username: user.username.clone(),
        })?;
        self.audit
            .record(Some(user.id), AuditAction::Login, format!("{} signed in", user.username))
            .await;
        Ok(LoginOutcome { token, user })
    }

    fn verify_decoy(&self, password: &str) {
        let decoy = match self.decoy_hash.get() {
            Some(hash) => Some(hash),
            None => self
                .hasher
                .hash(DECOY_SECRET)
                .ok()
                .map(|hash| self.decoy_hash.get_or_init(|| hash)),
        };
        if let Some(hash) = decoy {
            self.hasher.verify(password, hash);
        }
    }

    /// Resolve a bearer token into the caller's current identity.
    ///
    /// The role is reloaded from the store so revoked capabilities apply
    /// to the very next request.
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        let claims = self.tokens.decode(token)?;
        match self.users.find_by_id(claims.user_id).await? {
            Some(user) if user.username == claims.username => Ok(Identity::from(&user)),
            _ => Err(AppError::Authentication("session no longer valid".into())),
        }
    }

    pub async fn profile(&self, identity: &Identity) -> Result<User> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", identity.user_id))
    }

    pub async fn list_users(&self, identity: &Identity) -> Result<Vec<User>> {
        authorize(identity, Requirement::Admin)?;
        self.users.list().await
    }

    pub async fn get_user(&self, identity: &Identity, id: UserId) -> Result<User> {
        authorize(identity, Requirement::Admin)?;
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    pub async fn create_user(&self, identity: &Identity, req: CreateUser) -> Result<User> {
        authorize(identity, Requirement::Admin)?;
        let user = self.insert(req).await?;
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::UserCreate,
                format!("created {} '{}' (id {})", user.role.name(), user.username, user.id),
            )
            .await;
        Ok(user)
    }

    pub async fn update_user(&self, identity: &Identity, id: UserId, edit: EditUser) -> Result<User> {
        authorize(identity, Requirement::Admin)?;
        if id == identity.user_id && matches!(edit.role, Some(Role::Editor(_))) {
            return Err(AppError::Conflict("administrators cannot demote themselves".into()));
        }

        let mut changes = UserChanges {
            role: edit.role,
            ..UserChanges::default()
        };
        if let Some(name) = edit.display_name {
            changes.display_name = Some(required("display_name", &name)?);
        }
        if let Some(email) = edit.email {
            changes.email = Some(normalize_email(&email)?);
        }
        if let Some(password) = edit.password {
            check_password(&password)?;
            changes.password_hash = Some(self.hasher.hash(&password)?);
        }
        if changes == UserChanges::default() {
            return Err(AppError::Validation("no updates provided".into()));
        }

        let mut fields = Vec::new();
        if changes.display_name.is_some() {
            fields.push("display_name");
        }
        if changes.email.is_some() {
            fields.push("email");
        }
        if changes.role.is_some() {
            fields.push("role");
        }
        if changes.password_hash.is_some() {
            fields.push("password");
        }

        let user = self
            .users
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))?;
        self.audit
            .record(
                Some(identity.user_id),
                AuditAction::UserUpdate,
                format!("updated {} of '{}' (id {})", fields.join(", "), user.username, user.id),
            )
            .await;
        Ok(user)
    }

    /// Create an account without an acting user (seeding tools).
    pub async fn provision(&self, req: CreateUser) -> Result<User> {
        let user = self.insert(req).await?;
        self.audit
            .record(
                None,
                AuditAction::UserBootstrap,
                format!("provisioned {} '{}' (id {})", user.role.name(), user.username, user.id),
            )
            .await;
        Ok(user)
    }

    /// First-run seeding: creates the admin only when no user exists yet.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        if self.users.count().await? > 0 {
            return Ok(None);
        }
        let user = self
            .provision(CreateUser {
                username: username.to_string(),
                email: email.to_string(),
                display_name: None,
                password: password.to_string(),
                role: Role::Admin,
            })
            .await?;
        info!(username = %user.username, "bootstrap administrator created");
        Ok(Some(user))
    }

    async fn insert(&self, req: CreateUser) -> Result<User> {
        let username = required("username", &req.username)?;
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(AppError::Validation(
                "username may contain only letters, digits, '_', '-' and '.'".into(),
            ));
        }
        let email = normalize_email(&req.email)?;
        check_password(&req.password)?;
        let display_name = match req.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => username.clone(),
        };

        let record = NewUserRecord {
            username,
            email,
            display_name,
            password_hash: self.hasher.hash(&req.password)?,
            role: req.role,
        };
        self.users.create(&record).await
    }
}

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = required("email", email)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation(format!("'{email}' is not a valid email address"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{Capability, MockAuditRepo, MockCredentialHasher, MockTokenCodec, MockUserRepo};
    use mockall::predicate::eq;

    fn user(id: UserId, username: &str, role: Role) -> User {
        User {
            id,
            username: username.into(),
            email: format!("{username}@example.org"),
            display_name: username.into(),
            role,
            created_at: Utc::now(),
        }
    }

    fn quiet_audit() -> AuditRecorder {
        let mut audit = MockAuditRepo::new();
        audit
            .expect_append()
            .returning(|_| Err(AppError::Storage("not under test".into())));
        AuditRecorder::new(Arc::new(audit))
    }

    fn service(users: MockUserRepo, hasher: MockCredentialHasher, tokens: MockTokenCodec) -> AccountService {
        AccountService::new(Arc::new(users), Arc::new(hasher), Arc::new(tokens), quiet_audit())
    }

    #[tokio::test]
    async fn login_rejects_unknown_user_and_wrong_password_alike() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_credentials()
            .with(eq("ghost"))
            .returning(|_| Ok(None));
        users
            .expect_find_credentials()
            .with(eq("ana"))
            .returning(|_| Ok(Some((user(2, "ana", Role::Admin), "hash".into()))));
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|_| Ok("decoy".into()));
        hasher.expect_verify().returning(|_, _| false);

        let svc = service(users, hasher, MockTokenCodec::new());
        let unknown = svc.login("ghost", "whatever").await.err().unwrap();
        let wrong = svc.login("ana", "whatever").await.err().unwrap();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.kind(), "authentication");
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_one_verification() {
        let mut users = MockUserRepo::new();
        users.expect_find_credentials().returning(|_| Ok(None));
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .withf(|secret| secret == DECOY_SECRET)
            .times(1)
            .returning(|_| Ok("$argon2id$decoy".into()));
        hasher
            .expect_verify()
            .withf(|password, hash| password == "guess" && hash == "$argon2id$decoy")
            .times(2)
            .returning(|_, _| false);

        let svc = service(users, hasher, MockTokenCodec::new());
        for _ in 0..2 {
            let err = svc.login("ghost", "guess").await.unwrap_err();
            assert_eq!(err.kind(), "authentication");
        }
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_credentials()
            .returning(|_| Ok(Some((user(2, "ana", Role::Admin), "hash".into()))));
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_verify().returning(|p, h| p == "correct horse" && h == "hash");
        let mut tokens = MockTokenCodec::new();
        tokens
            .expect_issue()
            .withf(|c| c.user_id == 2 && c.username == "ana")
            .returning(|_| Ok("signed".into()));

        let outcome = service(users, hasher, tokens)
            .login("ana", "correct horse")
            .await
            .unwrap();
        assert_eq!(outcome.token, "signed");
        assert_eq!(outcome.user.id, 2);
    }

    #[tokio::test]
    async fn authenticate_reloads_current_role() {
        let mut tokens = MockTokenCodec::new();
        tokens.expect_decode().returning(|_| {
            Ok(SessionClaims {
                user_id: 3,
                username: "desk".into(),
            })
        });
        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .with(eq(3_i64))
            .returning(|_| Ok(Some(user(3, "desk", Role::editor([Capability::News])))));

        let identity = service(users, MockCredentialHasher::new(), tokens)
            .authenticate("t")
            .await
            .unwrap();
        assert_eq!(identity.role, Role::editor([Capability::News]));
    }

    #[tokio::test]
    async fn authenticate_fails_closed_when_user_vanished() {
        let mut tokens = MockTokenCodec::new();
        tokens.expect_decode().returning(|_| {
            Ok(SessionClaims {
                user_id: 9,
                username: "gone".into(),
            })
        });
        let mut users = MockUserRepo::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let err = service(users, MockCredentialHasher::new(), tokens)
            .authenticate("t")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "authentication");
    }

    #[tokio::test]
    async fn editors_cannot_manage_users() {
        let svc = service(MockUserRepo::new(), MockCredentialHasher::new(), MockTokenCodec::new());
        let editor = Identity::from(&user(4, "ed", Role::editor(Capability::ALL)));
        let err = svc.list_users(&editor).await.unwrap_err();
        assert_eq!(err.kind(), "authorization");
    }

    #[tokio::test]
    async fn create_user_validates_before_touching_store() {
        let svc = service(MockUserRepo::new(), MockCredentialHasher::new(), MockTokenCodec::new());
        let admin = Identity::from(&user(1, "chief", Role::Admin));
        let err = svc
            .create_user(
                &admin,
                CreateUser {
                    username: "new editor".into(),
                    email: "ed@example.org".into(),
                    display_name: None,
                    password: "longenough".into(),
                    role: Role::editor([]),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn admin_cannot_demote_self() {
        let svc = service(MockUserRepo::new(), MockCredentialHasher::new(), MockTokenCodec::new());
        let admin = Identity::from(&user(1, "chief", Role::Admin));
        let err = svc
            .update_user(
                &admin,
                1,
                EditUser {
                    role: Some(Role::editor([Capability::News])),
                    ..EditUser::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn bootstrap_is_skipped_when_users_exist() {
        let mut users = MockUserRepo::new();
        users.expect_count().returning(|| Ok(1));
        users.expect_create().never();
        let svc = service(users, MockCredentialHasher::new(), MockTokenCodec::new());
        let seeded = svc
            .bootstrap_admin("admin", "admin@example.org", "changeme123")
            .await
            .unwrap();
        assert!(seeded.is_none());
    }

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(normalize_email(" Ana@Example.ORG ").unwrap(), "ana@example.org");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.org").is_err());
    }
}
