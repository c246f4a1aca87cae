// src/services/identity.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AppUserRepository,
    models::{auth::Session, user::AppUser},
};

/// The persistence seam the resolver drives: lookups by link and by
/// email, link attachment, and linked creation.
#[allow(async_fn_in_trait)]
pub trait IdentityStore {
    async fn find_by_auth_user_id(&self, auth_user_id: Uuid) -> Result<Option<AppUser>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError>;
    async fn link_auth_user(&self, id: Uuid, auth_user_id: Uuid) -> Result<AppUser, AppError>;
    async fn create_linked(&self, email: &str, auth_user_id: Uuid) -> Result<AppUser, AppError>;
}

impl IdentityStore for AppUserRepository {
    async fn find_by_auth_user_id(&self, auth_user_id: Uuid) -> Result<Option<AppUser>, AppError> {
        AppUserRepository::find_by_auth_user_id(self, auth_user_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError> {
        AppUserRepository::find_by_email(self, email).await
    }

    async fn link_auth_user(&self, id: Uuid, auth_user_id: Uuid) -> Result<AppUser, AppError> {
        AppUserRepository::link_auth_user(self, id, auth_user_id).await
    }

    async fn create_linked(&self, email: &str, auth_user_id: Uuid) -> Result<AppUser, AppError> {
        AppUserRepository::create_linked(self, email, auth_user_id).await
    }
}

// Maps an authenticated session onto the application-user record,
// creating or linking one on first sight.
#[derive(Clone)]
pub struct IdentityService<S = AppUserRepository> {
    store: S,
}

impl<S: IdentityStore> IdentityService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolution order is fixed: the external-session link wins over
    /// email, email wins over creation. Idempotent: the same session
    /// always converges on the same record.
    pub async fn resolve(&self, session: &Session) -> Result<AppUser, AppError> {
        // 1. By external link, once one exists it is authoritative.
        if let Some(user) = self.store.find_by_auth_user_id(session.auth_user_id).await? {
            return Ok(user);
        }

        // 2. By email; attach the link if the record is still unlinked.
        if let Some(user) = self.store.find_by_email(&session.email).await? {
            if user.auth_user_id.is_none() {
                return self.store.link_auth_user(user.id, session.auth_user_id).await;
            }
            return Ok(user);
        }

        // 3. Create. Two sessions racing on the same email trip the
        // unique constraint; the loser re-reads and links, which is the
        // benign outcome.
        match self
            .store
            .create_linked(&session.email, session.auth_user_id)
            .await
        {
            Ok(user) => Ok(user),
            Err(AppError::Conflict(_)) => {
                let user = self
                    .store
                    .find_by_email(&session.email)
                    .await?
                    .ok_or(AppError::NotFound("application user"))?;
                if user.auth_user_id.is_none() {
                    return self.store.link_auth_user(user.id, session.auth_user_id).await;
                }
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::PlatformRole;
    use chrono::Utc;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    // In-memory store. `email_lookup_skips` makes the first N email
    // lookups miss, and `conflict_on_create` fails the insert, which
    // together reproduce losing the insert race: the record exists, but
    // only the post-conflict re-read sees it.
    struct StubStore {
        users: Mutex<Vec<AppUser>>,
        conflict_on_create: bool,
        email_lookup_skips: AtomicUsize,
    }

    impl StubStore {
        fn empty() -> Self {
            Self {
                users: Mutex::new(Vec::new()),
                conflict_on_create: false,
                email_lookup_skips: AtomicUsize::new(0),
            }
        }

        fn with_unlinked(email: &str) -> Self {
            Self {
                users: Mutex::new(vec![make_user(email, None)]),
                conflict_on_create: false,
                email_lookup_skips: AtomicUsize::new(0),
            }
        }

        fn racing(email: &str) -> Self {
            Self {
                users: Mutex::new(vec![make_user(email, None)]),
                conflict_on_create: true,
                email_lookup_skips: AtomicUsize::new(1),
            }
        }
    }

    fn make_user(email: &str, auth_user_id: Option<Uuid>) -> AppUser {
        let now = Utc::now();
        AppUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            auth_user_id,
            first_name: None,
            last_name: None,
            platform_role: PlatformRole::None,
            created_at: now,
            updated_at: now,
        }
    }

    impl IdentityStore for StubStore {
        async fn find_by_auth_user_id(
            &self,
            auth_user_id: Uuid,
        ) -> Result<Option<AppUser>, AppError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.auth_user_id == Some(auth_user_id))
                .cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError> {
            if self
                .email_lookup_skips
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Ok(None);
            }
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn link_auth_user(&self, id: Uuid, auth_user_id: Uuid) -> Result<AppUser, AppError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(AppError::NotFound("application user"))?;
            user.auth_user_id = Some(auth_user_id);
            Ok(user.clone())
        }

        async fn create_linked(
            &self,
            email: &str,
            auth_user_id: Uuid,
        ) -> Result<AppUser, AppError> {
            let mut users = self.users.lock().unwrap();
            if self.conflict_on_create || users.iter().any(|u| u.email == email) {
                return Err(AppError::Conflict("email".to_string()));
            }
            let user = make_user(email, Some(auth_user_id));
            users.push(user.clone());
            Ok(user)
        }
    }

    fn session(email: &str) -> Session {
        Session { auth_user_id: Uuid::new_v4(), email: email.to_string() }
    }

    #[tokio::test]
    async fn resolve_is_idempotent_for_the_same_session() {
        let service = IdentityService::new(StubStore::empty());
        let s = session("new@acme.com");

        let first = service.resolve(&s).await.unwrap();
        let second = service.resolve(&s).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.auth_user_id, Some(s.auth_user_id));
        assert_eq!(service.store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_unlinked_record_gets_linked_not_duplicated() {
        let service = IdentityService::new(StubStore::with_unlinked("old@acme.com"));
        let s = session("old@acme.com");

        let resolved = service.resolve(&s).await.unwrap();

        assert_eq!(resolved.auth_user_id, Some(s.auth_user_id));
        assert_eq!(service.store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn losing_the_insert_race_converges_on_the_winner_record() {
        let service = IdentityService::new(StubStore::racing("raced@acme.com"));
        let expected_id = service.store.users.lock().unwrap()[0].id;
        let s = session("raced@acme.com");

        let resolved = service.resolve(&s).await.unwrap();

        assert_eq!(resolved.id, expected_id);
        assert_eq!(resolved.auth_user_id, Some(s.auth_user_id));
        assert_eq!(service.store.users.lock().unwrap().len(), 1);
    }
}
