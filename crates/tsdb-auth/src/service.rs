//! User CRUD and privilege checks, proposed through the broker like
//! every other catalog mutation.

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::password;
use std::sync::Arc;
use tsdb_broker::Broker;
use tsdb_meta::catalog::Privilege;
use tsdb_meta::log::LogRecord;
use tsdb_meta::{MetaError, Metastore};

#[derive(Clone)]
pub struct AuthService {
    broker: Arc<dyn Broker>,
    meta: Metastore,
}

/// The principal a request is running as. `Anonymous` only arises during
/// the bootstrap exception: zero users exist, so cluster-admin actions
/// (namely, creating the first user) are allowed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User { name: String },
}

impl AuthService {
    pub fn new(broker: Arc<dyn Broker>, meta: Metastore) -> Self {
        Self { broker, meta }
    }

    async fn propose(&self, record: LogRecord) -> Result<(), MetaError> {
        self.meta.validate(&record).await?;
        let index = self
            .broker
            .propose(record)
            .await
            .map_err(|e| MetaError::Broker(e.to_string()))?;
        self.meta.wait_for_index(index).await;
        Ok(())
    }

    pub async fn create_user(&self, name: String, password: String) -> Result<(), MetaError> {
        let salt = password::generate_salt();
        let password_hash = password::hash_password(&password, &salt);
        self.propose(LogRecord::CreateUser {
            name,
            password_hash,
            salt,
        })
        .await
    }

    pub async fn update_password(&self, name: String, password: String) -> Result<(), MetaError> {
        let salt = password::generate_salt();
        let password_hash = password::hash_password(&password, &salt);
        self.propose(LogRecord::UpdateUserPassword {
            name,
            password_hash,
            salt,
        })
        .await
    }

    pub async fn delete_user(&self, name: String) -> Result<(), MetaError> {
        self.propose(LogRecord::DeleteUser { name }).await
    }

    pub async fn set_privilege(
        &self,
        user: String,
        database: String,
        privilege: Privilege,
    ) -> Result<(), MetaError> {
        self.propose(LogRecord::SetPrivilege {
            user,
            database,
            privilege,
        })
        .await
    }

    /// Resolves credentials to a [`Principal`]. The bootstrap exception
    /// admits an anonymous principal when the cluster has zero
    /// users, so the very first admin can be created without credentials.
    pub async fn authenticate(
        &self,
        credentials: Option<Credentials>,
    ) -> Result<Principal, AuthError> {
        let snapshot = self.meta.snapshot().await;
        if snapshot.users.is_empty() {
            return Ok(Principal::Anonymous);
        }
        let credentials = credentials.ok_or(AuthError::CredentialsRequired)?;
        let user = snapshot
            .users
            .get(&credentials.username)
            .ok_or(AuthError::InvalidCredentials)?;
        if !password::verify_password(&credentials.password, &user.salt, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Principal::User {
            name: user.name.clone(),
        })
    }

    pub async fn authorize_read(&self, principal: &Principal, database: &str) -> Result<(), AuthError> {
        self.authorize(principal, database, Access::Read).await
    }

    pub async fn authorize_write(&self, principal: &Principal, database: &str) -> Result<(), AuthError> {
        self.authorize(principal, database, Access::Write).await
    }

    pub async fn authorize_admin(&self, principal: &Principal) -> Result<(), AuthError> {
        match principal {
            Principal::Anonymous => Ok(()),
            Principal::User { name } => {
                let snapshot = self.meta.snapshot().await;
                let user = snapshot.users.get(name).ok_or(AuthError::AdminRequired)?;
                if user.privileges.get("*").map(|p| p.read && p.write) == Some(true) {
                    Ok(())
                } else {
                    Err(AuthError::AdminRequired)
                }
            }
        }
    }

    async fn authorize(
        &self,
        principal: &Principal,
        database: &str,
        access: Access,
    ) -> Result<(), AuthError> {
        let name = match principal {
            // Anonymous is only valid while the cluster has zero users,
            // which also means there is nothing yet to protect.
            Principal::Anonymous => return Ok(()),
            Principal::User { name } => name,
        };
        let snapshot = self.meta.snapshot().await;
        let user = snapshot.users.get(name).ok_or_else(|| access.denied())?;
        let admin = user.privileges.get("*").copied().unwrap_or_default();
        let scoped = user.privileges.get(database).copied().unwrap_or_default();
        let granted = match access {
            Access::Read => admin.read || scoped.read,
            Access::Write => admin.write || scoped.write,
        };
        if granted {
            Ok(())
        } else {
            Err(access.denied())
        }
    }
}

#[derive(Clone, Copy)]
enum Access {
    Read,
    Write,
}

impl Access {
    fn denied(self) -> AuthError {
        match self {
            Access::Read => AuthError::ReadForbidden,
            Access::Write => AuthError::WriteForbidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdb_broker::LocalBroker;

    fn service() -> AuthService {
        let broker: Arc<dyn Broker> = Arc::new(LocalBroker::new());
        let meta = Metastore::new();
        tsdb_broker::spawn_apply_loop(broker.clone(), meta.clone());
        AuthService::new(broker, meta)
    }

    #[tokio::test]
    async fn bootstrap_admits_anonymous_when_no_users_exist() {
        let svc = service();
        let principal = svc.authenticate(None).await.unwrap();
        assert_eq!(principal, Principal::Anonymous);
    }

    #[tokio::test]
    async fn after_first_user_anonymous_requests_are_rejected() {
        let svc = service();
        svc.create_user("admin".to_string(), "pw".to_string())
            .await
            .unwrap();
        let err = svc.authenticate(None).await.unwrap_err();
        assert_eq!(err, AuthError::CredentialsRequired);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let svc = service();
        svc.create_user("admin".to_string(), "pw".to_string())
            .await
            .unwrap();
        let err = svc
            .authenticate(Some(Credentials {
                username: "admin".to_string(),
                password: "wrong".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn write_privilege_is_required_for_write_access() {
        let svc = service();
        svc.create_user("bob".to_string(), "pw".to_string())
            .await
            .unwrap();
        svc.set_privilege(
            "bob".to_string(),
            "metrics".to_string(),
            Privilege {
                read: true,
                write: false,
            },
        )
        .await
        .unwrap();
        let principal = Principal::User {
            name: "bob".to_string(),
        };
        assert!(svc.authorize_read(&principal, "metrics").await.is_ok());
        assert_eq!(
            svc.authorize_write(&principal, "metrics").await.unwrap_err(),
            AuthError::WriteForbidden
        );
    }

    #[tokio::test]
    async fn admin_wildcard_grants_every_database() {
        let svc = service();
        svc.create_user("root".to_string(), "pw".to_string())
            .await
            .unwrap();
        svc.set_privilege("root".to_string(), "*".to_string(), Privilege::admin())
            .await
            .unwrap();
        let principal = Principal::User {
            name: "root".to_string(),
        };
        assert!(svc.authorize_write(&principal, "anything").await.is_ok());
        assert!(svc.authorize_admin(&principal).await.is_ok());
    }
}
