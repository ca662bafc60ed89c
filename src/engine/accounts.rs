//! Registration, login and poet profiles.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EngineError, NazmEngine, Result};
use crate::auth::{hash_password, verify_password};
use crate::model::{PoetProfile, Role, User};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub country: String,
}

/// Outcome of seeding an admin account.
#[derive(Debug, Clone)]
pub enum AdminSeed {
    Created(User),
    /// An account with this email already exists and was left untouched.
    Exists(User),
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(EngineError::Validation(format!("Invalid email address: {email}"))),
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl NazmEngine {
    /// Create a user account and its empty poet profile.
    pub async fn register(&mut self, account: NewAccount) -> Result<User> {
        self.create_account(account, Role::User).await
    }

    /// Check credentials. Unknown email and wrong password are not told apart.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();

        match self.find_user_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash) => {
                info!(user_id = %user.id, "User logged in");
                Ok(user)
            }
            _ => {
                warn!(email = %email, "Failed login attempt");
                Err(EngineError::InvalidCredentials)
            }
        }
    }

    pub async fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.get::<User>(&id.to_string()).await?)
    }

    pub async fn poet_profile(&self, user_id: Uuid) -> Result<PoetProfile> {
        self.store
            .get::<PoetProfile>(&user_id.to_string())
            .await?
            .ok_or(EngineError::UserNotFound(user_id))
    }

    /// Create an admin account unless the email is already registered.
    pub async fn ensure_admin(&mut self, name: &str, email: &str, password: &str) -> Result<AdminSeed> {
        let normalized = normalize_email(email)?;
        if let Some(existing) = self.find_user_by_email(&normalized).await? {
            info!(email = %normalized, role = %existing.role, "Account already exists, skipping");
            return Ok(AdminSeed::Exists(existing));
        }

        let user = self
            .create_account(
                NewAccount {
                    name: name.to_string(),
                    email: normalized,
                    password: password.to_string(),
                    country: "N/A".to_string(),
                },
                Role::Admin,
            )
            .await?;

        Ok(AdminSeed::Created(user))
    }

    async fn create_account(&mut self, account: NewAccount, role: Role) -> Result<User> {
        let name = required("Name", &account.name)?;
        let country = required("Country", &account.country)?;
        let email = normalize_email(&account.email)?;
        if account.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut txn = self.store.begin().await?;

        let taken = txn
            .list::<User>()
            .await?
            .into_iter()
            .any(|u| u.email == email);
        if taken {
            return Err(EngineError::EmailInUse(email));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash: hash_password(&account.password)?,
            role,
            created_at: now,
        };
        let profile = PoetProfile::for_user(&user, country, now);

        txn.put(&user).await?;
        txn.put(&profile).await?;
        txn.commit().await?;

        info!(user_id = %user.id, role = %role, "Account created");

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .store
            .list::<User>()
            .await?
            .into_iter()
            .find(|u| u.email == email))
    }
}
