//! User directory.
//!
//! Holds the users the identity collaborator knows about, so the transfer
//! engine can resolve recipients and the geo index can tell which couriers
//! are verified. Credentials never pass through here.

use std::collections::HashMap;

use courierpay_types::{CourierpayError, Result, Role, User, UserId, VerificationStatus};
use parking_lot::RwLock;

/// Concurrent `UserId → User` map with unique e-mail addresses.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user.
    ///
    /// # Errors
    /// - `Validation` if the e-mail is empty or has no `@`
    /// - `Conflict` if the e-mail is already registered
    pub fn register(&self, email: &str, role: Role, status: VerificationStatus) -> Result<User> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(CourierpayError::validation(format!("invalid e-mail '{email}'")));
        }
        let mut users = self.users.write();
        if users.values().any(|u| u.email == email) {
            return Err(CourierpayError::conflict(format!(
                "e-mail {email} is already registered"
            )));
        }
        let user = User {
            id: UserId::new(),
            email,
            role,
            status,
        };
        users.insert(user.id, user.clone());
        tracing::info!(user = %user.id, role = %user.role, status = %user.status, "User registered");
        Ok(user)
    }

    /// Look up a user.
    ///
    /// # Errors
    /// Returns `NotFound` if the user does not exist.
    pub fn get(&self, id: UserId) -> Result<User> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CourierpayError::not_found(format!("user {id}")))
    }

    /// Look up a user by e-mail (case-insensitive).
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim().to_ascii_lowercase();
        self.users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Change a user's verification status.
    ///
    /// # Errors
    /// Returns `NotFound` if the user does not exist.
    pub fn set_status(&self, id: UserId, status: VerificationStatus) -> Result<User> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| CourierpayError::not_found(format!("user {id}")))?;
        let previous = user.status;
        user.status = status;
        tracing::info!(user = %id, from = %previous, to = %status, "Verification status changed");
        Ok(user.clone())
    }

    /// Couriers and whether each is currently eligible (verified).
    #[must_use]
    pub fn courier_eligibility(&self) -> HashMap<UserId, bool> {
        self.users
            .read()
            .values()
            .filter(|u| u.role == Role::Delivery)
            .map(|u| (u.id, u.is_approved()))
            .collect()
    }

    /// Users filtered by status, oldest first, for back-office listings.
    #[must_use]
    pub fn with_status(&self, status: VerificationStatus) -> Vec<User> {
        let mut found: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.status == status)
            .cloned()
            .collect();
        found.sort_by_key(|u| u.id);
        found
    }
}
