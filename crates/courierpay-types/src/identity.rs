//! Users, roles and the authenticated caller.
//!
//! Authentication itself is external: the identity collaborator hands the
//! service an [`Actor`] and the service trusts it. Authorization is a closed
//! set of predicates over [`Role`] and [`VerificationStatus`].

use serde::{Deserialize, Serialize};

use crate::{CourierpayError, Result, UserId};

/// What a user is allowed to do in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A customer holding cards and a wallet.
    User,
    /// A courier that picks up and hands over cash.
    Delivery,
    /// Back-office operator.
    Admin,
}

impl Role {
    /// May this role open money movements?
    #[must_use]
    pub fn can_create_transfers(self) -> bool {
        match self {
            Self::User | Self::Admin => true,
            Self::Delivery => false,
        }
    }

    /// May this role claim and advance deliveries?
    #[must_use]
    pub fn can_deliver(self) -> bool {
        match self {
            Self::Delivery => true,
            Self::User | Self::Admin => false,
        }
    }

    /// May this role change other users' verification status or fail transactions?
    #[must_use]
    pub fn can_administer(self) -> bool {
        match self {
            Self::Admin => true,
            Self::User | Self::Delivery => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Delivery => write!(f, "delivery"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Identity verification outcome, owned by the KYC process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Blocked,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// A user record as held by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub status: VerificationStatus,
}

impl User {
    /// Only verified users may move money or deliver.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// The caller view of this user.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
            status: self.status,
        }
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub status: VerificationStatus,
}

impl Actor {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Guard for transfer creation: approved `User` or `Admin`.
    ///
    /// # Errors
    /// Returns `Authorization` otherwise.
    pub fn ensure_can_transfer(&self) -> Result<()> {
        if !self.role.can_create_transfers() {
            return Err(CourierpayError::unauthorized(format!(
                "role {} cannot create transfers",
                self.role
            )));
        }
        self.ensure_approved()
    }

    /// Guard for delivery actions: approved `Delivery` user.
    ///
    /// # Errors
    /// Returns `Authorization` otherwise.
    pub fn ensure_can_deliver(&self) -> Result<()> {
        if !self.role.can_deliver() {
            return Err(CourierpayError::unauthorized(format!(
                "role {} cannot handle deliveries",
                self.role
            )));
        }
        self.ensure_approved()
    }

    /// Guard for back-office actions.
    ///
    /// # Errors
    /// Returns `Authorization` unless the actor is an admin.
    pub fn ensure_admin(&self) -> Result<()> {
        if self.role.can_administer() {
            Ok(())
        } else {
            Err(CourierpayError::unauthorized(format!(
                "role {} is not an administrator",
                self.role
            )))
        }
    }

    fn ensure_approved(&self) -> Result<()> {
        if self.is_approved() {
            Ok(())
        } else {
            Err(CourierpayError::unauthorized(format!(
                "user {} is {}, not verified",
                self.user_id, self.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, status: VerificationStatus) -> Actor {
        Actor {
            user_id: UserId::new(),
            role,
            status,
        }
    }

    #[test]
    fn verified_user_can_transfer() {
        assert!(
            actor(Role::User, VerificationStatus::Verified)
                .ensure_can_transfer()
                .is_ok()
        );
    }

    #[test]
    fn pending_user_cannot_transfer() {
        let err = actor(Role::User, VerificationStatus::Pending)
            .ensure_can_transfer()
            .unwrap_err();
        assert!(matches!(err, CourierpayError::Authorization { .. }));
    }

    #[test]
    fn courier_cannot_transfer_but_can_deliver() {
        let courier = actor(Role::Delivery, VerificationStatus::Verified);
        assert!(courier.ensure_can_transfer().is_err());
        assert!(courier.ensure_can_deliver().is_ok());
    }

    #[test]
    fn blocked_courier_cannot_deliver() {
        let courier = actor(Role::Delivery, VerificationStatus::Blocked);
        assert!(courier.ensure_can_deliver().is_err());
    }

    #[test]
    fn only_admin_administers() {
        assert!(actor(Role::Admin, VerificationStatus::Pending).ensure_admin().is_ok());
        assert!(actor(Role::User, VerificationStatus::Verified).ensure_admin().is_err());
        assert!(actor(Role::Delivery, VerificationStatus::Verified).ensure_admin().is_err());
    }

    #[test]
    fn role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Delivery).unwrap(), "\"delivery\"");
        let back: VerificationStatus = serde_json::from_str("\"verified\"").unwrap();
        assert_eq!(back, VerificationStatus::Verified);
    }
}
