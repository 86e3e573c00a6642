//! Two-step self-registration with a one-time passcode.
//!
//! ```text
//! stage(email, role) ──▶ OTP handed to the delivery transport
//!        │ (held in a TtlStore keyed by e-mail)
//!        ▼
//! confirm(email, otp) ──▶ user created in the directory as `pending`
//! ```
//!
//! Delivering the passcode (e-mail) is somebody else's job; this module only
//! issues and checks it.

use courierpay_ledger::UserDirectory;
use courierpay_types::{
    CourierpayError, RegistrationConfig, Result, Role, User, VerificationStatus,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ttl_store::TtlStore;

/// What the applicant asked for, held until the passcode is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub email: String,
    pub role: Role,
    otp: String,
}

/// Issues and checks registration passcodes.
#[derive(Debug)]
pub struct RegistrationDesk {
    pending: TtlStore<String, PendingRegistration>,
    otp_digits: u32,
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl RegistrationDesk {
    /// # Errors
    /// Returns `Configuration` if `config` fails
    /// [`RegistrationConfig::validate`].
    pub fn new(config: &RegistrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pending: TtlStore::new(config.ttl_secs),
            otp_digits: config.otp_digits,
        })
    }

    fn generate_otp(&self) -> String {
        // Width is validated to fit a u32 at construction.
        let upper = 10u32.saturating_pow(self.otp_digits);
        let code = rand::thread_rng().gen_range(0..upper);
        format!("{code:0width$}", width = self.otp_digits as usize)
    }

    /// Stage a registration and return the passcode to deliver. Staging the
    /// same e-mail again replaces the earlier passcode.
    ///
    /// # Errors
    /// - `Validation` for a malformed e-mail
    /// - `Authorization` when asking for the admin role
    /// - `Conflict` if the e-mail already belongs to a user
    pub fn stage(&self, directory: &UserDirectory, email: &str, role: Role) -> Result<String> {
        let email = normalize(email);
        if email.is_empty() || !email.contains('@') {
            return Err(CourierpayError::validation(format!("invalid e-mail '{email}'")));
        }
        if role.can_administer() {
            return Err(CourierpayError::unauthorized(
                "administrators cannot self-register",
            ));
        }
        if directory.find_by_email(&email).is_some() {
            return Err(CourierpayError::conflict(format!(
                "e-mail {email} is already registered"
            )));
        }
        let otp = self.generate_otp();
        self.pending.insert(
            email.clone(),
            PendingRegistration {
                email: email.clone(),
                role,
                otp: otp.clone(),
            },
        );
        tracing::info!(email = %email, role = %role, ttl_secs = self.pending.ttl().as_secs(), "Registration staged");
        Ok(otp)
    }

    /// Check the passcode and create the user.
    ///
    /// # Errors
    /// - `NotFound` if nothing is staged for the e-mail or it expired
    /// - `Authorization` for a wrong passcode (the staged entry survives)
    /// - `Conflict` if the e-mail was registered in the meantime
    pub fn confirm(&self, directory: &UserDirectory, email: &str, otp: &str) -> Result<User> {
        let email = normalize(email);
        if self.pending.get(&email).is_none() {
            return Err(CourierpayError::not_found(format!(
                "pending registration for {email}"
            )));
        }
        let Some(staged) = self.pending.remove_if(&email, |p| p.otp == otp.trim()) else {
            tracing::warn!(email = %email, "Registration passcode rejected");
            return Err(CourierpayError::unauthorized("invalid or expired passcode"));
        };
        directory.register(&staged.email, staged.role, VerificationStatus::Pending)
    }

    /// Drop expired registrations.
    pub fn purge_expired(&self) -> usize {
        self.pending.purge_expired()
    }
}
