//! Candidate accounts and the registration-method-keyed password contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// How a candidate account came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "registration_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMethod {
    Signup,
    Admin,
    Placement,
    EmailSignup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "candidate_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Active,
    Inactive,
}

/// Candidate account.
///
/// `password` holds an argon2 PHC string for self-registered and admin-created
/// accounts. Placement-sourced accounts store the roster password as-is and
/// compare it by equality; see [`Candidate::verify_password`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub credits: i32,
    pub registration_method: RegistrationMethod,
    pub placement_id: Option<Uuid>,
    pub file_id: Option<Uuid>,
    pub password: String,
    pub status: CandidateStatus,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// Compare a login attempt against the stored credential.
    ///
    /// Placement-sourced accounts keep the roster password in cleartext and
    /// match by equality; every other registration method stores an argon2
    /// hash and verifies against it.
    pub fn verify_password(&self, attempt: &str) -> bool {
        match self.registration_method {
            RegistrationMethod::Placement => self.password == attempt,
            _ => verify_hashed(&self.password, attempt),
        }
    }
}

/// Insert payload for a new candidate account.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub credits: i32,
    pub registration_method: RegistrationMethod,
    pub placement_id: Option<Uuid>,
    pub file_id: Option<Uuid>,
    pub password: String,
    pub status: CandidateStatus,
    pub is_verified: bool,
}

/// Per-candidate profile record, created empty alongside the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CandidateProfile {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub resume_url: Option<String>,
    pub about: Option<String>,
    pub skills: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical email form used for every lookup and write: trimmed and
/// lower-cased. One policy at the store boundary, no per-call-site variants.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password for storage (non-placement registration paths).
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    use argon2::{
        password_hash::{PasswordHasher, SaltString},
        Argon2,
    };
    use rand_core::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_hashed(stored: &str, attempt: &str) -> bool {
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(attempt.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(method: RegistrationMethod, password: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            course: None,
            credits: 50,
            registration_method: method,
            placement_id: match method {
                RegistrationMethod::Placement => Some(Uuid::new_v4()),
                _ => None,
            },
            file_id: None,
            password: password.to_string(),
            status: CandidateStatus::Active,
            is_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn normalize_email_folds_case_and_whitespace() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
        assert_eq!(normalize_email("plain@x.y"), "plain@x.y");
    }

    #[test]
    fn placement_accounts_compare_plaintext() {
        let c = candidate(RegistrationMethod::Placement, "roster-pass");
        assert!(c.verify_password("roster-pass"));
        assert!(!c.verify_password("other"));
    }

    #[test]
    fn signup_accounts_verify_against_hash() {
        let hash = hash_password("s3cret").unwrap();
        let c = candidate(RegistrationMethod::Signup, &hash);
        assert!(c.verify_password("s3cret"));
        assert!(!c.verify_password("wrong"));
        // The raw hash string itself must not pass.
        assert!(!c.verify_password(&hash));
    }

    #[test]
    fn signup_account_with_garbage_hash_never_verifies() {
        let c = candidate(RegistrationMethod::Admin, "not-a-phc-string");
        assert!(!c.verify_password("not-a-phc-string"));
    }
}
