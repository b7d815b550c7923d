//! # Users, Identity, and Permissions
//!
//! [`Identity`] is the resolved caller attached to every request: either a
//! concrete [`User`] or the distinguished anonymous sentinel. The sentinel is
//! its own enum variant rather than an `Option`, so "explicitly anonymous"
//! stays distinguishable from "nothing attached yet" (a missing extension).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::password;
use crate::validator::{looks_like_email, Validator};

/// A registered account. `password_hash` is the argon2id PHC string and is
/// never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub activated: bool,
}

/// The caller resolved by the authentication stage. Exactly one of these is
/// attached per request and it is immutable downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No credential was presented. Distinct from an invalid credential,
    /// which never produces an identity at all.
    Anonymous,
    Known(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// The concrete user, when one was resolved.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Known(user) => Some(user),
        }
    }
}

/// A user's permission codes, fetched fresh per request and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    pub fn includes(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }
}

impl FromIterator<String> for Permissions {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(looks_like_email(email), "email", "must be a valid email address");
}

/// Full user validation as run at registration time. `plaintext_password` is
/// validated here because the hash alone can't be.
pub fn validate_user(v: &mut Validator, user: &User, plaintext_password: &str) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 characters long",
    );
    validate_email(v, &user.email);
    password::validate_plaintext(v, plaintext_password);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            activated: false,
        }
    }

    #[test]
    fn anonymous_is_anonymous() {
        assert!(Identity::Anonymous.is_anonymous());
        assert!(Identity::Anonymous.user().is_none());
    }

    #[test]
    fn known_identity_exposes_user() {
        let user = sample_user();
        let identity = Identity::Known(user.clone());
        assert!(!identity.is_anonymous());
        assert_eq!(identity.user(), Some(&user));
    }

    #[test]
    fn anonymous_differs_from_any_known_user() {
        assert_ne!(Identity::Anonymous, Identity::Known(sample_user()));
    }

    #[test]
    fn permissions_includes() {
        let perms = Permissions::new(vec!["catalog:read".into()]);
        assert!(perms.includes("catalog:read"));
        assert!(!perms.includes("catalog:write"));
    }

    #[test]
    fn user_does_not_serialize_password_hash() {
        let json = serde_json::to_value(sample_user()).expect("serialize");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("email").is_some());
    }

    #[test]
    fn validate_user_flags_bad_fields() {
        let mut user = sample_user();
        user.name = String::new();
        user.email = "not-an-email".to_string();

        let mut v = Validator::new();
        validate_user(&mut v, &user, "short");
        let errors = v.errors();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn validate_user_accepts_good_input() {
        let mut v = Validator::new();
        validate_user(&mut v, &sample_user(), "a fine password");
        assert!(v.is_valid(), "unexpected errors: {:?}", v.errors());
    }
}
