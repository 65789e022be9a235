use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::db::admin::{Admin, NewAdmin};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = ();

    /// Convert [`AdminCredentials`] to a new [`Admin`](crate::model::db::admin::Admin)
    /// by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())
            .map_err(|_| ())?;
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// The signed-in admin, as returned on sign-in. `admin_id` roots every
/// admin-scoped path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub admin_id: String,
    pub username: String,
}

impl From<&Admin> for AdminSession {
    fn from(admin: &Admin) -> Self {
        Self {
            admin_id: admin.id.to_string(),
            username: admin.username.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_weak_credentials() {
        assert!(NewAdmin::try_from(AdminCredentials::empty()).is_err());
        let short = AdminCredentials {
            username: "someone".into(),
            password: "short".into(),
        };
        assert!(NewAdmin::try_from(short).is_err());
    }

    #[test]
    fn never_stores_plaintext() {
        let admin = NewAdmin::try_from(AdminCredentials::example1()).unwrap();
        assert_eq!(admin.username, "coordinadora");
        assert!(!admin.password_hash.contains("salas4ever"));
    }
}
