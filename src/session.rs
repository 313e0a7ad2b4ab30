use tracing::info;

use crate::error::StoreError;
use crate::models::User;
use crate::storage::Store;

/// Email used when logging in without one.
pub const DEFAULT_EMAIL: &str = "demo@taskcoach.local";
const LOCAL_USER_ID: &str = "user-1";

/// The current, unverified identity. Hydrated from the store on startup and
/// persisted on login; logout clears both.
#[derive(Debug, Clone)]
pub struct Session {
    store: Store,
    user: Option<User>,
}

impl Session {
    /// Restores the session saved in `store`, or starts logged out.
    pub fn hydrate(store: Store) -> Result<Self, StoreError> {
        let user = store.read_user()?;
        Ok(Session { store, user })
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Logs in as `email`. Any address is accepted; a blank one uses [`DEFAULT_EMAIL`].
    pub fn login(&mut self, email: &str) -> Result<&User, StoreError> {
        let email = match email.trim() {
            "" => DEFAULT_EMAIL,
            e => e,
        };
        let user = User {
            id: LOCAL_USER_ID.into(),
            email: email.to_string(),
            display_name: display_name_for(email),
            is_pro: false,
        };
        self.store.write_user(&user)?;
        info!(email = %user.email, "logged in");
        Ok(&*self.user.insert(user))
    }

    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.store.clear_user()?;
        if let Some(user) = self.user.take() {
            info!(email = %user.email, "logged out");
        }
        Ok(())
    }
}

/// The local part of an email address.
fn display_name_for(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_local_part() {
        assert_eq!(display_name_for("ada@example.com"), "ada");
        assert_eq!(display_name_for("no-at-sign"), "no-at-sign");
        assert_eq!(display_name_for("@host"), "");
    }
}
