use super::{decode_at, encode, snapshot_id, Paths};
use crate::domain::models::User;
use crate::error::ServiceResult;
use doc_store::{Query, SharedStore};
use uuid::Uuid;

/// Repository for user profiles
#[derive(Clone)]
pub struct UserRepository {
    store: SharedStore,
}

impl UserRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Write the full profile document
    pub async fn save(&self, user: &User) -> ServiceResult<()> {
        self.store.set(&Paths::user(user.id), encode(user)?).await?;
        Ok(())
    }

    pub async fn fetch(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        let path = Paths::user(user_id);
        match self.store.get(&path).await? {
            Some(value) => {
                let mut user: User = decode_at(&path, value)?;
                user.id = user_id;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Look a user up through the lowercase username index.
    ///
    /// Returns the first match in key order when the index holds duplicates.
    pub async fn fetch_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let query = Query::ordered_by_child("username_key")
            .equal_to(username.to_lowercase())
            .limit_to_first(1);
        let matches = self.store.query(&Paths::users(), &query).await?;

        match matches.into_iter().next() {
            Some(snapshot) => {
                let mut user: User = snapshot.decode()?;
                user.id = snapshot_id(&snapshot)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Id currently holding `username`, if any
    pub async fn username_owner(&self, username: &str) -> ServiceResult<Option<Uuid>> {
        Ok(self.fetch_by_username(username).await?.map(|u| u.id))
    }
}
