use crate::domain::models::{NewUser, ProfileUpdate, User};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::UserRepository;
use tracing::info;
use uuid::Uuid;

/// Profiles and the username index.
///
/// Uniqueness is a scan before the write, so two concurrent sign-ups can
/// still claim the same name.
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    pub async fn create_user(&self, user_id: Uuid, new_user: NewUser) -> ServiceResult<User> {
        new_user.validate()?;
        if self.users.username_owner(&new_user.username).await?.is_some() {
            return Err(ServiceError::UsernameTaken(new_user.username));
        }

        let user = new_user.into_user(user_id);
        self.users.save(&user).await?;
        info!(user_id = %user_id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn fetch_user(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        self.users.fetch(user_id).await
    }

    pub async fn fetch_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        self.users.fetch_by_username(username).await
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> ServiceResult<User> {
        update.validate()?;
        let mut user = self
            .users
            .fetch(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        if let Some(username) = &update.username {
            if username.to_lowercase() != user.username_key {
                match self.users.username_owner(username).await? {
                    Some(owner) if owner != user_id => {
                        return Err(ServiceError::UsernameTaken(username.clone()));
                    }
                    _ => {}
                }
            }
        }

        update.apply_to(&mut user);
        self.users.save(&user).await?;
        info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }
}
