use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::repo_types::{ProfileAction, UserPreferences, UserProfileRow};
use crate::error::ProfileStoreError;

impl UserProfileRow {
    /// Find a profile by the external user id.
    pub async fn find_by_user_id(
        db: &PgPool,
        user_id: &str,
    ) -> Result<Option<UserProfileRow>, ProfileStoreError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT user_id, email, name, height, weight, age, gender, favorite_foods,
                   allergies, disliked_foods, exercise_frequency,
                   exercise_frequency_other, created_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Insert an empty profile. `None` when the user already has one.
    pub async fn create(
        db: &PgPool,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<Option<UserProfileRow>, ProfileStoreError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            INSERT INTO user_profiles (user_id, email)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING user_id, email, name, height, weight, age, gender, favorite_foods,
                      allergies, disliked_foods, exercise_frequency,
                      exercise_frequency_other, created_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

/// Key → preference record lookup. `get_profile` never fails: misses and
/// store errors both resolve to the empty record.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> UserPreferences;

    async fn create_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<ProfileAction, ProfileStoreError>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: &str) -> UserPreferences {
        match UserProfileRow::find_by_user_id(&self.db, user_id).await {
            Ok(Some(row)) => {
                debug!(%user_id, "profile found");
                row.into()
            }
            Ok(None) => {
                debug!(%user_id, "profile not found");
                UserPreferences::default()
            }
            Err(e) => {
                warn!(error = %e, %user_id, "profile lookup failed; using empty preferences");
                UserPreferences::default()
            }
        }
    }

    async fn create_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<ProfileAction, ProfileStoreError> {
        match UserProfileRow::create(&self.db, user_id, email).await? {
            Some(_) => Ok(ProfileAction::Created),
            None => Ok(ProfileAction::Existing),
        }
    }
}

/// In-process profiles, used by `AppState::fake()`.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserPreferences>>,
}

impl MemoryProfileStore {
    pub fn with(mut self, user_id: &str, prefs: UserPreferences) -> Self {
        self.profiles.get_mut().insert(user_id.to_string(), prefs);
        self
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> UserPreferences {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn create_profile(
        &self,
        user_id: &str,
        _email: Option<&str>,
    ) -> Result<ProfileAction, ProfileStoreError> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(user_id) {
            return Ok(ProfileAction::Existing);
        }
        profiles.insert(user_id.to_string(), UserPreferences::default());
        Ok(ProfileAction::Created)
    }
}
