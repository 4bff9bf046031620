use serde::{Deserialize, Serialize};

use super::repo_types::ProfileAction;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl CreateProfileRequest {
    /// Trimmed `(user_id, email)`; a blank email counts as absent.
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        let user_id = self
            .user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Validation("userId is required".into()))?;
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Ok((user_id, email))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: String,
    pub action: ProfileAction,
}

impl CreateProfileResponse {
    pub fn new(user_id: String, action: ProfileAction) -> Self {
        let message = match action {
            ProfileAction::Created => "UserProfile created successfully",
            ProfileAction::Existing => "UserProfile already exists",
        };
        Self {
            success: true,
            message,
            user_id,
            action,
        }
    }
}
