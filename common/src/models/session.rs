// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::{Result, VanguardError};

/// The authenticated user of a context, stored under `current-user-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: String,
    pub wallet_address: String,
    pub wallet_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    pub login_at: DateTime<Utc>,
    pub is_authenticated: bool,
}

impl UserSession {
    /// Start a session for a wallet, restoring whatever profile it had
    pub fn open(id: String, wallet_address: String, wallet_name: String, profile: ProfileExtension) -> Self {
        Self {
            id,
            wallet_address,
            wallet_name,
            role: profile.role,
            name: profile.name,
            email: profile.email,
            company_name: profile.company_name,
            business_address: profile.business_address,
            business_type: profile.business_type,
            login_at: Utc::now(),
            is_authenticated: true,
        }
    }

    /// Shallow merge: fields present in the update win, blank strings clear
    pub fn apply(&mut self, update: &ProfileUpdate) {
        merge_field(&mut self.name, &update.name);
        merge_field(&mut self.email, &update.email);
        merge_field(&mut self.company_name, &update.company_name);
        merge_field(&mut self.business_address, &update.business_address);
        merge_field(&mut self.business_type, &update.business_type);
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(Some(self.wallet_name.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or("User")
    }

    pub fn initials(&self) -> String {
        let source = self.name.as_deref().unwrap_or(&self.wallet_name);
        let initials: String = source
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() { "U".to_string() } else { initials }
    }
}

fn merge_field(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *target = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }
}

/// Profile data that outlives sessions, keyed by wallet address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileExtension {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
}

impl ProfileExtension {
    pub fn apply(&mut self, update: &ProfileUpdate) {
        merge_field(&mut self.name, &update.name);
        merge_field(&mut self.email, &update.email);
        merge_field(&mut self.company_name, &update.company_name);
        merge_field(&mut self.business_address, &update.business_address);
        merge_field(&mut self.business_type, &update.business_type);
    }
}

/// Partial profile edit; absent fields are left alone
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub business_address: Option<String>,
    pub business_type: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() && !email.contains('@') {
                return Err(VanguardError::validation("Please enter a valid email"));
            }
        }
        Ok(())
    }
}
