// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated user profile and its session representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::CredentialsError;

/// Structured name of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileName {
    /// Family / last name
    pub family_name: String,
    /// Given / first name
    pub given_name: String,
    /// Middle name
    #[serde(default)]
    pub middle_name: String,
}

/// An email address reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProfileEmail {
    /// The address itself
    pub value: String,
    /// Kind of address (home, work, ...)
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A photo URL reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProfilePhoto {
    /// Image URL
    pub value: String,
}

/// The validated identity of a caller.
///
/// Produced by a successful [`CredentialsPlugin`](super::CredentialsPlugin)
/// and attached to the request extensions for the lifetime of one request.
/// Fields are private: a profile cannot change once a plugin has handed it
/// over.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID, unique within `provider`
    id: String,
    /// Name of the plugin that authenticated the user
    provider: String,
    /// Name to display
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<ProfileName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    emails: Vec<ProfileEmail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    photos: Vec<ProfilePhoto>,
    /// Provider-specific data that has no dedicated field
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[schema(value_type = Object)]
    extended_properties: HashMap<String, Value>,
}

impl UserProfile {
    /// Create a profile.
    ///
    /// Fails when `id` or `provider` is empty.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let id = id.into();
        let provider = provider.into();

        if id.is_empty() {
            return Err(CredentialsError::InvalidProfile("id must not be empty"));
        }
        if provider.is_empty() {
            return Err(CredentialsError::InvalidProfile(
                "provider must not be empty",
            ));
        }

        Ok(Self {
            id,
            provider,
            display_name: display_name.into(),
            name: None,
            emails: Vec::new(),
            photos: Vec::new(),
            extended_properties: HashMap::new(),
        })
    }

    /// Set the structured name.
    pub fn with_name(mut self, name: ProfileName) -> Self {
        self.name = Some(name);
        self
    }

    /// Add an email address.
    pub fn with_email(mut self, value: impl Into<String>, kind: impl Into<String>) -> Self {
        self.emails.push(ProfileEmail {
            value: value.into(),
            kind: kind.into(),
        });
        self
    }

    /// Add a photo URL.
    pub fn with_photo(mut self, value: impl Into<String>) -> Self {
        self.photos.push(ProfilePhoto {
            value: value.into(),
        });
        self
    }

    /// Attach a provider-specific property.
    pub fn with_extended_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extended_properties.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn name(&self) -> Option<&ProfileName> {
        self.name.as_ref()
    }

    pub fn emails(&self) -> &[ProfileEmail] {
        &self.emails
    }

    pub fn photos(&self) -> &[ProfilePhoto] {
        &self.photos
    }

    pub fn extended_properties(&self) -> &HashMap<String, Value> {
        &self.extended_properties
    }

    /// Look up a single extended property.
    pub fn extended_property(&self, key: &str) -> Option<&Value> {
        self.extended_properties.get(key)
    }
}

/// Minimal form of a profile kept in the session between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    pub id: String,
    pub display_name: String,
    pub provider: String,
}

impl From<&UserProfile> for SessionProfile {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            provider: profile.provider.clone(),
        }
    }
}

/// Conversions between profiles and plain data.
///
/// The default behaviour only keeps `id`, `displayName` and `provider` in the
/// session. Plugins or hosts that need more implement this trait and pass it
/// to [`Credentials::with_delegate`](super::Credentials::with_delegate).
pub trait ProfileDelegate: Send + Sync {
    /// Serialize a profile for storage in the session.
    fn to_session_value(&self, profile: &UserProfile) -> Value;

    /// Restore a profile previously written by [`Self::to_session_value`].
    fn from_session_value(&self, value: &Value) -> Option<UserProfile>;

    /// Build a profile from the data map returned by an identity provider.
    fn from_provider_data(&self, provider: &str, data: &Map<String, Value>) -> Option<UserProfile>;
}

/// Keeps id, display name and provider; everything else a provider returns
/// ends up in the extended properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProfileDelegate;

impl ProfileDelegate for DefaultProfileDelegate {
    fn to_session_value(&self, profile: &UserProfile) -> Value {
        serde_json::to_value(SessionProfile::from(profile)).unwrap_or(Value::Null)
    }

    fn from_session_value(&self, value: &Value) -> Option<UserProfile> {
        let stored: SessionProfile = serde_json::from_value(value.clone()).ok()?;
        UserProfile::new(stored.id, stored.display_name, stored.provider).ok()
    }

    fn from_provider_data(&self, provider: &str, data: &Map<String, Value>) -> Option<UserProfile> {
        // Providers disagree on whether ids are strings or numbers.
        let id = match data.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let display_name = data
            .get("displayName")
            .or_else(|| data.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut profile = UserProfile::new(id, display_name, provider).ok()?;

        if let Some(Value::Array(emails)) = data.get("emails") {
            for email in emails {
                if let Ok(email) = serde_json::from_value::<ProfileEmail>(email.clone()) {
                    profile.emails.push(email);
                }
            }
        }
        if let Some(Value::Array(photos)) = data.get("photos") {
            for photo in photos {
                if let Ok(photo) = serde_json::from_value::<ProfilePhoto>(photo.clone()) {
                    profile.photos.push(photo);
                }
            }
        }

        for (key, value) in data {
            if !matches!(
                key.as_str(),
                "id" | "displayName" | "name" | "emails" | "photos"
            ) {
                profile.extended_properties.insert(key.clone(), value.clone());
            }
        }

        Some(profile)
    }
}
