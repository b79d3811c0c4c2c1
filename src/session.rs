//! The signed-in user and display preferences.
//!
//! A [`SessionContext`] is loaded once at startup and handed to whatever
//! needs the current user. It is not a security boundary.

use std::fmt::{Display, Formatter};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::local_storage::{LocalStorage, THEME_KEY, USER_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Instructor => f.write_str("instructor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<String>,
}

impl SessionUser {
    /// Whether the user finished both login steps for their role.
    pub fn is_verified(&self) -> bool {
        let role_id = match self.role {
            Role::Student => self.student_id.as_deref(),
            Role::Instructor => self.instructor_id.as_deref(),
        };
        !self.id.is_empty() && role_id.is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    fn parse(raw: &str) -> Option<Theme> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

pub struct SessionContext {
    storage: LocalStorage,
    user: Option<SessionUser>,
    theme: Theme,
}

impl SessionContext {
    /// Reads the persisted user and theme.
    pub fn load(storage: LocalStorage) -> Result<Self, StoreError> {
        let user = storage.get_json(USER_KEY)?;
        let theme = storage
            .get_item(THEME_KEY)?
            .as_deref()
            .and_then(Theme::parse)
            .unwrap_or_default();
        Ok(SessionContext { storage, user, theme })
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(SessionUser::is_verified)
    }

    pub fn login(&mut self, user: SessionUser) -> Result<(), StoreError> {
        self.storage.set_json(USER_KEY, &user)?;
        info!("Signed in {} as {}", user.username, user.role);
        self.user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.storage.remove_item(USER_KEY)?;
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.username);
        }
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StoreError> {
        self.storage.set_item(THEME_KEY, theme.as_str())?;
        self.theme = theme;
        Ok(())
    }
}
