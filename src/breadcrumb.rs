//! Navigation trails for page views.

use readcomics_db::models::User;
use serde::Serialize;
use serde_json::{json, Value};

use crate::accounts::EDIT_PROFILE_URL;

/// One link in a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub url: String,
    pub text: String,
}

impl Crumb {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Views that render a breadcrumb trail.
pub trait Breadcrumbs {
    fn breadcrumbs(&self) -> Vec<Crumb> {
        Vec::new()
    }

    /// Template context entry holding the trail.
    fn context(&self) -> Value {
        json!({ "breadcrumb": self.breadcrumbs() })
    }
}

/// Public profile page of a user.
pub struct UserDetail<'a> {
    pub user: &'a User,
}

impl Breadcrumbs for UserDetail<'_> {
    fn breadcrumbs(&self) -> Vec<Crumb> {
        vec![
            Crumb::new("#", "Users"),
            Crumb::new(self.user.absolute_url(), self.user.to_string()),
        ]
    }
}

/// Profile edit page.
pub struct EditProfile;

impl Breadcrumbs for EditProfile {
    fn breadcrumbs(&self) -> Vec<Crumb> {
        vec![Crumb::new(EDIT_PROFILE_URL, "Edit profile")]
    }
}
