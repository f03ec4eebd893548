//! HTML views
//!
//! Handlebars templates compiled into the binary and registered once at
//! startup. Every page gets `app_name`, `version`, `current_year` and the
//! signed-in user (if any).

use axum::response::Html;
use chrono::{Datelike, Utc};
use handlebars::{Handlebars, TemplateError};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::middleware::auth::UserContext;

pub const APP_NAME: &str = "NIDS AI";

const HEADER: &str = include_str!("../templates/partials/header.hbs");
const FOOTER: &str = include_str!("../templates/partials/footer.hbs");

const PAGES: &[(&str, &str)] = &[
    ("home", include_str!("../templates/home.hbs")),
    ("about", include_str!("../templates/about.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("register", include_str!("../templates/register.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("profile", include_str!("../templates/profile.hbs")),
    ("admin", include_str!("../templates/admin.hbs")),
    ("forgot_password", include_str!("../templates/forgot_password.hbs")),
    ("reset_password", include_str!("../templates/reset_password.hbs")),
    ("not_found", include_str!("../templates/not_found.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

/// One-line banner shown above page content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub kind: &'static str,
    pub text: &'static str,
}

/// Banners addressable by `?notice=` after a redirect
const NOTICES: &[(&str, Notice)] = &[
    ("login_required", Notice { kind: "warning", text: "Please login to access the dashboard!" }),
    ("admin_only", Notice { kind: "danger", text: "Admin access only!" }),
    ("registered", Notice { kind: "success", text: "Registration successful! Please login." }),
    ("logged_out", Notice { kind: "info", text: "You have been logged out successfully!" }),
    ("password_reset", Notice { kind: "success", text: "Password reset successful! Please login." }),
    ("user_deleted", Notice { kind: "success", text: "User deleted successfully." }),
    ("user_not_found", Notice { kind: "error", text: "User not found!" }),
    ("admin_protected", Notice { kind: "warning", text: "Cannot delete the admin account!" }),
    ("reset_invalid", Notice { kind: "error", text: "Reset link is invalid or has expired." }),
];

impl Notice {
    pub fn from_code(code: &str) -> Option<Self> {
        NOTICES
            .iter()
            .find(|(name, _)| *name == code)
            .map(|(_, notice)| *notice)
    }

    pub fn to_json(&self) -> Value {
        json!({ "kind": self.kind, "text": self.text })
    }
}

/// Error or success banner with a message built at runtime
pub fn message(kind: &str, text: impl Into<String>) -> Value {
    json!({ "kind": kind, "text": text.into() })
}

pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut hb = Handlebars::new();
        hb.register_partial("header", HEADER)?;
        hb.register_partial("footer", FOOTER)?;
        for (name, source) in PAGES {
            hb.register_template_string(name, source)?;
        }

        Ok(Self { registry: hb })
    }

    /// Render `page` with `data` merged over the common variables
    pub fn render(&self, page: &str, user: Option<&UserContext>, data: Value) -> AppResult<Html<String>> {
        let mut context = json!({
            "app_name": APP_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "current_year": Utc::now().year(),
            "current_user": user.map(|u| json!({
                "username": u.username,
                "is_admin": u.is_admin(),
            })),
        });

        if let (Value::Object(base), Value::Object(extra)) = (&mut context, data) {
            base.extend(extra);
        }

        Ok(Html(self.registry.render(page, &context)?))
    }
}
