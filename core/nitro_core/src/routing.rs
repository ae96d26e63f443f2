//! # Role-gated routes
//!
//! Every protected page belongs to one area (`/participant/:id/...`,
//! `/admin/:id/...`, `/super-admin/:id/...`, `/brand/...`). A navigation is
//! granted only after the session has been re-verified against the backend;
//! the decision itself is a pure function of the requested path and the
//! verified user.
//!
//! ```text
//! CHECKING ─┬─► DENIED_NO_SESSION   ─► /login
//!           ├─► DENIED_WRONG_ROLE   ─► /login
//!           ├─► DENIED_WRONG_OWNER  ─► /<role>/<verified id>/dashboard
//!           └─► GRANTED             ─► requested page
//! ```

use crate::types::{Role, User};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Participant,
    Admin,
    SuperAdmin,
    Brand,
}

impl Area {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "participant" => Some(Self::Participant),
            "admin" => Some(Self::Admin),
            "super-admin" => Some(Self::SuperAdmin),
            "brand" => Some(Self::Brand),
            _ => None,
        }
    }

    /// Super admins may use the admin area.
    pub fn allows(self, role: Role) -> bool {
        match self {
            Self::Participant => role == Role::Participant,
            Self::Admin => matches!(role, Role::Admin | Role::SuperAdmin),
            Self::SuperAdmin => role == Role::SuperAdmin,
            Self::Brand => role == Role::Brand,
        }
    }

    /// Whether the second path segment names the owning user.
    pub fn owner_scoped(self) -> bool {
        !matches!(self, Self::Brand)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoute {
    pub area: Area,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Public,
    Protected(ProtectedRoute),
}

/// Classify a requested path. Query strings and fragments are ignored.
pub fn classify(path: &str) -> Route {
    let path = path.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    let Some(area) = segments.next().and_then(Area::from_segment) else {
        return Route::Public;
    };
    let owner_id = if area.owner_scoped() {
        segments.next().map(str::to_string)
    } else {
        None
    };
    Route::Protected(ProtectedRoute { area, owner_id })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    DeniedNoSession,
    DeniedWrongRole,
    DeniedWrongOwner { canonical: String },
    Granted,
}

/// What the shell should do with a requested path in a given guard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Loading,
    Redirect(String),
    Render(String),
}

impl GuardState {
    pub fn navigation(&self, requested: &str) -> Navigation {
        match self {
            Self::Checking => Navigation::Loading,
            Self::DeniedNoSession | Self::DeniedWrongRole => {
                Navigation::Redirect(LOGIN_PATH.to_string())
            }
            Self::DeniedWrongOwner { canonical } => Navigation::Redirect(canonical.clone()),
            Self::Granted => Navigation::Render(requested.to_string()),
        }
    }
}

/// Decide a protected route for a freshly verified user.
///
/// An owner-scoped path without an id is treated as someone else's page.
pub fn decide(route: &ProtectedRoute, user: &User) -> GuardState {
    if !route.area.allows(user.role) {
        return GuardState::DeniedWrongRole;
    }
    if route.area.owner_scoped() && route.owner_id.as_deref() != Some(user.id.as_str()) {
        return GuardState::DeniedWrongOwner {
            canonical: user.role.dashboard_path(&user.id),
        };
    }
    GuardState::Granted
}
