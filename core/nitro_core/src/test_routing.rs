use crate::routing::{classify, decide, Area, GuardState, Navigation, ProtectedRoute, Route};
use crate::types::{Role, User};

fn user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        role,
        email: None,
        name: None,
        approval_status: None,
    }
}

fn protected(path: &str) -> ProtectedRoute {
    match classify(path) {
        Route::Protected(route) => route,
        Route::Public => panic!("{path} should be protected"),
    }
}

#[test]
fn classify_public_and_protected_paths() {
    assert_eq!(classify("/login"), Route::Public);
    assert_eq!(classify("/"), Route::Public);
    assert_eq!(classify("/auth/callback#access_token=x"), Route::Public);

    let route = protected("/participant/u1/allocations?tab=active");
    assert_eq!(route.area, Area::Participant);
    assert_eq!(route.owner_id.as_deref(), Some("u1"));

    let route = protected("/brand/projects/new");
    assert_eq!(route.area, Area::Brand);
    assert_eq!(route.owner_id, None);

    assert_eq!(protected("/super-admin/s1/dashboard").area, Area::SuperAdmin);
}

#[test]
fn owner_mismatch_redirects_to_own_dashboard() {
    let route = protected("/participant/someone-else/dashboard");
    let state = decide(&route, &user("u1", Role::Participant));
    assert_eq!(
        state,
        GuardState::DeniedWrongOwner {
            canonical: "/participant/u1/dashboard".to_string()
        }
    );
    assert_eq!(
        state.navigation("/participant/someone-else/dashboard"),
        Navigation::Redirect("/participant/u1/dashboard".to_string())
    );
}

#[test]
fn missing_owner_segment_is_treated_as_mismatch() {
    let state = decide(&protected("/admin"), &user("a1", Role::Admin));
    assert_eq!(
        state,
        GuardState::DeniedWrongOwner {
            canonical: "/admin/a1/dashboard".to_string()
        }
    );
}

#[test]
fn wrong_role_goes_to_login() {
    let state = decide(&protected("/admin/u1/payouts"), &user("u1", Role::Participant));
    assert_eq!(state, GuardState::DeniedWrongRole);
    assert_eq!(
        state.navigation("/admin/u1/payouts"),
        Navigation::Redirect("/login".to_string())
    );
}

#[test]
fn super_admin_may_use_admin_area() {
    let state = decide(&protected("/admin/s1/verification"), &user("s1", Role::SuperAdmin));
    assert_eq!(state, GuardState::Granted);
    assert_eq!(
        decide(&protected("/super-admin/a1/dashboard"), &user("a1", Role::Admin)),
        GuardState::DeniedWrongRole
    );
}

#[test]
fn granted_renders_requested_page() {
    let path = "/participant/u1/allocations";
    let state = decide(&protected(path), &user("u1", Role::Participant));
    assert_eq!(state.navigation(path), Navigation::Render(path.to_string()));
}

#[test]
fn brand_routes_are_not_owner_scoped() {
    let state = decide(&protected("/brand/projects"), &user("b1", Role::Brand));
    assert_eq!(state, GuardState::Granted);
}

#[test]
fn checking_shows_placeholder() {
    assert_eq!(GuardState::Checking.navigation("/participant/u1"), Navigation::Loading);
    assert_eq!(
        GuardState::DeniedNoSession.navigation("/participant/u1"),
        Navigation::Redirect("/login".to_string())
    );
}
