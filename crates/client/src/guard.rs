//! Route protection.
//!
//! A declarative table maps path prefixes to protection levels; the guard
//! itself is a pure function of the table, the target path, and the current
//! [`SessionState`]. It renders nothing and navigates nowhere, it only
//! returns the decision.

use crate::session::SessionState;

/// Route paths the client vocabulary uses for navigation values.
pub mod paths {
    use rent_wheels_core::CarId;

    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const CARS: &str = "/cars";
    pub const ADD_CAR: &str = "/add-car";
    pub const DASHBOARD: &str = "/dashboard";
    pub const MY_BOOKINGS: &str = "/my-bookings";
    pub const MY_LISTINGS: &str = "/my-listings";

    /// Detail path for one car.
    #[must_use]
    pub fn car_details(id: &CarId) -> String {
        format!("/cars/{id}")
    }
}

/// Where to resume after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    /// The path the user originally asked for.
    pub return_to: String,
}

/// Outcome of evaluating a navigation against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The target may render.
    Render,
    /// Send the user to sign-in, then back to where they were headed.
    RedirectToLogin(LoginRedirect),
}

/// Protection level of a route prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Public,
    RequiresIdentity,
}

/// One rule: a path prefix and its protection level.
#[derive(Debug, Clone)]
pub struct RouteRule {
    prefix: &'static str,
    protection: Protection,
}

impl RouteRule {
    #[must_use]
    pub const fn public(prefix: &'static str) -> Self {
        Self {
            prefix,
            protection: Protection::Public,
        }
    }

    #[must_use]
    pub const fn protected(prefix: &'static str) -> Self {
        Self {
            prefix,
            protection: Protection::RequiresIdentity,
        }
    }

    /// Whether `target` falls under this rule's prefix.
    ///
    /// A prefix matches itself and anything nested below it, on path-segment
    /// boundaries: `/cars` covers `/cars` and `/cars/abc` but not `/carsx`.
    fn matches(&self, target: &str) -> bool {
        if target == self.prefix {
            return true;
        }
        target.strip_prefix(self.prefix).is_some_and(|rest| {
            self.prefix.ends_with('/') || rest.starts_with('/')
        })
    }
}

/// Declarative protection table, longest matching prefix wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    #[must_use]
    pub const fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The marketplace's route protection: browsing is open, everything tied
    /// to a signed-in user is not.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            RouteRule::public(paths::HOME),
            RouteRule::public(paths::CARS),
            RouteRule::protected("/cars/"),
            RouteRule::protected(paths::ADD_CAR),
            RouteRule::protected(paths::DASHBOARD),
            RouteRule::protected(paths::MY_BOOKINGS),
            RouteRule::protected(paths::MY_LISTINGS),
        ])
    }

    /// Protection level for `target`. Paths no rule covers are public.
    #[must_use]
    pub fn protection_for(&self, target: &str) -> Protection {
        self.rules
            .iter()
            .filter(|rule| rule.matches(target))
            .max_by_key(|rule| rule.prefix.len())
            .map_or(Protection::Public, |rule| rule.protection)
    }

    /// Decide whether `target` may render for `state`.
    ///
    /// Pure: same inputs, same decision. Returns `None` while identity
    /// resolution is pending; callers hold rendering until a decision exists
    /// so protected content never flashes ahead of a redirect.
    #[must_use]
    pub fn guard(&self, target: &str, state: &SessionState) -> Option<GuardDecision> {
        match state {
            SessionState::Uninitialized | SessionState::Resolving => None,
            SessionState::Authenticated(_) => Some(GuardDecision::Render),
            SessionState::Anonymous => Some(match self.protection_for(target) {
                Protection::Public => GuardDecision::Render,
                Protection::RequiresIdentity => GuardDecision::RedirectToLogin(LoginRedirect {
                    return_to: target.to_owned(),
                }),
            }),
        }
    }
}
