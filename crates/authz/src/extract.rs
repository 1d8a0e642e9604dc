//! The `CurrentUser` extractor and its redirect rejection.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, OriginalUri};
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_cookies::Cookies;

use shelf_db::RecordId;

use crate::session::SessionStore;

/// Shared authentication state, cloned into every module's router state.
#[derive(Clone)]
pub struct AuthContext {
    pub sessions: Arc<SessionStore>,
    pub cookie_name: String,
    pub login_path: String,
}

impl AuthContext {
    pub fn new(
        sessions: Arc<SessionStore>,
        cookie_name: impl Into<String>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            cookie_name: cookie_name.into(),
            login_path: login_path.into(),
        }
    }
}

/// The authenticated user behind the current request.
///
/// Extracting this guards a handler: requests without a live session are
/// rejected with a redirect to the login page carrying the requested path
/// in a `next` query parameter.
pub struct CurrentUser {
    pub user_id: RecordId,
    pub token: String,
}

/// 302 redirect to `{login_path}?next={requested_path}`.
#[derive(Debug)]
pub struct LoginRedirect {
    location: String,
}

impl LoginRedirect {
    pub fn new(login_path: &str, next: &str) -> Self {
        Self {
            location: format!("{login_path}?next={next}"),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.location)]).into_response()
    }
}

/// Path the client actually requested, before any router nesting stripped
/// a prefix from it.
fn requested_path(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_ref(state);
        let next = requested_path(parts);

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| LoginRedirect::new(&auth.login_path, &next))?;

        let token = cookies
            .get(&auth.cookie_name)
            .map(|cookie| cookie.value().to_string());

        let Some(token) = token else {
            return Err(LoginRedirect::new(&auth.login_path, &next));
        };

        match auth.sessions.resolve(&token) {
            Some(user_id) => Ok(CurrentUser { user_id, token }),
            None => Err(LoginRedirect::new(&auth.login_path, &next)),
        }
    }
}
