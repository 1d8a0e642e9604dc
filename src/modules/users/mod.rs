pub mod models;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use validator::ValidateEmail;

use shelf_authz::{password, AuthContext, CurrentUser};
use shelf_db::Record;
use shelf_http::error::{AppError, FieldError};
use shelf_kernel::{InitCtx, Module};

use crate::modules::{AppEvent, SharedBus};
use crate::utils;
use models::{LoginPayload, Profile, RegisterPayload, User};
use store::UserStore;

const REQUIRED_MESSAGE: &str = "This field is required.";
const INVALID_EMAIL_MESSAGE: &str = "Enter a valid email address.";
const DUPLICATE_USERNAME_MESSAGE: &str = "A user with that username already exists.";

/// Where logout lands. The book list is the closest thing to a landing
/// page this service has.
const POST_LOGOUT_PATH: &str = "/api/books";

/// Shared state behind the users router.
#[derive(Clone, FromRef)]
pub struct UsersState {
    pub users: Arc<UserStore>,
    pub auth: AuthContext,
    pub bus: SharedBus,
}

/// Users module: registration, login/logout, and the profile view.
pub struct UsersModule {
    state: UsersState,
}

impl UsersModule {
    pub fn new(users: Arc<UserStore>, auth: AuthContext, bus: SharedBus) -> Self {
        Self {
            state: UsersState { users, auth, bus },
        }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            prefix = %utils::log_prefix(self.name()),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", get(login_form).post(login))
            .route("/logout", get(logout))
            .route("/profile", get(profile))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Register a new account",
                        "tags": ["Users"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/RegisterPayload" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created user",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/User" }
                                    }
                                }
                            },
                            "409": {
                                "description": "Username already taken",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/login": {
                    "get": {
                        "summary": "Describe the credential form",
                        "tags": ["Users"],
                        "responses": {
                            "200": { "description": "Field list" }
                        }
                    },
                    "post": {
                        "summary": "Log in",
                        "tags": ["Users"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/LoginPayload" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Session established" },
                            "401": {
                                "description": "Invalid credentials",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/logout": {
                    "get": {
                        "summary": "Log out and return to the book list",
                        "tags": ["Users"],
                        "responses": {
                            "302": { "description": "Redirect to login when unauthenticated" },
                            "303": { "description": "Session revoked" }
                        }
                    }
                },
                "/profile": {
                    "get": {
                        "summary": "Current user's profile",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "Profile details",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Profile" }
                                    }
                                }
                            },
                            "302": { "description": "Redirect to login when unauthenticated" }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Users health check",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {
                                    "text/plain": { "schema": { "type": "string" } }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "first_name": { "type": "string" },
                            "last_name": { "type": "string" },
                            "email": { "type": "string", "format": "email" }
                        },
                        "required": ["id", "username", "first_name", "last_name", "email"]
                    },
                    "RegisterPayload": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "first_name": { "type": "string" },
                            "last_name": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["username", "password"]
                    },
                    "LoginPayload": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["username", "password"]
                    },
                    "Profile": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "first_name": { "type": "string" },
                            "last_name": { "type": "string" },
                            "email": { "type": "string", "format": "email" }
                        },
                        "required": ["username", "first_name", "last_name", "email"]
                    }
                }
            }
        }))
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "users module is healthy"
}

/// Registration fields after validation, before hashing.
struct Registration {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

fn validate_registration(payload: RegisterPayload) -> Result<Registration, AppError> {
    let mut errors = Vec::new();

    let username = payload.username.unwrap_or_default();
    if username.trim().is_empty() {
        errors.push(FieldError::new("username", REQUIRED_MESSAGE));
    }

    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        errors.push(FieldError::new("password", REQUIRED_MESSAGE));
    }

    let email = payload.email.unwrap_or_default();
    if !email.is_empty() && !email.validate_email() {
        errors.push(FieldError::new("email", INVALID_EMAIL_MESSAGE));
    }

    if !errors.is_empty() {
        return Err(AppError::validation(errors, "registration failed validation"));
    }

    Ok(Registration {
        username,
        first_name: payload.first_name.unwrap_or_default(),
        last_name: payload.last_name.unwrap_or_default(),
        email,
        password,
    })
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<Record<User>>), AppError> {
    let registration = validate_registration(payload)?;
    let password_hash = password::hash(&registration.password)?;

    let record = state
        .users
        .create(User {
            username: registration.username,
            first_name: registration.first_name,
            last_name: registration.last_name,
            email: registration.email,
            password_hash,
        })
        .map_err(|_| {
            AppError::conflict(
                vec![FieldError::new("username", DUPLICATE_USERNAME_MESSAGE)],
                "registration failed",
            )
        })?;

    state.bus.publish(&AppEvent::UserRegistered {
        username: record.data.username.clone(),
        email: record.data.email.clone(),
    });

    tracing::info!(username = %record.data.username, "user registered");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn login_form() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password"] }))
}

async fn login(
    State(state): State<UsersState>,
    cookies: Cookies,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let username = payload.username.unwrap_or_default();
    let supplied = payload.password.unwrap_or_default();

    let record = state
        .users
        .find_by_username(&username)
        .filter(|record| password::verify(&supplied, &record.data.password_hash))
        .ok_or_else(|| AppError::unauthorized("Invalid username or password."))?;

    let token = state.auth.sessions.create(record.id);
    cookies.add(
        Cookie::build((state.auth.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .build(),
    );

    tracing::info!(username = %record.data.username, "login succeeded");
    Ok(Json(json!({ "message": "You have successfully logged in." })))
}

async fn logout(
    State(state): State<UsersState>,
    user: CurrentUser,
    cookies: Cookies,
) -> Redirect {
    state.auth.sessions.revoke(&user.token);
    cookies.remove(
        Cookie::build((state.auth.cookie_name.clone(), ""))
            .path("/")
            .build(),
    );

    Redirect::to(POST_LOGOUT_PATH)
}

async fn profile(
    State(state): State<UsersState>,
    user: CurrentUser,
) -> Result<Json<Profile>, AppError> {
    let record = state
        .users
        .get(user.user_id)
        .ok_or_else(|| AppError::unauthorized("session user no longer exists"))?;

    Ok(Json(Profile::from(&record.data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use shelf_authz::SessionStore;
    use shelf_events::EventBus;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    fn test_state() -> UsersState {
        UsersState {
            users: Arc::new(UserStore::new()),
            auth: AuthContext::new(
                Arc::new(SessionStore::new()),
                "shelf_session",
                "/api/users/login",
            ),
            bus: Arc::new(EventBus::new()),
        }
    }

    fn app(state: &UsersState) -> Router {
        UsersModule {
            state: state.clone(),
        }
        .routes()
        .layer(CookieManagerLayer::new())
    }

    fn seed_user(state: &UsersState, username: &str, plain: &str) -> Record<User> {
        state
            .users
            .create(User {
                username: username.to_string(),
                first_name: "Sirojiddin".to_string(),
                last_name: "Samadov".to_string(),
                email: "siroj@gmail.com".to_string(),
                password_hash: password::hash(plain).unwrap(),
            })
            .unwrap()
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const FULL_REGISTRATION: &str = r#"{
        "username": "Sirojiddin",
        "first_name": "Sirojiddin",
        "last_name": "Samadov",
        "email": "siroj@gmail.com",
        "password": "joris94@07"
    }"#;

    #[tokio::test]
    async fn registration_creates_a_user_with_a_hashed_password() {
        let state = test_state();

        let response = app(&state)
            .oneshot(json_request("/register", FULL_REGISTRATION))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let record = state.users.find_by_username("Sirojiddin").unwrap();
        assert_eq!(record.data.first_name, "Sirojiddin");
        assert_eq!(record.data.last_name, "Samadov");
        assert_eq!(record.data.email, "siroj@gmail.com");
        assert_ne!(record.data.password_hash, "joris94@07");
        assert!(password::verify("joris94@07", &record.data.password_hash));
    }

    #[tokio::test]
    async fn responses_never_leak_the_password_hash() {
        let state = test_state();

        let response = app(&state)
            .oneshot(json_request("/register", FULL_REGISTRATION))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["username"], "Sirojiddin");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn missing_required_fields_create_nothing() {
        let state = test_state();

        let response = app(&state)
            .oneshot(json_request(
                "/register",
                r#"{"first_name": "Sirojiddin", "email": "siroj@gmail.com"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.users.count(), 0);

        let body = body_json(response).await;
        let details = body["error"]["details"].as_array().unwrap().clone();
        let fields: Vec<&str> = details
            .iter()
            .map(|detail| detail["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"username"));
        assert!(fields.contains(&"password"));
        for detail in &details {
            assert_eq!(detail["error"], REQUIRED_MESSAGE);
        }
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let state = test_state();

        let response = app(&state)
            .oneshot(json_request(
                "/register",
                r#"{
                    "username": "Sirojiddin",
                    "first_name": "Sirojiddin",
                    "last_name": "Samadov",
                    "email": "invalid-email",
                    "password": "joris94@07"
                }"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.users.count(), 0);

        let body = body_json(response).await;
        assert_eq!(body["error"]["details"][0]["field"], "email");
        assert_eq!(body["error"]["details"][0]["error"], INVALID_EMAIL_MESSAGE);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_a_conflict() {
        let state = test_state();
        seed_user(&state, "Sirojiddin", "somepassword");

        let response = app(&state)
            .oneshot(json_request("/register", FULL_REGISTRATION))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.users.count(), 1);

        let body = body_json(response).await;
        assert_eq!(body["error"]["details"][0]["error"], DUPLICATE_USERNAME_MESSAGE);
    }

    #[tokio::test]
    async fn successful_login_opens_a_session() {
        let state = test_state();
        seed_user(&state, "Sirojiddin", "somepass");

        let response = app(&state)
            .oneshot(json_request(
                "/login",
                r#"{"username": "Sirojiddin", "password": "somepass"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        assert_eq!(state.auth.sessions.active_count(), 1);
    }

    #[tokio::test]
    async fn wrong_credentials_establish_no_session() {
        let state = test_state();
        seed_user(&state, "Sirojiddin", "somepass");

        for body in [
            r#"{"username": "wrong-username", "password": "somepass"}"#,
            r#"{"username": "Sirojiddin", "password": "wrong-password"}"#,
        ] {
            let response = app(&state)
                .oneshot(json_request("/login", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(state.auth.sessions.active_count(), 0);
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let state = test_state();
        let record = seed_user(&state, "Sirojiddin", "somepass");
        let token = state.auth.sessions.create(record.id);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .header(header::COOKIE, format!("shelf_session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], POST_LOGOUT_PATH);
        assert_eq!(state.auth.sessions.active_count(), 0);
    }

    #[tokio::test]
    async fn profile_requires_login_and_carries_the_next_path() {
        let state = test_state();

        let response = app(&state)
            .oneshot(Request::builder().uri("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/api/users/login?next=/profile"
        );
    }

    #[tokio::test]
    async fn profile_renders_the_current_users_details() {
        let state = test_state();
        let record = seed_user(&state, "Sirojiddin", "somepass");
        let token = state.auth.sessions.create(record.id);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri("/profile")
                    .header(header::COOKIE, format!("shelf_session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "Sirojiddin");
        assert_eq!(body["first_name"], "Sirojiddin");
        assert_eq!(body["last_name"], "Samadov");
        assert_eq!(body["email"], "siroj@gmail.com");
    }

    #[tokio::test]
    async fn registration_publishes_exactly_one_event() {
        let state = test_state();
        let seen: Arc<Mutex<Vec<AppEvent>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            state.bus.subscribe(move |event: &AppEvent| {
                seen.lock().unwrap().push(event.clone());
            });
        }

        app(&state)
            .oneshot(json_request("/register", FULL_REGISTRATION))
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(
            *events,
            vec![AppEvent::UserRegistered {
                username: "Sirojiddin".to_string(),
                email: "siroj@gmail.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn failed_registration_publishes_nothing() {
        let state = test_state();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            state.bus.subscribe(move |event: &AppEvent| {
                seen.lock().unwrap().push(event.clone());
            });
        }

        app(&state)
            .oneshot(json_request("/register", r#"{"email": "siroj@gmail.com"}"#))
            .await
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }
}
