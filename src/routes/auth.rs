//! Authentication routes
//!
//! Signup, login, refresh-token rotation and access-token probing.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::{Signup, User};
use crate::error::{AuthError, ErrorContext};
use crate::service::SessionIssuer;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `identity` is an email or a username
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub identity: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub access_token: String,
}

/// Account as returned to clients; never includes the password hash
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            is_deleted: user.is_deleted,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

fn logged<T>(context: &ErrorContext, result: Result<T, AuthError>) -> Result<T, AuthError> {
    if let Err(e) = &result {
        context.log_error(e);
    }
    result
}

/// POST /auth/signup
///
/// Creates an account and returns it. Tokens come from a separate login.
///
/// # Errors
/// - 400: invalid username, email or password
/// - 409: username or email already taken
pub async fn signup(
    form: web::Json<SignupRequest>,
    sessions: web::Data<SessionIssuer>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("signup");
    let form = form.into_inner();

    let user = logged(
        &context,
        sessions
            .signup(Signup {
                username: form.username,
                email: form.email,
                password: form.password,
            })
            .await,
    )?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// # Errors
/// - 401: unknown identity or wrong password, indistinguishably
/// - 403: account deleted
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionIssuer>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("login");
    let pair = logged(&context, sessions.login(&form.identity, &form.password).await)?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /auth/refresh
///
/// Consumes the presented refresh token; reusing it afterwards fails with 400.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionIssuer>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("refresh_token");
    let pair = logged(&context, sessions.refresh_token(&form.refresh_token).await)?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /auth/validate
pub async fn validate(
    form: web::Json<ValidateRequest>,
    sessions: web::Data<SessionIssuer>,
) -> HttpResponse {
    HttpResponse::Ok().json(sessions.validate_token(&form.access_token))
}
