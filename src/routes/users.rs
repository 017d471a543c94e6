//! Account routes; all of them sit behind `RequireAuth`

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::domain::{PasswordChange, UserLookup, UserUpdate};
use crate::error::{AuthError, ErrorContext};
use crate::routes::auth::UserResponse;
use crate::service::UserService;
use crate::validators::ValidationError;

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<UserUpdate, ValidationError> {
        let password = match (self.old_password, self.new_password) {
            (Some(old_password), Some(new_password)) => Some(PasswordChange {
                old_password,
                new_password,
            }),
            (None, None) => None,
            (None, Some(_)) => return Err(ValidationError::EmptyField("old_password")),
            (Some(_), None) => return Err(ValidationError::EmptyField("new_password")),
        };

        Ok(UserUpdate {
            username: self.username,
            email: self.email,
            password,
        })
    }
}

/// Exactly one of the fields selects the account
#[derive(Deserialize)]
pub struct LookupQuery {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl LookupQuery {
    fn into_lookup(self) -> Result<UserLookup, ValidationError> {
        match (self.user_id, self.email, self.username) {
            (Some(id), None, None) => Ok(UserLookup::Id(id)),
            (None, Some(email), None) => Ok(UserLookup::Email(email)),
            (None, None, Some(username)) => Ok(UserLookup::Username(username)),
            (None, None, None) => Err(ValidationError::EmptyField("user_id, email or username")),
            _ => Err(ValidationError::InvalidFormat("lookup query")),
        }
    }
}

/// GET /users/me
pub async fn get_current_user(
    auth: web::ReqData<AuthContext>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AuthError> {
    let user = users.get_user(UserLookup::Id(auth.user_id)).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PATCH /users/me
///
/// Changing the password requires `old_password` alongside `new_password`.
pub async fn update_current_user(
    auth: web::ReqData<AuthContext>,
    form: web::Json<UpdateUserRequest>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("update_user");
    let update = form.into_inner().into_update()?;

    let user = users.update_user(auth.user_id, update).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /users/me
pub async fn delete_current_user(
    auth: web::ReqData<AuthContext>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AuthError> {
    users.delete_user(auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /users/lookup?user_id=..|email=..|username=..
pub async fn lookup_user(
    query: web::Query<LookupQuery>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AuthError> {
    let lookup = query.into_inner().into_lookup()?;
    let user = users.get_user(lookup).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_change_needs_both_fields() {
        let request = UpdateUserRequest {
            username: None,
            email: None,
            old_password: None,
            new_password: Some("NewPassword123".to_string()),
        };
        assert_eq!(
            request.into_update().unwrap_err(),
            ValidationError::EmptyField("old_password")
        );
    }

    #[test]
    fn test_lookup_requires_exactly_one_field() {
        let none = LookupQuery {
            user_id: None,
            email: None,
            username: None,
        };
        assert!(none.into_lookup().is_err());

        let two = LookupQuery {
            user_id: None,
            email: Some("alex@x.com".to_string()),
            username: Some("alex".to_string()),
        };
        assert!(two.into_lookup().is_err());

        let one = LookupQuery {
            user_id: None,
            email: None,
            username: Some("alex".to_string()),
        };
        assert_eq!(
            one.into_lookup().unwrap(),
            UserLookup::Username("alex".to_string())
        );
    }
}
