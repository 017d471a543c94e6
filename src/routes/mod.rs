mod auth;
mod health_check;
mod users;

pub use auth::{login, refresh, signup, validate, UserResponse};
pub use health_check::health_check;
pub use users::{delete_current_user, get_current_user, lookup_user, update_current_user};
