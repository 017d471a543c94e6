use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::RequestAuthenticator;
use crate::middleware::RequireAuth;
use crate::routes::{
    delete_current_user, get_current_user, health_check, login, lookup_user, refresh, signup,
    update_current_user, validate,
};
use crate::service::{SessionIssuer, UserService};

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionIssuer,
    pub users: UserService,
    pub authenticator: RequestAuthenticator,
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(state.sessions);
    let users = web::Data::new(state.users);
    let authenticator = state.authenticator;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(sessions.clone())
            .app_data(users.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/validate", web::post().to(validate))
            // Protected routes
            .service(
                web::scope("/users")
                    .wrap(RequireAuth::new(authenticator.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/me", web::patch().to(update_current_user))
                    .route("/me", web::delete().to(delete_current_user))
                    .route("/lookup", web::get().to(lookup_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
