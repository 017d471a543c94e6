//! Bearer-token middleware
//!
//! Runs the `RequestAuthenticator` on the `Authorization` header and stores
//! the resulting `AuthContext` in request extensions for handlers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::RequestAuthenticator;

/// Rejects calls without a valid access token.
///
/// Every failure produces the same generic 401 body.
pub struct RequireAuth {
    authenticator: RequestAuthenticator,
}

impl RequireAuth {
    pub fn new(authenticator: RequestAuthenticator) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAuthService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

pub struct RequireAuthService<S> {
    service: Rc<S>,
    authenticator: RequestAuthenticator,
}

impl<S, B> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match self.authenticator.authenticate(authorization) {
            Ok(context) => {
                req.extensions_mut().insert(context);
                let service = Rc::clone(&self.service);
                Box::pin(async move {
                    let response = service.call(req).await?;
                    Ok(response.map_into_left_body())
                })
            }
            Err(e) => {
                tracing::debug!(path = %req.path(), "Request rejected by authenticator");
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
