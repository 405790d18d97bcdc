/// Authorization Middleware
///
/// Runs the session authorizer over the `Authorization` header of every
/// request in the wrapped scope. On success the verified access claims are
/// injected into request extensions for route handlers. A rejection is
/// answered here as a regular response so outer middleware still sees it.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::SessionAuthorizer;

/// Guard for routes that require a live, role-consistent session
pub struct Authorize {
    authorizer: SessionAuthorizer,
}

impl Authorize {
    pub fn new(authorizer: SessionAuthorizer) -> Self {
        Self { authorizer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authorize
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthorizeService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthorizeService {
            service: Rc::new(service),
            authorizer: self.authorizer.clone(),
        }))
    }
}

pub struct AuthorizeService<S> {
    service: Rc<S>,
    authorizer: SessionAuthorizer,
}

impl<S, B> Service<ServiceRequest> for AuthorizeService<S>
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
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let authorizer = self.authorizer.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let claims = match authorizer.authorize(header.as_deref()).await {
                Ok(claims) => claims,
                Err(e) => return Ok(req.error_response(e).map_into_right_body()),
            };

            tracing::debug!(
                user_id = %claims.base.id,
                role = %claims.base.role,
                "Session authorized"
            );
            req.extensions_mut().insert(claims);

            service.call(req).await.map(|res| res.map_into_left_body())
        })
    }
}
