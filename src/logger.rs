use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;

/// Access log middleware
///
/// Every request runs inside an `http_request` span carrying a fresh request
/// id, so handler and authorizer events nest under it. One line is written
/// per finished request with status and latency. Whether a bearer token was
/// presented is recorded, the token itself never is.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let span = tracing::info_span!(
            "http_request",
            request_id = %uuid::Uuid::new_v4(),
            method = %req.method(),
            path = %req.path(),
            bearer = req.headers().contains_key(AUTHORIZATION),
        );

        let started = Instant::now();
        let service = self.service.clone();

        Box::pin(
            async move {
                let outcome = service.call(req).await;
                let latency_ms = started.elapsed().as_millis() as u64;

                match &outcome {
                    Ok(res) if res.status().is_server_error() => {
                        tracing::error!(status = res.status().as_u16(), latency_ms, "Request failed");
                    }
                    Ok(res) if res.status().is_client_error() => {
                        tracing::warn!(status = res.status().as_u16(), latency_ms, "Request rejected");
                    }
                    Ok(res) => {
                        tracing::info!(status = res.status().as_u16(), latency_ms, "Request completed");
                    }
                    Err(e) => {
                        let status = e.as_response_error().status_code().as_u16();
                        tracing::warn!(status, latency_ms, error = %e, "Request errored");
                    }
                }

                outcome
            }
            .instrument(span),
        )
    }
}
