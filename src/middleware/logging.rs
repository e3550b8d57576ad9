use crate::rate_limit::client_id;
use axum::extract::Request;
use axum::http::{Method, Uri};
use axum::response::Response;
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower_layer::Layer;
use tower_service::Service;

/// Outermost layer: one `tracing` event per request with method, path, remote, status and
/// wall-clock duration.
///
/// The event is emitted when the response future resolves, so the duration includes all
/// downstream work, including requests short-circuited by inner layers.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S> Service<Request> for LoggingService<S>
where
    S: Service<Request, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = LoggingFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let remote = client_id(&req);
        LoggingFuture {
            inner: self.inner.call(req),
            method,
            uri,
            remote,
            start: Instant::now(),
        }
    }
}

/// Response future that logs on completion.
#[pin_project]
pub struct LoggingFuture<F> {
    #[pin]
    inner: F,
    method: Method,
    uri: Uri,
    remote: String,
    start: Instant,
}

impl<F, E> Future for LoggingFuture<F>
where
    F: Future<Output = Result<Response, E>>,
{
    type Output = Result<Response, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = match this.inner.poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };

        let elapsed = this.start.elapsed();
        let status = match &result {
            Ok(res) => res.status().as_u16(),
            Err(_) => 0,
        };
        tracing::info!(
            method = %this.method,
            path = %this.uri.path(),
            remote = %this.remote,
            status,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request"
        );
        Poll::Ready(result)
    }
}
