use axum::{extract::Request, middleware, response::Response, Router};
use std::time::Instant;

async fn log_request(req: Request, next: middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn add_tracing(router: Router) -> Router {
    router.layer(middleware::from_fn(log_request))
}
