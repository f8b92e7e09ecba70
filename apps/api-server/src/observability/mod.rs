//! Observability - request IDs for correlating logs across a request.

mod request_id;

pub use request_id::RequestIdMiddleware;
