//! End-to-end tests that drive guarded axum routers.
