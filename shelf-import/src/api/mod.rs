//! HTTP API handlers for shelf-import
//!
//! HTTP REST for the import workflow plus an SSE stream of pipeline events

pub mod books;
pub mod health;
pub mod import_workflow;
pub mod sse;

pub use books::book_routes;
pub use health::health_routes;
pub use import_workflow::import_routes;
pub use sse::import_event_stream;
