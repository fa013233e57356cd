//! API Module
//!
//! HTTP handlers and routing exposing the herd cache as a JSON service.
//!
//! # Endpoints
//! - `PUT /set`, `POST /add` - Store a value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `POST /incr/:key`, `POST /decr/:key` - Counter arithmetic
//! - `POST /get_many`, `PUT /set_many`, `POST /delete_many` - Batch operations
//! - `POST /clear` - Flush everything
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
