//! Request handlers for the scores collection.

mod rows;
mod websocket;

pub use rows::*;
pub use websocket::handle_websocket_connection;
