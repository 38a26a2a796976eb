//! HTTP gateway: the request gate middleware, the authentication-context
//! boundary, and the REST surface around them.

pub mod auth;
pub mod gate;
pub mod rest;
pub mod server;

pub use gate::{session_gate, GateState};
pub use server::{router, AppState, GatewayServer};
