//! Client-side half of the session timeout tracker.
//!
//! Runs cooperatively on the UI event loop: a request interceptor that
//! reports activity to the server, a response interceptor that reacts to
//! timeout rejections, and a local countdown that warns and logs out in
//! lockstep with the server budget. The server check stays authoritative;
//! this side is best-effort.

pub mod client;
pub mod countdown;
pub mod storage;

pub use client::{HeartbeatClient, ResponseDisposition, TickAction};
pub use countdown::{CountdownSignal, IdleCountdown};
pub use storage::{ClientStorage, MemoryStorage};
