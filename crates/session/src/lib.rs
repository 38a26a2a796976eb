//! Session activity tracking and idle-timeout enforcement.
//!
//! Stamps a last-activity timestamp per authenticated session, decides when
//! a session has exceeded its inactivity budget, and tears expired sessions
//! down (session state, anti-forgery token, bearer credential, cached
//! activity). The session container, credential revocation, and the audit
//! sink are traits; everything takes the principal and the request context
//! as explicit arguments, no ambient lookup.

pub mod audit;
pub mod context;
pub mod evaluator;
pub mod invalidator;
pub mod memory;
pub mod store;

pub use audit::{capture_audit, tracing_audit, AuditSink, CaptureAuditSink, SessionAuditEvent};
pub use context::{RequestContext, SessionContainer, SESSION_KEY_LAST_ACTIVITY};
pub use evaluator::evaluate;
pub use invalidator::{CredentialRevoker, InvalidationReport, InvalidationStep, SessionInvalidator};
pub use memory::{MemoryRevoker, MemorySessionContainer, SESSION_KEY_CSRF_TOKEN};
pub use store::ActivityStore;
