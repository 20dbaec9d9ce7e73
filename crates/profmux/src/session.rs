//! Session bookkeeping.
//!
//! A *session* is one running visualization of one profile of one target. It
//! is created through [`SessionRegistry::create`], which returns a
//! [`SessionId`], and stays bound to the `(host:port, profile)` pair it was
//! created for: requests naming the same id with any other pair are refused.
//!
//! Sessions only become visible once their engine has published its
//! [`HandlerSet`]. Deleted sessions are gone for good and their ids are never
//! handed out again.

mod binding;
mod handler;
mod id;
mod registry;

pub use binding::{BindingKey, profile_url};
pub use handler::{HandlerSet, SessionHandler};
pub use id::{SessionId, SessionIdAllocator};
pub use registry::{RegistryConfig, SessionRegistry};
