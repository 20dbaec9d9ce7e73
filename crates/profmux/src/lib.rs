#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]
#![doc = include_str!("../README.md")]

mod error;
pub use error::MuxError;

/// Visualization engines and the contract they fulfil
pub mod engine;
pub mod router;
pub mod server;
/// Session ids, bindings and the registry
pub mod session;

pub use engine::{EngineError, LaunchOptions, Readiness, VisualizationEngine};
#[cfg(feature = "fetch-engine")]
pub use engine::fetch::{FetchEngine, FetchEngineConfig};
pub use router::router;
pub use server::{ProfMuxConfig, ProfMuxServer};
pub use session::{BindingKey, HandlerSet, SessionId, SessionRegistry};
