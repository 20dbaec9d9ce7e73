//! Visualization engines.
//!
//! An engine turns a profile URL into a running visualization backend and
//! hands its HTTP endpoints back to the [`SessionRegistry`] through a
//! [`Readiness`] signal.
//!
//! The registry runs [`VisualizationEngine::launch`] on its own task. The
//! launch future may return right after signalling readiness, or keep running
//! for as long as the backend lives; in the latter case the task is aborted
//! when the session is deleted.
//!
//! # Implementations
//!
//! * [`fetch::FetchEngine`] downloads the profile and serves it back with an
//!   index page and a JSON summary.
//!
//! [`SessionRegistry`]: crate::session::SessionRegistry

use std::borrow::Cow;

use tokio::sync::oneshot;

use crate::session::{HandlerSet, SessionId};

#[cfg(feature = "fetch-engine")]
#[cfg_attr(docsrs, doc(cfg(feature = "fetch-engine")))]
pub mod fetch;

/// Everything an engine needs to start one session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub session_id: SessionId,
    pub profile: String,
    /// Where the profile is fetched from.
    pub source_url: String,
    /// Public path the session's UI is served under, ending with `/`.
    pub ui_base: String,
}

/// Single-use signal an engine fires once its handlers are ready to serve.
#[derive(Debug)]
pub struct Readiness {
    tx: oneshot::Sender<HandlerSet>,
}

impl Readiness {
    pub fn channel() -> (Self, oneshot::Receiver<HandlerSet>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Publish the session's handlers.
    ///
    /// An error means nobody is waiting for this session any more and the
    /// engine should shut its backend down.
    pub fn ready(self, handlers: HandlerSet) -> Result<(), EngineError> {
        self.tx.send(handlers).map_err(|_| EngineError::Abandoned)
    }

    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

pub trait VisualizationEngine: Send + Sync + 'static {
    fn launch(
        &self,
        options: LaunchOptions,
        readiness: Readiness,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("session was abandoned before the engine became ready")]
    Abandoned,
    #[error("engine exited before becoming ready")]
    ExitedBeforeReady,
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[cfg(feature = "fetch-engine")]
    #[error(transparent)]
    Fetch(#[from] reqwest::Error),
    #[error("{message}")]
    Other {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl EngineError {
    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        EngineError::Other {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EngineError::Other {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
