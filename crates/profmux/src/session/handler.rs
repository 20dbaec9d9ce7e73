use std::collections::HashMap;

use axum::routing::MethodRouter;

/// A single HTTP endpoint exposed by a session.
pub type SessionHandler = MethodRouter;

/// Path-keyed handlers exposed by one session once its engine is ready.
///
/// Keys are session-relative paths: `"/"` is the session's root page and
/// `"/{rest}"` any other resource.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: HashMap<String, SessionHandler>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, handler: SessionHandler) -> Self {
        self.insert(path, handler);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, handler: SessionHandler) {
        self.handlers.insert(normalize(path.into()), handler);
    }

    /// Look up the handler for a sub-path as captured from the request, with
    /// or without its leading slash. The empty sub-path is the root.
    pub fn get(&self, sub_path: &str) -> Option<&SessionHandler> {
        self.handlers.get(&normalize(sub_path.to_owned()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

fn normalize(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    #[test]
    fn test_root_is_reachable_by_empty_and_slash() {
        let set = HandlerSet::new().with("/", get(|| async { "root" }));
        assert!(set.get("").is_some());
        assert!(set.get("/").is_some());
    }

    #[test]
    fn test_lookup_is_exact() {
        let set = HandlerSet::new()
            .with("/flamegraph", get(|| async { "flame" }))
            .with("top", get(|| async { "top" }));
        assert!(set.get("flamegraph").is_some());
        assert!(set.get("/top").is_some());
        assert!(set.get("flamegraph/extra").is_none());
        assert!(set.get("").is_none());
        assert_eq!(set.len(), 2);
    }
}
