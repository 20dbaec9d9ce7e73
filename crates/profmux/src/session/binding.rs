use std::{fmt, sync::Arc};

/// The `(target, profile)` pair a session was created for.
///
/// Two keys are equal exactly when both the `host:port` and the profile name
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey(Arc<str>);

impl BindingKey {
    pub fn new(host_and_port: &str, profile: &str) -> Self {
        BindingKey(format!("{host_and_port}/{profile}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL the profile of `profile` kind is fetched from on `host_and_port`.
pub fn profile_url(host_and_port: &str, profile: &str) -> String {
    format!("http://{host_and_port}/debug/pprof/{profile}")
}
