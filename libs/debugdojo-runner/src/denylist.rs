/// Forbidden-content pre-filter
///
/// A literal substring check over the full source text, applied once per run
/// before any test case executes. It stops accidental echoes of the upstream
/// credential; it is not a sandbox and trivially bypassable by code that
/// assembles the string at runtime.

#[derive(Debug, Clone)]
pub struct Denylist {
    marker: String,
    secret: Option<String>,
}

impl Denylist {
    /// `marker` is reported by name when hit; `secret` is matched but never
    /// echoed back.
    pub fn new(marker: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            marker: marker.into(),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Returns the halt message if the source contains forbidden content.
    pub fn check(&self, source: &str) -> Option<String> {
        if !self.marker.is_empty() && source.contains(&self.marker) {
            return Some(format!(
                "Execution halted: Code contains forbidden string '{}'.",
                self.marker
            ));
        }
        match &self.secret {
            Some(secret) if source.contains(secret.as_str()) => Some(
                "Execution halted: Code contains the configured API credential.".to_string(),
            ),
            _ => None,
        }
    }
}
