use crate::config::Config;
use crate::extraction::Extractors;
use crate::matching::matcher::SkillMatcher;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is built once in `main`; handlers only clone handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Matcher bound to the configured embedder (hash or API, optionally cached).
    pub matcher: SkillMatcher,
    pub extractors: Extractors,
}
