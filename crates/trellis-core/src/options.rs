/// Runtime behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Re-check the pending set before a flush exits so updates scheduled by
    /// effects during the flush render in the same task. Off by default: such
    /// updates then wait for the next external schedule request.
    pub drain_reentrant_updates: bool,
    /// Upper bound on flush passes when draining re-entrant updates.
    pub max_flush_passes: usize,
}

pub const DRAIN_REENTRANT_ENV: &str = "TRELLIS_DRAIN_REENTRANT";
pub const MAX_FLUSH_PASSES_ENV: &str = "TRELLIS_MAX_FLUSH_PASSES";

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            drain_reentrant_updates: false,
            max_flush_passes: 50,
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_reentrant_updates(mut self, enabled: bool) -> Self {
        self.drain_reentrant_updates = enabled;
        self
    }

    pub fn max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds options from a variable lookup; unparsable values keep the
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(raw) = lookup(DRAIN_REENTRANT_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => options.drain_reentrant_updates = true,
                "0" | "false" | "no" | "off" => options.drain_reentrant_updates = false,
                other => log::warn!("ignoring {DRAIN_REENTRANT_ENV}={other:?}"),
            }
        }
        if let Some(raw) = lookup(MAX_FLUSH_PASSES_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(passes) => options = options.max_flush_passes(passes),
                Err(err) => log::warn!("ignoring {MAX_FLUSH_PASSES_ENV}={raw:?}: {err}"),
            }
        }
        options
    }
}
