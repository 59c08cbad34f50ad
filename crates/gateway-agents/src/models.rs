//! Public model id to backend flag translation.

/// Static mapping from public model ids to backend model flags
#[derive(Debug, Clone, Copy)]
pub struct ModelTable {
    entries: &'static [(&'static str, &'static str)],
}

impl ModelTable {
    /// Create a table from `(public id, backend flag)` pairs
    #[must_use]
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Backend flag for `model`; unmapped ids pass through unchanged
    #[must_use]
    pub fn translate<'a>(&self, model: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(public, _)| *public == model)
            .map_or(model, |(_, flag)| *flag)
    }

    /// Whether `model` has an explicit mapping
    #[must_use]
    pub fn contains(&self, model: &str) -> bool {
        self.entries.iter().any(|(public, _)| *public == model)
    }
}
