//! Registry configuration.

/// Default tag key marking relation fields.
pub const DEFAULT_MODEL_TAG: &str = "model";

/// Settings fixed before the registry is sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdmConfig {
    /// Tag key whose fields are treated as relations during population.
    pub model_tag: String,
    /// When `true`, freshly materialized documents copy `found` and `queried` from the
    /// prototype, where both are `true`. When `false`, both start out `false`.
    pub inherit_prototype_flags: bool,
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            model_tag: DEFAULT_MODEL_TAG.to_string(),
            inherit_prototype_flags: true,
        }
    }
}
