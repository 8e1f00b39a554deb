/// Input rejected at the request boundary, before any data access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be {expected}, got {value:?}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ValidationError {
    pub fn invalid(field: &'static str, expected: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            expected,
            value: value.into(),
        }
    }
}
