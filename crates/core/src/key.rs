//! The per-(user, avatar-model) isolation unit (spec §3).

use std::fmt;

use crate::error::EngineError;

/// Identifies the pair of (user, avatar model) that every piece of
/// conversational and affective state is isolated by.
///
/// No record in the store may be read or written without presenting both
/// halves of this key — see [`InteractionKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionKey {
    user_id: String,
    model_id: String,
}

impl InteractionKey {
    /// Build a new key, rejecting either half being empty.
    ///
    /// A request missing either component fails with [`EngineError::InvalidKey`]
    /// rather than falling back to a default (spec §4.C isolation invariant).
    pub fn new(user_id: impl Into<String>, model_id: impl Into<String>) -> Result<Self, EngineError> {
        let user_id = user_id.into();
        let model_id = model_id.into();
        if user_id.trim().is_empty() || model_id.trim().is_empty() {
            return Err(EngineError::InvalidKey(
                "interaction key requires a non-empty user_id and model_id".to_string(),
            ));
        }
        Ok(Self { user_id, model_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl fmt::Display for InteractionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.user_id, self.model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_halves() {
        assert!(InteractionKey::new("", "model").is_err());
        assert!(InteractionKey::new("user", "").is_err());
        assert!(InteractionKey::new("  ", "model").is_err());
    }

    #[test]
    fn accepts_full_key() {
        let key = InteractionKey::new("u1", "m1").unwrap();
        assert_eq!(key.user_id(), "u1");
        assert_eq!(key.model_id(), "m1");
        assert_eq!(key.to_string(), "u1::m1");
    }

    #[test]
    fn distinct_models_are_distinct_keys() {
        let a = InteractionKey::new("u1", "m1").unwrap();
        let b = InteractionKey::new("u1", "m2").unwrap();
        assert_ne!(a, b);
    }
}
