//! Registry of constructed predictors
//!
//! Holds predictors in registration order and resolves them by name. Names
//! are expected to be unique; [`Registry::with_unique_names`] enforces that at
//! startup, and [`Registry::select`] still reports duplicates as
//! [`SelectionError::Ambiguous`] instead of picking one.

use crate::error::{RegistryError, SelectionError};
use crate::predictor::Predictor;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, immutable collection of predictors
#[derive(Debug, Clone, Default)]
pub struct Registry {
    predictors: Vec<Arc<Predictor>>,
}

impl Registry {
    /// Build a registry without checking names
    pub fn new(predictors: Vec<Predictor>) -> Self {
        Self {
            predictors: predictors.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build a registry, rejecting duplicate names
    pub fn with_unique_names(predictors: Vec<Predictor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for predictor in &predictors {
            if !seen.insert(predictor.name()) {
                return Err(RegistryError::DuplicateName(predictor.name().to_string()));
            }
        }
        Ok(Self::new(predictors))
    }

    /// Resolve a name to exactly one predictor
    pub fn select(&self, name: &str) -> Result<Arc<Predictor>, SelectionError> {
        let mut matches = self.predictors.iter().filter(|p| p.name() == name);
        let first = matches
            .next()
            .ok_or_else(|| SelectionError::NotFound(name.to_string()))?;

        let others = matches.count();
        if others > 0 {
            return Err(SelectionError::Ambiguous {
                name: name.to_string(),
                count: others + 1,
            });
        }
        Ok(Arc::clone(first))
    }

    /// Names of all registered predictors, in registration order
    pub fn list(&self) -> Vec<String> {
        self.predictors.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Predictor>> {
        self.predictors.iter()
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::testing::summer;

    #[test]
    fn test_select_single_match() {
        let registry = Registry::new(vec![summer("a").0, summer("b").0]);
        let selected = registry.select("b").unwrap();
        assert_eq!(selected.name(), "b");
    }

    #[test]
    fn test_select_not_found() {
        let registry = Registry::new(vec![summer("a").0]);
        assert_eq!(
            registry.select("c").unwrap_err(),
            SelectionError::NotFound("c".to_string())
        );
        assert!(Registry::default().select("a").is_err());
    }

    #[test]
    fn test_select_ambiguous() {
        let registry = Registry::new(vec![summer("a").0, summer("b").0, summer("a").0]);
        assert_eq!(
            registry.select("a").unwrap_err(),
            SelectionError::Ambiguous {
                name: "a".to_string(),
                count: 2
            }
        );
        // Other names still resolve
        assert!(registry.select("b").is_ok());
    }

    #[test]
    fn test_select_is_repeatable() {
        let registry = Registry::new(vec![summer("a").0]);
        let first = registry.select("a").unwrap();
        let second = registry.select("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_list_returns_registered_names() {
        let registry = Registry::new(vec![summer("x").0, summer("y").0, summer("z").0]);
        assert_eq!(registry.list(), vec!["x", "y", "z"]);
        assert_eq!(registry.len(), 3);
        assert!(Registry::default().list().is_empty());
        assert!(Registry::default().is_empty());
    }

    #[test]
    fn test_unique_names_enforced_eagerly() {
        let err = Registry::with_unique_names(vec![summer("a").0, summer("a").0]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("a".to_string()));

        let registry = Registry::with_unique_names(vec![summer("a").0, summer("b").0]).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
