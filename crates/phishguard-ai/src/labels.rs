//! Class names for classifier output columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Fitted label encoder: column index → class name.
///
/// The order is whatever the training run produced and is the order of every
/// probability distribution the classifier returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label encoder has no classes".into());
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if class.is_empty() {
                return Err("label encoder contains an empty class name".into());
            }
            if !seen.insert(class.as_str()) {
                return Err(format!("class {class:?} appears more than once"));
            }
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class name for an output column.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Output column for a class name.
    pub fn encode(&self, class: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == class)
    }
}
