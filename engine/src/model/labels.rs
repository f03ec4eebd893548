//! Label Encoder - class index <-> category name

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Fitted label mapping. Position in `classes` is the class index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let encoder = Self {
            classes: classes.into_iter().map(Into::into).collect(),
        };
        encoder.check()?;
        Ok(encoder)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Class name to index
    pub fn encode(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    /// Class index to name
    pub fn decode(&self, index: usize) -> Result<&str, ConfigurationError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(ConfigurationError::UnknownClassIndex {
                index,
                known: self.classes.len(),
            })
    }

    pub(crate) fn check(&self) -> Result<(), ConfigurationError> {
        if self.classes.is_empty() {
            return Err(ConfigurationError::InvalidOutput(
                "label encoder has no classes".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ConfigurationError::InvalidOutput(format!(
                "label encoder lists '{}' twice",
                duplicate
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> LabelEncoder {
        LabelEncoder::new(["BENIGN", "DDoS", "PortScan"]).unwrap()
    }

    #[test]
    fn test_round_trip_every_class() {
        let labels = encoder();
        for name in labels.classes() {
            let index = labels.encode(name).unwrap();
            assert_eq!(labels.decode(index).unwrap(), name);
        }
    }

    #[test]
    fn test_decode_index() {
        assert_eq!(encoder().decode(2).unwrap(), "PortScan");
    }

    #[test]
    fn test_unknown_index() {
        let err = encoder().decode(3).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownClassIndex { index: 3, known: 3 }));
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(encoder().encode("Heartbleed"), None);
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(LabelEncoder::new(["BENIGN", "DDoS", "BENIGN"]).is_err());
        assert!(LabelEncoder::new(Vec::<String>::new()).is_err());
    }
}
