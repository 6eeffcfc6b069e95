use std::collections::{BTreeMap, BTreeSet};

use super::encoding::{CategoryVocabulary, EncodingError};

/// Numeric/categorical split of the model inputs plus the per-feature
/// vocabularies. Immutable once the model is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    numeric: BTreeSet<String>,
    vocabularies: BTreeMap<String, CategoryVocabulary>,
}

impl FeatureSchema {
    pub fn new(
        numeric: BTreeSet<String>,
        vocabularies: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, EncodingError> {
        let vocabularies = vocabularies
            .into_iter()
            .map(|(feature, labels)| {
                CategoryVocabulary::new(&feature, labels).map(|vocabulary| (feature, vocabulary))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            numeric,
            vocabularies,
        })
    }

    /// Build from explicit numeric and categorical lists, requiring a
    /// vocabulary for every categorical feature.
    pub fn with_categorical(
        numeric: BTreeSet<String>,
        categorical: &[String],
        mut vocabularies: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, EncodingError> {
        let mut selected = BTreeMap::new();
        for feature in categorical {
            let labels = vocabularies
                .remove(feature)
                .ok_or_else(|| EncodingError::MissingVocabulary {
                    feature: feature.clone(),
                })?;
            selected.insert(feature.clone(), labels);
        }
        Self::new(numeric, selected)
    }

    pub fn numeric_features(&self) -> &BTreeSet<String> {
        &self.numeric
    }

    pub fn is_numeric(&self, feature: &str) -> bool {
        self.numeric.contains(feature)
    }

    pub fn is_categorical(&self, feature: &str) -> bool {
        self.vocabularies.contains_key(feature)
    }

    pub fn vocabulary(&self, feature: &str) -> Option<&CategoryVocabulary> {
        self.vocabularies.get(feature)
    }

    pub fn vocabularies(&self) -> impl Iterator<Item = (&str, &CategoryVocabulary)> {
        self.vocabularies
            .iter()
            .map(|(feature, vocabulary)| (feature.as_str(), vocabulary))
    }
}
