use super::encoding::{EncodedFeatures, MISSING_CATEGORY};
use super::schema::FeatureSchema;

/// Single-row input in exactly the column order the model declared.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatures {
    names: Vec<String>,
    values: Vec<f64>,
    filled: Vec<String>,
}

impl AlignedFeatures {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|name| name == feature)
            .map(|index| self.values[index])
    }

    /// Features that were absent upstream and received a default.
    pub fn filled(&self) -> &[String] {
        &self.filled
    }
}

/// Reshape the encoded record onto the model's declared feature list.
///
/// Missing categorical features take the code of the `missing` token (or the
/// vocabulary fallback when the token is unknown); missing numeric features
/// take 0.0. Encoded features the model does not declare are dropped.
pub fn align_features(
    encoded: &EncodedFeatures,
    expected: &[String],
    schema: &FeatureSchema,
) -> AlignedFeatures {
    let mut values = Vec::with_capacity(expected.len());
    let mut filled = Vec::new();

    for feature in expected {
        let value = match encoded.values.get(feature) {
            Some(value) => value.as_f64(),
            None => {
                filled.push(feature.clone());
                match schema.vocabulary(feature) {
                    Some(vocabulary) => f64::from(vocabulary.encode(MISSING_CATEGORY).code),
                    None => 0.0,
                }
            }
        };
        values.push(value);
    }

    AlignedFeatures {
        names: expected.to_vec(),
        values,
        filled,
    }
}
