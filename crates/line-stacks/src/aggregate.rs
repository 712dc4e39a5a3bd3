//! Attribute based aggregation of features
//!
//! Features whose key attributes are all equal are merged into a single
//! [`AggregatedFeature`] that remembers how many inputs it stands for.

use crate::{Feature, Result, StackError, Value};
use std::collections::HashMap;

/// One feature per distinct combination of key attribute values
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedFeature {
    /// First-seen feature for this key, restricted to the key attributes
    pub feature: Feature,
    /// Number of input features merged into this one
    pub count: u64,
}

/// Hashable form of an attribute value, floats compared by bit pattern
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum KeyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl From<&Value> for KeyValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyValue::Null,
            Value::Bool(b) => KeyValue::Bool(*b),
            Value::Int(i) => KeyValue::Int(*i),
            // -0.0 and 0.0 are the same key
            Value::Float(f) if *f == 0.0 => KeyValue::Float(0.0f64.to_bits()),
            Value::Float(f) => KeyValue::Float(f.to_bits()),
            Value::String(s) => KeyValue::String(s.clone()),
        }
    }
}

type AggregationKey = Vec<KeyValue>;

/// Merges features sharing equal values for a list of key attributes
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    key_attributes: Vec<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FeatureAggregator {
    pub fn new(key_attributes: Vec<String>) -> Self {
        Self { key_attributes }
    }

    #[inline]
    pub fn key_attributes(&self) -> &[String] {
        &self.key_attributes
    }

    /// Aggregate the features in a single forward pass.
    ///
    /// The output keeps the order of first occurrence. Features with fewer than two points are
    /// skipped with a warning and do not contribute to any count.
    ///
    /// # Errors
    /// [`StackError::MissingAttribute`] if a feature lacks one of the key attributes.
    pub fn aggregate<I>(&self, features: I) -> Result<Vec<AggregatedFeature>>
    where
        I: IntoIterator<Item = Feature>,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("aggregate::aggregate");

        let mut index_by_key: HashMap<AggregationKey, usize> = HashMap::new();
        let mut aggregated: Vec<AggregatedFeature> = Vec::new();
        let mut skipped = 0usize;

        for feature in features {
            if !feature.has_valid_geometry() {
                tracing::warn!(
                    "Skipping feature {} with {} point(s), a line needs at least 2",
                    feature.id,
                    feature.geometry.0.len()
                );
                skipped += 1;
                continue;
            }

            let key = self.key_of(&feature)?;
            match index_by_key.get(&key) {
                Some(&index) => aggregated[index].count += 1,
                None => {
                    index_by_key.insert(key, aggregated.len());
                    aggregated.push(AggregatedFeature {
                        feature: self.restrict(feature),
                        count: 1,
                    });
                }
            }
        }

        tracing::debug!(
            "Aggregated into {} features ({} skipped)",
            aggregated.len(),
            skipped
        );
        Ok(aggregated)
    }

    fn key_of(&self, feature: &Feature) -> Result<AggregationKey> {
        self.key_attributes
            .iter()
            .map(|name| {
                feature
                    .attribute(name)
                    .map(KeyValue::from)
                    .ok_or_else(|| StackError::MissingAttribute {
                        feature: feature.id.clone(),
                        attribute: name.clone(),
                    })
            })
            .collect()
    }

    /// Drop every attribute that is not part of the key
    fn restrict(&self, mut feature: Feature) -> Feature {
        feature
            .attributes
            .retain(|name, _| self.key_attributes.contains(name));
        feature
    }
}
