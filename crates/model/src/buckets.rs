//! Variable buckets: the `variables` field of process-instance and task documents.
//!
//! Variables are partitioned by type. Within a type bucket a variable is
//! identified by its name alone, so a bucket is keyed by name in memory while
//! still being persisted as a flat array of variables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::variable::Variable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    /// No bucket for the type, or the bucket holds no variables.
    #[error("no variables of type {variable_type}")]
    EmptyBucket { variable_type: String },

    /// The bucket exists but has no variable with that name.
    #[error("no variable named {name} of type {variable_type}")]
    VariableNotFound { variable_type: String, name: String },
}

/// All variables of one type on a document, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Variable>", into = "Vec<Variable>")]
pub struct VariableBucket {
    entries: BTreeMap<String, Variable>,
}

impl VariableBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }

    /// Insert `variable`, replacing any entry with the same name.
    ///
    /// Returns the replaced entry. Only the name is compared; the replaced
    /// entry may differ in every other field.
    pub fn upsert(&mut self, variable: Variable) -> Option<Variable> {
        self.entries.insert(variable.name.clone(), variable)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.entries.get_mut(name)
    }
}

impl From<Vec<Variable>> for VariableBucket {
    fn from(variables: Vec<Variable>) -> Self {
        let mut bucket = Self::new();
        for variable in variables {
            bucket.upsert(variable);
        }
        bucket
    }
}

impl From<VariableBucket> for Vec<Variable> {
    fn from(bucket: VariableBucket) -> Self {
        bucket.entries.into_values().collect()
    }
}

/// Variables of a document, partitioned by type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableBuckets(BTreeMap<String, VariableBucket>);

/// A type mapped to `null` reads back as an absent bucket.
impl<'de> Deserialize<'de> for VariableBuckets {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = BTreeMap::<String, Option<VariableBucket>>::deserialize(deserializer)?;
        Ok(Self(
            stored
                .into_iter()
                .filter_map(|(variable_type, bucket)| Some((variable_type, bucket?)))
                .collect(),
        ))
    }
}

impl VariableBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bucket(&self, variable_type: &str) -> Option<&VariableBucket> {
        self.0.get(variable_type)
    }

    /// Bucket for `variable_type`, created empty if the document has none yet.
    pub fn ensure_bucket(&mut self, variable_type: &str) -> &mut VariableBucket {
        self.0.entry(variable_type.to_string()).or_default()
    }

    /// Bucket for `variable_type`, failing when it is absent or empty.
    pub fn live_bucket_mut(
        &mut self,
        variable_type: &str,
    ) -> Result<&mut VariableBucket, BucketError> {
        match self.0.get_mut(variable_type) {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(BucketError::EmptyBucket {
                variable_type: variable_type.to_string(),
            }),
        }
    }

    /// Insert into the variable's type bucket, replacing by name.
    pub fn upsert(&mut self, variable: Variable) -> Option<Variable> {
        let bucket = self.ensure_bucket(&variable.variable_type);
        bucket.upsert(variable)
    }

    pub fn find(&self, variable_type: &str, name: &str) -> Option<&Variable> {
        self.bucket(variable_type)?.find_by_name(name)
    }

    /// Overwrite value and last-updated time of an existing variable in place.
    pub fn update_value(
        &mut self,
        variable_type: &str,
        name: &str,
        value: JsonValue,
        last_updated_time: Option<DateTime<Utc>>,
    ) -> Result<&Variable, BucketError> {
        let variable = self
            .live_bucket_mut(variable_type)?
            .find_by_name_mut(name)
            .ok_or_else(|| BucketError::VariableNotFound {
                variable_type: variable_type.to_string(),
                name: name.to_string(),
            })?;
        variable.value = value;
        variable.last_updated_time = last_updated_time;
        Ok(variable)
    }

    /// Soft-delete: flag the named variable, never remove it.
    pub fn mark_deleted(&mut self, variable_type: &str, name: &str) -> Result<(), BucketError> {
        let variable = self
            .live_bucket_mut(variable_type)?
            .find_by_name_mut(name)
            .ok_or_else(|| BucketError::VariableNotFound {
                variable_type: variable_type.to_string(),
                name: name.to_string(),
            })?;
        variable.marked_as_deleted = true;
        Ok(())
    }
}

/// Treat an explicit `null` the same as a missing `variables` field.
pub(crate) fn nullable<'de, D>(deserializer: D) -> Result<VariableBuckets, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<VariableBuckets>::deserialize(deserializer).map(Option::unwrap_or_default)
}
