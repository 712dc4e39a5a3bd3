//! Grouping of aggregated features into stacks and ordering within a stack

use crate::{AggregatedFeature, GeometryHasher, Result, StackError, Value};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Aggregated features sharing one geometry hash, drawn side by side along one path
#[derive(Clone, Debug, PartialEq)]
pub struct Stack {
    pub hash: u64,
    pub members: Vec<AggregatedFeature>,
}

impl Stack {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Group aggregated features by the hash of their geometry.
///
/// Hashes are computed in parallel; grouping is sequential so every stack keeps the arrival
/// order of its members. Stacks are returned in order of their first member.
pub fn build_stacks(aggregated: Vec<AggregatedFeature>) -> Vec<Stack> {
    #[cfg(feature = "profiling")]
    profiling::scope!("stack::build_stacks");

    let hasher = GeometryHasher::new();
    let hashes: Vec<u64> = aggregated
        .par_iter()
        .map(|a| hasher.hash(&a.feature))
        .collect();

    let mut index_by_hash: HashMap<u64, usize> = HashMap::new();
    let mut stacks: Vec<Stack> = Vec::new();
    for (hash, member) in hashes.into_iter().zip(aggregated) {
        let index = *index_by_hash.entry(hash).or_insert_with(|| {
            stacks.push(Stack {
                hash,
                members: Vec::new(),
            });
            stacks.len() - 1
        });
        stacks[index].members.push(member);
    }
    stacks
}

/// Orders stack members ascending by an optional integer attribute
#[derive(Debug, Clone, Default)]
pub struct OrderComparator {
    attribute: Option<String>,
}

impl OrderComparator {
    /// `None` or an empty name disables ordering
    pub fn new(attribute: Option<String>) -> Self {
        Self {
            attribute: attribute.filter(|name| !name.is_empty()),
        }
    }

    #[inline]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Integer sort key of a member, `None` when no order attribute is configured.
    ///
    /// # Errors
    /// [`StackError::InvalidOrderValue`] when the value is missing, null or not an integer.
    pub fn order_key(&self, member: &AggregatedFeature) -> Result<Option<i64>> {
        let Some(name) = &self.attribute else {
            return Ok(None);
        };
        let value = member.feature.attribute(name).unwrap_or(&Value::Null);
        parse_order_value(value)
            .map(Some)
            .ok_or_else(|| StackError::InvalidOrderValue {
                feature: member.feature.id.clone(),
                attribute: name.clone(),
                value: value.to_string(),
            })
    }

    /// Compare two members; all members compare equal when ordering is disabled
    pub fn compare(&self, a: &AggregatedFeature, b: &AggregatedFeature) -> Result<Ordering> {
        Ok(self.order_key(a)?.cmp(&self.order_key(b)?))
    }

    /// Stable sort of the stack members, keeping arrival order for ties
    pub fn sort(&self, stack: &mut Stack) -> Result<()> {
        if self.attribute.is_none() {
            return Ok(());
        }
        let keys = stack
            .members
            .iter()
            .map(|m| self.order_key(m))
            .collect::<Result<Vec<_>>>()?;

        let mut keyed: Vec<(Option<i64>, AggregatedFeature)> =
            keys.into_iter().zip(stack.members.drain(..)).collect();
        keyed.sort_by_key(|(key, _)| *key);
        stack.members.extend(keyed.into_iter().map(|(_, member)| member));
        Ok(())
    }
}

fn parse_order_value(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
