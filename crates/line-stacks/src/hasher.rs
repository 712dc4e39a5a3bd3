//! Deterministic feature hashing used to find lines sharing the same path
//!
//! The hash is a polynomial fold over the bit patterns of the coordinates, so it is stable
//! across calls and processes and sensitive to the order of the points: a reversed line is
//! a different line.

use crate::{Feature, Value};
use geo::Coord;

const HASH_SEED: u64 = 17;
const HASH_PRIME: u64 = 1_099_511_628_211;

/// Hashes the geometry of a feature and, optionally, some of its attributes
#[derive(Debug, Clone, Default)]
pub struct GeometryHasher {
    /// Attribute names folded into the hash after the geometry, kept sorted
    attributes: Vec<String>,
}

impl GeometryHasher {
    /// Hasher looking at the geometry only (used for stacking)
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher including the values of the given attributes
    pub fn with_attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut attributes: Vec<String> = names.into_iter().map(Into::into).collect();
        attributes.sort();
        attributes.dedup();
        Self { attributes }
    }

    /// Compute the hash of a feature
    pub fn hash(&self, feature: &Feature) -> u64 {
        let mut hash = HASH_SEED;
        hash = fold(hash, feature.geometry.0.len() as u64);
        for coord in &feature.geometry.0 {
            hash = fold_coord(hash, coord);
        }
        for name in &self.attributes {
            hash = fold_bytes(hash, name.as_bytes());
            hash = fold_value(hash, feature.attribute(name).unwrap_or(&Value::Null));
        }
        hash
    }
}

#[inline(always)]
fn fold(hash: u64, word: u64) -> u64 {
    (hash ^ word).wrapping_mul(HASH_PRIME).rotate_left(31)
}

/// Stable bit pattern of a coordinate value, with `-0.0` folded onto `0.0`
#[inline(always)]
fn coord_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

#[inline(always)]
fn fold_coord(hash: u64, coord: &Coord<f64>) -> u64 {
    fold(fold(hash, coord_bits(coord.x)), coord_bits(coord.y))
}

fn fold_bytes(hash: u64, bytes: &[u8]) -> u64 {
    let hash = fold(hash, bytes.len() as u64);
    bytes
        .chunks(8)
        .fold(hash, |h, chunk| {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            fold(h, u64::from_le_bytes(word))
        })
}

fn fold_value(hash: u64, value: &Value) -> u64 {
    match value {
        Value::Null => fold(hash, 0),
        Value::Bool(b) => fold(fold(hash, 1), *b as u64),
        Value::Int(i) => fold(fold(hash, 2), *i as u64),
        Value::Float(f) => fold(fold(hash, 3), coord_bits(*f)),
        Value::String(s) => fold_bytes(fold(hash, 4), s.as_bytes()),
    }
}
