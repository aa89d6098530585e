//! Component signatures.
//!
//! A [`Signature`] is a bitset over [`ComponentTypeId`]s: bit `k` of chunk
//! `k / 32` is set iff component `k` is a member. It is the identity of an
//! archetype and the building block of query matching.
//!
//! Trailing all-zero chunks carry no meaning. Two signatures with different
//! chunk counts but the same set bits are equal and hash identically, and
//! every binary operation treats the shorter operand as zero-padded.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::component::ComponentTypeId;

const CHUNK_BITS: usize = u32::BITS as usize;

/// A set of component type ids.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    chunks: Vec<u32>,
}

impl Signature {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Build a signature from any collection of ids. Order and duplicates do
    /// not matter.
    #[must_use]
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ComponentTypeId>,
    {
        let mut signature = Self::empty();
        for id in ids {
            signature.insert(id);
        }
        signature
    }

    /// Add `id` to the set.
    pub fn insert(&mut self, id: ComponentTypeId) {
        let (chunk, bit) = Self::position(id);
        if chunk >= self.chunks.len() {
            self.chunks.resize(chunk + 1, 0);
        }
        self.chunks[chunk] |= bit;
    }

    /// Remove `id` from the set. Returns `true` if it was present.
    pub fn remove(&mut self, id: ComponentTypeId) -> bool {
        let (chunk, bit) = Self::position(id);
        match self.chunks.get_mut(chunk) {
            Some(bits) if *bits & bit != 0 => {
                *bits &= !bit;
                self.trim();
                true
            }
            _ => false,
        }
    }

    /// Returns a copy with `id` added.
    #[must_use]
    pub fn with(&self, id: ComponentTypeId) -> Self {
        let mut signature = self.clone();
        signature.insert(id);
        signature
    }

    /// Returns a copy with `id` removed.
    #[must_use]
    pub fn without(&self, id: ComponentTypeId) -> Self {
        let mut signature = self.clone();
        signature.remove(id);
        signature
    }

    /// Returns `true` if `id` is a member.
    #[must_use]
    pub fn has(&self, id: ComponentTypeId) -> bool {
        let (chunk, bit) = Self::position(id);
        self.chunk(chunk) & bit != 0
    }

    /// Returns `true` if every id in `required` is also in `self`.
    ///
    /// This is the "archetype has at least these components" test.
    #[must_use]
    pub fn contains(&self, required: &Signature) -> bool {
        required
            .chunks
            .iter()
            .enumerate()
            .all(|(index, &bits)| self.chunk(index) & bits == bits)
    }

    /// Returns `true` if at least one id is in both sets.
    ///
    /// This is the "archetype has an excluded component" test.
    #[must_use]
    pub fn overlaps(&self, other: &Signature) -> bool {
        self.chunks
            .iter()
            .zip(&other.chunks)
            .any(|(a, b)| a & b != 0)
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Signature) -> Self {
        let len = self.chunks.len().max(other.chunks.len());
        let chunks = (0..len)
            .map(|index| self.chunk(index) | other.chunk(index))
            .collect();
        Self { chunks }
    }

    /// Number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|bits| bits.count_ones() as usize).sum()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|&bits| bits == 0)
    }

    /// Iterate the member ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.chunks.iter().enumerate().flat_map(|(index, &bits)| {
            (0..CHUNK_BITS)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| ComponentTypeId((index * CHUNK_BITS + bit) as u32))
        })
    }

    /// The canonical chunk representation, trailing zero chunks trimmed.
    #[must_use]
    pub fn chunks(&self) -> &[u32] {
        let end = self
            .chunks
            .iter()
            .rposition(|&bits| bits != 0)
            .map_or(0, |last| last + 1);
        &self.chunks[..end]
    }

    fn chunk(&self, index: usize) -> u32 {
        self.chunks.get(index).copied().unwrap_or(0)
    }

    fn trim(&mut self) {
        let len = self.chunks().len();
        self.chunks.truncate(len);
    }

    fn position(id: ComponentTypeId) -> (usize, u32) {
        (id.index() / CHUNK_BITS, 1 << (id.index() % CHUNK_BITS))
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.chunks() == other.chunks()
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chunks().hash(state);
    }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signature")?;
        f.debug_set().entries(self.ids().map(|id| id.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn sig(ids: &[u32]) -> Signature {
        ids.iter().map(|&id| ComponentTypeId(id)).collect()
    }

    fn hash_of(signature: &Signature) -> u64 {
        let mut hasher = DefaultHasher::new();
        signature.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equal_regardless_of_insertion_order() {
        assert_eq!(sig(&[3, 1, 40]), sig(&[40, 3, 1]));
        assert_eq!(sig(&[5, 5, 5]), sig(&[5]));
    }

    #[test]
    fn test_trailing_zero_chunks_are_insignificant() {
        let short = sig(&[2]);
        let mut long = sig(&[2, 70]);
        assert!(long.remove(ComponentTypeId(70)));

        let padded = Signature {
            chunks: vec![1 << 2, 0, 0],
        };
        assert_eq!(short, padded);
        assert_eq!(short, long);
        assert_eq!(hash_of(&short), hash_of(&padded));
        assert_eq!(padded.chunks(), &[1 << 2]);
    }

    #[test]
    fn test_contains_subset() {
        let small = sig(&[1, 33]);
        let large = sig(&[1, 2, 33, 64]);
        assert!(large.contains(&small));
        assert!(!small.contains(&large));
        assert!(large.contains(&Signature::empty()));
        assert!(Signature::empty().contains(&Signature::empty()));
    }

    #[test]
    fn test_contains_across_chunk_lengths() {
        let required = sig(&[100]);
        let candidate = sig(&[1]);
        assert!(!candidate.contains(&required));
        assert!(required.contains(&Signature { chunks: vec![0, 0, 0, 0, 0] }));
    }

    #[test]
    fn test_overlaps_matches_intersection() {
        assert!(sig(&[1, 2]).overlaps(&sig(&[2, 3])));
        assert!(!sig(&[1, 2]).overlaps(&sig(&[3, 64])));
        assert!(!sig(&[1]).overlaps(&Signature::empty()));
        assert!(sig(&[64]).overlaps(&sig(&[0, 64])));
    }

    #[test]
    fn test_set_algebra_over_many_sets() {
        let sets: [&[u32]; 5] = [&[], &[0], &[1, 31], &[31, 32, 95], &[0, 1, 2, 3, 200]];
        for a in sets {
            for b in sets {
                let sa = sig(a);
                let sb = sig(b);
                let union = sa.union(&sb);
                assert!(union.contains(&sa));
                assert_eq!(union, sig(&[a, b].concat()));
                let intersects = a.iter().any(|id| b.contains(id));
                assert_eq!(sa.overlaps(&sb), intersects, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_with_and_without() {
        let base = sig(&[1]);
        let grown = base.with(ComponentTypeId(9));
        assert!(grown.has(ComponentTypeId(9)));
        assert!(!base.has(ComponentTypeId(9)));
        assert_eq!(grown.without(ComponentTypeId(9)), base);
        assert!(base.without(ComponentTypeId(1)).is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut signature = sig(&[1]);
        assert!(!signature.remove(ComponentTypeId(300)));
        assert!(!signature.remove(ComponentTypeId(2)));
        assert_eq!(signature, sig(&[1]));
    }

    #[test]
    fn test_ids_ascending_and_len() {
        let signature = sig(&[64, 3, 31, 32]);
        let ids: Vec<u32> = signature.ids().map(|id| id.0).collect();
        assert_eq!(ids, vec![3, 31, 32, 64]);
        assert_eq!(signature.len(), 4);
    }

    #[test]
    fn test_debug_lists_ids() {
        assert_eq!(format!("{:?}", sig(&[2, 0])), "Signature{0, 2}");
    }

    #[test]
    fn test_serde_roundtrip_preserves_equality() {
        let signature = sig(&[1, 45]);
        let json = serde_json::to_string(&signature).unwrap();
        let restored: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(signature, restored);
    }
}
