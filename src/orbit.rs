// SPDX-License-Identifier: Apache-2.0

//! Input-permutation orbits of 8-input base functions.
//!
//! The orbit of a base function `b` is the set `{ apply_perm(b, p) }` over all
//! 8! wire permutations `p`. It is closed under relabeling (applying any
//! permutation to a member yields another member), so a single sweep over all
//! permutations of the base is the whole closure; no fixed-point iteration is
//! needed.
//!
//! Many permutations collapse onto the same table when the base has
//! interchangeable inputs, so orbits are usually far smaller than 40320.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::perm8::{all_perms8, AddressMap, Perm8};
use crate::tt256::TruthTable256;

/// Membership queries against an orbit, as used by the LUT matcher.
pub trait OrbitLookup {
    /// Returns the permutation witnessing that `tt` is in the orbit, or
    /// `None` if it is not a member.
    fn lookup(&self, tt: &TruthTable256) -> Option<Perm8>;
}

/// A deduplicated orbit: each member table maps to the lexicographically
/// first permutation that produces it from the base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrbitSet {
    members: HashMap<TruthTable256, Perm8>,
}

impl OrbitSet {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, tt: &TruthTable256) -> bool {
        self.members.contains_key(tt)
    }

    /// The permutation `p` with `apply_perm(base, p) == *tt`, if `tt` is a
    /// member.
    pub fn witness(&self, tt: &TruthTable256) -> Option<Perm8> {
        self.members.get(tt).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TruthTable256, &Perm8)> {
        self.members.iter()
    }

    /// Members in ascending numeric order.
    pub fn sorted_tables(&self) -> Vec<TruthTable256> {
        let mut v: Vec<TruthTable256> = self.members.keys().copied().collect();
        v.sort();
        v
    }
}

impl OrbitLookup for OrbitSet {
    fn lookup(&self, tt: &TruthTable256) -> Option<Perm8> {
        self.witness(tt)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitOptions {
    /// Number of permutations handled by one parallel task.
    pub parallel_chunk_size: usize,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            parallel_chunk_size: 2520,
        }
    }
}

/// Computes the permutation orbit of `base` with default options.
pub fn compute_orbit(base: &TruthTable256) -> OrbitSet {
    compute_orbit_with_options(base, OrbitOptions::default())
}

/// Computes the permutation orbit of `base`.
///
/// Permutations are split into chunks that are swept in parallel, each into a
/// thread-local map; the chunk maps are merged in ascending chunk order so the
/// recorded witness for every member does not depend on scheduling.
pub fn compute_orbit_with_options(base: &TruthTable256, options: OrbitOptions) -> OrbitSet {
    let perms = all_perms8();
    let chunk_size = core::cmp::max(1, options.parallel_chunk_size);

    let mut chunk_results: Vec<(usize, HashMap<TruthTable256, Perm8>)> = perms
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let mut local: HashMap<TruthTable256, Perm8> = HashMap::new();
            for &perm in chunk {
                let tt = AddressMap::for_perm(perm).gather(base);
                local.entry(tt).or_insert(perm);
            }
            (chunk_idx, local)
        })
        .collect();
    chunk_results.sort_by_key(|(chunk_idx, _)| *chunk_idx);

    let mut members: HashMap<TruthTable256, Perm8> = HashMap::new();
    for (_chunk_idx, local) in chunk_results {
        for (tt, perm) in local {
            members
                .entry(tt)
                .and_modify(|existing| {
                    if perm < *existing {
                        *existing = perm;
                    }
                })
                .or_insert(perm);
        }
    }

    log::debug!(
        "compute_orbit: base=0x{} permutations={} distinct={}",
        base.to_hex(),
        perms.len(),
        members.len()
    );
    OrbitSet { members }
}
