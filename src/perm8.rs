// SPDX-License-Identifier: Apache-2.0

//! Wire permutations and input placements over the 8-wire address space.
//!
//! Both the orbit generator and the LUT matcher rebuild a 256-entry truth
//! table by reading every output address from some source address. The
//! source address is a pure function of the destination address, so we
//! precompute it once per permutation/placement as an [`AddressMap`] and keep
//! the 256-address inner loop free of per-wire work.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::tt256::{TruthTable256, NUM_ADDRS, NUM_WIRES};

/// An 8-element permutation expressed as an array of wire indices.
///
/// Semantics: `perm[q]` is the original wire index (0..=7) that new wire `q`
/// drives. Transforming a function `f` into `f'` reads, for a new address
/// `y`, the original address `x` with `x[perm[q]] = y[q]` for every `q`, and
/// sets `f'(y) = f(x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Perm8(pub [u8; 8]);

impl Perm8 {
    pub const fn identity() -> Self {
        Self([0, 1, 2, 3, 4, 5, 6, 7])
    }

    /// Builds a permutation from a slice, checking it is a bijection on
    /// {0..7}.
    pub fn from_slice(wires: &[u8]) -> Result<Self, String> {
        if wires.len() != NUM_WIRES {
            return Err(format!(
                "permutation must have {NUM_WIRES} entries; got {}",
                wires.len()
            ));
        }
        let mut seen = 0u8;
        let mut out = [0u8; 8];
        for (q, &w) in wires.iter().enumerate() {
            if w as usize >= NUM_WIRES || seen & (1 << w) != 0 {
                return Err(format!("not a permutation of 0..8: {wires:?}"));
            }
            seen |= 1 << w;
            out[q] = w;
        }
        Ok(Self(out))
    }

    /// Returns `inv` with `inv[perm[q]] == q` for every `q`.
    pub fn inverse(self) -> Self {
        let mut inv = [0u8; 8];
        for (q, &p) in self.0.iter().enumerate() {
            inv[p as usize] = q as u8;
        }
        Self(inv)
    }
}

/// All 8! permutations in lexicographic order; the identity comes first.
pub fn all_perms8() -> Vec<Perm8> {
    (0u8..NUM_WIRES as u8)
        .permutations(NUM_WIRES)
        .map(|v| {
            let mut a = [0u8; 8];
            a.copy_from_slice(&v);
            Perm8(a)
        })
        .collect()
}

/// Applies `perm` to `tt` per the semantics documented on [`Perm8`].
pub fn apply_perm(tt: &TruthTable256, perm: Perm8) -> TruthTable256 {
    AddressMap::for_perm(perm).gather(tt)
}

/// An ordered, injective placement of `k` candidate inputs onto wire
/// positions: candidate input `i` is read from wire `wires()[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct Placement {
    wires: [u8; 8],
    len: u8,
}

impl Placement {
    /// The placement of `k` inputs onto wires `0..k` in order.
    pub fn identity(k: usize) -> Self {
        assert!(k <= NUM_WIRES, "placement of {k} inputs onto 8 wires");
        Self {
            wires: [0, 1, 2, 3, 4, 5, 6, 7],
            len: k as u8,
        }
    }

    pub fn new(wires: &[u8]) -> Result<Self, String> {
        if wires.len() > NUM_WIRES {
            return Err(format!(
                "placement of {} inputs exceeds {NUM_WIRES} wires",
                wires.len()
            ));
        }
        let mut seen = 0u8;
        for &w in wires {
            if w as usize >= NUM_WIRES || seen & (1 << w) != 0 {
                return Err(format!("placement is not injective into 0..8: {wires:?}"));
            }
            seen |= 1 << w;
        }
        Ok(Self::from_wires_unchecked(wires))
    }

    fn from_wires_unchecked(wires: &[u8]) -> Self {
        let mut out = [0u8; 8];
        out[..wires.len()].copy_from_slice(wires);
        Self {
            wires: out,
            len: wires.len() as u8,
        }
    }

    #[inline]
    pub fn wires(&self) -> &[u8] {
        &self.wires[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the candidate input placed on `wire`, if any.
    pub fn input_on_wire(&self, wire: u8) -> Option<usize> {
        self.wires().iter().position(|&w| w == wire)
    }
}

impl From<Placement> for Vec<u8> {
    fn from(p: Placement) -> Self {
        p.wires().to_vec()
    }
}

impl TryFrom<Vec<u8>> for Placement {
    type Error = String;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        Placement::new(&v)
    }
}

/// Number of ordered placements of `k` inputs onto 8 wires: `8!/(8-k)!`.
pub fn placement_count(k: usize) -> usize {
    assert!(k <= NUM_WIRES);
    ((NUM_WIRES - k + 1)..=NUM_WIRES).product()
}

/// All placements of `k` inputs in lexicographic order of their wire lists.
/// For `k == 8` these are exactly the 8! permutations.
pub fn placements(k: usize) -> impl Iterator<Item = Placement> {
    assert!(k <= NUM_WIRES, "placements of {k} inputs onto 8 wires");
    (0u8..NUM_WIRES as u8)
        .permutations(k)
        .map(|v| Placement::from_wires_unchecked(&v))
}

/// For every destination address, the source address to read from.
///
/// Built from per-wire contributions: when destination wire `q` is 1 it ORs
/// `contrib[q]` into the source address. Each entry is derived from the entry
/// with its lowest set bit cleared, so construction costs one OR per address.
#[derive(Clone)]
pub struct AddressMap([u8; NUM_ADDRS]);

impl AddressMap {
    pub fn from_wire_contributions(contrib: [u8; 8]) -> Self {
        let mut map = [0u8; NUM_ADDRS];
        for addr in 1..NUM_ADDRS {
            let low = addr.trailing_zeros() as usize;
            map[addr] = map[addr & (addr - 1)] | contrib[low];
        }
        Self(map)
    }

    /// Destination wire `q` carries original wire `perm[q]`.
    pub fn for_perm(perm: Perm8) -> Self {
        let mut contrib = [0u8; 8];
        for (q, &p) in perm.0.iter().enumerate() {
            contrib[q] = 1 << p;
        }
        Self::from_wire_contributions(contrib)
    }

    /// Destination wire `placement[i]` carries bit `i` of the narrow index;
    /// unplaced wires contribute nothing.
    pub fn for_placement(placement: &Placement) -> Self {
        let mut contrib = [0u8; 8];
        for (i, &w) in placement.wires().iter().enumerate() {
            contrib[w as usize] = 1 << i;
        }
        Self::from_wire_contributions(contrib)
    }

    #[inline]
    pub fn source(&self, addr: u8) -> u8 {
        self.0[addr as usize]
    }

    /// Builds `out` with `out[addr] = src[self.source(addr)]`.
    #[inline]
    pub fn gather(&self, src: &TruthTable256) -> TruthTable256 {
        let mut out = [0u64; 4];
        for (addr, &from) in self.0.iter().enumerate() {
            let from = from as usize;
            let bit = (src.0[from >> 6] >> (from & 63)) & 1;
            out[addr >> 6] |= bit << (addr & 63);
        }
        TruthTable256(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_all_perms8_is_lexicographic_and_complete() {
        let perms = all_perms8();
        assert_eq!(perms.len(), 40320);
        assert_eq!(perms[0], Perm8::identity());
        assert_eq!(perms[1], Perm8([0, 1, 2, 3, 4, 5, 7, 6]));
        assert_eq!(perms[perms.len() - 1], Perm8([7, 6, 5, 4, 3, 2, 1, 0]));
        assert!(perms.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_inverse_round_trip() {
        let p = Perm8([3, 0, 7, 1, 6, 2, 5, 4]);
        let inv = p.inverse();
        for q in 0..8 {
            assert_eq!(inv.0[p.0[q] as usize] as usize, q);
        }
        assert_eq!(inv.inverse(), p);

        let tt = TruthTable256::var(0)
            .and(TruthTable256::var(3))
            .or(TruthTable256::var(7).not());
        assert_eq!(apply_perm(&apply_perm(&tt, p), inv), tt);
    }

    #[test]
    fn test_perm_address_map_matches_bitwise_definition() {
        // Source address bit j is the destination address bit at inv[j].
        let p = Perm8([5, 2, 0, 7, 1, 3, 6, 4]);
        let inv = p.inverse();
        let map = AddressMap::for_perm(p);
        for new_addr in 0..=255u8 {
            let mut old_addr = 0u8;
            for j in 0..8 {
                let bit = (new_addr >> inv.0[j]) & 1;
                old_addr |= bit << j;
            }
            assert_eq!(map.source(new_addr), old_addr, "new_addr={new_addr}");
        }
    }

    #[test]
    fn test_apply_perm_moves_projection() {
        // New wire q drives original wire perm[q], so the projection onto
        // original wire 2 becomes the projection onto new wire 5 when
        // perm[5] == 2.
        let p = Perm8([1, 0, 3, 4, 5, 2, 7, 6]);
        assert_eq!(apply_perm(&TruthTable256::var(2), p), TruthTable256::var(5));
        assert_eq!(apply_perm(&TruthTable256::var(0), p), TruthTable256::var(1));
    }

    #[test]
    fn test_placement_address_map_uses_only_placed_bits() {
        let placement = Placement::new(&[6, 1, 4]).unwrap();
        let map = AddressMap::for_placement(&placement);
        for addr in 0..=255u8 {
            let expected = ((addr >> 6) & 1) | (((addr >> 1) & 1) << 1) | (((addr >> 4) & 1) << 2);
            assert_eq!(map.source(addr), expected);
        }
    }

    #[test_case(0, 1)]
    #[test_case(1, 8)]
    #[test_case(2, 56)]
    #[test_case(3, 336)]
    #[test_case(4, 1680)]
    #[test_case(5, 6720)]
    #[test_case(6, 20160)]
    #[test_case(7, 40320)]
    #[test_case(8, 40320)]
    fn test_placement_counts(k: usize, expected: usize) {
        assert_eq!(placement_count(k), expected);
        assert_eq!(placements(k).count(), expected);
    }

    #[test]
    fn test_placements_are_injective() {
        for p in placements(3) {
            let w = p.wires();
            assert_eq!(w.len(), 3);
            assert!(w[0] != w[1] && w[0] != w[2] && w[1] != w[2]);
        }
    }

    #[test]
    fn test_placement_validation() {
        assert!(Placement::new(&[0, 0]).is_err());
        assert!(Placement::new(&[8]).is_err());
        assert!(Placement::new(&[0, 1, 2, 3, 4, 5, 6, 7, 0]).is_err());
        assert!(Placement::new(&[]).unwrap().is_empty());
        assert_eq!(Placement::new(&[3, 1]).unwrap().input_on_wire(1), Some(1));
        assert_eq!(Placement::new(&[3, 1]).unwrap().input_on_wire(2), None);
        assert!(Perm8::from_slice(&[0, 1, 2, 3, 4, 5, 6, 6]).is_err());
        assert_eq!(
            Perm8::from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap(),
            Perm8::identity()
        );
    }
}
