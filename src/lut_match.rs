// SPDX-License-Identifier: Apache-2.0

//! Matching narrow LUT functions against catalog cell orbits.
//!
//! A candidate LUT of width `k <= 8` is expanded into the 8-wire address space
//! by placing its `k` inputs on distinct wires; the remaining wires are
//! don't-cares that the expansion never reads. A candidate matches a cell when
//! some placement yields a member of the cell's permutation orbit.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::orbit::OrbitLookup;
use crate::perm8::{placements, AddressMap, Perm8, Placement};
use crate::tt256::{TruthTable256, NUM_WIRES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The candidate has more inputs than the 8-wire address space.
    UnsupportedWidth { width: usize },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedWidth { width } => write!(
                f,
                "unsupported LUT width {width}; at most {NUM_WIRES} inputs are supported"
            ),
        }
    }
}

impl std::error::Error for MatchError {}

/// An extracted LUT function: `width` inputs and a truth table whose low
/// `2^width` bits are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateLut {
    width: u8,
    table: TruthTable256,
}

impl CandidateLut {
    /// Bits of `constant` above `2^width` are dropped; an over-wide constant
    /// is masked, not rejected.
    pub fn new(width: usize, constant: TruthTable256) -> Result<Self, MatchError> {
        if width > NUM_WIRES {
            return Err(MatchError::UnsupportedWidth { width });
        }
        Ok(Self {
            width: width as u8,
            table: constant.mask_to_inputs(width),
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width as usize
    }

    #[inline]
    pub fn table(&self) -> &TruthTable256 {
        &self.table
    }
}

/// The single expansion of a width-0 (constant driver) candidate.
pub fn expand_constant(candidate: &CandidateLut) -> TruthTable256 {
    if candidate.table.get_bit(0) {
        TruthTable256::const1()
    } else {
        TruthTable256::const0()
    }
}

/// Expands `candidate` to 8 inputs with input `i` read from wire
/// `placement.wires()[i]`.
pub fn expand(candidate: &CandidateLut, placement: &Placement) -> TruthTable256 {
    assert_eq!(
        placement.len(),
        candidate.width(),
        "placement size must equal candidate width"
    );
    if candidate.width() == 0 {
        return expand_constant(candidate);
    }
    AddressMap::for_placement(placement).gather(&candidate.table)
}

/// Evidence that a candidate realizes a cell: `apply_perm(base, perm)` equals
/// `expand(candidate, placement)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWitness {
    pub placement: Placement,
    pub perm: Perm8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMatch {
    pub cell: String,
    pub witness: MatchWitness,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched cells, in the order the targets were given.
    pub matches: Vec<CellMatch>,
    /// Expansions built before the search finished.
    pub placements_tried: usize,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matched_cells(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.cell.as_str()).collect()
    }

    pub fn get(&self, cell: &str) -> Option<&MatchWitness> {
        self.matches
            .iter()
            .find(|m| m.cell == cell)
            .map(|m| &m.witness)
    }

    pub fn is_match(&self, cell: &str) -> bool {
        self.get(cell).is_some()
    }
}

/// Decides, for every target, whether `candidate` can realize it.
///
/// Every ordered placement of the candidate's inputs is expanded once and
/// tested against each target that is still unresolved. A resolved target is
/// never tested again, and the search stops as soon as all targets are
/// resolved. Width-0 candidates skip the placement search: their single
/// constant expansion is tested against every target.
pub fn match_candidate<M: OrbitLookup + ?Sized>(
    candidate: &CandidateLut,
    targets: &[(&str, &M)],
) -> MatchResult {
    let mut found: Vec<Option<MatchWitness>> = vec![None; targets.len()];
    let mut unresolved = targets.len();
    let mut placements_tried = 0usize;

    if unresolved > 0 {
        if candidate.width() == 0 {
            let expanded = expand_constant(candidate);
            placements_tried = 1;
            for (slot, (_, orbit)) in found.iter_mut().zip(targets) {
                if let Some(perm) = orbit.lookup(&expanded) {
                    *slot = Some(MatchWitness {
                        placement: Placement::identity(0),
                        perm,
                    });
                }
            }
        } else {
            for placement in placements(candidate.width()) {
                placements_tried += 1;
                let expanded = expand(candidate, &placement);
                for (slot, (_, orbit)) in found.iter_mut().zip(targets) {
                    if slot.is_some() {
                        continue;
                    }
                    if let Some(perm) = orbit.lookup(&expanded) {
                        *slot = Some(MatchWitness { placement, perm });
                        unresolved -= 1;
                    }
                }
                if unresolved == 0 {
                    break;
                }
            }
        }
    }

    let matches: Vec<CellMatch> = found
        .into_iter()
        .zip(targets)
        .filter_map(|(w, (name, _))| {
            w.map(|witness| CellMatch {
                cell: name.to_string(),
                witness,
            })
        })
        .collect();
    log::debug!(
        "match_candidate: width={} table=0x{} placements_tried={} matched={:?}",
        candidate.width(),
        candidate.table.to_hex(),
        placements_tried,
        matches.iter().map(|m| m.cell.as_str()).collect::<Vec<_>>()
    );
    MatchResult {
        matches,
        placements_tried,
    }
}

pub type Classification = Result<MatchResult, MatchError>;

/// Classifies a batch of `(width, constant)` pairs against `targets`.
///
/// Candidates are independent and are classified in parallel; the returned
/// vector is in input order. An unsupported width is reported for that entry
/// alone and does not affect the others.
pub fn classify_batch<M: OrbitLookup + Sync + ?Sized>(
    targets: &[(&str, &M)],
    candidates: &[(usize, TruthTable256)],
) -> Vec<Classification> {
    candidates
        .par_iter()
        .map(|&(width, constant)| {
            let candidate = CandidateLut::new(width, constant)?;
            Ok(match_candidate(&candidate, targets))
        })
        .collect()
}

/// Aggregate counts over a classified batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Per target, in target order: how many candidates matched it.
    pub per_cell: Vec<(String, usize)>,
    /// Candidates matching more than one target.
    pub multiple: usize,
    /// Candidates matching no target.
    pub unmatched: usize,
    pub unsupported: usize,
    pub placements_tried: usize,
}

pub fn summarize(cell_names: &[&str], results: &[Classification]) -> BatchSummary {
    let mut per_cell: Vec<(String, usize)> =
        cell_names.iter().map(|n| (n.to_string(), 0)).collect();
    let mut summary = BatchSummary {
        total: results.len(),
        ..Default::default()
    };
    for result in results {
        match result {
            Err(MatchError::UnsupportedWidth { .. }) => summary.unsupported += 1,
            Ok(m) => {
                summary.placements_tried += m.placements_tried;
                match m.matches.len() {
                    0 => summary.unmatched += 1,
                    1 => {}
                    _ => summary.multiple += 1,
                }
                for (name, count) in per_cell.iter_mut() {
                    if m.is_match(name) {
                        *count += 1;
                    }
                }
            }
        }
    }
    summary.per_cell = per_cell;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::{compute_orbit, OrbitSet};
    use crate::perm8::apply_perm;
    use std::cell::Cell;
    use test_case::test_case;

    const AND2: u64 = 0b1000;

    struct CountingOrbit<'a> {
        inner: &'a OrbitSet,
        checks: Cell<usize>,
    }

    impl OrbitLookup for CountingOrbit<'_> {
        fn lookup(&self, tt: &TruthTable256) -> Option<Perm8> {
            self.checks.set(self.checks.get() + 1);
            self.inner.lookup(tt)
        }
    }

    fn and2_base() -> TruthTable256 {
        TruthTable256::var(0).and(TruthTable256::var(1))
    }

    #[test]
    fn test_candidate_masks_constant() {
        let c = CandidateLut::new(2, TruthTable256::from_u64(0x1F8)).unwrap();
        assert_eq!(*c.table(), TruthTable256::from_u64(AND2));
        let c0 = CandidateLut::new(0, TruthTable256::from_u64(0b10)).unwrap();
        assert!(expand_constant(&c0).is_const0());
    }

    #[test_case(9)]
    #[test_case(16)]
    fn test_candidate_rejects_wide(width: usize) {
        assert_eq!(
            CandidateLut::new(width, TruthTable256::const0()),
            Err(MatchError::UnsupportedWidth { width })
        );
    }

    #[test]
    fn test_expand_and_is_product_of_placed_wires() {
        let c = CandidateLut::new(2, TruthTable256::from_u64(AND2)).unwrap();
        let placement = Placement::new(&[3, 5]).unwrap();
        assert_eq!(
            expand(&c, &placement),
            TruthTable256::var(3).and(TruthTable256::var(5))
        );
    }

    #[test]
    fn test_expand_input_order() {
        // f(i0, i1) = i0 & !i1: truth table bit 1 only.
        let c = CandidateLut::new(2, TruthTable256::from_u64(0b0010)).unwrap();
        let placement = Placement::new(&[7, 2]).unwrap();
        assert_eq!(
            expand(&c, &placement),
            TruthTable256::var(7).and(TruthTable256::var(2).not())
        );
    }

    #[test]
    fn test_expand_width8_identity_is_verbatim() {
        let tt = TruthTable256::var(0)
            .xor(TruthTable256::var(4))
            .or(TruthTable256::var(7));
        let c = CandidateLut::new(8, tt).unwrap();
        assert_eq!(expand(&c, &Placement::identity(8)), tt);
    }

    #[test_case(1, 0b11)]
    #[test_case(2, 0xF)]
    #[test_case(5, u64::MAX)]
    fn test_all_ones_expands_to_const1(width: usize, ones: u64) {
        let c = CandidateLut::new(width, TruthTable256::from_u64(ones)).unwrap();
        for placement in placements(width).step_by(17) {
            assert!(expand(&c, &placement).is_const1());
        }
        let zero = CandidateLut::new(width, TruthTable256::const0()).unwrap();
        assert!(expand(&zero, &Placement::identity(width)).is_const0());
    }

    #[test]
    fn test_match_and_against_and_cell_with_witness() {
        let base = and2_base();
        let orbit = compute_orbit(&base);
        let c = CandidateLut::new(2, TruthTable256::from_u64(AND2)).unwrap();
        let result = match_candidate(&c, &[("and2", &orbit)]);
        let witness = result.get("and2").expect("AND should match an AND cell");
        assert_eq!(result.placements_tried, 1);
        assert_eq!(apply_perm(&base, witness.perm), expand(&c, &witness.placement));
    }

    #[test]
    fn test_match_or_does_not_match_and_cell() {
        let orbit = compute_orbit(&and2_base());
        let c = CandidateLut::new(2, TruthTable256::from_u64(0b1110)).unwrap();
        let result = match_candidate(&c, &[("and2", &orbit)]);
        assert!(result.is_empty());
        assert_eq!(result.placements_tried, 56);
    }

    #[test]
    fn test_resolved_target_is_not_rechecked() {
        let and_orbit = compute_orbit(&and2_base());
        let never_orbit = compute_orbit(&TruthTable256::const0());
        let and_target = CountingOrbit {
            inner: &and_orbit,
            checks: Cell::new(0),
        };
        let never_target = CountingOrbit {
            inner: &never_orbit,
            checks: Cell::new(0),
        };
        let c = CandidateLut::new(2, TruthTable256::from_u64(AND2)).unwrap();
        let targets: [(&str, &CountingOrbit); 2] =
            [("and2", &and_target), ("never", &never_target)];
        let result = match_candidate(&c, &targets);

        assert_eq!(result.matched_cells(), vec!["and2"]);
        assert_eq!(result.placements_tried, 56);
        let and_resolved_at = 1;
        assert!(and_target.checks.get() <= and_resolved_at);
        assert_eq!(never_target.checks.get(), result.placements_tried);
    }

    #[test]
    fn test_search_stops_when_all_targets_resolve() {
        let a = compute_orbit(&and2_base());
        let b = compute_orbit(&TruthTable256::var(5).and(TruthTable256::var(6)));
        // f = !i0 & i1 never lands in an AND orbit, so only `not_and` resolves.
        let c = CandidateLut::new(2, TruthTable256::from_u64(0b0100)).unwrap();
        let not_and = compute_orbit(&TruthTable256::var(1).and(TruthTable256::var(0).not()));
        let result = match_candidate(&c, &[("a", &a), ("b", &b), ("not_and", &not_and)]);
        assert_eq!(result.matched_cells(), vec!["not_and"]);
        assert_eq!(result.placements_tried, 56);

        let and = CandidateLut::new(2, TruthTable256::from_u64(AND2)).unwrap();
        let result = match_candidate(&and, &[("a", &a), ("b", &b)]);
        assert_eq!(result.matched_cells(), vec!["a", "b"]);
        assert_eq!(result.placements_tried, 1);
    }

    #[test]
    fn test_constant_candidate_uses_single_expansion() {
        let ones = compute_orbit(&TruthTable256::const1());
        let zeros = compute_orbit(&TruthTable256::const0());
        let one = CandidateLut::new(0, TruthTable256::from_u64(1)).unwrap();
        let result = match_candidate(&one, &[("ones", &ones), ("zeros", &zeros)]);
        assert_eq!(result.matched_cells(), vec!["ones"]);
        assert_eq!(result.placements_tried, 1);
        assert!(result.get("ones").unwrap().placement.is_empty());
    }

    #[test]
    fn test_no_targets_tries_nothing() {
        let c = CandidateLut::new(3, TruthTable256::from_u64(0x96)).unwrap();
        let targets: [(&str, &OrbitSet); 0] = [];
        let result = match_candidate(&c, &targets);
        assert!(result.is_empty());
        assert_eq!(result.placements_tried, 0);
    }

    #[test]
    fn test_classify_batch_reports_per_candidate() {
        let ones = compute_orbit(&TruthTable256::const1());
        let and = compute_orbit(&and2_base());
        let targets: [(&str, &OrbitSet); 2] = [("ones", &ones), ("and2", &and)];
        let results = classify_batch(
            &targets,
            &[
                (0, TruthTable256::from_u64(1)),
                (9, TruthTable256::const0()),
                (2, TruthTable256::from_u64(AND2)),
            ],
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().matched_cells(), vec!["ones"]);
        assert_eq!(results[1], Err(MatchError::UnsupportedWidth { width: 9 }));
        assert_eq!(results[2].as_ref().unwrap().matched_cells(), vec!["and2"]);

        let summary = summarize(&["ones", "and2"], &results);
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.per_cell,
            vec![("ones".to_string(), 1), ("and2".to_string(), 1)]
        );
        assert_eq!(summary.unsupported, 1);
        assert_eq!(summary.unmatched, 0);
        assert_eq!(summary.multiple, 0);
    }
}
