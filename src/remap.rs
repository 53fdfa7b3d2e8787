// SPDX-License-Identifier: Apache-2.0

//! Rewrites matched LUTs in a netlist into instantiations of catalog cells.

use std::fmt;

use regex::Regex;

use crate::catalog::{BaseFunction, Catalog};
use crate::lut_extract::{Extraction, LutInstance};
use crate::lut_match::{Classification, MatchWitness};
use crate::tt256::NUM_WIRES;

const TIE_LOW: &str = "1'b0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    /// The classification list does not line up with the extracted LUTs.
    ClassificationCount { instances: usize, classifications: usize },
    UnknownCell { cell: String },
}

impl fmt::Display for RemapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassificationCount {
                instances,
                classifications,
            } => write!(
                f,
                "{classifications} classifications given for {instances} LUT instances"
            ),
            Self::UnknownCell { cell } => write!(f, "matched cell '{cell}' is not in the catalog"),
        }
    }
}

impl std::error::Error for RemapError {}

/// For each cell pin `j`, the candidate input that drives it, or `None` when
/// the pin is tied low.
///
/// Pin `j` reads original wire `j`, which the witness permutation routes from
/// wire `perm.inverse()[j]` of the expanded candidate; the placement says
/// which candidate input (if any) sits on that wire.
pub fn pin_sources(witness: &MatchWitness) -> [Option<usize>; NUM_WIRES] {
    let inv = witness.perm.inverse();
    let mut sources = [None; NUM_WIRES];
    for (pin, source) in sources.iter_mut().enumerate() {
        *source = witness.placement.input_on_wire(inv.0[pin]);
    }
    sources
}

/// Renders `cell` instantiated as `instance_name`, realizing `lut`.
pub fn cell_instance_text(
    cell: &BaseFunction,
    instance_name: &str,
    lut: &LutInstance,
    witness: &MatchWitness,
) -> String {
    let mut connections: Vec<String> = cell
        .pins()
        .iter()
        .zip(pin_sources(witness))
        .map(|(pin, source)| {
            let signal = source
                .and_then(|i| lut.inputs.get(i))
                .map_or(TIE_LOW, |s| s.as_str());
            format!(".{pin}({signal})")
        })
        .collect();
    connections.push(format!(".{}({})", cell.output(), lut.output));
    format!(
        "{} {} ({});",
        cell.name(),
        instance_name,
        connections.join(", ")
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    pub text: String,
    pub rewritten: usize,
    pub untouched: usize,
    /// Per catalog cell, in catalog order: instances rewritten to it.
    pub per_cell: Vec<(String, usize)>,
}

fn defines_module(source: &str, name: &str) -> bool {
    Regex::new(&format!(r"\bmodule\s+{}\b", regex::escape(name)))
        .map(|re| re.is_match(source))
        .unwrap_or(false)
}

/// Replaces every matched LUT in `source` with an instance of its first
/// matching cell (in catalog order) and appends module definitions for the
/// cells used. Unmatched and rejected LUTs are left as written.
pub fn remap_netlist(
    source: &str,
    extraction: &Extraction,
    classifications: &[Classification],
    catalog: &Catalog,
) -> Result<RemapOutcome, RemapError> {
    if extraction.instances.len() != classifications.len() {
        return Err(RemapError::ClassificationCount {
            instances: extraction.instances.len(),
            classifications: classifications.len(),
        });
    }

    let mut per_cell: Vec<(String, usize)> = catalog
        .names()
        .into_iter()
        .map(|n| (n.to_string(), 0))
        .collect();
    let mut text = String::with_capacity(source.len());
    let mut cursor = 0usize;
    let mut rewritten = 0usize;

    for (index, (lut, classification)) in extraction
        .instances
        .iter()
        .zip(classifications)
        .enumerate()
    {
        let Some(first) = classification.as_ref().ok().and_then(|m| m.matches.first()) else {
            continue;
        };
        if lut.inputs.len() != lut.width {
            log::warn!(
                "remap: LUT driving '{}' has {} connected inputs for width {}; left as written",
                lut.output,
                lut.inputs.len(),
                lut.width
            );
            continue;
        }
        let cell = catalog
            .get(&first.cell)
            .ok_or_else(|| RemapError::UnknownCell {
                cell: first.cell.clone(),
            })?;
        let instance_name = lut
            .instance_name
            .clone()
            .unwrap_or_else(|| format!("cellmap_{index}"));

        text.push_str(&source[cursor..lut.span.start]);
        text.push_str(&cell_instance_text(
            cell.base(),
            &instance_name,
            lut,
            &first.witness,
        ));
        cursor = lut.span.end;
        rewritten += 1;
        if let Some((_, count)) = per_cell.iter_mut().find(|(n, _)| *n == first.cell) {
            *count += 1;
        }
        log::debug!(
            "remap: {} -> {} {}",
            lut.output,
            cell.name(),
            instance_name
        );
    }
    text.push_str(&source[cursor..]);

    for cell in catalog.cells() {
        let used = per_cell
            .iter()
            .any(|(n, count)| n == cell.name() && *count > 0);
        if used && !defines_module(source, cell.name()) {
            text.push('\n');
            text.push_str(&cell.base().verilog_module());
        }
    }

    let untouched = extraction.instances.len() - rewritten;
    log::info!("remap: {rewritten} LUTs rewritten, {untouched} left as written");
    Ok(RemapOutcome {
        text,
        rewritten,
        untouched,
        per_cell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut_extract::extract_luts;
    use crate::lut_match::{match_candidate, CandidateLut};
    use crate::orbit::compute_orbit;
    use crate::perm8::{apply_perm, Perm8};
    use crate::tt256::TruthTable256;
    use pretty_assertions::assert_eq;

    fn and2_catalog() -> Catalog {
        let pins: Vec<String> = ["A", "B", "U2", "U3", "U4", "U5", "U6", "U7"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let and2 = BaseFunction::from_formula("and2", &pins, "Y", "A * B").unwrap();
        Catalog::build(vec![and2]).unwrap()
    }

    /// Checks that driving `base` through the witness wiring computes the
    /// candidate on every input assignment.
    fn assert_wiring_realizes(
        base: &TruthTable256,
        candidate: &CandidateLut,
        witness: &MatchWitness,
    ) {
        let sources = pin_sources(witness);
        for v in 0..(1usize << candidate.width()) {
            let mut addr = 0u8;
            for (pin, source) in sources.iter().enumerate() {
                if let Some(i) = source {
                    addr |= (((v >> i) & 1) as u8) << pin;
                }
            }
            assert_eq!(
                base.get_bit(addr),
                candidate.table().get_bit(v as u8),
                "input assignment {v:#b}"
            );
        }
    }

    #[test]
    fn test_rewrites_matched_shift_lut() {
        let catalog = and2_catalog();
        let src = "module top(input a, input b, output y, output z);\n  \
                   assign y = 4'h8 >> {a, b};\n  \
                   assign z = 4'h6 >> {a, b};\nendmodule\n";
        let extraction = extract_luts(src);
        let classifications = catalog.classify(&extraction.candidates());
        let outcome = remap_netlist(src, &extraction, &classifications, &catalog).unwrap();

        assert_eq!(outcome.rewritten, 1);
        assert_eq!(outcome.untouched, 1);
        assert_eq!(outcome.per_cell, vec![("and2".to_string(), 1)]);
        let expected_body = "module top(input a, input b, output y, output z);\n  \
                             and2 cellmap_0 (.A(b), .B(a), .U2(1'b0), .U3(1'b0), .U4(1'b0), .U5(1'b0), .U6(1'b0), .U7(1'b0), .Y(y));\n  \
                             assign z = 4'h6 >> {a, b};\nendmodule\n";
        assert!(outcome.text.starts_with(expected_body), "{}", outcome.text);
        assert!(outcome.text.ends_with(
            "\nmodule and2(input A, input B, input U2, input U3, input U4, input U5, input U6, input U7, output Y);\n  assign Y = (A & B);\nendmodule\n"
        ));
    }

    #[test]
    fn test_cell_form_keeps_instance_name() {
        let catalog = and2_catalog();
        let src = "\\$lut #(.LUT(4'h8), .WIDTH(32'd2)) _5_ (.A({ p, q }), .Y(r));\n";
        let extraction = extract_luts(src);
        let classifications = catalog.classify(&extraction.candidates());
        let outcome = remap_netlist(src, &extraction, &classifications, &catalog).unwrap();
        assert!(outcome.text.starts_with("and2 _5_ (.A(q), .B(p), "));
        assert!(outcome.text.contains(".Y(r));\n"));
    }

    #[test]
    fn test_nothing_matched_leaves_source_unchanged() {
        let catalog = and2_catalog();
        let src = "assign z = 4'h6 >> {a, b};\nassign w = 4'hx >> {a, b};\n";
        let extraction = extract_luts(src);
        let classifications = catalog.classify(&extraction.candidates());
        let outcome = remap_netlist(src, &extraction, &classifications, &catalog).unwrap();
        assert_eq!(outcome.text, src);
        assert_eq!(outcome.rewritten, 0);
        assert_eq!(outcome.untouched, 1);
    }

    #[test]
    fn test_existing_module_definition_is_not_duplicated() {
        let catalog = and2_catalog();
        let src = "assign y = 4'h8 >> {a, b};\nmodule and2(input A, input B, output Y);\nendmodule\n";
        let extraction = extract_luts(src);
        let classifications = catalog.classify(&extraction.candidates());
        let outcome = remap_netlist(src, &extraction, &classifications, &catalog).unwrap();
        assert_eq!(outcome.text.matches("module and2").count(), 1);
    }

    #[test]
    fn test_classification_count_must_match() {
        let catalog = and2_catalog();
        let src = "assign y = 4'h8 >> {a, b};\n";
        let extraction = extract_luts(src);
        assert_eq!(
            remap_netlist(src, &extraction, &[], &catalog),
            Err(RemapError::ClassificationCount {
                instances: 1,
                classifications: 0
            })
        );
    }

    #[test]
    fn test_wiring_realizes_narrow_candidate() {
        // Base AND on wires 3 and 5: the witness must route around the
        // placement of the candidate's inputs onto wires 0 and 1.
        let base = TruthTable256::var(3).and(TruthTable256::var(5).not());
        let orbit = compute_orbit(&base);
        let candidate = CandidateLut::new(2, TruthTable256::from_u64(0b0010)).unwrap();
        let result = match_candidate(&candidate, &[("andn", &orbit)]);
        let witness = result.get("andn").expect("a !b matches");
        assert_wiring_realizes(&base, &candidate, witness);
    }

    #[test]
    fn test_wiring_realizes_permuted_full_width_candidate() {
        let base = TruthTable256::from_fn(|addr| addr != 0 && (addr & addr.wrapping_add(1)) == 0);
        let orbit = compute_orbit(&base);
        let member = apply_perm(&base, Perm8([6, 2, 7, 0, 3, 5, 1, 4]));
        let candidate = CandidateLut::new(8, member).unwrap();
        let result = match_candidate(&candidate, &[("chain", &orbit)]);
        let witness = result.get("chain").expect("member of its own orbit");
        assert_wiring_realizes(&base, &candidate, witness);
    }
}
