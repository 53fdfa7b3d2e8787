// SPDX-License-Identifier: Apache-2.0

//! The cell catalog: named 8-input base functions and their cached orbits.
//!
//! Orbits are computed once, when the catalog is built, and shared by every
//! later match. Cells whose base tables are identical share one orbit.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::cell_formula::{parse_formula, Term};
use crate::lut_match::{classify_batch, match_candidate, CandidateLut, Classification, MatchResult};
use crate::orbit::{compute_orbit, OrbitSet};
use crate::tt256::{TruthTable256, NUM_WIRES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A base function whose width is not exactly 8 inputs.
    DegenerateBase { cell: String, width: usize },
    DuplicateCell { cell: String },
    Formula { cell: String, message: String },
    Config(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateBase { cell, width } => write!(
                f,
                "cell '{cell}' has {width} inputs; catalog cells must have exactly {NUM_WIRES}"
            ),
            Self::DuplicateCell { cell } => write!(f, "cell '{cell}' is defined more than once"),
            Self::Formula { cell, message } => {
                write!(f, "cell '{cell}' has an invalid function: {message}")
            }
            Self::Config(message) => write!(f, "catalog config error: {message}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// A named 8-input Boolean function. Pin `i` is wire position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFunction {
    name: String,
    pins: Vec<String>,
    output: String,
    formula: Option<Term>,
    table: TruthTable256,
}

impl BaseFunction {
    pub fn from_formula(
        name: &str,
        pins: &[String],
        output: &str,
        formula: &str,
    ) -> Result<Self, CatalogError> {
        check_pins(name, pins)?;
        let formula_error = |message: String| CatalogError::Formula {
            cell: name.to_string(),
            message,
        };
        let term = parse_formula(formula).map_err(formula_error)?;
        let table = term.eval_tt256(pins).map_err(formula_error)?;
        Ok(Self {
            name: name.to_string(),
            pins: pins.to_vec(),
            output: output.to_string(),
            formula: Some(term),
            table,
        })
    }

    /// Builds a base function directly from a truth table of `width` inputs.
    /// Pins are named `I0..I7` and the output `Y`.
    pub fn from_table(
        name: &str,
        width: usize,
        table: TruthTable256,
    ) -> Result<Self, CatalogError> {
        if width != NUM_WIRES {
            return Err(CatalogError::DegenerateBase {
                cell: name.to_string(),
                width,
            });
        }
        Ok(Self {
            name: name.to_string(),
            pins: (0..NUM_WIRES).map(|i| format!("I{i}")).collect(),
            output: "Y".to_string(),
            formula: None,
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn formula(&self) -> Option<&Term> {
        self.formula.as_ref()
    }

    pub fn table(&self) -> &TruthTable256 {
        &self.table
    }

    /// A Verilog module implementing this cell.
    pub fn verilog_module(&self) -> String {
        let mut ports: Vec<String> = self.pins.iter().map(|p| format!("input {p}")).collect();
        ports.push(format!("output {}", self.output));
        let rhs = match &self.formula {
            Some(term) => term.to_verilog(),
            None => {
                let msb_first: Vec<&str> = self.pins.iter().rev().map(|s| s.as_str()).collect();
                format!("256'h{} >> {{{}}}", self.table.to_hex(), msb_first.join(", "))
            }
        };
        format!(
            "module {}({});\n  assign {} = {};\nendmodule\n",
            self.name,
            ports.join(", "),
            self.output,
            rhs
        )
    }
}

fn check_pins(name: &str, pins: &[String]) -> Result<(), CatalogError> {
    if pins.len() != NUM_WIRES {
        return Err(CatalogError::DegenerateBase {
            cell: name.to_string(),
            width: pins.len(),
        });
    }
    let mut seen = HashSet::new();
    for pin in pins {
        if !seen.insert(pin.as_str()) {
            return Err(CatalogError::Config(format!(
                "cell '{name}' lists pin '{pin}' more than once"
            )));
        }
    }
    Ok(())
}

fn pin_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Reference cell `c1`: two 2:1 muxes selected by `!(S0 + S1)`.
pub fn reference_c1() -> BaseFunction {
    BaseFunction::from_formula(
        "c1",
        &pin_names(&["A0", "A1", "SA", "B0", "B1", "SB", "S0", "S1"]),
        "f",
        "((S0 + S1) * ((SA * A1) + (!SA * A0))) + (!(S0 + S1) * ((SB * B1) + (!SB * B0)))",
    )
    .expect("reference cell c1 is well-formed")
}

/// Reference cell `c2`: a 4:1 mux with selects `!(A1 + B1)` and `!(A0 * B0)`.
pub fn reference_c2() -> BaseFunction {
    BaseFunction::from_formula(
        "c2",
        &pin_names(&["D00", "D01", "D10", "D11", "A1", "B1", "A0", "B0"]),
        "f",
        "(!(A1 + B1) * !(A0 * B0) * D11) + (!(A1 + B1) * (A0 * B0) * D10) \
         + ((A1 + B1) * !(A0 * B0) * D01) + ((A1 + B1) * (A0 * B0) * D00)",
    )
    .expect("reference cell c2 is well-formed")
}

/// One `[[cell]]` table of a catalog TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct CellConfig {
    pub name: String,
    #[serde(default)]
    pub pins: Vec<String>,
    #[serde(default = "default_output_pin")]
    pub output: String,
    /// Liberty-style formula over `pins`.
    pub function: Option<String>,
    /// Alternatively, the 256-bit table as hex digits.
    pub table: Option<String>,
}

fn default_output_pin() -> String {
    "Y".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    #[serde(default, rename = "cell")]
    pub cells: Vec<CellConfig>,
}

impl CellConfig {
    pub fn to_base_function(&self) -> Result<BaseFunction, CatalogError> {
        match (&self.function, &self.table) {
            (Some(function), None) => {
                BaseFunction::from_formula(&self.name, &self.pins, &self.output, function)
            }
            (None, Some(table)) => {
                let tt = TruthTable256::from_hex(table).map_err(|message| {
                    CatalogError::Formula {
                        cell: self.name.clone(),
                        message,
                    }
                })?;
                let width = if self.pins.is_empty() {
                    NUM_WIRES
                } else {
                    self.pins.len()
                };
                let mut base = BaseFunction::from_table(&self.name, width, tt)?;
                if !self.pins.is_empty() {
                    check_pins(&self.name, &self.pins)?;
                    base.pins = self.pins.clone();
                }
                base.output = self.output.clone();
                Ok(base)
            }
            _ => Err(CatalogError::Config(format!(
                "cell '{}' must give exactly one of `function` or `table`",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogCell {
    base: BaseFunction,
    orbit: Arc<OrbitSet>,
}

impl CatalogCell {
    pub fn base(&self) -> &BaseFunction {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn orbit(&self) -> &Arc<OrbitSet> {
        &self.orbit
    }
}

/// The catalog cells, in definition order, each with its orbit.
#[derive(Debug, Clone)]
pub struct Catalog {
    cells: Vec<CatalogCell>,
}

impl Catalog {
    /// Builds the catalog, computing each distinct base table's orbit once.
    pub fn build(bases: Vec<BaseFunction>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        for base in &bases {
            if !names.insert(base.name().to_string()) {
                return Err(CatalogError::DuplicateCell {
                    cell: base.name().to_string(),
                });
            }
        }

        let mut cache: HashMap<TruthTable256, Arc<OrbitSet>> = HashMap::new();
        let mut cells = Vec::with_capacity(bases.len());
        for base in bases {
            let orbit = cache
                .entry(*base.table())
                .or_insert_with(|| Arc::new(compute_orbit(base.table())))
                .clone();
            log::info!(
                "catalog: cell '{}' orbit has {} distinct tables",
                base.name(),
                orbit.len()
            );
            cells.push(CatalogCell { base, orbit });
        }
        Ok(Self { cells })
    }

    /// The catalog of the two reference cells `c1` and `c2`.
    pub fn reference() -> Self {
        Self::build(vec![reference_c1(), reference_c2()])
            .expect("reference cells have distinct names")
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let bases = config
            .cells
            .iter()
            .map(CellConfig::to_base_function)
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(bases)
    }

    /// Parses `[[cell]]` tables from TOML; other tables are ignored.
    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig =
            toml::from_str(s).map_err(|e| CatalogError::Config(e.to_string()))?;
        if config.cells.is_empty() {
            return Err(CatalogError::Config("no [[cell]] entries".to_string()));
        }
        Self::from_config(&config)
    }

    pub fn cells(&self) -> &[CatalogCell] {
        &self.cells
    }

    pub fn get(&self, name: &str) -> Option<&CatalogCell> {
        self.cells.iter().find(|c| c.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.name()).collect()
    }

    /// Match targets in catalog order.
    pub fn targets(&self) -> Vec<(&str, &OrbitSet)> {
        self.cells
            .iter()
            .map(|c| (c.name(), c.orbit.as_ref()))
            .collect()
    }

    pub fn match_candidate(&self, candidate: &CandidateLut) -> MatchResult {
        match_candidate(candidate, &self.targets())
    }

    pub fn classify(&self, candidates: &[(usize, TruthTable256)]) -> Vec<Classification> {
        classify_batch(&self.targets(), candidates)
    }
}
