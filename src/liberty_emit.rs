// SPDX-License-Identifier: Apache-2.0

//! Writes a Liberty library exposing every orbit member of every catalog
//! cell as its own cell, so a mapper can pick the member (and hence the pin
//! order) that fits.

use std::io::{self, Write};

use crate::catalog::Catalog;
use crate::tt256::{TruthTable256, NUM_WIRES};

const DELAY_VALUES: &str = "\"0.15, 0.25, 0.35\", \"0.2, 0.3, 0.4\", \"0.25, 0.35, 0.45\"";

#[derive(Debug, Clone)]
pub struct LibertyOptions {
    pub library_name: String,
    pub cell_area: f64,
    pub input_capacitance: f64,
    /// Also emit the `DFF` and `DFFRE` sequential cells.
    pub include_flops: bool,
}

impl Default for LibertyOptions {
    fn default() -> Self {
        Self {
            library_name: "custom_luts".to_string(),
            cell_area: 1.0,
            input_capacitance: 0.001,
            include_flops: true,
        }
    }
}

/// Name of the library cell for orbit member `index` of `cell`.
pub fn lut_cell_name(cell: &str, index: usize) -> String {
    format!("lut_{cell}_{index}")
}

/// Counts of what [`emit_liberty`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub lut_cells: usize,
    pub flop_cells: usize,
}

pub fn emit_liberty<W: Write>(
    catalog: &Catalog,
    options: &LibertyOptions,
    out: &mut W,
) -> io::Result<EmitStats> {
    let mut stats = EmitStats::default();
    write_header(options, out)?;
    for cell in catalog.cells() {
        for (index, table) in cell.orbit().sorted_tables().iter().enumerate() {
            write_lut_cell(&lut_cell_name(cell.name(), index), table, options, out)?;
            stats.lut_cells += 1;
        }
    }
    if options.include_flops {
        out.write_all(FLOP_CELLS.as_bytes())?;
        stats.flop_cells = 2;
    }
    writeln!(out, "}}")?;
    log::info!(
        "emit_liberty: library '{}' with {} LUT cells and {} flip-flops",
        options.library_name,
        stats.lut_cells,
        stats.flop_cells
    );
    Ok(stats)
}

/// Collects the library text into a `String`.
pub fn emit_liberty_to_string(catalog: &Catalog, options: &LibertyOptions) -> io::Result<String> {
    let mut buf = Vec::new();
    emit_liberty(catalog, options, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_header<W: Write>(options: &LibertyOptions, out: &mut W) -> io::Result<()> {
    writeln!(out, "library({}) {{", options.library_name)?;
    writeln!(out, "  operating_conditions(typical) {{")?;
    writeln!(out, "    process : 1.0;")?;
    writeln!(out, "    voltage : 1.0;")?;
    writeln!(out, "    temperature : 25;")?;
    writeln!(out, "  }}\n")?;
    writeln!(out, "  delay_model : table_lookup;")?;
    writeln!(out, "  lu_table_template(delay_template) {{")?;
    writeln!(out, "    variable_1 : input_net_transition;")?;
    writeln!(out, "    variable_2 : total_output_net_capacitance;")?;
    writeln!(out, "    index_1(\"0.1, 0.5, 1.0\");")?;
    writeln!(out, "    index_2(\"0.1, 1.0, 2.0\");")?;
    writeln!(out, "  }}\n")
}

fn write_lut_cell<W: Write>(
    name: &str,
    table: &TruthTable256,
    options: &LibertyOptions,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "  cell({name}) {{")?;
    writeln!(out, "    area : {:.1};", options.cell_area)?;
    writeln!(out, "    lut : \"0x{}\";", table.to_hex())?;
    for i in 0..NUM_WIRES {
        writeln!(out, "    pin(I{i}) {{")?;
        writeln!(out, "      direction : input;")?;
        writeln!(out, "      capacitance : {};", options.input_capacitance)?;
        writeln!(out, "    }}")?;
    }
    let related: Vec<String> = (0..NUM_WIRES).map(|i| format!("I{i}")).collect();
    writeln!(out, "    pin(Y) {{")?;
    writeln!(out, "      direction : output;")?;
    writeln!(out, "      timing() {{")?;
    writeln!(out, "        timing_type : combinational;")?;
    writeln!(out, "        related_pin : \"{}\";", related.join(" "))?;
    for group in ["cell_rise", "cell_fall"] {
        writeln!(out, "        {group}(delay_template) {{")?;
        writeln!(out, "          values({DELAY_VALUES});")?;
        writeln!(out, "        }}")?;
    }
    writeln!(out, "      }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "  }}\n")
}

const FLOP_CELLS: &str = r#"  cell(DFFRE) {
    area : 1.5;
    ff(IQ, IQN) {
      next_state : "(D * E) + (IQ * !E)";
      clocked_on : "CLK";
      clear : "R";
    }
    pin(CLK) {
      direction : input;
      clock : true;
      capacitance : 0.001;
    }
    pin(D) {
      direction : input;
      capacitance : 0.001;
      timing() {
        timing_type : setup_rising;
        related_pin : "CLK";
        intrinsic_rise : 0.05;
        intrinsic_fall : 0.05;
      }
    }
    pin(E) {
      direction : input;
      capacitance : 0.001;
      timing() {
        timing_type : setup_rising;
        related_pin : "CLK";
        intrinsic_rise : 0.05;
        intrinsic_fall : 0.05;
      }
    }
    pin(R) {
      direction : input;
      capacitance : 0.001;
    }
    pin(Q) {
      direction : output;
      function : "IQ";
      timing() {
        timing_type : rising_edge;
        related_pin : "CLK";
        intrinsic_rise : 0.1;
        intrinsic_fall : 0.1;
      }
    }
  }

  cell(DFF) {
    area : 1.0;
    ff(IQ, IQN) {
      next_state : "D";
      clocked_on : "CLK";
    }
    pin(CLK) {
      direction : input;
      clock : true;
      capacitance : 0.001;
    }
    pin(D) {
      direction : input;
      capacitance : 0.001;
      timing() {
        timing_type : setup_rising;
        related_pin : "CLK";
        intrinsic_rise : 0.05;
        intrinsic_fall : 0.05;
      }
    }
    pin(Q) {
      direction : output;
      function : "IQ";
      timing() {
        timing_type : rising_edge;
        related_pin : "CLK";
        intrinsic_rise : 0.1;
        intrinsic_fall : 0.1;
      }
    }
  }
"#;
