// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use cellmap::catalog::Catalog;
use cellmap::lut_extract::{extract_luts, Extraction, LutInstance};
use cellmap::lut_match::{summarize, BatchSummary, Classification};
use cellmap::TruthTable256;
use clap::ArgMatches;
use serde_json::json;

use crate::flow_config::{load_catalog, FlowConfig};
use crate::report_cli_error::report_anyhow_and_exit;

/// A netlist read from disk along with its LUTs and their classifications.
pub struct ClassifiedNetlist {
    pub source: String,
    pub extraction: Extraction,
    pub classifications: Vec<Classification>,
}

pub fn classify_netlist(path: &str, catalog: &Catalog) -> anyhow::Result<ClassifiedNetlist> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("read netlist {path}"))?;
    let extraction = extract_luts(&source);
    let classifications = catalog.classify(&extraction.candidates());
    Ok(ClassifiedNetlist {
        source,
        extraction,
        classifications,
    })
}

/// Hex digits of the meaningful part of a table, without leading zeros.
fn short_hex(tt: &TruthTable256) -> String {
    let hex = tt.to_hex();
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn describe_lut(lut: &LutInstance) -> String {
    match &lut.instance_name {
        Some(name) => format!("{} -> {}", name, lut.output),
        None => format!("assign {}", lut.output),
    }
}

fn classification_line(
    index: usize,
    lut: &LutInstance,
    classification: &Classification,
) -> String {
    let head = format!(
        "LUT {}: {} width={} table=0x{}",
        index,
        describe_lut(lut),
        lut.width,
        short_hex(&lut.constant)
    );
    match classification {
        Err(e) => format!("{head}: {e}"),
        Ok(result) if result.is_empty() => format!("{head}: no match"),
        Ok(result) => {
            let cells: Vec<String> = result
                .matches
                .iter()
                .map(|m| {
                    format!(
                        "{} (placement {:?}, perm {:?})",
                        m.cell,
                        m.witness.placement.wires(),
                        m.witness.perm.0
                    )
                })
                .collect();
            format!("{head}: {}", cells.join("; "))
        }
    }
}

fn classification_json(
    index: usize,
    lut: &LutInstance,
    classification: &Classification,
) -> serde_json::Value {
    let mut value = json!({
        "index": index,
        "instance": lut.instance_name,
        "output": lut.output,
        "width": lut.width,
        "table": short_hex(&lut.constant),
    });
    match classification {
        Ok(result) => {
            value["matches"] = json!(result.matches);
            value["placements_tried"] = json!(result.placements_tried);
        }
        Err(e) => value["error"] = json!(e.to_string()),
    }
    value
}

fn print_summary(summary: &BatchSummary, skipped: usize) {
    println!("Summary:");
    println!("  LUTs found: {} (skipped: {})", summary.total, skipped);
    for (cell, count) in &summary.per_cell {
        println!("  matching {}: {}", cell, count);
    }
    println!("  matching several cells: {}", summary.multiple);
    println!("  matching no cell: {}", summary.unmatched);
    println!("  unsupported width: {}", summary.unsupported);
    println!("  placements tried: {}", summary.placements_tried);
}

fn classify(matches: &ArgMatches, config: &Option<FlowConfig>) -> anyhow::Result<()> {
    let netlist = matches
        .get_one::<String>("netlist")
        .expect("netlist is required");
    let as_json = matches.get_flag("json");

    let catalog = load_catalog(config)?;
    let classified = classify_netlist(netlist, &catalog)?;
    let summary = summarize(&catalog.names(), &classified.classifications);
    log::info!(
        "classify: {} LUTs, {} unmatched, {} placements tried",
        summary.total,
        summary.unmatched,
        summary.placements_tried
    );

    let rows = classified
        .extraction
        .instances
        .iter()
        .zip(&classified.classifications)
        .enumerate();
    if as_json {
        for (index, (lut, classification)) in rows {
            println!("{}", classification_json(index, lut, classification));
        }
        println!(
            "{}",
            json!({
                "summary": summary,
                "skipped": classified.extraction.skipped.len(),
            })
        );
    } else {
        for (index, (lut, classification)) in rows {
            println!("{}", classification_line(index, lut, classification));
        }
        print_summary(&summary, classified.extraction.skipped.len());
    }
    Ok(())
}

pub fn handle_classify(matches: &ArgMatches, config: &Option<FlowConfig>) {
    if let Err(e) = classify(matches, config) {
        report_anyhow_and_exit(&e, "classify");
    }
}
