// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use cellmap::remap::remap_netlist;
use clap::ArgMatches;

use crate::classify::classify_netlist;
use crate::flow_config::{load_catalog, FlowConfig};
use crate::report_cli_error::report_anyhow_and_exit;

fn remap(matches: &ArgMatches, config: &Option<FlowConfig>) -> anyhow::Result<()> {
    let netlist = matches
        .get_one::<String>("netlist")
        .expect("netlist is required");
    let output = matches
        .get_one::<String>("output")
        .expect("output is required");

    let catalog = load_catalog(config)?;
    let classified = classify_netlist(netlist, &catalog)?;
    let outcome = remap_netlist(
        &classified.source,
        &classified.extraction,
        &classified.classifications,
        &catalog,
    )?;
    std::fs::write(output, &outcome.text).with_context(|| format!("write {output}"))?;

    println!(
        "Wrote {}: {} LUTs rewritten, {} left as written, {} skipped",
        output,
        outcome.rewritten,
        outcome.untouched,
        classified.extraction.skipped.len()
    );
    for (cell, count) in &outcome.per_cell {
        println!("  {}: {}", cell, count);
    }
    Ok(())
}

pub fn handle_remap(matches: &ArgMatches, config: &Option<FlowConfig>) {
    if let Err(e) = remap(matches, config) {
        report_anyhow_and_exit(&e, "remap");
    }
}
