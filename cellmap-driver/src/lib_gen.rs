// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use cellmap::liberty_emit::{emit_liberty, LibertyOptions};
use clap::ArgMatches;

use crate::flow_config::{load_catalog, synth_config, FlowConfig};
use crate::report_cli_error::report_anyhow_and_exit;

/// Library name from the flag, else the config, else the default.
pub fn resolve_library_name(matches: &ArgMatches, config: &Option<FlowConfig>) -> String {
    matches
        .get_one::<String>("library_name")
        .cloned()
        .or_else(|| synth_config(config).library_name)
        .unwrap_or_else(|| LibertyOptions::default().library_name)
}

fn lib_gen(matches: &ArgMatches, config: &Option<FlowConfig>) -> anyhow::Result<()> {
    let output = matches
        .get_one::<String>("output")
        .expect("output is required");
    let options = LibertyOptions {
        library_name: resolve_library_name(matches, config),
        include_flops: !matches.get_flag("no_flops"),
        ..Default::default()
    };
    let catalog = load_catalog(config)?;

    let file = File::create(output).with_context(|| format!("create {output}"))?;
    let mut writer = BufWriter::new(file);
    let stats = emit_liberty(&catalog, &options, &mut writer)
        .with_context(|| format!("write Liberty library to {output}"))?;
    writer.flush().with_context(|| format!("flush {output}"))?;

    println!(
        "Wrote {}: library {} with {} LUT cells and {} flip-flops",
        output, options.library_name, stats.lut_cells, stats.flop_cells
    );
    Ok(())
}

pub fn handle_lib_gen(matches: &ArgMatches, config: &Option<FlowConfig>) {
    if let Err(e) = lib_gen(matches, config) {
        report_anyhow_and_exit(&e, "lib-gen");
    }
}
