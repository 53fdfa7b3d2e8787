// SPDX-License-Identifier: Apache-2.0

use clap::ArgMatches;

use crate::flow_config::{load_catalog, FlowConfig};
use crate::report_cli_error::report_anyhow_and_exit;

pub fn handle_orbit_stats(_matches: &ArgMatches, config: &Option<FlowConfig>) {
    let catalog = match load_catalog(config) {
        Ok(catalog) => catalog,
        Err(e) => report_anyhow_and_exit(&e, "orbit-stats"),
    };
    let mut total = 0usize;
    for cell in catalog.cells() {
        let base = cell.base();
        println!(
            "{}: orbit={} pins=[{}] output={} base=0x{}",
            cell.name(),
            cell.orbit().len(),
            base.pins().join(", "),
            base.output(),
            base.table().to_hex()
        );
        total += cell.orbit().len();
    }
    println!("total library cells: {}", total);
}
