// SPDX-License-Identifier: Apache-2.0

//! Command line driver for mapping LUT netlists onto a library of custom
//! 8-input cells via input-permutation orbits.
//!
//! Commands are given like:
//!
//! ```text
//! cellmap-driver <global-options> <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - orbit-stats: Prints the orbit size of every catalog cell.
//! - lib-gen: Writes a Liberty library with one cell per orbit member.
//! - classify: Reports which catalog cells each LUT of a netlist can realize.
//! - remap: Rewrites matched LUTs of a netlist into catalog cell instances.
//! - synth: Maps a design with Yosys onto a generated library and verifies the
//!   result.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- orbit-stats
//! $ cargo run -- --config=cellmap.toml classify mapped.v --json
//! $ cargo run -- synth counter5.v --top Counter_5bit --output mapped.v
//! ```

mod classify;
mod flow_config;
mod lib_gen;
mod orbit_stats;
mod remap;
mod report_cli_error;
mod synth;

use clap::{Arg, ArgAction};
use flow_config::{discover_config_path, FlowConfig};
use report_cli_error::report_cli_error_and_exit;

trait AppExt {
    fn add_flag(self, long: &'static str, help: &'static str) -> Self;
    fn add_output_arg(self, help: &'static str) -> Self;
    fn add_netlist_arg(self) -> Self;
    fn add_library_name_arg(self) -> Self;
}

impl AppExt for clap::Command {
    /// Adds a presence flag; the helper keeps flag style uniform across
    /// commands.
    fn add_flag(self, long: &'static str, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new(long)
                .long(long)
                .action(ArgAction::SetTrue)
                .help(help),
        )
    }

    fn add_output_arg(self, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new("output")
                .long("output")
                .value_name("OUTPUT")
                .help(help)
                .required(true)
                .action(ArgAction::Set),
        )
    }

    fn add_netlist_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("netlist")
                .value_name("NETLIST")
                .help("LUT-mapped Verilog netlist")
                .required(true)
                .index(1),
        )
    }

    fn add_library_name_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("library_name")
                .long("library_name")
                .value_name("LIBRARY_NAME")
                .help("Name of the generated Liberty library")
                .action(ArgAction::Set),
        )
    }
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "cellmap-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("cellmap-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Maps LUT functions onto custom 8-input cells by permutation orbit")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG")
                .help("Path to a cellmap.toml file")
                .action(ArgAction::Set),
        )
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("orbit-stats").about("Prints the orbit size of every catalog cell"),
        )
        .subcommand(
            clap::Command::new("lib-gen")
                .about("Writes a Liberty library with one cell per orbit member")
                .add_output_arg("Output Liberty file")
                .add_library_name_arg()
                .add_flag("no_flops", "Omit the DFF and DFFRE cells"),
        )
        .subcommand(
            clap::Command::new("classify")
                .about("Classifies every LUT of a netlist against the catalog")
                .add_netlist_arg()
                .add_flag("json", "Emit one JSON object per LUT plus a summary line"),
        )
        .subcommand(
            clap::Command::new("remap")
                .about("Rewrites matched LUTs into catalog cell instances")
                .add_netlist_arg()
                .add_output_arg("Output Verilog file"),
        )
        .subcommand(
            clap::Command::new("synth")
                .about("Runs Yosys against a generated orbit library and verifies the mapping")
                .arg(
                    Arg::new("design")
                        .value_name("DESIGN")
                        .help("Verilog design to synthesize")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("top")
                        .long("top")
                        .value_name("TOP")
                        .help("Top module name")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .add_output_arg("Mapped Verilog output")
                .arg(
                    Arg::new("liberty")
                        .long("liberty")
                        .value_name("LIBERTY")
                        .help("Use this Liberty file instead of generating one")
                        .action(ArgAction::Set),
                )
                .add_library_name_arg()
                .add_flag("keep_script", "Write the Yosys script next to the output"),
        )
        .get_matches();

    // Without --config, a cellmap.toml in the working directory is used.
    let config_path = discover_config_path(matches.get_one::<String>("config"));
    let config: Option<FlowConfig> = config_path.map(|path| {
        if !path.exists() {
            let cwd = std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_default();
            report_cli_error_and_exit(
                "config file does not exist",
                None,
                vec![
                    ("path", &path.display().to_string()),
                    ("working directory", &cwd),
                ],
            );
        }
        match FlowConfig::load(&path) {
            Ok(config) => config,
            Err(e) => report_cli_error_and_exit(
                &format!("{:#}", e),
                None,
                vec![("path", &path.display().to_string())],
            ),
        }
    });

    if let Some(matches) = matches.subcommand_matches("orbit-stats") {
        orbit_stats::handle_orbit_stats(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("lib-gen") {
        lib_gen::handle_lib_gen(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("classify") {
        classify::handle_classify(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("remap") {
        remap::handle_remap(matches, &config);
    } else if let Some(matches) = matches.subcommand_matches("synth") {
        synth::handle_synth(matches, &config);
    } else if let Some(_matches) = matches.subcommand_matches("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
    } else {
        report_cli_error_and_exit("No valid subcommand provided.", None, vec![]);
    }
}
