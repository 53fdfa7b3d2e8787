// SPDX-License-Identifier: Apache-2.0

//! Drives Yosys to map a design onto a generated orbit library, then checks
//! what the mapped netlist ended up using.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context};
use cellmap::liberty_emit::{emit_liberty, LibertyOptions};
use clap::ArgMatches;
use regex::Regex;

use crate::flow_config::{load_catalog, synth_config, FlowConfig, SynthConfig};
use crate::lib_gen::resolve_library_name;
use crate::report_cli_error::report_anyhow_and_exit;

pub fn yosys_script(design: &Path, top: &str, liberty: &Path, output: &Path) -> String {
    format!(
        "# Map {top} onto the orbit library\n\
         read_verilog {}\n\
         synth -top {top} -lut 8\n\
         abc -liberty {} -dress\n\
         clean -purge\n\
         write_verilog -noexpr {}\n",
        design.display(),
        liberty.display(),
        output.display()
    )
}

/// The configured `yosys_path`, else `yosys` found on `PATH`.
pub fn locate_yosys(config: &SynthConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = &config.yosys_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(anyhow!("configured yosys_path does not exist: {}", path.display()));
        }
        return Ok(path);
    }
    which::which("yosys").context("yosys not found on PATH; set [synth] yosys_path")
}

/// Runs `yosys -s <script>` and returns its stdout.
fn run_yosys(yosys: &Path, script: &Path) -> anyhow::Result<String> {
    let mut command = Command::new(yosys);
    command.arg("-s").arg(script);
    log::info!("Running command: {:?}", command);
    let output = command
        .output()
        .with_context(|| format!("launch {}", yosys.display()))?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        return Err(anyhow!(
            "yosys failed with status {}\nstderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(stdout)
}

/// Yosys log lines worth showing: warnings and errors.
pub fn notable_log_lines(log_text: &str) -> (Vec<&str>, Vec<&str>) {
    let warnings = log_text.lines().filter(|l| l.contains("Warning")).collect();
    let errors = log_text.lines().filter(|l| l.contains("ERROR")).collect();
    (warnings, errors)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// Per catalog cell: instances of any of its `lut_<cell>_<n>` members.
    pub per_cell: Vec<(String, usize)>,
    pub flops: usize,
    /// Generic `$lut` cells the mapper could not replace.
    pub generic_luts: usize,
}

impl MappingReport {
    pub fn custom_luts(&self) -> usize {
        self.per_cell.iter().map(|(_, n)| n).sum()
    }
}

fn count(pattern: &str, text: &str) -> usize {
    Regex::new(pattern)
        .map(|re| re.find_iter(text).count())
        .unwrap_or(0)
}

pub fn verify_mapping(mapped: &str, cell_names: &[&str]) -> MappingReport {
    let per_cell = cell_names
        .iter()
        .map(|name| {
            let pattern = format!(r"\blut_{}_\d+\b", regex::escape(name));
            (name.to_string(), count(&pattern, mapped))
        })
        .collect();
    MappingReport {
        per_cell,
        flops: count(r"\bDFF\b", mapped) + count(r"\bDFFRE\b", mapped),
        generic_luts: count(r"\$lut\b", mapped),
    }
}

fn synth(matches: &ArgMatches, config: &Option<FlowConfig>) -> anyhow::Result<bool> {
    let design = PathBuf::from(matches.get_one::<String>("design").expect("design is required"));
    let top = matches.get_one::<String>("top").expect("top is required");
    let output = PathBuf::from(matches.get_one::<String>("output").expect("output is required"));
    let keep_script = matches.get_flag("keep_script");

    let yosys = locate_yosys(&synth_config(config))?;
    let catalog = load_catalog(config)?;
    let temp_dir = tempfile::tempdir().context("create temporary directory")?;

    let liberty = match matches.get_one::<String>("liberty") {
        Some(path) => PathBuf::from(path),
        None => {
            let path = temp_dir.path().join("cellmap.lib");
            let options = LibertyOptions {
                library_name: resolve_library_name(matches, config),
                ..Default::default()
            };
            let mut writer = BufWriter::new(
                File::create(&path).with_context(|| format!("create {}", path.display()))?,
            );
            emit_liberty(&catalog, &options, &mut writer)?;
            writer.flush()?;
            path
        }
    };

    let script_path = if keep_script {
        output.with_extension("ys")
    } else {
        temp_dir.path().join("cellmap_synth.ys")
    };
    std::fs::write(&script_path, yosys_script(&design, top, &liberty, &output))
        .with_context(|| format!("write {}", script_path.display()))?;
    if keep_script {
        println!("Yosys script: {}", script_path.display());
    }

    let log_text = run_yosys(&yosys, &script_path)?;
    let (warnings, errors) = notable_log_lines(&log_text);
    if !warnings.is_empty() {
        println!("Yosys warnings:");
        warnings.iter().for_each(|l| println!("  {l}"));
    }
    if !errors.is_empty() {
        println!("Yosys errors:");
        errors.iter().for_each(|l| println!("  {l}"));
    }

    let mapped = std::fs::read_to_string(&output)
        .with_context(|| format!("read mapped output {}", output.display()))?;
    let report = verify_mapping(&mapped, &catalog.names());
    println!("Verification:");
    println!("  custom LUTs: {}", report.custom_luts());
    for (cell, n) in &report.per_cell {
        println!("    {}: {}", cell, n);
    }
    println!("  flip-flops: {}", report.flops);
    if report.generic_luts > 0 {
        log::warn!("{} generic $lut cells remain", report.generic_luts);
        println!("  generic LUTs remaining: {}", report.generic_luts);
    }
    Ok(report.custom_luts() > 0 && report.generic_luts == 0)
}

pub fn handle_synth(matches: &ArgMatches, config: &Option<FlowConfig>) {
    match synth(matches, config) {
        Ok(true) => println!("Mapping complete."),
        Ok(false) => println!("Mapping incomplete; check the report above."),
        Err(e) => report_anyhow_and_exit(&e, "synth"),
    }
}
