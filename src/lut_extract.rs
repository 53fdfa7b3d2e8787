// SPDX-License-Identifier: Apache-2.0

//! Extraction of LUT functions from a LUT-mapped Verilog netlist.
//!
//! Two textual forms are recognized:
//!
//! - the shift form `assign y = 4'h8 >> {a, b};`, where the constant is the
//!   truth table and the concatenated signals select a bit of it;
//! - the generic cell form written by Yosys,
//!   `\$lut #(.LUT(4'h8), .WIDTH(32'd2)) inst (.A({a, b}), .Y(y));`.
//!
//! In both forms the last listed signal is the least significant selector
//! bit, so inputs are stored LSB first: `inputs[i]` drives address bit `i`.

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tt256::{TruthTable256, NUM_ADDRS, NUM_WIRES};

static SHIFT_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)\bassign\s+(?P<lhs>(?:\\\S+|[A-Za-z_][\w$]*)(?:\s*\[[^\]]*\])?)\s*=\s*(?P<constant>\d*\s*'[sS]?[bBoOdDhH]\s*[0-9a-fA-FxXzZ_?]+)\s*>>\s*(?P<signals>\{[^}]*\}|[^;]+?)\s*;",
    )
    .expect("shift-form regex is valid")
});

static CELL_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)\\?\$lut\s*#\s*\(\s*\.LUT\s*\(\s*(?P<lut>[^)]*?)\s*\)\s*,\s*\.WIDTH\s*\(\s*(?P<width>[^)]*?)\s*\)\s*\)\s*(?P<inst>\\\S+|[A-Za-z_][\w$]*)\s*\(\s*\.A\s*\(\s*(?P<inputs>[^)]*?)\s*\)\s*,\s*\.Y\s*\(\s*(?P<output>[^)]*?)\s*\)\s*\)\s*;",
    )
    .expect("$lut cell regex is valid")
});

static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<width>\d+)?\s*'(?P<signed>[sS])?(?P<base>[bBoOdDhH])\s*(?P<digits>[0-9a-fA-FxXzZ_?]+)$",
    )
    .expect("constant regex is valid")
});

static SIGNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<base>\\\S+|[A-Za-z_][\w$]*)\s*(?:\[\s*(?P<msb>\d+)\s*(?::\s*(?P<lsb>\d+)\s*)?\])?$",
    )
    .expect("signal regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    InvalidConstant { text: String, reason: String },
    InvalidSignal { text: String },
    InputCountMismatch { width: usize, inputs: usize },
    /// A signal list naming more bits than a LUT can have inputs.
    TooManyInputs { inputs: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConstant { text, reason } => {
                write!(f, "cannot parse constant '{text}': {reason}")
            }
            Self::InvalidSignal { text } => write!(f, "cannot parse signal '{text}'"),
            Self::InputCountMismatch { width, inputs } => write!(
                f,
                "LUT declares WIDTH {width} but is connected to {inputs} input bits"
            ),
            Self::TooManyInputs { inputs } => write!(
                f,
                "signal list names {inputs} bits; at most {NUM_WIRES} LUT inputs are supported"
            ),
        }
    }
}

impl std::error::Error for ExtractError {}

/// A sized or unsized Verilog integer literal. The value keeps at most its
/// low 256 bits, already masked to `width` when one is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerilogConstant {
    pub width: Option<usize>,
    pub value: TruthTable256,
}

impl VerilogConstant {
    /// The value as a small integer, if it fits in 64 bits.
    pub fn as_u64(&self) -> Option<u64> {
        let [lo, rest @ ..] = self.value.0;
        rest.iter().all(|&w| w == 0).then_some(lo)
    }
}

/// Parses literals such as `4'h8`, `32'd5`, `16'hb4_4b`, `3'o7` or `12`.
pub fn parse_verilog_constant(text: &str) -> Result<VerilogConstant, ExtractError> {
    let text = text.trim();
    let invalid = |reason: &str| ExtractError::InvalidConstant {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '_') {
        let value = TruthTable256::parse_radix(text, 10).map_err(|e| invalid(&e))?;
        return Ok(VerilogConstant { width: None, value });
    }

    let caps = CONSTANT
        .captures(text)
        .ok_or_else(|| invalid("not a Verilog integer literal"))?;
    let width = match caps.name("width") {
        Some(m) => {
            let w: usize = m
                .as_str()
                .parse()
                .map_err(|_| invalid("width is out of range"))?;
            if w == 0 {
                return Err(invalid("zero-width literal"));
            }
            Some(w)
        }
        None => None,
    };
    let digits = &caps["digits"];
    if digits.chars().any(|c| matches!(c, 'x' | 'X' | 'z' | 'Z' | '?')) {
        return Err(invalid("x/z digits have no Boolean value"));
    }
    let radix = match caps["base"].to_ascii_lowercase().as_str() {
        "b" => 2,
        "o" => 8,
        "d" => 10,
        _ => 16,
    };
    let mut value = TruthTable256::parse_radix(digits, radix).map_err(|e| invalid(&e))?;
    if let Some(w) = width {
        value = value.mask_to_bits(w);
    }
    Ok(VerilogConstant { width, value })
}

fn bit_name(base: &str, index: usize) -> String {
    if base.starts_with('\\') {
        format!("{base} [{index}]")
    } else {
        format!("{base}[{index}]")
    }
}

/// One comma-separated item of a signal list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SignalItem<'a> {
    /// A bare name; a single bit unless the caller knows it is a bus.
    Whole(&'a str),
    Bit(&'a str, usize),
    /// `x[msb:lsb]`, in either direction.
    Range {
        base: &'a str,
        msb: usize,
        lsb: usize,
    },
    Constant { width: usize, value: TruthTable256 },
}

impl SignalItem<'_> {
    fn bit_count(&self) -> usize {
        match self {
            Self::Whole(_) | Self::Bit(..) => 1,
            Self::Range { msb, lsb, .. } => msb.abs_diff(*lsb).saturating_add(1),
            Self::Constant { width, .. } => *width,
        }
    }

    fn push_bits(&self, out: &mut Vec<String>) {
        match self {
            Self::Whole(base) => out.push(base.to_string()),
            Self::Bit(base, bit) => out.push(bit_name(base, *bit)),
            Self::Range { base, msb, lsb } if msb >= lsb => {
                out.extend((*lsb..=*msb).rev().map(|i| bit_name(base, i)))
            }
            Self::Range { base, msb, lsb } => out.extend((*msb..=*lsb).map(|i| bit_name(base, i))),
            Self::Constant { width, value } => {
                for bit in (0..*width).rev() {
                    let set = bit < NUM_ADDRS && value.get_bit(bit as u8);
                    out.push(if set { "1'b1" } else { "1'b0" }.to_string());
                }
            }
        }
    }
}

fn parse_signal_items(text: &str) -> Result<Vec<SignalItem<'_>>, ExtractError> {
    let text = text.trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(text);
    let mut items = Vec::new();
    for item in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let invalid = || ExtractError::InvalidSignal {
            text: item.to_string(),
        };
        if let Some(caps) = SIGNAL.captures(item) {
            let base = caps.name("base").map_or(item, |m| m.as_str());
            let parse_index = |name: &str| -> Result<Option<usize>, ExtractError> {
                caps.name(name)
                    .map(|m| m.as_str().parse::<usize>())
                    .transpose()
                    .map_err(|_| invalid())
            };
            items.push(match (parse_index("msb")?, parse_index("lsb")?) {
                (None, _) => SignalItem::Whole(base),
                (Some(bit), None) => SignalItem::Bit(base, bit),
                (Some(msb), Some(lsb)) => SignalItem::Range { base, msb, lsb },
            });
            continue;
        }
        let constant = parse_verilog_constant(item).map_err(|_| invalid())?;
        let width = constant.width.ok_or_else(invalid)?;
        items.push(SignalItem::Constant {
            width,
            value: constant.value,
        });
    }
    Ok(items)
}

fn total_bits(items: &[SignalItem<'_>]) -> usize {
    items
        .iter()
        .fold(0usize, |acc, item| acc.saturating_add(item.bit_count()))
}

fn expand_items(items: &[SignalItem<'_>]) -> Vec<String> {
    let mut out = Vec::with_capacity(total_bits(items));
    for item in items {
        item.push_bits(&mut out);
    }
    out
}

/// Number of single-bit signals a signal list names, computed without
/// expanding it. Saturates at `usize::MAX`.
pub fn count_signal_bits(text: &str) -> Result<usize, ExtractError> {
    Ok(total_bits(&parse_signal_items(text)?))
}

/// Expands a signal list into single-bit signal names, in the order written
/// (most significant first).
///
/// Accepts a brace concatenation or a single signal. Part selects `x[m:l]`
/// expand to each selected bit; sized constants expand to `1'b0`/`1'b1`.
/// Lists naming more than 8 bits are rejected with
/// [`ExtractError::TooManyInputs`] before anything is expanded.
pub fn expand_signals(text: &str) -> Result<Vec<String>, ExtractError> {
    let items = parse_signal_items(text)?;
    let bits = total_bits(&items);
    if bits > NUM_WIRES {
        return Err(ExtractError::TooManyInputs { inputs: bits });
    }
    Ok(expand_items(&items))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutForm {
    /// `assign y = N'hC >> {..};`
    Shift,
    /// `\$lut #(.LUT(..), .WIDTH(..)) inst (.A(..), .Y(..));`
    Cell,
}

/// One LUT found in a netlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutInstance {
    pub form: LutForm,
    /// Instance name; shift-form LUTs have none.
    pub instance_name: Option<String>,
    pub output: String,
    /// Single-bit input signals, least significant selector first. Empty
    /// when `width` exceeds 8; such LUTs are kept so the matcher can report
    /// them, but their inputs are never expanded.
    pub inputs: Vec<String>,
    pub width: usize,
    /// Truth table masked to the literal width and to `2^width` bits.
    pub constant: TruthTable256,
    /// Byte range of the whole statement in the source.
    pub span: Range<usize>,
}

impl LutInstance {
    /// The `(width, constant)` pair handed to the matcher.
    pub fn candidate(&self) -> (usize, TruthTable256) {
        (self.width, self.constant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLut {
    pub span: Range<usize>,
    pub error: ExtractError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Recognized LUTs in source order.
    pub instances: Vec<LutInstance>,
    pub skipped: Vec<SkippedLut>,
}

impl Extraction {
    pub fn candidates(&self) -> Vec<(usize, TruthTable256)> {
        self.instances.iter().map(LutInstance::candidate).collect()
    }
}

/// `ceil(log2(bits))`, the width implied by a table of `bits` entries.
fn width_for_table_bits(bits: usize) -> usize {
    if bits <= 1 {
        0
    } else {
        (usize::BITS - (bits - 1).leading_zeros()) as usize
    }
}

fn mask_to_width(value: TruthTable256, width: usize) -> TruthTable256 {
    if width <= NUM_WIRES {
        value.mask_to_inputs(width)
    } else {
        value
    }
}

fn lsb_first(mut msb_first: Vec<String>) -> Vec<String> {
    msb_first.reverse();
    msb_first
}

fn shift_form(caps: &regex::Captures<'_>, span: Range<usize>) -> Result<LutInstance, ExtractError> {
    let constant = parse_verilog_constant(&caps["constant"])?;
    let items = parse_signal_items(&caps["signals"])?;
    let bits = total_bits(&items);
    let (inputs, width) = if bits == 0 {
        (Vec::new(), width_for_table_bits(constant.width.unwrap_or(0)))
    } else if bits > NUM_WIRES {
        (Vec::new(), bits)
    } else {
        (lsb_first(expand_items(&items)), bits)
    };
    Ok(LutInstance {
        form: LutForm::Shift,
        instance_name: None,
        output: caps["lhs"].trim().to_string(),
        inputs,
        width,
        constant: mask_to_width(constant.value, width),
        span,
    })
}

fn cell_form(caps: &regex::Captures<'_>, span: Range<usize>) -> Result<LutInstance, ExtractError> {
    let constant = parse_verilog_constant(&caps["lut"])?;
    let width_text = &caps["width"];
    let width = parse_verilog_constant(width_text)?
        .as_u64()
        .and_then(|w| usize::try_from(w).ok())
        .ok_or_else(|| ExtractError::InvalidConstant {
            text: width_text.to_string(),
            reason: "WIDTH is out of range".to_string(),
        })?;

    let items = parse_signal_items(&caps["inputs"])?;
    // A whole bus connected by name: `.A(sel)` with WIDTH 3 is sel[2:0].
    let bus = match items.as_slice() {
        [SignalItem::Whole(base)] if width > 1 => Some(*base),
        _ => None,
    };
    let connected = if bus.is_some() {
        width
    } else {
        total_bits(&items)
    };
    if connected != width {
        return Err(ExtractError::InputCountMismatch {
            width,
            inputs: connected,
        });
    }
    let written = if width > NUM_WIRES {
        Vec::new()
    } else if let Some(base) = bus {
        (0..width).rev().map(|i| bit_name(base, i)).collect()
    } else {
        expand_items(&items)
    };

    Ok(LutInstance {
        form: LutForm::Cell,
        instance_name: Some(caps["inst"].to_string()),
        output: caps["output"].trim().to_string(),
        inputs: lsb_first(written),
        width,
        constant: mask_to_width(constant.value, width),
        span,
    })
}

/// Finds every LUT in `source`. LUT statements whose constant or signals
/// cannot be parsed are reported in `skipped` and otherwise ignored.
pub fn extract_luts(source: &str) -> Extraction {
    let mut found: Vec<(Range<usize>, Result<LutInstance, ExtractError>)> = Vec::new();
    for caps in SHIFT_FORM.captures_iter(source) {
        let span = caps.get(0).map_or(0..0, |m| m.range());
        found.push((span.clone(), shift_form(&caps, span)));
    }
    for caps in CELL_FORM.captures_iter(source) {
        let span = caps.get(0).map_or(0..0, |m| m.range());
        found.push((span.clone(), cell_form(&caps, span)));
    }
    found.sort_by_key(|(span, _)| span.start);

    let mut extraction = Extraction::default();
    for (span, result) in found {
        match result {
            Ok(instance) => extraction.instances.push(instance),
            Err(error) => {
                log::warn!(
                    "skipping LUT at bytes {}..{}: {}",
                    span.start,
                    span.end,
                    error
                );
                extraction.skipped.push(SkippedLut { span, error });
            }
        }
    }
    log::info!(
        "extract_luts: {} LUTs found, {} skipped",
        extraction.instances.len(),
        extraction.skipped.len()
    );
    extraction
}
