// SPDX-License-Identifier: Apache-2.0

//! 8-input single-output Boolean function truth tables.
//!
//! We represent a Boolean function `f(w0, ..., w7) -> o` as a 256-bit word
//! where bit `a` corresponds to the output value on the input assignment
//! encoded by `a`, i.e. wire `i` takes the value `(a >> i) & 1`. Wire 0 is
//! the least-significant selector bit and toggles fastest.
//!
//! The word is stored as four little-endian `u64` limbs: limb 0 holds
//! addresses `0..64`, limb 3 holds addresses `192..256`.
//!
//! Narrower functions (k < 8 inputs) use the same type with only the low
//! `2^k` bits meaningful; see [`TruthTable256::mask_to_inputs`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of input wires in the canonical address space.
pub const NUM_WIRES: usize = 8;

/// Number of input assignments (addresses) in the canonical address space.
pub const NUM_ADDRS: usize = 1 << NUM_WIRES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TruthTable256(pub [u64; 4]);

impl TruthTable256 {
    pub const fn const0() -> Self {
        Self([0; 4])
    }

    pub const fn const1() -> Self {
        Self([u64::MAX; 4])
    }

    /// Builds a table from a small integer constant (the low 64 addresses).
    pub const fn from_u64(value: u64) -> Self {
        Self([value, 0, 0, 0])
    }

    /// Returns the projection truth table for wire `index` (0..=7).
    pub fn var(index: usize) -> Self {
        assert!(
            index < NUM_WIRES,
            "TruthTable256::var index out of range (expected 0..=7)"
        );
        Self::from_fn(|addr| (addr >> index) & 1 != 0)
    }

    /// Builds a table by evaluating `f` at every address.
    pub fn from_fn(mut f: impl FnMut(u8) -> bool) -> Self {
        let mut out = Self::const0();
        for addr in 0..NUM_ADDRS {
            if f(addr as u8) {
                out.0[addr >> 6] |= 1u64 << (addr & 63);
            }
        }
        out
    }

    #[inline]
    pub fn get_bit(&self, addr: u8) -> bool {
        let addr = addr as usize;
        (self.0[addr >> 6] >> (addr & 63)) & 1 != 0
    }

    #[inline]
    pub fn set_bit(&mut self, addr: u8, value: bool) {
        let addr = addr as usize;
        let mask = 1u64 << (addr & 63);
        if value {
            self.0[addr >> 6] |= mask;
        } else {
            self.0[addr >> 6] &= !mask;
        }
    }

    #[inline]
    pub fn not(self) -> Self {
        Self(self.0.map(|w| !w))
    }

    #[inline]
    pub fn and(self, other: Self) -> Self {
        let mut out = self;
        for (o, w) in out.0.iter_mut().zip(other.0) {
            *o &= w;
        }
        out
    }

    #[inline]
    pub fn or(self, other: Self) -> Self {
        let mut out = self;
        for (o, w) in out.0.iter_mut().zip(other.0) {
            *o |= w;
        }
        out
    }

    #[inline]
    pub fn xor(self, other: Self) -> Self {
        let mut out = self;
        for (o, w) in out.0.iter_mut().zip(other.0) {
            *o ^= w;
        }
        out
    }

    /// Keeps only the low `2^inputs` bits, i.e. the addresses meaningful for a
    /// function of `inputs` wires. `inputs` must be at most 8.
    pub fn mask_to_inputs(self, inputs: usize) -> Self {
        assert!(inputs <= NUM_WIRES, "mask_to_inputs: inputs={inputs} > 8");
        self.mask_to_bits(1usize << inputs)
    }

    /// Keeps only the low `bits` bits. Widths of 256 or more are a no-op.
    pub fn mask_to_bits(self, bits: usize) -> Self {
        if bits >= NUM_ADDRS {
            return self;
        }
        let mut out = self;
        for (i, w) in out.0.iter_mut().enumerate() {
            let lo = i * 64;
            if bits <= lo {
                *w = 0;
            } else if bits < lo + 64 {
                *w &= (1u64 << (bits - lo)) - 1;
            }
        }
        out
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_const0(&self) -> bool {
        self.0 == [0; 4]
    }

    pub fn is_const1(&self) -> bool {
        self.0 == [u64::MAX; 4]
    }

    /// Renders the full table as 64 lowercase hex digits, most significant
    /// address first.
    pub fn to_hex(&self) -> String {
        format!(
            "{:016x}{:016x}{:016x}{:016x}",
            self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }

    /// Parses hex digits (optionally `0x`-prefixed, `_` separators allowed).
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        Self::parse_radix(digits, 16)
    }

    /// Parses an unsigned integer literal in the given radix, keeping the low
    /// 256 bits of the value. `_` separators are ignored.
    pub fn parse_radix(digits: &str, radix: u32) -> Result<Self, String> {
        let mut out = Self::const0();
        let mut seen_digit = false;
        for c in digits.chars() {
            if c == '_' {
                continue;
            }
            let d = c
                .to_digit(radix)
                .ok_or_else(|| format!("invalid base-{radix} digit '{c}' in \"{digits}\""))?;
            out.mul_add_small(radix as u64, d as u64);
            seen_digit = true;
        }
        if !seen_digit {
            return Err(format!("no digits in \"{digits}\""));
        }
        Ok(out)
    }

    /// `self = self * mul + add`, discarding overflow past 256 bits.
    fn mul_add_small(&mut self, mul: u64, add: u64) {
        let mut carry = add as u128;
        for w in self.0.iter_mut() {
            let v = (*w as u128) * (mul as u128) + carry;
            *w = v as u64;
            carry = v >> 64;
        }
    }
}

impl Ord for TruthTable256 {
    /// Numeric order of the 256-bit value.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for TruthTable256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::LowerHex for TruthTable256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", self.to_hex())
    }
}
