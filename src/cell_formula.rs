// SPDX-License-Identifier: Apache-2.0

//! Boolean formula AST and parser for catalog cell functions.
//!
//! The syntax follows Liberty `function` attributes: `*` (or `&`) is AND,
//! `+` (or `|`) is OR, `^` is XOR, `!` (or `~`) is NOT, `0`/`1` are
//! constants. Precedence from loosest to tightest: OR, XOR, AND, NOT.

use crate::tt256::{TruthTable256, NUM_WIRES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Input(String),
    And(Box<Term>, Box<Term>),
    Or(Box<Term>, Box<Term>),
    Xor(Box<Term>, Box<Term>),
    Negate(Box<Term>),
    Constant(bool),
}

impl Term {
    /// Recursively collect all input names in the formula.
    pub fn inputs(&self) -> Vec<String> {
        let mut v = Vec::new();
        self.collect_inputs(&mut v);
        v
    }

    fn collect_inputs(&self, v: &mut Vec<String>) {
        match self {
            Term::Input(s) => v.push(s.clone()),
            Term::And(a, b) | Term::Or(a, b) | Term::Xor(a, b) => {
                a.collect_inputs(v);
                b.collect_inputs(v);
            }
            Term::Negate(t) => t.collect_inputs(v),
            Term::Constant(_) => {}
        }
    }

    /// Evaluates the formula over the 8-wire address space, where `pins[i]`
    /// names wire `i`.
    pub fn eval_tt256(&self, pins: &[String]) -> Result<TruthTable256, String> {
        if pins.len() > NUM_WIRES {
            return Err(format!(
                "formula evaluation supports at most {NUM_WIRES} pins; got {}",
                pins.len()
            ));
        }
        self.eval_with(pins)
    }

    fn eval_with(&self, pins: &[String]) -> Result<TruthTable256, String> {
        match self {
            Term::Input(name) => pins
                .iter()
                .position(|p| p == name)
                .map(TruthTable256::var)
                .ok_or_else(|| format!("formula input '{name}' is not one of the pins {pins:?}")),
            Term::And(lhs, rhs) => Ok(lhs.eval_with(pins)?.and(rhs.eval_with(pins)?)),
            Term::Or(lhs, rhs) => Ok(lhs.eval_with(pins)?.or(rhs.eval_with(pins)?)),
            Term::Xor(lhs, rhs) => Ok(lhs.eval_with(pins)?.xor(rhs.eval_with(pins)?)),
            Term::Negate(inner) => Ok(inner.eval_with(pins)?.not()),
            Term::Constant(true) => Ok(TruthTable256::const1()),
            Term::Constant(false) => Ok(TruthTable256::const0()),
        }
    }

    /// Renders the formula as a fully parenthesized Verilog expression.
    pub fn to_verilog(&self) -> String {
        match self {
            Term::Input(name) => name.clone(),
            Term::And(a, b) => format!("({} & {})", a.to_verilog(), b.to_verilog()),
            Term::Or(a, b) => format!("({} | {})", a.to_verilog(), b.to_verilog()),
            Term::Xor(a, b) => format!("({} ^ {})", a.to_verilog(), b.to_verilog()),
            Term::Negate(t) => format!("~{}", t.to_verilog()),
            Term::Constant(true) => "1'b1".to_string(),
            Term::Constant(false) => "1'b0".to_string(),
        }
    }
}

/// Parse a Liberty-style boolean formula string into a Term AST.
pub fn parse_formula(s: &str) -> Result<Term, String> {
    let tokens = tokenize(s)?;
    let (term, rest) = parse_expr(&tokens)?;
    if !rest.is_empty() {
        return Err(format!("Unexpected tokens at end: {:?}", rest));
    }
    Ok(term)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    LParen,
    RParen,
    And,
    Or,
    Xor,
    Not,
    Const(bool),
}

fn tokenize(s: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        let single = match c {
            ' ' | '\t' | '\n' | '\r' => None,
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            '*' | '&' => Some(Tok::And),
            '+' | '|' => Some(Tok::Or),
            '^' => Some(Tok::Xor),
            '!' | '~' => Some(Tok::Not),
            '1' => Some(Tok::Const(true)),
            '0' => Some(Tok::Const(false)),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c2) = chars.peek() {
                    if c2.is_ascii_alphanumeric() || c2 == '_' {
                        ident.push(c2);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Ident(ident));
                continue;
            }
            _ => return Err(format!("Unexpected character in formula: '{}'", c)),
        };
        chars.next();
        if let Some(tok) = single {
            tokens.push(tok);
        }
    }
    Ok(tokens)
}

// Recursive descent parser for formula expressions
fn parse_expr(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    parse_or(tokens)
}

fn parse_or(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    let (mut lhs, mut rest) = parse_xor(tokens)?;
    while let Some(Tok::Or) = rest.first() {
        let (rhs, rest2) = parse_xor(&rest[1..])?;
        lhs = Term::Or(Box::new(lhs), Box::new(rhs));
        rest = rest2;
    }
    Ok((lhs, rest))
}

fn parse_xor(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    let (mut lhs, mut rest) = parse_and(tokens)?;
    while let Some(Tok::Xor) = rest.first() {
        let (rhs, rest2) = parse_and(&rest[1..])?;
        lhs = Term::Xor(Box::new(lhs), Box::new(rhs));
        rest = rest2;
    }
    Ok((lhs, rest))
}

fn parse_and(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    let (mut lhs, mut rest) = parse_not(tokens)?;
    while let Some(Tok::And) = rest.first() {
        let (rhs, rest2) = parse_not(&rest[1..])?;
        lhs = Term::And(Box::new(lhs), Box::new(rhs));
        rest = rest2;
    }
    Ok((lhs, rest))
}

fn parse_not(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    if let Some(Tok::Not) = tokens.first() {
        let (expr, rest) = parse_not(&tokens[1..])?;
        Ok((Term::Negate(Box::new(expr)), rest))
    } else {
        parse_atom(tokens)
    }
}

fn parse_atom(tokens: &[Tok]) -> Result<(Term, &[Tok]), String> {
    match tokens.first() {
        Some(Tok::Ident(s)) => Ok((Term::Input(s.clone()), &tokens[1..])),
        Some(Tok::Const(b)) => Ok((Term::Constant(*b), &tokens[1..])),
        Some(Tok::LParen) => {
            let (expr, rest) = parse_expr(&tokens[1..])?;
            match rest.first() {
                Some(Tok::RParen) => Ok((expr, &rest[1..])),
                _ => Err("Expected ')'".to_string()),
            }
        }
        Some(tok) => Err(format!("Unexpected token: {:?}", tok)),
        None => Err("Unexpected end of input".to_string()),
    }
}
