//! Two-pass assembler: pass-0 classifies lines and collects symbols, an
//! `EQU` substitution sweep folds constants into literal tokens, pass-1
//! lays out addresses and provisionally encodes every line, and pass-2
//! resolves the fixups pass-1 deferred (forward labels, and any label used
//! in a `DB`/`DW`).

use crate::directives;
use crate::encode;
use crate::error::{Error, ErrorKind};
use crate::expr::{parse_integer, Evaluator, Mode};
use crate::fixup::{Fixup, FixupKind};
use crate::symtab::{Binding, SymbolTable};
use crate::tokenizer;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use z80::ReservedSet;

/// One emitted line of the program: its source line number (for error
/// messages), the address it starts at, its provisional bytes, and any
/// fixups still pending against those bytes.
#[derive(Debug)]
pub struct AsmLine {
    pub line: usize,
    pub address: i64,
    pub bytes: Vec<u8>,
    pub fixups: Vec<Fixup>,
}

struct Pass0Line {
    line: usize,
    label: Option<String>,
    rest: Vec<String>,
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct Assembler {
    reserved: ReservedSet,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler { reserved: ReservedSet::new() }
    }

    /// Runs the full pipeline over assembly source text and returns the
    /// laid-out, fully-resolved lines in source order.
    pub fn assemble(&self, source: &str) -> Result<Vec<AsmLine>, Error> {
        debug!("pass-0: tokenizing and classifying source lines");
        let mut symtab = SymbolTable::new();
        let mut equ_values: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        let mut pass0 = Vec::new();

        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let tokens = tokenizer::tokenize(raw).map_err(|k| Error::new(line, k))?;
            if tokens.is_empty() {
                continue;
            }
            self.classify(line, tokens, &mut symtab, &mut equ_values, &mut pass0)?;
        }

        debug!("substituting {} EQU constant(s)", equ_values.len());
        for p in pass0.iter_mut() {
            substitute_equs(&mut p.rest, &equ_values);
        }

        debug!("pass-1: laying out {} line(s)", pass0.len());
        let mut lines = Vec::new();
        let mut address: i64 = 0;

        for p in &pass0 {
            if let Some(name) = &p.label {
                symtab.resolve_label(name, address);
            }
            if p.rest.is_empty() {
                continue;
            }
            let mnemonic = p.rest[0].to_ascii_lowercase();
            if mnemonic == "org" {
                address = self.eval_org(&p.rest[1..], &symtab, p.line)?;
                continue;
            }

            let (bytes, fixups) = if mnemonic == "db" || mnemonic == "defb" {
                let r = directives::process_db_pass1(&p.rest[1..], p.line)?;
                (r.bytes, r.fixups)
            } else if mnemonic == "dw" || mnemonic == "defw" {
                let r = directives::process_dw_pass1(&p.rest[1..], p.line)?;
                (r.bytes, r.fixups)
            } else {
                let r = encode::encode_instruction(&p.rest, &self.reserved, &symtab, p.line)?;
                (r.bytes, r.fixups)
            };

            trace!("{:#06x}: {} -> {:02x?}", address, p.rest.join(" "), bytes);
            let len = bytes.len() as i64;
            lines.push(AsmLine { line: p.line, address, bytes, fixups });
            address += len;
        }

        debug!("pass-2: resolving fixups against the final symbol table");
        let symbols = symtab.as_map();
        for asm_line in lines.iter_mut() {
            resolve_fixups(asm_line, &symbols, &self.reserved)?;
        }

        Ok(lines)
    }

    fn classify(
        &self,
        line: usize,
        tokens: Vec<String>,
        symtab: &mut SymbolTable,
        equ_values: &mut std::collections::HashMap<String, i64>,
        pass0: &mut Vec<Pass0Line>,
    ) -> Result<(), Error> {
        if tokens.len() >= 2 && tokens[1] == ":" && is_identifier(&tokens[0]) {
            if self.reserved.is_reserved(&tokens[0]) {
                return Err(Error::new(line, ErrorKind::ReservedWordAsLabel(tokens[0].clone())));
            }
            let name = tokens[0].clone();
            let after = &tokens[2..];

            if after.len() == 2 && after[0].eq_ignore_ascii_case("equ") {
                let value = parse_integer(&after[1]).ok_or_else(|| Error::new(line, ErrorKind::InvalidEquValue))?;
                if !(0..=65535).contains(&value) {
                    return Err(Error::new(line, ErrorKind::InvalidEquValue));
                }
                symtab.define(&name, Binding::Equ(value)).map_err(|k| Error::new(line, k))?;
                equ_values.insert(name, value);
                return Ok(());
            }

            symtab.define(&name, Binding::Label(0)).map_err(|k| Error::new(line, k))?;
            pass0.push(Pass0Line { line, label: Some(name), rest: after.to_vec() });
            return Ok(());
        }

        if tokens.len() == 1 && is_identifier(&tokens[0]) && !self.reserved.is_reserved(&tokens[0]) {
            return Err(Error::new(line, ErrorKind::InvalidIdentifier(tokens[0].clone())));
        }

        pass0.push(Pass0Line { line, label: None, rest: tokens });
        Ok(())
    }

    fn eval_org(&self, tokens: &[String], symtab: &SymbolTable, line: usize) -> Result<i64, Error> {
        let symbols = symtab.as_map();
        let mut ev = Evaluator::new(tokens, Mode::Pass2 { symbols: &symbols }, &self.reserved, line);
        let (value, consumed) = ev.evaluate().map_err(|_| Error::new(line, ErrorKind::InvalidOrgAddress))?;
        if consumed != tokens.len() || !(0..=65535).contains(&value) {
            return Err(Error::new(line, ErrorKind::InvalidOrgAddress));
        }
        Ok(value)
    }
}

/// Replaces bare identifier tokens that name an `EQU` constant with its
/// value, rendered as a plain decimal literal, everywhere in a line's
/// tokens except inside a string/char literal.
fn substitute_equs(tokens: &mut [String], equ_values: &std::collections::HashMap<String, i64>) {
    for token in tokens.iter_mut() {
        if tokenizer::is_literal(token) {
            continue;
        }
        if let Some(v) = equ_values.get(token.as_str()) {
            *token = v.to_string();
        }
    }
}

fn resolve_fixups(asm_line: &mut AsmLine, symbols: &std::collections::HashMap<String, i64>, reserved: &ReservedSet) -> Result<(), Error> {
    for fixup in &asm_line.fixups {
        let mut ev = Evaluator::new(&fixup.expr_tokens, Mode::Pass2 { symbols }, reserved, asm_line.line);
        let (value, consumed) = ev.evaluate().map_err(|k| Error::new(asm_line.line, k))?;
        if consumed != fixup.expr_tokens.len() {
            return Err(Error::new(asm_line.line, ErrorKind::MalformedLiteral(fixup.expr_tokens.join(" "))));
        }

        match fixup.kind {
            FixupKind::Byte => {
                if !(0..=255).contains(&value) {
                    return Err(Error::new(asm_line.line, ErrorKind::OperandOutOfRange { value, low: 0, high: 255 }));
                }
                asm_line.bytes[fixup.offset] = value as u8;
            }
            FixupKind::Word => {
                if !(0..=65535).contains(&value) {
                    return Err(Error::new(asm_line.line, ErrorKind::OperandOutOfRange { value, low: 0, high: 65535 }));
                }
                LittleEndian::write_u16(&mut asm_line.bytes[fixup.offset..fixup.offset + 2], value as u16);
            }
            FixupKind::Rel8 => {
                let next_pc = asm_line.address + asm_line.bytes.len() as i64;
                let delta = value - next_pc;
                if !(-128..=127).contains(&delta) {
                    return Err(Error::new(asm_line.line, ErrorKind::RelativeJumpOutOfRange(delta)));
                }
                asm_line.bytes[fixup.offset] = delta as i8 as u8;
            }
        }
    }
    Ok(())
}

/// Parses a directive/instruction operand that must be a literal integer
/// right now (used by callers outside the expression evaluator, such as
/// a future `-s` size argument). Exposed for `z80-cli`.
pub fn parse_literal(token: &str) -> Option<i64> {
    parse_integer(token)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_nop_and_halt() {
        let asm = Assembler::new();
        let lines = asm.assemble("nop\nhalt\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, vec![0x00]);
        assert_eq!(lines[1].bytes, vec![0x76]);
        assert_eq!(lines[0].address, 0);
        assert_eq!(lines[1].address, 1);
    }

    #[test]
    fn org_shifts_subsequent_addresses() {
        let asm = Assembler::new();
        let lines = asm.assemble("org 0x8000\nnop\n").unwrap();
        assert_eq!(lines[0].address, 0x8000);
    }

    #[test]
    fn equ_is_substituted_before_layout() {
        let asm = Assembler::new();
        let lines = asm.assemble("SCREEN: equ 0x4000\nld hl, SCREEN\n").unwrap();
        assert_eq!(lines[0].bytes, vec![0x21, 0x00, 0x40]);
    }

    #[test]
    fn label_forward_reference_resolves_in_pass2() {
        let asm = Assembler::new();
        let src = "nop\njr TARGET\nnop\nTARGET: halt\n";
        let lines = asm.assemble(src).unwrap();
        // jr at address 1, next_pc = 3, target at 4 -> delta = 1
        assert_eq!(lines[1].bytes, vec![0x18, 0x01]);
    }

    #[test]
    fn backward_label_in_loop() {
        let asm = Assembler::new();
        let src = "LOOP: nop\njr LOOP\n";
        let lines = asm.assemble(src).unwrap();
        // jr at address 1, next_pc = 3, target at 0 -> delta = -3 = 0xFD
        assert_eq!(lines[1].bytes, vec![0x18, 0xFD]);
    }

    #[test]
    fn reserved_word_as_label_is_rejected() {
        let asm = Assembler::new();
        let err = asm.assemble("hl: nop\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ReservedWordAsLabel(_)));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let asm = Assembler::new();
        let err = asm.assemble("LOOP: nop\nLOOP: halt\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateLabel(_)));
    }

    #[test]
    fn db_and_dw_directives_lay_out_bytes() {
        let asm = Assembler::new();
        let lines = asm.assemble("db 1, 2, 3\ndw 0x1234\n").unwrap();
        assert_eq!(lines[0].bytes, vec![1, 2, 3]);
        assert_eq!(lines[1].bytes, vec![0x34, 0x12]);
    }
}
