//! Turns one tokenized instruction line into provisional bytes plus any
//! fixups, by normalizing its operand tokens into the same key shape
//! `z80::InstructionTable` was built with and looking the result up.
//!
//! Registers, condition codes, and punctuation pass into the key verbatim.
//! A numeric operand is replaced with the table's placeholder token:
//! `0x{0}` for a single trailing byte, `0x{1}{0}` for a little-endian word.
//! Which placeholder applies is usually obvious from context (a register
//! pair takes a word, an 8-bit register takes a byte) except for a bare or
//! parenthesized operand with no register alongside it (`in a, (n)` vs
//! `ld hl, (nn)`), where both are plausible shapes — those are resolved by
//! trying the byte key first and falling back to the word key.
//!
//! `bit`/`res`/`set`'s bit index, `rst`'s vector, and `im`'s mode are not
//! operands at all from the table's point of view: they select which row
//! of the table applies, so they must already be known at pass-1 time and
//! are folded into the key as literal tokens instead of placeholders.

use crate::directives::split_operands;
use crate::error::{Error, ErrorKind};
use crate::expr::{Evaluator, Mode};
use crate::fixup::{Fixup, FixupKind};
use crate::symtab::SymbolTable;
use z80::{InstructionKind, InstructionTable, ReservedSet};

pub struct EncodeResult {
    pub bytes: Vec<u8>,
    pub fixups: Vec<Fixup>,
}

/// A marker token substituted for an ambiguous-width operand while the key
/// is being built; replaced with the byte or word placeholder once we know
/// which one matched. Not a legal source token, so it can't collide.
const AMBIG_MARKER: &str = "\0ambig\0";

enum Part {
    /// Fully structural tokens: a register, a condition code, or a bare
    /// memory-indirect register form like `(hl)`.
    Plain(Vec<String>),
    /// `(ix + expr)` / `(iy + expr)`; displacement is always a byte.
    Indexed { reg: String, expr: Vec<String> },
    /// `(expr)` where `expr` isn't an indexed-register form: an absolute
    /// memory address (word) or an I/O port address (byte) — ambiguous.
    Paren(Vec<String>),
    /// A bare expression with no surrounding parentheses: an immediate,
    /// ambiguous unless it's the second half of a `LD (IX+d), n` pair.
    Bare(Vec<String>),
}

fn classify_group(group: Vec<String>, reserved: &ReservedSet) -> Part {
    if group.len() == 1 && (reserved.is_register(&group[0]) || reserved.is_condition(&group[0])) {
        return Part::Plain(group);
    }
    if group.len() >= 2 && group[0] == "(" && group[group.len() - 1] == ")" {
        let inner = &group[1..group.len() - 1];
        if inner.len() == 1 && reserved.is_register(&inner[0]) {
            return Part::Plain(group);
        }
        if inner.len() >= 3 && (inner[0] == "ix" || inner[0] == "iy") && (inner[1] == "+" || inner[1] == "-") {
            let reg = inner[0].clone();
            let mut expr = inner[2..].to_vec();
            if inner[1] == "-" {
                expr.insert(0, "-".to_string());
            }
            return Part::Indexed { reg, expr };
        }
        return Part::Paren(inner.to_vec());
    }
    Part::Bare(group)
}

fn normalize(token: &str, reserved: &ReservedSet) -> String {
    if reserved.is_reserved(token) {
        token.to_ascii_lowercase()
    } else {
        token.to_string()
    }
}

/// Evaluates an expression that must be fully known right now (used for
/// `bit`/`res`/`set`/`rst`/`im`'s opcode-selecting operand, not a fixup).
fn resolve_literal_now(tokens: &[String], symtab: &SymbolTable, reserved: &ReservedSet, line: usize) -> Result<i64, Error> {
    let symbols = symtab.as_map();
    let mut ev = Evaluator::new(tokens, Mode::Pass2 { symbols: &symbols }, reserved, line);
    let (value, consumed) = ev.evaluate().map_err(|k| Error::new(line, k))?;
    if consumed != tokens.len() {
        return Err(Error::new(line, ErrorKind::MalformedLiteral(tokens.join(" "))));
    }
    Ok(value)
}

struct PendingFixup {
    slot: u8,
    expr_tokens: Vec<String>,
}

pub fn encode_instruction(tokens: &[String], reserved: &ReservedSet, symtab: &SymbolTable, line: usize) -> Result<EncodeResult, Error> {
    let mnemonic = normalize(&tokens[0], reserved);
    let operand_tokens = &tokens[1..];
    let table = InstructionTable::get();

    match mnemonic.as_str() {
        "bit" | "res" | "set" => {
            let groups = split_operands(operand_tokens);
            if groups.len() != 2 {
                return Err(Error::new(line, ErrorKind::NoMatchingInstruction));
            }
            let bit = resolve_literal_now(&groups[0], symtab, reserved, line)?;
            if !(0..=7).contains(&bit) {
                return Err(Error::new(line, ErrorKind::OperandOutOfRange { value: bit, low: 0, high: 7 }));
            }
            let dest = classify_group(groups[1].clone(), reserved);
            let mut key = vec![mnemonic.clone(), bit.to_string(), ",".to_string()];
            let (tail_key, fixups) = encode_single_destination(dest, reserved, line)?;
            key.extend(tail_key);
            finish(table, &key, &fixups, line)
        }
        "rst" => {
            let groups = split_operands(operand_tokens);
            if groups.len() != 1 {
                return Err(Error::new(line, ErrorKind::NoMatchingInstruction));
            }
            let vector = resolve_literal_now(&groups[0], symtab, reserved, line)?;
            if !(0..=56).contains(&vector) || vector % 8 != 0 {
                return Err(Error::new(line, ErrorKind::OperandOutOfRange { value: vector, low: 0, high: 56 }));
            }
            let key = vec![mnemonic.clone(), format!("0x{:02x}", vector)];
            finish(table, &key, &[], line)
        }
        "im" => {
            let groups = split_operands(operand_tokens);
            if groups.len() != 1 {
                return Err(Error::new(line, ErrorKind::NoMatchingInstruction));
            }
            let mode = resolve_literal_now(&groups[0], symtab, reserved, line)?;
            if !(0..=2).contains(&mode) {
                return Err(Error::new(line, ErrorKind::OperandOutOfRange { value: mode, low: 0, high: 2 }));
            }
            let key = vec![mnemonic.clone(), mode.to_string()];
            finish(table, &key, &[], line)
        }
        _ => {
            let groups = split_operands(operand_tokens);
            let parts: Vec<Part> = groups.into_iter().map(|g| classify_group(g, reserved)).collect();
            let (key, fixups) = build_key(&mnemonic, parts, reserved, line)?;
            finish(table, &key, &fixups, line)
        }
    }
}

/// Builds the tail-key tokens (and any fixup) for a single destination
/// operand, used by `bit`/`res`/`set` after the literal bit index.
fn encode_single_destination(part: Part, reserved: &ReservedSet, line: usize) -> Result<(Vec<String>, Vec<PendingFixup>), Error> {
    match part {
        Part::Plain(toks) => Ok((toks.iter().map(|t| normalize(t, reserved)).collect(), Vec::new())),
        Part::Indexed { reg, expr } => {
            let key = vec!["(".to_string(), reg, "+".to_string(), "0x{0}".to_string(), ")".to_string()];
            Ok((key, vec![PendingFixup { slot: 0, expr_tokens: expr }]))
        }
        Part::Paren(_) | Part::Bare(_) => Err(Error::new(line, ErrorKind::NoMatchingInstruction)),
    }
}

fn build_key(mnemonic: &str, parts: Vec<Part>, reserved: &ReservedSet, line: usize) -> Result<(Vec<String>, Vec<PendingFixup>), Error> {
    let mut key = vec![mnemonic.to_string()];
    let mut fixups: Vec<PendingFixup> = Vec::new();
    let mut ambiguous: Option<(usize, Vec<String>)> = None;

    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(",".to_string());
        }
        match part {
            Part::Plain(toks) => key.extend(toks.iter().map(|t| normalize(t, reserved))),
            Part::Indexed { reg, expr } => {
                key.push("(".to_string());
                key.push(reg);
                key.push("+".to_string());
                key.push("0x{0}".to_string());
                key.push(")".to_string());
                fixups.push(PendingFixup { slot: 0, expr_tokens: expr });
            }
            Part::Paren(expr) => {
                if fixups.is_empty() && ambiguous.is_none() {
                    key.push("(".to_string());
                    let marker_idx = key.len();
                    key.push(AMBIG_MARKER.to_string());
                    key.push(")".to_string());
                    ambiguous = Some((marker_idx, expr));
                } else {
                    return Err(Error::new(line, ErrorKind::NoMatchingInstruction));
                }
            }
            Part::Bare(expr) => {
                if fixups.is_empty() && ambiguous.is_none() {
                    let marker_idx = key.len();
                    key.push(AMBIG_MARKER.to_string());
                    ambiguous = Some((marker_idx, expr));
                } else {
                    key.push("0x{1}".to_string());
                    fixups.push(PendingFixup { slot: 1, expr_tokens: expr });
                }
            }
        }
    }

    if let Some((marker_idx, expr)) = ambiguous {
        let mut key_byte = key.clone();
        key_byte[marker_idx] = "0x{0}".to_string();
        if InstructionTable::get().encode_lookup(&key_byte).is_some() {
            let mut f = fixups;
            f.push(PendingFixup { slot: 0, expr_tokens: expr });
            return Ok((key_byte, f));
        }
        let mut key_word = key.clone();
        key_word[marker_idx] = "0x{1}{0}".to_string();
        let mut f = fixups;
        f.push(PendingFixup { slot: 0, expr_tokens: expr });
        Ok((key_word, f))
    } else {
        Ok((key, fixups))
    }
}

fn finish(table: &InstructionTable, key: &[String], fixups: &[PendingFixup], line: usize) -> Result<EncodeResult, Error> {
    let descriptor = table.encode_lookup(key).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
    let mut bytes = descriptor.code.clone();
    let mut final_fixups = Vec::new();

    match descriptor.kind {
        InstructionKind::None => {}
        InstructionKind::ByteImm | InstructionKind::Rel8 => {
            let f = fixups.iter().find(|f| f.slot == 0).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
            let kind = if descriptor.kind == InstructionKind::Rel8 { FixupKind::Rel8 } else { FixupKind::Byte };
            final_fixups.push(Fixup { offset: bytes.len(), size: 1, kind, expr_tokens: f.expr_tokens.clone() });
            bytes.push(0);
        }
        InstructionKind::WordImm | InstructionKind::AbsJmp => {
            let f = fixups.iter().find(|f| f.slot == 0).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
            final_fixups.push(Fixup { offset: bytes.len(), size: 2, kind: FixupKind::Word, expr_tokens: f.expr_tokens.clone() });
            bytes.push(0);
            bytes.push(0);
        }
        InstructionKind::ByteByte => {
            let f0 = fixups.iter().find(|f| f.slot == 0).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
            final_fixups.push(Fixup { offset: bytes.len(), size: 1, kind: FixupKind::Byte, expr_tokens: f0.expr_tokens.clone() });
            bytes.push(0);
            let f1 = fixups.iter().find(|f| f.slot == 1).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
            final_fixups.push(Fixup { offset: bytes.len(), size: 1, kind: FixupKind::Byte, expr_tokens: f1.expr_tokens.clone() });
            bytes.push(0);
        }
        InstructionKind::DdCbExt => {
            let f0 = fixups.iter().find(|f| f.slot == 0).ok_or_else(|| Error::new(line, ErrorKind::NoMatchingInstruction))?;
            final_fixups.push(Fixup { offset: bytes.len(), size: 1, kind: FixupKind::Byte, expr_tokens: f0.expr_tokens.clone() });
            bytes.push(0);
            bytes.push(descriptor.ext.expect("DdCbExt descriptor must carry an ext byte"));
        }
    }

    Ok(EncodeResult { bytes, fixups: final_fixups })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symtab::Binding;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn encodes_plain_instruction() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["nop"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0x00]);
        assert!(r.fixups.is_empty());
    }

    #[test]
    fn encodes_word_immediate_register_pair() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["ld", "hl", ",", "0x1234"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0x21, 0, 0]);
        assert_eq!(r.fixups.len(), 1);
        assert_eq!(r.fixups[0].size, 2);
    }

    #[test]
    fn encodes_byte_port_address() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["in", "a", ",", "(", "0x10", ")"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0xDB, 0]);
        assert_eq!(r.fixups[0].size, 1);
    }

    #[test]
    fn encodes_indexed_displacement_and_immediate() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["ld", "(", "ix", "+", "10", ")", ",", "0x42"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0xDD, 0x36, 0, 0]);
        assert_eq!(r.fixups.len(), 2);
    }

    #[test]
    fn encodes_ddcb_bit_instruction() {
        let reserved = ReservedSet::new();
        let mut symtab = SymbolTable::new();
        symtab.define("N", Binding::Equ(0)).unwrap();
        let r = encode_instruction(&toks(&["set", "0", ",", "(", "ix", "+", "10", ")"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0xDD, 0xCB, 0, 0xC6]);
        assert_eq!(r.fixups.len(), 1);
    }

    #[test]
    fn encodes_rst_vector_from_literal() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["rst", "0x38"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0xFF]);
        assert!(r.fixups.is_empty());
    }

    #[test]
    fn rejects_unknown_operand_shape() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        // ADD HL only takes a register-pair operand; no immediate form exists.
        let err = encode_instruction(&toks(&["add", "hl", ",", "5"]), &reserved, &symtab, 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMatchingInstruction);
    }

    #[test]
    fn jr_resolves_to_rel8_kind() {
        let reserved = ReservedSet::new();
        let symtab = SymbolTable::new();
        let r = encode_instruction(&toks(&["jr", "LOOP"]), &reserved, &symtab, 1).unwrap();
        assert_eq!(r.bytes, vec![0x18, 0]);
        assert_eq!(r.fixups[0].kind, FixupKind::Rel8);
    }
}
