//! `DB`/`DEFB` and `DW`/`DEFW` operand handling.
//!
//! `DB` evaluates each operand as a full expression (not just a literal) so
//! labels and arithmetic work as operands, not just in `DW`. `DW`'s pass-1
//! single-token literal shortcut: a lone numeric or 1–2 character literal
//! token is encoded immediately; anything else (a label, an expression,
//! multiple tokens) becomes a `00 00` placeholder plus a fixup.

use crate::error::{Error, ErrorKind};
use crate::expr::parse_integer;
use crate::fixup::{Fixup, FixupKind};
use crate::tokenizer;

pub struct DirectiveResult {
    pub bytes: Vec<u8>,
    pub fixups: Vec<Fixup>,
}

/// Splits operand tokens (after the mnemonic) on top-level commas. `DB`/`DW`
/// operands never contain parentheses, so no depth tracking is needed here.
/// Also used by `encode` to split an instruction's operand tokens, where
/// parenthesized groups never contain a comma either.
pub(crate) fn split_operands(tokens: &[String]) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token == "," {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(token.clone());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

pub fn process_db_pass1(operand_tokens: &[String], line: usize) -> Result<DirectiveResult, Error> {
    let mut bytes = Vec::new();
    let mut fixups = Vec::new();

    for group in split_operands(operand_tokens) {
        if group.len() == 1 && tokenizer::is_literal(&group[0]) {
            let decoded = tokenizer::decode_literal_bytes(&group[0]).map_err(|k| Error::new(line, k))?;
            bytes.extend(decoded);
            continue;
        }
        if group.len() == 1 {
            if let Some(v) = parse_integer(&group[0]) {
                if !(0..=255).contains(&v) {
                    return Err(Error::new(line, ErrorKind::DbValueOutOfRange(v)));
                }
                bytes.push(v as u8);
                continue;
            }
        }
        let offset = bytes.len();
        bytes.push(0);
        fixups.push(Fixup { offset, size: 1, kind: FixupKind::Byte, expr_tokens: group });
    }

    Ok(DirectiveResult { bytes, fixups })
}

pub fn process_dw_pass1(operand_tokens: &[String], line: usize) -> Result<DirectiveResult, Error> {
    let mut bytes = Vec::new();
    let mut fixups = Vec::new();

    for group in split_operands(operand_tokens) {
        if group.len() == 1 {
            if tokenizer::is_literal(&group[0]) {
                let decoded = tokenizer::decode_literal_bytes(&group[0]).map_err(|k| Error::new(line, k))?;
                let value: i64 = match decoded.len() {
                    1 => decoded[0] as i64,
                    2 => ((decoded[0] as i64) << 8) | decoded[1] as i64,
                    n => return Err(Error::new(line, ErrorKind::DwStringLength(n))),
                };
                bytes.push((value & 0xFF) as u8);
                bytes.push(((value >> 8) & 0xFF) as u8);
                continue;
            }
            if let Some(v) = parse_integer(&group[0]) {
                if !(0..=65535).contains(&v) {
                    return Err(Error::new(line, ErrorKind::DwValueOutOfRange(v)));
                }
                bytes.push((v & 0xFF) as u8);
                bytes.push(((v >> 8) & 0xFF) as u8);
                continue;
            }
        }
        let offset = bytes.len();
        bytes.push(0);
        bytes.push(0);
        fixups.push(Fixup { offset, size: 2, kind: FixupKind::Word, expr_tokens: group });
    }

    Ok(DirectiveResult { bytes, fixups })
}

#[cfg(test)]
mod test {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn db_mixes_literals_and_strings() {
        let r = process_db_pass1(&toks(&["1", ",", "\"AB\"", ",", "255"]), 1).unwrap();
        assert_eq!(r.bytes, vec![1, b'A', b'B', 255]);
        assert!(r.fixups.is_empty());
    }

    #[test]
    fn db_out_of_range_is_rejected() {
        let err = process_db_pass1(&toks(&["256"]), 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DbValueOutOfRange(256));
    }

    #[test]
    fn db_label_operand_becomes_a_fixup() {
        let r = process_db_pass1(&toks(&["LOOP"]), 1).unwrap();
        assert_eq!(r.bytes, vec![0]);
        assert_eq!(r.fixups.len(), 1);
        assert_eq!(r.fixups[0].size, 1);
    }

    #[test]
    fn dw_literal_is_encoded_directly() {
        let r = process_dw_pass1(&toks(&["0x1234"]), 1).unwrap();
        assert_eq!(r.bytes, vec![0x34, 0x12]);
        assert!(r.fixups.is_empty());
    }

    #[test]
    fn dw_char_literal_is_encoded_directly() {
        let r = process_dw_pass1(&toks(&["'A'"]), 1).unwrap();
        assert_eq!(r.bytes, vec![b'A', 0]);
    }

    #[test]
    fn dw_expression_becomes_a_placeholder_and_fixup() {
        let r = process_dw_pass1(&toks(&["5", "+", "VAL", "*", "2"]), 1).unwrap();
        assert_eq!(r.bytes, vec![0, 0]);
        assert_eq!(r.fixups.len(), 1);
        assert_eq!(r.fixups[0].size, 2);
    }

    #[test]
    fn dw_out_of_range_literal_is_rejected() {
        let err = process_dw_pass1(&toks(&["65536"]), 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DwValueOutOfRange(65536));
    }
}
