//! The closed set of words the tokenizer and expression evaluator must
//! never treat as user symbols: register names, register-pair names,
//! condition codes, and mnemonics. Lookup is case-insensitive.

use std::collections::HashSet;

const REGISTERS_8: &[&str] = &["a", "b", "c", "d", "e", "h", "l", "i", "r", "ixh", "ixl", "iyh", "iyl"];
const REGISTERS_16: &[&str] = &["af", "bc", "de", "hl", "sp", "ix", "iy", "af'"];
const CONDITIONS: &[&str] = &["nz", "z", "nc", "c", "po", "pe", "p", "m"];

const MNEMONICS: &[&str] = &[
    "nop", "halt", "di", "ei", "daa", "cpl", "scf", "ccf", "exx", "rlca", "rrca", "rla", "rra",
    "neg", "reti", "retn", "rld", "rrd", "ld", "push", "push", "pop", "ex", "add", "adc", "sub",
    "sbc", "and", "xor", "or", "cp", "inc", "dec", "jp", "jr", "djnz", "call", "ret", "rst", "in",
    "out", "im", "rlc", "rrc", "rl", "rr", "sla", "sra", "sll", "srl", "bit", "res", "set",
    "ldi", "ldd", "ldir", "lddr", "cpi", "cpd", "cpir", "cpdr", "ini", "ind", "inir", "indr",
    "outi", "outd", "otir", "otdr",
];

const DIRECTIVES: &[&str] = &["org", "equ", "db", "dw", "end"];

/// A closed, case-insensitive vocabulary of words that can never be used as
/// a user-defined label or `EQU` symbol name.
pub struct ReservedSet {
    words: HashSet<String>,
}

impl ReservedSet {
    pub fn new() -> Self {
        let mut words = HashSet::new();
        for group in [REGISTERS_8, REGISTERS_16, CONDITIONS, MNEMONICS, DIRECTIVES] {
            for word in group {
                words.insert(word.to_ascii_lowercase());
            }
        }
        ReservedSet { words }
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_lowercase())
    }

    pub fn is_register(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        REGISTERS_8.contains(&lower.as_str()) || REGISTERS_16.contains(&lower.as_str())
    }

    pub fn is_condition(&self, word: &str) -> bool {
        CONDITIONS.contains(&word.to_ascii_lowercase().as_str())
    }
}

impl Default for ReservedSet {
    fn default() -> Self {
        ReservedSet::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registers_are_reserved() {
        let set = ReservedSet::new();
        assert!(set.is_reserved("A"));
        assert!(set.is_reserved("hl"));
        assert!(set.is_register("IX"));
    }

    #[test]
    fn conditions_are_reserved_but_not_registers() {
        let set = ReservedSet::new();
        assert!(set.is_reserved("NZ"));
        assert!(set.is_condition("nz"));
        assert!(!set.is_register("nz"));
    }

    #[test]
    fn ordinary_labels_are_not_reserved() {
        let set = ReservedSet::new();
        assert!(!set.is_reserved("LOOP"));
        assert!(!set.is_reserved("start_addr"));
    }
}
