//! The Z80 instruction table: every documented opcode in the base, `CB`,
//! `ED`, `DD`, `FD`, `DDCB`, and `FDCB` families, indexed two ways —
//! by normalized mnemonic tokens (for the assembler's encoder) and by
//! opcode bytes (for the disassembler's decoder).
//!
//! Built from the standard `x`/`y`/`z`/`q`/`p` bitfield decomposition of an
//! opcode byte (Young's Z80 opcode decoding scheme) rather than a literal
//! opcode-by-opcode table, so each instruction family's shape only needs to
//! be written once.

use crate::types::Byte;
use std::collections::HashMap;
use std::sync::OnceLock;

/// How a decoded/encoded instruction's trailing operand bytes, if any,
/// should be interpreted. Carried as a real enum (rather than a cluster of
/// optional fields) so both the encoder and the decoder match it
/// exhaustively instead of relying on field-presence conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// No trailing operand byte(s); the mnemonic and any registers are
    /// fully determined by the opcode bytes alone.
    None,
    /// One trailing byte, an 8-bit immediate or `(IX+d)`/`(IY+d)` displacement.
    ByteImm,
    /// Two trailing bytes, a little-endian 16-bit immediate or address.
    WordImm,
    /// One trailing byte, a signed PC-relative displacement (`JR`, `DJNZ`).
    Rel8,
    /// Two trailing bytes, a little-endian absolute code address (`JP`, `CALL`).
    AbsJmp,
    /// Two trailing bytes: an `(IX+d)`/`(IY+d)` displacement followed by an
    /// 8-bit immediate, used only by the `LD (IX+d), n` / `LD (IY+d), n`
    /// family. Needed because that form needs two independent byte fixups
    /// where every other `DD`/`FD` form needs at most one.
    ByteByte,
    /// `DD CB d xx` / `FD CB d xx`: a displacement byte followed by a fixed
    /// extension byte that select the sub-operation; the extension byte is
    /// part of the descriptor's identity, not a decoded operand.
    DdCbExt,
}

/// One row of the instruction table: the fixed opcode bytes, the total
/// encoded length, how to interpret any trailing operand bytes, and the
/// human-readable template used by the disassembler (`{0}`/`{1}` stand in
/// for trailing operand bytes, filled in by `zdis`).
#[derive(Debug, Clone)]
pub struct InstructionDescriptor {
    pub code: Vec<Byte>,
    pub bytes: usize,
    pub kind: InstructionKind,
    /// Fixed extension byte for `DdCbExt` rows; `None` otherwise.
    pub ext: Option<Byte>,
    pub template: String,
}

impl InstructionDescriptor {
    fn new(code: Vec<Byte>, bytes: usize, kind: InstructionKind, template: &str) -> Self {
        InstructionDescriptor { code, bytes, kind, ext: None, template: template.to_string() }
    }

    fn with_ext(code: Vec<Byte>, bytes: usize, ext: Byte, template: &str) -> Self {
        InstructionDescriptor { code, bytes, kind: InstructionKind::DdCbExt, ext: Some(ext), template: template.to_string() }
    }
}

/// The shared instruction table, indexed both for encoding (by normalized
/// mnemonic token sequence) and for decoding (by opcode bytes).
pub struct InstructionTable {
    entries: Vec<InstructionDescriptor>,
    encode: HashMap<Vec<String>, usize>,
    decode1: HashMap<Byte, usize>,
    decode2: HashMap<(Byte, Byte), usize>,
    decode_ddcb: HashMap<(Byte, Byte), usize>,
}

static TABLE: OnceLock<InstructionTable> = OnceLock::new();

impl InstructionTable {
    /// Returns the process-wide instruction table, building it once.
    pub fn get() -> &'static InstructionTable {
        TABLE.get_or_init(Builder::build)
    }

    /// Looks up a descriptor by its normalized, tokenized mnemonic form,
    /// e.g. `["ld", "a", ",", "0x{0}"]` for `LD A, n`.
    pub fn encode_lookup(&self, key: &[String]) -> Option<&InstructionDescriptor> {
        self.encode.get(key).map(|&i| &self.entries[i])
    }

    /// Looks up a descriptor for decoding, given up to four bytes starting
    /// at the current address. Tries the `DD`/`FD CB` extended form first
    /// (a distinct key shape, skipping the displacement byte), then a
    /// 2-byte key, then a 1-byte key — the same longest-match-first order
    /// `disasm.py::op2asm` uses.
    pub fn decode_lookup(&self, window: &[Byte]) -> Option<&InstructionDescriptor> {
        if window.len() >= 4 && (window[0] == 0xDD || window[0] == 0xFD) && window[1] == 0xCB {
            if let Some(&i) = self.decode_ddcb.get(&(window[0], window[3])) {
                return Some(&self.entries[i]);
            }
        }
        if window.len() >= 2 {
            if let Some(&i) = self.decode2.get(&(window[0], window[1])) {
                return Some(&self.entries[i]);
            }
        }
        if !window.is_empty() {
            if let Some(&i) = self.decode1.get(&window[0]) {
                return Some(&self.entries[i]);
            }
        }
        None
    }
}

const R8: [&str; 8] = ["b", "c", "d", "e", "h", "l", "(hl)", "a"];
const RP: [&str; 4] = ["bc", "de", "hl", "sp"];
const RP2: [&str; 4] = ["bc", "de", "hl", "af"];
const CC8: [&str; 8] = ["nz", "z", "nc", "c", "po", "pe", "p", "m"];
const CC4: [&str; 4] = ["nz", "z", "nc", "c"];
const ROT: [&str; 8] = ["rlc", "rrc", "rl", "rr", "sla", "sra", "sll", "srl"];
/// (mnemonic, takes an explicit `A,` prefix in both source and template)
const ALU: [(&str, bool); 8] = [
    ("add", true),
    ("adc", true),
    ("sub", false),
    ("sbc", true),
    ("and", false),
    ("xor", false),
    ("or", false),
    ("cp", false),
];

fn tok(s: &str) -> String {
    s.to_string()
}

fn toks(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| tok(w)).collect()
}

/// Tokens for a plain `r8` operand: a bare register, or `( hl )` as three
/// tokens, matching how the tokenizer pads parentheses with spaces.
fn r8_tokens(idx: usize) -> Vec<String> {
    if idx == 6 {
        toks(&["(", "hl", ")"])
    } else {
        toks(&[R8[idx]])
    }
}

/// Tokens for an indexed `(ix+d)`/`(iy+d)` memory operand.
fn indexed_mem_tokens(reg: &str) -> Vec<String> {
    toks(&["(", reg, "+", "0x{0}", ")"])
}

struct Builder {
    entries: Vec<InstructionDescriptor>,
    encode: HashMap<Vec<String>, usize>,
    decode1: HashMap<Byte, usize>,
    decode2: HashMap<(Byte, Byte), usize>,
    decode_ddcb: HashMap<(Byte, Byte), usize>,
}

impl Builder {
    fn build() -> InstructionTable {
        let mut b = Builder {
            entries: Vec::new(),
            encode: HashMap::new(),
            decode1: HashMap::new(),
            decode2: HashMap::new(),
            decode_ddcb: HashMap::new(),
        };
        b.base_table();
        b.cb_table();
        b.ed_table();
        b.indexed_table(0xDD, "ix");
        b.indexed_table(0xFD, "iy");
        InstructionTable {
            entries: b.entries,
            encode: b.encode,
            decode1: b.decode1,
            decode2: b.decode2,
            decode_ddcb: b.decode_ddcb,
        }
    }

    /// Registers one descriptor under both an encode key and the decode
    /// index appropriate for its code-byte length. `canonical` controls
    /// whether this exact encoding wins the encode-side slot for its key
    /// (used to skip registering undocumented opcode duplicates as the
    /// thing the assembler would emit).
    fn push(&mut self, key: Vec<String>, desc: InstructionDescriptor, canonical: bool) {
        let idx = self.entries.len();
        match desc.code.len() {
            1 => {
                self.decode1.entry(desc.code[0]).or_insert(idx);
            }
            2 => {
                self.decode2.entry((desc.code[0], desc.code[1])).or_insert(idx);
            }
            _ => unreachable!("descriptor code prefix must be 1 or 2 bytes"),
        }
        if canonical {
            self.encode.insert(key, idx);
        }
        self.entries.push(desc);
    }

    fn push_ddcb(&mut self, key: Vec<String>, desc: InstructionDescriptor) {
        let idx = self.entries.len();
        let prefix = desc.code[0];
        let ext = desc.ext.expect("DdCbExt descriptor must carry ext byte");
        self.decode_ddcb.entry((prefix, ext)).or_insert(idx);
        self.encode.insert(key, idx);
        self.entries.push(desc);
    }

    // ---- base (unprefixed) table -----------------------------------

    fn base_table(&mut self) {
        for op in 0u16..256 {
            let op = op as u8;
            let x = op >> 6;
            let y = (op >> 3) & 7;
            let z = op & 7;
            let p = y >> 1;
            let q = y & 1;

            match (x, z) {
                (0, 0) => match y {
                    0 => self.push(toks(&["nop"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "NOP"), true),
                    1 => self.push(toks(&["ex", "af", ",", "af'"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "EX AF, AF'"), true),
                    2 => self.push(toks(&["djnz", "0x{0}"]), InstructionDescriptor::new(vec![op], 2, InstructionKind::Rel8, "DJNZ 0x{0}"), true),
                    3 => self.push(toks(&["jr", "0x{0}"]), InstructionDescriptor::new(vec![op], 2, InstructionKind::Rel8, "JR 0x{0}"), true),
                    cc => {
                        let cc = CC4[(cc - 4) as usize];
                        self.push(
                            toks(&["jr", cc, ",", "0x{0}"]),
                            InstructionDescriptor::new(vec![op], 2, InstructionKind::Rel8, &format!("JR {}, 0x{{0}}", cc.to_uppercase())),
                            true,
                        );
                    }
                },
                (0, 1) => {
                    if q == 0 {
                        let rp = RP[p as usize];
                        self.push(
                            toks(&["ld", rp, ",", "0x{1}{0}"]),
                            InstructionDescriptor::new(vec![op], 3, InstructionKind::WordImm, &format!("LD {}, 0x{{1}}{{0}}", rp.to_uppercase())),
                            true,
                        );
                    } else {
                        let rp = RP[p as usize];
                        self.push(
                            toks(&["add", "hl", ",", rp]),
                            InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("ADD HL, {}", rp.to_uppercase())),
                            true,
                        );
                    }
                }
                (0, 2) => {
                    let (key, template): (Vec<String>, String) = match (q, p) {
                        (0, 0) => (toks(&["ld", "(", "bc", ")", ",", "a"]), "LD (BC), A".into()),
                        (0, 1) => (toks(&["ld", "(", "de", ")", ",", "a"]), "LD (DE), A".into()),
                        (0, 2) => (toks(&["ld", "(", "0x{1}{0}", ")", ",", "hl"]), "LD (0x{1}{0}), HL".into()),
                        (0, 3) => (toks(&["ld", "(", "0x{1}{0}", ")", ",", "a"]), "LD (0x{1}{0}), A".into()),
                        (1, 0) => (toks(&["ld", "a", ",", "(", "bc", ")"]), "LD A, (BC)".into()),
                        (1, 1) => (toks(&["ld", "a", ",", "(", "de", ")"]), "LD A, (DE)".into()),
                        (1, 2) => (toks(&["ld", "hl", ",", "(", "0x{1}{0}", ")"]), "LD HL, (0x{1}{0})".into()),
                        (1, 3) => (toks(&["ld", "a", ",", "(", "0x{1}{0}", ")"]), "LD A, (0x{1}{0})".into()),
                        _ => unreachable!(),
                    };
                    let has_word = p == 2 || p == 3;
                    let kind = if has_word { InstructionKind::WordImm } else { InstructionKind::None };
                    let bytes = if has_word { 3 } else { 1 };
                    self.push(key, InstructionDescriptor::new(vec![op], bytes, kind, &template), true);
                }
                (0, 3) => {
                    let rp = RP[p as usize];
                    let mnm = if q == 0 { "inc" } else { "dec" };
                    self.push(
                        toks(&[mnm, rp]),
                        InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("{} {}", mnm.to_uppercase(), rp.to_uppercase())),
                        true,
                    );
                }
                (0, 4) => self.r8_unary(op, y, "inc"),
                (0, 5) => self.r8_unary(op, y, "dec"),
                (0, 6) => {
                    let mut key = vec![tok("ld")];
                    key.extend(r8_tokens(y as usize));
                    key.push(tok(","));
                    key.push(tok("0x{0}"));
                    let reg = if y as usize == 6 { "(HL)".to_string() } else { R8[y as usize].to_uppercase() };
                    self.push(key, InstructionDescriptor::new(vec![op], 2, InstructionKind::ByteImm, &format!("LD {}, 0x{{0}}", reg)), true);
                }
                (0, 7) => {
                    let (mnm, template) = [
                        ("rlca", "RLCA"),
                        ("rrca", "RRCA"),
                        ("rla", "RLA"),
                        ("rra", "RRA"),
                        ("daa", "DAA"),
                        ("cpl", "CPL"),
                        ("scf", "SCF"),
                        ("ccf", "CCF"),
                    ][y as usize];
                    self.push(toks(&[mnm]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, template), true);
                }
                (1, _) => {
                    if z == 6 && y == 6 {
                        self.push(toks(&["halt"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "HALT"), true);
                    } else {
                        let mut key = vec![tok("ld")];
                        key.extend(r8_tokens(y as usize));
                        key.push(tok(","));
                        key.extend(r8_tokens(z as usize));
                        let dst = if y == 6 { "(HL)".to_string() } else { R8[y as usize].to_uppercase() };
                        let src = if z == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                        self.push(key, InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("LD {}, {}", dst, src)), true);
                    }
                }
                (2, _) => {
                    let (mnm, prefixed) = ALU[y as usize];
                    let mut key = vec![tok(mnm)];
                    if prefixed {
                        key.push(tok("a"));
                        key.push(tok(","));
                    }
                    key.extend(r8_tokens(z as usize));
                    let operand = if z as usize == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                    let template = if prefixed {
                        format!("{} A, {}", mnm.to_uppercase(), operand)
                    } else {
                        format!("{} {}", mnm.to_uppercase(), operand)
                    };
                    self.push(key, InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &template), true);
                }
                (3, 0) => {
                    let cc = CC8[y as usize];
                    self.push(
                        toks(&["ret", cc]),
                        InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("RET {}", cc.to_uppercase())),
                        true,
                    );
                }
                (3, 1) => {
                    if q == 0 {
                        let rp2 = RP2[p as usize];
                        self.push(
                            toks(&["pop", rp2]),
                            InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("POP {}", rp2.to_uppercase())),
                            true,
                        );
                    } else {
                        match p {
                            0 => self.push(toks(&["ret"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "RET"), true),
                            1 => self.push(toks(&["exx"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "EXX"), true),
                            2 => self.push(toks(&["jp", "(", "hl", ")"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "JP (HL)"), true),
                            3 => self.push(toks(&["ld", "sp", ",", "hl"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "LD SP, HL"), true),
                            _ => unreachable!(),
                        }
                    }
                }
                (3, 2) => {
                    let cc = CC8[y as usize];
                    self.push(
                        toks(&["jp", cc, ",", "0x{1}{0}"]),
                        InstructionDescriptor::new(vec![op], 3, InstructionKind::AbsJmp, &format!("JP {}, 0x{{1}}{{0}}", cc.to_uppercase())),
                        true,
                    );
                }
                (3, 3) => match y {
                    0 => self.push(toks(&["jp", "0x{1}{0}"]), InstructionDescriptor::new(vec![op], 3, InstructionKind::AbsJmp, "JP 0x{1}{0}"), true),
                    1 => { /* 0xCB prefix: handled by cb_table */ }
                    2 => self.push(toks(&["out", "(", "0x{0}", ")", ",", "a"]), InstructionDescriptor::new(vec![op], 2, InstructionKind::ByteImm, "OUT (0x{0}), A"), true),
                    3 => self.push(toks(&["in", "a", ",", "(", "0x{0}", ")"]), InstructionDescriptor::new(vec![op], 2, InstructionKind::ByteImm, "IN A, (0x{0})"), true),
                    4 => self.push(toks(&["ex", "(", "sp", ")", ",", "hl"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "EX (SP), HL"), true),
                    5 => self.push(toks(&["ex", "de", ",", "hl"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "EX DE, HL"), true),
                    6 => self.push(toks(&["di"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "DI"), true),
                    7 => self.push(toks(&["ei"]), InstructionDescriptor::new(vec![op], 1, InstructionKind::None, "EI"), true),
                    _ => unreachable!(),
                },
                (3, 4) => {
                    let cc = CC8[y as usize];
                    self.push(
                        toks(&["call", cc, ",", "0x{1}{0}"]),
                        InstructionDescriptor::new(vec![op], 3, InstructionKind::AbsJmp, &format!("CALL {}, 0x{{1}}{{0}}", cc.to_uppercase())),
                        true,
                    );
                }
                (3, 5) => {
                    if q == 0 {
                        let rp2 = RP2[p as usize];
                        self.push(
                            toks(&["push", rp2]),
                            InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("PUSH {}", rp2.to_uppercase())),
                            true,
                        );
                    } else if p == 0 {
                        self.push(toks(&["call", "0x{1}{0}"]), InstructionDescriptor::new(vec![op], 3, InstructionKind::AbsJmp, "CALL 0x{1}{0}"), true);
                    }
                    // p in 1..=3 at q=1 (0xDD/0xED/0xFD prefixes) handled elsewhere.
                }
                (3, 6) => {
                    let (mnm, prefixed) = ALU[y as usize];
                    let mut key = vec![tok(mnm)];
                    if prefixed {
                        key.push(tok("a"));
                        key.push(tok(","));
                    }
                    key.push(tok("0x{0}"));
                    let template = if prefixed {
                        format!("{} A, 0x{{0}}", mnm.to_uppercase())
                    } else {
                        format!("{} 0x{{0}}", mnm.to_uppercase())
                    };
                    self.push(key, InstructionDescriptor::new(vec![op], 2, InstructionKind::ByteImm, &template), true);
                }
                (3, 7) => {
                    let vector = y * 8;
                    self.push(
                        toks(&["rst", &format!("0x{:02x}", vector)]),
                        InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("RST 0x{:02X}", vector)),
                        true,
                    );
                }
                _ => {}
            }
        }
    }

    fn r8_unary(&mut self, op: Byte, y: Byte, mnm: &str) {
        let mut key = vec![tok(mnm)];
        key.extend(r8_tokens(y as usize));
        let reg = if y as usize == 6 { "(HL)".to_string() } else { R8[y as usize].to_uppercase() };
        self.push(key, InstructionDescriptor::new(vec![op], 1, InstructionKind::None, &format!("{} {}", mnm.to_uppercase(), reg)), true);
    }

    // ---- CB-prefixed table (rotate/shift, BIT, RES, SET) ------------

    fn cb_table(&mut self) {
        for op in 0u16..256 {
            let op = op as u8;
            let x = op >> 6;
            let y = (op >> 3) & 7;
            let z = op & 7;
            let code = vec![0xCB, op];

            match x {
                0 => {
                    let mnm = ROT[y as usize];
                    let mut k = vec![tok(mnm)];
                    k.extend(r8_tokens(z as usize));
                    let reg = if z as usize == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                    self.push(k, InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("{} {}", mnm.to_uppercase(), reg)), true);
                }
                1 => {
                    let mut k = vec![tok("bit"), tok(&y.to_string()), tok(",")];
                    k.extend(r8_tokens(z as usize));
                    let reg = if z as usize == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                    self.push(k, InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("BIT {}, {}", y, reg)), true);
                }
                2 => {
                    let mut k = vec![tok("res"), tok(&y.to_string()), tok(",")];
                    k.extend(r8_tokens(z as usize));
                    let reg = if z as usize == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                    self.push(k, InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("RES {}, {}", y, reg)), true);
                }
                3 => {
                    let mut k = vec![tok("set"), tok(&y.to_string()), tok(",")];
                    k.extend(r8_tokens(z as usize));
                    let reg = if z as usize == 6 { "(HL)".to_string() } else { R8[z as usize].to_uppercase() };
                    self.push(k, InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("SET {}, {}", y, reg)), true);
                }
                _ => {}
            }
        }
    }

    // ---- ED-prefixed table (I/O, 16-bit arithmetic, block ops) ------

    fn ed_table(&mut self) {
        for op in 0u16..256 {
            let op = op as u8;
            let x = op >> 6;
            let y = (op >> 3) & 7;
            let z = op & 7;
            let p = y >> 1;
            let q = y & 1;
            let code = vec![0xED, op];

            if x == 1 {
                match z {
                    0 => {
                        if y == 6 {
                            self.push(toks(&["in", "(", "c", ")"]), InstructionDescriptor::new(code, 2, InstructionKind::None, "IN (C)"), true);
                        } else {
                            let r = R8[y as usize];
                            self.push(
                                toks(&["in", r, ",", "(", "c", ")"]),
                                InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("IN {}, (C)", r.to_uppercase())),
                                true,
                            );
                        }
                    }
                    1 => {
                        if y == 6 {
                            self.push(toks(&["out", "(", "c", ")", ",", "0"]), InstructionDescriptor::new(code, 2, InstructionKind::None, "OUT (C), 0"), true);
                        } else {
                            let r = R8[y as usize];
                            self.push(
                                toks(&["out", "(", "c", ")", ",", r]),
                                InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("OUT (C), {}", r.to_uppercase())),
                                true,
                            );
                        }
                    }
                    2 => {
                        let rp = RP[p as usize];
                        let mnm = if q == 0 { "sbc" } else { "adc" };
                        self.push(
                            toks(&[mnm, "hl", ",", rp]),
                            InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("{} HL, {}", mnm.to_uppercase(), rp.to_uppercase())),
                            true,
                        );
                    }
                    3 => {
                        let rp = RP[p as usize];
                        if q == 0 {
                            self.push(
                                toks(&["ld", "(", "0x{1}{0}", ")", ",", rp]),
                                InstructionDescriptor::new(code, 4, InstructionKind::WordImm, &format!("LD (0x{{1}}{{0}}), {}", rp.to_uppercase())),
                                true,
                            );
                        } else {
                            self.push(
                                toks(&["ld", rp, ",", "(", "0x{1}{0}", ")"]),
                                InstructionDescriptor::new(code, 4, InstructionKind::WordImm, &format!("LD {}, (0x{{1}}{{0}})", rp.to_uppercase())),
                                true,
                            );
                        }
                    }
                    4 => {
                        self.push(toks(&["neg"]), InstructionDescriptor::new(code, 2, InstructionKind::None, "NEG"), y == 0);
                    }
                    5 => {
                        if y == 1 {
                            self.push(toks(&["reti"]), InstructionDescriptor::new(code, 2, InstructionKind::None, "RETI"), true);
                        } else {
                            self.push(toks(&["retn"]), InstructionDescriptor::new(code, 2, InstructionKind::None, "RETN"), y == 0);
                        }
                    }
                    6 => {
                        let (mode, canonical) = match y {
                            0 | 4 => (0, y == 0),
                            1 | 5 => (0, false),
                            2 | 6 => (1, y == 2),
                            3 | 7 => (2, y == 3),
                            _ => unreachable!(),
                        };
                        self.push(toks(&["im", &mode.to_string()]), InstructionDescriptor::new(code, 2, InstructionKind::None, &format!("IM {}", mode)), canonical);
                    }
                    7 => {
                        let (key, template): (Vec<String>, &str) = match y {
                            0 => (toks(&["ld", "i", ",", "a"]), "LD I, A"),
                            1 => (toks(&["ld", "r", ",", "a"]), "LD R, A"),
                            2 => (toks(&["ld", "a", ",", "i"]), "LD A, I"),
                            3 => (toks(&["ld", "a", ",", "r"]), "LD A, R"),
                            4 => (toks(&["rrd"]), "RRD"),
                            5 => (toks(&["rld"]), "RLD"),
                            _ => (toks(&["nop"]), "NOP"),
                        };
                        self.push(key, InstructionDescriptor::new(code, 2, InstructionKind::None, template), y <= 5);
                    }
                    _ => {}
                }
            } else if x == 2 && y >= 4 {
                let names: [&str; 4] = match y {
                    4 => ["ldi", "cpi", "ini", "outi"],
                    5 => ["ldd", "cpd", "ind", "outd"],
                    6 => ["ldir", "cpir", "inir", "otir"],
                    7 => ["lddr", "cpdr", "indr", "otdr"],
                    _ => unreachable!(),
                };
                if (z as usize) < names.len() {
                    let mnm = names[z as usize];
                    self.push(toks(&[mnm]), InstructionDescriptor::new(code, 2, InstructionKind::None, &mnm.to_uppercase()), true);
                }
            }
        }
    }

    // ---- DD/FD-prefixed table (IX/IY forms) --------------------------

    fn indexed_table(&mut self, prefix: Byte, reg: &str) {
        let reg_u = reg.to_uppercase();

        // LD ix, nn
        self.push(
            toks(&["ld", reg, ",", "0x{1}{0}"]),
            InstructionDescriptor::new(vec![prefix, 0x21], 4, InstructionKind::WordImm, &format!("LD {}, 0x{{1}}{{0}}", reg_u)),
            true,
        );
        // LD (nn), ix
        self.push(
            toks(&["ld", "(", "0x{1}{0}", ")", ",", reg]),
            InstructionDescriptor::new(vec![prefix, 0x22], 4, InstructionKind::WordImm, &format!("LD (0x{{1}}{{0}}), {}", reg_u)),
            true,
        );
        // LD ix, (nn)
        self.push(
            toks(&["ld", reg, ",", "(", "0x{1}{0}", ")"]),
            InstructionDescriptor::new(vec![prefix, 0x2A], 4, InstructionKind::WordImm, &format!("LD {}, (0x{{1}}{{0}})", reg_u)),
            true,
        );
        // INC/DEC ix
        self.push(toks(&["inc", reg]), InstructionDescriptor::new(vec![prefix, 0x23], 2, InstructionKind::None, &format!("INC {}", reg_u)), true);
        self.push(toks(&["dec", reg]), InstructionDescriptor::new(vec![prefix, 0x2B], 2, InstructionKind::None, &format!("DEC {}", reg_u)), true);

        // ADD ix, rp (bc, de, ix, sp)
        let add_rp: [(&str, Byte); 4] = [("bc", 0x09), ("de", 0x19), (reg, 0x29), ("sp", 0x39)];
        for (rp, opc) in add_rp {
            let rp_u = if rp == reg { reg_u.clone() } else { rp.to_uppercase() };
            self.push(
                toks(&["add", reg, ",", rp]),
                InstructionDescriptor::new(vec![prefix, opc], 2, InstructionKind::None, &format!("ADD {}, {}", reg_u, rp_u)),
                true,
            );
        }

        // INC/DEC (ix+d)
        self.push(
            {
                let mut k = vec![tok("inc")];
                k.extend(indexed_mem_tokens(reg));
                k
            },
            InstructionDescriptor::new(vec![prefix, 0x34], 3, InstructionKind::ByteImm, &format!("INC ({}+0x{{0}})", reg_u)),
            true,
        );
        self.push(
            {
                let mut k = vec![tok("dec")];
                k.extend(indexed_mem_tokens(reg));
                k
            },
            InstructionDescriptor::new(vec![prefix, 0x35], 3, InstructionKind::ByteImm, &format!("DEC ({}+0x{{0}})", reg_u)),
            true,
        );

        // LD (ix+d), n
        self.push(
            {
                let mut k = vec![tok("ld")];
                k.extend(indexed_mem_tokens(reg));
                k.push(tok(","));
                k.push(tok("0x{1}"));
                k
            },
            InstructionDescriptor::new(vec![prefix, 0x36], 4, InstructionKind::ByteByte, &format!("LD ({}+0x{{0}}), 0x{{1}}", reg_u)),
            true,
        );

        // LD r, (ix+d) / LD (ix+d), r for r in b,c,d,e,a (the documented set)
        for &ridx in &[0usize, 1, 2, 3, 7] {
            let r = R8[ridx];
            let base_ld = 0x46 | ((ridx as u8) << 3); // LD r, (HL) with z=6 -> LD r, (ix+d)
            self.push(
                {
                    let mut k = vec![tok("ld"), tok(r), tok(",")];
                    k.extend(indexed_mem_tokens(reg));
                    k
                },
                InstructionDescriptor::new(vec![prefix, base_ld], 3, InstructionKind::ByteImm, &format!("LD {}, ({}+0x{{0}})", r.to_uppercase(), reg_u)),
                true,
            );
            let base_st = 0x70 | (ridx as u8); // LD (HL), r -> LD (ix+d), r
            self.push(
                {
                    let mut k = vec![tok("ld")];
                    k.extend(indexed_mem_tokens(reg));
                    k.push(tok(","));
                    k.push(tok(r));
                    k
                },
                InstructionDescriptor::new(vec![prefix, base_st], 3, InstructionKind::ByteImm, &format!("LD ({}+0x{{0}}), {}", reg_u, r.to_uppercase())),
                true,
            );
        }

        // ALU A, (ix+d)
        for (y, (mnm, prefixed)) in ALU.iter().enumerate() {
            let opc = 0x86 | ((y as u8) << 3);
            let mut k = vec![tok(mnm)];
            if *prefixed {
                k.push(tok("a"));
                k.push(tok(","));
            }
            k.extend(indexed_mem_tokens(reg));
            let template = if *prefixed {
                format!("{} A, ({}+0x{{0}})", mnm.to_uppercase(), reg_u)
            } else {
                format!("{} ({}+0x{{0}})", mnm.to_uppercase(), reg_u)
            };
            self.push(k, InstructionDescriptor::new(vec![prefix, opc], 3, InstructionKind::ByteImm, &template), true);
        }

        // POP/PUSH/EX (SP)/JP ()/LD SP,
        self.push(toks(&["pop", reg]), InstructionDescriptor::new(vec![prefix, 0xE1], 2, InstructionKind::None, &format!("POP {}", reg_u)), true);
        self.push(toks(&["push", reg]), InstructionDescriptor::new(vec![prefix, 0xE5], 2, InstructionKind::None, &format!("PUSH {}", reg_u)), true);
        self.push(
            toks(&["ex", "(", "sp", ")", ",", reg]),
            InstructionDescriptor::new(vec![prefix, 0xE3], 2, InstructionKind::None, &format!("EX (SP), {}", reg_u)),
            true,
        );
        self.push(
            toks(&["jp", "(", reg, ")"]),
            InstructionDescriptor::new(vec![prefix, 0xE9], 2, InstructionKind::None, &format!("JP ({})", reg_u)),
            true,
        );
        self.push(toks(&["ld", "sp", ",", reg]), InstructionDescriptor::new(vec![prefix, 0xF9], 2, InstructionKind::None, &format!("LD SP, {}", reg_u)), true);

        self.indexed_cb_table(prefix, reg, &reg_u);
    }

    /// `DD CB d xx` / `FD CB d xx`: rotate/shift/BIT/RES/SET on `(ix+d)`/`(iy+d)`.
    /// Only the documented (memory-only-result) forms are registered; the
    /// undocumented "also copies into an 8-bit register" duplicates are not.
    fn indexed_cb_table(&mut self, prefix: Byte, reg: &str, reg_u: &str) {
        for ext in 0u16..256 {
            let ext = ext as u8;
            let x = ext >> 6;
            let y = (ext >> 3) & 7;
            let z = ext & 7;
            if z != 6 {
                continue; // undocumented register-copy duplicates, skipped
            }
            let (key, template): (Vec<String>, String) = match x {
                0 => {
                    let mnm = ROT[y as usize];
                    let mut k = vec![tok(mnm)];
                    k.extend(indexed_mem_tokens(reg));
                    (k, format!("{} ({}+0x{{0}})", mnm.to_uppercase(), reg_u))
                }
                1 => {
                    let mut k = vec![tok("bit"), tok(&y.to_string()), tok(",")];
                    k.extend(indexed_mem_tokens(reg));
                    (k, format!("BIT {}, ({}+0x{{0}})", y, reg_u))
                }
                2 => {
                    let mut k = vec![tok("res"), tok(&y.to_string()), tok(",")];
                    k.extend(indexed_mem_tokens(reg));
                    (k, format!("RES {}, ({}+0x{{0}})", y, reg_u))
                }
                3 => {
                    let mut k = vec![tok("set"), tok(&y.to_string()), tok(",")];
                    k.extend(indexed_mem_tokens(reg));
                    (k, format!("SET {}, ({}+0x{{0}})", y, reg_u))
                }
                _ => continue,
            };
            self.push_ddcb(key, InstructionDescriptor::with_ext(vec![prefix, 0xCB], 4, ext, &template));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_nop_by_both_keys() {
        let table = InstructionTable::get();
        let d = table.encode_lookup(&toks(&["nop"])).expect("nop encodes");
        assert_eq!(d.code, vec![0x00]);
        let d = table.decode_lookup(&[0x00]).expect("nop decodes");
        assert_eq!(d.template, "NOP");
    }

    #[test]
    fn finds_ld_a_immediate() {
        let table = InstructionTable::get();
        let key = toks(&["ld", "a", ",", "0x{0}"]);
        let d = table.encode_lookup(&key).expect("ld a, n encodes");
        assert_eq!(d.code, vec![0x3E]);
        assert_eq!(d.bytes, 2);
        assert_eq!(d.kind, InstructionKind::ByteImm);
    }

    #[test]
    fn finds_cb_bit_instruction() {
        let table = InstructionTable::get();
        let d = table.decode_lookup(&[0xCB, 0x7C]).expect("bit 7, h decodes");
        assert_eq!(d.template, "BIT 7, H");
    }

    #[test]
    fn finds_ddcb_bit_instruction_by_special_key() {
        let table = InstructionTable::get();
        // DD CB d 46 = BIT 0, (IX+d); the ext byte (index 3) selects the op,
        // the displacement (index 2) is skipped during the key lookup.
        let d = table.decode_lookup(&[0xDD, 0xCB, 0x05, 0x46]).expect("bit 0, (ix+d) decodes");
        assert!(d.template.starts_with("BIT 0, (IX"));
    }

    #[test]
    fn finds_jp_nn_as_abs_jmp() {
        let table = InstructionTable::get();
        let d = table.decode_lookup(&[0xC3, 0x00, 0x80]).expect("jp nn decodes");
        assert_eq!(d.kind, InstructionKind::AbsJmp);
    }

    #[test]
    fn finds_ld_indexed_displacement_and_immediate() {
        let table = InstructionTable::get();
        let d = table.decode_lookup(&[0xDD, 0x36]).expect("ld (ix+d), n decodes");
        assert_eq!(d.kind, InstructionKind::ByteByte);
        assert_eq!(d.bytes, 4);
    }

    #[test]
    fn rst_vector_is_part_of_the_opcode_key() {
        let table = InstructionTable::get();
        let d0 = table.encode_lookup(&toks(&["rst", "0x00"])).expect("rst 0x00 encodes");
        let d38 = table.encode_lookup(&toks(&["rst", "0x38"])).expect("rst 0x38 encodes");
        assert_eq!(d0.code, vec![0xC7]);
        assert_eq!(d38.code, vec![0xFF]);
    }
}
