//! The disassembly decode loop: longest-match decoding via the shared
//! instruction table, a data-region override that takes priority over
//! decoding, and a post-pass that turns `0x{..}` operand fills on
//! jump/call/branch instructions into `L_hhhh` label references.

use crate::config::Config;
use z80::table::{InstructionDescriptor, InstructionKind, InstructionTable};

/// One line of disassembly output: the address it starts at, the raw bytes
/// it consumed (empty for the synthesized leading `ORG` line), the label
/// defined at this address (if any other line refers to it), and the
/// rendered assembly text.
#[derive(Debug, Clone)]
pub struct DecodedLine {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub label: Option<String>,
    pub asm: String,
}

/// Disassembles `buf`, whose first byte lands at address `start`, using
/// `config` to carve out data regions and override the `db` comment
/// character map. Always begins with a label-less, byte-less `ORG` line.
pub fn disassemble(buf: &[u8], start: u16, config: &Config) -> Vec<DecodedLine> {
    let table = InstructionTable::get();
    let mut lines = vec![DecodedLine {
        address: start,
        bytes: Vec::new(),
        label: None,
        asm: format!("ORG 0x{:04X}", start),
    }];

    let mut offset: usize = 0;
    while offset < buf.len() {
        let address = start.wrapping_add(offset as u16);

        if config.in_data_range(address) {
            let byte = buf[offset];
            let ch = config.chr(byte);
            lines.push(DecodedLine {
                address,
                bytes: vec![byte],
                label: None,
                asm: format!("DB 0x{:02X} ; [{}]", byte, ch),
            });
            offset += 1;
            continue;
        }

        let window = &buf[offset..];
        match table.decode_lookup(window) {
            Some(descriptor) if window.len() >= descriptor.bytes => {
                let consumed = &window[..descriptor.bytes];
                let asm = render(descriptor, consumed, address);
                lines.push(DecodedLine { address, bytes: consumed.to_vec(), label: None, asm });
                offset += descriptor.bytes;
            }
            _ => {
                let byte = buf[offset];
                lines.push(DecodedLine {
                    address,
                    bytes: vec![byte],
                    label: None,
                    asm: format!("DB 0x{:02X} ; Invalid Opcode", byte),
                });
                offset += 1;
            }
        }
    }

    backpatch_labels(&mut lines);
    lines
}

/// Fills in a descriptor's template against the bytes it actually matched.
/// `Rel8`/`AbsJmp` replace the whole `0x{..}` operand fill with an
/// `L_hhhh` label reference (the jump target becomes a label, not a
/// literal), every other kind just hex-fills the `{0}`/`{1}` placeholders
/// left inside the template's own `0x` prefix.
fn render(descriptor: &InstructionDescriptor, window: &[u8], address: u16) -> String {
    let op_start = descriptor.code.len();
    match descriptor.kind {
        InstructionKind::None => descriptor.template.clone(),
        InstructionKind::ByteImm => descriptor.template.replace("{0}", &hex2(window[op_start])),
        InstructionKind::WordImm => descriptor
            .template
            .replace("{1}", &hex2(window[op_start + 1]))
            .replace("{0}", &hex2(window[op_start])),
        InstructionKind::ByteByte => descriptor
            .template
            .replace("{0}", &hex2(window[op_start]))
            .replace("{1}", &hex2(window[op_start + 1])),
        InstructionKind::DdCbExt => descriptor.template.replace("{0}", &hex2(window[op_start])),
        InstructionKind::Rel8 => {
            let disp = window[op_start] as i8;
            let target = (address as i32).wrapping_add(2).wrapping_add(disp as i32) as u16;
            descriptor.template.replace("0x{0}", &label_ref(target))
        }
        InstructionKind::AbsJmp => {
            let target = window[op_start] as u16 | ((window[op_start + 1] as u16) << 8);
            descriptor.template.replace("0x{1}{0}", &label_ref(target))
        }
    }
}

fn hex2(byte: u8) -> String {
    format!("{:02X}", byte)
}

fn label_ref(address: u16) -> String {
    format!("L_{:04X}", address)
}

/// Scans every rendered line's assembly text for `L_hhhh` references,
/// then sets `label` on any emitted line whose own address is among the
/// referenced set. References to addresses with no emitted line are left
/// as dangling text — they still read fine, they just don't get a
/// corresponding `label:` line.
fn backpatch_labels(lines: &mut [DecodedLine]) {
    let mut targets = std::collections::HashSet::new();
    for line in lines.iter() {
        targets.extend(find_label_refs(&line.asm));
    }
    for line in lines.iter_mut() {
        if targets.contains(&line.address) {
            line.label = Some(format!("L_{:04X}:", line.address));
        }
    }
}

/// Hand-scans ASCII text for the literal pattern `L_` followed by exactly
/// four hex digits, returning the addresses those references name.
fn find_label_refs(text: &str) -> Vec<u16> {
    let bytes = text.as_bytes();
    let mut refs = Vec::new();
    let mut i = 0;
    while i + 6 <= bytes.len() {
        if &bytes[i..i + 2] == b"L_" {
            let digits = &bytes[i + 2..i + 6];
            if digits.iter().all(|b| b.is_ascii_hexdigit()) {
                let hex = std::str::from_utf8(digits).unwrap();
                if let Ok(addr) = u16::from_str_radix(hex, 16) {
                    refs.push(addr);
                }
                i += 6;
                continue;
            }
        }
        i += 1;
    }
    refs
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_nop_and_halt() {
        let config = Config::empty();
        let lines = disassemble(&[0x00, 0x76], 0, &config);
        assert_eq!(lines[0].asm, "ORG 0x0000");
        assert_eq!(lines[1].asm, "NOP");
        assert_eq!(lines[2].asm, "HALT");
    }

    #[test]
    fn decodes_byte_immediate_load() {
        let config = Config::empty();
        let lines = disassemble(&[0x3E, 0x42], 0, &config);
        assert_eq!(lines[1].asm, "LD A, 0x42");
        assert_eq!(lines[1].bytes, vec![0x3E, 0x42]);
    }

    #[test]
    fn decodes_word_immediate_load() {
        let config = Config::empty();
        let lines = disassemble(&[0x21, 0x34, 0x12], 0, &config);
        assert_eq!(lines[1].asm, "LD HL, 0x1234");
    }

    #[test]
    fn jr_forward_becomes_label_reference() {
        let config = Config::empty();
        // JR +1 at address 0: next_pc = 2, target = 3
        let lines = disassemble(&[0x18, 0x01, 0x00, 0x76], 0, &config);
        assert_eq!(lines[1].asm, "JR L_0003");
        assert_eq!(lines[3].label.as_deref(), Some("L_0003:"));
    }

    #[test]
    fn jp_absolute_becomes_label_reference() {
        let config = Config::empty();
        let lines = disassemble(&[0xC3, 0x00, 0x00], 0, &config);
        assert_eq!(lines[1].asm, "JP L_0000");
        assert_eq!(lines[0].label.as_deref(), Some("L_0000:"));
    }

    #[test]
    fn dangling_reference_gets_no_label() {
        let config = Config::empty();
        let lines = disassemble(&[0xC3, 0xFF, 0xFF], 0, &config);
        assert_eq!(lines[1].asm, "JP L_FFFF");
        assert!(lines.iter().all(|l| l.label.is_none()));
    }

    #[test]
    fn invalid_opcode_emits_db_comment() {
        let config = Config::empty();
        // 0xED 0xFF is not a documented ED-prefixed form.
        let lines = disassemble(&[0xED, 0xFF], 0, &config);
        assert!(lines[1].asm.contains("Invalid Opcode"));
        assert_eq!(lines[1].bytes, vec![0xED]);
    }

    #[test]
    fn data_range_overrides_decoding() {
        let mut config_text = String::from("[data]\n0x0000-0x0000\n");
        config_text.push_str("[chr]\n41=A\n");
        let config = Config::parse(&config_text).unwrap();
        let lines = disassemble(&[0x41, 0x76], 0, &config);
        assert_eq!(lines[1].asm, "DB 0x41 ; [A]");
        assert_eq!(lines[2].asm, "HALT");
    }

    #[test]
    fn ddcb_displacement_renders_in_template() {
        let config = Config::empty();
        let lines = disassemble(&[0xDD, 0xCB, 0x05, 0x46], 0, &config);
        assert!(lines[1].asm.starts_with("BIT 0, (IX+0x05)"));
    }
}
