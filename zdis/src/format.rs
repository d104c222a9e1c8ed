//! Turns a decoded line stream into the final text report.
//!
//! The renderer is a pluggable [`OutputFormatter`] trait rather than a
//! single fixed layout, so library callers can supply their own report
//! format. The CLI always uses [`default_formatter`]/[`compact_formatter`].

use crate::decode::DecodedLine;

/// Renders a full decoded program to its final text form.
pub trait OutputFormatter {
    fn format(&self, lines: &[DecodedLine]) -> String;
}

/// The default five-column layout: address, up to four opcode bytes (hex,
/// space-separated), the label column, and the assembly text.
pub struct DefaultFormatter;

impl OutputFormatter for DefaultFormatter {
    fn format(&self, lines: &[DecodedLine]) -> String {
        let mut out = String::new();
        for line in lines {
            let bytes_col: String = line.bytes.iter().map(|b| format!("{:02X} ", b)).collect();
            let label_col = line.label.clone().unwrap_or_default();
            out.push_str(&format!("0x{:04X}  {:<12}{:<8}{}\n", line.address, bytes_col, label_col, line.asm));
        }
        out
    }
}

/// The `-n` layout: opcode bytes are dropped, a label gets its own line,
/// and instruction lines (everything but the leading `ORG` and bare
/// labels) are indented four spaces.
pub struct CompactFormatter;

impl OutputFormatter for CompactFormatter {
    fn format(&self, lines: &[DecodedLine]) -> String {
        let mut out = String::new();
        for line in lines {
            if let Some(label) = &line.label {
                out.push_str(label);
                out.push('\n');
            }
            if line.asm.starts_with("ORG ") {
                out.push_str(&line.asm);
                out.push('\n');
            } else {
                out.push_str("    ");
                out.push_str(&line.asm);
                out.push('\n');
            }
        }
        out
    }
}

pub fn default_formatter() -> DefaultFormatter {
    DefaultFormatter
}

pub fn compact_formatter() -> CompactFormatter {
    CompactFormatter
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::decode::disassemble;

    #[test]
    fn default_formatter_includes_bytes_and_address() {
        let config = Config::empty();
        let lines = disassemble(&[0x00], 0, &config);
        let text = DefaultFormatter.format(&lines);
        assert!(text.contains("0x0000"));
        assert!(text.contains("ORG 0x0000"));
        assert!(text.contains("NOP"));
        assert!(text.contains("00"));
    }

    #[test]
    fn compact_formatter_indents_instructions_only() {
        let config = Config::empty();
        let lines = disassemble(&[0x00], 0, &config);
        let text = CompactFormatter.format(&lines);
        assert!(text.contains("ORG 0x0000\n"));
        assert!(text.contains("    NOP\n"));
    }

    #[test]
    fn compact_formatter_emits_label_line() {
        let config = Config::empty();
        let lines = disassemble(&[0xC3, 0x00, 0x00], 0, &config);
        let text = CompactFormatter.format(&lines);
        assert!(text.contains("L_0000:\n"));
    }
}
