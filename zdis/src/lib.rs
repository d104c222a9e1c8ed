//! Z80 disassembler: longest-match decode loop, data-region overrides, and
//! `L_hhhh` label back-patching.
//!
//! [`disassemble`] runs the decode loop with the built-in formatter;
//! library callers that want a custom report layout can call
//! [`disassemble_lines`] directly and feed the result to their own
//! [`OutputFormatter`].

pub mod config;
pub mod decode;
pub mod error;
pub mod format;

pub use config::Config;
pub use decode::{disassemble as disassemble_lines, DecodedLine};
pub use error::{Error, ErrorKind, Result};
pub use format::{compact_formatter, default_formatter, OutputFormatter};

/// Disassembles `buf` (loaded at `start`) and renders it with `formatter`.
pub fn disassemble_with(buf: &[u8], start: u16, config: &Config, formatter: &dyn OutputFormatter) -> String {
    let lines = disassemble_lines(buf, start, config);
    formatter.format(&lines)
}

/// Disassembles `buf` (loaded at `start`) using the default five-column
/// report layout.
pub fn disassemble(buf: &[u8], start: u16, config: &Config) -> String {
    disassemble_with(buf, start, config, &format::DefaultFormatter)
}
