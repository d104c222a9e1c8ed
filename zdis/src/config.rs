//! Hand-parsed `-c <config>` text format: `[data]` address ranges to render
//! as bytes instead of code, and `[chr]` byte-to-character overrides for
//! the `db` comment column.
//!
//! A small hand-rolled text format rather than a serde-based one — there's
//! not enough here (two sections, a handful of `lo-hi`/`HH=c` lines) to earn
//! a parsing dependency.

use crate::error::{Error, ErrorKind};

const DEFAULT_CHR: fn(u8) -> char = |b| if (0x20..=0x7e).contains(&b) { b as char } else { '.' };

#[derive(Debug, Clone, Default)]
pub struct Config {
    data: Vec<(u16, u16)>,
    chr: std::collections::HashMap<u8, char>,
}

impl Config {
    pub fn empty() -> Self {
        Config::default()
    }

    pub fn parse(text: &str) -> Result<Config, Error> {
        let mut config = Config::default();
        let mut section: Option<&str> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                match name {
                    "data" | "chr" => section = Some(if name == "data" { "data" } else { "chr" }),
                    other => return Err(Error(ErrorKind::UnknownConfigSection(other.to_string()))),
                }
                continue;
            }
            match section {
                Some("data") => config.push_range(line)?,
                Some("chr") => config.push_chr(line)?,
                _ => return Err(Error(ErrorKind::MalformedConfigLine(line.to_string()))),
            }
        }
        Ok(config)
    }

    fn push_range(&mut self, line: &str) -> Result<(), Error> {
        let (lo_str, hi_str) = line.split_once('-').ok_or_else(|| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        let lo = parse_addr(lo_str).ok_or_else(|| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        let hi = parse_addr(hi_str).ok_or_else(|| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        if lo > hi {
            return Err(Error(ErrorKind::InvalidDataRange { lo, hi }));
        }
        self.data.push((lo, hi));
        Ok(())
    }

    fn push_chr(&mut self, line: &str) -> Result<(), Error> {
        let (byte_str, ch_str) = line.split_once('=').ok_or_else(|| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        let byte = u8::from_str_radix(byte_str.trim(), 16).map_err(|_| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        let ch = ch_str.chars().next().ok_or_else(|| Error(ErrorKind::MalformedConfigLine(line.to_string())))?;
        self.chr.insert(byte, ch);
        Ok(())
    }

    pub fn in_data_range(&self, addr: u16) -> bool {
        self.data.iter().any(|&(lo, hi)| addr >= lo && addr <= hi)
    }

    pub fn chr(&self, byte: u8) -> char {
        self.chr.get(&byte).copied().unwrap_or_else(|| DEFAULT_CHR(byte))
    }
}

fn parse_addr(token: &str) -> Option<u16> {
    let token = token.trim();
    let lower = token.to_ascii_lowercase();
    let value = if let Some(rest) = lower.strip_prefix("0x") {
        u32::from_str_radix(rest, 16).ok()?
    } else {
        lower.parse::<u32>().ok()?
    };
    u16::try_from(value).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_data_and_chr_sections() {
        let config = Config::parse("[data]\n0x4000-0x4010\n0x9000-0x9000\n\n[chr]\n41=A\n0A=.\n").unwrap();
        assert!(config.in_data_range(0x4000));
        assert!(config.in_data_range(0x4010));
        assert!(config.in_data_range(0x9000));
        assert!(!config.in_data_range(0x4011));
        assert_eq!(config.chr(0x41), 'A');
    }

    #[test]
    fn rejects_inverted_range() {
        let err = Config::parse("[data]\n0x10-0x05\n").unwrap_err();
        assert_eq!(err.0, ErrorKind::InvalidDataRange { lo: 0x10, hi: 0x05 });
    }

    #[test]
    fn single_byte_range_is_valid() {
        let config = Config::parse("[data]\n0x9000-0x9000\n").unwrap();
        assert!(config.in_data_range(0x9000));
        assert!(!config.in_data_range(0x9001));
    }

    #[test]
    fn default_chr_map_dots_nonprintable() {
        let config = Config::empty();
        assert_eq!(config.chr(0x41), 'A');
        assert_eq!(config.chr(0x00), '.');
    }
}
