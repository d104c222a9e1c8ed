use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDataRange { lo: u16, hi: u16 },
    MalformedConfigLine(String),
    UnknownConfigSection(String),
    BufferTooLarge(usize),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidDataRange { lo, hi } => write!(f, "data range 0x{:04X}-0x{:04X} has lo > hi", lo, hi),
            ErrorKind::MalformedConfigLine(l) => write!(f, "malformed config line: \"{}\"", l),
            ErrorKind::UnknownConfigSection(s) => write!(f, "unknown config section \"[{}]\"", s),
            ErrorKind::BufferTooLarge(n) => write!(f, "concatenated image is {} bytes, exceeds the 64 KiB address space", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error(pub ErrorKind);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
