use std::fmt;

/// The distinct failure modes an assembly run can hit, grouped roughly by
/// which stage detects them (tokenizer / pass-0 / expression evaluator /
/// encoder / directive handler / I/O).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnterminatedLiteral,
    ReservedWordAsLabel(String),
    DuplicateLabel(String),
    InvalidIdentifier(String),
    InvalidOrgAddress,
    InvalidEquValue,
    MismatchedParentheses,
    DivisionByZero,
    ReservedInExpression(String),
    UndefinedSymbol(String),
    UndefinedLabel(String),
    InvalidCharLiteral,
    MalformedLiteral(String),
    NoMatchingInstruction,
    OperandOutOfRange { value: i64, low: i64, high: i64 },
    RelativeJumpOutOfRange(i64),
    DbValueOutOfRange(i64),
    DwValueOutOfRange(i64),
    DwStringLength(usize),
    SourceNotFound(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnterminatedLiteral => write!(f, "unterminated string or char literal"),
            ErrorKind::ReservedWordAsLabel(w) => write!(f, "\"{}\" is a reserved word and cannot be used as a label", w),
            ErrorKind::DuplicateLabel(w) => write!(f, "label \"{}\" is already defined", w),
            ErrorKind::InvalidIdentifier(w) => write!(f, "\"{}\" is not a valid identifier", w),
            ErrorKind::InvalidOrgAddress => write!(f, "ORG requires a single literal address"),
            ErrorKind::InvalidEquValue => write!(f, "EQU value must be in [0, 65535]"),
            ErrorKind::MismatchedParentheses => write!(f, "mismatched parentheses in expression"),
            ErrorKind::DivisionByZero => write!(f, "division by zero"),
            ErrorKind::ReservedInExpression(w) => write!(f, "reserved word \"{}\" cannot appear in an expression", w),
            ErrorKind::UndefinedSymbol(w) => write!(f, "undefined symbol \"{}\"", w),
            ErrorKind::UndefinedLabel(w) => write!(f, "undefined label \"{}\"", w),
            ErrorKind::InvalidCharLiteral => write!(f, "character literal must be 1 or 2 characters"),
            ErrorKind::MalformedLiteral(w) => write!(f, "malformed literal \"{}\"", w),
            ErrorKind::NoMatchingInstruction => write!(f, "no matching instruction for this operand form"),
            ErrorKind::OperandOutOfRange { value, low, high } => {
                write!(f, "operand value {} is out of range [{}, {}]", value, low, high)
            }
            ErrorKind::RelativeJumpOutOfRange(delta) => write!(f, "relative jump offset {} is out of range [-128, 127]", delta),
            ErrorKind::DbValueOutOfRange(v) => write!(f, "DB value {} is out of range [0, 255]", v),
            ErrorKind::DwValueOutOfRange(v) => write!(f, "DW value {} is out of range [0, 65535]", v),
            ErrorKind::DwStringLength(n) => write!(f, "DW string literal must be 1 or 2 characters, got {}", n),
            ErrorKind::SourceNotFound(p) => write!(f, "source file not found: {}", p),
        }
    }
}

/// An assembly error, always attributed to a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub line: usize,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(line: usize, kind: ErrorKind) -> Self {
        Error { line, kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
