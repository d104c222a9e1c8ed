//! Line → token sequence.
//!
//! Lifts string/char literals first (so a `;` inside a literal can't start
//! a comment), strips the comment, pads `( ) : , + - * /` with spaces, then
//! splits on whitespace. A single character scan handles all of this in one
//! pass, with no placeholder bookkeeping needed.

use crate::error::ErrorKind;

const PUNCTUATION: &str = "():,+-*/";

/// Converts one source line into its token sequence. The tokenizer carries
/// no state across calls.
pub fn tokenize(line: &str) -> Result<Vec<String>, ErrorKind> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    let mut tokens = Vec::new();
    let mut current = String::new();

    while i < chars.len() {
        let c = chars[i];
        if c == ';' {
            break;
        }
        if c == '"' || c == '\'' {
            flush(&mut current, &mut tokens);
            let quote = c;
            let mut literal = String::new();
            literal.push(c);
            i += 1;
            let mut closed = false;
            while i < chars.len() {
                let ch = chars[i];
                if ch == '\\' && i + 1 < chars.len() {
                    literal.push(ch);
                    literal.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if ch == quote {
                    literal.push(ch);
                    i += 1;
                    closed = true;
                    break;
                }
                literal.push(ch);
                i += 1;
            }
            if !closed {
                return Err(ErrorKind::UnterminatedLiteral);
            }
            tokens.push(literal);
            continue;
        }
        if PUNCTUATION.contains(c) {
            flush(&mut current, &mut tokens);
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            flush(&mut current, &mut tokens);
            i += 1;
            continue;
        }
        current.push(c);
        i += 1;
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// True if `token` is a quoted string/char literal produced by [`tokenize`].
pub fn is_literal(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next_back()) {
        (Some('"'), Some('"')) | (Some('\''), Some('\'')) => token.len() >= 2,
        _ => false,
    }
}

/// Decodes a quoted literal's escapes into raw bytes, dropping the quotes.
pub fn decode_literal_bytes(token: &str) -> Result<Vec<u8>, ErrorKind> {
    let inner = &token[1..token.len() - 1];
    let mut out = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push(b'\n'),
                Some('t') => out.push(b'\t'),
                Some('\\') => out.push(b'\\'),
                Some('"') => out.push(b'"'),
                Some('\'') => out.push(b'\''),
                Some(other) => {
                    return Err(ErrorKind::MalformedLiteral(format!("\\{}", other)));
                }
                None => return Err(ErrorKind::MalformedLiteral(token.to_string())),
            }
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_and_pads_punctuation() {
        let tokens = tokenize("ld (hl), a").unwrap();
        assert_eq!(tokens, vec!["ld", "(", "hl", ")", ",", "a"]);
    }

    #[test]
    fn strips_comments() {
        let tokens = tokenize("nop ; this is a comment").unwrap();
        assert_eq!(tokens, vec!["nop"]);
    }

    #[test]
    fn lifts_string_literal_before_comment_strip() {
        let tokens = tokenize(r#"db "a;b""#).unwrap();
        assert_eq!(tokens, vec!["db", "\"a;b\""]);
    }

    #[test]
    fn unterminated_literal_is_an_error() {
        let err = tokenize("db \"unterminated").unwrap_err();
        assert_eq!(err, ErrorKind::UnterminatedLiteral);
    }

    #[test]
    fn decodes_escapes() {
        let bytes = decode_literal_bytes(r#""a\n\"b""#).unwrap();
        assert_eq!(bytes, vec![b'a', b'\n', b'"', b'b']);
    }

    #[test]
    fn blank_line_yields_no_tokens() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
