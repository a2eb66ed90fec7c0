//! A tokenized source file, plus the bootstrap tokenizer used to turn Seed
//! source text into one.
//!
//! The interpreter and the axe engine only ever consume a [Tokenization];
//! how tokens were produced is deliberately none of their business (this
//! mirrors the teacher's split between `ITokenization` and the production
//! tree that consumes its output). The char-class tokenizer below exists so
//! this crate can parse *something* end to end — in particular so it can
//! parse its own bootstrap grammar text (see `seed_grammar.rs`) — without
//! requiring a caller to bring their own lexer.
use crate::catalog::{Category, TokenId, Ward, TOKEN_ID_EOF};
use crate::error::{Result, Severity, SilvaError};
use std::fmt::{Display, Formatter};

/// A 1-based line/column location in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn position_at(source: &str, byte_offset: u32) -> Position {
    let mut line = 1u32;
    let mut col = 1u32;
    for c in source[..byte_offset as usize].chars() {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    Position { line, column: col }
}

/// A fully tokenized source text: a flat sequence of interned [TokenId]s
/// with byte-offset spans, terminated by an implicit EOF token at index
/// `tokens.len()`.
#[derive(Debug, Clone)]
pub struct Tokenization {
    pub source: String,
    pub tokens: Vec<TokenId>,
    pub starts: Vec<u32>,
    pub ends: Vec<u32>,
}

impl Tokenization {
    pub fn num_tokens(&self) -> u32 {
        self.tokens.len() as u32
    }

    /// Token id at `index`; `index == num_tokens()` returns the EOF token.
    pub fn token_id(&self, index: u32) -> TokenId {
        if (index as usize) < self.tokens.len() {
            self.tokens[index as usize]
        } else {
            TOKEN_ID_EOF
        }
    }

    pub fn is_eof(&self, index: u32) -> bool {
        index as usize >= self.tokens.len()
    }

    pub fn text_of(&self, index: u32) -> &str {
        if (index as usize) < self.tokens.len() {
            let s = self.starts[index as usize] as usize;
            let e = self.ends[index as usize] as usize;
            &self.source[s..e]
        } else {
            ""
        }
    }

    pub fn position_of(&self, index: u32) -> Position {
        let offset = if (index as usize) < self.starts.len() {
            self.starts[index as usize]
        } else {
            self.source.len() as u32
        };
        position_at(&self.source, offset)
    }
}

const WHITESPACE_CHARS: &[char] = &[' ', '\t', '\r', '\n'];
const IDENTIFIER_EXTRA_CHARS: &[char] = &['_'];
const OPLET_CHARS: &[char] = &['[', ']', '(', ')', '{', '}', '~'];
const OPERATOR_CHARS: &[char] = &[
    ',', '.', ':', '<', '>', '=', '-', '+', '*', '/', '%', '&', '|', '^', '@', '!', '?', ';',
];
const NUMBER_EXTRA_CHARS: &[char] = &['.', '_', 'e', 'E'];

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || IDENTIFIER_EXTRA_CHARS.contains(&c)
}
fn is_identifier_cont(c: char) -> bool {
    c.is_alphanumeric() || IDENTIFIER_EXTRA_CHARS.contains(&c)
}

/// Tokenizes Seed source text with a minimal char-class lexer: whitespace
/// and `#`-to-end-of-line comments are skipped; identifiers, operators,
/// single-quoted strings and numbers are each collected greedily.
///
/// Grounded in the original's `tokenize_one` dispatch: whitespace,
/// identifier, operator (including the bracket "oplet" characters, each of
/// which is its own one-character operator token), string and number
/// classes, tried in that order.
pub fn tokenize(ward: &mut Ward, source: &str) -> Result<Tokenization> {
    let mut tokens = Vec::new();
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    let bytes = source.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let rest = &source[i..];
        let c = rest.chars().next().unwrap();

        if WHITESPACE_CHARS.contains(&c) {
            i += c.len_utf8();
            continue;
        }
        if c == '#' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        let start = i;
        if is_identifier_start(c) {
            let mut j = i + c.len_utf8();
            while j < bytes.len() {
                let cc = source[j..].chars().next().unwrap();
                if is_identifier_cont(cc) {
                    j += cc.len_utf8();
                } else {
                    break;
                }
            }
            let text = &source[start..j];
            let category = if text.chars().next().unwrap().is_ascii_digit() {
                Category::Number
            } else {
                Category::Identifier
            };
            tokens.push(ward.intern(text, category));
            starts.push(start as u32);
            ends.push(j as u32);
            i = j;
            continue;
        }
        if c.is_ascii_digit() {
            let mut j = i;
            while j < bytes.len() {
                let cc = source[j..].chars().next().unwrap();
                if cc.is_ascii_digit() || NUMBER_EXTRA_CHARS.contains(&cc) {
                    j += cc.len_utf8();
                } else {
                    break;
                }
            }
            let text = &source[start..j];
            tokens.push(ward.intern(text, Category::Number));
            starts.push(start as u32);
            ends.push(j as u32);
            i = j;
            continue;
        }
        if c == '\'' {
            let mut j = i + 1;
            let mut closed = false;
            while j < bytes.len() {
                let cc = bytes[j];
                if cc == b'\\' && j + 1 < bytes.len() {
                    j += 2;
                    continue;
                }
                if cc == b'\'' {
                    j += 1;
                    closed = true;
                    break;
                }
                j += 1;
            }
            if !closed {
                return Err(SilvaError::new(
                    Severity::BrokenSeed,
                    tokens.len() as u32,
                    format!("unterminated string literal at {}", position_at(source, start as u32)),
                ));
            }
            let text = &source[start..j];
            tokens.push(ward.intern(text, Category::String));
            starts.push(start as u32);
            ends.push(j as u32);
            i = j;
            continue;
        }
        if OPLET_CHARS.contains(&c) {
            let j = i + c.len_utf8();
            let text = &source[start..j];
            tokens.push(ward.intern(text, Category::Operator));
            starts.push(start as u32);
            ends.push(j as u32);
            i = j;
            continue;
        }
        if OPERATOR_CHARS.contains(&c) {
            let mut j = i + c.len_utf8();
            while j < bytes.len() {
                let cc = source[j..].chars().next().unwrap();
                if OPERATOR_CHARS.contains(&cc) {
                    j += cc.len_utf8();
                } else {
                    break;
                }
            }
            let text = &source[start..j];
            tokens.push(ward.intern(text, Category::Operator));
            starts.push(start as u32);
            ends.push(j as u32);
            i = j;
            continue;
        }

        return Err(SilvaError::new(
            Severity::BrokenSeed,
            tokens.len() as u32,
            format!("unrecognized character '{c}' at {}", position_at(source, start as u32)),
        ));
    }

    Ok(Tokenization {
        source: source.to_string(),
        tokens,
        starts,
        ends,
    })
}

/// Unquotes a `'...'`-delimited string literal, resolving the handful of
/// backslash escapes the tokenizer above permits inside one (`\\`, `\'`,
/// `\n`, `\t`). Grounded in the original's `string_as_plain_contained`.
pub fn unquote_string(literal: &str) -> Result<String> {
    let inner = literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(|| {
            SilvaError::new(
                Severity::Assert,
                0,
                format!("not a quoted string literal: {literal}"),
            )
        })?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {
                    return Err(SilvaError::new(
                        Severity::Assert,
                        0,
                        "trailing backslash in string literal",
                    ))
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_identifiers_operators_and_strings() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "Rule = 'not' foo? (a | b)").unwrap();
        let texts: Vec<&str> = (0..tok.num_tokens()).map(|i| tok.text_of(i)).collect();
        assert_eq!(
            texts,
            vec!["Rule", "=", "'not'", "foo", "?", "(", "a", "|", "b", ")"]
        );
    }

    #[test]
    fn skips_comments() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "a # this is a comment\nb").unwrap();
        let texts: Vec<&str> = (0..tok.num_tokens()).map(|i| tok.text_of(i)).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote_string("'a\\'b'").unwrap(), "a'b");
        assert_eq!(unquote_string("'plain'").unwrap(), "plain");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut ward = Ward::new();
        assert!(tokenize(&mut ward, "'oops").is_err());
    }
}
