//! Declarative line grammars.
//!
//! A [`Grammar`] is a fixed sequence of [`Token`]s that must cover a whole
//! payload. Text tokens are extended lazily, and every variable-width token
//! backtracks when the rest of the grammar fails, so a captured field may
//! itself contain text that looks like a later literal.

use std::str::FromStr;

use crate::error::ResultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Exact text
    Lit(&'static str),
    /// One or more ASCII digits, captured under the name
    Num(&'static str),
    /// One or more characters, captured under the name
    Text(&'static str),
    /// Zero or more characters, not captured
    Skip,
    /// Exactly one of the given literals
    AnyOf(&'static [&'static str]),
}

/// Named token sequence for one line shape
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    pub name: &'static str,
    pub tokens: &'static [Token],
}

impl Grammar {
    pub const fn new(name: &'static str, tokens: &'static [Token]) -> Self {
        Self { name, tokens }
    }

    /// Match the whole of `input`, returning the captured fields.
    pub fn try_match<'a>(&self, input: &'a str) -> Option<Fields<'a>> {
        let mut captures = Vec::new();
        if match_tokens(self.tokens, input, 0, &mut captures) {
            Some(Fields {
                grammar: self.name,
                captures,
            })
        } else {
            None
        }
    }
}

fn match_tokens<'a>(
    tokens: &[Token],
    input: &'a str,
    pos: usize,
    captures: &mut Vec<(&'static str, &'a str)>,
) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return pos == input.len();
    };

    match *token {
        Token::Lit(lit) => {
            input[pos..].starts_with(lit) && match_tokens(rest, input, pos + lit.len(), captures)
        }
        Token::AnyOf(options) => options.iter().any(|lit| {
            input[pos..].starts_with(lit) && match_tokens(rest, input, pos + lit.len(), captures)
        }),
        Token::Num(name) => {
            let digits = input[pos..].bytes().take_while(u8::is_ascii_digit).count();
            (1..=digits)
                .rev()
                .any(|len| try_capture(name, rest, input, pos, pos + len, captures))
        }
        Token::Text(name) => (pos + 1..=input.len())
            .filter(|&end| input.is_char_boundary(end))
            .any(|end| try_capture(name, rest, input, pos, end, captures)),
        Token::Skip => (pos..=input.len())
            .filter(|&end| input.is_char_boundary(end))
            .any(|end| match_tokens(rest, input, end, captures)),
    }
}

fn try_capture<'a>(
    name: &'static str,
    rest: &[Token],
    input: &'a str,
    start: usize,
    end: usize,
    captures: &mut Vec<(&'static str, &'a str)>,
) -> bool {
    captures.push((name, &input[start..end]));
    if match_tokens(rest, input, end, captures) {
        return true;
    }
    captures.pop();
    false
}

/// Fields captured by a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields<'a> {
    grammar: &'static str,
    captures: Vec<(&'static str, &'a str)>,
}

impl<'a> Fields<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.captures
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    }

    pub fn text(&self, name: &str) -> Result<&'a str, ResultError> {
        self.get(name).ok_or_else(|| {
            ResultError::Format(format!("{} line has no field \"{}\"", self.grammar, name))
        })
    }

    /// Parse a numeric field; overflow is a range error
    pub fn num<T: FromStr>(&self, name: &str) -> Result<T, ResultError> {
        let raw = self.text(name)?;
        raw.parse().map_err(|_| {
            ResultError::Range(format!(
                "{} field \"{}\" = {} does not fit",
                self.grammar, name, raw
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: Grammar = Grammar::new(
        "pair",
        &[
            Token::Lit("a= "),
            Token::Num("a"),
            Token::Lit(" b= ["),
            Token::Text("b"),
            Token::Lit("]"),
        ],
    );

    #[test]
    fn test_literal_and_fields() {
        let fields = PAIR.try_match("a= 42 b= [hello world]").unwrap();
        assert_eq!(fields.get("a"), Some("42"));
        assert_eq!(fields.text("b").unwrap(), "hello world");
        assert_eq!(fields.num::<u32>("a").unwrap(), 42);
        assert!(fields.get("c").is_none());
    }

    #[test]
    fn test_whole_input_must_match() {
        assert!(PAIR.try_match("a= 42 b= [x] trailing").is_none());
        assert!(PAIR.try_match("xa= 42 b= [x]").is_none());
        assert!(PAIR.try_match("a= b= [x]").is_none());
        assert!(PAIR.try_match("a= 42 b= []").is_none());
    }

    #[test]
    fn test_text_backtracks_over_literal() {
        let fields = PAIR.try_match("a= 1 b= [x]y]").unwrap();
        assert_eq!(fields.get("b"), Some("x]y"));
    }

    #[test]
    fn test_skip_and_any_of() {
        const G: Grammar = Grammar::new(
            "g",
            &[
                Token::Skip,
                Token::AnyOf(&["[engine_free] ", "[master_free] "]),
                Token::Text("rest"),
            ],
        );
        assert_eq!(G.try_match("junk [master_free] done").unwrap().get("rest"), Some("done"));
        assert_eq!(G.try_match("[engine_free] x").unwrap().get("rest"), Some("x"));
        assert!(G.try_match("[other_free] x").is_none());
    }

    #[test]
    fn test_num_overflow_is_range_error() {
        let fields = PAIR.try_match("a= 99999999999 b= [x]").unwrap();
        assert!(matches!(fields.num::<u32>("a"), Err(ResultError::Range(_))));
        assert!(matches!(fields.text("missing"), Err(ResultError::Format(_))));
    }

    #[test]
    fn test_non_ascii_text() {
        let fields = PAIR.try_match("a= 7 b= [wikipédia.org]").unwrap();
        assert_eq!(fields.get("b"), Some("wikipédia.org"));
    }
}
