//! Splits raw command text into tokens.

use crate::error::{RouteError, RouteResult};

/// One word of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Started with a quote; never read as an option flag.
    pub quoted: bool,
}

impl Token {
    #[cfg(test)]
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            quoted: false,
        }
    }
}

/// Split `raw` on `separator`, honouring double quotes.
///
/// Quotes are removed. Inside quotes `\"` and `\\` are escapes and the
/// separator is literal. Runs of separators outside quotes produce no empty
/// tokens, while `""` yields an empty quoted token.
pub fn tokenize(raw: &str, separator: char) -> RouteResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut quoted_start = false;
    let mut in_quotes = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => in_quotes = false,
                '\\' => match chars.next() {
                    Some(escaped @ ('"' | '\\')) => current.push(escaped),
                    Some(other) => {
                        current.push('\\');
                        current.push(other);
                    }
                    None => current.push('\\'),
                },
                _ => current.push(c),
            }
            continue;
        }

        if c == separator {
            if started {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    quoted: quoted_start,
                });
                started = false;
                quoted_start = false;
            }
            continue;
        }

        if c == '"' {
            if !started {
                quoted_start = true;
            }
            in_quotes = true;
        } else {
            current.push(c);
        }
        started = true;
    }

    if in_quotes {
        return Err(RouteError::InvalidRequest(
            "unterminated quoted value".to_string(),
        ));
    }
    if started {
        tokens.push(Token {
            text: current,
            quoted: quoted_start,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(raw: &str) -> Vec<String> {
        tokenize(raw, ' ')
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_splits_on_separator() {
        assert_eq!(texts("test  -v --opt1=x"), vec!["test", "-v", "--opt1=x"]);
        assert!(texts("   ").is_empty());
    }

    #[test]
    fn test_quoted_values() {
        let tokens = tokenize(r#"test --opt1 "some value" "--not-a-flag""#, ' ').unwrap();
        assert_eq!(tokens[0], Token::plain("test"));
        assert_eq!(tokens[1], Token::plain("--opt1"));
        assert_eq!(tokens[2].text, "some value");
        assert!(tokens[2].quoted);
        assert_eq!(tokens[3].text, "--not-a-flag");
        assert!(tokens[3].quoted);
    }

    #[test]
    fn test_inline_quoted_value_keeps_flag() {
        let tokens = tokenize(r#"--opt1="a b""#, ' ').unwrap();
        assert_eq!(tokens, vec![Token::plain("--opt1=a b")]);
    }

    #[test]
    fn test_empty_quotes_yield_empty_token() {
        let tokens = tokenize(r#"say """#, ' ').unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "");
    }

    #[test]
    fn test_escapes_inside_quotes() {
        assert_eq!(texts(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_unterminated_quote_is_invalid_request() {
        let err = tokenize(r#"test "open"#, ' ').unwrap_err();
        assert!(matches!(err, RouteError::InvalidRequest(_)));
    }

    #[test]
    fn test_custom_separator() {
        let tokens = tokenize("test,-v,,x", ',').unwrap();
        assert_eq!(tokens.len(), 3);
    }
}
