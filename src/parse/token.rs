use logos::Logos;

#[derive(Debug, PartialEq, Logos, Clone, Copy)]
pub enum Token {
    #[regex(r"[ \f\r\t\v]+")]
    WhiteSpace,

    #[token("\n")]
    NewLine,

    /// Anything between ASCII whitespace, including non-ASCII whitespace such
    /// as a no-break space.
    #[regex(r"[^ \f\r\t\v\n]+")]
    Word,

    #[error]
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<(Token, &str)> {
        let mut lex = Token::lexer(src);
        let mut result = vec![];
        while let Some(token) = lex.next() {
            result.push((token, lex.slice()));
        }
        result
    }

    #[test]
    fn splits_words_and_line_breaks() {
        assert_eq!(
            tokens("0 @I1@ INDI\r\n1 NAME"),
            vec![
                (Token::Word, "0"),
                (Token::WhiteSpace, " "),
                (Token::Word, "@I1@"),
                (Token::WhiteSpace, " "),
                (Token::Word, "INDI"),
                (Token::WhiteSpace, "\r"),
                (Token::NewLine, "\n"),
                (Token::Word, "1"),
                (Token::WhiteSpace, " "),
                (Token::Word, "NAME"),
            ]
        );
    }

    #[test]
    fn whitespace_runs_are_one_token() {
        assert_eq!(
            tokens("2  \t DATE"),
            vec![
                (Token::Word, "2"),
                (Token::WhiteSpace, "  \t "),
                (Token::Word, "DATE"),
            ]
        );
    }

    #[test]
    fn only_ascii_whitespace_separates_words() {
        assert_eq!(
            tokens("John\u{a0}Doe\u{2003}Jr"),
            vec![(Token::Word, "John\u{a0}Doe\u{2003}Jr")]
        );
    }
}
