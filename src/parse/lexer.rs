use super::Token;
use crate::{Error, ErrorLevel, ErrorType, Location, Source, SrcFile};
use logos::{Lexer as LogosLexer, Logos};

/// One `level tag value` line of GEDCOM text. The value is the rest of the line
/// with runs of ASCII whitespace collapsed to single spaces. Other whitespace,
/// such as a no-break space, is kept as part of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'source> {
    pub level: usize,
    pub tag: &'source str,
    pub value: String,
    pub src: Source,
}

/// Splits GEDCOM text into [`Line`]s, lazily, one per non-blank line.
///
/// A line that does not start with a level number followed by a tag yields a
/// [`ErrorType::Syntax`] warning instead; iteration continues with the next
/// line. To restart, create a new `Lexer` over the same text.
pub struct Lexer<'source> {
    llex: LogosLexer<'source, Token>,
    location: Location,
    file: SrcFile,
}

impl<'source> Lexer<'source> {
    pub fn new(src: &'source str, file: SrcFile) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Lexer {
            llex: Token::lexer(src),
            location: (1, 1).into(),
            file,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Collects the words of the next line. Returns `None` at the end of input.
    fn next_words(&mut self) -> Option<Vec<(&'source str, Location)>> {
        let mut words = Vec::new();
        let mut seen_token = false;
        while let Some(token) = self.llex.next() {
            seen_token = true;
            let text = self.llex.slice();
            match token {
                Token::NewLine => {
                    self.location.col = 1;
                    self.location.line += 1;
                    return Some(words);
                }
                Token::Word => {
                    words.push((text, self.location));
                    self.location.col += text.chars().count();
                }
                Token::WhiteSpace | Token::Error => {
                    self.location.col += text.chars().count();
                }
            }
        }
        if seen_token {
            Some(words)
        } else {
            None
        }
    }

    fn malformed(&self, msg: String, start: Location, end: Location) -> Error {
        Error {
            msg,
            src: Source {
                file: self.file.clone(),
                start,
                end,
            },
            r#type: ErrorType::Syntax,
            level: ErrorLevel::Warning,
        }
    }

    fn line_from(&self, words: Vec<(&'source str, Location)>) -> Result<Line<'source>, Error> {
        let (level_str, start) = words[0];
        let (last_word, last_start) = words[words.len() - 1];
        let end = last_start.advance(last_word.chars().count());
        let level = Some(level_str)
            .filter(|level| level.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|level| level.parse::<usize>().ok())
            .ok_or_else(|| {
                self.malformed(
                    format!("Malformed line: expect a level number, found {:?}.", level_str),
                    start,
                    end,
                )
            })?;
        let tag = match words.get(1) {
            Some((tag, _)) => *tag,
            None => {
                return Err(self.malformed(
                    format!("Malformed line: missing tag after level {}.", level),
                    start,
                    end,
                ))
            }
        };
        let value = words[2..]
            .iter()
            .map(|(word, _)| *word)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Line {
            level,
            tag,
            value,
            src: Source {
                file: self.file.clone(),
                start,
                end,
            },
        })
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Line<'source>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let words = self.next_words()?;
            if !words.is_empty() {
                return Some(self.line_from(words));
            }
        }
    }
}
