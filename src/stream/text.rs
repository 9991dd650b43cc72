//! Delimited text: split lines into fields and join fields into lines
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::Chars;

use super::core::Stream;
use super::transform::TransformStreamExt;

/// How fields are delimited and, optionally, quoted.
///
/// With `quote` unset, splitting is a plain split on `delimiter`. With a
/// quote character, quoted fields may contain the delimiter, and
/// `escape` followed by `quote` inside a quoted field is a literal quote.
/// `escape` defaults to the quote character itself (`""` style).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvDialect {
    pub delimiter: char,
    pub quote: Option<char>,
    pub escape: Option<char>,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: None,
            escape: None,
        }
    }
}

impl CsvDialect {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    pub fn quoted(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn escaped(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Split one line into fields
    pub fn split_line(&self, line: &str) -> Vec<String> {
        let Some(quote) = self.quote else {
            return line.split(self.delimiter).map(str::to_string).collect();
        };
        let escape = self.escape.unwrap_or(quote);
        let mut chars = line.chars().peekable();
        let mut fields = Vec::new();
        loop {
            let mut field = String::new();
            if chars.peek() == Some(&quote) {
                chars.next();
                self.read_quoted(&mut chars, quote, escape, &mut field);
            }
            for c in chars.by_ref() {
                if c == self.delimiter {
                    fields.push(field);
                    field = String::new();
                    break;
                }
                field.push(c);
            }
            if chars.peek().is_none() {
                fields.push(field);
                break;
            }
        }
        fields
    }

    fn read_quoted(
        &self,
        chars: &mut Peekable<Chars<'_>>,
        quote: char,
        escape: char,
        field: &mut String,
    ) {
        while let Some(c) = chars.next() {
            if c == escape && chars.peek() == Some(&quote) {
                chars.next();
                field.push(quote);
            } else if c == quote {
                return;
            } else {
                field.push(c);
            }
        }
    }

    /// Join fields into one line, quoting where needed
    pub fn join_fields<S: AsRef<str>>(&self, fields: &[S]) -> String {
        let delimiter = self.delimiter.to_string();
        let Some(quote) = self.quote else {
            return fields
                .iter()
                .map(|field| field.as_ref())
                .collect::<Vec<&str>>()
                .join(&delimiter);
        };
        let escape = self.escape.unwrap_or(quote);
        fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                if field.contains(quote) {
                    let escaped = field.replace(quote, &format!("{}{}", escape, quote));
                    format!("{}{}{}", quote, escaped, quote)
                } else if field.contains(self.delimiter) || field.contains(['\r', '\n']) {
                    format!("{}{}{}", quote, field, quote)
                } else {
                    field.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(&delimiter)
    }
}

pub trait SplitStreamExt: Sized {
    fn split(self, dialect: &CsvDialect) -> Stream<Vec<String>>;
}

impl SplitStreamExt for Stream<String> {
    fn split(self, dialect: &CsvDialect) -> Stream<Vec<String>> {
        let dialect = dialect.clone();
        self.map(move |line| dialect.split_line(&line))
    }
}

pub trait JoinStreamExt: Sized {
    fn join(self, dialect: &CsvDialect) -> Stream<String>;
}

impl JoinStreamExt for Stream<Vec<String>> {
    fn join(self, dialect: &CsvDialect) -> Stream<String> {
        let dialect = dialect.clone();
        self.map(move |fields| dialect.join_fields(&fields))
    }
}
