//! `key=value;` connection strings

use std::borrow::Cow;
use std::fmt;

/// A value as it must appear after `key=`, quoted when the parser would
/// otherwise split or trim it
pub fn quote_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.contains(';')
        || value.contains('"')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// A parsed connection string.
///
/// Keys are matched case-insensitively and keep their original spelling and
/// order. Values may be wrapped in double quotes, in which case `;` and `=` are
/// literal and `""` stands for one quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Self {
        let mut pairs = Vec::new();
        let mut chars = input.chars().peekable();

        loop {
            let mut key = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' || c == ';' {
                    break;
                }
                key.push(c);
                chars.next();
            }

            let mut value = String::new();
            if chars.peek() == Some(&'=') {
                chars.next();
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.peek() == Some(&'"') {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '"' {
                            if chars.peek() == Some(&'"') {
                                value.push('"');
                                chars.next();
                            } else {
                                break;
                            }
                        } else {
                            value.push(c);
                        }
                    }
                    // Skip anything between the closing quote and the separator
                    while chars.peek().is_some_and(|&c| c != ';') {
                        chars.next();
                    }
                } else {
                    while let Some(&c) = chars.peek() {
                        if c == ';' {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                    value = value.trim().to_string();
                }
            }

            let key = key.trim();
            if !key.is_empty() {
                pairs.push((key.to_string(), value));
            }

            if chars.next().is_none() {
                break;
            }
        }

        Self { pairs }
    }

    /// Value of a key, case-insensitive
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a key, replacing an existing entry with the same (case-insensitive) name
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// The `Data Source` entry (also accepts `DataSource` and `Server`)
    pub fn data_source(&self) -> Option<&str> {
        self.get("Data Source")
            .or_else(|| self.get("DataSource"))
            .or_else(|| self.get("Server"))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.pairs {
            write!(f, "{}={};", key, quote_value(value))?;
        }
        Ok(())
    }
}
