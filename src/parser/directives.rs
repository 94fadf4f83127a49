//! Document prologue: `#version` and `#delimiter` directive lines.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct Directives {
    pub version: Option<String>,
    pub delimiter: char,
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            version: None,
            delimiter: ',',
        }
    }
}

/// Consume leading `#version` / `#delimiter` lines from `lines`, returning
/// the parsed directives and the index of the first non-directive line.
pub fn read_directives(lines: &[&str]) -> Result<(Directives, usize), ParseError> {
    let mut directives = Directives::default();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx].trim_end();
        if let Some(rest) = line.strip_prefix("#version") {
            directives.version = Some(rest.trim().to_string());
            idx += 1;
        } else if let Some(rest) = line.strip_prefix("#delimiter") {
            let token = rest.trim();
            directives.delimiter = parse_delimiter_token(token)?;
            idx += 1;
        } else {
            break;
        }
    }
    Ok((directives, idx))
}

fn parse_delimiter_token(token: &str) -> Result<char, ParseError> {
    match token {
        "," | "comma" => Ok(','),
        "|" | "pipe" => Ok('|'),
        "\\t" | "tab" => Ok('\t'),
        ";" | "semicolon" => Ok(';'),
        other if other.chars().count() == 1 => Ok(other.chars().next().unwrap()),
        other => Err(ParseError::InvalidDelimiter {
            found: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_and_delimiter() {
        let lines = vec!["#version 1.0", "#delimiter |", "users[1]:"];
        let (d, idx) = read_directives(&lines).unwrap();
        assert_eq!(d.version.as_deref(), Some("1.0"));
        assert_eq!(d.delimiter, '|');
        assert_eq!(idx, 2);
    }

    #[test]
    fn defaults_when_absent() {
        let lines = vec!["users[1]:"];
        let (d, idx) = read_directives(&lines).unwrap();
        assert_eq!(d.delimiter, ',');
        assert_eq!(idx, 0);
    }
}
