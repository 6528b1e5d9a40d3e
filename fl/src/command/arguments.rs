//! Parsed command arguments
//!
//! Arguments are a sequence of `--flag [value...]` groups. Every token up to
//! the next flag belongs to the previous flag's value and is joined with a
//! single space. Flag names are case-insensitive and may repeat.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::ArgumentInfo;

/// A command was invoked with arguments that cannot be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentParseError {
    #[error("Expected flag at position {position} but got '{token}' instead!")]
    ExpectedFlag { position: usize, token: String },

    #[error("Malformed flag '{token}'")]
    MalformedFlag { token: String },

    #[error("Missing value for '--{flag}' argument")]
    MissingValue { flag: String },

    #[error("Invalid input for '{flag}' argument. Please specify a number!")]
    InvalidNumber { flag: String, value: String },
}

/// Read-only view over the argument tail of one command invocation
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    raw: Vec<String>,
    flags: HashMap<String, Vec<String>>,
}

impl Arguments {
    /// Parse without checking against a schema
    pub fn parse(raw: Vec<String>) -> Result<Self, ArgumentParseError> {
        debug!(?raw, "Arguments::parse: called");
        let mut flags: HashMap<String, Vec<String>> = HashMap::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for (position, token) in raw.iter().enumerate() {
            match token.strip_prefix("--") {
                Some(name) => {
                    if name.is_empty() {
                        return Err(ArgumentParseError::MalformedFlag { token: token.clone() });
                    }
                    if let Some((flag, value)) = current.take() {
                        flags.entry(flag).or_default().push(value.join(" "));
                    }
                    current = Some((name.to_lowercase(), Vec::new()));
                }
                None => match current.as_mut() {
                    Some((_, value)) => value.push(token),
                    None => {
                        return Err(ArgumentParseError::ExpectedFlag {
                            position,
                            token: token.clone(),
                        });
                    }
                },
            }
        }
        if let Some((flag, value)) = current {
            flags.entry(flag).or_default().push(value.join(" "));
        }

        Ok(Self { raw, flags })
    }

    /// Parse and require a value for every flag the schema declares as value-taking
    pub fn parse_with_schema(raw: Vec<String>, schema: &[ArgumentInfo]) -> Result<Self, ArgumentParseError> {
        let arguments = Self::parse(raw)?;
        for info in schema.iter().filter(|info| info.requires_parameter()) {
            if let Some(values) = arguments.flags.get(info.name())
                && values.iter().any(|value| value.is_empty())
            {
                return Err(ArgumentParseError::MissingValue {
                    flag: info.name().to_string(),
                });
            }
        }
        Ok(arguments)
    }

    /// The unparsed tokens
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.raw.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Whether `--name` was given at all
    pub fn bool_flag(&self, name: &str) -> bool {
        self.flags.contains_key(&name.to_lowercase())
    }

    /// Every non-empty value given for `--name`, in order
    pub fn string_flags(&self, name: &str) -> Vec<&str> {
        self.flags
            .get(&name.to_lowercase())
            .map(|values| values.iter().map(String::as_str).filter(|v| !v.is_empty()).collect())
            .unwrap_or_default()
    }

    /// First non-empty value given for `--name`
    pub fn string_flag(&self, name: &str) -> Option<&str> {
        self.string_flags(name).into_iter().next()
    }

    /// First value of `--name` as a non-negative integer
    pub fn int_flag(&self, name: &str) -> Result<Option<u64>, ArgumentParseError> {
        self.string_flag(name)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map(i64::unsigned_abs)
                    .map_err(|_| invalid_number(name, value))
            })
            .transpose()
    }

    /// First value of `--name` as a non-negative number
    pub fn double_flag(&self, name: &str) -> Result<Option<f64>, ArgumentParseError> {
        self.string_flag(name)
            .map(|value| match value.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(number.abs()),
                _ => Err(invalid_number(name, value)),
            })
            .transpose()
    }
}

fn invalid_number(name: &str, value: &str) -> ArgumentParseError {
    ArgumentParseError::InvalidNumber {
        flag: name.to_lowercase(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty() {
        let parsed = Arguments::parse(Vec::new()).unwrap();
        assert!(parsed.is_empty());
        assert!(!parsed.bool_flag("stop"));
        assert_eq!(parsed.positional(0), None);
    }

    #[test]
    fn test_flags_and_values() {
        let parsed = Arguments::parse(args(&["--Timeout", "30", "--comment", "slow", "spawn", "--stop"])).unwrap();
        assert_eq!(parsed.string_flag("timeout"), Some("30"));
        assert_eq!(parsed.string_flag("comment"), Some("slow spawn"));
        assert!(parsed.bool_flag("stop"));
        assert_eq!(parsed.string_flag("stop"), None);
        assert_eq!(parsed.positional(1), Some("30"));
        assert_eq!(parsed.len(), 6);
    }

    #[test]
    fn test_repeated_flag() {
        let parsed = Arguments::parse(args(&["--only", "a", "--only", "b"])).unwrap();
        assert_eq!(parsed.string_flags("only"), vec!["a", "b"]);
    }

    #[test]
    fn test_value_before_flag_rejected() {
        let err = Arguments::parse(args(&["30", "--timeout"])).unwrap_err();
        assert_eq!(
            err,
            ArgumentParseError::ExpectedFlag {
                position: 0,
                token: "30".to_string()
            }
        );
        assert_eq!(err.to_string(), "Expected flag at position 0 but got '30' instead!");
    }

    #[test]
    fn test_bare_dashes_rejected() {
        let err = Arguments::parse(args(&["--"])).unwrap_err();
        assert!(matches!(err, ArgumentParseError::MalformedFlag { .. }));
    }

    #[test]
    fn test_schema_requires_value() {
        let schema = vec![ArgumentInfo::new("timeout", Some("timeout seconds")), ArgumentInfo::new("stop", None)];

        let err = Arguments::parse_with_schema(args(&["--timeout", "--stop"]), &schema).unwrap_err();
        assert_eq!(
            err,
            ArgumentParseError::MissingValue {
                flag: "timeout".to_string()
            }
        );

        let ok = Arguments::parse_with_schema(args(&["--timeout", "5", "--stop"]), &schema).unwrap();
        assert!(ok.bool_flag("stop"));
    }

    #[test]
    fn test_numeric_flags() {
        let parsed = Arguments::parse(args(&["--page", "-3", "--ratio", "2.5", "--bad", "x"])).unwrap();
        assert_eq!(parsed.int_flag("page").unwrap(), Some(3));
        assert_eq!(parsed.double_flag("ratio").unwrap(), Some(2.5));
        assert_eq!(parsed.int_flag("missing").unwrap(), None);

        let err = parsed.int_flag("bad").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input for 'bad' argument. Please specify a number!");
        assert!(parsed.double_flag("bad").is_err());
    }
}
