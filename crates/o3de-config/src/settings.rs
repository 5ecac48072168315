//! Settings catalogue entries.

use regex::Regex;

/// How a value is checked before it is accepted.
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    Any,
    /// Whole-value regular expression.
    Pattern(&'static str),
    /// One of a fixed set, compared case-sensitively.
    OneOf(&'static [&'static str]),
}

/// Schema of a single settings key.
#[derive(Debug, Clone, Copy)]
pub struct SettingsDescription {
    pub key: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
    pub validator: Validator,
    pub is_boolean: bool,
    pub is_password: bool,
    /// Environment variables consulted when no file layer sets the key.
    pub env_fallbacks: &'static [&'static str],
}

impl SettingsDescription {
    pub const fn new(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            default: None,
            validator: Validator::Any,
            is_boolean: false,
            is_password: false,
            env_fallbacks: &[],
        }
    }

    pub const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn pattern(mut self, regex: &'static str) -> Self {
        self.validator = Validator::Pattern(regex);
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.validator = Validator::OneOf(values);
        self
    }

    /// Mark as boolean with the given default.
    pub const fn boolean(mut self, default: bool) -> Self {
        self.is_boolean = true;
        self.default = Some(if default { "true" } else { "false" });
        self
    }

    pub const fn password(mut self) -> Self {
        self.is_password = true;
        self
    }

    pub const fn env(mut self, vars: &'static [&'static str]) -> Self {
        self.env_fallbacks = vars;
        self
    }

    /// Check `value` against this key's validator.
    ///
    /// # Errors
    /// Returns a human-readable reason when the value is rejected.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        if self.is_boolean {
            return parse_bool(value)
                .map(|_| ())
                .ok_or_else(|| "expected true/false, yes/no, or 1/0".to_owned());
        }
        match self.validator {
            Validator::Any => Ok(()),
            Validator::OneOf(values) => {
                if values.contains(&value) {
                    Ok(())
                } else {
                    Err(format!("expected one of {}", values.join(", ")))
                }
            }
            Validator::Pattern(pattern) => {
                let anchored = format!("^(?:{pattern})$");
                let re = Regex::new(&anchored).map_err(|e| format!("bad validator: {e}"))?;
                if re.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("must match `{pattern}`"))
                }
            }
        }
    }
}

/// Parse a boolean setting, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_SIZE: SettingsDescription =
        SettingsDescription::new("max.size", "Bundle split size in MB").default_value("2048").pattern("[0-9]+");

    #[test]
    fn pattern_is_anchored() {
        assert!(MAX_SIZE.validate("2048").is_ok());
        assert!(MAX_SIZE.validate("20x48").is_err());
        assert!(MAX_SIZE.validate("").is_err());
    }

    #[test]
    fn one_of_lists_choices() {
        let mode = SettingsDescription::new("asset.mode", "").one_of(&["LOOSE", "PAK"]);
        assert!(mode.validate("PAK").is_ok());
        let err = mode.validate("ZIP").unwrap_err();
        assert!(err.contains("LOOSE, PAK"));
    }

    #[test]
    fn boolean_accepts_common_spellings() {
        let flag = SettingsDescription::new("strip.debug", "").boolean(true);
        for v in ["true", "FALSE", "Yes", "no", "1", "0"] {
            assert!(flag.validate(v).is_ok(), "{v}");
        }
        assert!(flag.validate("maybe").is_err());
        assert_eq!(flag.default, Some("true"));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
