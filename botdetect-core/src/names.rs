//! Player name validation and normalisation
//!
//! Two rules exist side by side. The plugin routes validate names with a
//! regex (`is_valid_rsn`) and key players by their normalised form
//! (`to_jagex_name`). The prediction route still uses the older
//! `legacy_check`, which flags names instead of rejecting them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ValidationError;

/// Maximum length of an in-game name, in characters
pub const MAX_NAME_LEN: usize = 13;

/// Word characters, whitespace, underscores and hyphens, 1-13 of them
static RSN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\s_-]{1,13}$").expect("invalid rsn regex"));

/// Whether `name` is an acceptable in-game name.
pub fn is_valid_rsn(name: &str) -> bool {
    RSN_RE.is_match(name)
}

/// Normalise a name the way the game does for lookups.
///
/// Lowercases, turns `_` and `-` into spaces and trims the ends.
///
/// ```
/// use botdetect_core::to_jagex_name;
///
/// assert_eq!(to_jagex_name(" Zezima_Pk-1 "), "zezima pk 1");
/// ```
pub fn to_jagex_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['_', '-'], " ")
        .trim()
        .to_owned()
}

/// Validated player name, carrying both the submitted and normalised forms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerName {
    display: String,
    normalized: String,
}

impl PlayerName {
    /// Validate a submitted name.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "player name" });
        }

        if s.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "player name",
                max: MAX_NAME_LEN,
            });
        }

        if !is_valid_rsn(s) {
            return Err(ValidationError::InvalidFormat {
                field: "player name",
                reason: "may only contain letters, digits, spaces, underscores and hyphens",
            });
        }

        Ok(Self {
            display: s.to_owned(),
            normalized: to_jagex_name(s),
        })
    }

    /// Older check used by the prediction route.
    ///
    /// Returns the name unchanged plus a `bad_name` flag. A name is bad when
    /// it is longer than 13 characters, or when what remains after dropping
    /// spaces, underscores and hyphens is empty or not purely alphanumeric.
    pub fn legacy_check(name: &str) -> (String, bool) {
        let too_long = name.chars().count() > MAX_NAME_LEN;

        let stripped: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        let alnum = !stripped.is_empty() && stripped.chars().all(char::is_alphanumeric);

        (name.to_owned(), too_long || !alnum)
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lookup key used in the `players.normalized_name` column.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_rsn("Zezima"));
        assert!(is_valid_rsn("a b_c-d"));
        assert!(is_valid_rsn("1234567890123"));
        assert!(PlayerName::new("Lynx Titan").is_ok());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(!is_valid_rsn("bad!name"));
        let err = PlayerName::new("x.y").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_long_and_empty() {
        assert!(!is_valid_rsn("12345678901234"));
        assert!(matches!(
            PlayerName::new("12345678901234").unwrap_err(),
            ValidationError::TooLong { max: 13, .. }
        ));
        assert!(matches!(
            PlayerName::new("").unwrap_err(),
            ValidationError::Empty { .. }
        ));
    }

    #[test]
    fn normalises() {
        assert_eq!(to_jagex_name("Mod_Ash"), "mod ash");
        assert_eq!(to_jagex_name("-lead-"), "lead");
        let name = PlayerName::new("Iron_Man-1").unwrap();
        assert_eq!(name.as_str(), "Iron_Man-1");
        assert_eq!(name.normalized(), "iron man 1");
    }

    #[test]
    fn legacy_check_flags() {
        assert_eq!(PlayerName::legacy_check("Mod Ash"), ("Mod Ash".into(), false));
        assert!(PlayerName::legacy_check("way too long name").1);
        assert!(PlayerName::legacy_check("semi;colon").1);
        assert!(PlayerName::legacy_check("___").1);
        assert!(!PlayerName::legacy_check("a_b-c d").1);
    }
}
