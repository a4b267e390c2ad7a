//! Changeset file name grammar.
//!
//! A changeset file is named `<digits>__<name>`: a non-empty run of ASCII
//! digits (the version), exactly two underscores, then a non-empty name that
//! is kept verbatim. The parser is a small state machine over the characters
//! of the name:
//!
//! ```text
//! Version{0} --digit--> Version{n} --digit--> Version{n}
//! Version{n} --'_'--> Separator{1} --'_'--> Separator{2} --other--> Name
//! Name --any--> Name
//! ```
//!
//! Any other transition, or reaching the end of input outside `Name`, is an
//! error carrying the character position where parsing stopped.

use crate::ledger::Migration;

/// What went wrong while parsing a changeset file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FileNameErrorKind {
    /// A character not allowed at this point of the grammar.
    #[error("invalid character {0:?} in migration file name")]
    UnexpectedCharacter(char),
    /// The name ended before the separator and name were read.
    #[error("incomplete migration file name")]
    UnexpectedEnd,
    /// The version does not fit in a 64-bit signed integer.
    #[error("version number out of range")]
    VersionOverflow,
    /// No `__` separator was found.
    #[error("missing `__` separator")]
    MissingSeparator,
    /// The version prefix has no digits once leading zeros are stripped.
    #[error("version number has no significant digits")]
    EmptyVersion,
}

/// A positional error in a changeset file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}: {kind} at {position}")]
pub struct FileNameError {
    /// The offending file name.
    pub file: String,
    /// Character index where parsing stopped.
    pub position: usize,
    /// The kind of failure.
    pub kind: FileNameErrorKind,
}

impl FileNameError {
    fn new(file: &str, position: usize, kind: FileNameErrorKind) -> Self {
        Self {
            file: file.to_string(),
            position,
            kind,
        }
    }
}

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading version digits, `digits` of them so far.
    Version { digits: usize },
    /// Reading the separator, `count` underscores so far.
    Separator { count: u8 },
    /// Reading the name.
    Name,
}

impl State {
    const START: Self = Self::Version { digits: 0 };

    /// Returns the state after consuming `c`.
    fn next(self, c: char) -> Result<Self, FileNameErrorKind> {
        match (self, c) {
            (Self::Version { digits }, '0'..='9') => Ok(Self::Version { digits: digits + 1 }),
            (Self::Version { digits }, '_') if digits > 0 => Ok(Self::Separator { count: 1 }),
            (Self::Separator { count: 1 }, '_') => Ok(Self::Separator { count: 2 }),
            (Self::Separator { count: 2 }, c) if c != '_' => Ok(Self::Name),
            (Self::Name, _) => Ok(Self::Name),
            (_, c) => Err(FileNameErrorKind::UnexpectedCharacter(c)),
        }
    }

    /// Returns true if input may end in this state.
    const fn accepts(self) -> bool {
        matches!(self, Self::Name)
    }
}

/// Parses the identity of a changeset from its file name.
///
/// # Errors
///
/// Returns a [`FileNameError`] pointing at the first character that breaks
/// the `<digits>__<name>` grammar, or at the end of input if the name is
/// incomplete.
///
/// # Example
///
/// ```
/// use oxide_changeset::filename::parse_migration;
///
/// let m = parse_migration("0000001__baseline.sql").unwrap();
/// assert_eq!(m.version, 1);
/// assert_eq!(m.name, "baseline.sql");
/// assert_eq!(m.file, "0000001__baseline.sql");
/// ```
pub fn parse_migration(filename: &str) -> Result<Migration, FileNameError> {
    let mut state = State::START;
    let mut version: i64 = 0;
    let mut name = String::new();
    let mut position = 0;

    for (pos, c) in filename.chars().enumerate() {
        position = pos + 1;
        state = state
            .next(c)
            .map_err(|kind| FileNameError::new(filename, pos, kind))?;

        match state {
            State::Version { .. } => {
                let digit = i64::from(c.to_digit(10).unwrap_or_default());
                version = version
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| {
                        FileNameError::new(filename, pos, FileNameErrorKind::VersionOverflow)
                    })?;
            }
            State::Separator { .. } => {}
            State::Name => name.push(c),
        }
    }

    if !state.accepts() {
        return Err(FileNameError::new(
            filename,
            position,
            FileNameErrorKind::UnexpectedEnd,
        ));
    }

    Ok(Migration::new(version, name, filename))
}

/// Extracts the version prefix of a changeset file name.
///
/// Everything before the first `__` is taken as the version, with leading
/// zeros stripped. This is not a validation of the full grammar; use
/// [`parse_migration`] for that.
///
/// # Errors
///
/// Returns a [`FileNameError`] if there is no `__` separator, the prefix
/// contains a non-digit, is empty or all zeros, or the number overflows.
pub fn extract_version(filename: &str) -> Result<i64, FileNameError> {
    let (prefix, _) = filename.split_once("__").ok_or_else(|| {
        FileNameError::new(
            filename,
            filename.chars().count(),
            FileNameErrorKind::MissingSeparator,
        )
    })?;

    let digits = prefix.trim_start_matches('0');
    let stripped = prefix.len() - digits.len();

    if let Some((pos, c)) = digits.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
        return Err(FileNameError::new(
            filename,
            stripped + pos,
            FileNameErrorKind::UnexpectedCharacter(c),
        ));
    }

    if digits.is_empty() {
        return Err(FileNameError::new(
            filename,
            prefix.len(),
            FileNameErrorKind::EmptyVersion,
        ));
    }

    digits.parse::<i64>().map_err(|_| {
        FileNameError::new(filename, stripped, FileNameErrorKind::VersionOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(filename: &str) -> FileNameError {
        parse_migration(filename).expect_err(&format!("Expected parse error for: {filename}"))
    }

    // State transitions

    #[test]
    fn test_version_accepts_digit() {
        assert_eq!(State::START.next('7'), Ok(State::Version { digits: 1 }));
        assert_eq!(
            State::Version { digits: 1 }.next('0'),
            Ok(State::Version { digits: 2 })
        );
    }

    #[test]
    fn test_version_requires_a_digit_before_separator() {
        assert_eq!(
            State::START.next('_'),
            Err(FileNameErrorKind::UnexpectedCharacter('_'))
        );
    }

    #[test]
    fn test_version_to_separator() {
        assert_eq!(
            State::Version { digits: 3 }.next('_'),
            Ok(State::Separator { count: 1 })
        );
    }

    #[test]
    fn test_version_rejects_other_characters() {
        assert_eq!(
            State::Version { digits: 2 }.next('a'),
            Err(FileNameErrorKind::UnexpectedCharacter('a'))
        );
    }

    #[test]
    fn test_second_separator() {
        assert_eq!(
            State::Separator { count: 1 }.next('_'),
            Ok(State::Separator { count: 2 })
        );
    }

    #[test]
    fn test_single_separator_is_rejected() {
        assert_eq!(
            State::Separator { count: 1 }.next('x'),
            Err(FileNameErrorKind::UnexpectedCharacter('x'))
        );
    }

    #[test]
    fn test_third_separator_is_rejected() {
        assert_eq!(
            State::Separator { count: 2 }.next('_'),
            Err(FileNameErrorKind::UnexpectedCharacter('_'))
        );
    }

    #[test]
    fn test_separator_to_name() {
        assert_eq!(State::Separator { count: 2 }.next('x'), Ok(State::Name));
    }

    #[test]
    fn test_name_takes_anything() {
        for c in ['a', '_', '9', '.', 'é'] {
            assert_eq!(State::Name.next(c), Ok(State::Name));
        }
    }

    #[test]
    fn test_only_name_accepts_end() {
        assert!(State::Name.accepts());
        assert!(!State::START.accepts());
        assert!(!State::Version { digits: 4 }.accepts());
        assert!(!State::Separator { count: 2 }.accepts());
    }

    // Whole file names

    #[test]
    fn test_parse_baseline() {
        let m = parse_migration("0000001__baseline.sql").unwrap();
        assert_eq!(m.version, 1);
        assert_eq!(m.name, "baseline.sql");
        assert_eq!(m.file, "0000001__baseline.sql");
        assert!(!m.success);
    }

    #[test]
    fn test_parse_keeps_name_verbatim() {
        let m = parse_migration("42__add__users_TABLE.SQL").unwrap();
        assert_eq!(m.version, 42);
        assert_eq!(m.name, "add__users_TABLE.SQL");
    }

    #[test]
    fn test_parse_rejects_non_digit_prefix() {
        let err = parse_err("abc__x.sql");
        assert_eq!(err.position, 0);
        assert_eq!(err.kind, FileNameErrorKind::UnexpectedCharacter('a'));
    }

    #[test]
    fn test_parse_rejects_three_underscores() {
        let err = parse_err("12___x.sql");
        assert_eq!(err.position, 4);
        assert_eq!(err.kind, FileNameErrorKind::UnexpectedCharacter('_'));
    }

    #[test]
    fn test_parse_rejects_single_underscore() {
        let err = parse_err("12_x.sql");
        assert_eq!(err.position, 3);
        assert_eq!(err.kind, FileNameErrorKind::UnexpectedCharacter('x'));
    }

    #[test]
    fn test_parse_rejects_incomplete_names() {
        for (input, position) in [("", 0), ("12", 2), ("12_", 3), ("12__", 4)] {
            let err = parse_err(input);
            assert_eq!(err.kind, FileNameErrorKind::UnexpectedEnd, "{input}");
            assert_eq!(err.position, position, "{input}");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let err = parse_err("99999999999999999999__big.sql");
        assert_eq!(err.kind, FileNameErrorKind::VersionOverflow);
        assert_eq!(err.position, 18);
    }

    #[test]
    fn test_parse_max_version() {
        let m = parse_migration("9223372036854775807__max.sql").unwrap();
        assert_eq!(m.version, i64::MAX);
    }

    #[test]
    fn test_error_message_is_positional() {
        let err = parse_err("12_x.sql");
        assert_eq!(
            err.to_string(),
            "12_x.sql: invalid character 'x' in migration file name at 3"
        );
    }

    // Version extraction

    #[test]
    fn test_extract_version_strips_zeros() {
        assert_eq!(extract_version("0000010__ten.sql").unwrap(), 10);
        assert_eq!(extract_version("11__eleven.sql").unwrap(), 11);
    }

    #[test]
    fn test_extract_version_rejects_zero() {
        let err = extract_version("000__zero.sql").unwrap_err();
        assert_eq!(err.kind, FileNameErrorKind::EmptyVersion);
        assert_eq!(err.position, 3);

        let err = extract_version("__init.sql").unwrap_err();
        assert_eq!(err.kind, FileNameErrorKind::EmptyVersion);
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_extract_version_requires_separator() {
        let err = extract_version("10_ten.sql").unwrap_err();
        assert_eq!(err.kind, FileNameErrorKind::MissingSeparator);
    }

    #[test]
    fn test_extract_version_rejects_non_digits() {
        let err = extract_version("00v1__x.sql").unwrap_err();
        assert_eq!(err.kind, FileNameErrorKind::UnexpectedCharacter('v'));
        assert_eq!(err.position, 2);
    }
}
