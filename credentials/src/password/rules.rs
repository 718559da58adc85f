//! Individual password rules.
//!
//! Every rule is a stateless unit struct; `PasswordPolicy` decides their order.

use super::errors::PolicyViolation;
use super::policy::PolicyContext;

/// A named, stateless predicate over a candidate password.
pub trait PolicyRule: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Accept the candidate or return the reason it was rejected.
    fn check(&self, candidate: &str, context: &PolicyContext<'_>) -> Result<(), PolicyViolation>;
}

pub const MIN_LENGTH: usize = 12;
pub const MAX_LENGTH: usize = 128;

/// Characters accepted as "special".
pub const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>_+-=[]\\;'/~`";

/// Known weak passwords, matched case-insensitively in either direction.
pub const COMMON_PASSWORDS: [&str; 20] = [
    "password",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty",
    "qwerty123",
    "abc123",
    "admin",
    "admin123",
    "letmein",
    "welcome",
    "monkey",
    "dragon",
    "master",
    "sunshine",
    "password1",
    "princess",
    "football",
    "iloveyou",
];

/// Runs that count as sequential, listed forwards and reversed.
const SEQUENCES: [&str; 6] = [
    "abcdefghijklmnopqrstuvwxyz",
    "zyxwvutsrqponmlkjihgfedcba",
    "01234567890",
    "09876543210",
    "qwertyuiopasdfghjklzxcvbnm",
    "mnbvcxzlkjhgfdsapoiuytrewq",
];

const RUN_LENGTH: usize = 3;

pub struct NonEmpty;

impl PolicyRule for NonEmpty {
    fn name(&self) -> &'static str {
        "non_empty"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        if candidate.is_empty() {
            Err(PolicyViolation::Empty)
        } else {
            Ok(())
        }
    }
}

pub struct Length;

impl PolicyRule for Length {
    fn name(&self) -> &'static str {
        "length"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let length = candidate.chars().count();
        if length < MIN_LENGTH {
            Err(PolicyViolation::TooShort { min: MIN_LENGTH })
        } else if length > MAX_LENGTH {
            Err(PolicyViolation::TooLong { max: MAX_LENGTH })
        } else {
            Ok(())
        }
    }
}

/// Uppercase, lowercase, digit and symbol, checked in that order.
pub struct CharacterClasses;

impl PolicyRule for CharacterClasses {
    fn name(&self) -> &'static str {
        "character_classes"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PolicyViolation::MissingUppercase);
        }
        if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PolicyViolation::MissingLowercase);
        }
        if !candidate.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyViolation::MissingDigit);
        }
        if !candidate.chars().any(|c| SYMBOLS.contains(c)) {
            return Err(PolicyViolation::MissingSymbol);
        }
        Ok(())
    }
}

pub struct NotCommon;

impl PolicyRule for NotCommon {
    fn name(&self) -> &'static str {
        "not_common"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let lower = candidate.to_lowercase();
        let weak = COMMON_PASSWORDS
            .iter()
            .any(|common| lower.contains(common) || common.contains(lower.as_str()));

        if weak {
            Err(PolicyViolation::TooCommon)
        } else {
            Ok(())
        }
    }
}

pub struct NoSequentialRuns;

impl PolicyRule for NoSequentialRuns {
    fn name(&self) -> &'static str {
        "no_sequential_runs"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let lower: Vec<char> = candidate.to_lowercase().chars().collect();
        let sequential = lower.windows(RUN_LENGTH).any(|window| {
            let run: String = window.iter().collect();
            SEQUENCES.iter().any(|sequence| sequence.contains(&run))
        });

        if sequential {
            Err(PolicyViolation::SequentialCharacters)
        } else {
            Ok(())
        }
    }
}

pub struct NoRepeatedCharacters;

impl PolicyRule for NoRepeatedCharacters {
    fn name(&self) -> &'static str {
        "no_repeated_characters"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let chars: Vec<char> = candidate.chars().collect();
        let repeated = chars
            .windows(RUN_LENGTH)
            .any(|window| window.iter().all(|c| *c == window[0]));

        if repeated {
            Err(PolicyViolation::RepeatedCharacters)
        } else {
            Ok(())
        }
    }
}

/// Rejects a block of two or more characters occurring three times in a row.
pub struct NoRepeatedPatterns;

impl PolicyRule for NoRepeatedPatterns {
    fn name(&self) -> &'static str {
        "no_repeated_patterns"
    }

    fn check(&self, candidate: &str, _context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let chars: Vec<char> = candidate.chars().collect();
        let len = chars.len();

        for block in 2..=len / RUN_LENGTH {
            for start in 0..=len - block * RUN_LENGTH {
                let first = &chars[start..start + block];
                let repeats = (1..RUN_LENGTH).all(|n| {
                    let offset = start + n * block;
                    &chars[offset..offset + block] == first
                });
                if repeats {
                    return Err(PolicyViolation::RepeatedPattern);
                }
            }
        }

        Ok(())
    }
}

pub struct NotUsername;

impl PolicyRule for NotUsername {
    fn name(&self) -> &'static str {
        "not_username"
    }

    fn check(&self, candidate: &str, context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        if context.username.is_empty() {
            return Ok(());
        }

        if candidate
            .to_lowercase()
            .contains(&context.username.to_lowercase())
        {
            Err(PolicyViolation::ContainsUsername)
        } else {
            Ok(())
        }
    }
}

pub struct NotEmailLocalPart;

impl PolicyRule for NotEmailLocalPart {
    fn name(&self) -> &'static str {
        "not_email_local_part"
    }

    fn check(&self, candidate: &str, context: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        let local_part = context
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        if !local_part.is_empty() && candidate.to_lowercase().contains(&local_part) {
            Err(PolicyViolation::ContainsEmail)
        } else {
            Ok(())
        }
    }
}
