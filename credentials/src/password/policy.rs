use super::errors::PolicyViolation;
use super::rules::CharacterClasses;
use super::rules::Length;
use super::rules::NoRepeatedCharacters;
use super::rules::NoRepeatedPatterns;
use super::rules::NoSequentialRuns;
use super::rules::NonEmpty;
use super::rules::NotCommon;
use super::rules::NotEmailLocalPart;
use super::rules::NotUsername;
use super::rules::PolicyRule;

/// Account data a candidate password is compared against.
///
/// Empty fields are skipped by the rules that use them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyContext<'a> {
    pub username: &'a str,
    pub email: &'a str,
}

impl<'a> PolicyContext<'a> {
    pub fn new(username: &'a str, email: &'a str) -> Self {
        Self { username, email }
    }
}

/// Ordered password rule set.
///
/// Evaluation stops at the first failing rule, so rule order decides which
/// message the user sees.
pub struct PasswordPolicy {
    rules: Vec<Box<dyn PolicyRule>>,
}

impl PasswordPolicy {
    /// Build a policy from an explicit rule order.
    pub fn new(rules: Vec<Box<dyn PolicyRule>>) -> Self {
        Self { rules }
    }

    /// The account password policy:
    ///
    /// 1. non-empty
    /// 2. 12 to 128 characters
    /// 3. uppercase, lowercase, digit and symbol present
    /// 4. not a known weak password
    /// 5. no sequential runs (`abc`, `321`, `qwe`)
    /// 6. no three identical characters in a row
    /// 7. no block repeated three times in a row
    /// 8. does not contain the username
    /// 9. does not contain the email local part
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(NonEmpty),
            Box::new(Length),
            Box::new(CharacterClasses),
            Box::new(NotCommon),
            Box::new(NoSequentialRuns),
            Box::new(NoRepeatedCharacters),
            Box::new(NoRepeatedPatterns),
            Box::new(NotUsername),
            Box::new(NotEmailLocalPart),
        ])
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Evaluate a candidate password.
    ///
    /// # Returns
    /// The first failing rule's violation, or `None` when every rule passes
    pub fn validate(&self, candidate: &str, context: &PolicyContext<'_>) -> Option<PolicyViolation> {
        self.rules.iter().find_map(|rule| {
            rule.check(candidate, context).err().inspect(|_| {
                tracing::debug!(rule = rule.name(), "Password rejected by policy");
            })
        })
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
