//! The policy rules: keyword blacklist, operation allowlist, and
//! injection-pattern heuristics.
//!
//! All checks run against a lowercased, trimmed copy of the statement; the
//! original text is what ultimately executes. The rule tables are fixed at
//! compile time and the patterns compile once per validator.

use regex::Regex;
use serde_json::Value as JsonValue;

use super::{OperationKind, Verdict};

/// Maximum number of bound parameters per statement.
pub const MAX_PARAMS: usize = 100;

/// Substrings whose presence anywhere in a statement makes it inadmissible.
///
/// Deliberately broad: schema mutation, privilege management, file access,
/// and stored/extended procedure invocation. False positives are acceptable,
/// false negatives are not.
const DANGEROUS_KEYWORDS: &[&str] = &[
    "drop table",
    "drop database",
    "truncate",
    "alter table",
    "create database",
    "drop index",
    "create user",
    "drop user",
    "grant",
    "revoke",
    "load_file",
    "into outfile",
    "into dumpfile",
    "exec",
    "execute",
    "sp_",
    "xp_",
];

/// Injection-pattern heuristics, matched against the normalized statement.
const INJECTION_PATTERNS: &[&str] = &[
    r"union\s+select",
    r";\s*(drop|delete|update|insert)",
    r"--\s*$",
    r"/\*.*?\*/",
    r"'.*?'.*?or.*?'.*?'=",
    r#"".*?".*?or.*?".*?"="#,
];

/// Validator for statements and parameter lists.
///
/// Holds the compiled injection patterns; construct once and reuse.
#[derive(Debug)]
pub struct SqlValidator {
    injection_patterns: Vec<Regex>,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlValidator {
    /// Creates a new validator, compiling the pattern tables.
    pub fn new() -> Self {
        let injection_patterns = INJECTION_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("injection pattern must compile"))
            .collect();

        Self { injection_patterns }
    }

    /// Validates a statement against the safety policy.
    ///
    /// Checks run in order and short-circuit on the first failure:
    /// emptiness, keyword blacklist, operation allowlist, injection
    /// patterns. The returned verdict carries the classified operation kind.
    pub fn validate_statement(&self, sql: &str) -> Verdict {
        let normalized = sql.to_lowercase().trim().to_string();

        if normalized.is_empty() {
            return Verdict::reject(OperationKind::Unknown, "statement must be a non-empty string");
        }

        for keyword in DANGEROUS_KEYWORDS {
            if normalized.contains(keyword) {
                return Verdict::reject(
                    classify_operation(&normalized),
                    format!("dangerous operation detected: {keyword}"),
                );
            }
        }

        let operation = classify_operation(&normalized);
        if operation == OperationKind::Unknown {
            return Verdict::reject(operation, "unsupported operation type: unknown");
        }

        for pattern in &self.injection_patterns {
            if pattern.is_match(&normalized) {
                return Verdict::reject(operation, "potential SQL injection pattern detected");
            }
        }

        Verdict::admit(operation)
    }

    /// Validates a parameter list: must be a JSON array of at most
    /// [`MAX_PARAMS`] elements. Values themselves are not inspected; the
    /// driver's positional binding is trusted to neutralize them.
    pub fn validate_params(&self, params: &JsonValue) -> Verdict {
        let Some(list) = params.as_array() else {
            return Verdict::reject(OperationKind::Unknown, "parameters must be an array");
        };

        if list.len() > MAX_PARAMS {
            return Verdict::reject(
                OperationKind::Unknown,
                format!("parameter count exceeds the limit of {MAX_PARAMS}"),
            );
        }

        Verdict::admit(OperationKind::Unknown)
    }
}

/// Classifies the operation kind from the leading token of a normalized
/// statement.
fn classify_operation(normalized: &str) -> OperationKind {
    let trimmed = normalized.trim_start();
    if trimmed.starts_with("select") {
        OperationKind::Select
    } else if trimmed.starts_with("insert") {
        OperationKind::Insert
    } else if trimmed.starts_with("update") {
        OperationKind::Update
    } else if trimmed.starts_with("delete") {
        OperationKind::Delete
    } else {
        OperationKind::Unknown
    }
}

/// Convenience function to validate a statement without holding a validator.
pub fn validate_sql(sql: &str) -> Verdict {
    SqlValidator::new().validate_statement(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admits_plain_select() {
        let verdict = validate_sql("SELECT id, name FROM users WHERE id = ?");
        assert!(verdict.admissible);
        assert_eq!(verdict.operation, OperationKind::Select);
    }

    #[test]
    fn test_admits_crud_statements() {
        let validator = SqlValidator::new();
        let cases = [
            ("INSERT INTO t (v) VALUES (?)", OperationKind::Insert),
            ("UPDATE t SET v = ? WHERE id = ?", OperationKind::Update),
            ("DELETE FROM t WHERE id = ?", OperationKind::Delete),
            ("  select 1  ", OperationKind::Select),
        ];

        for (sql, expected) in cases {
            let verdict = validator.validate_statement(sql);
            assert!(verdict.admissible, "expected admit for: {sql}");
            assert_eq!(verdict.operation, expected);
        }
    }

    #[test]
    fn test_rejects_empty_statement() {
        let verdict = validate_sql("   ");
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("non-empty"));
    }

    #[test]
    fn test_rejects_every_blacklisted_keyword() {
        let validator = SqlValidator::new();
        for keyword in DANGEROUS_KEYWORDS {
            let sql = format!("SELECT * FROM t WHERE {keyword} = 1");
            let verdict = validator.validate_statement(&sql);
            assert!(!verdict.admissible, "expected reject for keyword: {keyword}");

            // Overlapping entries (e.g. "exec" inside "execute") may be the
            // one reported; the reason must name a keyword the statement
            // actually contains.
            let named = verdict
                .reason_or_default()
                .strip_prefix("dangerous operation detected: ")
                .expect("reason should name a keyword");
            assert!(sql.to_lowercase().contains(named));
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let verdict = validate_sql("DrOp TaBlE users");
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("drop table"));
    }

    #[test]
    fn test_rejects_unsupported_operations() {
        let validator = SqlValidator::new();
        for sql in ["SHOW TABLES", "DESCRIBE users", "CREATE TABLE t (id INT)", "WITH x AS (SELECT 1) SELECT * FROM x"] {
            let verdict = validator.validate_statement(sql);
            assert!(!verdict.admissible, "expected reject for: {sql}");
            assert_eq!(verdict.operation, OperationKind::Unknown);
        }
    }

    #[test]
    fn test_rejects_union_select() {
        let verdict = validate_sql("SELECT name FROM users UNION SELECT password FROM accounts");
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("injection"));
    }

    #[test]
    fn test_rejects_stacked_mutation() {
        let verdict = validate_sql("SELECT * FROM a; DELETE FROM a");
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("injection"));
    }

    #[test]
    fn test_rejects_trailing_comment() {
        let verdict = validate_sql("SELECT * FROM users WHERE id = 1 --");
        assert!(!verdict.admissible);
    }

    #[test]
    fn test_rejects_block_comment() {
        let verdict = validate_sql("SELECT /* sneak */ * FROM users");
        assert!(!verdict.admissible);
    }

    #[test]
    fn test_rejects_quoted_tautology() {
        let single = validate_sql("SELECT * FROM users WHERE name = '' OR '1'='1'");
        assert!(!single.admissible);

        let double = validate_sql(r#"SELECT * FROM users WHERE name = "" OR "1"="1""#);
        assert!(!double.admissible);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = SqlValidator::new();
        let first = validator.validate_statement("SELECT 1");
        let second = validator.validate_statement("SELECT 1");
        assert_eq!(first, second);

        let first = validator.validate_statement("DROP TABLE users");
        let second = validator.validate_statement("DROP TABLE users");
        assert_eq!(first, second);
    }

    #[test]
    fn test_params_must_be_array() {
        let validator = SqlValidator::new();

        assert!(validator.validate_params(&json!([1, "a", null, true])).admissible);
        assert!(!validator.validate_params(&json!({"a": 1})).admissible);
        assert!(!validator.validate_params(&json!("scalar")).admissible);
        assert!(!validator.validate_params(&json!(42)).admissible);
    }

    #[test]
    fn test_params_limit() {
        let validator = SqlValidator::new();

        let at_limit: Vec<i64> = (0..MAX_PARAMS as i64).collect();
        assert!(validator.validate_params(&json!(at_limit)).admissible);

        let over_limit: Vec<i64> = (0..=MAX_PARAMS as i64).collect();
        let verdict = validator.validate_params(&json!(over_limit));
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("100"));
    }

    #[test]
    fn test_blacklist_wins_over_classification() {
        // "drop table" is caught by the keyword scan before the leading
        // token ever gets classified.
        let verdict = validate_sql("DROP TABLE users");
        assert!(!verdict.admissible);
        assert!(verdict.reason_or_default().contains("drop table"));
    }
}
