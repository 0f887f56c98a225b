//! Declarative response assertions
//!
//! Each assertion names a dot-path into the response payload and, for the
//! comparing kinds, an expected operand. Operands are authored as text:
//! `eq`, `neq` and `contains` compare text forms, `gte` and `lte` compare
//! numbers parsed from text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::{coerce_number, coerce_string, lookup_path};

/// One validation assertion of a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Assertion {
    /// Text forms are equal
    Eq {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    /// Text forms differ
    Neq {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    /// Value is present and not null
    HasField { field: String },
    /// Value is present, not null, not `""`, not `0` and not `[]`
    NotEmpty { field: String },
    /// Text form contains the operand
    Contains {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    /// Numerically greater than or equal
    Gte {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    /// Numerically less than or equal
    Lte {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

impl Assertion {
    /// Short kind name as written in case files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Eq { .. } => "eq",
            Self::Neq { .. } => "neq",
            Self::HasField { .. } => "hasField",
            Self::NotEmpty { .. } => "notEmpty",
            Self::Contains { .. } => "contains",
            Self::Gte { .. } => "gte",
            Self::Lte { .. } => "lte",
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::Neq { field, .. }
            | Self::HasField { field }
            | Self::NotEmpty { field }
            | Self::Contains { field, .. }
            | Self::Gte { field, .. }
            | Self::Lte { field, .. } => field,
        }
    }

    /// Expected operand, absent for `hasField` and `notEmpty`
    pub fn operand(&self) -> Option<&Value> {
        match self {
            Self::Eq { value, .. }
            | Self::Neq { value, .. }
            | Self::Contains { value, .. }
            | Self::Gte { value, .. }
            | Self::Lte { value, .. } => value.as_ref(),
            Self::HasField { .. } | Self::NotEmpty { .. } => None,
        }
    }
}

impl std::fmt::Display for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand() {
            Some(value) => write!(
                f,
                "{}:{}={}",
                self.kind(),
                self.field(),
                coerce_string(Some(value))
            ),
            None => write!(f, "{}:{}", self.kind(), self.field()),
        }
    }
}

/// Outcome of one assertion against a payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionOutcome {
    #[serde(flatten)]
    pub assertion: Assertion,
    pub pass: bool,
    /// Display form of the looked-up value
    pub actual: String,
}

/// Evaluate one assertion against a response payload
///
/// Objects and arrays in `actual` are shown as JSON cut to
/// `preview_chars` characters.
pub fn evaluate(assertion: &Assertion, payload: &Value, preview_chars: usize) -> AssertionOutcome {
    let found = lookup_path(payload, assertion.field());

    let pass = match assertion {
        Assertion::Eq { value, .. } => text_eq(found, value.as_ref()),
        Assertion::Neq { value, .. } => !text_eq(found, value.as_ref()),
        Assertion::HasField { .. } => has_field(found),
        Assertion::NotEmpty { .. } => not_empty(found),
        Assertion::Contains { value, .. } => contains(found, value.as_ref()),
        Assertion::Gte { value, .. } => coerce_number(found) >= coerce_number(value.as_ref()),
        Assertion::Lte { value, .. } => coerce_number(found) <= coerce_number(value.as_ref()),
    };

    AssertionOutcome {
        assertion: assertion.clone(),
        pass,
        actual: display_actual(found, preview_chars),
    }
}

/// Evaluate a list of assertions in order
pub fn evaluate_all(
    assertions: &[Assertion],
    payload: &Value,
    preview_chars: usize,
) -> Vec<AssertionOutcome> {
    assertions
        .iter()
        .map(|a| evaluate(a, payload, preview_chars))
        .collect()
}

/// A case passes iff every assertion passes; an empty list passes
pub fn all_pass(outcomes: &[AssertionOutcome]) -> bool {
    outcomes.iter().all(|o| o.pass)
}

fn text_eq(found: Option<&Value>, expected: Option<&Value>) -> bool {
    coerce_string(found) == coerce_string(expected)
}

fn has_field(found: Option<&Value>) -> bool {
    !matches!(found, None | Some(Value::Null))
}

fn not_empty(found: Option<&Value>) -> bool {
    match found {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Object(_)) => true,
    }
}

fn contains(found: Option<&Value>, expected: Option<&Value>) -> bool {
    // falsy values search as the empty string
    let haystack = if is_falsy(found) {
        String::new()
    } else {
        coerce_string(found)
    };
    haystack.contains(&coerce_string(expected))
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

fn display_actual(found: Option<&Value>, preview_chars: usize) -> String {
    match found {
        Some(v @ (Value::Object(_) | Value::Array(_))) => {
            v.to_string().chars().take(preview_chars).collect()
        }
        other => coerce_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(assertion: Assertion, payload: Value) -> AssertionOutcome {
        evaluate(&assertion, &payload, 60)
    }

    fn not_empty_on(value: Value) -> bool {
        check(
            Assertion::NotEmpty {
                field: "v".to_string(),
            },
            json!({ "v": value }),
        )
        .pass
    }

    #[test]
    fn test_deserialize_assertion_kinds() {
        let list: Vec<Assertion> = serde_json::from_str(
            r#"[
                {"type": "eq", "field": "code", "value": "200"},
                {"type": "hasField", "field": "data.id", "value": ""},
                {"type": "gte", "field": "data.age", "value": 18}
            ]"#,
        )
        .unwrap();
        assert_eq!(list[0].kind(), "eq");
        assert_eq!(
            list[1],
            Assertion::HasField {
                field: "data.id".to_string()
            }
        );
        assert_eq!(list[2].operand(), Some(&json!(18)));
    }

    #[test]
    fn test_eq_coerces_to_text() {
        let eq = |value: Value, expected: &str| {
            check(
                Assertion::Eq {
                    field: "v".to_string(),
                    value: Some(json!(expected)),
                },
                json!({ "v": value }),
            )
            .pass
        };
        assert!(eq(json!(0), "0"));
        assert!(eq(json!(true), "true"));
        assert!(eq(json!("200"), "200"));
        assert!(!eq(json!(200), "201"));
    }

    #[test]
    fn test_neq_on_missing_field() {
        let outcome = check(
            Assertion::Neq {
                field: "missing".to_string(),
                value: Some(json!("x")),
            },
            json!({}),
        );
        assert!(outcome.pass);
        assert_eq!(outcome.actual, "undefined");
    }

    #[test]
    fn test_has_field_accepts_empty_and_zero() {
        let has = |payload: Value| {
            check(
                Assertion::HasField {
                    field: "v".to_string(),
                },
                payload,
            )
            .pass
        };
        assert!(has(json!({"v": ""})));
        assert!(has(json!({"v": 0})));
        assert!(!has(json!({"v": null})));
        assert!(!has(json!({})));
    }

    #[test]
    fn test_not_empty_rejects_empty_values() {
        assert!(!not_empty_on(json!(0)));
        assert!(!not_empty_on(json!(0.0)));
        assert!(!not_empty_on(json!("")));
        assert!(!not_empty_on(json!(null)));
        assert!(!not_empty_on(json!([])));
        assert!(!check(
            Assertion::NotEmpty {
                field: "v".to_string()
            },
            json!({})
        )
        .pass);
    }

    #[test]
    fn test_not_empty_accepts_values() {
        assert!(not_empty_on(json!("x")));
        assert!(not_empty_on(json!([1])));
        assert!(not_empty_on(json!(false)));
        assert!(not_empty_on(json!({})));
    }

    #[test]
    fn test_contains_substring() {
        let contains = |payload: Value, needle: &str| {
            check(
                Assertion::Contains {
                    field: "v".to_string(),
                    value: Some(json!(needle)),
                },
                payload,
            )
            .pass
        };
        assert!(contains(json!({"v": "hello world"}), "lo wo"));
        assert!(contains(json!({"v": 12345}), "234"));
        assert!(!contains(json!({"v": null}), "null"));
        assert!(!contains(json!({}), "undefined"));
    }

    #[test]
    fn test_gte_lte_numeric() {
        let gte = |payload: Value, bound: Value| {
            check(
                Assertion::Gte {
                    field: "v".to_string(),
                    value: Some(bound),
                },
                payload,
            )
            .pass
        };
        let lte = |payload: Value, bound: Value| {
            check(
                Assertion::Lte {
                    field: "v".to_string(),
                    value: Some(bound),
                },
                payload,
            )
            .pass
        };
        assert!(gte(json!({"v": 18}), json!("18")));
        assert!(gte(json!({"v": "20"}), json!(18)));
        assert!(!gte(json!({"v": 17}), json!("18")));
        assert!(lte(json!({"v": 17.5}), json!("18")));
        assert!(!lte(json!({"v": 19}), json!("18")));
    }

    #[test]
    fn test_gte_lte_non_numeric_fail() {
        for actual in [json!("abc"), json!(null), json!([1, 2]), json!({"a": 1})] {
            let payload = json!({ "v": actual });
            for assertion in [
                Assertion::Gte {
                    field: "v".to_string(),
                    value: Some(json!("0")),
                },
                Assertion::Lte {
                    field: "v".to_string(),
                    value: Some(json!("0")),
                },
            ] {
                assert!(!evaluate(&assertion, &payload, 60).pass);
            }
        }
        assert!(!check(
            Assertion::Gte {
                field: "v".to_string(),
                value: Some(json!("x"))
            },
            json!({"v": 1})
        )
        .pass);
    }

    #[test]
    fn test_actual_display() {
        let outcome = check(
            Assertion::HasField {
                field: "data".to_string(),
            },
            json!({"data": {"name": "a very long value that will certainly be cut off somewhere in the middle"}}),
        );
        assert_eq!(outcome.actual.chars().count(), 60);
        assert!(outcome.actual.starts_with("{\"name\":"));
        assert!(!outcome.actual.ends_with('…'));

        let outcome = check(
            Assertion::HasField {
                field: "data".to_string(),
            },
            json!({"data": null}),
        );
        assert_eq!(outcome.actual, "null");
    }

    #[test]
    fn test_overall_status() {
        let payload = json!({"code": "200", "data": {"age": 17}});
        let outcomes = evaluate_all(
            &[
                Assertion::Eq {
                    field: "code".to_string(),
                    value: Some(json!("200")),
                },
                Assertion::Gte {
                    field: "data.age".to_string(),
                    value: Some(json!("18")),
                },
            ],
            &payload,
            60,
        );
        assert!(!all_pass(&outcomes));
        assert_eq!(outcomes.iter().filter(|o| !o.pass).count(), 1);
        assert_eq!(outcomes[1].assertion.kind(), "gte");
        assert_eq!(outcomes[1].actual, "17");

        assert!(all_pass(&[]));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = check(
            Assertion::Eq {
                field: "code".to_string(),
                value: Some(json!("200")),
            },
            json!({"code": "200"}),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({"type": "eq", "field": "code", "value": "200", "pass": true, "actual": "200"})
        );
    }
}
