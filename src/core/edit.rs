//! 表格儲存格的行內編輯：欄位規則、輸入驗證與狀態轉換
//!
//! 狀態：`Viewing → Editing → Saving → Viewing`，取消時 `Editing → Viewing`。
//! 驗證失敗或值未變更時不會產生更新請求。

use crate::utils::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// 超過此長度上限的文字欄位使用多行輸入
const LONG_TEXT_THRESHOLD: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnRule {
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        integer: bool,
        #[serde(default)]
        label: Option<String>,
    },
    String {
        #[serde(default)]
        max: Option<usize>,
        #[serde(default)]
        label: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Numeric { min: Option<f64>, step: Option<u32> },
    ShortText,
    LongText { max: usize },
}

impl ColumnRule {
    pub fn label(&self) -> Option<&str> {
        match self {
            ColumnRule::Number { label, .. } | ColumnRule::String { label, .. } => label.as_deref(),
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            ColumnRule::Number { min, integer, .. } => InputKind::Numeric {
                min: *min,
                step: integer.then_some(1),
            },
            ColumnRule::String { max: Some(max), .. } if *max > LONG_TEXT_THRESHOLD => {
                InputKind::LongText { max: *max }
            }
            ColumnRule::String { .. } => InputKind::ShortText,
        }
    }

    /// 規則本身是否合理，用於配置檢查
    pub fn validate(&self) -> Result<()> {
        match self {
            ColumnRule::Number { min: Some(min), .. } if !min.is_finite() => {
                Err(ConsoleError::validation("min must be a finite number"))
            }
            ColumnRule::String { max: Some(0), .. } => {
                Err(ConsoleError::validation("max must be greater than zero"))
            }
            _ => Ok(()),
        }
    }

    /// 轉換並驗證輸入值
    pub fn coerce(&self, raw: &str) -> std::result::Result<Value, String> {
        match self {
            ColumnRule::Number { min, integer, .. } => {
                let num: f64 = raw
                    .trim()
                    .parse()
                    .ok()
                    .filter(|n: &f64| n.is_finite())
                    .ok_or_else(|| "Must be a number".to_string())?;
                if *integer && num.fract() != 0.0 {
                    return Err("Must be an integer".to_string());
                }
                if let Some(min) = min {
                    if num < *min {
                        return Err(format!("Must be ≥ {}", format_number(*min)));
                    }
                }
                Ok(number_value(num))
            }
            ColumnRule::String { max, .. } => {
                let text = raw.trim();
                if let Some(max) = max {
                    if text.chars().count() > *max {
                        return Err(format!("Max length {}", max));
                    }
                }
                Ok(Value::String(text.to_string()))
            }
        }
    }
}

/// 整數值以整數輸出 (5 而非 5.0)
fn number_value(num: f64) -> Value {
    if num.fract() == 0.0 && num.abs() < 9_007_199_254_740_992.0 {
        Value::Number(Number::from(num as i64))
    } else {
        Number::from_f64(num)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn format_number(num: f64) -> String {
    display_value(&number_value(num))
}

/// 儲存格顯示文字
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        // 120.0 顯示為 120
        Value::Number(num) if num.is_f64() => match num.as_f64() {
            Some(f) if f.is_finite() => number_value(f).to_string(),
            _ => num.to_string(),
        },
        other => other.to_string(),
    }
}

/// 送往更新 webhook 的內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub id: String,
    pub column: String,
    pub new_value: Value,
    pub previous_value: String,
    pub updated_at: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellState {
    Viewing { display: String },
    Editing { original: String, input: InputKind },
    Saving { original: String, request: UpdateRequest },
}

/// 提交後的決定
#[derive(Debug, Clone, PartialEq)]
pub enum CommitDecision {
    /// 值未變更，直接回到顯示狀態
    Unchanged,
    /// 驗證失敗，已還原
    Invalid { message: String },
    /// 需要送出更新
    Save(UpdateRequest),
}

#[derive(Debug, Clone)]
pub struct CellEdit {
    record_id: String,
    column: String,
    updated_at: Option<Value>,
    rule: ColumnRule,
    state: CellState,
}

impl CellEdit {
    /// Viewing → Editing
    pub fn begin(
        record_id: impl Into<String>,
        column: impl Into<String>,
        current_display: &str,
        updated_at: Option<Value>,
        rule: ColumnRule,
    ) -> Self {
        let original = current_display.trim().to_string();
        let input = rule.input_kind();
        Self {
            record_id: record_id.into(),
            column: column.into(),
            updated_at,
            rule,
            state: CellState::Editing { original, input },
        }
    }

    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// 編輯前的顯示值；回到 Viewing 後即為目前顯示值
    pub fn original(&self) -> &str {
        match &self.state {
            CellState::Editing { original, .. } | CellState::Saving { original, .. } => original,
            CellState::Viewing { display } => display,
        }
    }

    /// Editing → Viewing，還原原值
    pub fn cancel(&mut self) -> &str {
        let original = self.original().to_string();
        self.state = CellState::Viewing { display: original };
        self.original()
    }

    /// Editing → Saving，或在未變更/驗證失敗時回到 Viewing
    pub fn commit(&mut self, raw: &str) -> CommitDecision {
        let original = match &self.state {
            CellState::Editing { original, .. } => original.clone(),
            _ => return CommitDecision::Unchanged,
        };

        if raw == original {
            self.state = CellState::Viewing { display: original };
            return CommitDecision::Unchanged;
        }

        let value = match self.rule.coerce(raw) {
            Ok(value) => value,
            Err(message) => {
                self.state = CellState::Viewing { display: original };
                return CommitDecision::Invalid { message };
            }
        };

        if display_value(&value) == original {
            self.state = CellState::Viewing { display: original };
            return CommitDecision::Unchanged;
        }

        let request = UpdateRequest {
            id: self.record_id.clone(),
            column: self.column.clone(),
            new_value: value,
            previous_value: original.clone(),
            updated_at: self.updated_at.clone(),
        };
        self.state = CellState::Saving {
            original,
            request: request.clone(),
        };
        CommitDecision::Save(request)
    }

    /// Saving → Viewing：成功顯示新值，失敗還原原值
    pub fn finish(&mut self, saved: bool) -> &str {
        let display = match &self.state {
            CellState::Saving { original, request } => {
                if saved {
                    display_value(&request.new_value)
                } else {
                    original.clone()
                }
            }
            CellState::Editing { original, .. } => original.clone(),
            CellState::Viewing { display } => display.clone(),
        };
        self.state = CellState::Viewing { display };
        self.original()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passengers() -> ColumnRule {
        ColumnRule::Number {
            min: Some(0.0),
            integer: true,
            label: None,
        }
    }

    fn unit() -> ColumnRule {
        ColumnRule::String {
            max: None,
            label: None,
        }
    }

    fn reason() -> ColumnRule {
        ColumnRule::String {
            max: Some(500),
            label: None,
        }
    }

    #[test]
    fn test_input_kind_per_rule() {
        assert_eq!(
            passengers().input_kind(),
            InputKind::Numeric {
                min: Some(0.0),
                step: Some(1)
            }
        );
        assert_eq!(reason().input_kind(), InputKind::LongText { max: 500 });
        assert_eq!(
            ColumnRule::String {
                max: Some(80),
                label: None
            }
            .input_kind(),
            InputKind::ShortText
        );
    }

    #[test]
    fn test_number_coercion() {
        let rule = passengers();
        assert_eq!(rule.coerce(" 3 ").unwrap(), Value::from(3));
        assert_eq!(rule.coerce("abc").unwrap_err(), "Must be a number");
        assert_eq!(rule.coerce("").unwrap_err(), "Must be a number");
        assert_eq!(rule.coerce("NaN").unwrap_err(), "Must be a number");
        assert_eq!(rule.coerce("2.5").unwrap_err(), "Must be an integer");
        assert_eq!(rule.coerce("-1").unwrap_err(), "Must be ≥ 0");

        let factor = ColumnRule::Number {
            min: Some(0.0),
            integer: false,
            label: None,
        };
        assert_eq!(factor.coerce("0.25").unwrap(), serde_json::json!(0.25));
        assert_eq!(factor.coerce("4.0").unwrap(), Value::from(4));
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(reason().coerce("  late flight ").unwrap(), Value::from("late flight"));
        let long = "x".repeat(501);
        assert_eq!(reason().coerce(&long).unwrap_err(), "Max length 500");
        let unbounded = ColumnRule::String {
            max: None,
            label: None,
        };
        assert!(unbounded.coerce(&long).is_ok());
    }

    #[test]
    fn test_below_minimum_reverts_without_request() {
        let mut edit = CellEdit::begin("7", "no_of_passengers", "2", None, passengers());
        let decision = edit.commit("-3");
        assert_eq!(
            decision,
            CommitDecision::Invalid {
                message: "Must be ≥ 0".to_string()
            }
        );
        assert_eq!(
            edit.state(),
            &CellState::Viewing {
                display: "2".to_string()
            }
        );
    }

    #[test]
    fn test_identical_value_is_unchanged() {
        let mut edit = CellEdit::begin("7", "no_of_passengers", "2", None, passengers());
        assert_eq!(edit.commit("2"), CommitDecision::Unchanged);

        let mut edit = CellEdit::begin("7", "no_of_passengers", "2", None, passengers());
        assert_eq!(edit.commit("2.0"), CommitDecision::Unchanged);

        let mut edit = CellEdit::begin("7", "site", "Plant A", None, reason());
        assert_eq!(edit.commit("  Plant A  "), CommitDecision::Unchanged);
    }

    #[test]
    fn test_commit_builds_update_request() {
        let marker = Value::from("2024-05-01T10:00:00Z");
        let mut edit =
            CellEdit::begin("7", "no_of_passengers", "2", Some(marker.clone()), passengers());
        let decision = edit.commit("4");

        let expected = UpdateRequest {
            id: "7".to_string(),
            column: "no_of_passengers".to_string(),
            new_value: Value::from(4),
            previous_value: "2".to_string(),
            updated_at: Some(marker),
        };
        assert_eq!(decision, CommitDecision::Save(expected.clone()));
        assert!(matches!(edit.state(), CellState::Saving { .. }));

        let body = serde_json::to_value(&expected).unwrap();
        assert_eq!(body["newValue"], 4);
        assert_eq!(body["previousValue"], "2");
        assert_eq!(body["updatedAt"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_finish_restores_or_applies() {
        let mut edit = CellEdit::begin("7", "unit", "kWh", None, unit());
        edit.commit("MWh");
        assert_eq!(edit.finish(false), "kWh");

        let mut edit = CellEdit::begin("7", "unit", "kWh", None, unit());
        edit.commit("MWh");
        assert_eq!(edit.finish(true), "MWh");
    }

    #[test]
    fn test_cancel_returns_original() {
        let mut edit = CellEdit::begin("7", "unit", " kWh ", None, unit());
        assert_eq!(edit.cancel(), "kWh");
        assert_eq!(
            edit.state(),
            &CellState::Viewing {
                display: "kWh".to_string()
            }
        );
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&Value::from("a")), "a");
        assert_eq!(display_value(&Value::from(12)), "12");
        assert_eq!(display_value(&Value::from(true)), "true");
        assert_eq!(display_value(&serde_json::json!(120.0)), "120");
        assert_eq!(display_value(&serde_json::json!(0.25)), "0.25");
    }

    #[test]
    fn test_whole_float_cell_resubmitted_is_unchanged() {
        let cell = serde_json::json!(120.0);
        let mut edit =
            CellEdit::begin("1", "consumption", &display_value(&cell), None, passengers());
        assert_eq!(edit.original(), "120");
        assert_eq!(edit.commit("120"), CommitDecision::Unchanged);
    }
}
