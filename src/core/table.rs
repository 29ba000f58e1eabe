use crate::core::edit::display_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// 驗證資料的一筆紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    /// 欄位順序與伺服器回應一致，包含 id 與 updated_at
    pub columns: Map<String, Value>,
}

impl TableRecord {
    /// updated_at 依序取 updated_at、updatedAt，缺少時為 null
    pub fn from_object(mut columns: Map<String, Value>) -> Self {
        let marker = columns
            .get("updated_at")
            .filter(|value| !value.is_null())
            .or_else(|| columns.get("updatedAt").filter(|value| !value.is_null()))
            .cloned()
            .unwrap_or(Value::Null);
        columns.insert("updated_at".to_string(), marker);
        Self { columns }
    }

    /// id 以字串比較
    pub fn id(&self) -> String {
        self.columns.get("id").map(display_value).unwrap_or_default()
    }

    pub fn updated_at(&self) -> Option<Value> {
        self.columns
            .get("updated_at")
            .filter(|value| !value.is_null())
            .cloned()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn display(&self, column: &str) -> String {
        self.get(column).map(display_value).unwrap_or_default()
    }

    pub fn set(&mut self, column: &str, value: Value) {
        self.columns.insert(column.to_string(), value);
    }

    fn matches(&self, query: &str) -> bool {
        self.columns
            .values()
            .any(|value| display_value(value).to_lowercase().contains(query))
    }
}

/// 解析紀錄集合：陣列、{ data: [...] }、單一物件，其他情況為空
pub fn parse_records(value: Value) -> Vec<TableRecord> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("data".to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(TableRecord::from_object(map)),
            _ => None,
        })
        .collect()
}

/// 全部資料、篩選後資料與目前頁面
#[derive(Debug, Clone)]
pub struct TableView {
    all: Vec<TableRecord>,
    filtered: Vec<TableRecord>,
    page_size: usize,
    current_page: usize,
}

impl TableView {
    pub fn new(records: Vec<TableRecord>, page_size: usize) -> Self {
        Self {
            filtered: records.clone(),
            all: records,
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn all(&self) -> &[TableRecord] {
        &self.all
    }

    pub fn filtered(&self) -> &[TableRecord] {
        &self.filtered
    }

    pub fn total_records(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        self.total_records().div_ceil(self.page_size).max(1)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// 欄位名稱取自第一筆紀錄
    pub fn columns(&self) -> Vec<String> {
        self.filtered
            .first()
            .map(|record| record.columns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn page_items(&self) -> &[TableRecord] {
        let start = ((self.current_page - 1) * self.page_size).min(self.filtered.len());
        let end = (start + self.page_size).min(self.filtered.len());
        &self.filtered[start..end]
    }

    /// 無法解析時使用預設的 25 筆
    pub fn set_page_size(&mut self, raw: &str) {
        self.page_size = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        self.current_page = 1;
    }

    pub fn first_page(&mut self) {
        self.current_page = 1;
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    pub fn next_page(&mut self) {
        self.current_page = (self.current_page + 1).min(self.total_pages());
    }

    pub fn last_page(&mut self) {
        self.current_page = self.total_pages();
    }

    /// 不分大小寫的全文篩選，空字串還原全部資料
    pub fn apply_filter(&mut self, query: &str) {
        let query = query.trim().to_lowercase();
        self.filtered = if query.is_empty() {
            self.all.clone()
        } else {
            self.all
                .iter()
                .filter(|record| record.matches(&query))
                .cloned()
                .collect()
        };
        self.current_page = 1;
    }

    pub fn find(&self, id: &str) -> Option<&TableRecord> {
        self.all.iter().find(|record| record.id() == id)
    }

    /// 成功更新後同時寫入全部資料與篩選後資料，各自以 id 尋找
    pub fn apply_update(&mut self, id: &str, column: &str, value: &Value) -> bool {
        let mut applied = false;
        for record in self
            .all
            .iter_mut()
            .chain(self.filtered.iter_mut())
            .filter(|record| record.id() == id)
        {
            record.set(column, value.clone());
            applied = true;
        }
        applied
    }

    pub fn records_info(&self) -> String {
        let total = self.total_records();
        let start = (self.current_page - 1) * self.page_size;
        let end = (start + self.page_size).min(total);
        let first = if total > 0 { start + 1 } else { 0 };
        format!("Showing {}-{} of {} records", first, end, total)
    }

    pub fn page_indicator(&self) -> String {
        format!("{} / {}", self.current_page, self.total_pages())
    }

    /// 以 Tab 分隔輸出目前頁面
    pub fn page_as_tsv(&self) -> String {
        let columns = self.columns();
        if columns.is_empty() {
            return "No records available".to_string();
        }

        let mut lines = vec![columns
            .iter()
            .map(|column| column.replace('_', " ").to_uppercase())
            .collect::<Vec<_>>()
            .join("\t")];
        for record in self.page_items() {
            lines.push(
                columns
                    .iter()
                    .map(|column| record.display(column).replace(['\t', '\n'], " "))
                    .collect::<Vec<_>>()
                    .join("\t"),
            );
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(count: usize) -> Vec<TableRecord> {
        parse_records(Value::Array(
            (1..=count)
                .map(|i| json!({"id": i, "site": format!("Site {}", i), "consumption": i * 10}))
                .collect(),
        ))
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(parse_records(json!([{"id": 1}, {"id": 2}, 3])).len(), 2);
        assert_eq!(parse_records(json!({"data": [{"id": 1}]})).len(), 1);
        let single = parse_records(json!({"id": 9, "site": "HQ"}));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].id(), "9");
        assert!(parse_records(json!("nope")).is_empty());
    }

    #[test]
    fn test_updated_at_normalization() {
        let parsed = parse_records(json!([
            {"id": 1, "updatedAt": "2024-01-01"},
            {"id": 2, "updated_at": "2024-02-02", "updatedAt": "ignored"},
            {"id": 3}
        ]));
        assert_eq!(parsed[0].updated_at(), Some(json!("2024-01-01")));
        assert_eq!(parsed[1].updated_at(), Some(json!("2024-02-02")));
        assert_eq!(parsed[2].updated_at(), None);
        assert!(parsed[2].columns.contains_key("updated_at"));
    }

    #[test]
    fn test_pagination() {
        let mut view = TableView::new(records(60), 25);
        assert_eq!(view.total_pages(), 3);
        assert_eq!(view.page_items().len(), 25);
        assert_eq!(view.records_info(), "Showing 1-25 of 60 records");

        view.next_page();
        view.next_page();
        view.next_page();
        assert_eq!(view.current_page(), 3);
        assert_eq!(view.page_items().len(), 10);
        assert_eq!(view.records_info(), "Showing 51-60 of 60 records");
        assert_eq!(view.page_indicator(), "3 / 3");

        view.previous_page();
        assert_eq!(view.current_page(), 2);
        view.first_page();
        view.previous_page();
        assert_eq!(view.current_page(), 1);
        view.last_page();
        assert_eq!(view.current_page(), 3);

        view.set_page_size("50");
        assert_eq!(view.current_page(), 1);
        assert_eq!(view.total_pages(), 2);
        view.set_page_size("bogus");
        assert_eq!(view.total_pages(), 3);
    }

    #[test]
    fn test_empty_view() {
        let view = TableView::new(Vec::new(), 25);
        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.records_info(), "Showing 0-0 of 0 records");
        assert_eq!(view.page_as_tsv(), "No records available");
    }

    #[test]
    fn test_update_applies_to_both_views() {
        let mut view = TableView::new(records(5), 25);
        view.apply_filter("site 4");
        assert_eq!(view.filtered().len(), 1);

        assert!(view.apply_update("4", "consumption", &json!(99)));
        assert_eq!(view.find("4").unwrap().get("consumption"), Some(&json!(99)));
        assert_eq!(view.filtered()[0].get("consumption"), Some(&json!(99)));
        assert!(!view.apply_update("42", "consumption", &json!(1)));
    }

    #[test]
    fn test_tsv_output() {
        let view = TableView::new(records(1), 25);
        let tsv = view.page_as_tsv();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "ID\tSITE\tCONSUMPTION\tUPDATED AT");
        assert_eq!(lines[1], "1\tSite 1\t10\t");
    }
}
