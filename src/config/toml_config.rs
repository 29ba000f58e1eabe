use crate::core::edit::ColumnRule;
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const AUTOMATION_BASE: &str = "http://localhost:5678/webhook";
const REGISTRY_BASE: &str = "http://localhost:8081";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub webhooks: WebhookConfig,
    pub registry: RegistryConfig,
    pub verification: VerificationConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 固定的處理 webhook，依序對應 webhook1..webhookN
    pub processing: Vec<String>,
    pub extraction: String,
    pub dataset: Option<String>,
    pub calculation: String,
    pub emission_prompts: Option<String>,
    pub report: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        let hook = |name: &str| format!("{}/{}", AUTOMATION_BASE, name);
        Self {
            processing: vec![
                hook("Energy_Utilities"),
                hook("Water_land_Use"),
                hook("Fuels_and_Combustion"),
                hook("Mobility"),
                hook("Procurement_and_waste"),
            ],
            extraction: hook("extraction"),
            dataset: None,
            calculation: hook("ecalc"),
            emission_prompts: None,
            report: hook("report"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub table: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: REGISTRY_BASE.to_string(),
            table: "sustainability_records".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn agents_url(&self) -> String {
        format!("{}/py-agents", self.base_url.trim_end_matches('/'))
    }

    pub fn invoke_url(&self, slug: &str) -> String {
        format!("{}/{}", self.agents_url(), slug)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub records_url: String,
    pub update_url: String,
    pub auth_token: String,
    pub page_size: usize,
    pub editable_columns: BTreeMap<String, ColumnRule>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            records_url: format!("{}/data-verification", AUTOMATION_BASE),
            update_url: format!("{}/data-verification-update", AUTOMATION_BASE),
            auth_token: "Bearer devtoken123".to_string(),
            page_size: 25,
            editable_columns: default_editable_columns(),
        }
    }
}

fn default_editable_columns() -> BTreeMap<String, ColumnRule> {
    let text = |label: Option<&str>| ColumnRule::String {
        max: None,
        label: label.map(str::to_string),
    };
    let number = |integer: bool| ColumnRule::Number {
        min: Some(0.0),
        integer,
        label: None,
    };

    let mut columns = BTreeMap::new();
    columns.insert("destination".to_string(), text(Some("Destination")));
    columns.insert("class_of_travel".to_string(), text(Some("Class of Travel")));
    columns.insert(
        "no_of_passengers".to_string(),
        ColumnRule::Number {
            min: Some(0.0),
            integer: true,
            label: None,
        },
    );
    columns.insert("trip_mode".to_string(), text(Some("Trip Mode")));
    columns.insert("vehicle_model".to_string(), text(None));
    columns.insert("vehicle_make".to_string(), text(Some("Vehicle Make")));
    columns.insert("site".to_string(), text(None));
    columns.insert("account_type".to_string(), text(None));
    columns.insert("consumption".to_string(), number(false));
    columns.insert("unit".to_string(), text(None));
    columns.insert("amount_spent".to_string(), number(false));
    columns.insert("scope".to_string(), text(None));
    columns.insert("emission_factor".to_string(), number(false));
    columns.insert(
        "reason".to_string(),
        ColumnRule::String {
            max: Some(500),
            label: None,
        },
    );
    columns
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 未設定時不限制，交由網路堆疊處理
    pub timeout_seconds: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub download_dir: String,
    /// 擷取成功後自動以瀏覽器開啟結果
    pub auto_open: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
            auto_open: true,
        }
    }
}

impl ConsoleConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConsoleError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConsoleError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DASHBOARD_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            ConsoleError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn column_rule(&self, column: &str) -> Option<&ColumnRule> {
        self.verification.editable_columns.get(column)
    }
}

impl Validate for ConsoleConfig {
    fn validate(&self) -> Result<()> {
        if self.webhooks.processing.is_empty() {
            return Err(ConsoleError::MissingConfigError {
                field: "webhooks.processing".to_string(),
            });
        }
        for (index, url) in self.webhooks.processing.iter().enumerate() {
            validate_url(&format!("webhooks.processing[{}]", index), url)?;
        }
        validate_url("webhooks.extraction", &self.webhooks.extraction)?;
        validate_url("webhooks.calculation", &self.webhooks.calculation)?;
        validate_url("webhooks.report", &self.webhooks.report)?;
        if let Some(dataset) = &self.webhooks.dataset {
            validate_url("webhooks.dataset", dataset)?;
        }
        if let Some(prompts) = &self.webhooks.emission_prompts {
            validate_url("webhooks.emission_prompts", prompts)?;
        }

        validate_url("registry.base_url", &self.registry.base_url)?;
        validate_non_empty_string("registry.table", &self.registry.table)?;

        validate_url("verification.records_url", &self.verification.records_url)?;
        validate_url("verification.update_url", &self.verification.update_url)?;
        validate_positive_number("verification.page_size", self.verification.page_size, 1)?;
        for (column, rule) in &self.verification.editable_columns {
            rule.validate().map_err(|e| ConsoleError::InvalidConfigValueError {
                field: format!("verification.editable_columns.{}", column),
                value: format!("{:?}", rule),
                reason: e.to_string(),
            })?;
        }

        validate_path("output.download_dir", &self.output.download_dir)?;
        Ok(())
    }
}
