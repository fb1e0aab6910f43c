use crate::utils::error::{JaxonError, Result};
use crate::utils::translation::SUPPORTED_LANGUAGES;
use crate::utils::validation::{
    validate_one_of, validate_path, validate_required_field, validate_uri, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_JS_LIB_URI: &str = "https://cdn.jsdelivr.net/gh/jaxon-php/jaxon-js@4.0/dist";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JaxonConfig {
    #[serde(default)]
    pub lib: LibConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// 函式庫本身的設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibConfig {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub js: JsConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub prefix: PrefixConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_uri")]
    pub uri: String,
    #[serde(default = "default_request_mode")]
    pub mode: String,
    #[serde(default = "default_request_method")]
    pub method: String,
}

/// 產生的 JS 名稱前綴
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    #[serde(default = "default_function_prefix")]
    pub function: String,
    #[serde(default = "default_class_prefix")]
    pub class: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub on: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsConfig {
    #[serde(default)]
    pub lib: JsLibConfig,
    #[serde(default)]
    pub app: JsAppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsLibConfig {
    #[serde(default = "default_js_lib_uri")]
    pub uri: String,
}

/// 產生的程式碼匯出成 JS 檔案的設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsAppConfig {
    #[serde(default)]
    pub export: bool,
    /// 檔案的公開網址前綴
    pub uri: Option<String>,
    /// 檔案寫入的目錄
    pub dir: Option<String>,
    /// 固定檔名 (不含副檔名), 未設定時使用內容雜湊
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub include: AssetsIncludeConfig,
}

/// 是否輸出各外掛的 CSS 與 JS 標籤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsIncludeConfig {
    #[serde(default = "default_true")]
    pub all: bool,
    /// 鍵為外掛名稱
    #[serde(flatten)]
    pub plugins: HashMap<String, bool>,
}

/// 應用程式要註冊的類別、目錄與函式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub options: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub path: String,
    /// 命名空間字串或選項表格
    #[serde(default)]
    pub options: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    #[serde(default)]
    pub options: Value,
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_request_uri() -> String {
    "/jaxon".to_string()
}

fn default_request_mode() -> String {
    "asynchronous".to_string()
}

fn default_request_method() -> String {
    "POST".to_string()
}

fn default_function_prefix() -> String {
    "jaxon_".to_string()
}

fn default_class_prefix() -> String {
    "Jaxon".to_string()
}

fn default_js_lib_uri() -> String {
    DEFAULT_JS_LIB_URI.to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            request: RequestConfig::default(),
            prefix: PrefixConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            uri: default_request_uri(),
            mode: default_request_mode(),
            method: default_request_method(),
        }
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            function: default_function_prefix(),
            class: default_class_prefix(),
        }
    }
}

impl Default for JsLibConfig {
    fn default() -> Self {
        Self {
            uri: default_js_lib_uri(),
        }
    }
}

impl Default for AssetsIncludeConfig {
    fn default() -> Self {
        Self {
            all: true,
            plugins: HashMap::new(),
        }
    }
}

impl AssetsIncludeConfig {
    /// 外掛自己的設定優先, 否則看 `all`
    pub fn includes(&self, plugin: &str) -> bool {
        self.plugins.get(plugin).copied().unwrap_or(self.all)
    }
}

impl JaxonConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(JaxonError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| JaxonError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${JAXON_URI}); 未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let core = &self.lib.core;
        validate_one_of("lib.core.language", &core.language, SUPPORTED_LANGUAGES)?;
        validate_uri("lib.core.request.uri", &core.request.uri)?;
        validate_one_of(
            "lib.core.request.mode",
            &core.request.mode,
            &["asynchronous", "synchronous"],
        )?;
        validate_one_of("lib.core.request.method", &core.request.method, &["POST", "GET"])?;
        validate_prefix("lib.core.prefix.function", &core.prefix.function)?;
        validate_prefix("lib.core.prefix.class", &core.prefix.class)?;

        validate_uri("lib.js.lib.uri", &self.lib.js.lib.uri)?;

        // 匯出 JS 檔案時必須知道寫到哪裡、以什麼網址提供
        let app = &self.lib.js.app;
        if app.export {
            let uri = validate_required_field("lib.js.app.uri", &app.uri)?;
            validate_uri("lib.js.app.uri", uri)?;
            let dir = validate_required_field("lib.js.app.dir", &app.dir)?;
            validate_path("lib.js.app.dir", dir)?;
        }

        for entry in &self.app.directories {
            validate_path("app.directories.path", &entry.path)?;
        }

        Ok(())
    }
}

/// 前綴會直接接在 JS 名稱前面, 只允許識別字字元
fn validate_prefix(field_name: &str, prefix: &str) -> Result<()> {
    let valid = prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !prefix.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        return Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: prefix.to_string(),
            reason: "Prefix must be a valid JavaScript identifier".to_string(),
        });
    }
    Ok(())
}

impl Validate for JaxonConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = JaxonConfig::from_toml_str("").unwrap();

        assert_eq!(config.lib.core.language, "en");
        assert_eq!(config.lib.core.request.uri, "/jaxon");
        assert_eq!(config.lib.core.request.mode, "asynchronous");
        assert_eq!(config.lib.core.prefix.function, "jaxon_");
        assert_eq!(config.lib.core.prefix.class, "Jaxon");
        assert!(!config.lib.js.app.export);
        assert!(config.lib.assets.include.all);
        assert!(config.app.classes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[lib.core]
language = "fr"

[lib.core.request]
uri = "https://example.com/ajax"
method = "GET"

[lib.core.prefix]
class = ""

[lib.core.debug]
on = true

[lib.js.app]
export = true
uri = "/js/jaxon"
dir = "./public/js/jaxon"

[lib.assets.include]
all = false
CallableClass = true

[[app.classes]]
name = "Sample"
options = { protected = ["hook"], "*" = { mode = "'synchronous'" } }

[[app.directories]]
path = "./ajax"
options = "App\\Ajax"

[[app.directories]]
path = "./legacy"
options = { separator = "_", autoload = false }

[[app.functions]]
name = "ping"
options = { alias = "jxnPing" }
"#;

        let config = JaxonConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.lib.core.language, "fr");
        assert_eq!(config.lib.core.request.method, "GET");
        assert_eq!(config.lib.core.prefix.class, "");
        assert!(config.lib.core.debug.on);
        assert!(config.lib.assets.include.includes("CallableClass"));
        assert!(!config.lib.assets.include.includes("Dialog"));

        assert_eq!(config.app.classes[0].name, "Sample");
        assert_eq!(
            config.app.classes[0].options["protected"],
            serde_json::json!(["hook"])
        );
        assert_eq!(config.app.directories[0].options, serde_json::json!("App\\Ajax"));
        assert_eq!(config.app.directories[1].options["autoload"], serde_json::json!(false));
        assert_eq!(config.app.functions[0].options["alias"], serde_json::json!("jxnPing"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("JAXON_TEST_REQUEST_URI", "https://test.example.com/jaxon");

        let toml_content = r#"
[lib.core.request]
uri = "${JAXON_TEST_REQUEST_URI}"
"#;

        let config = JaxonConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.lib.core.request.uri, "https://test.example.com/jaxon");

        std::env::remove_var("JAXON_TEST_REQUEST_URI");
    }

    #[test]
    fn test_config_validation() {
        let invalid = [
            "[lib.core.request]\nuri = \"ftp://example.com\"",
            "[lib.core.request]\nmode = \"later\"",
            "[lib.core]\nlanguage = \"xx\"",
            "[lib.core.prefix]\nfunction = \"jaxon-\"",
            "[lib.js.app]\nexport = true\nuri = \"/js\"",
        ];

        for toml_content in invalid {
            let config = JaxonConfig::from_toml_str(toml_content).unwrap();
            assert!(config.validate().is_err(), "accepted: {}", toml_content);
        }
    }

    #[test]
    fn test_missing_export_dir_is_reported() {
        let config = JaxonConfig::from_toml_str("[lib.js.app]\nexport = true\nuri = \"/js\"").unwrap();
        match config.validate() {
            Err(JaxonError::MissingConfigError { field }) => assert_eq!(field, "lib.js.app.dir"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[lib.core.request]\nuri = \"/ajax\"\n")
            .unwrap();

        let config = JaxonConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.lib.core.request.uri, "/ajax");
    }
}
