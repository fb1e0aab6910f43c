use crate::utils::error::{JaxonError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 註冊選項, 與設定檔中的表格結構相同
pub type Options = serde_json::Map<String, Value>;

/// 伺服器端類別名稱使用的命名空間分隔符
pub const NAMESPACE_SEPARATOR: char = '\\';

/// 對所有類別生效的覆寫鍵
pub const WILDCARD_KEY: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Separator {
    #[default]
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = "_")]
    Underscore,
}

impl Separator {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "." => Some(Separator::Dot),
            "_" => Some(Separator::Underscore),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Separator::Dot => '.',
            Separator::Underscore => '_',
        }
    }
}

/// 類別原始檔的預設副檔名
pub const DEFAULT_CLASS_FILE_EXTENSION: &str = "rs";

/// 目錄註冊的選項
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryOptions {
    pub separator: Separator,
    pub autoload: bool,
    pub protected: Vec<String>,
    /// 鍵為類別名稱或 `*`
    pub class_overrides: HashMap<String, Options>,
    pub extension: String,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            separator: Separator::Dot,
            autoload: true,
            protected: Vec::new(),
            class_overrides: HashMap::new(),
            extension: DEFAULT_CLASS_FILE_EXTENSION.to_string(),
        }
    }
}

impl DirectoryOptions {
    /// 目錄中某個類別的選項: 目錄的分隔符與受保護方法, 再依序套用 `*` 與類別名稱的覆寫
    pub fn class_options(&self, class_name: &str, mut options: Options) -> Options {
        options.insert(
            "separator".to_string(),
            Value::String(self.separator.as_char().to_string()),
        );
        if !self.protected.is_empty() {
            options.insert("protected".to_string(), Value::from(self.protected.clone()));
        }
        if let Some(all) = self.class_overrides.get(WILDCARD_KEY) {
            merge_options(&mut options, all);
        }
        if let Some(specific) = self.class_overrides.get(class_name) {
            merge_options(&mut options, specific);
        }
        options
    }
}

/// 以目錄為基礎的命名空間註冊
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRegistration {
    pub namespace: String,
    pub directory: PathBuf,
    pub options: DirectoryOptions,
}

impl NamespaceRegistration {
    /// 類別是否屬於此命名空間 (名稱以 `namespace\` 開頭)
    pub fn contains(&self, class_name: &str) -> bool {
        class_name.len() > self.namespace.len()
            && class_name.starts_with(&self.namespace)
            && class_name[self.namespace.len()..].starts_with(NAMESPACE_SEPARATOR)
    }

    /// 自動載入時類別對應的原始檔路徑
    pub fn class_file(&self, class_name: &str) -> Option<PathBuf> {
        if !self.contains(class_name) {
            return None;
        }
        let relative = &class_name[self.namespace.len() + 1..];
        let mut path = self.directory.clone();
        for segment in relative.split(NAMESPACE_SEPARATOR) {
            path.push(segment);
        }
        path.set_extension(&self.options.extension);
        Some(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRegistration {
    pub class_name: String,
    pub options: Options,
}

impl ClassRegistration {
    pub fn new(class_name: impl Into<String>, options: Options) -> Self {
        Self {
            class_name: class_name.into(),
            options,
        }
    }

    pub fn include(&self) -> Option<&Path> {
        self.options
            .get("include")
            .and_then(|value| value.as_str())
            .map(Path::new)
    }
}

/// 一次請求所指向的呼叫目標
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Class {
        class_name: String,
        method_name: String,
    },
    Function {
        function_name: String,
    },
}

impl Target {
    pub fn class(class_name: &str, method_name: &str) -> Self {
        Target::Class {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
        }
    }

    pub fn function(function_name: &str) -> Self {
        Target::Function {
            function_name: function_name.to_string(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Class {
                class_name,
                method_name,
            } => write!(f, "{}::{}", class_name, method_name),
            Target::Function { function_name } => write!(f, "{}()", function_name),
        }
    }
}

/// 單次請求的處理上下文: 目標與已解碼的參數
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub target: Target,
    pub arguments: Vec<Value>,
}

/// 進入的 HTTP 請求 (已解析的查詢字串與內容)
#[derive(Debug, Clone, Default)]
pub struct ServerRequest {
    query: Options,
    body: Option<Options>,
}

impl ServerRequest {
    pub fn new(query: Options, body: Option<Options>) -> Self {
        Self { query, body }
    }

    pub fn from_query_string(query: &str) -> Self {
        Self {
            query: decode_form(query),
            body: None,
        }
    }

    pub fn with_form_body(mut self, body: &str) -> Self {
        self.body = Some(decode_form(body));
        self
    }

    /// JSON 內容必須是物件
    pub fn with_json_body(mut self, body: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(body)? {
            Value::Object(map) => {
                self.body = Some(map);
                Ok(self)
            }
            _ => Err(JaxonError::request("The request body must be a JSON object")),
        }
    }

    /// 先查內容再查查詢字串
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.body
            .as_ref()
            .and_then(|body| body.get(key))
            .or_else(|| self.query.get(key))
    }

    /// 去除前後空白的字串參數
    pub fn string_param(&self, key: &str) -> Option<String> {
        self.param(key)
            .and_then(|value| value.as_str())
            .map(|value| value.trim().to_string())
    }
}

fn decode_form(input: &str) -> Options {
    url::form_urlencoded::parse(input.trim_start_matches('?').as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

/// 將選項合併 (後者覆蓋前者, 不做深層合併)
pub fn merge_options(base: &mut Options, overrides: &Options) {
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace(name: &str) -> NamespaceRegistration {
        NamespaceRegistration {
            namespace: name.to_string(),
            directory: PathBuf::from("/srv/ajax"),
            options: DirectoryOptions::default(),
        }
    }

    #[test]
    fn test_namespace_contains() {
        let ns = namespace("App\\Ajax");
        assert!(ns.contains("App\\Ajax\\Users"));
        assert!(ns.contains("App\\Ajax\\Admin\\Users"));
        assert!(!ns.contains("App\\Ajax"));
        assert!(!ns.contains("App\\AjaxUsers"));
        assert!(!ns.contains("Other\\Users"));
    }

    #[test]
    fn test_namespace_class_file() {
        let ns = namespace("App\\Ajax");
        assert_eq!(
            ns.class_file("App\\Ajax\\Admin\\Users"),
            Some(PathBuf::from("/srv/ajax/Admin/Users.rs"))
        );
        assert_eq!(ns.class_file("Other\\Users"), None);
    }

    #[test]
    fn test_class_options_override_order() {
        let mut overrides = HashMap::new();
        let mut all = Options::new();
        all.insert("separator".to_string(), Value::from("_"));
        all.insert("*".to_string(), serde_json::json!({"mode": "'synchronous'"}));
        overrides.insert("*".to_string(), all);
        let mut users = Options::new();
        users.insert("separator".to_string(), Value::from("."));
        overrides.insert("Users".to_string(), users);

        let options = DirectoryOptions {
            protected: vec!["hook".to_string()],
            class_overrides: overrides,
            ..DirectoryOptions::default()
        };

        let users = options.class_options("Users", Options::new());
        assert_eq!(users.get("separator"), Some(&Value::from(".")));
        assert_eq!(users.get("protected"), Some(&serde_json::json!(["hook"])));
        assert!(users.contains_key("*"));

        let posts = options.class_options("Posts", Options::new());
        assert_eq!(posts.get("separator"), Some(&Value::from("_")));
    }

    #[test]
    fn test_separator_parse() {
        assert_eq!(Separator::parse("."), Some(Separator::Dot));
        assert_eq!(Separator::parse("_"), Some(Separator::Underscore));
        assert_eq!(Separator::parse("/"), None);
        assert_eq!(Separator::Underscore.as_char(), '_');
    }

    #[test]
    fn test_request_params_prefer_body() {
        let request = ServerRequest::from_query_string("?jxncls=Query&jxnmthd=%20hello%20")
            .with_form_body("jxncls=Body");
        assert_eq!(request.string_param("jxncls").as_deref(), Some("Body"));
        assert_eq!(request.string_param("jxnmthd").as_deref(), Some("hello"));
        assert_eq!(request.string_param("jxnfun"), None);
    }

    #[test]
    fn test_request_json_body_must_be_object() {
        assert!(ServerRequest::default().with_json_body("[1, 2]").is_err());
        assert!(ServerRequest::default().with_json_body("not json").is_err());

        let request = ServerRequest::default()
            .with_json_body(r#"{"jxnfun": "ping", "jxnargs": [1]}"#)
            .unwrap();
        assert_eq!(request.string_param("jxnfun").as_deref(), Some("ping"));
    }

    #[test]
    fn test_merge_options_overwrites() {
        let mut base = Options::new();
        base.insert("separator".to_string(), Value::from("."));
        base.insert("keep".to_string(), Value::from(true));

        let mut overrides = Options::new();
        overrides.insert("separator".to_string(), Value::from("_"));

        merge_options(&mut base, &overrides);
        assert_eq!(base.get("separator"), Some(&Value::from("_")));
        assert_eq!(base.get("keep"), Some(&Value::from(true)));
    }
}
