use crate::utils::error::{JaxonError, Result};
use regex::Regex;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 請求與註冊資料中識別字的檢查器
#[derive(Debug, Clone)]
pub struct Validator {
    class_pattern: Regex,
    method_pattern: Regex,
}

impl Validator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // 類別名稱可使用 '.' 或 '\' 作為命名空間分隔符, '_' 屬於識別字本身
            class_pattern: Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(?:[.\\][A-Za-z][A-Za-z0-9_]*)*$")?,
            method_pattern: Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$")?,
        })
    }

    pub fn validate_class(&self, name: &str) -> bool {
        self.class_pattern.is_match(name)
    }

    pub fn validate_method(&self, name: &str) -> bool {
        self.method_pattern.is_match(name)
    }

    pub fn validate_function(&self, name: &str) -> bool {
        self.method_pattern.is_match(name)
    }
}

/// 接受絕對的 http(s) URL 或以 '/' 開頭的路徑
pub fn validate_uri(field_name: &str, uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: "URI cannot be empty".to_string(),
        });
    }

    if uri.starts_with('/') {
        return Ok(());
    }

    match Url::parse(uri) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(JaxonError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: uri.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| JaxonError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(JaxonError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Allowed values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}
