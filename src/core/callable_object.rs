use crate::core::class_definition::{ClassBinding, ClassDefinition, Container, Instance, Visibility};
use crate::core::request_factory::RequestBuilder;
use crate::core::response::ResponseManager;
use crate::domain::model::{merge_options, Options, Separator, NAMESPACE_SEPARATOR, WILDCARD_KEY};
use crate::utils::error::{JaxonError, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// 一個已註冊類別的包裝: 匯出的方法、JS 選項與延遲建立的實例
pub struct CallableObject {
    definition: Arc<ClassDefinition>,
    separator: Separator,
    namespace: String,
    protected: Vec<String>,
    js_options: Options,
    container: Arc<Container>,
    response: ResponseManager,
    instance: Mutex<Option<Instance>>,
    exported: OnceLock<Vec<String>>,
}

impl CallableObject {
    pub fn new(
        definition: Arc<ClassDefinition>,
        container: Arc<Container>,
        response: ResponseManager,
    ) -> Self {
        Self {
            definition,
            separator: Separator::default(),
            namespace: String::new(),
            protected: Vec::new(),
            js_options: Options::new(),
            container,
            response,
            instance: Mutex::new(None),
            exported: OnceLock::new(),
        }
    }

    /// 套用一個設定選項; 不認得的名稱或不合法的值直接忽略
    pub fn configure(&mut self, name: &str, value: &Value) {
        match name {
            "separator" => {
                if let Some(separator) = value.as_str().and_then(Separator::parse) {
                    self.separator = separator;
                }
            }
            "namespace" => {
                if let Some(namespace) = value.as_str() {
                    self.namespace = namespace.to_string();
                }
            }
            "protected" => {
                match value {
                    Value::String(method) => self.protected.push(method.clone()),
                    Value::Array(methods) => self.protected.extend(
                        methods
                            .iter()
                            .filter_map(|method| method.as_str())
                            .map(str::to_string),
                    ),
                    _ => {}
                }
                self.exported = OnceLock::new();
            }
            _ => {}
        }
    }

    pub fn set_js_options(&mut self, options: Options) {
        self.js_options = options;
    }

    /// 要寫進前端程式碼的選項 (鍵為方法名稱或 `*`)
    pub fn js_options(&self) -> &Options {
        &self.js_options
    }

    /// 方法的 JS 設定: `*` 的設定再被方法本身的設定覆蓋
    pub fn method_config(&self, method: &str) -> Options {
        let mut config = self
            .js_options
            .get(WILDCARD_KEY)
            .and_then(|value| value.as_object())
            .cloned()
            .unwrap_or_default();
        if let Some(specific) = self.js_options.get(method).and_then(|value| value.as_object()) {
            merge_options(&mut config, specific);
        }
        config
    }

    pub fn definition(&self) -> &ClassDefinition {
        &self.definition
    }

    pub fn class_name(&self) -> &str {
        self.definition.name()
    }

    pub fn short_name(&self) -> &str {
        self.definition.short_name()
    }

    pub fn namespace(&self) -> &str {
        self.definition.namespace()
    }

    /// 註冊時所屬的命名空間
    pub fn root_namespace(&self) -> &str {
        &self.namespace
    }

    pub fn separator(&self) -> Separator {
        self.separator
    }

    pub fn js_name(&self) -> String {
        self.class_name()
            .replace(NAMESPACE_SEPARATOR, &self.separator.as_char().to_string())
    }

    pub fn protected_methods(&self) -> &[String] {
        &self.protected
    }

    /// 匯出到前端的方法, 順序與方法表相同
    pub fn exported_methods(&self) -> &[String] {
        self.exported.get_or_init(|| {
            self.definition
                .methods()
                .iter()
                .filter(|entry| entry.visibility() == Visibility::Public)
                .map(|entry| entry.name())
                .filter(|name| !(name.len() > 2 && name.starts_with("__")))
                .filter(|name| !self.protected.iter().any(|protected| protected == name))
                .map(str::to_string)
                .collect()
        })
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.definition.has_method(method)
    }

    /// 取得實例, 第一次呼叫時建立; 建構子最多執行一次
    pub fn registered_object(&self) -> Result<Instance> {
        let mut slot = self.instance.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = slot.as_ref() {
            return Ok(Arc::clone(instance));
        }

        let instance = self
            .definition
            .construct(&self.container)
            .map_err(|source| JaxonError::InstantiationError {
                class: self.class_name().to_string(),
                source,
            })?;

        if self.definition.has_binder() {
            self.definition.bind(
                instance.as_ref(),
                ClassBinding {
                    class_name: self.class_name().to_string(),
                    js_name: self.js_name(),
                    response: self.response.clone(),
                },
            );
        }

        tracing::debug!("Created an instance of {}", self.class_name());
        *slot = Some(Arc::clone(&instance));
        Ok(instance)
    }

    /// 產生呼叫某個匯出方法的 JS 運算式; `prefix` 為類別 stub 的前綴
    pub fn request(&self, prefix: &str, method: &str) -> Result<RequestBuilder> {
        if !self.exported_methods().iter().any(|exported| exported == method) {
            return Err(JaxonError::MethodNotFound {
                class: self.class_name().to_string(),
                method: method.to_string(),
            });
        }
        Ok(RequestBuilder::new(format!("{}{}.{}", prefix, self.js_name(), method)))
    }

    /// 呼叫方法; 受保護的方法同樣可以在伺服器端呼叫
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let entry = self
            .definition
            .method(method)
            .ok_or_else(|| JaxonError::MethodNotFound {
                class: self.class_name().to_string(),
                method: method.to_string(),
            })?;

        let instance = self.registered_object()?;
        entry
            .invoke(instance.as_ref(), args)
            .map_err(|source| JaxonError::InvocationError {
                target: format!("{}::{}", self.class_name(), method),
                source,
            })
    }
}

impl std::fmt::Debug for CallableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableObject")
            .field("class_name", &self.class_name())
            .field("separator", &self.separator)
            .field("namespace", &self.namespace)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}
