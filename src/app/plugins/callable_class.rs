use crate::app::plugins::js_parameters;
use crate::core::callable_object::CallableObject;
use crate::core::registry::CallableRegistry;
use crate::core::request_factory::RequestBuilder;
use crate::core::repository::normalize_class_name;
use crate::core::response::ResponseManager;
use crate::domain::model::{Options, RequestContext, Separator, ServerRequest, Target};
use crate::domain::ports::{RequestPlugin, ScriptGenerator};
use crate::utils::error::{JaxonError, Result};
use crate::utils::hash::content_hash;
use crate::utils::translation::Translator;
use crate::utils::validation::Validator;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::Arc;

pub const CLASS_KEY: &str = "jxncls";
pub const METHOD_KEY: &str = "jxnmthd";

/// 註冊使用者類別、產生前端 stub, 並在請求時呼叫類別方法
pub struct CallableClassPlugin {
    prefix: String,
    registry: Arc<CallableRegistry>,
    response: ResponseManager,
    validator: Arc<Validator>,
    translator: Arc<Translator>,
}

impl CallableClassPlugin {
    pub const NAME: &'static str = "CallableClass";

    pub fn new(
        prefix: &str,
        registry: Arc<CallableRegistry>,
        response: ResponseManager,
        validator: Arc<Validator>,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            registry,
            response,
            validator,
            translator,
        }
    }

    /// 檢查註冊內容; 字串選項視為 `{include: path}`
    pub fn check_options(&self, class_name: &str, options: &Value) -> Result<Options> {
        if !self.validator.validate_class(class_name.trim()) {
            return Err(self.invalid_declaration());
        }
        match options {
            Value::Null => Ok(Options::new()),
            Value::String(include) => {
                let mut options = Options::new();
                options.insert("include".to_string(), Value::String(include.clone()));
                Ok(options)
            }
            Value::Object(options) => Ok(options.clone()),
            _ => Err(self.invalid_declaration()),
        }
    }

    pub fn register(&self, class_name: &str, options: Options) {
        let class_name = normalize_class_name(class_name.trim());
        self.registry.repository().add_class(&class_name, options);
    }

    pub fn get_callable(&self, class_name: &str) -> Result<Arc<CallableObject>> {
        self.registry.get_callable_object(class_name)
    }

    /// 呼叫某個類別方法的 JS 運算式, 使用類別的前綴
    pub fn request(&self, class_name: &str, method_name: &str) -> Result<RequestBuilder> {
        self.get_callable(class_name)?.request(&self.prefix, method_name)
    }

    fn invalid_declaration(&self) -> JaxonError {
        JaxonError::setup(self.translator.trans("errors.objects.invalid-declaration", &[]))
    }

    fn invalid_target(&self, class_name: &str, method_name: &str) -> JaxonError {
        JaxonError::request(self.translator.trans(
            "errors.objects.invalid",
            &[("class", class_name), ("method", method_name)],
        ))
    }

    /// 命名空間的物件骨架, 例如 `App = {};` 與 `App.Admin = {};`
    fn namespaces_script(&self, objects: &[Arc<CallableObject>]) -> String {
        let mut js_namespaces = BTreeSet::new();
        let mut add = |namespace: &str| {
            let mut path = String::new();
            for segment in namespace.split('\\').filter(|segment| !segment.is_empty()) {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(segment);
                js_namespaces.insert(path.clone());
            }
        };

        for (namespace, separator) in self.registry.repository().js_namespaces() {
            if separator == Separator::Dot {
                add(&namespace);
            }
        }
        for object in objects {
            if object.separator() == Separator::Dot {
                add(object.namespace());
            }
        }

        js_namespaces
            .iter()
            .map(|namespace| format!("{}{} = {{}};\n", self.prefix, namespace))
            .collect()
    }

    fn callable_script(&self, object: &CallableObject) -> String {
        let js_name = object.js_name();
        let mut code = format!("{}{} = {{}};\n", self.prefix, js_name);
        for method in object.exported_methods() {
            let _ = writeln!(
                code,
                "{}{}.{} = function() {{ return jaxon.request({{ {}: '{}', {}: '{}' }}, {}); }};",
                self.prefix,
                js_name,
                method,
                CLASS_KEY,
                js_name,
                METHOD_KEY,
                method,
                js_parameters(&object.method_config(method)),
            );
        }
        code
    }
}

impl RequestPlugin for CallableClassPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn detect(&self, request: &ServerRequest) -> Option<Target> {
        let class_name = request.string_param(CLASS_KEY).filter(|v| !v.is_empty())?;
        let method_name = request.string_param(METHOD_KEY).filter(|v| !v.is_empty())?;
        Some(Target::class(&class_name, &method_name))
    }

    fn process_request(&self, context: &RequestContext) -> Result<()> {
        let Target::Class {
            class_name,
            method_name,
        } = &context.target
        else {
            return Err(JaxonError::request(
                self.translator.trans("errors.request.plugin", &[]),
            ));
        };

        if !self.validator.validate_class(class_name) || !self.validator.validate_method(method_name) {
            tracing::warn!("Rejected invalid class request {}::{}", class_name, method_name);
            return Err(self.invalid_target(class_name, method_name));
        }

        let object = self.get_callable(class_name).map_err(|e| {
            tracing::warn!("Unable to resolve {}: {}", class_name, e);
            self.invalid_target(class_name, method_name)
        })?;
        if !object.has_method(method_name) {
            tracing::warn!("{} has no method {}", object.class_name(), method_name);
            return Err(self.invalid_target(class_name, method_name));
        }

        let value = object
            .call(method_name, &context.arguments)
            .map_err(|e| {
                tracing::warn!("Call to {} failed: {:#}", context.target, anyhow::Error::from(e));
                self.invalid_target(class_name, method_name)
            })?;
        self.response.append(value);
        Ok(())
    }
}

impl ScriptGenerator for CallableClassPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hash(&self) -> Result<String> {
        let classes = self.registry.parse_callable_classes()?;
        let repository = self.registry.repository();

        let mut input = String::new();
        for namespace in repository.namespaces() {
            input.push_str(&namespace.namespace);
            input.push(namespace.options.separator.as_char());
        }
        for class_name in repository.class_names().iter().chain(classes.iter()) {
            input.push_str(class_name);
        }
        // 產生的 stub 由這些內容決定
        input.push_str(&self.prefix);
        for object in self.registry.register_callable_classes()? {
            input.push_str(&object.js_name());
            input.push_str(&object.exported_methods().join(","));
            input.push_str(&Value::Object(object.js_options().clone()).to_string());
        }
        Ok(content_hash(input))
    }

    fn script(&self) -> Result<String> {
        let objects = self.registry.register_callable_classes()?;

        let mut code = self.namespaces_script(&objects);
        for object in &objects {
            code.push_str(&self.callable_script(object));
        }
        Ok(code)
    }
}

impl std::fmt::Debug for CallableClassPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableClassPlugin")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
