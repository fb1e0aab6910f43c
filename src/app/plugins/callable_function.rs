use crate::app::plugins::js_parameters;
use crate::core::request_factory::RequestBuilder;
use crate::core::response::ResponseManager;
use crate::domain::model::{Options, RequestContext, ServerRequest, Target};
use crate::domain::ports::{RequestPlugin, ScriptGenerator};
use crate::utils::error::{JaxonError, Result};
use crate::utils::hash::content_hash;
use crate::utils::translation::Translator;
use crate::utils::validation::Validator;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, PoisonError, RwLock};

pub const FUNCTION_KEY: &str = "jxnfun";

/// 可由前端呼叫的函式
pub type Function = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
struct CallableFunction {
    name: String,
    function: Function,
    /// 寫進 stub 的 JS 設定
    options: Options,
}

/// 註冊一般函式並以 `jxnfun` 參數呼叫
pub struct CallableFunctionPlugin {
    prefix: String,
    /// 鍵為 JS 名稱 (別名)
    functions: RwLock<BTreeMap<String, CallableFunction>>,
    response: ResponseManager,
    validator: Arc<Validator>,
    translator: Arc<Translator>,
}

impl CallableFunctionPlugin {
    pub const NAME: &'static str = "CallableFunction";

    pub fn new(
        prefix: &str,
        response: ResponseManager,
        validator: Arc<Validator>,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            functions: RwLock::new(BTreeMap::new()),
            response,
            validator,
            translator,
        }
    }

    pub fn check_options(&self, name: &str, options: &Value) -> Result<Options> {
        if !self.validator.validate_function(name.trim()) {
            return Err(self.invalid_declaration());
        }
        match options {
            Value::Null => Ok(Options::new()),
            Value::Object(options) => {
                // 別名同樣是前端的函式名稱
                if let Some(alias) = options.get("alias") {
                    let valid = alias
                        .as_str()
                        .map(|alias| self.validator.validate_function(alias))
                        .unwrap_or(false);
                    if !valid {
                        return Err(self.invalid_declaration());
                    }
                }
                Ok(options.clone())
            }
            _ => Err(self.invalid_declaration()),
        }
    }

    /// 註冊函式; 同一個 JS 名稱以最後一次註冊為準
    pub fn register(&self, name: &str, function: Function, mut options: Options) {
        let name = name.trim().to_string();
        let js_name = options
            .remove("alias")
            .and_then(|alias| alias.as_str().map(str::to_string))
            .unwrap_or_else(|| name.clone());
        tracing::debug!("Registering function {} as {}", name, js_name);

        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                js_name,
                CallableFunction {
                    name,
                    function,
                    options,
                },
            );
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// 呼叫某個函式的 JS 運算式; `js_name` 為註冊時的別名
    pub fn request(&self, js_name: &str) -> Result<RequestBuilder> {
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        if !functions.contains_key(js_name) {
            return Err(JaxonError::FunctionNotFound {
                name: js_name.to_string(),
            });
        }
        Ok(RequestBuilder::new(format!("{}{}", self.prefix, js_name)))
    }

    fn invalid_declaration(&self) -> JaxonError {
        JaxonError::setup(self.translator.trans("errors.functions.invalid-declaration", &[]))
    }

    fn invalid_target(&self, name: &str) -> JaxonError {
        JaxonError::request(self.translator.trans("errors.functions.invalid", &[("name", name)]))
    }

    fn call(&self, js_name: &str, arguments: &[Value]) -> Result<Value> {
        let function = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(js_name)
            .cloned()
            .ok_or_else(|| JaxonError::FunctionNotFound {
                name: js_name.to_string(),
            })?;

        (function.function)(arguments).map_err(|source| JaxonError::InvocationError {
            target: format!("{}()", function.name),
            source,
        })
    }
}

impl RequestPlugin for CallableFunctionPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn detect(&self, request: &ServerRequest) -> Option<Target> {
        request
            .string_param(FUNCTION_KEY)
            .filter(|name| !name.is_empty())
            .map(|name| Target::function(&name))
    }

    fn process_request(&self, context: &RequestContext) -> Result<()> {
        let Target::Function { function_name } = &context.target else {
            return Err(JaxonError::request(
                self.translator.trans("errors.request.plugin", &[]),
            ));
        };

        if !self.validator.validate_function(function_name) {
            tracing::warn!("Rejected invalid function request {}", function_name);
            return Err(self.invalid_target(function_name));
        }

        let value = self.call(function_name, &context.arguments).map_err(|e| {
            tracing::warn!("Call to {} failed: {:#}", context.target, anyhow::Error::from(e));
            self.invalid_target(function_name)
        })?;
        self.response.append(value);
        Ok(())
    }
}

impl ScriptGenerator for CallableFunctionPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hash(&self) -> Result<String> {
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        let mut input = String::new();
        for (js_name, function) in functions.iter() {
            input.push_str(js_name);
            input.push_str(&function.name);
            input.push_str(&Value::Object(function.options.clone()).to_string());
        }
        Ok(content_hash(input))
    }

    fn script(&self) -> Result<String> {
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        let mut code = String::new();
        for (js_name, function) in functions.iter() {
            let _ = writeln!(
                code,
                "{}{} = function() {{ return jaxon.request({{ {}: '{}' }}, {}); }};",
                self.prefix,
                js_name,
                FUNCTION_KEY,
                js_name,
                js_parameters(&function.options),
            );
        }
        Ok(code)
    }
}

impl std::fmt::Debug for CallableFunctionPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableFunctionPlugin")
            .field("prefix", &self.prefix)
            .field("functions", &self.function_names())
            .finish_non_exhaustive()
    }
}
