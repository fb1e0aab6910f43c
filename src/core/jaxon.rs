use crate::app::plugins::{
    CallableClassPlugin, CallableFunctionPlugin, Function, CALLABLE_CLASS_PRIORITY,
    CALLABLE_FUNCTION_PRIORITY,
};
use crate::config::cli::LocalStorage;
use crate::config::toml_config::{AppConfig, JaxonConfig, LibConfig};
use crate::core::assets::AssetManager;
use crate::core::callable_object::CallableObject;
use crate::core::class_definition::{ClassCatalog, Container};
use crate::core::code_generator::CodeGenerator;
use crate::core::registry::CallableRegistry;
use crate::core::repository::CallableRepository;
use crate::core::request::{ArgumentManager, RequestHandler};
use crate::core::request_factory::RequestBuilder;
use crate::core::response::ResponseManager;
use crate::domain::model::ServerRequest;
use crate::domain::ports::Storage;
use crate::domain::response::Response;
use crate::utils::error::{JaxonError, Result};
use crate::utils::translation::Translator;
use crate::utils::validation::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// 寫入前端設定的版本字串
pub const VERSION: &str = concat!("Jaxon ", env!("CARGO_PKG_VERSION"));

/// 組合根: 建立並串接所有元件
pub struct Jaxon {
    config: LibConfig,
    translator: Arc<Translator>,
    response: ResponseManager,
    registry: Arc<CallableRegistry>,
    class_plugin: Arc<CallableClassPlugin>,
    function_plugin: Arc<CallableFunctionPlugin>,
    request_handler: RequestHandler,
    code_generator: CodeGenerator,
}

impl Jaxon {
    /// 啟用 JS 匯出時, 產生的檔案寫到 `js.app.dir`
    pub fn new(config: LibConfig, catalog: ClassCatalog, container: Container) -> Result<Self> {
        let storage: Option<Arc<dyn Storage>> = match (config.js.app.export, &config.js.app.dir) {
            (true, Some(dir)) => Some(Arc::new(LocalStorage::new(dir.clone()))),
            _ => None,
        };
        Self::with_storage(config, catalog, container, storage)
    }

    pub fn with_storage(
        config: LibConfig,
        catalog: ClassCatalog,
        container: Container,
        storage: Option<Arc<dyn Storage>>,
    ) -> Result<Self> {
        let translator = Arc::new(Translator::new(&config.core.language));
        let validator = Arc::new(Validator::new()?);
        let response = ResponseManager::new();

        let repository = CallableRepository::new(Arc::new(catalog), Arc::new(container), response.clone());
        let registry = Arc::new(CallableRegistry::new(Arc::new(repository), translator.clone()));

        let class_plugin = Arc::new(CallableClassPlugin::new(
            &config.core.prefix.class,
            registry.clone(),
            response.clone(),
            validator.clone(),
            translator.clone(),
        ));
        let function_plugin = Arc::new(CallableFunctionPlugin::new(
            &config.core.prefix.function,
            response.clone(),
            validator,
            translator.clone(),
        ));

        let request_handler = RequestHandler::new(
            ArgumentManager::new(translator.clone()),
            response.clone(),
            translator.clone(),
        );
        request_handler.add_plugin(class_plugin.clone());
        request_handler.add_plugin(function_plugin.clone());

        let assets = Arc::new(AssetManager::new(config.clone(), storage));
        let code_generator = CodeGenerator::new(VERSION, assets);
        code_generator.add_generator(function_plugin.clone(), CALLABLE_FUNCTION_PRIORITY);
        code_generator.add_generator(class_plugin.clone(), CALLABLE_CLASS_PRIORITY);

        tracing::debug!("Jaxon is ready, language {}", translator.language());
        Ok(Self {
            config,
            translator,
            response,
            registry,
            class_plugin,
            function_plugin,
            request_handler,
            code_generator,
        })
    }

    /// 依設定檔建立並註冊 `app` 區段; `functions` 提供設定檔中列出的函式
    pub fn from_config(
        config: &JaxonConfig,
        catalog: ClassCatalog,
        container: Container,
        functions: &HashMap<String, Function>,
    ) -> Result<Self> {
        let jaxon = Self::new(config.lib.clone(), catalog, container)?;
        jaxon.register_app(&config.app, functions)?;
        Ok(jaxon)
    }

    pub fn config(&self) -> &LibConfig {
        &self.config
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn registry(&self) -> &CallableRegistry {
        &self.registry
    }

    /// 回應管理器; 請求處理期間寫入該次請求的回應, 其他時候寫入共用回應
    pub fn response(&self) -> &ResponseManager {
        &self.response
    }

    pub fn register_class(&self, class_name: &str, options: &Value) -> Result<()> {
        let options = self.class_plugin.check_options(class_name, options)?;
        self.class_plugin.register(class_name, options);
        self.code_generator.reset();
        Ok(())
    }

    pub fn register_directory<P: AsRef<Path>>(&self, directory: P, options: &Value) -> Result<()> {
        self.registry.add_directory(directory.as_ref(), options)?;
        self.code_generator.reset();
        Ok(())
    }

    pub fn register_function(&self, name: &str, function: Function, options: &Value) -> Result<()> {
        let options = self.function_plugin.check_options(name, options)?;
        self.function_plugin.register(name, function, options);
        self.code_generator.reset();
        Ok(())
    }

    /// 註冊設定檔 `app` 區段列出的類別、目錄與函式
    pub fn register_app(&self, app: &AppConfig, functions: &HashMap<String, Function>) -> Result<()> {
        for entry in &app.classes {
            self.register_class(&entry.name, &entry.options)?;
        }
        for entry in &app.directories {
            self.register_directory(&entry.path, &entry.options)?;
        }
        for entry in &app.functions {
            let function = functions.get(&entry.name).cloned().ok_or_else(|| {
                JaxonError::setup(self.translator.trans("errors.functions.invalid-declaration", &[]))
            })?;
            self.register_function(&entry.name, function, &entry.options)?;
        }

        tracing::info!(
            "Registered {} classes, {} directories and {} functions",
            app.classes.len(),
            app.directories.len(),
            app.functions.len()
        );
        Ok(())
    }

    pub fn get_callable(&self, class_name: &str) -> Result<Arc<CallableObject>> {
        self.class_plugin.get_callable(class_name)
    }

    /// 呼叫類別方法的 JS 運算式, 例如寫進 `onclick` 屬性
    pub fn request(&self, class_name: &str, method_name: &str) -> Result<RequestBuilder> {
        self.class_plugin.request(class_name, method_name)
    }

    pub fn function_request(&self, js_name: &str) -> Result<RequestBuilder> {
        self.function_plugin.request(js_name)
    }

    pub fn can_process_request(&self, request: &ServerRequest) -> bool {
        self.request_handler.can_process_request(request)
    }

    pub fn process_request(&self, request: &ServerRequest) -> Result<Response> {
        self.request_handler.process_request(request)
    }

    pub fn get_hash(&self) -> Result<String> {
        self.code_generator.hash()
    }

    pub fn get_css(&self) -> Result<String> {
        self.code_generator.css()
    }

    pub fn get_js(&self) -> Result<String> {
        self.code_generator.js()
    }

    pub async fn get_script(&self, include_js: bool, include_css: bool) -> Result<String> {
        self.code_generator.script(include_js, include_css).await
    }
}

impl std::fmt::Debug for Jaxon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jaxon")
            .field("registry", &self.registry)
            .field("request_handler", &self.request_handler)
            .field("code_generator", &self.code_generator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::class_definition::ClassDefinition;
    use serde_json::json;

    #[derive(Default)]
    struct Sample;

    fn jaxon() -> Jaxon {
        let catalog = ClassCatalog::new();
        catalog.define(
            ClassDefinition::with_default::<Sample>("Sample")
                .method("hello", |_, _| Ok(json!("hello")))
                .build(),
        );
        Jaxon::new(LibConfig::default(), catalog, Container::new()).unwrap()
    }

    #[test]
    fn test_registration_resets_generated_code() {
        let jaxon = jaxon();
        let before = jaxon.get_hash().unwrap();
        assert_eq!(before, jaxon.get_hash().unwrap());

        jaxon.register_class("Sample", &Value::Null).unwrap();
        assert_ne!(before, jaxon.get_hash().unwrap());
        assert!(jaxon.get_js().unwrap().contains("jaxon.core.js"));
    }

    #[test]
    fn test_bad_registrations_leave_state_untouched() {
        let jaxon = jaxon();
        assert!(jaxon.register_class("Evil;DROP", &Value::Null).is_err());
        assert!(jaxon.register_class("Sample", &json!(true)).is_err());
        assert!(jaxon.registry().repository().class_names().is_empty());
    }

    #[test]
    fn test_app_functions_must_be_provided() {
        let jaxon = jaxon();
        let app: AppConfig = serde_json::from_value(json!({
            "functions": [{"name": "ping"}]
        }))
        .unwrap();

        assert!(matches!(
            jaxon.register_app(&app, &HashMap::new()),
            Err(JaxonError::SetupError { .. })
        ));

        let mut functions: HashMap<String, Function> = HashMap::new();
        functions.insert(
            "ping".to_string(),
            Arc::new(|_: &[Value]| -> anyhow::Result<Value> { Ok(json!("pong")) }),
        );
        jaxon.register_app(&app, &functions).unwrap();

        let request = ServerRequest::from_query_string("jxnfun=ping");
        let response = jaxon.process_request(&request).unwrap();
        assert_eq!(response.return_value, Some(json!("pong")));
    }
}
