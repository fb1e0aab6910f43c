use crate::core::callable_object::CallableObject;
use crate::core::repository::CallableRepository;
use crate::domain::model::{DirectoryOptions, NamespaceRegistration, Options, Separator, NAMESPACE_SEPARATOR};
use crate::utils::error::{JaxonError, Result};
use crate::utils::translation::Translator;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// 把各種註冊形式 (單一類別、命名空間目錄、一般目錄) 整理後寫入儲存庫
#[derive(Debug)]
pub struct CallableRegistry {
    repository: Arc<CallableRepository>,
    translator: Arc<Translator>,
}

impl CallableRegistry {
    pub fn new(repository: Arc<CallableRepository>, translator: Arc<Translator>) -> Self {
        Self {
            repository,
            translator,
        }
    }

    pub fn repository(&self) -> &CallableRepository {
        &self.repository
    }

    /// 註冊一個類別目錄
    ///
    /// 選項可以是字串 (命名空間) 或表格; 有命名空間時以命名空間註冊,
    /// 否則掃描目錄並逐一註冊類別。
    pub fn add_directory(&self, directory: &Path, options: &Value) -> Result<()> {
        if !directory.is_dir() {
            let path = directory.display().to_string();
            return Err(JaxonError::setup(
                self.translator
                    .trans("errors.directory.invalid", &[("path", path.as_str())]),
            ));
        }

        let (namespace, directory_options) = self.directory_options(options)?;
        match namespace {
            Some(namespace) => {
                self.repository.add_namespace(NamespaceRegistration {
                    namespace,
                    directory: directory.to_path_buf(),
                    options: directory_options,
                });
            }
            None => {
                self.repository.add_directory(directory, &directory_options)?;
            }
        }
        Ok(())
    }

    fn directory_options(&self, options: &Value) -> Result<(Option<String>, DirectoryOptions)> {
        let options: Options = match options {
            Value::Null => Options::new(),
            Value::String(namespace) => {
                let mut options = Options::new();
                options.insert("namespace".to_string(), Value::String(namespace.clone()));
                options
            }
            Value::Object(options) => options.clone(),
            _ => return Err(self.invalid_declaration()),
        };

        let mut directory_options = DirectoryOptions::default();

        if let Some(separator) = options.get("separator").and_then(|v| v.as_str()) {
            // 只接受 '.' 與 '_', 其他值視為 '.'
            directory_options.separator = Separator::parse(separator).unwrap_or(Separator::Dot);
        }
        if let Some(autoload) = options.get("autoload") {
            directory_options.autoload = autoload
                .as_bool()
                .ok_or_else(|| self.invalid_declaration())?;
        }
        match options.get("protected") {
            Some(Value::String(method)) => directory_options.protected.push(method.clone()),
            Some(Value::Array(methods)) => directory_options.protected.extend(
                methods
                    .iter()
                    .filter_map(|method| method.as_str())
                    .map(str::to_string),
            ),
            Some(_) => return Err(self.invalid_declaration()),
            None => {}
        }
        if let Some(extension) = options.get("extension").and_then(|v| v.as_str()) {
            directory_options.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(classes) = options.get("classes") {
            let classes = classes.as_object().ok_or_else(|| self.invalid_declaration())?;
            for (class_name, class_options) in classes {
                let class_options = class_options
                    .as_object()
                    .ok_or_else(|| self.invalid_declaration())?;
                directory_options.class_overrides.insert(
                    class_name.trim_matches(NAMESPACE_SEPARATOR).to_string(),
                    class_options.clone(),
                );
            }
        }

        let namespace = options
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(|namespace| namespace.trim_matches(NAMESPACE_SEPARATOR).to_string())
            .filter(|namespace| !namespace.is_empty());

        Ok((namespace, directory_options))
    }

    fn invalid_declaration(&self) -> JaxonError {
        JaxonError::setup(self.translator.trans("errors.objects.invalid-declaration", &[]))
    }

    pub fn get_callable_object(&self, class_name: &str) -> Result<Arc<CallableObject>> {
        self.repository.resolve(class_name)
    }

    /// 掃描所有命名空間目錄, 回傳找到的類別名稱
    pub fn parse_callable_classes(&self) -> Result<Vec<String>> {
        self.repository.parse_namespaces()
    }

    /// 解析所有類別, 產生前端程式碼前呼叫
    pub fn register_callable_classes(&self) -> Result<Vec<Arc<CallableObject>>> {
        self.repository.callable_objects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::class_definition::{ClassCatalog, ClassDefinition, Container};
    use crate::core::response::ResponseManager;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Users;

    fn registry(catalog: ClassCatalog) -> CallableRegistry {
        let repository = CallableRepository::new(
            Arc::new(catalog),
            Arc::new(Container::new()),
            ResponseManager::new(),
        );
        CallableRegistry::new(Arc::new(repository), Arc::new(Translator::default()))
    }

    fn users_definition(name: &str) -> ClassDefinition {
        ClassDefinition::with_default::<Users>(name)
            .method("list", |_, _| Ok(json!([])))
            .method("delete", |_, _| Ok(Value::Null))
            .build()
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let registry = registry(ClassCatalog::new());
        let result = registry.add_directory(Path::new("/definitely/not/here"), &Value::Null);
        match result {
            Err(JaxonError::SetupError { message }) => {
                assert!(message.contains("/definitely/not/here"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let dir = TempDir::new().unwrap();
        let registry = registry(ClassCatalog::new());

        for options in [json!(42), json!({"autoload": "yes"}), json!({"classes": []})] {
            let result = registry.add_directory(dir.path(), &options);
            assert!(matches!(result, Err(JaxonError::SetupError { .. })));
        }
        assert!(registry.repository().class_names().is_empty());
        assert!(registry.repository().namespaces().is_empty());
    }

    #[test]
    fn test_string_options_register_a_namespace() {
        let dir = TempDir::new().unwrap();
        let registry = registry(ClassCatalog::new());

        registry.add_directory(dir.path(), &json!("\\App\\Ajax\\")).unwrap();

        let namespaces = registry.repository().namespaces();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].namespace, "App\\Ajax");
        assert_eq!(namespaces[0].options.separator, Separator::Dot);
        assert!(namespaces[0].options.autoload);
    }

    #[test]
    fn test_directory_options_normalization() {
        let dir = TempDir::new().unwrap();
        let registry = registry(ClassCatalog::new());

        let options = json!({
            "namespace": "App",
            "separator": "/",
            "autoload": false,
            "protected": "delete",
            "extension": ".php",
            "classes": {"\\App\\Users": {"separator": "_"}}
        });
        registry.add_directory(dir.path(), &options).unwrap();

        let namespace = &registry.repository().namespaces()[0];
        assert_eq!(namespace.options.separator, Separator::Dot);
        assert!(!namespace.options.autoload);
        assert_eq!(namespace.options.protected, vec!["delete".to_string()]);
        assert_eq!(namespace.options.extension, "php");
        assert!(namespace.options.class_overrides.contains_key("App\\Users"));
    }

    #[test]
    fn test_plain_directory_registers_classes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Users.rs");
        std::fs::write(&file, "").unwrap();

        let catalog = ClassCatalog::new();
        catalog.define_in(&file, users_definition("Users"));
        let registry = registry(catalog);

        registry
            .add_directory(dir.path(), &json!({"protected": ["delete"], "separator": "_"}))
            .unwrap();
        assert_eq!(registry.repository().class_names(), vec!["Users".to_string()]);

        let object = registry.get_callable_object("Users").unwrap();
        assert_eq!(object.exported_methods(), &["list"]);
        assert_eq!(object.separator(), Separator::Underscore);
    }

    #[test]
    fn test_register_callable_classes_includes_namespace_classes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Users.rs");
        std::fs::write(&file, "").unwrap();

        let catalog = ClassCatalog::new();
        catalog.define_in(&file, users_definition("App\\Users"));
        let registry = registry(catalog);
        registry.add_directory(dir.path(), &json!("App")).unwrap();

        assert_eq!(
            registry.parse_callable_classes().unwrap(),
            vec!["App\\Users".to_string()]
        );
        let objects = registry.register_callable_classes().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].js_name(), "App.Users");
    }
}
