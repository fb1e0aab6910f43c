use crate::core::response::ResponseManager;
use crate::domain::model::NAMESPACE_SEPARATOR;
use crate::utils::error::{JaxonError, Result};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

/// 已建立的類別實例
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn(&Container) -> anyhow::Result<Instance> + Send + Sync>;
type Invoker = Arc<dyn Fn(&(dyn Any + Send + Sync), &[Value]) -> anyhow::Result<Value> + Send + Sync>;
type Binder = Arc<dyn Fn(&(dyn Any + Send + Sync), ClassBinding) + Send + Sync>;

/// 由組合根建立的服務表, 建構子依型別取得依賴
#[derive(Clone, Default)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Send + Sync + 'static>(mut self, service: S) -> Self {
        self.set(Arc::new(service));
        self
    }

    pub fn set<S: Send + Sync + 'static>(&mut self, service: Arc<S>) {
        self.services.insert(TypeId::of::<S>(), service);
    }

    pub fn get<S: Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.services
            .get(&TypeId::of::<S>())
            .cloned()
            .and_then(|service| service.downcast::<S>().ok())
    }

    pub fn require<S: Send + Sync + 'static>(&self) -> anyhow::Result<Arc<S>> {
        self.get::<S>().ok_or_else(|| {
            anyhow::anyhow!(
                "no service of type {} in the container",
                std::any::type_name::<S>()
            )
        })
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.services.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// 可匯出到前端
    Public,
    /// 只能在伺服器端呼叫 (例如 hook)
    Protected,
}

#[derive(Clone)]
pub struct MethodEntry {
    name: String,
    visibility: Visibility,
    invoker: Invoker,
}

impl MethodEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn invoke(&self, instance: &(dyn Any + Send + Sync), args: &[Value]) -> anyhow::Result<Value> {
        (self.invoker)(instance, args)
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// 注入到支援類別中的資訊
#[derive(Debug, Clone)]
pub struct ClassBinding {
    pub class_name: String,
    pub js_name: String,
    pub response: ResponseManager,
}

/// 可嵌入使用者類別中的支援欄位, 實例建立後由框架綁定
#[derive(Debug, Default)]
pub struct CallableClass {
    binding: OnceLock<ClassBinding>,
}

impl CallableClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, binding: ClassBinding) {
        if self.binding.set(binding).is_err() {
            tracing::debug!("Callable class support is already bound");
        }
    }

    pub fn binding(&self) -> Option<&ClassBinding> {
        self.binding.get()
    }

    pub fn response(&self) -> Option<&ResponseManager> {
        self.binding.get().map(|binding| &binding.response)
    }
}

pub trait HasCallableClass {
    fn callable_class(&self) -> &CallableClass;
}

/// 一個可被呼叫的類別: 建構子加上明確的方法表
pub struct ClassDefinition {
    name: String,
    constructor: Constructor,
    methods: Vec<MethodEntry>,
    binder: Option<Binder>,
}

impl ClassDefinition {
    pub fn builder<T, F>(name: &str, constructor: F) -> ClassBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let constructor: Constructor =
            Arc::new(move |container: &Container| Ok(Arc::new(constructor(container)?) as Instance));
        ClassBuilder {
            name: name.trim_matches(NAMESPACE_SEPARATOR).to_string(),
            constructor,
            methods: Vec::new(),
            binder: None,
            _marker: PhantomData,
        }
    }

    pub fn with_default<T>(name: &str) -> ClassBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        Self::builder(name, |_| Ok(T::default()))
    }

    /// 含命名空間的完整名稱
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        self.name
            .rsplit(NAMESPACE_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
    }

    pub fn namespace(&self) -> &str {
        self.name
            .rfind(NAMESPACE_SEPARATOR)
            .map(|index| &self.name[..index])
            .unwrap_or("")
    }

    /// 方法表, 依註冊順序
    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.iter().find(|entry| entry.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    pub fn construct(&self, container: &Container) -> anyhow::Result<Instance> {
        (self.constructor)(container)
    }

    pub fn has_binder(&self) -> bool {
        self.binder.is_some()
    }

    pub fn bind(&self, instance: &(dyn Any + Send + Sync), binding: ClassBinding) {
        if let Some(binder) = &self.binder {
            binder(instance, binding);
        }
    }
}

impl std::fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("binder", &self.binder.is_some())
            .finish_non_exhaustive()
    }
}

pub struct ClassBuilder<T> {
    name: String,
    constructor: Constructor,
    methods: Vec<MethodEntry>,
    binder: Option<Binder>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    pub fn method<F>(self, name: &str, method: F) -> Self
    where
        F: Fn(&T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.entry(name, Visibility::Public, method)
    }

    pub fn protected_method<F>(self, name: &str, method: F) -> Self
    where
        F: Fn(&T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.entry(name, Visibility::Protected, method)
    }

    fn entry<F>(mut self, name: &str, visibility: Visibility, method: F) -> Self
    where
        F: Fn(&T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let class_name = self.name.clone();
        let invoker: Invoker = Arc::new(move |instance: &(dyn Any + Send + Sync), args: &[Value]| {
            let this = instance.downcast_ref::<T>().ok_or_else(|| {
                anyhow::anyhow!("the instance of {} has an unexpected type", class_name)
            })?;
            method(this, args)
        });

        // 同名方法以最後一次定義為準, 保留原本的位置
        let entry = MethodEntry {
            name: name.to_string(),
            visibility,
            invoker,
        };
        match self.methods.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = entry,
            None => self.methods.push(entry),
        }
        self
    }

    pub fn build(self) -> ClassDefinition {
        ClassDefinition {
            name: self.name,
            constructor: self.constructor,
            methods: self.methods,
            binder: self.binder,
        }
    }
}

impl<T: HasCallableClass + Send + Sync + 'static> ClassBuilder<T> {
    /// 實例建立後注入 [`ClassBinding`]
    pub fn with_support(mut self) -> Self {
        self.binder = Some(Arc::new(|instance: &(dyn Any + Send + Sync), binding: ClassBinding| {
            if let Some(this) = instance.downcast_ref::<T>() {
                this.callable_class().bind(binding);
            }
        }));
        self
    }
}

/// 程序中已知的類別符號表
///
/// 類別可以直接定義, 也可以掛在某個原始檔路徑下, 等該路徑被載入後才可見。
#[derive(Default)]
pub struct ClassCatalog {
    classes: RwLock<HashMap<String, Arc<ClassDefinition>>>,
    deferred: Mutex<HashMap<PathBuf, Vec<Arc<ClassDefinition>>>>,
    loaded: Mutex<HashSet<PathBuf>>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, definition: ClassDefinition) {
        let definition = Arc::new(definition);
        tracing::debug!("Defining class {}", definition.name());
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition.name().to_string(), definition);
    }

    pub fn define_in<P: AsRef<Path>>(&self, path: P, definition: ClassDefinition) {
        let path = path.as_ref();
        let loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded.contains(path) {
            drop(loaded);
            self.define(definition);
            return;
        }

        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_default()
            .push(Arc::new(definition));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassDefinition>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 載入原始檔; 重複載入同一路徑不會有任何效果
    pub fn load(&self, path: &Path) -> Result<()> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded.contains(path) {
            return Ok(());
        }

        let definitions = self
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);

        match definitions {
            Some(definitions) => {
                let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
                for definition in definitions {
                    classes.insert(definition.name().to_string(), definition);
                }
            }
            None if !path.exists() => {
                return Err(JaxonError::SourceFileNotFound {
                    path: path.to_path_buf(),
                });
            }
            None => {}
        }

        tracing::debug!("Loaded class source {}", path.display());
        loaded.insert(path.to_path_buf());
        Ok(())
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }
}

impl std::fmt::Debug for ClassCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ClassCatalog")
            .field("classes", &classes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Greeter {
        support: CallableClass,
    }

    impl HasCallableClass for Greeter {
        fn callable_class(&self) -> &CallableClass {
            &self.support
        }
    }

    fn greeter() -> ClassDefinition {
        ClassDefinition::with_default::<Greeter>("\\App\\Greeter")
            .method("hello", |_, args| {
                let name = args.first().and_then(|v| v.as_str()).unwrap_or("world");
                Ok(json!(format!("Hello {}", name)))
            })
            .protected_method("before", |_, _| Ok(Value::Null))
            .with_support()
            .build()
    }

    #[test]
    fn test_definition_names() {
        let definition = greeter();
        assert_eq!(definition.name(), "App\\Greeter");
        assert_eq!(definition.short_name(), "Greeter");
        assert_eq!(definition.namespace(), "App");
        assert!(definition.has_method("hello"));
        assert!(definition.has_method("before"));
        assert!(!definition.has_method("missing"));
        assert!(definition.has_binder());
    }

    #[test]
    fn test_method_invocation_through_table() {
        let definition = greeter();
        let instance = definition.construct(&Container::new()).unwrap();
        let result = definition
            .method("hello")
            .unwrap()
            .invoke(instance.as_ref(), &[json!("Jaxon")])
            .unwrap();
        assert_eq!(result, json!("Hello Jaxon"));
    }

    #[test]
    fn test_redefined_method_keeps_position() {
        let definition = ClassDefinition::with_default::<Greeter>("Greeter")
            .method("first", |_, _| Ok(json!(1)))
            .method("second", |_, _| Ok(json!(2)))
            .method("first", |_, _| Ok(json!(3)))
            .build();
        let names: Vec<&str> = definition.methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["first", "second"]);

        let instance = definition.construct(&Container::new()).unwrap();
        let value = definition
            .method("first")
            .unwrap()
            .invoke(instance.as_ref(), &[])
            .unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_container_resolves_by_type() {
        struct Config(&'static str);

        let container = Container::new().with(Config("value1"));
        assert_eq!(container.require::<Config>().unwrap().0, "value1");
        assert!(container.get::<String>().is_none());
        assert!(container.require::<String>().is_err());
    }

    #[test]
    fn test_deferred_definitions_appear_after_load() {
        let catalog = ClassCatalog::new();
        let path = PathBuf::from("/virtual/Greeter.rs");
        catalog.define_in(&path, greeter());

        assert!(!catalog.contains("App\\Greeter"));
        catalog.load(&path).unwrap();
        assert!(catalog.contains("App\\Greeter"));
        assert!(catalog.is_loaded(&path));

        // Loading twice is a no-op
        catalog.load(&path).unwrap();
    }

    #[test]
    fn test_loading_missing_source_fails() {
        let catalog = ClassCatalog::new();
        let result = catalog.load(Path::new("/definitely/not/here.rs"));
        assert!(matches!(result, Err(JaxonError::SourceFileNotFound { .. })));
    }
}
