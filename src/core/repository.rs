use crate::core::callable_object::CallableObject;
use crate::core::class_definition::{ClassCatalog, Container};
use crate::core::response::ResponseManager;
use crate::domain::model::{
    ClassRegistration, DirectoryOptions, NamespaceRegistration, Options, Separator,
    NAMESPACE_SEPARATOR,
};
use crate::utils::error::{JaxonError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use walkdir::WalkDir;

#[derive(Debug, Default)]
struct Registrations {
    classes: HashMap<String, ClassRegistration>,
    namespaces: HashMap<String, NamespaceRegistration>,
    /// 掃描命名空間目錄時找到的 (子) 命名空間
    js_namespaces: BTreeMap<String, Separator>,
    /// 掃描命名空間目錄時找到的類別
    discovered: BTreeSet<String>,
    parsed: HashSet<String>,
}

/// 解析類別名稱時找到的設定
struct ResolvedOptions {
    options: Options,
    include: Option<PathBuf>,
}

/// 已註冊類別與命名空間的儲存庫, 負責把類別名稱解析為 [`CallableObject`]
pub struct CallableRepository {
    catalog: Arc<ClassCatalog>,
    container: Arc<Container>,
    response: ResponseManager,
    registrations: RwLock<Registrations>,
    objects: RwLock<HashMap<String, Arc<CallableObject>>>,
}

/// 把前端的 `.` 或 `_` 分隔符換回 `\`, 並去除頭尾的分隔符
pub fn normalize_class_name(class_name: &str) -> String {
    class_name
        .replace(['.', '_'], &NAMESPACE_SEPARATOR.to_string())
        .trim_matches(NAMESPACE_SEPARATOR)
        .to_string()
}

/// 目錄中的類別原始檔 (依副檔名過濾)
fn class_files(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

impl CallableRepository {
    pub fn new(catalog: Arc<ClassCatalog>, container: Arc<Container>, response: ResponseManager) -> Self {
        Self {
            catalog,
            container,
            response,
            registrations: RwLock::new(Registrations::default()),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// 註冊 (或覆蓋) 一個類別; 此時不檢查類別是否存在
    pub fn add_class(&self, class_name: &str, options: Options) {
        let class_name = class_name.trim_matches(NAMESPACE_SEPARATOR).to_string();
        tracing::debug!("Registering class {}", class_name);

        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .classes
            .insert(class_name.clone(), ClassRegistration::new(class_name.clone(), options));

        // 最後一次註冊為準, 舊的物件不再使用
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&class_name);
    }

    pub fn add_namespace(&self, registration: NamespaceRegistration) {
        let namespace = registration
            .namespace
            .trim_matches(NAMESPACE_SEPARATOR)
            .to_string();
        tracing::debug!(
            "Registering namespace {} from {}",
            namespace,
            registration.directory.display()
        );

        let registration = NamespaceRegistration {
            namespace: namespace.clone(),
            ..registration
        };
        let mut registrations = self.registrations.write().unwrap_or_else(PoisonError::into_inner);
        registrations.parsed.remove(&namespace);

        // 命名空間中已解析的物件改用新的設定
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|class_name, _| !registration.contains(class_name));
        registrations.namespaces.insert(namespace, registration);
    }

    /// 掃描目錄, 每個原始檔以檔名作為類別名稱註冊; 回傳註冊的類別
    pub fn add_directory(&self, directory: &Path, options: &DirectoryOptions) -> Result<Vec<String>> {
        let mut class_names = Vec::new();

        for path in class_files(directory, &options.extension)? {
            let Some(class_name) = file_stem(&path) else {
                continue;
            };

            let mut defaults = Options::new();
            if options.autoload {
                defaults.insert(
                    "include".to_string(),
                    Value::String(path.to_string_lossy().into_owned()),
                );
            }

            let class_options = options.class_options(&class_name, defaults);
            self.add_class(&class_name, class_options);
            class_names.push(class_name);
        }

        tracing::debug!(
            "Registered {} classes from {}",
            class_names.len(),
            directory.display()
        );
        Ok(class_names)
    }

    fn find_options(&self, class_name: &str) -> Option<ResolvedOptions> {
        let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(registration) = registrations.classes.get(class_name) {
            return Some(ResolvedOptions {
                options: registration.options.clone(),
                include: registration.include().map(Path::to_path_buf),
            });
        }

        // 以最長的命名空間為準, 巢狀命名空間才不會被外層的設定蓋過
        let namespace = registrations
            .namespaces
            .values()
            .filter(|namespace| namespace.contains(class_name))
            .max_by_key(|namespace| namespace.namespace.len())?;

        let mut options = namespace.options.class_options(class_name, Options::new());
        options.insert(
            "namespace".to_string(),
            Value::String(namespace.namespace.clone()),
        );

        let include = options
            .get("include")
            .and_then(|value| value.as_str())
            .map(PathBuf::from)
            .or_else(|| {
                if namespace.options.autoload {
                    namespace.class_file(class_name)
                } else {
                    None
                }
            });

        Some(ResolvedOptions { options, include })
    }

    /// 依名稱取得可呼叫物件, 第一次解析後會被快取
    pub fn resolve(&self, class_name: &str) -> Result<Arc<CallableObject>> {
        let class_name = normalize_class_name(class_name);

        if let Some(object) = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&class_name)
        {
            return Ok(Arc::clone(object));
        }

        let resolved = self
            .find_options(&class_name)
            .ok_or_else(|| JaxonError::ClassNotFound {
                class: class_name.clone(),
            })?;

        // 類別尚未定義時才載入原始檔
        if !self.catalog.contains(&class_name) {
            if let Some(path) = &resolved.include {
                self.catalog.load(path)?;
            }
        }

        let definition = self
            .catalog
            .get(&class_name)
            .ok_or_else(|| JaxonError::ClassNotFound {
                class: class_name.clone(),
            })?;

        let mut object = CallableObject::new(definition, Arc::clone(&self.container), self.response.clone());
        let mut js_options = Options::new();
        for (name, value) in &resolved.options {
            match name.as_str() {
                "separator" | "protected" | "namespace" => object.configure(name, value),
                "include" => {}
                _ if value.is_object() => {
                    js_options.insert(name.clone(), value.clone());
                }
                _ => {}
            }
        }
        object.set_js_options(js_options);

        tracing::debug!("Resolved class {} as {}", class_name, object.js_name());

        // 並行解析時以第一個寫入的物件為準
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let object = objects
            .entry(class_name)
            .or_insert_with(|| Arc::new(object));
        Ok(Arc::clone(object))
    }

    /// 已直接註冊的類別名稱 (排序)
    pub fn class_names(&self) -> Vec<String> {
        let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = registrations.classes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn namespaces(&self) -> Vec<NamespaceRegistration> {
        let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);
        let mut namespaces: Vec<NamespaceRegistration> =
            registrations.namespaces.values().cloned().collect();
        namespaces.sort_by(|a, b| a.namespace.cmp(&b.namespace));
        namespaces
    }

    pub fn js_namespaces(&self) -> BTreeMap<String, Separator> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .js_namespaces
            .clone()
    }

    /// 掃描每個命名空間的目錄一次, 回傳所有找到的類別名稱
    pub fn parse_namespaces(&self) -> Result<Vec<String>> {
        let pending: Vec<NamespaceRegistration> = {
            let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);
            registrations
                .namespaces
                .values()
                .filter(|namespace| !registrations.parsed.contains(&namespace.namespace))
                .cloned()
                .collect()
        };

        let mut found = Vec::new();
        for namespace in &pending {
            let mut js_namespaces = vec![namespace.namespace.clone()];
            let mut classes = Vec::new();

            for path in class_files(&namespace.directory, &namespace.options.extension)? {
                let Some(class_name) = file_stem(&path) else {
                    continue;
                };

                // 相對目錄即為子命名空間
                let mut class_path = namespace.namespace.clone();
                if let Some(parent) = path.parent().and_then(|p| p.strip_prefix(&namespace.directory).ok()) {
                    for component in parent.components() {
                        class_path.push(NAMESPACE_SEPARATOR);
                        class_path.push_str(&component.as_os_str().to_string_lossy());
                    }
                }

                classes.push(format!("{}{}{}", class_path, NAMESPACE_SEPARATOR, class_name));
                js_namespaces.push(class_path);
            }

            tracing::debug!(
                "Found {} classes in namespace {}",
                classes.len(),
                namespace.namespace
            );
            found.push((namespace.namespace.clone(), namespace.options.separator, js_namespaces, classes));
        }

        let mut registrations = self.registrations.write().unwrap_or_else(PoisonError::into_inner);
        for (namespace, separator, js_namespaces, classes) in found {
            for js_namespace in js_namespaces {
                registrations.js_namespaces.insert(js_namespace, separator);
            }
            registrations.discovered.extend(classes);
            registrations.parsed.insert(namespace);
        }

        Ok(registrations.discovered.iter().cloned().collect())
    }

    /// 解析所有已註冊與找到的類別, 依名稱長度再依名稱排序
    pub fn callable_objects(&self) -> Result<Vec<Arc<CallableObject>>> {
        let mut names: BTreeSet<String> = self.parse_namespaces()?.into_iter().collect();
        names.extend(self.class_names());

        let mut objects = Vec::with_capacity(names.len());
        for name in &names {
            match self.resolve(name) {
                Ok(object) => objects.push(object),
                // 目錄中不是類別的原始檔 (例如 mod.rs)
                Err(JaxonError::ClassNotFound { class }) => {
                    tracing::debug!("Skipping {}, no class is defined under this name", class);
                }
                Err(e) => return Err(e),
            }
        }
        objects.sort_by(|a, b| {
            a.class_name()
                .len()
                .cmp(&b.class_name().len())
                .then_with(|| a.class_name().cmp(b.class_name()))
        });
        objects.dedup_by(|a, b| Arc::ptr_eq(a, b));
        Ok(objects)
    }
}

impl std::fmt::Debug for CallableRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableRepository")
            .field("catalog", &self.catalog)
            .field("classes", &self.class_names())
            .finish_non_exhaustive()
    }
}
