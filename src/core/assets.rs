use crate::config::toml_config::LibConfig;
use crate::core::templates::OptionVars;
use crate::domain::ports::{ScriptGenerator, Storage};
use std::sync::Arc;

/// 決定要輸出哪些資源, 並負責把產生的程式碼寫成 JS 檔案
pub struct AssetManager {
    config: LibConfig,
    storage: Option<Arc<dyn Storage>>,
}

impl AssetManager {
    pub fn new(config: LibConfig, storage: Option<Arc<dyn Storage>>) -> Self {
        Self { config, storage }
    }

    pub fn shall_include_assets(&self, generator: &dyn ScriptGenerator) -> bool {
        self.config.assets.include.includes(generator.name())
    }

    /// 前端函式庫的檔案
    pub fn js_lib_files(&self) -> Vec<String> {
        let base = self.config.js.lib.uri.trim_end_matches('/');
        let mut files = vec![format!("{}/jaxon.core.js", base)];
        if self.config.core.debug.on {
            files.push(format!("{}/jaxon.debug.js", base));
        }
        let language = &self.config.core.language;
        if language != "en" {
            files.push(format!("{}/lang/jaxon.{}.js", base, language));
        }
        files
    }

    pub fn option_vars(&self, version: &str) -> OptionVars {
        let core = &self.config.core;
        OptionVars {
            request_uri: core.request.uri.clone(),
            version: version.to_string(),
            default_mode: core.request.mode.clone(),
            default_method: core.request.method.clone(),
            response_type: "JSON".to_string(),
            debug: core.debug.on,
        }
    }

    pub fn shall_create_js_files(&self) -> bool {
        let app = &self.config.js.app;
        app.export && app.uri.is_some() && self.storage.is_some()
    }

    /// 寫出 JS 檔案並回傳其網址; 無法寫出時回傳 None, 程式碼改為內嵌
    pub async fn create_js_files(&self, hash: &str, code: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;
        let app = &self.config.js.app;
        let uri = app.uri.as_deref()?;

        let file = format!("{}.js", app.file.as_deref().unwrap_or(hash));
        // 內容相同的檔案不必重寫
        let unchanged = match storage.read_file(&file).await {
            Ok(existing) => existing == code.as_bytes(),
            Err(_) => false,
        };
        if unchanged {
            tracing::debug!("The generated script {} is up to date", file);
        } else {
            if let Err(e) = storage.write_file(&file, code.as_bytes()).await {
                tracing::warn!("Unable to write the generated script {}: {}", file, e);
                return None;
            }
            tracing::debug!("Exported the generated script to {}", file);
        }

        Some(format!("{}/{}", uri.trim_end_matches('/'), file))
    }
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("config", &self.config)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{JaxonError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
        writes: AtomicUsize,
        read_only: bool,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| JaxonError::ConfigError {
                    message: format!("no file {}", path),
                })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            if self.read_only {
                return Err(JaxonError::ConfigError {
                    message: "read-only".to_string(),
                });
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.files.lock().unwrap().insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn export_config() -> LibConfig {
        let mut config = LibConfig::default();
        config.js.app.export = true;
        config.js.app.uri = Some("https://cdn.example.com/js/".to_string());
        config.js.app.dir = Some("/srv/js".to_string());
        config
    }

    #[test]
    fn test_js_lib_files() {
        let mut config = LibConfig::default();
        config.js.lib.uri = "/jaxon/".to_string();
        config.core.debug.on = true;
        config.core.language = "fr".to_string();

        let assets = AssetManager::new(config, None);
        assert_eq!(
            assets.js_lib_files(),
            vec![
                "/jaxon/jaxon.core.js".to_string(),
                "/jaxon/jaxon.debug.js".to_string(),
                "/jaxon/lang/jaxon.fr.js".to_string(),
            ]
        );
    }

    #[test]
    fn test_export_requires_storage() {
        assert!(!AssetManager::new(export_config(), None).shall_create_js_files());
        assert!(!AssetManager::new(LibConfig::default(), Some(Arc::new(MemoryStorage::default())))
            .shall_create_js_files());
    }

    #[tokio::test]
    async fn test_create_js_files() {
        let storage = Arc::new(MemoryStorage::default());
        let assets = AssetManager::new(export_config(), Some(storage.clone()));
        assert!(assets.shall_create_js_files());

        let url = assets.create_js_files("abc123", "jaxon_ping = 1;").await;
        assert_eq!(url.as_deref(), Some("https://cdn.example.com/js/abc123.js"));
        assert_eq!(storage.read_file("abc123.js").await.unwrap(), b"jaxon_ping = 1;".to_vec());
    }

    #[tokio::test]
    async fn test_stale_files_are_rewritten() {
        let storage = Arc::new(MemoryStorage::default());
        let assets = AssetManager::new(export_config(), Some(storage.clone()));

        assets.create_js_files("abc123", "first();").await;
        assets.create_js_files("abc123", "first();").await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);

        assets.create_js_files("abc123", "second();").await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
        assert_eq!(storage.read_file("abc123.js").await.unwrap(), b"second();".to_vec());
    }

    #[tokio::test]
    async fn test_write_failure_falls_back_to_inline() {
        let storage = Arc::new(MemoryStorage {
            read_only: true,
            ..MemoryStorage::default()
        });
        let assets = AssetManager::new(export_config(), Some(storage));
        assert_eq!(assets.create_js_files("abc123", "code").await, None);
    }
}
