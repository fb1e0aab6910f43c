use crate::core::assets::AssetManager;
use crate::core::templates;
use crate::domain::ports::ScriptGenerator;
use crate::utils::error::Result;
use crate::utils::hash::content_hash;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// 所有外掛產生的程式碼
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedCode {
    pub hash: String,
    pub css: String,
    pub js: String,
    pub script: String,
    pub ready_script: String,
    pub inline_script: String,
}

fn trim_fragment(code: &str) -> &str {
    code.trim_matches(|c: char| c == ' ' || c == '\n')
}

fn push_fragment(target: &mut String, code: &str) {
    target.push_str(trim_fragment(code));
    target.push('\n');
}

/// 依優先順序彙整各外掛的 CSS、JS 與前端程式碼
pub struct CodeGenerator {
    version: String,
    generators: RwLock<BTreeMap<i32, Arc<dyn ScriptGenerator>>>,
    assets: Arc<AssetManager>,
    generated: Mutex<Option<Arc<GeneratedCode>>>,
}

impl CodeGenerator {
    pub fn new(version: &str, assets: Arc<AssetManager>) -> Self {
        Self {
            version: version.to_string(),
            generators: RwLock::new(BTreeMap::new()),
            assets,
            generated: Mutex::new(None),
        }
    }

    /// 優先順序已被使用時往後找下一個空位; 回傳實際使用的優先順序
    pub fn add_generator(&self, generator: Arc<dyn ScriptGenerator>, priority: i32) -> i32 {
        let mut generators = self.generators.write().unwrap_or_else(PoisonError::into_inner);
        let mut priority = priority;
        while generators.contains_key(&priority) {
            priority += 1;
        }
        tracing::debug!("Adding code generator {} at priority {}", generator.name(), priority);
        generators.insert(priority, generator);
        drop(generators);

        self.reset();
        priority
    }

    /// 捨棄已產生的程式碼, 下次使用時重新產生
    pub fn reset(&self) {
        *self.generated.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn generators(&self) -> Vec<Arc<dyn ScriptGenerator>> {
        self.generators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn hash(&self) -> Result<String> {
        let mut input = self.version.clone();
        for generator in self.generators() {
            input.push_str(&generator.hash()?);
        }
        Ok(content_hash(input))
    }

    pub fn generate(&self) -> Result<Arc<GeneratedCode>> {
        let mut generated = self.generated.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(code) = generated.as_ref() {
            return Ok(Arc::clone(code));
        }

        let mut code = GeneratedCode {
            hash: self.hash()?,
            ..GeneratedCode::default()
        };
        for generator in self.generators() {
            if self.assets.shall_include_assets(generator.as_ref()) {
                push_fragment(&mut code.css, &generator.css());
                push_fragment(&mut code.js, &generator.js());
            }
            push_fragment(&mut code.script, &generator.script()?);
            if generator.ready_enabled() {
                let target = if generator.ready_inlined() {
                    &mut code.inline_script
                } else {
                    &mut code.ready_script
                };
                push_fragment(target, &generator.ready_script());
            }
        }

        code.css = trim_fragment(&code.css).to_string();
        code.js = trim_fragment(&code.js).to_string();
        code.script = trim_fragment(&code.script).to_string();
        code.ready_script = trim_fragment(&code.ready_script).to_string();
        code.inline_script = trim_fragment(&code.inline_script).to_string();
        if !code.ready_script.is_empty() {
            code.ready_script = templates::ready(&format!("{}\n", code.ready_script));
        }
        if !code.inline_script.is_empty() {
            code.inline_script = templates::ready(&format!("{}\n", code.inline_script));
        }
        // 前端函式庫的檔案放在最前面
        code.js = format!(
            "{}\n{}",
            templates::includes(&self.assets.js_lib_files()),
            code.js
        );

        tracing::debug!("Generated the client code with hash {}", code.hash);
        let code = Arc::new(code);
        *generated = Some(Arc::clone(&code));
        Ok(code)
    }

    pub fn css(&self) -> Result<String> {
        Ok(self.generate()?.css.clone())
    }

    pub fn js(&self) -> Result<String> {
        Ok(self.generate()?.js.clone())
    }

    /// 完整的頁面程式碼
    ///
    /// 啟用 JS 匯出且檔案寫出成功時, 主要程式碼改為引用該檔案。
    pub async fn script(&self, include_js: bool, include_css: bool) -> Result<String> {
        let code = self.generate()?;

        let mut script = String::new();
        if include_css {
            script.push_str(&code.css);
            script.push('\n');
        }
        if include_js {
            script.push_str(&code.js);
            script.push('\n');
        }
        let mut output = script.trim().to_string();
        if !output.is_empty() {
            output.push('\n');
        }

        let config = templates::config(&self.assets.option_vars(&self.version));
        let js_script = format!("{}\n{}\n{}", config, code.script, code.ready_script);

        if self.assets.shall_create_js_files() {
            if let Some(url) = self.assets.create_js_files(&code.hash, &js_script).await {
                output.push_str(&templates::include(&url));
                output.push('\n');
                output.push_str(&templates::wrapper(&code.inline_script));
                return Ok(output);
            }
        }

        output.push_str(&templates::wrapper(&format!("{}\n{}", js_script, code.inline_script)));
        Ok(output)
    }
}

impl std::fmt::Debug for CodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generators = self.generators.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CodeGenerator")
            .field("version", &self.version)
            .field(
                "generators",
                &generators
                    .iter()
                    .map(|(priority, generator)| (*priority, generator.name().to_string()))
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
