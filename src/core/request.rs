use crate::core::response::ResponseManager;
use crate::domain::model::{RequestContext, ServerRequest, Target};
use crate::domain::ports::RequestPlugin;
use crate::domain::response::Response;
use crate::utils::error::{JaxonError, Result};
use crate::utils::translation::Translator;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// 請求參數的欄位名稱
pub const ARGUMENTS_KEY: &str = "jxnargs";

/// 從請求中解出呼叫參數
#[derive(Debug, Clone)]
pub struct ArgumentManager {
    translator: Arc<Translator>,
}

impl ArgumentManager {
    pub fn new(translator: Arc<Translator>) -> Self {
        Self { translator }
    }

    /// `jxnargs` 可以是 JSON 內容中的陣列, 或表單/查詢字串中 JSON 編碼的陣列
    pub fn arguments(&self, request: &ServerRequest) -> Result<Vec<Value>> {
        match request.param(ARGUMENTS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(arguments)) => Ok(arguments.clone()),
            Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(Vec::new()),
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Array(arguments)) => Ok(arguments),
                Ok(_) => Err(self.conversion_error()),
                Err(e) => {
                    tracing::warn!("Unable to decode the request arguments: {}", e);
                    Err(self.conversion_error())
                }
            },
            Some(_) => Err(self.conversion_error()),
        }
    }

    fn conversion_error(&self) -> JaxonError {
        JaxonError::request(self.translator.trans("errors.request.conversion", &[]))
    }
}

/// 依序詢問外掛, 由第一個認得請求的外掛處理
pub struct RequestHandler {
    plugins: RwLock<Vec<Arc<dyn RequestPlugin>>>,
    arguments: ArgumentManager,
    response: ResponseManager,
    translator: Arc<Translator>,
}

impl RequestHandler {
    pub fn new(arguments: ArgumentManager, response: ResponseManager, translator: Arc<Translator>) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            arguments,
            response,
            translator,
        }
    }

    pub fn add_plugin(&self, plugin: Arc<dyn RequestPlugin>) {
        tracing::debug!("Adding request plugin {}", plugin.name());
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(plugin);
    }

    fn find_plugin(&self, request: &ServerRequest) -> Option<(Arc<dyn RequestPlugin>, Target)> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find_map(|plugin| {
                plugin
                    .detect(request)
                    .map(|target| (Arc::clone(plugin), target))
            })
    }

    pub fn can_process_request(&self, request: &ServerRequest) -> bool {
        self.find_plugin(request).is_some()
    }

    /// 處理請求並回傳這次請求累積的回應; 失敗時丟棄已累積的指令
    ///
    /// 每次請求在自己的回應範圍內執行, 並行的請求不會看到彼此的指令。
    pub fn process_request(&self, request: &ServerRequest) -> Result<Response> {
        let (plugin, target) = self
            .find_plugin(request)
            .ok_or_else(|| JaxonError::request(self.translator.trans("errors.request.plugin", &[])))?;

        let (result, response) = self.response.scope(|| {
            let arguments = self.arguments.arguments(request)?;
            let context = RequestContext { target, arguments };
            tracing::info!(
                "Processing request for {} with {} plugin",
                context.target,
                plugin.name()
            );
            plugin.process_request(&context)
        });

        result.map(|()| response)
    }
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RequestHandler")
            .field(
                "plugins",
                &plugins.iter().map(|plugin| plugin.name().to_string()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
