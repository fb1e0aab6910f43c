use crate::domain::model::{RequestContext, ServerRequest, Target};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 產生的 JS 檔案寫入的儲存位置
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// 處理某一類請求的外掛 (類別方法、函式...)
pub trait RequestPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// 請求由此外掛處理時回傳目標, 否則回傳 None
    fn detect(&self, request: &ServerRequest) -> Option<Target>;

    /// 執行呼叫並把回傳值併入回應
    fn process_request(&self, context: &RequestContext) -> Result<()>;
}

/// 提供前端程式碼的元件
pub trait ScriptGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// 內容雜湊, 註冊內容不變時必須穩定
    fn hash(&self) -> Result<String>;

    fn css(&self) -> String {
        String::new()
    }

    fn js(&self) -> String {
        String::new()
    }

    fn script(&self) -> Result<String>;

    fn ready_enabled(&self) -> bool {
        false
    }

    fn ready_inlined(&self) -> bool {
        false
    }

    fn ready_script(&self) -> String {
        String::new()
    }
}
