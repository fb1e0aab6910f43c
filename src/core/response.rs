use crate::domain::response::Response;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};

thread_local! {
    /// 目前執行緒上進行中的請求回應, 以管理器的位址區分
    static SCOPED: RefCell<Vec<(usize, Response)>> = const { RefCell::new(Vec::new()) };
}

/// 離開範圍時移除該範圍的回應 (包含 panic)
struct ScopeGuard {
    id: usize,
}

impl ScopeGuard {
    fn finish(self) -> Response {
        let response = SCOPED.with(|scoped| {
            let mut scoped = scoped.borrow_mut();
            match scoped.iter().rposition(|(id, _)| *id == self.id) {
                Some(index) => scoped.remove(index).1,
                None => Response::new(),
            }
        });
        std::mem::forget(self);
        response
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPED.with(|scoped| {
            let mut scoped = scoped.borrow_mut();
            if let Some(index) = scoped.iter().rposition(|(id, _)| *id == self.id) {
                scoped.remove(index);
            }
        });
    }
}

/// 收集 UI 指令
///
/// 可複製的控制代碼。在 [`ResponseManager::scope`] 之內, 指令寫入該次請求
/// 專屬的回應 (同一執行緒); 範圍之外則寫入所有複本共用的回應。
#[derive(Debug, Clone, Default)]
pub struct ResponseManager {
    shared: Arc<Mutex<Response>>,
}

impl ResponseManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    /// 直接操作目前的回應
    pub fn with<R>(&self, f: impl FnOnce(&mut Response) -> R) -> R {
        let id = self.id();
        SCOPED.with(|scoped| {
            let mut scoped = scoped.borrow_mut();
            match scoped.iter_mut().rev().find(|(scope_id, _)| *scope_id == id) {
                Some((_, response)) => f(response),
                None => f(&mut self.shared.lock().unwrap_or_else(PoisonError::into_inner)),
            }
        })
    }

    /// 以一個全新的回應執行 `f`, 回傳結果與這段期間累積的回應
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> (R, Response) {
        let id = self.id();
        SCOPED.with(|scoped| scoped.borrow_mut().push((id, Response::new())));
        let guard = ScopeGuard { id };
        let result = f();
        (result, guard.finish())
    }

    pub fn alert(&self, message: &str) {
        self.with(|response| {
            response.alert(message);
        });
    }

    pub fn html(&self, id: &str, data: impl Into<Value>) {
        self.with(|response| {
            response.html(id, data);
        });
    }

    pub fn assign(&self, id: &str, attribute: &str, data: impl Into<Value>) {
        self.with(|response| {
            response.assign(id, attribute, data);
        });
    }

    pub fn script(&self, code: &str) {
        self.with(|response| {
            response.script(code);
        });
    }

    pub fn debug(&self, message: &str) {
        self.with(|response| {
            response.debug(message);
        });
    }

    /// 併入呼叫的回傳值
    ///
    /// 具有回應結構的值會合併其指令, 其他非 null 的值保存為回傳值。
    pub fn append(&self, value: Value) {
        if value.is_null() {
            return;
        }

        let is_response = value
            .as_object()
            .map(|object| object.contains_key("jxnobj"))
            .unwrap_or(false);

        if is_response {
            match serde_json::from_value::<Response>(value.clone()) {
                Ok(response) => {
                    self.append_response(response, false);
                    return;
                }
                Err(e) => tracing::debug!("Return value is not a response: {}", e),
            }
        }

        self.with(|response| response.return_value = Some(value));
    }

    pub fn append_response(&self, other: Response, before: bool) {
        self.with(|response| {
            response.append_response(other, before);
        });
    }

    pub fn command_count(&self) -> usize {
        self.with(|response| response.commands.len())
    }

    /// 取出目前累積的回應並重設
    pub fn take(&self) -> Response {
        self.with(std::mem::take)
    }
}
