pub mod callable_class;
pub mod callable_function;

pub use callable_class::CallableClassPlugin;
pub use callable_function::{CallableFunctionPlugin, Function};

use crate::domain::model::Options;
use serde_json::Value;

/// 類別外掛在程式碼產生器中的優先順序
pub const CALLABLE_CLASS_PRIORITY: i32 = 101;
/// 函式外掛在程式碼產生器中的優先順序
pub const CALLABLE_FUNCTION_PRIORITY: i32 = 100;

/// 產生 `jaxon.request` 的第二個參數, 設定值以 JS 運算式原樣輸出
pub(crate) fn js_parameters(config: &Options) -> String {
    let mut parameters = String::from("{ parameters: arguments");
    for (key, value) in config {
        parameters.push_str(", ");
        parameters.push_str(key);
        parameters.push_str(": ");
        match value {
            Value::String(expression) => parameters.push_str(expression),
            other => parameters.push_str(&other.to_string()),
        }
    }
    parameters.push_str(" }");
    parameters
}
