use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 傳給瀏覽器端執行的一個 UI 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub cmd: String,
    #[serde(flatten)]
    pub args: serde_json::Map<String, Value>,
}

impl Command {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            args: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }
}

/// 回應內容, 序列化後為 `{"jxnobj": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "jxnobj")]
    pub commands: Vec<Command>,
    /// 呼叫回傳的非回應值
    #[serde(rename = "jxnrv", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn assign(&mut self, id: &str, attribute: &str, data: impl Into<Value>) -> &mut Self {
        self.add_command(
            Command::new("as")
                .with("id", id)
                .with("prop", attribute)
                .with("data", data),
        )
    }

    pub fn html(&mut self, id: &str, data: impl Into<Value>) -> &mut Self {
        self.assign(id, "innerHTML", data)
    }

    pub fn append(&mut self, id: &str, attribute: &str, data: impl Into<Value>) -> &mut Self {
        self.add_command(
            Command::new("ap")
                .with("id", id)
                .with("prop", attribute)
                .with("data", data),
        )
    }

    pub fn alert(&mut self, message: &str) -> &mut Self {
        self.add_command(Command::new("al").with("data", message))
    }

    pub fn script(&mut self, code: &str) -> &mut Self {
        self.add_command(Command::new("js").with("data", code))
    }

    pub fn debug(&mut self, message: &str) -> &mut Self {
        self.add_command(Command::new("dbg").with("data", message))
    }

    /// 合併另一個回應; `before` 為 true 時其指令排在前面
    pub fn append_response(&mut self, other: Response, before: bool) -> &mut Self {
        if before {
            let mut commands = other.commands;
            commands.append(&mut self.commands);
            self.commands = commands;
        } else {
            self.commands.extend(other.commands);
        }
        if other.return_value.is_some() {
            self.return_value = other.return_value;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.return_value.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        serde_json::to_value(response).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let mut response = Response::new();
        response.alert("Hello").html("div-id", "<b>content</b>");

        let json: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "jxnobj": [
                    {"cmd": "al", "data": "Hello"},
                    {"cmd": "as", "id": "div-id", "prop": "innerHTML", "data": "<b>content</b>"}
                ]
            })
        );
    }

    #[test]
    fn test_append_response_before() {
        let mut global = Response::new();
        global.alert("This is the global response!");

        let mut other = Response::new();
        other.debug("This is a different response!");

        global.append_response(other, true);
        assert_eq!(global.commands[0].cmd, "dbg");
        assert_eq!(global.commands[1].cmd, "al");
    }

    #[test]
    fn test_response_round_trips_through_value() {
        let mut response = Response::new();
        response.script("console.log(1)");

        let value: Value = response.clone().into();
        let decoded: Response = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, response);
    }
}
