//! 產生的 HTML/JS 片段

/// 寫入 `jaxon.config` 的變數
#[derive(Debug, Clone, PartialEq)]
pub struct OptionVars {
    pub request_uri: String,
    pub version: String,
    pub default_mode: String,
    pub default_method: String,
    pub response_type: String,
    pub debug: bool,
}

/// JS 字串常值; `</` 也被跳脫, 放進 `<script>` 區塊時不會提前結束
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string().replace("</", "<\\/")
}

pub fn config(vars: &OptionVars) -> String {
    let mut code = format!(
        "jaxon.config.requestURI = {};\n\
         jaxon.config.statusMessages = false;\n\
         jaxon.config.waitCursor = true;\n\
         jaxon.config.version = {};\n\
         jaxon.config.defaultMode = {};\n\
         jaxon.config.defaultMethod = {};\n\
         jaxon.config.responseType = {};",
        js_string(&vars.request_uri),
        js_string(&vars.version),
        js_string(&vars.default_mode),
        js_string(&vars.default_method),
        js_string(&vars.response_type),
    );
    if vars.debug {
        code.push_str("\njaxon.debug.active = true;");
    }
    code
}

/// DOM 載入完成後才執行的程式碼
pub fn ready(script: &str) -> String {
    format!("jaxon.dom.ready(function() {{\n{}}});", script)
}

pub fn wrapper(script: &str) -> String {
    format!("<script type=\"text/javascript\">\n{}\n</script>", script)
}

pub fn include(url: &str) -> String {
    format!("<script type=\"text/javascript\" src=\"{}\"></script>", url)
}

pub fn includes(urls: &[String]) -> String {
    urls.iter()
        .map(|url| include(url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(debug: bool) -> OptionVars {
        OptionVars {
            request_uri: "/jaxon".to_string(),
            version: "Jaxon 0.1.0".to_string(),
            default_mode: "asynchronous".to_string(),
            default_method: "POST".to_string(),
            response_type: "JSON".to_string(),
            debug,
        }
    }

    #[test]
    fn test_config_block() {
        let code = config(&vars(false));
        assert!(code.starts_with("jaxon.config.requestURI = \"/jaxon\";\n"));
        assert!(code.contains("jaxon.config.defaultMethod = \"POST\";"));
        assert!(!code.contains("jaxon.debug.active"));

        assert!(config(&vars(true)).ends_with("jaxon.debug.active = true;"));
    }

    #[test]
    fn test_config_values_are_escaped() {
        let mut vars = vars(false);
        vars.request_uri = "/jaxon\"; alert(1); //".to_string();
        vars.default_mode = "</script><script>".to_string();

        let code = config(&vars);
        assert!(code.starts_with("jaxon.config.requestURI = \"/jaxon\\\"; alert(1); //\";\n"));
        assert!(code.contains("jaxon.config.defaultMode = \"<\\/script><script>\";"));
        assert!(!code.contains("</script>"));
    }

    #[test]
    fn test_fragments() {
        assert_eq!(ready("init();\n"), "jaxon.dom.ready(function() {\ninit();\n});");
        assert_eq!(
            wrapper("init();"),
            "<script type=\"text/javascript\">\ninit();\n</script>"
        );
        assert_eq!(
            includes(&["/a.js".to_string(), "/b.js".to_string()]),
            "<script type=\"text/javascript\" src=\"/a.js\"></script>\n\
             <script type=\"text/javascript\" src=\"/b.js\"></script>"
        );
        assert_eq!(includes(&[]), "");
    }
}
