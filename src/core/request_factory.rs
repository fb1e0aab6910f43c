//! 在伺服器端產生呼叫 stub 的 JS 運算式, 例如寫進 `onclick` 屬性

use serde_json::Number;
use std::fmt;

/// 字串參數使用的引號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    Single,
    #[default]
    Double,
}

impl Quote {
    fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

/// 呼叫參數, 值在瀏覽器端計算
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// 表單的所有欄位值, 值為表單 id
    FormValues(String),
    /// 輸入欄位的值
    InputValue(String),
    /// 核取方塊是否勾選
    CheckedValue(String),
    /// 元素的 innerHTML
    ElementInnerHtml(String),
    /// 字串常值
    Quoted(String),
    Numeric(Number),
    /// 原樣輸出的 JS 運算式
    Js(String),
    /// 分頁連結使用的頁碼
    PageNumber(u64),
}

impl Parameter {
    pub fn numeric(value: impl Into<Number>) -> Self {
        Parameter::Numeric(value.into())
    }

    fn render(&self, quote: Quote) -> String {
        let element = |function: &str, id: &str, property: &str| {
            format!("jaxon.{}({}){}", function, quoted(id, quote), property)
        };
        match self {
            Parameter::FormValues(id) => element("getFormValues", id, ""),
            Parameter::InputValue(id) => element("$", id, ".value"),
            Parameter::CheckedValue(id) => element("$", id, ".checked"),
            Parameter::ElementInnerHtml(id) => element("$", id, ".innerHTML"),
            Parameter::Quoted(value) => quoted(value, quote),
            Parameter::Numeric(value) => value.to_string(),
            Parameter::Js(expression) => expression.clone(),
            Parameter::PageNumber(page) => page.to_string(),
        }
    }
}

fn quoted(value: &str, quote: Quote) -> String {
    let quote = quote.as_char();
    let mut output = String::with_capacity(value.len() + 2);
    output.push(quote);
    for c in value.chars() {
        match c {
            '\\' | '\'' | '"' => {
                output.push('\\');
                output.push(c);
            }
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\0' => output.push_str("\\0"),
            _ => output.push(c),
        }
    }
    output.push(quote);
    output.replace("</", "<\\/")
}

/// 一次 stub 呼叫, 例如 `JaxonUsers.save(jaxon.getFormValues("user-form"))`
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBuilder {
    name: String,
    quote: Quote,
    parameters: Vec<Parameter>,
}

impl RequestBuilder {
    /// `name` 為完整的 JS 函式名稱 (含前綴)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quote: Quote::default(),
            parameters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_single_quote(&mut self) -> &mut Self {
        self.quote = Quote::Single;
        self
    }

    pub fn use_double_quote(&mut self) -> &mut Self {
        self.quote = Quote::Double;
        self
    }

    pub fn clear_parameters(&mut self) -> &mut Self {
        self.parameters.clear();
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        self.parameters.push(parameter);
        self
    }

    /// 設定指定位置的參數; 中間空出的位置填入 `null`
    pub fn set_parameter(&mut self, index: usize, parameter: Parameter) -> &mut Self {
        if index < self.parameters.len() {
            self.parameters[index] = parameter;
        } else {
            self.parameters
                .resize(index, Parameter::Js("null".to_string()));
            self.parameters.push(parameter);
        }
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn has_page_number(&self) -> bool {
        self.page_number_index().is_some()
    }

    fn page_number_index(&self) -> Option<usize> {
        self.parameters
            .iter()
            .rposition(|parameter| matches!(parameter, Parameter::PageNumber(_)))
    }

    /// 更新頁碼參數; 沒有頁碼參數或頁碼為 0 時不變
    pub fn set_page_number(&mut self, page: u64) -> &mut Self {
        if page > 0 {
            if let Some(index) = self.page_number_index() {
                self.parameters[index] = Parameter::PageNumber(page);
            }
        }
        self
    }

    pub fn script(&self) -> String {
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .map(|parameter| parameter.render(self.quote))
            .collect();
        format!("{}({})", self.name, parameters.join(", "))
    }
}

impl fmt::Display for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_kinds() {
        let mut request = RequestBuilder::new("JaxonUsers.save");
        request
            .add_parameter(Parameter::FormValues("user-form".to_string()))
            .add_parameter(Parameter::InputValue("name".to_string()))
            .add_parameter(Parameter::CheckedValue("admin".to_string()))
            .add_parameter(Parameter::ElementInnerHtml("note".to_string()))
            .add_parameter(Parameter::numeric(42))
            .add_parameter(Parameter::Js("window.location.hash".to_string()));

        assert_eq!(
            request.script(),
            "JaxonUsers.save(jaxon.getFormValues(\"user-form\"), jaxon.$(\"name\").value, \
             jaxon.$(\"admin\").checked, jaxon.$(\"note\").innerHTML, 42, window.location.hash)"
        );
        assert_eq!(request.to_string(), request.script());
    }

    #[test]
    fn test_quote_choice_and_escaping() {
        let mut request = RequestBuilder::new("jaxon_ping");
        request.add_parameter(Parameter::Quoted("it's \"here\"\n".to_string()));
        assert_eq!(request.script(), "jaxon_ping(\"it\\'s \\\"here\\\"\\n\")");

        request
            .use_single_quote()
            .set_parameter(0, Parameter::Quoted("</script>".to_string()));
        assert_eq!(request.script(), "jaxon_ping('<\\/script>')");
    }

    #[test]
    fn test_set_parameter_fills_gaps() {
        let mut request = RequestBuilder::new("jaxon_ping");
        request.set_parameter(2, Parameter::numeric(7));
        assert_eq!(request.script(), "jaxon_ping(null, null, 7)");

        request.set_parameter(0, Parameter::Quoted("a".to_string()));
        assert_eq!(request.script(), "jaxon_ping(\"a\", null, 7)");

        request.clear_parameters();
        assert_eq!(request.script(), "jaxon_ping()");
    }

    #[test]
    fn test_page_number() {
        let mut request = RequestBuilder::new("JaxonPosts.page");
        assert!(!request.has_page_number());
        request.set_page_number(3);
        assert_eq!(request.script(), "JaxonPosts.page()");

        request
            .add_parameter(Parameter::Quoted("news".to_string()))
            .add_parameter(Parameter::PageNumber(1));
        assert!(request.has_page_number());

        request.set_page_number(0);
        assert_eq!(request.script(), "JaxonPosts.page(\"news\", 1)");
        request.set_page_number(4);
        assert_eq!(request.script(), "JaxonPosts.page(\"news\", 4)");
    }
}
