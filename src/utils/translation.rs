use std::collections::HashMap;

pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr"];

const EN_MESSAGES: &[(&str, &str)] = &[
    (
        "errors.objects.invalid",
        "Invalid object request received; no object :class or method :method found.",
    ),
    ("errors.objects.invalid-declaration", "Invalid object declaration."),
    (
        "errors.functions.invalid",
        "Invalid function request received; no function :name found.",
    ),
    ("errors.functions.invalid-declaration", "Invalid function declaration."),
    ("errors.directory.invalid", "The directory :path is not a valid directory."),
    (
        "errors.request.conversion",
        "The request arguments could not be decoded.",
    ),
    ("errors.request.plugin", "No plugin is able to process the request."),
];

const FR_MESSAGES: &[(&str, &str)] = &[
    (
        "errors.objects.invalid",
        "Requête invalide; l'objet :class ou la méthode :method est introuvable.",
    ),
    ("errors.objects.invalid-declaration", "Déclaration d'objet invalide."),
    (
        "errors.functions.invalid",
        "Requête invalide; la fonction :name est introuvable.",
    ),
    ("errors.functions.invalid-declaration", "Déclaration de fonction invalide."),
    ("errors.directory.invalid", "Le répertoire :path n'est pas valide."),
    (
        "errors.request.conversion",
        "Les arguments de la requête n'ont pas pu être décodés.",
    ),
    ("errors.request.plugin", "Aucun plugin ne peut traiter la requête."),
];

/// 錯誤訊息目錄, 以鍵值查詢並替換 `:name` 形式的參數
#[derive(Debug, Clone)]
pub struct Translator {
    language: String,
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Translator {
    pub fn new(language: &str) -> Self {
        let mut messages = HashMap::new();
        messages.insert("en", EN_MESSAGES.iter().copied().collect());
        messages.insert("fr", FR_MESSAGES.iter().copied().collect());

        Self {
            language: language.to_string(),
            messages,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// 找不到目前語言的訊息時改用英文, 都找不到則回傳鍵本身
    pub fn trans(&self, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .messages
            .get(self.language.as_str())
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get("en").and_then(|catalog| catalog.get(key)))
            .copied()
            .unwrap_or(key);

        // 先替換較長的參數名稱, 避免 :class 蓋掉 :classname 之類的前綴
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        sorted
            .into_iter()
            .fold(template.to_string(), |message, (name, value)| {
                message.replace(&format!(":{}", name), value)
            })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new("en")
    }
}
