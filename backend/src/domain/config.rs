use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CHAT_STYLE: &str = "casual";
pub const DEFAULT_DOMAIN_KNOWLEDGE: [&str; 2] = ["task_management", "scheduling"];
pub const DEFAULT_LANGUAGE: &str = "th";

/// Per-project tuning of the assistant, read from `config.ai_config`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantConfig {
    pub chat_style: String,
    pub domain_knowledge: Vec<String>,
    pub language: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            chat_style: DEFAULT_CHAT_STYLE.to_string(),
            domain_knowledge: DEFAULT_DOMAIN_KNOWLEDGE
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl AssistantConfig {
    /// Each missing, blank or mistyped field falls back to its default on its own.
    pub fn from_project_config(raw: Option<&Value>) -> Self {
        let defaults = Self::default();
        let Some(section) = raw.and_then(|config| config.get("ai_config")) else {
            return defaults;
        };

        let chat_style = non_blank(section.get("chat_style")).unwrap_or(defaults.chat_style);
        let language = non_blank(section.get("language")).unwrap_or(defaults.language);

        let mut domain_knowledge: Vec<String> = Vec::new();
        if let Some(tags) = section.get("domain_knowledge").and_then(Value::as_array) {
            for tag in tags.iter().filter_map(|tag| non_blank(Some(tag))) {
                if !domain_knowledge.contains(&tag) {
                    domain_knowledge.push(tag);
                }
            }
        }
        if domain_knowledge.is_empty() {
            domain_knowledge = defaults.domain_knowledge;
        }

        Self {
            chat_style,
            domain_knowledge,
            language,
        }
    }

    /// Fills blank fields of a hand-built config.
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let pick = |value: &str, fallback: String| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                fallback
            } else {
                trimmed.to_string()
            }
        };
        let mut domain_knowledge: Vec<String> = Vec::new();
        for tag in &self.domain_knowledge {
            let tag = tag.trim();
            if !tag.is_empty() && !domain_knowledge.iter().any(|seen| seen == tag) {
                domain_knowledge.push(tag.to_string());
            }
        }
        if domain_knowledge.is_empty() {
            domain_knowledge = defaults.domain_knowledge;
        }
        Self {
            chat_style: pick(&self.chat_style, defaults.chat_style),
            domain_knowledge,
            language: pick(&self.language, defaults.language),
        }
    }

    pub fn is_thai(&self) -> bool {
        self.language.trim().eq_ignore_ascii_case("th")
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_config_uses_defaults() {
        assert_eq!(AssistantConfig::from_project_config(None), AssistantConfig::default());
        assert_eq!(
            AssistantConfig::from_project_config(Some(&json!({"theme": "dark"}))),
            AssistantConfig::default()
        );
    }

    #[test]
    fn fields_default_independently() {
        let raw = json!({"ai_config": {"chat_style": "formal", "language": 7, "domain_knowledge": []}});
        let config = AssistantConfig::from_project_config(Some(&raw));
        assert_eq!(config.chat_style, "formal");
        assert_eq!(config.language, "th");
        assert_eq!(config.domain_knowledge, vec!["task_management", "scheduling"]);
    }

    #[test]
    fn domain_tags_keep_order_without_duplicates() {
        let raw = json!({"ai_config": {"domain_knowledge": ["travel", "finance", "travel", " "]}});
        let config = AssistantConfig::from_project_config(Some(&raw));
        assert_eq!(config.domain_knowledge, vec!["travel", "finance"]);
    }

    #[test]
    fn normalized_fills_blanks() {
        let config = AssistantConfig {
            chat_style: " ".into(),
            domain_knowledge: vec![],
            language: "en".into(),
        }
        .normalized();
        assert_eq!(config.chat_style, "casual");
        assert_eq!(config.language, "en");
        assert!(!config.is_thai());
    }
}
