/// Runtime settings, read once at startup from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let setting = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            // A blank key is as good as no key.
            api_key: lookup("OPENAI_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            api_base: setting("OPENAI_API_BASE", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            text_model: setting("STORY_TEXT_MODEL", "gpt-3.5-turbo"),
            vision_model: setting("STORY_VISION_MODEL", "gpt-4o"),
            image_model: setting("STORY_IMAGE_MODEL", "dall-e-3"),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
        }
    }

    /// Key preview safe for logs.
    pub fn masked_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}***", key.chars().take(6).collect::<String>()),
            None => "<unset>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base, "https://api.openai.com/v1");
        assert_eq!(config.text_model, "gpt-3.5-turbo");
        assert_eq!(config.vision_model, "gpt-4o");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]);
        assert_eq!(config.api_key, None);
        assert_eq!(config.masked_key(), "<unset>");
    }

    #[test]
    fn overrides_are_honoured() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test-123456"),
            ("OPENAI_API_BASE", "http://localhost:9999/v1/"),
            ("STORY_TEXT_MODEL", "gpt-4o-mini"),
            ("PORT", "3000"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("sk-test-123456"));
        assert_eq!(config.api_base, "http://localhost:9999/v1");
        assert_eq!(config.text_model, "gpt-4o-mini");
        assert_eq!(config.port, 3000);
        assert_eq!(config.masked_key(), "sk-tes***");
    }

    #[test]
    fn unparsable_port_falls_back() {
        let config = config_from(&[("PORT", "eighty")]);
        assert_eq!(config.port, 8080);
    }
}
