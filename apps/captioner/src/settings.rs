use crate::ctx::traits::CtxStore;
use ai::{llm::openai::OpenAI, models::VisionModel, ImageCaptionModel};
use caption_base::FsSidecarStore;
use caption_base_pool::CaptionBaseCtx;
use std::sync::Arc;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

/// Keys accepted by `captioner config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SettingKey {
    ApiKey,
    Model,
    BaseUrl,
    AzureDeployment,
    AzureApiVersion,
    Prompt,
    PrependText,
    AppendText,
}

impl SettingKey {
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Whether the value should be masked when printed.
    pub fn is_secret(self) -> bool {
        matches!(self, Self::ApiKey)
    }
}

#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub azure_deployment: Option<String>,
    pub azure_api_version: String,
    pub prompt: Option<String>,
    pub prepend_text: String,
    pub append_text: String,
}

impl Settings {
    /// Read settings from `store`, `env_api_key` fills in a missing key.
    pub fn from_store(store: &impl CtxStore, env_api_key: Option<String>) -> Self {
        let get = |key: SettingKey| store.get(&key.to_string()).filter(|v| !v.is_empty());

        Self {
            api_key: get(SettingKey::ApiKey)
                .or(env_api_key.filter(|v| !v.is_empty()))
                .unwrap_or_default(),
            model: get(SettingKey::Model).unwrap_or_else(|| VisionModel::default().to_string()),
            base_url: get(SettingKey::BaseUrl).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            azure_deployment: get(SettingKey::AzureDeployment),
            azure_api_version: get(SettingKey::AzureApiVersion)
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            prompt: get(SettingKey::Prompt),
            prepend_text: get(SettingKey::PrependText).unwrap_or_default(),
            append_text: get(SettingKey::AppendText).unwrap_or_default(),
        }
    }

    /// Azure when a deployment is configured, a plain OpenAI compatible
    /// endpoint otherwise.
    pub fn image_caption_model(&self) -> anyhow::Result<Arc<dyn ImageCaptionModel>> {
        let client = match &self.azure_deployment {
            Some(deployment) => {
                OpenAI::new_azure(&self.base_url, deployment, &self.azure_api_version)?
            }
            None => OpenAI::new(&self.base_url)?,
        };
        Ok(Arc::new(client))
    }

    pub fn caption_ctx(&self) -> anyhow::Result<CaptionBaseCtx> {
        if VisionModel::iter().all(|v| v.model_id() != self.model) {
            tracing::warn!("model {} is not a known vision model, using it anyway", self.model);
        }

        Ok(
            CaptionBaseCtx::new(self.image_caption_model()?, Arc::new(FsSidecarStore))
                .with_credentials(&self.api_key, &self.model)
                .with_prompt(self.prompt.clone()),
        )
    }
}

/// `sk-abcdef123456` -> `sk-a…3456`
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctx::default::Store;
    use std::str::FromStr;

    fn store(values: &[(SettingKey, &str)]) -> Store {
        let mut store = Store::new("settings.json".into());
        for (key, value) in values {
            store.insert(&key.to_string(), value).expect("insert");
        }
        store
    }

    #[test]
    fn test_setting_keys() {
        assert_eq!(SettingKey::ApiKey.to_string(), "api-key");
        assert_eq!(SettingKey::from_str("prepend-text").ok(), Some(SettingKey::PrependText));
        assert!(SettingKey::from_str("unknown").is_err());
        assert_eq!(SettingKey::all().len(), 8);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_store(&store(&[]), None);
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.azure_deployment, None);
        assert_eq!(settings.prompt, None);
        assert_eq!(settings.prepend_text, "");
    }

    #[test]
    fn test_env_api_key_fills_missing_key() {
        let settings = Settings::from_store(&store(&[]), Some("sk-env".into()));
        assert_eq!(settings.api_key, "sk-env");

        let settings = Settings::from_store(
            &store(&[(SettingKey::ApiKey, "sk-stored")]),
            Some("sk-env".into()),
        );
        assert_eq!(settings.api_key, "sk-stored");

        let settings = Settings::from_store(&store(&[(SettingKey::ApiKey, "")]), Some("".into()));
        assert_eq!(settings.api_key, "");
    }

    #[test]
    fn test_caption_ctx() {
        let settings = Settings::from_store(
            &store(&[
                (SettingKey::ApiKey, "sk-stored"),
                (SettingKey::Model, "gpt-4o-mini"),
                (SettingKey::Prompt, "Tag this image"),
            ]),
            None,
        );
        let ctx = settings.caption_ctx().expect("ctx");
        assert_eq!(ctx.api_key(), "sk-stored");
        assert_eq!(ctx.model(), "gpt-4o-mini");
        assert_eq!(ctx.prompt(), Some("Tag this image"));

        let settings = Settings::from_store(
            &store(&[
                (SettingKey::BaseUrl, "https://example.openai.azure.com"),
                (SettingKey::AzureDeployment, "vision"),
            ]),
            None,
        );
        assert!(settings.image_caption_model().is_ok());

        let settings = Settings::from_store(&store(&[(SettingKey::BaseUrl, "not a url")]), None);
        assert!(settings.caption_ctx().is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-abcdef123456"), "sk-a…3456");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret(""), "");
    }
}
