//! Translation service catalog.
//!
//! Each translation provider the backend supports needs its own credentials
//! and model settings. [`Service`] names the providers and describes their
//! form fields; [`ServiceSelection`] turns a chosen provider plus field values
//! into the pass-through [`TranslateParams`] of a submission.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::TranslateParams;

/// Input widget kind of a provider field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain text
    Text,
    /// Secret; should be masked when displayed
    Password,
}

/// One configurable field of a provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Form field name sent to the backend
    pub name: &'static str,
    /// Message key of the field's label
    pub label: &'static str,
    /// Widget kind
    pub kind: FieldKind,
    /// Example value
    pub placeholder: Option<&'static str>,
}

const fn secret(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: FieldKind::Password,
        placeholder: None,
    }
}

const fn text(
    name: &'static str,
    label: &'static str,
    placeholder: Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: FieldKind::Text,
        placeholder,
    }
}

const API_KEY: &str = "serviceFields.apiKey";
const MODEL: &str = "serviceFields.model";
const BASE_URL: &str = "serviceFields.baseUrl";
const HOST: &str = "serviceFields.host";
const URL: &str = "serviceFields.url";

const OPEN_AI_FIELDS: &[FieldSpec] = &[
    secret("openai_api_key", API_KEY),
    text("openai_model", MODEL, Some("gpt-4o-mini")),
    text("openai_base_url", BASE_URL, Some("https://api.openai.com/v1")),
];

const AZURE_OPEN_AI_FIELDS: &[FieldSpec] = &[
    secret("azure_openai_api_key", API_KEY),
    text("azure_openai_base_url", BASE_URL, None),
    text("azure_openai_model", MODEL, Some("gpt-4o-mini")),
    text(
        "azure_openai_api_version",
        "serviceFields.apiVersion",
        Some("2024-06-01"),
    ),
];

const DEEP_SEEK_FIELDS: &[FieldSpec] = &[
    secret("deepseek_api_key", API_KEY),
    text("deepseek_model", MODEL, Some("deepseek-chat")),
];

const OLLAMA_FIELDS: &[FieldSpec] = &[
    text("ollama_host", HOST, Some("http://localhost:11434")),
    text("ollama_model", MODEL, Some("gemma2")),
];

const XINFERENCE_FIELDS: &[FieldSpec] = &[
    text("xinference_host", HOST, None),
    text("xinference_model", MODEL, Some("gemma-2-it")),
];

const MODEL_SCOPE_FIELDS: &[FieldSpec] = &[
    secret("modelscope_api_key", API_KEY),
    text("modelscope_model", MODEL, Some("Qwen/Qwen2.5-32B-Instruct")),
];

const ZHIPU_FIELDS: &[FieldSpec] = &[
    secret("zhipu_api_key", API_KEY),
    text("zhipu_model", MODEL, Some("glm-4-flash")),
];

const SILICON_FLOW_FIELDS: &[FieldSpec] = &[
    secret("siliconflow_api_key", API_KEY),
    text("siliconflow_model", MODEL, Some("Qwen/Qwen2.5-7B-Instruct")),
    text(
        "siliconflow_base_url",
        BASE_URL,
        Some("https://api.siliconflow.cn/v1"),
    ),
];

const TENCENT_MECHINE_TRANSLATION_FIELDS: &[FieldSpec] = &[
    secret("tencentcloud_secret_id", "serviceFields.secretId"),
    secret("tencentcloud_secret_key", "serviceFields.secretKey"),
];

const GEMINI_FIELDS: &[FieldSpec] = &[
    secret("gemini_api_key", API_KEY),
    text("gemini_model", MODEL, Some("gemini-1.5-flash")),
];

const AZURE_FIELDS: &[FieldSpec] = &[
    secret("azure_api_key", API_KEY),
    text(
        "azure_endpoint",
        "serviceFields.endpoint",
        Some("https://api.translator.azure.cn"),
    ),
];

const ANYTHING_LLM_FIELDS: &[FieldSpec] = &[
    secret("anythingllm_apikey", API_KEY),
    text("anythingllm_url", URL, None),
];

const DIFY_FIELDS: &[FieldSpec] = &[secret("dify_apikey", API_KEY), text("dify_url", URL, None)];

const GROK_FIELDS: &[FieldSpec] = &[
    secret("grok_api_key", API_KEY),
    text("grok_model", MODEL, Some("grok-2-1212")),
];

const GROQ_FIELDS: &[FieldSpec] = &[
    secret("groq_api_key", API_KEY),
    text("groq_model", MODEL, Some("llama-3-3-70b-versatile")),
];

const QWEN_MT_FIELDS: &[FieldSpec] = &[
    secret("qwenmt_api_key", API_KEY),
    text("qwenmt_model", MODEL, Some("qwen-mt-plus")),
    text(
        "qwenmt_base_url",
        BASE_URL,
        Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
    ),
];

const OPEN_AI_COMPATIBLE_FIELDS: &[FieldSpec] = &[
    secret("openai_compatible_api_key", API_KEY),
    text(
        "openai_compatible_base_url",
        BASE_URL,
        Some("https://api.openai.com/v1"),
    ),
    text("openai_compatible_model", MODEL, Some("gpt-4o-mini")),
];

const ALIYUN_DASH_SCOPE_FIELDS: &[FieldSpec] = &[
    secret("aliyun_dashscope_api_key", API_KEY),
    text("aliyun_dashscope_model", MODEL, Some("qwen-plus-latest")),
    text(
        "aliyun_dashscope_base_url",
        BASE_URL,
        Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
    ),
];

const DEEP_L_FIELDS: &[FieldSpec] = &[secret("deepl_auth_key", "serviceFields.authKey")];

const CLAUDE_CODE_FIELDS: &[FieldSpec] = &[
    text("claude_code_path", "serviceFields.cliPath", Some("claude")),
    text("claude_code_model", MODEL, Some("sonnet")),
];

const SILICON_FLOW_FREE_FIELDS: &[FieldSpec] = &[];

/// Translation provider accepted by the backend's `service` field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    /// OpenAI chat models
    OpenAI,
    /// Azure-hosted OpenAI deployment
    AzureOpenAI,
    /// DeepSeek
    DeepSeek,
    /// Local Ollama server
    Ollama,
    /// Xinference server
    Xinference,
    /// ModelScope
    ModelScope,
    /// Zhipu GLM
    Zhipu,
    /// SiliconFlow
    SiliconFlow,
    /// Tencent Cloud machine translation (the backend's spelling)
    TencentMechineTranslation,
    /// Google Gemini
    Gemini,
    /// Azure Translator
    Azure,
    /// AnythingLLM workspace
    AnythingLLM,
    /// Dify workflow
    Dify,
    /// xAI Grok
    Grok,
    /// Groq
    Groq,
    /// Qwen-MT
    QwenMt,
    /// Any OpenAI-compatible endpoint
    OpenAICompatible,
    /// Aliyun DashScope
    AliyunDashScope,
    /// DeepL
    DeepL,
    /// Claude Code CLI
    ClaudeCode,
    /// SiliconFlow free tier; needs no settings
    SiliconFlowFree,
}

impl Service {
    /// Every provider, in catalog order
    pub fn all() -> &'static [Service] {
        use Service::*;
        &[
            OpenAI,
            AzureOpenAI,
            DeepSeek,
            Ollama,
            Xinference,
            ModelScope,
            Zhipu,
            SiliconFlow,
            TencentMechineTranslation,
            Gemini,
            Azure,
            AnythingLLM,
            Dify,
            Grok,
            Groq,
            QwenMt,
            OpenAICompatible,
            AliyunDashScope,
            DeepL,
            ClaudeCode,
            SiliconFlowFree,
        ]
    }

    /// Name the backend expects in the `service` field
    pub fn name(&self) -> &'static str {
        match self {
            Service::OpenAI => "OpenAI",
            Service::AzureOpenAI => "AzureOpenAI",
            Service::DeepSeek => "DeepSeek",
            Service::Ollama => "Ollama",
            Service::Xinference => "Xinference",
            Service::ModelScope => "ModelScope",
            Service::Zhipu => "Zhipu",
            Service::SiliconFlow => "SiliconFlow",
            Service::TencentMechineTranslation => "TencentMechineTranslation",
            Service::Gemini => "Gemini",
            Service::Azure => "Azure",
            Service::AnythingLLM => "AnythingLLM",
            Service::Dify => "Dify",
            Service::Grok => "Grok",
            Service::Groq => "Groq",
            Service::QwenMt => "QwenMt",
            Service::OpenAICompatible => "OpenAICompatible",
            Service::AliyunDashScope => "AliyunDashScope",
            Service::DeepL => "DeepL",
            Service::ClaudeCode => "ClaudeCode",
            Service::SiliconFlowFree => "SiliconFlowFree",
        }
    }

    /// Form fields this provider takes
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Service::OpenAI => OPEN_AI_FIELDS,
            Service::AzureOpenAI => AZURE_OPEN_AI_FIELDS,
            Service::DeepSeek => DEEP_SEEK_FIELDS,
            Service::Ollama => OLLAMA_FIELDS,
            Service::Xinference => XINFERENCE_FIELDS,
            Service::ModelScope => MODEL_SCOPE_FIELDS,
            Service::Zhipu => ZHIPU_FIELDS,
            Service::SiliconFlow => SILICON_FLOW_FIELDS,
            Service::TencentMechineTranslation => TENCENT_MECHINE_TRANSLATION_FIELDS,
            Service::Gemini => GEMINI_FIELDS,
            Service::Azure => AZURE_FIELDS,
            Service::AnythingLLM => ANYTHING_LLM_FIELDS,
            Service::Dify => DIFY_FIELDS,
            Service::Grok => GROK_FIELDS,
            Service::Groq => GROQ_FIELDS,
            Service::QwenMt => QWEN_MT_FIELDS,
            Service::OpenAICompatible => OPEN_AI_COMPATIBLE_FIELDS,
            Service::AliyunDashScope => ALIYUN_DASH_SCOPE_FIELDS,
            Service::DeepL => DEEP_L_FIELDS,
            Service::ClaudeCode => CLAUDE_CODE_FIELDS,
            Service::SiliconFlowFree => SILICON_FLOW_FREE_FIELDS,
        }
    }

    /// Look up one of this provider's fields by name
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Service::all()
            .iter()
            .copied()
            .find(|service| service.name() == s)
            .ok_or_else(|| Error::UnknownService(s.to_string()))
    }
}

/// A provider choice with its settings and the language pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelection {
    /// Chosen provider
    pub service: Service,
    /// Source language code
    pub lang_from: String,
    /// Target language code
    pub lang_to: String,
    /// Provider field values keyed by field name
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl ServiceSelection {
    /// Selection with no provider settings yet
    pub fn new(service: Service, lang_from: impl Into<String>, lang_to: impl Into<String>) -> Self {
        Self {
            service,
            lang_from: lang_from.into(),
            lang_to: lang_to.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a provider field
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    /// Form fields for the translate request
    ///
    /// Empty values are left out, as the backend treats a missing field as
    /// "use the default".
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a setting is not one of the provider's
    /// fields.
    pub fn to_params(&self) -> Result<TranslateParams> {
        let mut params = TranslateParams::new()
            .with("service", self.service.name())
            .with("lang_from", self.lang_from.as_str())
            .with("lang_to", self.lang_to.as_str());

        for (name, value) in &self.settings {
            if self.service.field(name).is_none() {
                return Err(Error::Config {
                    message: format!("'{}' is not a setting of service {}", name, self.service),
                    key: Some(name.clone()),
                });
            }
            if !value.is_empty() {
                params.insert(name.as_str(), value.as_str());
            }
        }

        Ok(params)
    }
}
