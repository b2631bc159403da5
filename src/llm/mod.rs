//! Optional LLM collaborator
//!
//! Talks to any OpenAI-compatible chat-completions endpoint (`OpenRouter` by
//! default). The collaborator is never authoritative:
//! - Classification is consulted only for messages no keyword rule matched
//! - Polishing rewrites an answer that was already computed
//! - Every failure falls back to the deterministic result
//!
//! Disabled when no API key is configured.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::company::CompanyId;
use crate::error::{AppError, Result};
use crate::router::{Domain, Operation};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct:free";

const CLASSIFY_TEMPERATURE: f32 = 0.1;
const CLASSIFY_MAX_TOKENS: u32 = 500;
const POLISH_TEMPERATURE: f32 = 0.7;
const POLISH_MAX_TOKENS: u32 = 800;

/// Collaborator settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Bearer token; the collaborator is off without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the model to classify messages no keyword matched
    #[serde(default)]
    pub classify: bool,

    /// Ask the model to rewrite data answers conversationally
    #[serde(default)]
    pub polish: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            classify: false,
            polish: false,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("classify", &self.classify)
            .field("polish", &self.polish)
            .finish()
    }
}

/// Intent category reported by a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentLabel {
    Sales,
    Inventory,
    Cashflow,
    #[serde(other)]
    General,
}

impl IntentLabel {
    /// Domain to route to; `None` for general chatter
    #[must_use]
    pub const fn domain(&self) -> Option<Domain> {
        match self {
            Self::Sales => Some(Domain::Sales),
            Self::Inventory => Some(Domain::Inventory),
            Self::Cashflow => Some(Domain::Cashflow),
            Self::General => None,
        }
    }
}

/// Structured classification reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: IntentLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, rename = "suggested_agent_method")]
    pub suggested_operation: Option<String>,
}

impl Classification {
    /// Operation to run, honoring the suggestion only when it belongs to the domain
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        let domain = self.intent.domain()?;
        Some(match self.suggested_operation.as_deref() {
            Some(name) => Operation::in_domain(domain, name),
            None => domain.default_operation(),
        })
    }
}

/// Keyword classification used whenever the model cannot answer
#[must_use]
pub fn fallback_classification(message: &str) -> Classification {
    let lowered = message.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    let (intent, reasoning) = if has_any(&["sales", "revenue", "order", "invoice", "sell"]) {
        (IntentLabel::Sales, "Detected sales-related keywords")
    } else if has_any(&["inventory", "stock", "warehouse", "quantity"]) {
        (IntentLabel::Inventory, "Detected inventory-related keywords")
    } else if has_any(&["cash", "flow", "payment", "voucher", "financial"]) {
        (IntentLabel::Cashflow, "Detected cash flow related keywords")
    } else {
        (IntentLabel::General, "Could not determine specific intent")
    };

    let confidence = if intent == IntentLabel::General { 0.5 } else { 0.8 };

    Classification {
        intent,
        confidence,
        reasoning: reasoning.to_string(),
        suggested_operation: intent.domain().map(|d| d.default_operation().name().to_string()),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Build a client, or `Ok(None)` when no API key is configured
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Self::new(config.clone()).map(Some),
            _ => Ok(None),
        }
    }

    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut http_request = self.client.post(self.api_url("chat/completions")).json(&request);
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| AppError::llm(format!("Failed to send request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::llm(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(AppError::llm(format!("API returned {status}: {}", truncate(&body, 200))));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::llm(format!("Failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::llm("API returned no choices"))?;

        debug!(model = %self.config.model, chars = content.len(), "received completion");
        Ok(content)
    }

    /// Ask the model which domain a message belongs to
    pub async fn classify_intent(
        &self,
        message: &str,
        company: CompanyId,
    ) -> Result<Classification> {
        let system = classification_prompt(company);
        let content = self
            .complete(&system, message, CLASSIFY_TEMPERATURE, CLASSIFY_MAX_TOKENS, true)
            .await?;
        parse_classification(&content)
    }

    /// Model classification, or the keyword fallback on any failure
    pub async fn classify_or_fallback(&self, message: &str, company: CompanyId) -> Classification {
        match self.classify_intent(message, company).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "intent classification failed, using keyword fallback");
                fallback_classification(message)
            }
        }
    }

    /// Rewrite a computed answer conversationally
    pub async fn polish(&self, question: &str, data: &str, company: CompanyId) -> Result<String> {
        let system = format!(
            "You are a helpful ERP assistant for company {company}.\n\
             The user asked: \"{question}\"\n\n\
             You have retrieved the following data:\n{data}\n\n\
             Provide a helpful, natural response that directly answers the question, \
             presents the data clearly and highlights key insights. \
             Use only the numbers above. Keep it concise."
        );
        self.complete(&system, question, POLISH_TEMPERATURE, POLISH_MAX_TOKENS, false).await
    }
}

fn classification_prompt(company: CompanyId) -> String {
    let methods: Vec<String> = Domain::ALL
        .iter()
        .map(|domain| {
            let names: Vec<&str> = Operation::ALL
                .iter()
                .filter(|op| op.domain() == *domain)
                .map(Operation::name)
                .collect();
            format!("- {domain}: {}", names.join(", "))
        })
        .collect();
    format!(
        "You are an intelligent ERP assistant for a multi-company system.\n\
         Current company context: {company}\n\n\
         Classify the user's query into one intent: sales, inventory, cashflow, or general.\n\
         - SALES: revenue reports, orders, invoices, sales performance, forecasting\n\
         - INVENTORY: stock levels, warehouse data, risk assessment, stockout predictions\n\
         - CASHFLOW: payments, vouchers, liquidity, cash positions\n\n\
         Known methods by intent:\n{}\n\n\
         Respond in JSON with keys \"intent\", \"confidence\" (0.0-1.0), \"reasoning\" \
         and \"suggested_agent_method\".",
        methods.join("\n")
    )
}

/// Parse a classification, tolerating a fenced code block around the JSON
fn parse_classification(content: &str) -> Result<Classification> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(json)
        .map_err(|e| AppError::llm(format!("Unparseable classification: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disabled_without_key() {
        assert!(LlmClient::from_config(&LlmConfig::default()).unwrap().is_none());

        let blank = LlmConfig {
            api_key: Some("  ".to_string()),
            ..LlmConfig::default()
        };
        assert!(LlmClient::from_config(&blank).unwrap().is_none());

        let keyed = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        assert!(LlmClient::from_config(&keyed).unwrap().is_some());
    }

    #[test]
    fn test_api_url_joins_cleanly() {
        let config = LlmConfig {
            api_key: Some("k".to_string()),
            base_url: "http://localhost:11434/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(config).unwrap();
        assert_eq!(
            client.api_url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LlmConfig {
            api_key: Some("sk-secret".to_string()),
            ..LlmConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn test_fallback_classification() {
        assert_eq!(fallback_classification("monthly revenue").intent, IntentLabel::Sales);
        assert_eq!(fallback_classification("warehouse levels").intent, IntentLabel::Inventory);
        assert_eq!(fallback_classification("liquidity and cash").intent, IntentLabel::Cashflow);

        let general = fallback_classification("hello there");
        assert_eq!(general.intent, IntentLabel::General);
        assert_eq!(general.confidence, 0.5);
        assert_eq!(general.operation(), None);
    }

    #[test]
    fn test_parse_classification() {
        let reply = serde_json::json!({
            "intent": "inventory",
            "confidence": 0.9,
            "reasoning": "stock",
            "suggested_agent_method": "get_low_stock_items",
            "response_template": "x"
        });
        let parsed = parse_classification(&reply.to_string()).unwrap();
        assert_eq!(parsed.intent, IntentLabel::Inventory);
        assert_eq!(parsed.operation(), Some(Operation::LowStockItems));
    }

    #[test]
    fn test_parse_classification_in_code_fence() {
        let parsed =
            parse_classification("```json\n{\"intent\":\"cashflow\"}\n```").unwrap();
        assert_eq!(parsed.intent, IntentLabel::Cashflow);
        assert_eq!(parsed.operation(), Some(Operation::CashflowSummary));
    }

    #[test]
    fn test_unknown_intent_is_general() {
        let parsed = parse_classification(r#"{"intent":"payroll"}"#).unwrap();
        assert_eq!(parsed.intent, IntentLabel::General);
    }

    #[test]
    fn test_suggestion_outside_domain_ignored() {
        let parsed = parse_classification(
            r#"{"intent":"sales","suggested_agent_method":"get_inventory_risk"}"#,
        )
        .unwrap();
        assert_eq!(parsed.operation(), Some(Operation::SalesSummary));
    }

    #[test]
    fn test_prompt_groups_methods_by_domain() {
        let prompt = classification_prompt(CompanyId::new(922).unwrap());

        assert!(prompt.contains("Current company context: 922"));
        assert!(prompt.contains("- cashflow: get_cashflow_summary, get_transaction_breakdown\n"));
        assert!(prompt.contains("- inventory: get_inventory_summary, get_inventory_risk,"));
    }

    #[test]
    fn test_garbage_is_llm_error() {
        let err = parse_classification("I think it's about sales").unwrap_err();
        assert_eq!(err.error_code(), "LLM_ERROR");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let config = LlmConfig {
            api_key: Some("k".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(config).unwrap();
        let company = CompanyId::new(922).unwrap();

        let classification = client.classify_or_fallback("stock levels", company).await;
        assert_eq!(classification.intent, IntentLabel::Inventory);
    }
}
