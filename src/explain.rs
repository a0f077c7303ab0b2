use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CanonicalCategory, RewardEstimate};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Best-effort natural-language justification for a recommendation.
///
/// The numeric engine never depends on this: the explanation is composed
/// after scoring, is bounded by a short timeout, and degrades to a templated
/// string whenever the model is unconfigured, slow, or failing. A missing
/// explanation must never block or fail a recommendation.
pub struct ExplanationService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ExplanationService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create explanation client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.groq_base_url.clone(),
            api_key: config.groq_api_key.clone(),
            model: config.groq_model.clone(),
        })
    }

    /// Produces a justification string for the optimal card.
    ///
    /// Always returns a usable string; errors only show up in the logs.
    pub async fn explain(
        &self,
        estimate: &RewardEstimate,
        category: CanonicalCategory,
        merchant: &str,
        amount: f64,
    ) -> String {
        let Some(ref api_key) = self.api_key else {
            return template_explanation(estimate, category, amount);
        };

        match self
            .request_completion(api_key, estimate, category, merchant, amount)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Explanation model returned empty content, using template");
                template_explanation(estimate, category, amount)
            }
            Err(e) => {
                tracing::warn!("Explanation model unavailable ({}), using template", e);
                template_explanation(estimate, category, amount)
            }
        }
    }

    async fn request_completion(
        &self,
        api_key: &str,
        estimate: &RewardEstimate,
        category: CanonicalCategory,
        merchant: &str,
        amount: f64,
    ) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let prompt = format!(
            "The user is paying ${:.2} at {} ({} category). Their best card is \
             {} earning ${:.2} cash back or {:.0} points (${:.2} value). In one \
             or two sentences, explain why this card is the best choice.",
            amount,
            merchant,
            category,
            estimate.card_name,
            estimate.cash_back_value,
            estimate.points_earned,
            estimate.points_value,
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a concise financial advisor specializing in credit card rewards optimization."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.7,
            "max_tokens": 120,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Explanation request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Explanation model returned status {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse explanation response: {}", e))
        })?;

        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                AppError::ExternalApiError("Explanation response missing content".to_string())
            })?;

        Ok(content.to_string())
    }
}

/// Templated fallback used whenever the model is unavailable.
pub fn template_explanation(
    estimate: &RewardEstimate,
    category: CanonicalCategory,
    amount: f64,
) -> String {
    if amount <= 0.0 {
        return format!("Optimized for {} purchases", category);
    }

    if estimate.cash_back_value >= estimate.points_value && estimate.cash_back_value > 0.0 {
        let rate = estimate.cash_back_value / amount * 100.0;
        format!("Earn {:.1}% cash back on {} purchases", rate, category)
    } else if estimate.points_value > 0.0 {
        let per_dollar = estimate.points_earned / amount;
        format!(
            "Earn {:.1} points per $1 on {} purchases",
            per_dollar, category
        )
    } else {
        format!("Optimized for {} purchases", category)
    }
}
