// src/oracle/chat.rs

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::AppError;
use crate::oracle::{GradeAnswerRequest, GradeAnswerResponse, ScoringOracle};

const SYSTEM_PROMPT: &str = "あなたはAI採点アシスタントです。提供された模範解答リストと採点基準に基づいて受験者の解答を採点し、\
必ず {\"score\": <整数>, \"justification\": \"<日本語の根拠>\"} というJSONオブジェクトのみを返してください。";

/// Scoring oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionOracle {
    http: reqwest::Client,
    api_base_url: String,
    api_key: String,
    model_name: String,
}

impl ChatCompletionOracle {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.oracle_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.oracle_api_key.clone(),
            model_name: config.oracle_model_name.clone(),
        }
    }
}

/// Renders the grading instructions for one question. The rules mirror the
/// grading contract: answer order does not matter, several answers matching
/// one model answer count once, the score is an integer in [0, points], and
/// the justification must say which answers matched which model answers.
fn build_user_prompt(request: &GradeAnswerRequest) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "問題:\n{}\n", request.question_text);
    let _ = writeln!(prompt, "満点:\n{}\n", request.points);

    let _ = writeln!(prompt, "模範解答リスト (正解とみなされるべき解答):");
    for answer in &request.model_answers {
        let _ = writeln!(prompt, "- {}", answer);
    }

    if let Some(criteria) = &request.grading_criteria {
        let _ = writeln!(prompt, "\n採点基準:\n{}", criteria);
    }

    let _ = writeln!(prompt, "\n受験者の解答リスト:");
    for answer in &request.answer_texts {
        let _ = writeln!(prompt, "- {}", answer);
    }

    for (index, sub) in request.sub_questions.iter().enumerate() {
        let _ = writeln!(prompt, "\n小問{} ({}点): {}", index + 1, sub.points, sub.text);
        let _ = writeln!(prompt, "小問{}の模範解答:", index + 1);
        for answer in &sub.model_answers {
            let _ = writeln!(prompt, "- {}", answer);
        }
        if let Some(criteria) = &sub.grading_criteria {
            let _ = writeln!(prompt, "小問{}の採点基準: {}", index + 1, criteria);
        }
        let _ = writeln!(prompt, "小問{}の受験者の解答:", index + 1);
        for answer in &sub.answer_texts {
            let _ = writeln!(prompt, "- {}", answer);
        }
    }

    let _ = writeln!(
        prompt,
        "\n採点ルール:\n\
         1. 受験者の各解答が、模範解答リストのいずれかの項目と内容的に一致するかを評価してください。\n\
         2. 解答の順序は問いません。受験者の解答が模範解答のいずれかと一致すれば、それは正解と見なされます。\n\
         3. 複数の受験者の解答が、同じ一つの模範解答に一致する場合、それらは一つの正解として扱います。\n\
         4. 小問がある場合は、各小問の配点に基づいて部分点を合算してください。\n\
         5. スコアは0から満点の間の整数でなければなりません。\n\
         6. 根拠は、どの受験者の解答がどの模範解答に一致したか（あるいはしなかったか）を日本語で明確に説明する必要があります。"
    );
    prompt
}

/// Some endpoints wrap JSON replies in a Markdown code fence; strip it.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[async_trait]
impl ScoringOracle for ChatCompletionOracle {
    async fn grade_answer(
        &self,
        request: &GradeAnswerRequest,
    ) -> Result<GradeAnswerResponse, AppError> {
        let url = format!("{}/chat/completions", self.api_base_url);
        let body = json!({
            "model": self.model_name,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(request) }
            ]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Scoring oracle request failed: {}", e);
                AppError::InternalServerError(format!("Scoring oracle request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("Scoring oracle returned {}: {}", status, detail);
            return Err(AppError::InternalServerError(format!(
                "Scoring oracle returned {}",
                status
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            AppError::InternalServerError(format!("Scoring oracle reply unreadable: {}", e))
        })?;

        let content = payload["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| {
                AppError::InternalServerError("Scoring oracle reply had no content".to_string())
            })?;

        let graded: GradeAnswerResponse = serde_json::from_str(strip_code_fence(content))
            .map_err(|e| {
                tracing::warn!("Scoring oracle reply was not valid JSON: {} ({})", e, content);
                AppError::InternalServerError("Scoring oracle reply was not valid JSON".to_string())
            })?;

        Ok(graded)
    }
}
