//! Scores generated articles on SEO structure and factual verifiability and
//! turns the scores into a publication recommendation.

use crate::{
    error::ProviderError,
    extract,
    prompts,
    providers::{GenerationRequest, TextProvider, Usage},
    text,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const MIN_TITLE_CHARS: usize = 30;
const MAX_TITLE_CHARS: usize = 70;
const MIN_WORDS: usize = 800;
const MIN_HEADINGS: usize = 3;
const MIN_META_CHARS: usize = 100;

const FACT_CHECK_CHARS: usize = 4000;
const FALLBACK_FACT_SCORE: i32 = 50;
const MAX_UNVERIFIABLE_CLAIMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Statistic,
    Quote,
    Fact,
    Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unverifiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Publish,
    Review,
    NeedsRevision,
    Reject,
}

impl Recommendation {
    pub fn passed(self) -> bool {
        match self {
            Recommendation::Publish | Recommendation::Review => true,
            Recommendation::NeedsRevision | Recommendation::Reject => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedClaim {
    pub claim: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub has_source: bool,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoReport {
    pub score: i32,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactReport {
    pub score: i32,
    pub claims: Vec<ExtractedClaim>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateResult {
    pub overall_score: i32,
    pub seo_score: i32,
    pub fact_score: i32,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub claims: Vec<ExtractedClaim>,
    pub recommendation: Recommendation,
    pub passed: bool,
}

/// Deterministic structural score, 0-100, with one issue per penalty.
pub fn score_seo(title: &str, content: &str, meta_description: Option<&str>) -> SeoReport {
    let mut score = 100;
    let mut issues = Vec::new();

    let title_chars = title.trim().chars().count();
    if title_chars < MIN_TITLE_CHARS {
        score -= 15;
        issues.push(format!(
            "Title is too short ({} characters, minimum {})",
            title_chars, MIN_TITLE_CHARS
        ));
    } else if title_chars > MAX_TITLE_CHARS {
        score -= 10;
        issues.push(format!(
            "Title is too long ({} characters, maximum {})",
            title_chars, MAX_TITLE_CHARS
        ));
    }

    let words = text::word_count(content);
    if words < MIN_WORDS {
        score -= 25;
        issues.push(format!(
            "Content is too short ({} words, minimum {})",
            words, MIN_WORDS
        ));
    }

    let headings = text::heading_count(content);
    if headings < MIN_HEADINGS {
        score -= 15;
        issues.push(format!(
            "Too few headings ({}, minimum {})",
            headings, MIN_HEADINGS
        ));
    }

    let meta_chars = meta_description.map_or(0, |m| m.trim().chars().count());
    if meta_chars < MIN_META_CHARS {
        score -= 10;
        issues.push(format!(
            "Meta description is missing or too short (minimum {} characters)",
            MIN_META_CHARS
        ));
    }

    if !text::has_list_markup(content) {
        score -= 5;
        issues.push("No bullet or numbered lists".to_string());
    }

    SeoReport {
        score: score.max(0).min(100),
        issues,
    }
}

/// First matching row wins.
pub fn recommend(overall_score: i32, issue_count: usize) -> Recommendation {
    if overall_score >= 80 && issue_count == 0 {
        Recommendation::Publish
    } else if overall_score >= 65 && issue_count <= 2 {
        Recommendation::Review
    } else if overall_score >= 50 {
        Recommendation::NeedsRevision
    } else {
        Recommendation::Reject
    }
}

/// Average of the two scores, rounded half up.
pub fn overall_score(seo_score: i32, fact_score: i32) -> i32 {
    (seo_score + fact_score + 1) / 2
}

pub fn combine(seo: SeoReport, fact: FactReport) -> QualityGateResult {
    let mut issues = seo.issues;

    let doubtful = fact
        .claims
        .iter()
        .filter(|c| matches!(c.confidence, Confidence::Low | Confidence::Unverifiable))
        .count();
    if doubtful > MAX_UNVERIFIABLE_CLAIMS {
        issues.push(format!("Too many unverifiable claims ({})", doubtful));
    }

    let warnings: Vec<String> = fact
        .claims
        .iter()
        .filter(|c| c.claim_type == ClaimType::Statistic && !c.has_source)
        .map(|c| format!("Unsourced statistic: {}", c.claim))
        .collect();

    let overall = overall_score(seo.score, fact.score);
    let recommendation = recommend(overall, issues.len());
    QualityGateResult {
        overall_score: overall,
        seo_score: seo.score,
        fact_score: fact.score,
        issues,
        warnings,
        claims: fact.claims,
        recommendation,
        passed: recommendation.passed(),
    }
}

fn parse_label<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let label = raw.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
    serde_json::from_value(Value::String(label)).ok()
}

fn parse_score(value: &Value) -> Option<i32> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }
    Some(score.round().max(0.0).min(100.0) as i32)
}

fn parse_claim(value: &Value) -> Option<ExtractedClaim> {
    let claim = value.get("claim")?.as_str()?.trim();
    if claim.is_empty() {
        return None;
    }
    let label = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or("");
    Some(ExtractedClaim {
        claim: claim.to_string(),
        claim_type: parse_label(label("type")).unwrap_or(ClaimType::Fact),
        has_source: value.get("hasSource").and_then(Value::as_bool).unwrap_or(false),
        confidence: parse_label(label("confidence")).unwrap_or(Confidence::Unverifiable),
    })
}

/// Reads the fact-check reply field by field, so one malformed claim or a
/// quoted score does not discard the rest. Only a reply with no JSON object
/// at all scores 50 with no claims.
pub fn parse_fact_report(reply: &str) -> FactReport {
    let raw = match extract::parse_first::<Value>(reply) {
        Some(raw @ Value::Object(_)) => raw,
        _ => {
            log::debug!("Fact check reply had no usable JSON, scoring {}", FALLBACK_FACT_SCORE);
            return FactReport {
                score: FALLBACK_FACT_SCORE,
                claims: Vec::new(),
            };
        }
    };

    let score = raw
        .get("accuracyScore")
        .and_then(parse_score)
        .unwrap_or(FALLBACK_FACT_SCORE);
    let claims = raw
        .get("claims")
        .and_then(Value::as_array)
        .map(|claims| claims.iter().filter_map(parse_claim).collect())
        .unwrap_or_default();
    FactReport { score, claims }
}

pub struct QualityGate {
    provider: Arc<dyn TextProvider>,
}

impl QualityGate {
    pub fn new(provider: Arc<dyn TextProvider>) -> QualityGate {
        QualityGate { provider }
    }

    /// Asks the provider to extract and rate claims in the leading part of
    /// `content`. Provider failures propagate; bad replies do not.
    pub fn check_facts(&self, content: &str) -> Result<(FactReport, Usage), ProviderError> {
        let request = GenerationRequest::new(prompts::fact_check_prompt(text::prefix_chars(
            content,
            FACT_CHECK_CHARS,
        )))
        .with_system(prompts::FACT_CHECK_SYSTEM)
        .with_temperature(0.1)
        .with_max_tokens(2000);
        let generation = self.provider.generate(&request)?;
        Ok((parse_fact_report(&generation.text), generation.usage))
    }

    pub fn evaluate(
        &self,
        title: &str,
        content: &str,
        meta_description: Option<&str>,
    ) -> Result<(QualityGateResult, Usage), ProviderError> {
        let seo = score_seo(title, content, meta_description);
        let (fact, usage) = self.check_facts(content)?;
        Ok((combine(seo, fact), usage))
    }
}
