//! Competitive moat assessment.
//!
//! The moat gate never computes durability itself. It asks a [`MoatAssessor`],
//! normally [`LlmMoatAssessor`], which frames a few financial signals for a text
//! generator and parses its JSON answer.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use sixgates_common::util::truncate_with_ellipsis;
use sixgates_common::{MoatDurability, MoatThresholds};

use crate::data::{FinancialDataProvider, ProviderError};
use crate::llm::TextGenerator;
use crate::stats::mean;

/// Relative change (oldest to newest) that counts as a margin trend.
const MARGIN_TREND_BAND: f64 = 0.05;

// ============================================================================
// Assessment Types
// ============================================================================

/// Structural source of competitive advantage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoatType {
    Brand,
    NetworkEffects,
    SwitchingCosts,
    CostAdvantages,
    EfficientScale,
    IntangibleAssets,
}

impl MoatType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::NetworkEffects => "network_effects",
            Self::SwitchingCosts => "switching_costs",
            Self::CostAdvantages => "cost_advantages",
            Self::EfficientScale => "efficient_scale",
            Self::IntangibleAssets => "intangible_assets",
        }
    }
}

impl fmt::Display for MoatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoatType {
    type Err = String;

    /// Accepts the snake_case names plus spaced or hyphenated spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "brand" => Ok(Self::Brand),
            "network_effects" | "network_effect" => Ok(Self::NetworkEffects),
            "switching_costs" | "switching_cost" => Ok(Self::SwitchingCosts),
            "cost_advantages" | "cost_advantage" => Ok(Self::CostAdvantages),
            "efficient_scale" => Ok(Self::EfficientScale),
            "intangible_assets" | "intangibles" => Ok(Self::IntangibleAssets),
            other => Err(format!("unknown moat type: {other}")),
        }
    }
}

/// How an assessment was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMethod {
    Llm,
    /// Text generation or parsing failed; durability defaults to none
    LlmFailed,
    Human,
}

impl AssessmentMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::LlmFailed => "llm_failed",
            Self::Human => "human",
        }
    }
}

/// Moat verdict for one ticker, produced once per scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoatAssessment {
    pub moat_type: Option<MoatType>,
    pub secondary_moats: Vec<MoatType>,
    pub durability: MoatDurability,
    pub evidence: Vec<String>,
    pub threats: Vec<String>,
    pub method: AssessmentMethod,
    /// 0..=1
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl MoatAssessment {
    /// Fallback used whenever the generator cannot deliver a usable answer.
    pub fn failed(message: impl fmt::Display) -> Self {
        Self {
            moat_type: None,
            secondary_moats: Vec::new(),
            durability: MoatDurability::None,
            evidence: vec![format!("Error retrieving assessment: {message}")],
            threats: Vec::new(),
            method: AssessmentMethod::LlmFailed,
            confidence: 0.0,
            reasoning: None,
        }
    }

    /// Analyst-supplied assessment with full confidence.
    pub fn human(moat_type: Option<MoatType>, durability: MoatDurability) -> Self {
        Self {
            moat_type,
            secondary_moats: Vec::new(),
            durability,
            evidence: Vec::new(),
            threats: Vec::new(),
            method: AssessmentMethod::Human,
            confidence: 1.0,
            reasoning: None,
        }
    }
}

// ============================================================================
// Assessor Trait
// ============================================================================

/// Produces a moat assessment for a ticker.
///
/// Only provider transport failures are errors. Generator failures must be
/// folded into [`MoatAssessment::failed`].
#[async_trait]
pub trait MoatAssessor: Send + Sync {
    async fn assess(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<MoatAssessment, ProviderError>;
}

/// Returns the same assessment for every ticker.
pub struct StaticMoatAssessor {
    assessment: MoatAssessment,
}

impl StaticMoatAssessor {
    pub fn new(assessment: MoatAssessment) -> Self {
        Self { assessment }
    }
}

#[async_trait]
impl MoatAssessor for StaticMoatAssessor {
    async fn assess(
        &self,
        _ticker: &str,
        _provider: &dyn FinancialDataProvider,
    ) -> Result<MoatAssessment, ProviderError> {
        Ok(self.assessment.clone())
    }
}

// ============================================================================
// LLM Assessor
// ============================================================================

/// Direction of the gross-margin series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginTrend {
    Expanding,
    Stable,
    Contracting,
}

impl MarginTrend {
    /// `margins` is most-recent-first; compares the newest value to the oldest.
    pub fn of(margins: &[f64]) -> Self {
        let (Some(&newest), Some(&oldest)) = (margins.first(), margins.last()) else {
            return Self::Stable;
        };
        if margins.len() < 2 {
            Self::Stable
        } else if newest > oldest * (1.0 + MARGIN_TREND_BAND) {
            Self::Expanding
        } else if newest < oldest * (1.0 - MARGIN_TREND_BAND) {
            Self::Contracting
        } else {
            Self::Stable
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expanding => "expanding",
            Self::Stable => "stable",
            Self::Contracting => "contracting",
        }
    }
}

/// Financial signals framed for the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct MoatContext {
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub avg_gross_margin: f64,
    pub margin_trend: MarginTrend,
    pub avg_roic: f64,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
}

const SYSTEM_PROMPT: &str = "\
You are an expert business analyst specializing in competitive advantage assessment.
Analyze the provided company data and determine:
1. Primary moat type (brand, network_effects, switching_costs, cost_advantages, efficient_scale, intangible_assets, or none)
2. Secondary moats if any
3. Durability rating (high, medium, low, none)
4. Evidence supporting the moat assessment
5. Threats that could erode the moat

Be conservative. Many companies have no durable moat.
A moat must be STRUCTURAL, not just current market position.";

/// Shape of the generator's JSON answer. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAssessment {
    primary_moat: Option<String>,
    secondary_moats: Option<Vec<String>>,
    durability: Option<String>,
    evidence: Option<Vec<String>>,
    threats: Option<Vec<String>>,
    confidence: Option<f64>,
    reasoning: Option<String>,
}

/// Moat assessor backed by a text generator.
pub struct LlmMoatAssessor {
    generator: Arc<dyn TextGenerator>,
    thresholds: MoatThresholds,
}

impl LlmMoatAssessor {
    pub fn new(generator: Arc<dyn TextGenerator>, thresholds: MoatThresholds) -> Self {
        Self {
            generator,
            thresholds,
        }
    }

    /// Gather quote, profile, key metrics and ratios for the prompt.
    pub async fn gather_context(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<MoatContext, ProviderError> {
        let years = self.thresholds.lookback_years;
        let quote = provider.quote(ticker).await?;
        let profile = provider.company_profile(ticker).await?;
        let key_metrics = provider.key_metrics(ticker, years).await?;
        let ratios = provider.ratios(ticker, years).await?;

        let margins: Vec<f64> = ratios.iter().map(|r| r.gross_profit_margin).collect();
        let roics: Vec<f64> = key_metrics
            .iter()
            .map(|m| m.return_on_invested_capital)
            .collect();

        let profile = profile.unwrap_or_default();
        let company_name = quote
            .as_ref()
            .and_then(|q| q.name.clone())
            .or(profile.company_name)
            .unwrap_or_else(|| ticker.to_string());

        Ok(MoatContext {
            company_name,
            sector: profile.sector.unwrap_or_else(|| "Unknown".to_string()),
            industry: profile.industry.unwrap_or_else(|| "Unknown".to_string()),
            avg_gross_margin: mean(&margins),
            margin_trend: MarginTrend::of(&margins),
            avg_roic: mean(&roics),
            price: quote.as_ref().and_then(|q| q.price),
            market_cap: quote.as_ref().and_then(|q| q.market_cap).or(profile.market_cap),
        })
    }

    pub fn user_prompt(ticker: &str, ctx: &MoatContext) -> String {
        let or_na = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));

        format!(
            r#"Analyze this company for competitive moat:

Company: {name} ({ticker})
Sector: {sector}
Industry: {industry}

Financial Indicators:
- Gross Margin (5yr avg): {margin:.2}%
- Gross Margin Trend: {trend}
- ROIC (5yr avg): {roic:.2}%

Current Price: {price}
Market Cap: {market_cap}

Please use your internal knowledge about the company's business model to supplement these financials.

Respond in PURE JSON format (no markdown):
{{
    "primary_moat": "string or null",
    "secondary_moats": ["array"],
    "durability": "high|medium|low|none",
    "evidence": ["array of evidence points"],
    "threats": ["array of threats"],
    "confidence": 0.0-1.0,
    "reasoning": "brief explanation"
}}"#,
            name = ctx.company_name,
            sector = ctx.sector,
            industry = ctx.industry,
            margin = ctx.avg_gross_margin * 100.0,
            trend = ctx.margin_trend.as_str(),
            roic = ctx.avg_roic * 100.0,
            price = or_na(ctx.price),
            market_cap = or_na(ctx.market_cap),
        )
    }

    /// Parse the generator's answer, tolerating Markdown code fences.
    pub fn parse_response(text: &str) -> anyhow::Result<MoatAssessment> {
        let cleaned = text.replace("```json", "").replace("```", "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            bail!("empty response");
        }

        let raw: RawAssessment =
            serde_json::from_str(cleaned).context("Failed to decode moat assessment JSON")?;

        let moat_type = raw
            .primary_moat
            .as_deref()
            .filter(|m| !matches!(m.trim().to_ascii_lowercase().as_str(), "" | "null" | "none"))
            .and_then(|m| match m.parse::<MoatType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(error = %e, "Ignoring unrecognised primary moat");
                    None
                }
            });

        let durability = match raw.durability.as_deref() {
            None => MoatDurability::None,
            Some(d) => d
                .parse::<MoatDurability>()
                .map_err(anyhow::Error::msg)
                .context("Invalid durability")?,
        };

        Ok(MoatAssessment {
            moat_type,
            secondary_moats: raw
                .secondary_moats
                .unwrap_or_default()
                .iter()
                .filter_map(|m| m.parse().ok())
                .collect(),
            durability,
            evidence: raw.evidence.unwrap_or_default(),
            threats: raw.threats.unwrap_or_default(),
            method: AssessmentMethod::Llm,
            confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            reasoning: raw.reasoning,
        })
    }
}

#[async_trait]
impl MoatAssessor for LlmMoatAssessor {
    async fn assess(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<MoatAssessment, ProviderError> {
        let ctx = self.gather_context(ticker, provider).await?;
        let user_prompt = Self::user_prompt(ticker, &ctx);

        let response = match self
            .generator
            .generate(SYSTEM_PROMPT, &user_prompt, self.thresholds.max_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(ticker = ticker, error = %e, "Moat text generation failed");
                return Ok(MoatAssessment::failed(e));
            }
        };

        match Self::parse_response(&response) {
            Ok(assessment) => {
                debug!(
                    ticker = ticker,
                    durability = %assessment.durability,
                    confidence = assessment.confidence,
                    "Moat assessed"
                );
                Ok(assessment)
            }
            Err(e) => {
                warn!(
                    ticker = ticker,
                    error = %e,
                    response = %truncate_with_ellipsis(&response, 200),
                    "Unparseable moat assessment"
                );
                Ok(MoatAssessment::failed(e))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
