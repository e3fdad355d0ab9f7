//! Gate 5: Narrative.
//!
//! Street expectations and news tone. Never kills; the status label is
//! informational and sits beside the sizing decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sixgates_common::NarrativeThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{AnalystEstimate, FinancialDataProvider, NewsArticle, ProviderError};

const POSITIVE_KEYWORDS: &[&str] = &[
    "upgrade", "buy", "growth", "record", "beat", "profit", "bull", "surge", "jump", "gain",
    "strong", "outperform", "hike", "positive", "rally",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "downgrade", "sell", "decline", "miss", "loss", "bear", "plunge", "drop", "fall", "weak",
    "underperform", "cut", "negative", "crash", "warn",
];

/// Per-article score bound.
const MAX_ARTICLE_SCORE: i32 = 2;

/// Tone of recent coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NarrativeStatus {
    Optimistic,
    Neutral,
    Pessimistic,
}

impl NarrativeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimistic => "OPTIMISTIC",
            Self::Neutral => "NEUTRAL",
            Self::Pessimistic => "PESSIMISTIC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeGate {
    thresholds: NarrativeThresholds,
}

impl NarrativeGate {
    pub fn new(thresholds: NarrativeThresholds) -> Self {
        Self { thresholds }
    }

    /// Keyword score of one text: +1 per positive keyword present, -1 per
    /// negative one, clamped to [-2, 2]. Substring match, case-insensitive.
    pub fn score_text(text: &str) -> i32 {
        let text = text.to_lowercase();
        let hits = |words: &[&str]| words.iter().filter(|w| text.contains(*w)).count() as i32;
        (hits(POSITIVE_KEYWORDS) - hits(NEGATIVE_KEYWORDS)).clamp(-MAX_ARTICLE_SCORE, MAX_ARTICLE_SCORE)
    }

    /// Mean article score, skipping articles with no text.
    pub fn sentiment(news: &[NewsArticle]) -> f64 {
        let scores: Vec<i32> = news
            .iter()
            .map(NewsArticle::full_text)
            .filter(|text| !text.is_empty())
            .map(|text| Self::score_text(&text))
            .collect();

        if scores.is_empty() {
            0.0
        } else {
            f64::from(scores.iter().sum::<i32>()) / scores.len() as f64
        }
    }

    pub fn status(&self, sentiment: f64) -> NarrativeStatus {
        if sentiment > self.thresholds.optimistic_above {
            NarrativeStatus::Optimistic
        } else if sentiment < self.thresholds.pessimistic_below {
            NarrativeStatus::Pessimistic
        } else {
            NarrativeStatus::Neutral
        }
    }

    pub fn evaluate(&self, estimates: &[AnalystEstimate], news: &[NewsArticle]) -> GateResult {
        let Some(latest) = estimates.first() else {
            return GateResult::advisory_insufficient(GateId::Narrative);
        };

        let sentiment = Self::sentiment(news);
        let status = self.status(sentiment);

        GateResult::advisory(
            GateId::Narrative,
            metrics([
                ("analyst_count", f64::from(latest.num_analysts_eps)),
                ("avg_eps_estimate", latest.eps_avg),
                ("sentiment_score", sentiment),
                ("news_count", news.len() as f64),
            ]),
        )
        .with_detail("status", status.as_str())
    }
}

#[async_trait]
impl Gate for NarrativeGate {
    fn id(&self) -> GateId {
        GateId::Narrative
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let estimates = provider.analyst_estimates(ticker).await?;
        if estimates.is_empty() {
            return Ok(GateResult::advisory_insufficient(self.id()));
        }

        let news = provider.stock_news(ticker, self.thresholds.max_articles).await?;
        let result = self.evaluate(&estimates, &news);
        debug!(
            ticker = ticker,
            gate = %self.id(),
            metrics = ?result.metrics,
            status = ?result.details.get("status"),
            "Gate evaluated"
        );
        Ok(result)
    }
}
