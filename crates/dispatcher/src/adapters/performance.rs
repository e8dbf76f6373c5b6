use async_trait::async_trait;
use wm_domain::error::Result;

use crate::traits::{PerformanceAnalyzer, PerformanceScore};

/// Real performance scoring (Lighthouse or an equivalent) is out of scope.
/// Returns a fixed neutral score pair with no issues so the performance
/// phase, and the report section it feeds, stay exercisable end-to-end.
/// Swap in a real `PerformanceAnalyzer` backed by a Lighthouse runner or
/// PageSpeed Insights client for production use.
#[derive(Default)]
pub struct NullPerformanceAnalyzer;

const NEUTRAL_SCORE: f64 = 75.0;

#[async_trait]
impl PerformanceAnalyzer for NullPerformanceAnalyzer {
    async fn analyze(&self, _url: &str) -> Result<PerformanceScore> {
        Ok(PerformanceScore {
            mobile_score: NEUTRAL_SCORE,
            desktop_score: NEUTRAL_SCORE,
            issues: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_neutral_score() {
        let score = NullPerformanceAnalyzer.analyze("https://example.com").await.unwrap();
        assert_eq!(score.mobile_score, NEUTRAL_SCORE);
        assert_eq!(score.desktop_score, NEUTRAL_SCORE);
        assert!(score.issues.is_empty());
    }
}
