//! Fixed-template paper analysis.
//!
//! Only the executive summary is filled from article metadata. The other
//! sections are static prompts with bracketed placeholders for the reader
//! (usually the calling agent) to complete.

use crate::types::Article;
use serde::{Deserialize, Serialize};

/// Seven-section analysis scaffold for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepAnalysis {
    #[serde(rename = "Executive Summary")]
    pub executive_summary: String,
    #[serde(rename = "Research Context")]
    pub research_context: String,
    #[serde(rename = "Methodology Analysis")]
    pub methodology_analysis: String,
    #[serde(rename = "Results Evaluation")]
    pub results_evaluation: String,
    #[serde(rename = "Practical and Theoretical Implications")]
    pub implications: String,
    #[serde(rename = "Future Research Directions")]
    pub future_directions: String,
    #[serde(rename = "Broader Impacts")]
    pub broader_impacts: String,
}

/// Section names in output order.
pub const SECTION_NAMES: [&str; 7] = [
    "Executive Summary",
    "Research Context",
    "Methodology Analysis",
    "Results Evaluation",
    "Practical and Theoretical Implications",
    "Future Research Directions",
    "Broader Impacts",
];

impl DeepAnalysis {
    /// Build the analysis scaffold from an article's title, authors and abstract.
    pub fn for_article(article: &Article) -> Self {
        Self::from_parts(&article.title, &article.authors_display(), &article.abstract_text)
    }

    pub fn from_parts(title: &str, authors: &str, abstract_text: &str) -> Self {
        Self {
            executive_summary: format!(
                "This analysis examines the paper titled '{}' by {} abstract: {}. The study focuses on [brief description of main topic].",
                title, authors, abstract_text
            ),
            research_context: "The research is situated within the broader context of [field/topic]. Key background information includes [relevant prior research or gaps in knowledge].".to_string(),
            methodology_analysis: "The study employs [describe research methods], which are [evaluate appropriateness]. Potential limitations of this approach include [list limitations].".to_string(),
            results_evaluation: "The key findings of the study are [summarize main results]. The strength of these results is [evaluate statistical significance, if applicable]. Potential implications of these findings include [list implications].".to_string(),
            implications: "Practically, this research could impact [list practical applications]. Theoretically, it contributes to [describe theoretical advancements or challenges to existing theories].".to_string(),
            future_directions: "Based on this study, future research could explore [suggest follow-up studies or new research questions].".to_string(),
            broader_impacts: "The broader impacts of this research extend to [describe societal, economic, or other wide-reaching effects]. Potential ethical considerations include [list any ethical implications].".to_string(),
        }
    }

    /// Sections as `(name, body)` pairs in output order.
    pub fn sections(&self) -> [(&'static str, &str); 7] {
        [
            (SECTION_NAMES[0], self.executive_summary.as_str()),
            (SECTION_NAMES[1], self.research_context.as_str()),
            (SECTION_NAMES[2], self.methodology_analysis.as_str()),
            (SECTION_NAMES[3], self.results_evaluation.as_str()),
            (SECTION_NAMES[4], self.implications.as_str()),
            (SECTION_NAMES[5], self.future_directions.as_str()),
            (SECTION_NAMES[6], self.broader_impacts.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executive_summary_interpolates_metadata() {
        let analysis = DeepAnalysis::from_parts("T", "A", "B");
        assert_eq!(
            analysis.executive_summary,
            "This analysis examines the paper titled 'T' by A abstract: B. The study focuses on [brief description of main topic]."
        );
    }

    #[test]
    fn test_serializes_exactly_seven_sections_in_order() {
        let analysis = DeepAnalysis::from_parts("T", "A", "B");
        let value = serde_json::to_value(&analysis).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 7);
        for name in SECTION_NAMES {
            assert!(obj.contains_key(name), "missing section {name}");
        }

        let text = serde_json::to_string(&analysis).unwrap();
        let positions: Vec<usize> = SECTION_NAMES
            .iter()
            .map(|n| text.find(&format!("\"{}\"", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_for_article_joins_authors() {
        let article = Article {
            title: "Gene drives".into(),
            authors: vec!["Ann Lee".into(), "Bo Kim".into()],
            abstract_text: "We model spread.".into(),
            ..Default::default()
        };
        let analysis = DeepAnalysis::for_article(&article);
        assert!(analysis.executive_summary.contains("by Ann Lee, Bo Kim abstract"));
        assert_eq!(analysis.sections()[6].0, "Broader Impacts");
    }
}
