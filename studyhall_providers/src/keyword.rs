use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use studyhall_core::{RetrievedPassage, Retriever, ScoreConvention};
use tracing::info;

static WORD: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b\w+\b").unwrap()
});

/// One document in the in-memory keyword knowledge base.
#[derive(Debug, Clone)]
pub struct KeywordDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub category: String,
}

/// Keyword-overlap retrieval over an in-memory knowledge base.
///
/// Stands in for a hosted search service in demo mode and tests, and
/// reports scores on the same 0-10 [`ScoreConvention::SearchRank`]
/// scale: term matches in the title weigh double, and the match ratio
/// is stretched onto 0-10.
pub struct KeywordRetriever {
    documents: Vec<KeywordDocument>,
}

impl KeywordRetriever {
    /// Empty knowledge base; populate with [`Self::add_document`].
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    /// Seeded with the sample student-handbook knowledge base.
    #[must_use]
    pub fn with_sample_handbook() -> Self {
        let documents = vec![
            KeywordDocument {
                id: "doc1".to_string(),
                title: "Admission Requirements".to_string(),
                content: "To be admitted, students need a high school diploma or equivalent, \
                          minimum GPA of 2.5, and English proficiency test scores (IELTS 6.0 or \
                          TOEFL 70). Application deadline is March 1st for fall semester."
                    .to_string(),
                source: "admissions-handbook.pdf".to_string(),
                category: "admissions".to_string(),
            },
            KeywordDocument {
                id: "doc2".to_string(),
                title: "Tuition and Fees".to_string(),
                content: "Annual tuition is $15,000 for undergraduate programs. Additional fees \
                          include registration ($500), technology ($300), and student services \
                          ($200). Financial aid and scholarships are available."
                    .to_string(),
                source: "tuition-guide.pdf".to_string(),
                category: "financial".to_string(),
            },
            KeywordDocument {
                id: "doc3".to_string(),
                title: "Course Registration".to_string(),
                content: "Course registration opens two weeks before each semester. Students can \
                          register online through the student portal. Prerequisites must be \
                          completed before enrolling in advanced courses."
                    .to_string(),
                source: "registration-manual.pdf".to_string(),
                category: "academics".to_string(),
            },
            KeywordDocument {
                id: "doc4".to_string(),
                title: "Visa Information".to_string(),
                content: "International students need an F-1 student visa. You must provide proof \
                          of acceptance, financial support documents, and complete the DS-160 \
                          form. Visa processing takes 2-4 weeks."
                    .to_string(),
                source: "visa-guide.pdf".to_string(),
                category: "international".to_string(),
            },
            KeywordDocument {
                id: "doc5".to_string(),
                title: "Housing Options".to_string(),
                content: "On-campus housing is available with meal plans. Off-campus options \
                          include apartments near campus. Housing applications open in April for \
                          the fall semester. Priority is given to first-year students."
                    .to_string(),
                source: "housing-info.pdf".to_string(),
                category: "housing".to_string(),
            },
            KeywordDocument {
                id: "doc6".to_string(),
                title: "Academic Calendar".to_string(),
                content: "Fall semester runs from September to December. Spring semester runs \
                          from January to April. Summer sessions are available in June and July. \
                          Registration deadlines are posted on the academic calendar."
                    .to_string(),
                source: "academic-calendar.pdf".to_string(),
                category: "academics".to_string(),
            },
        ];
        info!(
            "Keyword retriever initialized with {} documents",
            documents.len()
        );
        Self { documents }
    }

    /// Add a document to the knowledge base.
    pub fn add_document(&mut self, document: KeywordDocument) {
        info!("Added document to keyword knowledge base: {}", document.title);
        self.documents.push(document);
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f64,
        _language: &str,
    ) -> Vec<RetrievedPassage> {
        let query_lower = query.to_lowercase();
        let terms: HashSet<&str> = WORD
            .find_iter(&query_lower)
            .map(|m| m.as_str())
            .collect();

        let mut results: Vec<RetrievedPassage> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let content_lower = doc.content.to_lowercase();
                let title_lower = doc.title.to_lowercase();

                let content_matches = terms
                    .iter()
                    .filter(|term| content_lower.contains(**term))
                    .count();
                let title_matches = terms
                    .iter()
                    .filter(|term| title_lower.contains(**term))
                    .count()
                    * 2;

                #[allow(clippy::cast_precision_loss)]
                let ratio =
                    (content_matches + title_matches) as f64 / terms.len().max(1) as f64;
                let score = (ratio * 3.0).min(10.0);

                (score >= min_score).then(|| RetrievedPassage {
                    content: doc.content.clone(),
                    title: Some(doc.title.clone()),
                    source: doc.source.clone(),
                    score,
                    metadata: serde_json::Map::from_iter([
                        ("id".to_string(), serde_json::json!(doc.id)),
                        ("category".to_string(), serde_json::json!(doc.category)),
                    ]),
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        info!(
            "Keyword search returned {} results for query: {:.50}",
            results.len(),
            query
        );
        results
    }

    fn score_convention(&self) -> ScoreConvention {
        ScoreConvention::SearchRank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_relevant_documents() {
        let retriever = KeywordRetriever::with_sample_handbook();
        let results = retriever.search("What about housing options?", 5, 0.5, "en").await;

        assert!(!results.is_empty());
        assert_eq!(results[0].source, "housing-info.pdf");
        assert!(results[0].score > 0.5);
        assert!(results[0].score <= 10.0);
    }

    #[tokio::test]
    async fn results_sorted_descending() {
        let retriever = KeywordRetriever::with_sample_handbook();
        let results = retriever
            .search("registration for the fall semester", 5, 0.0, "en")
            .await;

        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn unrelated_query_yields_empty() {
        let retriever = KeywordRetriever::with_sample_handbook();
        let results = retriever.search("qqq zzz xxyyzz", 5, 0.5, "en").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn top_k_bounds_result_count() {
        let retriever = KeywordRetriever::with_sample_handbook();
        let results = retriever.search("semester students fall", 2, 0.0, "en").await;
        assert!(results.len() <= 2);
    }

    #[tokio::test]
    async fn empty_knowledge_base_yields_empty() {
        let retriever = KeywordRetriever::empty();
        assert!(retriever.search("housing", 5, 0.0, "en").await.is_empty());
    }

    #[tokio::test]
    async fn reports_search_rank_convention() {
        let retriever = KeywordRetriever::empty();
        assert_eq!(retriever.score_convention(), ScoreConvention::SearchRank);
    }
}
