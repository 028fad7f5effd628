//! Keyword + context intent classification
//!
//! For every template in the catalog:
//!
//! ```text
//! keyword_score = matched keyword entries / keyword entries
//! context_score = context.relevance_score(template.category)
//! confidence    = keyword_weight * keyword_score + context_weight * context_score
//! ```
//!
//! The template with the strictly highest confidence wins; ties go to the
//! template declared first in the catalog.

use crate::command::catalog::{CommandCatalog, CommandTemplate, IntentCategory};
use crate::context::ConversationContext;
use crate::core::text::padded_words;
use std::sync::Arc;

/// Classification outcome for one turn
#[derive(Debug, Clone)]
pub struct IntentResult {
    pub category: IntentCategory,
    pub template: Option<Arc<CommandTemplate>>,
    /// Combined confidence in [0, 1]
    pub confidence: f64,
    /// Surface forms of the keywords that matched
    pub keywords: Vec<String>,
}

impl IntentResult {
    pub fn unknown() -> Self {
        Self {
            category: IntentCategory::Unknown,
            template: None,
            confidence: 0.0,
            keywords: Vec::new(),
        }
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.name.as_str())
    }
}

/// Maps an utterance to its best-matching template. Pure; no side effects.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    catalog: Arc<CommandCatalog>,
    keyword_weight: f64,
    context_weight: f64,
}

impl IntentClassifier {
    pub fn new(catalog: Arc<CommandCatalog>, keyword_weight: f64, context_weight: f64) -> Self {
        Self {
            catalog,
            keyword_weight,
            context_weight,
        }
    }

    pub fn classify(&self, utterance: &str, context: &ConversationContext) -> IntentResult {
        let text = padded_words(utterance);
        let mut best = IntentResult::unknown();

        for template in self.catalog.all() {
            if template.keywords.is_empty() {
                continue;
            }

            let matched: Vec<String> = template
                .keywords
                .iter()
                .filter_map(|entry| match_entry(&text, entry))
                .collect();

            let keyword_score = matched.len() as f64 / template.keywords.len() as f64;
            let context_score = context.relevance_score(template.category);
            let confidence =
                self.keyword_weight * keyword_score + self.context_weight * context_score;

            if confidence > best.confidence {
                best = IntentResult {
                    category: template.category,
                    template: Some(Arc::clone(template)),
                    confidence,
                    keywords: matched,
                };
            }
        }

        tracing::debug!(
            "classified {:?} as {:?} ({:?}) confidence {:.2}",
            utterance,
            best.category,
            best.template_name(),
            best.confidence
        );

        best
    }
}

/// First synonym of `entry` present as a whole word or phrase in `padded`
fn match_entry(padded: &str, entry: &str) -> Option<String> {
    entry
        .split('|')
        .map(str::trim)
        .filter(|form| !form.is_empty())
        .find(|form| padded.contains(&format!(" {} ", form.to_lowercase())))
        .map(String::from)
}
