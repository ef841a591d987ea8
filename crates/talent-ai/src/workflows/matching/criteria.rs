use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::domain::SearchCriteria;
use super::locations::expand_locations;
use crate::openai::{ChatRequest, Message, OpenAIClient, OpenAIError, ResponseFormat};

/// Turns free-text vacancy descriptions into structured search criteria
/// via one schema-constrained chat completion. Never fails at the
/// boundary: extraction trouble degrades to the default criteria so the
/// run searches everything instead of aborting.
pub struct CriteriaExtractor {
    client: OpenAIClient,
    model: String,
    keyword_limit: usize,
}

/// Wire shape of the structured extraction response.
#[derive(Debug, Deserialize)]
struct CriteriaExtraction {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default = "default_requires_language")]
    requires_target_language: bool,
    #[serde(default)]
    explanation: String,
}

fn default_requires_language() -> bool {
    true
}

impl CriteriaExtractor {
    pub fn new(client: OpenAIClient, model: impl Into<String>, keyword_limit: usize) -> Self {
        Self {
            client,
            model: model.into(),
            keyword_limit,
        }
    }

    /// Extract criteria for a vacancy. Infallible: any client or parse
    /// failure is logged and the default criteria come back.
    pub async fn extract(&self, vacancy_text: &str) -> SearchCriteria {
        match self.try_extract(vacancy_text).await {
            Ok(criteria) => criteria,
            Err(err) => {
                error!(error = %err, "criteria extraction failed, degrading to unfiltered search");
                SearchCriteria::default()
            }
        }
    }

    async fn try_extract(&self, vacancy_text: &str) -> Result<SearchCriteria, OpenAIError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(
                    "You are an expert keyword extractor for a recruitment AI system.",
                ),
                Message::user(self.user_prompt(vacancy_text)),
            ],
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: extraction_schema(),
            }),
            temperature: Some(0.2),
            max_tokens: None,
        };

        let content = self.client.chat_completion(&request).await?;
        let extraction: CriteriaExtraction = serde_json::from_str(&content)
            .map_err(|err| OpenAIError::Parse(format!("extraction response: {err}")))?;

        info!(
            keywords = ?extraction.keywords,
            locations = ?extraction.locations,
            explanation = %extraction.explanation,
            "extracted search criteria"
        );

        Ok(criteria_from_extraction(extraction, self.keyword_limit))
    }

    fn user_prompt(&self, vacancy_text: &str) -> String {
        format!(
            "Extract the most important keywords from the vacancy description to search for \
             candidates in a profile database. Focus on the job title, the domain, and core \
             skill terms, ranked by relevance; limit the list to a maximum of {limit} keywords \
             and avoid duplicates.\n\n\
             Also provide the list of country names for candidate search locations, written in \
             CAPITAL letters (for example UNITED STATES, GERMANY, FRANCE). When the vacancy \
             names a whole region instead of a country (for example EU, NORDICS, BALTICS, DACH, \
             BENELUX, CIS), return the region alias itself. If no country or region is \
             mentioned, return an empty list.\n\n\
             Set requires_target_language to true unless the vacancy explicitly states the \
             target language is not required.\n\n\
             Vacancy Description:\n---\n{vacancy_text}\n---",
            limit = self.keyword_limit,
        )
    }
}

/// Collapse a raw extraction into criteria: keywords deduplicated in
/// order and capped, location mentions expanded through the catalogue.
fn criteria_from_extraction(
    extraction: CriteriaExtraction,
    keyword_limit: usize,
) -> SearchCriteria {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in extraction.keywords {
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() {
            continue;
        }
        if keywords
            .iter()
            .any(|seen| seen.eq_ignore_ascii_case(&keyword))
        {
            continue;
        }
        keywords.push(keyword);
        if keywords.len() == keyword_limit {
            break;
        }
    }

    SearchCriteria {
        keywords,
        locations: expand_locations(&extraction.locations),
        requires_target_language: extraction.requires_target_language,
    }
}

fn extraction_schema() -> serde_json::Value {
    json!({
        "name": "search_criteria",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Search keywords ranked by relevance."
                },
                "locations": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Capital-letter country names or region aliases."
                },
                "requires_target_language": {
                    "type": "boolean",
                    "description": "False only when the vacancy explicitly waives the target language."
                },
                "explanation": {
                    "type": "string",
                    "description": "How the keywords and locations were derived."
                }
            },
            "required": ["keywords", "locations", "requires_target_language", "explanation"],
            "additionalProperties": false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::matching::locations::{LocationCode, Region};
    use std::collections::BTreeSet;

    fn extraction(keywords: &[&str], locations: &[&str]) -> CriteriaExtraction {
        CriteriaExtraction {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            locations: locations.iter().map(|s| s.to_string()).collect(),
            requires_target_language: true,
            explanation: String::new(),
        }
    }

    #[test]
    fn keywords_are_deduplicated_in_order_and_capped() {
        let raw = extraction(
            &["Rust", "rust", "backend", "tokio", "async", "grpc", "kafka"],
            &[],
        );
        let criteria = criteria_from_extraction(raw, 5);
        assert_eq!(
            criteria.keywords,
            vec!["Rust", "backend", "tokio", "async", "grpc"]
        );
    }

    #[test]
    fn region_token_expands_to_member_union() {
        let raw = extraction(&["rust"], &["EU"]);
        let criteria = criteria_from_extraction(raw, 5);
        let expected: BTreeSet<_> = Region::EuropeanUnion.members().iter().copied().collect();
        assert_eq!(criteria.locations, expected);
    }

    #[test]
    fn countries_and_regions_mix_without_duplicates() {
        let raw = extraction(&[], &["GERMANY", "DACH"]);
        let criteria = criteria_from_extraction(raw, 5);
        assert_eq!(criteria.locations.len(), 3);
        assert!(criteria.locations.contains(&LocationCode::Switzerland));
    }

    #[test]
    fn language_requirement_defaults_to_true() {
        let raw: CriteriaExtraction =
            serde_json::from_str(r#"{"keywords":[],"locations":[]}"#).expect("parses");
        assert!(raw.requires_target_language);
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let raw = extraction(&["  ", "python"], &[]);
        let criteria = criteria_from_extraction(raw, 5);
        assert_eq!(criteria.keywords, vec!["python"]);
    }
}
