use serde::Serialize;

use crate::openai::{ChatRequest, Message, ResponseFormat};
use crate::workflows::matching::domain::CandidateRecord;

/// Prefix making every batch line's custom id reversible to a candidate
/// id by string parsing.
const CUSTOM_ID_PREFIX: &str = "candidate_";

/// One request-per-line record of the batch payload: the correlation id,
/// the target endpoint marker, and the model request body.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvaluationRequest {
    pub custom_id: String,
    method: &'static str,
    url: &'static str,
    pub body: ChatRequest,
}

impl BatchEvaluationRequest {
    fn new(custom_id: String, body: ChatRequest) -> Self {
        Self {
            custom_id,
            method: "POST",
            url: "/v1/chat/completions",
            body,
        }
    }
}

/// Invert the custom-id convention. `None` for ids outside it.
pub fn parse_candidate_id(custom_id: &str) -> Option<i64> {
    custom_id
        .strip_prefix(CUSTOM_ID_PREFIX)
        .and_then(|raw| raw.parse::<i64>().ok())
}

/// Renders vacancy/candidate pairs into scoring requests embedding the
/// fixed rubric. Deterministic: identical inputs yield identical output,
/// in input order, one request per candidate.
pub struct BatchRequestBuilder {
    model: String,
}

impl BatchRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn build(
        &self,
        vacancy_text: &str,
        candidates: &[CandidateRecord],
    ) -> Vec<BatchEvaluationRequest> {
        let system_prompt = rubric_prompt(vacancy_text);
        candidates
            .iter()
            .map(|candidate| {
                let body = ChatRequest {
                    model: self.model.clone(),
                    messages: vec![
                        Message::system(system_prompt.clone()),
                        Message::user(candidate_prompt(candidate)),
                    ],
                    response_format: Some(ResponseFormat::JsonObject),
                    temperature: Some(0.2),
                    max_tokens: Some(500),
                };
                BatchEvaluationRequest::new(format!("{CUSTOM_ID_PREFIX}{}", candidate.id), body)
            })
            .collect()
    }
}

/// The scoring rubric shared by every request of a batch. Scores start at
/// the ceiling and named penalties bring them down; one severe penalty is
/// enough to keep a candidate below the pass mark.
fn rubric_prompt(vacancy_text: &str) -> String {
    format!(
        "You are an expert HR assistant. You will be given a vacancy description and a \
         candidate's profile. Evaluate how well the candidate matches the vacancy.\n\n\
         Scoring rubric: start from a score of 10 and subtract penalties:\n\
         - job title mismatch: -3\n\
         - domain mismatch: -3\n\
         - missing core skills: -3\n\
         - missing a language the vacancy requires: -3\n\
         - seniority or role-level mismatch: -2\n\
         - location mismatch for a non-remote role: -2\n\
         - residency inconsistency (listed employers or schools contradict the stated location): -2\n\
         - questionable self-reported employment (e.g. 'Founder' with no concrete work shown): -2\n\
         - weak education fit: -1\n\
         If any single penalty of 3 or more points applies in full, cap the final score at 6 \
         regardless of the remaining total. Never return a score below 0.\n\n\
         Pay special attention to:\n\
         - Residency clues: check whether listed employers or schools match the location field.\n\
         - Remote flexibility: a different city for a remote role is fine, do not penalize it.\n\
         - Education details: verify the names of universities or institutions.\n\
         - Online courses: count entries like Coursera/MITx but treat them as certificates, not degrees.\n\
         - Timeline consistency: flag unusually short stints or overlapping dates in the work history.\n\
         - Self-employment vs Founder: 'self-employed' with concrete projects is valid; 'Founder' \
         without any proof is questionable.\n\
         - Concurrent roles: identify full-time overlaps longer than six months.\n\
         - Language requirement: when the vacancy requires a language, look for signals such as \
         education or employment in countries where it is spoken.\n\n\
         Respond ONLY in JSON format with keys \"score\" (float between 0 and 10) and \
         \"reasoning\" (string).\n\n\
         Vacancy Description:\n---\n{vacancy_text}\n---"
    )
}

fn candidate_prompt(candidate: &CandidateRecord) -> String {
    format!(
        "Candidate Profile (ID: {id}):\n---\n{profile}\n---\n\
         Evaluate this candidate against the vacancy description provided in the system prompt. \
         Respond ONLY in JSON format with keys \"score\" (float) and \"reasoning\" (string).",
        id = candidate.id,
        profile = candidate.profile_text,
    )
}
