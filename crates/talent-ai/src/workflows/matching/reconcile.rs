use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{info, warn};

use super::batch::parse_candidate_id;
use super::domain::{
    CandidateDetail, CandidateEvaluation, CandidateRecord, RankedCandidate, RankedCandidateInfo,
};

/// Acceptance policy for parsed evaluations. Both behaviors exist across
/// pipeline variants, so the choice is configuration, not a code path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreThreshold {
    KeepAll,
    AtLeast(f64),
}

impl ScoreThreshold {
    pub fn from_config(threshold: Option<f64>) -> Self {
        match threshold {
            Some(value) => Self::AtLeast(value),
            None => Self::KeepAll,
        }
    }

    fn admits(&self, score: f64) -> bool {
        match self {
            Self::KeepAll => true,
            Self::AtLeast(min) => score >= *min,
        }
    }
}

/// One result line of the remote batch output: either an error object or
/// a response envelope whose nested message content is itself a JSON
/// string.
#[derive(Debug, Deserialize)]
struct ResultLine {
    custom_id: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    response: Option<ResultResponse>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    body: Option<ResultBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(default)]
    choices: Vec<ResultChoice>,
}

#[derive(Debug, Deserialize)]
struct ResultChoice {
    #[serde(default)]
    message: Option<ResultMessage>,
}

#[derive(Debug, Deserialize)]
struct ResultMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The evaluation JSON embedded in the message content. A missing score
/// is a data-quality signal, not a parse failure; it defaults to 0.
#[derive(Debug, Deserialize)]
struct EvaluationPayload {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses heterogeneous result lines, filters by the configured score
/// threshold, joins evaluations with candidate display fields and
/// collaborator enrichment, ranks, and truncates. A malformed line never
/// aborts the rest of the batch.
pub struct ResultReconciler {
    threshold: ScoreThreshold,
    max_results: usize,
}

impl ResultReconciler {
    pub fn new(threshold: ScoreThreshold, max_results: usize) -> Self {
        Self {
            threshold,
            max_results,
        }
    }

    pub fn reconcile(
        &self,
        raw: &str,
        candidates: &[CandidateRecord],
        vacancy_id: i64,
        details: &HashMap<i64, CandidateDetail>,
    ) -> Vec<RankedCandidate> {
        let submitted: HashSet<i64> = candidates.iter().map(|c| c.id).collect();
        let by_id: HashMap<i64, &CandidateRecord> =
            candidates.iter().map(|c| (c.id, c)).collect();

        let mut parsed = 0usize;
        let mut skipped = 0usize;
        let mut ranked: Vec<RankedCandidate> = Vec::new();

        for line in raw.lines().filter(|line| !line.trim().is_empty()) {
            let Some(evaluation) = parse_result_line(line, &submitted) else {
                skipped += 1;
                continue;
            };
            parsed += 1;

            if !self.threshold.admits(evaluation.score) {
                continue;
            }

            let record = by_id.get(&evaluation.candidate_id);
            let detail = details.get(&evaluation.candidate_id);
            ranked.push(join_evaluation(evaluation, record.copied(), detail, vacancy_id));
        }

        info!(parsed, skipped, kept = ranked.len(), "reconciled batch results");

        ranked.sort_by(|a, b| {
            b.info
                .score
                .partial_cmp(&a.info.score)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(self.max_results);
        ranked
    }
}

/// Parse one result line into an evaluation. Every rejection is logged and
/// isolated to the line.
fn parse_result_line(line: &str, submitted: &HashSet<i64>) -> Option<CandidateEvaluation> {
    let record: ResultLine = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "skipping unparseable result line");
            return None;
        }
    };

    let custom_id = match record.custom_id {
        Some(id) => id,
        None => {
            warn!("skipping result line with no custom id");
            return None;
        }
    };

    if let Some(error) = record.error {
        warn!(%custom_id, error = %error, "skipping result line carrying an error payload");
        return None;
    }

    let candidate_id = match parse_candidate_id(&custom_id) {
        Some(id) => id,
        None => {
            warn!(%custom_id, "skipping result line with foreign custom id");
            return None;
        }
    };

    if !submitted.contains(&candidate_id) {
        warn!(candidate_id, "skipping evaluation for candidate outside this batch");
        return None;
    }

    let content = record
        .response
        .and_then(|response| response.body)
        .and_then(|body| body.choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);
    let Some(content) = content else {
        warn!(%custom_id, "skipping result line with no message content");
        return None;
    };

    let payload: EvaluationPayload = match serde_json::from_str(&content) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%custom_id, error = %err, "skipping result line with unparseable evaluation");
            return None;
        }
    };

    let score = payload.score.unwrap_or(0.0);
    if !(0.0..=10.0).contains(&score) {
        warn!(candidate_id, score, "score outside the rubric range, keeping as reported");
    }

    Some(CandidateEvaluation {
        candidate_id,
        score,
        reasoning: payload.reasoning.unwrap_or_default(),
    })
}

/// Join a kept evaluation with display fields. Collaborator detail wins
/// over the original record; placeholders cover fields nobody supplied.
fn join_evaluation(
    evaluation: CandidateEvaluation,
    record: Option<&CandidateRecord>,
    detail: Option<&CandidateDetail>,
    vacancy_id: i64,
) -> RankedCandidate {
    let name = detail
        .and_then(|d| d.full_name.clone())
        .or_else(|| record.and_then(|r| r.full_name.clone()))
        .unwrap_or_else(|| "N/A".to_string());
    let url = detail
        .and_then(|d| d.profile_url.clone())
        .or_else(|| record.and_then(|r| r.profile_url.clone()))
        .unwrap_or_default();

    RankedCandidate {
        name,
        source_id: evaluation.candidate_id.to_string(),
        source_url: url,
        source_type: "linkedin".to_string(),
        vacancy_id,
        info: RankedCandidateInfo {
            score: evaluation.score,
            reasoning: evaluation.reasoning,
        },
    }
}
