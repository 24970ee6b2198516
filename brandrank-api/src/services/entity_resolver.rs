//! Entity resolution judge
//!
//! Escalation path for cells where fuzzy matching found nothing: a secondary
//! model is asked which candidate (if any) is the same entity as the target,
//! tolerating spelling variants and sub-brand naming. Any failure or
//! out-of-range answer resolves to "not found".

use super::LlmClient;

const JUDGE_SYSTEM_PROMPT: &str = "You are an entity resolution judge. \
You decide whether a company appears in a list of brand names, allowing for \
spelling variants, abbreviations, parent companies and sub-brand naming. \
A competitor or an unrelated brand is NOT a match. \
Reply with a single number and nothing else.";

/// Asks a judge model to locate a target among candidates
pub struct EntityResolver {
    client: LlmClient,
    model: String,
}

impl EntityResolver {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Return the 1-based position the judge picks, or `None`
    ///
    /// Blank candidates keep their slot in the numbering but are never listed
    /// or accepted.
    pub async fn resolve(&self, candidates: &[String], target: &str) -> Option<usize> {
        if candidates.iter().all(|c| c.trim().is_empty()) || target.trim().is_empty() {
            return None;
        }

        let prompt = build_prompt(candidates, target);
        match self.client.complete(&self.model, JUDGE_SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => {
                let position = parse_judgement(&reply, candidates.len())
                    .filter(|&p| !candidates[p - 1].trim().is_empty());
                tracing::debug!(
                    target = %target,
                    reply = %reply,
                    position = ?position,
                    "Entity resolution judgement"
                );
                position
            }
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "Entity resolution call failed");
                None
            }
        }
    }
}

fn build_prompt(candidates: &[String], target: &str) -> String {
    let numbered = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.trim().is_empty())
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Target company: \"{target}\"\n\nCandidates:\n{numbered}\n\n\
         Which candidate is the same entity as the target company? \
         Reply with only the candidate's number, or 0 if none of them is.",
    )
}

/// Parse the judge's reply: the first run of digits, bounded to `1..=candidate_count`
pub(crate) fn parse_judgement(reply: &str, candidate_count: usize) -> Option<usize> {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    let index: usize = digits.parse().ok()?;
    (1..=candidate_count).contains(&index).then_some(index)
}
