//! Validated ranking request input

use brandrank_common::{Error, Result};
use serde::Serialize;

/// Company + industry pair a ranking run is scoped to
///
/// Both fields are trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankQuery {
    company: String,
    industry: String,
}

impl RankQuery {
    pub fn new(company: impl AsRef<str>, industry: impl AsRef<str>) -> Result<Self> {
        let company = company.as_ref().trim();
        let industry = industry.as_ref().trim();

        if company.is_empty() || industry.is_empty() {
            return Err(Error::InvalidInput(
                "Missing company or industry".to_string(),
            ));
        }

        Ok(Self {
            company: company.to_string(),
            industry: industry.to_string(),
        })
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }
}
