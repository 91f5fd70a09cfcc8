use crate::session::{
    Choice,
    ChoiceRecord,
    DexId,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    fmt,
};

/// Append-style sink for per-user ratings. Eventually consistent: writes are
/// never read back to confirm, and the local session stays authoritative.
#[derive(Clone)]
pub struct ScorebookClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreData {
    pub choices: HashMap<DexId, Choice>,
    pub smash_count: u32,
    pub pass_count: u32,
}

impl ScoreData {
    pub fn highest_decided(&self) -> DexId {
        self.choices.keys().copied().max().unwrap_or(0)
    }
}

impl ScorebookClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for scorebook")?;
        Ok(Self { base_url, http })
    }

    pub async fn record_choice(
        &self,
        user_id: &str,
        record: &ChoiceRecord,
    ) -> Result<()> {
        let url = format!("{}/choices/{}", self.base_url, user_id);
        let res = self
            .http
            .post(url)
            .json(&ChoiceWriteDto::from(record))
            .send()
            .await
            .wrap_err("scorebook request failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "scorebook responded with {status} when recording choice for {}: {body}",
                record.id
            ));
        }
        Ok(())
    }

    pub async fn get_score(&self, user_id: &str) -> Result<Option<ScoreData>> {
        let url = format!("{}/score/{}", self.base_url, user_id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("scorebook request failed")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "scorebook responded with {status} when fetching score for {user_id}: {body}"
            ));
        }
        let dto: ScoreDto = res
            .json()
            .await
            .wrap_err("invalid scorebook score payload")?;
        Ok(Some(dto.into()))
    }
}

impl fmt::Display for ScorebookClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Serialize)]
struct ChoiceWriteDto {
    id: DexId,
    choice: Choice,
    decided_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ChoiceRecord> for ChoiceWriteDto {
    fn from(record: &ChoiceRecord) -> Self {
        ChoiceWriteDto {
            id: record.id,
            choice: record.choice,
            decided_at: record.decided_at,
        }
    }
}

// The score document keys choices by the entry's id rendered as a string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreDto {
    #[serde(default)]
    choices: HashMap<String, Choice>,
    #[serde(default)]
    smash_count: u32,
    #[serde(default)]
    pass_count: u32,
}

impl From<ScoreDto> for ScoreData {
    fn from(dto: ScoreDto) -> Self {
        let choices = dto
            .choices
            .into_iter()
            .filter_map(|(key, choice)| {
                key.parse::<DexId>().ok().map(|id| (id, choice))
            })
            .collect();
        ScoreData {
            choices,
            smash_count: dto.smash_count,
            pass_count: dto.pass_count,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn score_dto__converts_keys_into_dex_ids() {
        // given
        let json = r#"{
            "choices": { "1": "smash", "2": "pass", "garbage": "smash" },
            "smashCount": 1,
            "passCount": 1
        }"#;
        let dto: ScoreDto = serde_json::from_str(json).unwrap();

        // when
        let score: ScoreData = dto.into();

        // then
        assert_eq!(score.choices.get(&1), Some(&Choice::Smash));
        assert_eq!(score.choices.get(&2), Some(&Choice::Pass));
        assert_eq!(score.choices.len(), 2);
        assert_eq!(score.highest_decided(), 2);
    }

    #[test]
    fn score_dto__tolerates_a_sparse_document() {
        // given
        let dto: ScoreDto = serde_json::from_str("{}").unwrap();

        // when
        let score: ScoreData = dto.into();

        // then
        assert_eq!(score, ScoreData::default());
        assert_eq!(score.highest_decided(), 0);
    }
}
