use std::env;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use exam_core::model::{
    ChoiceKey, ExamOutcome, FavoriteColor, GradedDetail, MockDetail, MockQuestion, NoteEntry,
    OxAnswer, OxDetail, OxItem, QuestionId, QuestionKey, QuestionStats, SessionMode, UserId,
};

use crate::contract::{
    Explanation, FavoriteStore, FavoriteUpsert, GradingService, MockSubmission, OxSubmission,
    QuestionSource, RemoteError, StatsRow, StatsSource, VisibilityRow, VisibilityStore,
};

/// Connection settings for the exam service.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub base_url: String,
}

impl HttpConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `EXAM_API_BASE_URL`, defaulting to a local development server.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("EXAM_API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".into());
        Self { base_url }
    }
}

/// HTTP/JSON client for the exam service's collaborator endpoints.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: HttpConfig,
}

impl HttpExamApi {
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound);
        }
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct MockQuestionDto {
    id: i64,
    exam_year: i32,
    subject_code: String,
    #[serde(default)]
    subject_name: String,
    question_no_exam: u32,
    question_text: String,
    #[serde(default)]
    choices: Vec<String>,
}

impl MockQuestionDto {
    fn into_question(self) -> MockQuestion {
        MockQuestion {
            id: QuestionId::new(self.id),
            exam_year: self.exam_year,
            subject_code: self.subject_code,
            subject_name: self.subject_name,
            question_no: self.question_no_exam,
            question_text: self.question_text,
            choices: self.choices,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OxItemDto {
    id: i64,
    exam_year: i32,
    subject_code: String,
    question_no_exam: u32,
    choice_no: u32,
    choice_text: String,
    #[serde(default)]
    expected_ox: String,
    #[serde(default)]
    choice_explanation_text: String,
    #[serde(default)]
    judge_reason: String,
}

impl OxItemDto {
    fn into_item(self) -> OxItem {
        // Prefer the curated explanation; fall back to the judge reason.
        let explanation = if !self.choice_explanation_text.trim().is_empty() {
            Some(self.choice_explanation_text)
        } else if !self.judge_reason.trim().is_empty() {
            Some(self.judge_reason)
        } else {
            None
        };
        OxItem {
            id: QuestionId::new(self.id),
            exam_year: self.exam_year,
            subject_code: self.subject_code,
            question_no: self.question_no_exam,
            choice_no: self.choice_no,
            choice_text: self.choice_text,
            expected: self.expected_ox.parse().ok(),
            explanation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BankNoteDto {
    exam_year: i32,
    subject_code: String,
    #[serde(default)]
    subject_name: String,
    question_no_exam: u32,
    #[serde(default)]
    state: String,
    #[serde(default)]
    memo: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    source: String,
}

impl BankNoteDto {
    /// Rows whose state is not `favorite_<color>` are dropped.
    fn into_note(self) -> Option<NoteEntry> {
        let color: FavoriteColor = self.state.strip_prefix("favorite_")?.parse().ok()?;
        let subject_name = if self.subject_name.is_empty() {
            self.subject_code.clone()
        } else {
            self.subject_name
        };
        Some(NoteEntry {
            exam_year: self.exam_year,
            subject_code: self.subject_code,
            subject_name,
            question_no: self.question_no_exam,
            color,
            memo: self.memo,
            tags: self.tags,
            source: SessionMode::from_source_tag(&self.source),
        })
    }
}

#[derive(Debug, Serialize)]
struct FavoriteUpsertDto<'a> {
    exam_year: i32,
    subject_code: &'a str,
    question_no_exam: u32,
    color: &'a str,
    memo: &'a str,
    tags: &'a [String],
    user_id: &'a str,
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct FavoriteDeleteDto<'a> {
    exam_year: i32,
    subject_code: &'a str,
    question_no_exam: u32,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VisibilityRowDto {
    question_no_exam: u32,
    choice_no: u32,
    #[serde(default)]
    hidden: bool,
}

#[derive(Debug, Serialize)]
struct VisibilityWriteDto<'a> {
    user_id: &'a str,
    exam_year: i32,
    subject_code: &'a str,
    question_no_exam: u32,
    choice_no: u32,
    hidden: bool,
}

#[derive(Debug, Serialize)]
struct MockSubmitDto<'a> {
    exam_year: i32,
    subject_code: &'a str,
    answers: HashMap<String, String>,
    user_id: &'a str,
    started_at: Option<String>,
    duration_seconds: u64,
}

#[derive(Debug, Serialize)]
struct OxSubmitDto<'a> {
    subject_code: &'a str,
    answers: HashMap<String, String>,
    user_id: &'a str,
    started_at: Option<String>,
    duration_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct MockDetailDto {
    question_id: i64,
    exam_year: i32,
    subject_code: String,
    question_no_exam: u32,
    #[serde(default)]
    question_text: String,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    selected_answer: String,
    #[serde(default)]
    correct_answer: String,
    is_correct: bool,
    #[serde(default)]
    explanation_text: String,
}

#[derive(Debug, Deserialize)]
struct MockOutcomeDto {
    total_questions: u32,
    correct_count: u32,
    details: Vec<MockDetailDto>,
}

#[derive(Debug, Deserialize)]
struct OxDetailDto {
    id: i64,
    exam_year: i32,
    subject_code: String,
    question_no_exam: u32,
    choice_no: u32,
    #[serde(default)]
    selected_ox: String,
    #[serde(default)]
    expected_ox: String,
    is_correct: bool,
    #[serde(default)]
    choice_text: String,
    #[serde(default)]
    choice_explanation_text: String,
    #[serde(default)]
    judge_reason: String,
}

#[derive(Debug, Deserialize)]
struct OxOutcomeDto {
    total_questions: u32,
    correct_count: u32,
    details: Vec<OxDetailDto>,
}

#[derive(Debug, Deserialize)]
struct MockStatsDto {
    question_id: i64,
    #[serde(default)]
    solved_count: u32,
    #[serde(default)]
    correct_count: u32,
    #[serde(default)]
    accuracy: f64,
}

#[derive(Debug, Deserialize)]
struct OxStatsDto {
    ox_item_id: i64,
    #[serde(default)]
    solved_count: u32,
    #[serde(default)]
    correct_count: u32,
    #[serde(default)]
    accuracy: f64,
}

fn answers_payload(answers: &HashMap<QuestionId, String>) -> HashMap<String, String> {
    answers
        .iter()
        .map(|(id, value)| (id.value().to_string(), value.clone()))
        .collect()
}

fn parse_ox(value: &str) -> Option<OxAnswer> {
    value.parse().ok()
}

//
// ─── TRAIT IMPLEMENTATIONS ────────────────────────────────────────────────────
//

#[async_trait]
impl QuestionSource for HttpExamApi {
    async fn mock_questions(
        &self,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<MockQuestion>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/mock/questions"))
            .query(&[
                ("exam_year", exam_year.to_string()),
                ("subject_code", subject_code.to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<MockQuestionDto> = Self::decode(response).await?;
        debug!(count = rows.len(), exam_year, subject_code, "loaded mock set");
        Ok(rows.into_iter().map(MockQuestionDto::into_question).collect())
    }

    async fn ox_items(&self, subject_code: &str) -> Result<Vec<OxItem>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/ox/questions/v2"))
            .query(&[("subject_code", subject_code)])
            .send()
            .await?;
        let rows: Vec<OxItemDto> = Self::decode(response).await?;
        debug!(count = rows.len(), subject_code, "loaded ox pool");
        Ok(rows.into_iter().map(OxItemDto::into_item).collect())
    }

    async fn mock_explanation(&self, id: QuestionId) -> Result<Explanation, RemoteError> {
        #[derive(Deserialize)]
        struct ExplanationDto {
            #[serde(default)]
            correct_answer: String,
            #[serde(default)]
            explanation_text: String,
        }

        let response = self
            .client
            .get(self.url(&format!("/api/mock/explanation/{}", id.value())))
            .send()
            .await?;
        let dto: ExplanationDto = Self::decode(response).await?;
        Ok(Explanation {
            correct_answer: dto.correct_answer,
            explanation_text: dto.explanation_text,
        })
    }
}

#[async_trait]
impl FavoriteStore for HttpExamApi {
    async fn list_favorites(
        &self,
        user: &UserId,
        exam_year: Option<i32>,
        subject_code: Option<&str>,
    ) -> Result<Vec<NoteEntry>, RemoteError> {
        let mut query = vec![("user_id", user.as_str().to_string())];
        if let Some(year) = exam_year {
            query.push(("exam_year", year.to_string()));
        }
        if let Some(subject) = subject_code {
            query.push(("subject_code", subject.to_string()));
        }
        let response = self
            .client
            .get(self.url("/api/bank-notes"))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<BankNoteDto> = Self::decode(response).await?;
        Ok(rows.into_iter().filter_map(BankNoteDto::into_note).collect())
    }

    async fn upsert_favorite(&self, favorite: &FavoriteUpsert) -> Result<(), RemoteError> {
        let payload = FavoriteUpsertDto {
            exam_year: favorite.key.exam_year,
            subject_code: &favorite.key.subject_code,
            question_no_exam: favorite.key.question_no,
            color: favorite.color.as_str(),
            memo: &favorite.memo,
            tags: &favorite.tags,
            user_id: favorite.user.as_str(),
            source: favorite.source.as_str(),
        };
        let response = self
            .client
            .post(self.url("/api/favorites"))
            .json(&payload)
            .send()
            .await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn delete_favorite(&self, user: &UserId, key: &QuestionKey) -> Result<(), RemoteError> {
        let payload = FavoriteDeleteDto {
            exam_year: key.exam_year,
            subject_code: &key.subject_code,
            question_no_exam: key.question_no,
            user_id: user.as_str(),
        };
        let response = self
            .client
            .post(self.url("/api/favorites/delete"))
            .json(&payload)
            .send()
            .await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }
}

#[async_trait]
impl VisibilityStore for HttpExamApi {
    async fn list_visibility(
        &self,
        user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<VisibilityRow>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/choice-visibility"))
            .query(&[
                ("user_id", user.as_str().to_string()),
                ("exam_year", exam_year.to_string()),
                ("subject_code", subject_code.to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<VisibilityRowDto> = Self::decode(response).await?;
        Ok(rows
            .into_iter()
            .map(|r| VisibilityRow {
                question_no: r.question_no_exam,
                choice_no: r.choice_no,
                hidden: r.hidden,
            })
            .collect())
    }

    async fn set_visibility(
        &self,
        user: &UserId,
        key: &ChoiceKey,
        hidden: bool,
    ) -> Result<(), RemoteError> {
        let payload = VisibilityWriteDto {
            user_id: user.as_str(),
            exam_year: key.exam_year,
            subject_code: &key.subject_code,
            question_no_exam: key.question_no,
            choice_no: key.choice_no,
            hidden,
        };
        let response = self
            .client
            .post(self.url("/api/choice-visibility"))
            .json(&payload)
            .send()
            .await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }
}

#[async_trait]
impl GradingService for HttpExamApi {
    async fn submit_mock(&self, submission: &MockSubmission) -> Result<ExamOutcome, RemoteError> {
        let payload = MockSubmitDto {
            exam_year: submission.exam_year,
            subject_code: &submission.subject_code,
            answers: answers_payload(&submission.answers),
            user_id: submission.user.as_str(),
            started_at: submission.started_at.map(|t| t.to_rfc3339()),
            duration_seconds: submission.duration_seconds,
        };
        let response = self
            .client
            .post(self.url("/api/mock/submit"))
            .json(&payload)
            .send()
            .await?;
        let dto: MockOutcomeDto = Self::decode(response).await?;
        Ok(ExamOutcome {
            total_questions: dto.total_questions,
            correct_count: dto.correct_count,
            details: dto
                .details
                .into_iter()
                .map(|d| {
                    GradedDetail::Mock(MockDetail {
                        question_id: QuestionId::new(d.question_id),
                        exam_year: d.exam_year,
                        subject_code: d.subject_code,
                        question_no: d.question_no_exam,
                        question_text: d.question_text,
                        choices: d.choices,
                        selected_answer: d.selected_answer,
                        correct_answer: d.correct_answer,
                        is_correct: d.is_correct,
                        explanation_text: d.explanation_text,
                    })
                })
                .collect(),
        })
    }

    async fn submit_ox(&self, submission: &OxSubmission) -> Result<ExamOutcome, RemoteError> {
        let payload = OxSubmitDto {
            subject_code: &submission.subject_code,
            answers: answers_payload(&submission.answers),
            user_id: submission.user.as_str(),
            started_at: submission.started_at.map(|t| t.to_rfc3339()),
            duration_seconds: submission.duration_seconds,
        };
        let response = self
            .client
            .post(self.url("/api/ox/submit"))
            .json(&payload)
            .send()
            .await?;
        let dto: OxOutcomeDto = Self::decode(response).await?;
        Ok(ExamOutcome {
            total_questions: dto.total_questions,
            correct_count: dto.correct_count,
            details: dto
                .details
                .into_iter()
                .map(|d| {
                    let explanation = if !d.choice_explanation_text.trim().is_empty() {
                        Some(d.choice_explanation_text)
                    } else if !d.judge_reason.trim().is_empty() {
                        Some(d.judge_reason)
                    } else {
                        None
                    };
                    GradedDetail::Ox(OxDetail {
                        item_id: QuestionId::new(d.id),
                        exam_year: d.exam_year,
                        subject_code: d.subject_code,
                        question_no: d.question_no_exam,
                        choice_no: d.choice_no,
                        choice_text: d.choice_text,
                        selected: parse_ox(&d.selected_ox),
                        expected: parse_ox(&d.expected_ox),
                        is_correct: d.is_correct,
                        explanation,
                    })
                })
                .collect(),
        })
    }
}

#[async_trait]
impl StatsSource for HttpExamApi {
    async fn mock_stats(
        &self,
        user: &UserId,
        exam_year: i32,
        subject_code: &str,
    ) -> Result<Vec<StatsRow>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/mock/user-stats"))
            .query(&[
                ("user_id", user.as_str().to_string()),
                ("exam_year", exam_year.to_string()),
                ("subject_code", subject_code.to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<MockStatsDto> = Self::decode(response).await?;
        Ok(rows
            .into_iter()
            .map(|r| StatsRow {
                id: QuestionId::new(r.question_id),
                stats: QuestionStats::new(r.solved_count, r.correct_count, r.accuracy),
            })
            .collect())
    }

    async fn ox_stats(
        &self,
        user: &UserId,
        subject_code: &str,
    ) -> Result<Vec<StatsRow>, RemoteError> {
        let response = self
            .client
            .get(self.url("/api/ox/user-stats"))
            .query(&[
                ("user_id", user.as_str().to_string()),
                ("subject_code", subject_code.to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<OxStatsDto> = Self::decode(response).await?;
        Ok(rows
            .into_iter()
            .map(|r| StatsRow {
                id: QuestionId::new(r.ox_item_id),
                stats: QuestionStats::new(r.solved_count, r.correct_count, r.accuracy),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpExamApi::new(HttpConfig::new("http://localhost:8000/"));
        assert_eq!(
            api.url("/api/mock/questions"),
            "http://localhost:8000/api/mock/questions"
        );
    }

    #[test]
    fn bank_note_rows_without_favorite_state_are_dropped() {
        let dto = BankNoteDto {
            exam_year: 2021,
            subject_code: "TAX".into(),
            subject_name: String::new(),
            question_no_exam: 3,
            state: "wrong".into(),
            memo: String::new(),
            tags: Vec::new(),
            source: "mock".into(),
        };
        assert!(dto.into_note().is_none());

        let dto = BankNoteDto {
            exam_year: 2021,
            subject_code: "TAX".into(),
            subject_name: String::new(),
            question_no_exam: 3,
            state: "favorite_yellow".into(),
            memo: "check".into(),
            tags: vec!["favorite".into(), "yellow".into()],
            source: "OX".into(),
        };
        let note = dto.into_note().unwrap();
        assert_eq!(note.color, FavoriteColor::Yellow);
        assert_eq!(note.source, SessionMode::Ox);
        assert_eq!(note.subject_name, "TAX");
    }

    #[test]
    fn answers_payload_uses_stringified_ids() {
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(12), "O".to_string());
        let payload = answers_payload(&answers);
        assert_eq!(payload.get("12").map(String::as_str), Some("O"));
    }
}
