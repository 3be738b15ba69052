// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::ApiError;

/// Survey category, stored as the `survey_category` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "survey_category", rename_all = "lowercase")]
pub enum Category {
    Technology,
    Entertainment,
    Business,
    Education,
    Health,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Rating,
    Checkbox,
}

/// A question inside a survey. Ids are assigned at creation time and are
/// only unique within the owning survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub questions: Json<Vec<Question>>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub response_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The value of a single answer. The wire shape is an untagged union
/// (number | string | string array); the variant a submission may use is
/// constrained by the answer's `questionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Selections(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    #[serde(rename = "answer")]
    pub value: AnswerValue,
    /// Snapshot of the question's type at submission time, so analytics
    /// never has to look up a question that was edited or removed since.
    pub question_type: QuestionType,
}

impl Answer {
    /// Checks the value shape against the declared question type. Rating
    /// answers may be text: non-numeric ratings are accepted and preserved,
    /// the aggregator decides what to do with them.
    pub fn validate(&self) -> Result<(), ApiError> {
        let shape_ok = match (self.question_type, &self.value) {
            (QuestionType::MultipleChoice | QuestionType::Text, AnswerValue::Text(_)) => true,
            (QuestionType::Rating, AnswerValue::Number(_) | AnswerValue::Text(_)) => true,
            (QuestionType::Checkbox, AnswerValue::Selections(_)) => true,
            _ => false,
        };
        if shape_ok {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "answer for question {} does not match its question type",
                self.question_id
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub answers: Json<Vec<Answer>>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<i32>,
    pub is_complete: bool,
}

// ---- request / query types ----

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl NewQuestion {
    fn validate(&self, index: usize) -> Result<(), ApiError> {
        if self.question.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "question {index} is missing its text"
            )));
        }
        if matches!(
            self.question_type,
            QuestionType::MultipleChoice | QuestionType::Checkbox
        ) && self.options.is_empty()
        {
            return Err(ApiError::Validation(format!(
                "question {index} requires at least one option"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub questions: Vec<NewQuestion>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateSurveyRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_questions(&self.questions)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSurveyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub questions: Option<Vec<NewQuestion>>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateSurveyRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(questions) = &self.questions {
            validate_questions(questions)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.trim().chars().count();
    if len == 0 || len > 200 {
        return Err(ApiError::Validation(
            "title is required and must be at most 200 characters".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    let len = description.trim().chars().count();
    if len == 0 || len > 1000 {
        return Err(ApiError::Validation(
            "description is required and must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}

fn validate_questions(questions: &[NewQuestion]) -> Result<(), ApiError> {
    if questions.is_empty() {
        return Err(ApiError::Validation(
            "at least one question is required".into(),
        ));
    }
    for (index, question) in questions.iter().enumerate() {
        question.validate(index)?;
    }
    Ok(())
}

/// Assigns question ids and display order from the input sequence.
pub fn build_questions(new: Vec<NewQuestion>) -> Vec<Question> {
    let stamp = Utc::now().timestamp_millis();
    new.into_iter()
        .enumerate()
        .map(|(index, q)| Question {
            id: format!("q_{stamp}_{index}"),
            question_type: q.question_type,
            question: q.question,
            options: q.options,
            required: q.required,
            order: index as i32,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub survey_id: Uuid,
    pub answers: Vec<Answer>,
    pub completion_time: Option<i32>,
    #[serde(default = "default_true")]
    pub is_complete: bool,
}

impl SubmitResponseRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.answers.is_empty() {
            return Err(ApiError::Validation(
                "at least one answer is required".into(),
            ));
        }
        for answer in &self.answers {
            answer.validate()?;
        }
        if matches!(self.completion_time, Some(t) if t < 0) {
            return Err(ApiError::Validation(
                "completionTime must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSurveysQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<Category>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponsesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub survey_id: Option<Uuid>,
}

/// Normalized pagination window: page >= 1, limit clamped to 1..=100.
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    (page.unwrap_or(1).max(1), limit.unwrap_or(10).clamp(1, 100))
}

/// SQL offset for a pagination window, widened before multiplying so a huge
/// caller-supplied page number cannot overflow.
pub fn page_offset(page: u32, limit: u32) -> i64 {
    (page as i64 - 1) * limit as i64
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit as i64 - 1) / limit as i64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SurveyPage {
    pub surveys: Vec<Survey>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ResponsePage {
    pub responses: Vec<SurveyResponse>,
    pub pagination: Pagination,
}
