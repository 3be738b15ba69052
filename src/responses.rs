// src/responses.rs
//
// Response Store: submissions are written once and never mutated afterwards.
// Inserting a response and bumping the owning survey's response_count happen
// in the same transaction, with the increment done in SQL so concurrent
// submissions never lose an update.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{page_offset, SubmitResponseRequest, SurveyResponse};

#[derive(Debug, Default)]
pub struct ResponseFilter {
    pub survey_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
}

/// Inserts a submission. The owning survey must exist and be active; the
/// check locks the survey row inside the insert transaction, so a delete
/// landing concurrently cannot slip in between the check and the write.
pub async fn insert(
    pool: &PgPool,
    req: SubmitResponseRequest,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<SurveyResponse, ApiError> {
    let mut tx = pool.begin().await?;

    let is_active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM surveys WHERE id = $1 FOR UPDATE")
            .bind(req.survey_id)
            .fetch_optional(&mut *tx)
            .await?;
    match is_active {
        None => return Err(ApiError::NotFound("survey")),
        Some(false) => return Err(ApiError::Validation("survey is not active".into())),
        Some(true) => {}
    }

    let response = sqlx::query_as::<_, SurveyResponse>(
        r#"
        INSERT INTO responses
            (id, survey_id, answers, submitted_at, ip_address, user_agent, completion_time, is_complete)
        VALUES ($1, $2, $3, now(), $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.survey_id)
    .bind(Json(req.answers))
    .bind(ip_address)
    .bind(user_agent)
    .bind(req.completion_time)
    .bind(req.is_complete)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE surveys SET response_count = response_count + 1 WHERE id = $1")
        .bind(req.survey_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(response)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<SurveyResponse>, sqlx::Error> {
    sqlx::query_as::<_, SurveyResponse>("SELECT * FROM responses WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Paginated listing, newest submissions first, with the total matching count.
pub async fn find(
    pool: &PgPool,
    filter: &ResponseFilter,
    page: u32,
    limit: u32,
) -> Result<(Vec<SurveyResponse>, i64), sqlx::Error> {
    let mut query = QueryBuilder::new("SELECT * FROM responses");
    push_filters(&mut query, filter);
    query.push(" ORDER BY submitted_at DESC LIMIT ");
    query.push_bind(limit as i64);
    query.push(" OFFSET ");
    query.push_bind(page_offset(page, limit));
    let responses = query
        .build_query_as::<SurveyResponse>()
        .fetch_all(pool)
        .await?;

    let total = count(pool, filter).await?;
    Ok((responses, total))
}

pub async fn count(pool: &PgPool, filter: &ResponseFilter) -> Result<i64, sqlx::Error> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM responses");
    push_filters(&mut query, filter);
    query.build_query_scalar().fetch_one(pool).await
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ResponseFilter) {
    let mut separator = " WHERE ";
    if let Some(survey_id) = filter.survey_id {
        query.push(separator).push("survey_id = ").push_bind(survey_id);
        separator = " AND ";
    }
    if let Some(since) = filter.since {
        query.push(separator).push("submitted_at >= ").push_bind(since);
    }
}

/// Full response set for one survey, oldest first; the snapshot the
/// analytics core is computed over.
pub async fn all_for_survey(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Vec<SurveyResponse>, sqlx::Error> {
    sqlx::query_as::<_, SurveyResponse>(
        "SELECT * FROM responses WHERE survey_id = $1 ORDER BY submitted_at ASC",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

/// Submission timestamps across all surveys, optionally bounded below;
/// feeds the overview trend buckets.
pub async fn submitted_at_since(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    match since {
        Some(cutoff) => {
            sqlx::query_scalar("SELECT submitted_at FROM responses WHERE submitted_at >= $1")
                .bind(cutoff)
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query_scalar("SELECT submitted_at FROM responses")
                .fetch_all(pool)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::models::{
        Answer, AnswerValue, Category, CreateSurveyRequest, NewQuestion, QuestionType,
    };

    fn survey_request(is_active: bool) -> CreateSurveyRequest {
        CreateSurveyRequest {
            title: "Standup format".into(),
            description: "Feedback on the new standup format".into(),
            category: Category::Business,
            questions: vec![NewQuestion {
                question_type: QuestionType::Text,
                question: "Thoughts?".into(),
                options: vec![],
                required: false,
            }],
            tags: vec![],
            is_active,
        }
    }

    fn submission(survey_id: Uuid, question_id: &str) -> SubmitResponseRequest {
        SubmitResponseRequest {
            survey_id,
            answers: vec![Answer {
                question_id: question_id.into(),
                value: AnswerValue::Text("works well".into()),
                question_type: QuestionType::Text,
            }],
            completion_time: None,
            is_complete: true,
        }
    }

    #[sqlx::test]
    async fn submitting_to_a_missing_survey_is_not_found(pool: PgPool) {
        let err = insert(&pool, submission(Uuid::new_v4(), "q_0_0"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[sqlx::test]
    async fn submitting_to_an_inactive_survey_is_rejected(pool: PgPool) {
        let survey = catalog::create(&pool, survey_request(false)).await.unwrap();
        let err = insert(
            &pool,
            submission(survey.id, &survey.questions[0].id),
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // A rejected submission must leave no trace.
        let total = count(
            &pool,
            &ResponseFilter {
                survey_id: Some(survey.id),
                since: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(total, 0);
    }
}
