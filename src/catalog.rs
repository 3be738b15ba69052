// src/catalog.rs
//
// Survey Catalog: survey CRUD plus the counter maintenance and the grouped
// queries the overview report is built from.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    build_questions, page_offset, Category, CreateSurveyRequest, Survey, UpdateSurveyRequest,
};

#[derive(Debug, Default)]
pub struct SurveyFilter {
    pub category: Option<Category>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: Category,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopSurvey {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub response_count: i64,
}

pub async fn create(pool: &PgPool, req: CreateSurveyRequest) -> Result<Survey, sqlx::Error> {
    let questions = build_questions(req.questions);
    sqlx::query_as::<_, Survey>(
        r#"
        INSERT INTO surveys (id, title, description, category, questions, tags, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(req.category)
    .bind(Json(questions))
    .bind(req.tags)
    .bind(req.is_active)
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Paginated listing, newest first, with the total matching count.
pub async fn list(
    pool: &PgPool,
    filter: &SurveyFilter,
    page: u32,
    limit: u32,
) -> Result<(Vec<Survey>, i64), sqlx::Error> {
    let mut query = QueryBuilder::new("SELECT * FROM surveys");
    push_filters(&mut query, filter);
    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(limit as i64);
    query.push(" OFFSET ");
    query.push_bind(page_offset(page, limit));
    let surveys = query.build_query_as::<Survey>().fetch_all(pool).await?;

    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM surveys");
    push_filters(&mut count_query, filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    Ok((surveys, total))
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &SurveyFilter) {
    let mut separator = " WHERE ";
    if let Some(category) = filter.category {
        query.push(separator).push("category = ").push_bind(category);
        separator = " AND ";
    }
    if let Some(is_active) = filter.is_active {
        query.push(separator).push("is_active = ").push_bind(is_active);
        separator = " AND ";
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query
            .push(separator)
            .push("(title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Partial update; replacing the question list re-assigns ids and order the
/// same way creation does.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: UpdateSurveyRequest,
) -> Result<Option<Survey>, sqlx::Error> {
    let questions = req.questions.map(build_questions).map(Json);
    sqlx::query_as::<_, Survey>(
        r#"
        UPDATE surveys SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            questions = COALESCE($5, questions),
            tags = COALESCE($6, tags),
            is_active = COALESCE($7, is_active),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.title.map(|t| t.trim().to_string()))
    .bind(req.description.map(|d| d.trim().to_string()))
    .bind(req.category)
    .bind(questions)
    .bind(req.tags)
    .bind(req.is_active)
    .fetch_optional(pool)
    .await
}

/// Deletes the survey and every response referencing it in one transaction,
/// so no orphan responses survive.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM responses WHERE survey_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM surveys WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(deleted.rows_affected() > 0)
}

/// Recomputes response_count from the response store. The incremental
/// counter is a cache; this is its ground truth.
pub async fn reconcile_response_count(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        UPDATE surveys
        SET response_count = (SELECT COUNT(*) FROM responses WHERE survey_id = surveys.id)
        WHERE id = $1
        RETURNING response_count
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM surveys")
        .fetch_one(pool)
        .await
}

pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM surveys WHERE is_active")
        .fetch_one(pool)
        .await
}

/// Survey counts grouped by category, most populated first.
pub async fn counts_by_category(pool: &PgPool) -> Result<Vec<CategoryCount>, sqlx::Error> {
    sqlx::query_as::<_, CategoryCount>(
        "SELECT category, COUNT(*) AS count FROM surveys GROUP BY category ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await
}

/// The leaderboard: top surveys by cached response count.
pub async fn top_by_responses(pool: &PgPool, limit: i64) -> Result<Vec<TopSurvey>, sqlx::Error> {
    sqlx::query_as::<_, TopSurvey>(
        r#"
        SELECT id, title, category, response_count
        FROM surveys
        ORDER BY response_count DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, AnswerValue, NewQuestion, QuestionType, SubmitResponseRequest};
    use crate::responses::{self, ResponseFilter};
    use sqlx::PgPool;

    fn survey_request() -> CreateSurveyRequest {
        CreateSurveyRequest {
            title: "Team lunch".into(),
            description: "Weekly lunch preferences".into(),
            category: Category::Other,
            questions: vec![NewQuestion {
                question_type: QuestionType::Text,
                question: "Any comments?".into(),
                options: vec![],
                required: false,
            }],
            tags: vec![],
            is_active: true,
        }
    }

    fn submission(survey: &Survey, value: &str) -> SubmitResponseRequest {
        let question = &survey.questions[0];
        SubmitResponseRequest {
            survey_id: survey.id,
            answers: vec![Answer {
                question_id: question.id.clone(),
                value: AnswerValue::Text(value.into()),
                question_type: question.question_type,
            }],
            completion_time: None,
            is_complete: true,
        }
    }

    #[sqlx::test]
    async fn deleting_a_survey_removes_its_responses(pool: PgPool) {
        let survey = create(&pool, survey_request()).await.unwrap();
        for _ in 0..2 {
            responses::insert(&pool, submission(&survey, "fine"), None, None)
                .await
                .unwrap();
        }

        assert!(delete(&pool, survey.id).await.unwrap());

        let remaining = responses::count(
            &pool,
            &ResponseFilter {
                survey_id: Some(survey.id),
                since: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(remaining, 0);
        assert!(get(&pool, survey.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn response_count_cache_matches_reconciled_ground_truth(pool: PgPool) {
        let survey = create(&pool, survey_request()).await.unwrap();
        for _ in 0..3 {
            responses::insert(&pool, submission(&survey, "ok"), None, None)
                .await
                .unwrap();
        }

        let cached = get(&pool, survey.id).await.unwrap().unwrap().response_count;
        assert_eq!(cached, 3);

        let reconciled = reconcile_response_count(&pool, survey.id).await.unwrap();
        assert_eq!(reconciled, Some(3));
    }
}
