// src/reports.rs
//
// Report composition: pulls snapshots out of the catalog and the response
// store and hands them to the pure analytics core. Nothing here mutates
// state and nothing is cached, every call recomputes from scratch.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::analytics::{self, CompletionStats, QuestionAnalytics, TrendBucket};
use crate::catalog::{self, CategoryCount, TopSurvey};
use crate::models::Category;
use crate::responses::{self, ResponseFilter};

const TREND_WINDOW_DAYS: i64 = 30;
const TOP_SURVEY_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewTotals {
    pub total_surveys: i64,
    pub active_surveys: i64,
    pub total_responses: i64,
    pub average_responses_per_survey: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub overview: OverviewTotals,
    pub surveys_by_category: Vec<CategoryCount>,
    pub response_trends: Vec<TrendBucket>,
    pub top_surveys: Vec<TopSurvey>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnalyticsReport {
    pub survey: SurveySummary,
    pub total_responses: i64,
    pub response_trends: Vec<TrendBucket>,
    pub completion_stats: Option<CompletionStats>,
    pub question_analytics: Vec<QuestionAnalytics>,
}

/// Cross-survey overview: totals, category histogram, the 30-day submission
/// trend and the response-count leaderboard.
pub async fn overview(pool: &PgPool) -> Result<OverviewReport, sqlx::Error> {
    let total_surveys = catalog::count_all(pool).await?;
    let active_surveys = catalog::count_active(pool).await?;
    let total_responses = responses::count(pool, &ResponseFilter::default()).await?;
    let surveys_by_category = catalog::counts_by_category(pool).await?;

    let since = Utc::now() - Duration::days(TREND_WINDOW_DAYS);
    let timestamps = responses::submitted_at_since(pool, Some(since)).await?;
    let response_trends = analytics::daily_trend(&timestamps, Some(since));

    let top_surveys = catalog::top_by_responses(pool, TOP_SURVEY_LIMIT).await?;

    Ok(OverviewReport {
        overview: OverviewTotals {
            total_surveys,
            active_surveys,
            total_responses,
            average_responses_per_survey: analytics::average_responses_per_survey(
                total_responses,
                total_surveys,
            ),
        },
        surveys_by_category,
        response_trends,
        top_surveys,
    })
}

/// Full analytics for one survey: identity, totals, full-history trend,
/// completion statistics and the per-question aggregation, in question
/// order. `None` when the survey does not exist.
pub async fn survey_analytics(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Option<SurveyAnalyticsReport>, sqlx::Error> {
    let Some(survey) = catalog::get(pool, survey_id).await? else {
        return Ok(None);
    };

    let survey_responses = responses::all_for_survey(pool, survey_id).await?;
    let total_responses = responses::count(
        pool,
        &ResponseFilter {
            survey_id: Some(survey_id),
            since: None,
        },
    )
    .await?;

    let timestamps: Vec<DateTime<Utc>> =
        survey_responses.iter().map(|r| r.submitted_at).collect();

    Ok(Some(SurveyAnalyticsReport {
        survey: SurveySummary {
            id: survey.id,
            title: survey.title,
            category: survey.category,
            created_at: survey.created_at,
        },
        total_responses,
        response_trends: analytics::daily_trend(&timestamps, None),
        completion_stats: analytics::completion_stats(&survey_responses),
        question_analytics: analytics::question_analytics(&survey.questions, &survey_responses),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Answer, AnswerValue, CreateSurveyRequest, NewQuestion, QuestionType,
        SubmitResponseRequest,
    };

    #[sqlx::test]
    async fn survey_analytics_total_matches_the_stored_count(pool: PgPool) {
        let survey = catalog::create(
            &pool,
            CreateSurveyRequest {
                title: "Editors".into(),
                description: "Which editor does the team use?".into(),
                category: Category::Technology,
                questions: vec![NewQuestion {
                    question_type: QuestionType::MultipleChoice,
                    question: "Editor of choice?".into(),
                    options: vec!["A".into(), "B".into()],
                    required: true,
                }],
                tags: vec![],
                is_active: true,
            },
        )
        .await
        .unwrap();
        let question_id = survey.questions[0].id.clone();

        for choice in ["A", "A", "B"] {
            responses::insert(
                &pool,
                SubmitResponseRequest {
                    survey_id: survey.id,
                    answers: vec![Answer {
                        question_id: question_id.clone(),
                        value: AnswerValue::Text(choice.into()),
                        question_type: QuestionType::MultipleChoice,
                    }],
                    completion_time: None,
                    is_complete: true,
                },
                None,
                None,
            )
            .await
            .unwrap();
        }

        let report = survey_analytics(&pool, survey.id).await.unwrap().unwrap();
        let counted = responses::count(
            &pool,
            &ResponseFilter {
                survey_id: Some(survey.id),
                since: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(report.total_responses, counted);

        let question = &report.question_analytics[0];
        assert_eq!(question.total_responses, 3);
        let distribution = question.answer_distribution.as_ref().unwrap();
        assert_eq!(distribution.get("A"), Some(&2));
        assert_eq!(distribution.get("B"), Some(&1));
    }
}
