// src/analytics.rs
//
// The pure analytic core: per-question aggregation, completion statistics
// and the daily trend-bucket primitive. Everything here is a total function
// of an in-memory snapshot; malformed answers are skipped, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::models::{AnswerValue, Question, QuestionType, SurveyResponse};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub total_responses: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_distribution: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_distribution: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_distribution: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub avg_completion_time: f64,
    pub min_completion_time: i32,
    pub max_completion_time: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub count: i64,
}

/// Computes one analytics entry per question, in the survey's question
/// order. Questions are independent: a malformed answer only affects the
/// question it belongs to.
pub fn question_analytics(
    questions: &[Question],
    responses: &[SurveyResponse],
) -> Vec<QuestionAnalytics> {
    questions
        .iter()
        .map(|question| analyze_question(question, responses))
        .collect()
}

fn analyze_question(question: &Question, responses: &[SurveyResponse]) -> QuestionAnalytics {
    // First matching answer per response, present values only. Answers
    // referencing question ids no longer in the survey fall through here
    // and are simply never attributed to any question.
    let values: Vec<&AnswerValue> = responses
        .iter()
        .filter_map(|r| r.answers.iter().find(|a| a.question_id == question.id))
        .map(|a| &a.value)
        .filter(|v| is_present(v))
        .collect();

    let mut analytics = QuestionAnalytics {
        question_id: question.id.clone(),
        question: question.question.clone(),
        question_type: question.question_type,
        total_responses: values.len(),
        answer_distribution: None,
        average_rating: None,
        rating_distribution: None,
        option_distribution: None,
    };

    match question.question_type {
        QuestionType::MultipleChoice => {
            let mut counts = BTreeMap::new();
            for value in &values {
                if let Some(choice) = choice_key(value) {
                    *counts.entry(choice).or_insert(0) += 1;
                }
            }
            analytics.answer_distribution = Some(counts);
        }
        QuestionType::Rating => {
            // Unparseable ratings stay in total_responses but are excluded
            // from the average and the distribution.
            let ratings: Vec<f64> = values.iter().filter_map(|v| as_number(v)).collect();
            let average = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().sum::<f64>() / ratings.len() as f64
            };
            let mut counts = BTreeMap::new();
            for rating in &ratings {
                *counts.entry(rating_key(*rating)).or_insert(0) += 1;
            }
            analytics.average_rating = Some(average);
            analytics.rating_distribution = Some(counts);
        }
        QuestionType::Checkbox => {
            // An answer selecting k options contributes k across those keys.
            let mut counts = BTreeMap::new();
            for value in &values {
                if let AnswerValue::Selections(options) = value {
                    for option in options {
                        *counts.entry(option.clone()).or_insert(0) += 1;
                    }
                }
            }
            analytics.option_distribution = Some(counts);
        }
        QuestionType::Text => {}
    }

    analytics
}

fn is_present(value: &AnswerValue) -> bool {
    match value {
        AnswerValue::Number(_) => true,
        AnswerValue::Text(text) => !text.is_empty(),
        AnswerValue::Selections(items) => !items.is_empty(),
    }
}

fn choice_key(value: &AnswerValue) -> Option<String> {
    match value {
        AnswerValue::Text(text) => Some(text.clone()),
        AnswerValue::Number(n) => Some(rating_key(*n)),
        AnswerValue::Selections(_) => None,
    }
}

fn as_number(value: &AnswerValue) -> Option<f64> {
    match value {
        AnswerValue::Number(n) => Some(*n),
        AnswerValue::Text(text) => text.trim().parse().ok(),
        AnswerValue::Selections(_) => None,
    }
}

/// Distribution key for an observed rating; whole numbers drop the
/// fractional part so 5.0 keys as "5".
fn rating_key(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        rating.to_string()
    }
}

/// Avg/min/max over responses that recorded a completion time. `None` when
/// no response carries the field: an empty sample is "no completion data",
/// not a duration of zero seconds.
pub fn completion_stats(responses: &[SurveyResponse]) -> Option<CompletionStats> {
    let times: Vec<i32> = responses.iter().filter_map(|r| r.completion_time).collect();
    let first = *times.first()?;
    let (mut min, mut max, mut sum) = (first, first, 0i64);
    for &t in &times {
        min = min.min(t);
        max = max.max(t);
        sum += t as i64;
    }
    Some(CompletionStats {
        avg_completion_time: sum as f64 / times.len() as f64,
        min_completion_time: min,
        max_completion_time: max,
    })
}

/// Buckets timestamps by UTC calendar day, in ascending (year, month, day)
/// order. Days with no events are omitted, so callers must not assume
/// contiguous days. Timestamps before `since` are ignored.
pub fn daily_trend(
    timestamps: &[DateTime<Utc>],
    since: Option<DateTime<Utc>>,
) -> Vec<TrendBucket> {
    let mut buckets = BTreeMap::new();
    for ts in timestamps {
        if matches!(since, Some(cutoff) if *ts < cutoff) {
            continue;
        }
        *buckets.entry(ts.date_naive()).or_insert(0i64) += 1;
    }
    buckets
        .into_iter()
        .map(|(day, count)| TrendBucket {
            year: day.year(),
            month: day.month(),
            day: day.day(),
            count,
        })
        .collect()
}

/// Rounded mean, 0 when there are no surveys to divide by.
pub fn average_responses_per_survey(total_responses: i64, total_surveys: i64) -> i64 {
    if total_surveys > 0 {
        (total_responses as f64 / total_surveys as f64).round() as i64
    } else {
        0
    }
}
