use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// Study-plan generation: shuffle the topic set, partition it into contiguous
/// chunks of `ceil(|topics| / |days|)`, assign one chunk per selected day in
/// fixed Monday-first order, split the daily hour budget evenly across the
/// chunk, and group each day's topics by subject for display. Derived on
/// demand, never persisted.
pub const DAY_ORDER: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRef {
    pub id: String,
    pub subject: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub topic_id: String,
    pub title: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBlock {
    pub subject: String,
    pub entries: Vec<PlanEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: String,
    pub subjects: Vec<SubjectBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimetableError {
    pub code: &'static str,
    pub message: String,
}

impl TimetableError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn day_rank(day: &str) -> Option<usize> {
    DAY_ORDER.iter().position(|d| d.eq_ignore_ascii_case(day))
}

/// Normalize day names: canonical casing, fixed week order, duplicates dropped.
pub fn normalize_days(raw: &[String]) -> Result<Vec<&'static str>, TimetableError> {
    let mut ranks: Vec<usize> = Vec::new();
    for d in raw {
        let Some(rank) = day_rank(d.trim()) else {
            return Err(TimetableError::new(
                "bad_params",
                format!("unknown day: {}", d),
            ));
        };
        if !ranks.contains(&rank) {
            ranks.push(rank);
        }
    }
    ranks.sort_unstable();
    Ok(ranks.into_iter().map(|r| DAY_ORDER[r]).collect())
}

pub fn generate(
    topics: Vec<TopicRef>,
    days: &[&str],
    daily_hours: f64,
    seed: Option<u64>,
) -> Result<Vec<DayPlan>, TimetableError> {
    if days.is_empty() {
        return Err(TimetableError::new(
            "bad_params",
            "select at least one study day",
        ));
    }
    if topics.is_empty() {
        return Err(TimetableError::new(
            "no_topics",
            "no topics match the selected subjects",
        ));
    }
    if !(daily_hours > 0.0) || daily_hours > 24.0 {
        return Err(TimetableError::new(
            "bad_params",
            "dailyHours must be in (0, 24]",
        ));
    }

    let mut shuffled = topics;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    shuffled.shuffle(&mut rng);

    // Contiguous chunks of ceil(n / days); trailing days may run short or empty.
    let chunk_size = (shuffled.len() + days.len() - 1) / days.len();
    let mut plans = Vec::with_capacity(days.len());
    for (i, day) in days.iter().enumerate() {
        let start = i * chunk_size;
        let chunk: &[TopicRef] = if start < shuffled.len() {
            let end = (start + chunk_size).min(shuffled.len());
            &shuffled[start..end]
        } else {
            &[]
        };
        plans.push(DayPlan {
            day: (*day).to_string(),
            subjects: group_day(chunk, daily_hours),
        });
    }
    Ok(plans)
}

fn group_day(chunk: &[TopicRef], daily_hours: f64) -> Vec<SubjectBlock> {
    if chunk.is_empty() {
        return Vec::new();
    }
    let minutes_per_topic = ((daily_hours * 60.0) / chunk.len() as f64).round() as i64;

    // Group by subject, preserving the shuffled first-seen order.
    let mut blocks: Vec<SubjectBlock> = Vec::new();
    for topic in chunk {
        let entry = PlanEntry {
            topic_id: topic.id.clone(),
            title: topic.title.clone(),
            minutes: minutes_per_topic,
        };
        match blocks.iter_mut().find(|b| b.subject == topic.subject) {
            Some(block) => block.entries.push(entry),
            None => blocks.push(SubjectBlock {
                subject: topic.subject.clone(),
                entries: vec![entry],
            }),
        }
    }
    blocks
}
