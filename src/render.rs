//! Plain-text views of orchestrator and session state.

use crate::models::{
    AiAnalysis, ChatRole, JobListing, ParsedQuery, SearchResult, Stats, TranscriptEntry,
    TurnStatus,
};
use crate::search::{SearchState, SearchStatus};
use crate::session::{ChatStatus, SessionState};

const WRAP_WIDTH: usize = 78;

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Five-slot star bar, e.g. `★★★★☆ (4.2)`.
pub fn rating_stars(rating: f64) -> String {
    let full = rating.clamp(0.0, 5.0).floor() as usize;
    format!("{}{} ({})", "★".repeat(full), "☆".repeat(5 - full), rating)
}

pub fn posted_label(job: &JobListing) -> String {
    match job.posted_on() {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => "Recently posted".to_string(),
    }
}

pub fn job_row(index: usize, job: &JobListing) -> String {
    format!(
        "{:>3}. {:<34} {:<20} {:<18} {}",
        index + 1,
        truncate(&job.title, 34),
        truncate(&job.company, 20),
        truncate(&job.location, 18),
        job.stars().map(rating_stars).unwrap_or_default()
    )
}

pub fn job_detail(job: &JobListing) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} (#{})\n", job.title, job.id));
    out.push_str(&format!("{} - {}\n", job.company, job.location));
    out.push_str(&format!("Posted: {}\n", posted_label(job)));
    if let Some(stars) = job.stars() {
        out.push_str(&format!("Rating: {}\n", rating_stars(stars)));
    }
    if let Some(salary) = &job.salary {
        out.push_str(&format!("Salary: {}\n", salary));
    }
    if let Some(source) = &job.source {
        out.push_str(&format!("Source: {}\n", source));
    }
    if let Some(method) = &job.application_method {
        out.push_str(&format!("Apply via: {}\n", method));
    }
    if let Some(kind) = &job.job_type {
        out.push_str(&format!("Type: {}\n", kind));
    }
    if let Some(level) = &job.experience_level {
        out.push_str(&format!("Level: {}\n", level));
    }
    if job.remote_friendly == Some(true) {
        out.push_str("Remote friendly\n");
    }
    if let Some(skills) = job.skills.as_ref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("Skills: {}\n", skills.join(", ")));
    }
    if let Some(description) = &job.description {
        out.push('\n');
        out.push_str(&textwrap::fill(description, WRAP_WIDTH));
        out.push('\n');
    }
    if let Some(insight) = &job.ai_insights {
        out.push_str("\nWhy it matches\n");
        if let Some(score) = &insight.relevance_score {
            out.push_str(&format!("  Relevance: {}\n", score));
        }
        for highlight in &insight.key_highlights {
            out.push_str(&format!("  + {}\n", highlight));
        }
        if let Some(why) = &insight.why_good_match {
            out.push_str(&indent(&textwrap::fill(why, WRAP_WIDTH - 2)));
        }
        for concern in &insight.potential_concerns {
            out.push_str(&format!("  ! {}\n", concern));
        }
    }
    out
}

pub fn parsed_query(parsed: &ParsedQuery) -> String {
    let mut parts = Vec::new();
    if !parsed.keywords.is_empty() {
        parts.push(format!("keywords: {}", parsed.keywords.join(", ")));
    }
    let labelled = [
        ("location", &parsed.location),
        ("salary", &parsed.salary_expectation),
        ("arrangement", &parsed.work_arrangement),
        ("level", &parsed.experience_level),
    ];
    for (label, value) in labelled {
        if let Some(value) = value {
            parts.push(format!("{}: {}", label, value));
        }
    }
    if parts.is_empty() {
        if let Some(rewritten) = &parsed.search_query {
            parts.push(format!("query: {}", rewritten));
        }
    }
    format!("Understood as [{}]", parts.join(" | "))
}

pub fn analysis(analysis: &AiAnalysis) -> String {
    let mut out = String::from("AI insights\n");
    if !analysis.summary.is_empty() {
        out.push_str(&indent(&textwrap::fill(&analysis.summary, WRAP_WIDTH - 2)));
    }
    for insight in &analysis.insights {
        out.push_str(&format!("  * {}\n", insight));
    }
    for recommendation in &analysis.recommendations {
        out.push_str(&format!("  > {}\n", recommendation));
    }
    if let Some(trends) = &analysis.salary_trends {
        out.push_str(&format!("  Salary trends: {}\n", trends));
    }
    if let Some(skills) = &analysis.skill_demand {
        out.push_str(&format!("  In demand: {}\n", skills));
    }
    out
}

pub fn search_result(result: &SearchResult) -> String {
    let mut out = String::new();
    if result.has_ai_artifacts() {
        if let Some(parsed) = &result.parsed_query {
            out.push_str(&parsed_query(parsed));
            out.push('\n');
        }
        if let Some(ai) = &result.ai_analysis {
            out.push_str(&analysis(ai));
            out.push('\n');
        }
    }
    if let Some(summary) = &result.summary {
        out.push_str(summary);
        out.push('\n');
    }
    if result.jobs.is_empty() {
        out.push_str("No jobs found.\n");
    } else {
        for (i, job) in result.jobs.iter().enumerate() {
            out.push_str(&job_row(i, job));
            out.push('\n');
        }
    }
    out
}

pub fn search_state(state: &SearchState) -> String {
    match state.status {
        SearchStatus::Loading => "Searching...\n".to_string(),
        SearchStatus::Error => format!(
            "Search failed: {}\nNo jobs found.\n",
            state.last_error.as_deref().unwrap_or("unknown error")
        ),
        SearchStatus::Idle => state
            .current
            .as_ref()
            .map(search_result)
            .unwrap_or_default(),
    }
}

pub fn stats(stats: &Stats) -> String {
    let mut out = format!("{} jobs indexed", stats.total_documents);
    if let Some(name) = &stats.collection_name {
        out.push_str(&format!(" ({})", name));
    }
    if !stats.fields.is_empty() {
        out.push_str(&format!(", {} searchable fields", stats.fields.len()));
    }
    out
}

pub fn transcript_entry(entry: &TranscriptEntry) -> String {
    let who = match entry.turn.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
    };
    let marker = match entry.status {
        TurnStatus::Pending => " (sending)",
        TurnStatus::Failed => " (not delivered)",
        TurnStatus::Acknowledged => "",
    };
    format!(
        "{}{}:\n{}\n",
        who,
        marker,
        indent(&textwrap::fill(&entry.turn.content, WRAP_WIDTH - 2))
    )
}

pub fn session(state: &SessionState) -> String {
    let mut out = String::new();
    match &state.selected_job {
        Some(job) => out.push_str(&format!("Chatting about: {} at {}\n", job.title, job.company)),
        None => out.push_str("No job selected.\n"),
    }
    for entry in &state.transcript {
        out.push_str(&transcript_entry(entry));
    }
    if state.chat_status == ChatStatus::Error {
        if let Some(error) = &state.last_error {
            out.push_str(&format!("! {}\n", error));
        }
    }
    out
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {}\n", line)).collect()
}
