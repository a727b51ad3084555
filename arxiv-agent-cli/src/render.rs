//! Plain-text rendering of papers, profiles and history for the terminal.

use arxiv_agent_core::{CategoryPreferences, PaperRecord, SearchHistoryEntry, UserProfile};

const SUMMARY_PREVIEW_CHARS: usize = 280;

/// A numbered, multi-line listing entry for one paper.
pub fn paper_block(index: usize, paper: &PaperRecord) -> String {
    let mut out = format!("[{}] {}\n", index, paper.title);
    if !paper.authors.is_empty() {
        out.push_str(&format!("    Authors: {}\n", paper.authors.join(", ")));
    }

    let mut dates = Vec::new();
    if let Some(published) = paper.published {
        dates.push(format!("Published: {}", published.format("%Y-%m-%d")));
    }
    if let Some(updated) = paper.updated {
        dates.push(format!("Updated: {}", updated.format("%Y-%m-%d")));
    }
    if !paper.categories.is_empty() {
        let cats: Vec<&str> = paper.categories.iter().map(String::as_str).collect();
        dates.push(format!("Categories: {}", cats.join(", ")));
    }
    if !dates.is_empty() {
        out.push_str(&format!("    {}\n", dates.join("  |  ")));
    }

    out.push_str(&format!("    {}\n", paper.id));
    if let Some(pdf) = &paper.pdf_url {
        out.push_str(&format!("    PDF: {}\n", pdf));
    }
    if !paper.summary.is_empty() {
        out.push_str(&format!("    {}\n", preview(&paper.summary, SUMMARY_PREVIEW_CHARS)));
    }
    out
}

/// Collapse whitespace and cut to `max_chars`, adding an ellipsis when cut.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub fn profile_block(profile: &UserProfile) -> String {
    let list = |items: &[String]| {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.join(", ")
        }
    };
    format!(
        "Profile: {}\n  Interests:        {}\n  Favorite authors: {}\n  Saved papers:     {}",
        profile.user_id,
        list(&profile.interests),
        list(&profile.favorite_authors),
        list(&profile.saved_papers),
    )
}

pub fn history_line(entry: &SearchHistoryEntry) -> String {
    let user = entry
        .user_id
        .as_deref()
        .map(|u| format!(" [{}]", u))
        .unwrap_or_default();
    format!(
        "{}  {:<6} {:>3} results  {}{}",
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.mode.to_string(),
        entry.result_count,
        entry.query,
        user
    )
}

pub fn hidden_categories_line(user_id: &str, prefs: &CategoryPreferences) -> String {
    if prefs.hidden.is_empty() {
        format!("No hidden categories for '{}'.", user_id)
    } else {
        let cats: Vec<&str> = prefs.hidden.iter().map(String::as_str).collect();
        format!("Hidden categories for '{}': {}", user_id, cats.join(", "))
    }
}
