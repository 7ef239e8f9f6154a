use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static CODE_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[A-Za-z]+\n|\n)?(.*?)```").unwrap());

static SQL_LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(sql\s*query|sql|query)\s*:\s*").unwrap());

/// Cleans LLM response by removing reasoning blocks and surrounding whitespace
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned.trim().to_string()
}

/// Pull the SQL statement out of a model reply.
///
/// The first Markdown fenced block wins when present. A leading `SQL:` label is dropped.
pub fn extract_sql(response: &str) -> String {
    let cleaned = clean_llm_response(response);

    let sql = match CODE_FENCE_PATTERN.captures(&cleaned) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string(),
        None => cleaned.replace('`', ""),
    };

    SQL_LABEL_PATTERN.replace(sql.trim(), "").trim().to_string()
}
