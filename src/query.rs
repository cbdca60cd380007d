//! Natural-language trade question parsing (spec.md §4.9 input contract).
//!
//! The spec treats the NL→structured-query boundary as opaque/external; this
//! is a minimal heuristic extractor sufficient to drive the evaluator from
//! plain-English questions like "Can I buy Apple stock?".

use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub ticker: String,
    pub action: Option<String>,
    pub trade_date: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryParseError {
    #[error("could not identify a ticker or company name in the question")]
    NoTickerFound,
}

/// Tiny alias table for the handful of company names scenario questions use.
/// Anything already spelled as an uppercase ticker passes through unchanged.
fn company_aliases() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("apple", "AAPL"),
        ("tesla", "TSLA"),
        ("microsoft", "MSFT"),
        ("google", "GOOGL"),
        ("alphabet", "GOOGL"),
        ("amazon", "AMZN"),
        ("meta", "META"),
        ("nvidia", "NVDA"),
    ])
}

pub fn parse(question: &str) -> Result<ParsedQuery, QueryParseError> {
    let lower = question.to_lowercase();
    let words: Vec<&str> = question.split_whitespace().collect();

    let action = if lower.contains("buy") || lower.contains("purchase") {
        Some("buy".to_string())
    } else if lower.contains("sell") {
        Some("sell".to_string())
    } else if lower.contains("trade") {
        Some("trade".to_string())
    } else {
        None
    };

    let ticker = words
        .iter()
        .find_map(|w| {
            let cleaned: String = w.chars().filter(|c| c.is_ascii_alphabetic()).collect();
            if cleaned.len() >= 2
                && cleaned.len() <= 5
                && cleaned.chars().all(|c| c.is_ascii_uppercase())
            {
                Some(cleaned)
            } else {
                None
            }
        })
        .or_else(|| {
            let aliases = company_aliases();
            words.iter().find_map(|w| {
                let cleaned: String = w
                    .chars()
                    .filter(|c| c.is_ascii_alphabetic())
                    .collect::<String>()
                    .to_lowercase();
                aliases.get(cleaned.as_str()).map(|t| t.to_string())
            })
        })
        .ok_or(QueryParseError::NoTickerFound)?;

    let trade_date = extract_date(question);

    Ok(ParsedQuery {
        ticker,
        action,
        trade_date,
    })
}

fn extract_date(question: &str) -> Option<String> {
    for word in question.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_ascii_digit() && c != '-');
        if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() {
            return Some(trimmed.to_string());
        }
    }
    None
}
