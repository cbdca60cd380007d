//! Builds the small Python programs shot into the sandbox (and, for the
//! trusted steady-state path, the `LocalRunner`) to parse-check and
//! functionally run a candidate rule body.
//!
//! Rule code and payloads are embedded as base64 literals to avoid
//! shell/quoting pitfalls (spec.md §4.3, "input transport").

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, Utc};
use serde_json::json;

pub const OUTPUT_START: &str = "__RULE_OUTPUT__";
pub const OUTPUT_END: &str = "__RULE_OUTPUT_END__";
pub const SYNTAX_OK: &str = "__SYNTAX_OK__";

fn b64(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

/// A program that does nothing but parse `code` as Python source.
pub fn syntax_check_program(code: &str) -> String {
    format!(
        r#"import ast, base64, sys
src = base64.b64decode("{code_b64}").decode("utf-8")
ast.parse(src)
print("{sentinel}")
"#,
        code_b64 = b64(code),
        sentinel = SYNTAX_OK,
    )
}

/// A program that executes `code` in a fresh namespace, locates the first
/// callable defined in it, and invokes it with `payload_json`
/// (`{employee, security, trade_date}`), printing the JSON result between
/// sentinel markers.
pub fn functional_check_program(code: &str, payload_json: &str) -> String {
    format!(
        r#"import base64, json, textwrap
src = base64.b64decode("{code_b64}").decode("utf-8")
src = textwrap.dedent(src)
payload = json.loads(base64.b64decode("{payload_b64}").decode("utf-8"))
ns = {{}}
exec(src, ns)
fn = None
for name, value in ns.items():
    if name.startswith("__"):
        continue
    if callable(value):
        fn = value
        break
if fn is None:
    raise RuntimeError("no callable defined in rule code")
result = fn(payload["employee"], payload["security"], payload["trade_date"])
print("{start}")
print(json.dumps(result))
print("{end}")
"#,
        code_b64 = b64(code),
        payload_b64 = b64(payload_json),
        start = OUTPUT_START,
        end = OUTPUT_END,
    )
}

/// Extract the JSON payload between the sentinel markers, if present.
pub fn extract_sentinel_json(stdout: &str) -> Option<String> {
    let start = stdout.find(OUTPUT_START)? + OUTPUT_START.len();
    let end_marker_pos = stdout[start..].find(OUTPUT_END)?;
    Some(stdout[start..start + end_marker_pos].trim().to_string())
}

/// The canonical employee/security/trade_date fixture used by the
/// validator's functional phase (spec.md §4.3).
pub fn canonical_fixture() -> serde_json::Value {
    let trade_date = Utc::now().date_naive();
    canonical_fixture_for_date(trade_date)
}

pub fn canonical_fixture_for_date(trade_date: NaiveDate) -> serde_json::Value {
    json!({
        "employee": {
            "id": "fixture-analyst",
            "role": "Analyst",
            "tier": 2,
            "restricted_tickers": ["AAPL", "TSLA", "MSFT", "GOOGL"],
            "coverage_stocks": ["AAPL", "TSLA", "MSFT", "GOOGL"],
            "active_deals": ["IPO-2025-FIXTURE"],
        },
        "security": {
            "ticker": "TSLA",
            "requested_action": "buy",
            "earnings_date": "2025-11-20",
            "market_cap": 1.0e9,
            "is_covered": true,
        },
        "trade_date": trade_date.format("%Y-%m-%d").to_string(),
    })
}
