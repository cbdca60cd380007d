//! `EmployeeDirectory`: pure lookup over a small seeded employee roster.
//!
//! Out of scope per spec.md §1 ("Employee lookup... is a pure lookup over a
//! static document, not a synthesis problem"), but the HTTP API needs a
//! concrete backing store to be exercisable end to end, so this seeds a
//! handful of fixture employees in the same shape rules are validated
//! against (`src/pyharness.rs`'s canonical fixture).

use crate::models::Employee;
use serde_json::Map;
use std::collections::HashMap;

pub struct EmployeeDirectory {
    employees: HashMap<String, Employee>,
}

impl EmployeeDirectory {
    pub fn new() -> Self {
        let mut employees = HashMap::new();
        for employee in seed_employees() {
            employees.insert(employee.id.clone(), employee);
        }
        Self { employees }
    }

    pub fn find(&self, employee_id: &str) -> Option<&Employee> {
        self.employees.get(employee_id)
    }
}

impl Default for EmployeeDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_employees() -> Vec<Employee> {
    vec![
        Employee {
            id: "EMP001".to_string(),
            role: "Analyst".to_string(),
            division: Some("Equity Research".to_string()),
            tier: Some(2),
            restricted_tickers: vec!["AAPL".to_string(), "TSLA".to_string()],
            can_trade: Some(true),
            coverage_stocks: vec!["AAPL".to_string(), "TSLA".to_string(), "MSFT".to_string()],
            active_deals: vec![],
            firm_restrictions: None,
            quick_reference: None,
            extra: Map::new(),
        },
        Employee {
            id: "EMP002".to_string(),
            role: "Investment Banker".to_string(),
            division: Some("M&A".to_string()),
            tier: Some(1),
            restricted_tickers: vec![],
            can_trade: Some(true),
            coverage_stocks: vec![],
            active_deals: vec!["IPO-2025-FIXTURE".to_string()],
            firm_restrictions: None,
            quick_reference: None,
            extra: Map::new(),
        },
        Employee {
            id: "EMP003".to_string(),
            role: "Trader".to_string(),
            division: Some("Trading Desk".to_string()),
            tier: Some(3),
            restricted_tickers: vec![],
            can_trade: Some(true),
            coverage_stocks: vec![],
            active_deals: vec![],
            firm_restrictions: None,
            quick_reference: None,
            extra: Map::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_seeded_employee_by_id() {
        let dir = EmployeeDirectory::new();
        let emp = dir.find("EMP001").unwrap();
        assert_eq!(emp.role, "Analyst");
    }

    #[test]
    fn unknown_employee_id_returns_none() {
        let dir = EmployeeDirectory::new();
        assert!(dir.find("EMP999").is_none());
    }
}
