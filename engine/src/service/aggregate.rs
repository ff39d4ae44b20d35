//! Derived views over an employee list
//!
//! Pure functions, so they can be property-tested without an upstream.

use directory_sdk::types::EmployeeRecord;

/// Largest salary, or 0 for an empty list
pub fn max_salary(employees: &[EmployeeRecord]) -> u32 {
    employees.iter().map(|e| e.salary).max().unwrap_or(0)
}

/// Names of the `limit` best-paid employees, highest first
///
/// Ties keep their input order.
pub fn top_earners(employees: &[EmployeeRecord], limit: usize) -> Vec<String> {
    let mut ranked: Vec<&EmployeeRecord> = employees.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.salary.cmp(&a.salary));
    ranked
        .into_iter()
        .take(limit)
        .map(|e| e.name.clone())
        .collect()
}

/// Employees whose name contains `fragment`, ignoring case
pub fn filter_by_name(employees: Vec<EmployeeRecord>, fragment: &str) -> Vec<EmployeeRecord> {
    let needle = fragment.to_lowercase();
    employees
        .into_iter()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str, salary: u32) -> EmployeeRecord {
        EmployeeRecord::new(name, name, salary, 30, "Engineer")
    }

    #[test]
    fn test_max_salary() {
        let employees = vec![
            employee("a", 50_000),
            employee("b", 120_000),
            employee("c", 70_000),
        ];
        assert_eq!(max_salary(&employees), 120_000);
        assert_eq!(max_salary(&[]), 0);
    }

    #[test]
    fn test_top_earners_orders_descending() {
        let employees = vec![
            employee("a", 50_000),
            employee("b", 120_000),
            employee("c", 70_000),
        ];
        assert_eq!(top_earners(&employees, 10), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_top_earners_ties_keep_input_order() {
        let employees = vec![
            employee("first", 100),
            employee("second", 100),
            employee("top", 200),
            employee("third", 100),
        ];
        assert_eq!(
            top_earners(&employees, 3),
            vec!["top", "first", "second"]
        );
    }

    #[test]
    fn test_top_earners_is_never_padded() {
        let employees = vec![employee("only", 1)];
        assert_eq!(top_earners(&employees, 10), vec!["only"]);
        assert!(top_earners(&[], 10).is_empty());
    }

    #[test]
    fn test_filter_by_name_is_case_insensitive() {
        let employees = vec![
            employee("Alice Smith", 1),
            employee("Bob", 2),
            employee("ALICIA Keys", 3),
        ];

        let names: Vec<String> = filter_by_name(employees.clone(), "alic")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Alice Smith", "ALICIA Keys"]);

        assert_eq!(filter_by_name(employees.clone(), "").len(), 3);
        assert!(filter_by_name(employees, "zed").is_empty());
    }
}
