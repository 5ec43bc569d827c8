use taskboard_shared::kv::KvStore;

use super::model::Employee;
use crate::error::StoreError;

pub const EMPLOYEES_KEY: &str = "task_manager_employees";

/// Roster seeded on first read of an empty store.
fn starter_employees() -> Vec<Employee> {
    ["James O'Brian", "Adam Baker", "Priya Sharma", "Mina Patel"]
        .iter()
        .enumerate()
        .map(|(i, name)| Employee {
            id: format!("emp-{}", i + 1),
            name: (*name).to_string(),
        })
        .collect()
}

fn load(store: &dyn KvStore) -> Result<Vec<Employee>, StoreError> {
    match store.get(EMPLOYEES_KEY) {
        None => {
            let seeded = starter_employees();
            save(store, &seeded)?;
            Ok(seeded)
        }
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| StoreError::Storage(format!("stored employees are malformed: {}", e))),
    }
}

fn save(store: &dyn KvStore, employees: &[Employee]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(employees)
        .map_err(|e| StoreError::Storage(format!("employee serialization failed: {}", e)))?;
    store
        .set(EMPLOYEES_KEY, &raw)
        .map_err(|e| StoreError::Storage(format!("key-value write failed: {}", e)))
}

/// Employees ordered by name, case-insensitively.
pub fn list_employees(store: &dyn KvStore) -> Result<Vec<Employee>, StoreError> {
    let mut employees = load(store)?;
    employees.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(employees)
}

/// Add an employee; the trimmed name must be non-empty and unique under
/// case-insensitive comparison.
pub fn add_employee(store: &dyn KvStore, name: &str) -> Result<Employee, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("employee name is required".to_string()));
    }
    let mut employees = load(store)?;
    if employees
        .iter()
        .any(|e| e.name.trim().to_lowercase() == name.to_lowercase())
    {
        return Err(StoreError::DuplicateName(name.to_string()));
    }

    let employee = Employee {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
    };
    employees.push(employee.clone());
    save(store, &employees)?;
    Ok(employee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_shared::kv::MemoryKv;

    #[test]
    fn first_read_seeds_the_starter_roster() {
        let kv = MemoryKv::new();
        let employees = list_employees(&kv).unwrap();
        assert_eq!(employees.len(), 4);
        // sorted by name, not by seed order
        assert_eq!(employees[0].name, "Adam Baker");
        assert!(employees.iter().any(|e| e.name == "Priya Sharma"));
    }

    #[test]
    fn add_is_visible_to_subsequent_lists() {
        let kv = MemoryKv::new();
        let added = add_employee(&kv, "  Casey Fox  ").unwrap();
        assert_eq!(added.name, "Casey Fox");

        let employees = list_employees(&kv).unwrap();
        assert!(employees.iter().any(|e| e.id == added.id));
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let kv = MemoryKv::new();
        add_employee(&kv, "Casey Fox").unwrap();

        let err = add_employee(&kv, "casey fox").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));

        let err = add_employee(&kv, "CASEY FOX").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));

        // exactly one stored record carries the name
        let matches = list_employees(&kv)
            .unwrap()
            .into_iter()
            .filter(|e| e.name.to_lowercase() == "casey fox")
            .count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn blank_names_are_rejected() {
        let kv = MemoryKv::new();
        let err = add_employee(&kv, "   ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn malformed_stored_employees_surface_as_storage_failures() {
        let kv = MemoryKv::new();
        kv.set(EMPLOYEES_KEY, "not json").unwrap();
        let err = list_employees(&kv).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
