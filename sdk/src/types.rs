//! Employee directory data model
//!
//! These are the shapes exchanged with the upstream employee-record service.
//! Field names on the wire carry the upstream's `employee_` prefix; the Rust
//! side uses plain names and maps them with serde renames.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{DirectoryError, FieldError};

/// Youngest age accepted for a new employee
pub const MIN_AGE: u8 = 16;

/// Oldest age accepted for a new employee
pub const MAX_AGE: u8 = 75;

/// Smallest salary accepted for a new employee
pub const MIN_SALARY: u32 = 1;

/// An employee as stored by the upstream service
///
/// Records are transient values: they are decoded from an upstream response
/// and dropped once the call that fetched them completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeRecord {
    /// Upstream-assigned identifier, unset on a create candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "employee_name")]
    pub name: String,

    #[serde(rename = "employee_salary")]
    pub salary: u32,

    #[serde(rename = "employee_age")]
    pub age: u8,

    #[serde(rename = "employee_title")]
    pub title: String,

    #[serde(
        rename = "employee_email",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
}

impl EmployeeRecord {
    /// Create a record with an assigned id
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        salary: u32,
        age: u8,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            salary,
            age,
            title: title.into(),
            email: None,
        }
    }

    /// Attach an email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Upstream list/detail response wrapper
///
/// `data` is normalised to a list: upstream may send `null`, omit the field,
/// send a single object (detail responses) or an array (list responses).
/// An envelope with no data on a by-id fetch means "not found".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeListEnvelope {
    #[serde(default, deserialize_with = "one_or_many")]
    pub data: Vec<EmployeeRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EmployeeListEnvelope {
    /// Envelope carrying the given records
    pub fn with_data(data: Vec<EmployeeRecord>, status: impl Into<String>) -> Self {
        Self {
            data,
            status: Some(status.into()),
        }
    }

    /// Envelope carrying no records
    pub fn empty(status: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            status: Some(status.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the first record out of the envelope, if any
    pub fn into_first(self) -> Option<EmployeeRecord> {
        self.data.into_iter().next()
    }
}

/// Create responses come back either as a bare record or wrapped in an
/// envelope whose `data` is a single record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreatedEmployee {
    Wrapped {
        data: EmployeeRecord,
        #[serde(default)]
        status: Option<String>,
    },
    Bare(EmployeeRecord),
}

impl CreatedEmployee {
    pub fn into_record(self) -> EmployeeRecord {
        match self {
            CreatedEmployee::Wrapped { data, .. } => data,
            CreatedEmployee::Bare(record) => record,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<EmployeeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<EmployeeRecord>),
        One(Box<EmployeeRecord>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(records)) => records,
        Some(OneOrMany::One(record)) => vec![*record],
    })
}

/// Input for creating a new employee
///
/// Must pass [`CreateEmployeeRequest::validate`] before it is turned into a
/// candidate record and sent upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub salary: u32,
    pub age: u8,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CreateEmployeeRequest {
    /// Check every field constraint, reporting all violations at once
    pub fn validate(&self) -> Result<(), DirectoryError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be blank"));
        }
        if self.salary < MIN_SALARY {
            errors.push(FieldError::new(
                "salary",
                format!("must be greater than or equal to {}", MIN_SALARY),
            ));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            errors.push(FieldError::new(
                "age",
                format!("must be between {} and {}", MIN_AGE, MAX_AGE),
            ));
        }
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "must not be blank"));
        }
        if matches!(&self.email, Some(email) if email.trim().is_empty()) {
            errors.push(FieldError::new("email", "must not be blank when present"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DirectoryError::InvalidRequest(errors))
        }
    }

    /// Translate into the record shape upstream expects, id left unset
    pub fn into_candidate(self) -> EmployeeRecord {
        EmployeeRecord {
            id: None,
            name: self.name,
            salary: self.salary,
            age: self.age,
            title: self.title,
            email: self.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            name: "Ada Lovelace".to_string(),
            salary: 90_000,
            age: 36,
            title: "Analyst".to_string(),
            email: Some("ada@example.com".to_string()),
        }
    }

    #[test]
    fn test_record_uses_upstream_field_names() {
        let record = EmployeeRecord::new("7", "Grace", 120_000, 45, "Admiral");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "7");
        assert_eq!(json["employee_name"], "Grace");
        assert_eq!(json["employee_salary"], 120_000);
        assert_eq!(json["employee_age"], 45);
        assert_eq!(json["employee_title"], "Admiral");
        assert!(json.get("employee_email").is_none());
    }

    #[test]
    fn test_candidate_omits_id() {
        let json = serde_json::to_value(request().into_candidate()).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["employee_email"], "ada@example.com");
    }

    #[test]
    fn test_envelope_accepts_array() {
        let envelope: EmployeeListEnvelope = serde_json::from_str(
            r#"{"data":[{"id":"1","employee_name":"A","employee_salary":1,"employee_age":20,"employee_title":"T"}],"status":"ok"}"#,
        )
        .unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.status.as_deref(), Some("ok"));
    }

    #[test]
    fn test_envelope_accepts_single_object() {
        let envelope: EmployeeListEnvelope = serde_json::from_str(
            r#"{"data":{"id":"1","employee_name":"A","employee_salary":1,"employee_age":20,"employee_title":"T"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.into_first().unwrap().name, "A");
    }

    #[test]
    fn test_envelope_null_or_missing_data_is_empty() {
        let null: EmployeeListEnvelope =
            serde_json::from_str(r#"{"data":null,"status":"x"}"#).unwrap();
        assert!(null.is_empty());

        let missing: EmployeeListEnvelope = serde_json::from_str(r#"{"status":"x"}"#).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_created_employee_bare_and_wrapped() {
        let bare: CreatedEmployee = serde_json::from_str(
            r#"{"id":"9","employee_name":"B","employee_salary":5,"employee_age":30,"employee_title":"T"}"#,
        )
        .unwrap();
        assert_eq!(bare.into_record().id.as_deref(), Some("9"));

        let wrapped: CreatedEmployee = serde_json::from_str(
            r#"{"data":{"id":"10","employee_name":"C","employee_salary":5,"employee_age":30,"employee_title":"T"},"status":"ok"}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_record().id.as_deref(), Some("10"));
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_invalid_request_reports_every_field() {
        let bad = CreateEmployeeRequest {
            name: "   ".to_string(),
            salary: 0,
            age: 15,
            title: String::new(),
            email: Some(" ".to_string()),
        };

        match bad.validate() {
            Err(DirectoryError::InvalidRequest(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "salary", "age", "title", "email"]);
            }
            other => panic!("Expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        let mut req = request();
        req.age = MIN_AGE;
        assert!(req.validate().is_ok());
        req.age = MAX_AGE;
        assert!(req.validate().is_ok());
        req.age = MAX_AGE + 1;
        assert!(req.validate().is_err());
    }
}
