//! Searchable rows.

use serde_json::Value;

use crate::query::models::{DriftRecord, Finding, Incident, Recommendation, Ticket};

/// Fields exposed to the filter state machine.
pub trait Searchable {
    /// String fields matched by free-text search.
    fn search_fields(&self) -> Vec<&str>;

    /// Value of an enum dimension (`severity`, `status`, ...).
    fn enum_field(&self, key: &str) -> Option<&str>;
}

/// Fields a JSON row is searched on when no typed record applies.
pub const DEFAULT_SEARCH_FIELDS: &[&str] = &[
    "resource_id",
    "title",
    "description",
    "service",
    "service_name",
];

impl Searchable for Value {
    fn search_fields(&self) -> Vec<&str> {
        DEFAULT_SEARCH_FIELDS
            .iter()
            .filter_map(|f| self.get(*f).and_then(|v| v.as_str()))
            .collect()
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

impl Searchable for Finding {
    fn search_fields(&self) -> Vec<&str> {
        [&self.resource_id, &self.title, &self.description, &self.service]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect()
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        match key {
            "severity" => Some(self.severity.as_str()),
            "status" => Some(self.status.as_str()),
            "service" => self.service.as_deref(),
            "aws_account_id" => self.aws_account_id.as_deref(),
            _ => None,
        }
    }
}

impl Searchable for Recommendation {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.service.as_str(), self.recommendation_type.as_str()];
        fields.extend(self.resource_id.as_deref());
        fields.extend(self.description.as_deref());
        fields
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        match key {
            "type" | "recommendation_type" => Some(&self.recommendation_type),
            "service" => Some(&self.service),
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }
}

impl Searchable for Incident {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.resource_id.as_deref());
        fields.extend(self.description.as_deref());
        fields
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        match key {
            "severity" => Some(self.severity.as_str()),
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }
}

impl Searchable for DriftRecord {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.resource_id.as_str()];
        fields.extend(self.resource_type.as_deref());
        fields.extend(self.description.as_deref());
        fields
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        match key {
            "severity" => Some(self.severity.as_str()),
            "status" => Some(self.status.as_str()),
            "drift_type" => self.drift_type.as_deref(),
            _ => None,
        }
    }
}

impl Searchable for Ticket {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }

    fn enum_field(&self, key: &str) -> Option<&str> {
        match key {
            "priority" => Some(self.priority.as_str()),
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }
}
