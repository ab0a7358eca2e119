//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::In => "in",
        }
    }

    /// Render `value` as a PostgREST filter expression
    pub fn expr(&self, value: &str) -> String {
        match self {
            FilterOperator::In => format!("{}.({})", self.as_str(), value),
            _ => format!("{}.{}", self.as_str(), value),
        }
    }
}
