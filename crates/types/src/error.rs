use thiserror::Error;

/// Every way a configuration record or a live-status document can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{entity}: missing required field `{field}`")]
    MissingField { entity: String, field: String },
    #[error("{field}: unknown provider `{value}`")]
    UnknownProvider { field: String, value: String },
    #[error("provider block `{block}` is incomplete: {detail}")]
    IncompleteProviderBlock { block: String, detail: String },
    #[error("`{lower}` must not exceed `{upper}`")]
    RangeInvariantViolated { lower: String, upper: String },
    #[error("{field}: {detail}")]
    OutOfRange { field: String, detail: String },
    #[error("{entity}: no migration step applies (missing {missing:?})")]
    UnmigratableSchema { entity: String, missing: Vec<String> },
    #[error("{field}: type mismatch ({detail})")]
    TypeMismatch { field: String, detail: String },
    #[error("json parse error: {0}")]
    Json(String),
}

impl SchemaError {
    pub fn missing(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn mismatch(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            detail: detail.into(),
        }
    }

    pub fn incomplete(block: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IncompleteProviderBlock {
            block: block.into(),
            detail: detail.into(),
        }
    }

    pub fn out_of_range(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Fails with `RangeInvariantViolated` when `lower > upper`. Equal bounds pass.
    pub fn check_order<T: PartialOrd>(
        lower_name: &str,
        lower: T,
        upper_name: &str,
        upper: T,
    ) -> Result<(), Self> {
        if lower > upper {
            return Err(Self::RangeInvariantViolated {
                lower: lower_name.to_string(),
                upper: upper_name.to_string(),
            });
        }
        Ok(())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
