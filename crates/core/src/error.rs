use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("snapshot is missing required fields: {}", .missing.join(", "))]
    MissingFields {
        asset_number: Option<String>,
        missing: Vec<String>,
    },

    #[error("decode error: {message}")]
    Decode {
        asset_number: Option<String>,
        message: String,
    },

    #[error("value {value} for {column} does not fit decimal({precision}, {scale})")]
    DecimalOverflow {
        column: String,
        value: f64,
        precision: u8,
        scale: u8,
    },

    #[error("key {column} is {len} characters, column holds {max_len}")]
    KeyTooLong {
        column: String,
        max_len: usize,
        len: usize,
    },

    #[error("cannot bind {found} to {column} ({expected})")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },
}

impl CoreError {
    /// Asset number carried by snapshot-level errors, if one was recovered.
    pub fn asset_number(&self) -> Option<&str> {
        match self {
            Self::MissingFields { asset_number, .. } | Self::Decode { asset_number, .. } => {
                asset_number.as_deref()
            }
            _ => None,
        }
    }
}
