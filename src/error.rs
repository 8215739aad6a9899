use thiserror::Error;

/// Why a market-chart load ended in the `Error` state.
///
/// `Display` yields the exact text shown to the user; the transport detail is
/// kept for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Network failure, timeout, non-success HTTP status, or a body whose
    /// secondary series cannot be read at all.
    #[error("Error fetching historical data")]
    Transport { detail: String },

    /// The body parsed but has no `prices` field.
    #[error("Invalid data format")]
    MissingField,

    /// `prices` is present but empty, or its first entry is not a `(timestamp, value)` pair.
    #[error("Unexpected data format in prices array")]
    MalformedShape,
}

impl LoadError {
    pub fn transport(detail: impl Into<String>) -> Self {
        LoadError::Transport {
            detail: detail.into(),
        }
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LoadError::Transport { .. } => "transport",
            LoadError::MissingField => "missing_field",
            LoadError::MalformedShape => "malformed_shape",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_messages_are_user_facing_text() {
        assert_eq!(
            LoadError::transport("connection refused").to_string(),
            "Error fetching historical data"
        );
        assert_eq!(LoadError::MissingField.to_string(), "Invalid data format");
        assert_eq!(
            LoadError::MalformedShape.to_string(),
            "Unexpected data format in prices array"
        );
    }

    #[test]
    fn load_error_converts_to_exit_code_4() {
        let err: AppError = LoadError::MissingField.into();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "Invalid data format");
    }
}
