use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl GatewayError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            GatewayError::MissingConfigError { .. } => {
                "Set the missing environment variable (e.g. TRV_API_KEY) and redeploy"
            }
            GatewayError::InvalidConfigValueError { .. } | GatewayError::ConfigError { .. } => {
                "Check the configuration file and environment variables"
            }
            GatewayError::IoError(_) => "Check file paths and permissions",
            GatewayError::SerializationError(_) | GatewayError::InternalError { .. } => {
                "Inspect the logs for details"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
