use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Interface '{interface}' is already registered by service '{existing}'")]
    AlreadyRegistered { interface: String, existing: String },

    #[error("No service registered for interface '{interface}'")]
    NotFound { interface: String },

    #[error("Service '{dependent}' requires '{dependency}', which is not registered yet")]
    MissingDependency { dependent: String, dependency: String },

    #[error("Service '{service}' is part of a dependency cycle: {}", cycle.join(" -> "))]
    CircularDependency { service: String, cycle: Vec<String> },

    #[error("No factory registered for concrete type '{concrete}' (service '{service}')")]
    UnknownConcreteType { service: String, concrete: String },

    #[error("A factory for concrete type '{concrete}' is already registered")]
    DuplicateFactory { concrete: String },

    #[error("Service registered for '{interface}' is not a {expected}")]
    TypeMismatch { interface: String, expected: String },

    #[error("Factory for service '{service}' failed: {details}")]
    ConstructionFailed { service: String, details: String },

    #[error("Lifecycle hook '{hook}' failed for service '{service}': {details}")]
    LifecycleFailed {
        service: String,
        hook: String,
        details: String,
    },

    #[error("Registry lock poisoned during {operation}")]
    LockPoisoned { operation: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Registration,
    Resolution,
    Lifecycle,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RegistryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::AlreadyRegistered { .. }
            | RegistryError::NotFound { .. }
            | RegistryError::TypeMismatch { .. }
            | RegistryError::DuplicateFactory { .. } => ErrorCategory::Registration,
            RegistryError::MissingDependency { .. }
            | RegistryError::CircularDependency { .. }
            | RegistryError::UnknownConcreteType { .. }
            | RegistryError::ConstructionFailed { .. } => ErrorCategory::Resolution,
            RegistryError::LifecycleFailed { .. } => ErrorCategory::Lifecycle,
            RegistryError::ConfigValidationError { .. }
            | RegistryError::InvalidConfigValueError { .. }
            | RegistryError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RegistryError::LockPoisoned { .. }
            | RegistryError::IoError(_)
            | RegistryError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一服務失敗不影響其他服務
            RegistryError::AlreadyRegistered { .. } | RegistryError::NotFound { .. } => {
                ErrorSeverity::Low
            }
            RegistryError::MissingDependency { .. }
            | RegistryError::UnknownConcreteType { .. }
            | RegistryError::TypeMismatch { .. }
            | RegistryError::LifecycleFailed { .. }
            | RegistryError::ConstructionFailed { .. } => ErrorSeverity::Medium,
            RegistryError::CircularDependency { .. }
            | RegistryError::DuplicateFactory { .. }
            | RegistryError::ConfigValidationError { .. }
            | RegistryError::InvalidConfigValueError { .. }
            | RegistryError::MissingConfigError { .. } => ErrorSeverity::High,
            RegistryError::LockPoisoned { .. }
            | RegistryError::IoError(_)
            | RegistryError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RegistryError::AlreadyRegistered { interface, .. } => format!(
                "Remove the duplicate descriptor for '{}' or unregister the existing service first",
                interface
            ),
            RegistryError::NotFound { interface } => {
                format!("Register a service for '{}' before looking it up", interface)
            }
            RegistryError::MissingDependency { dependency, .. } => format!(
                "Move the descriptor providing '{}' earlier in the services list",
                dependency
            ),
            RegistryError::CircularDependency { .. } => {
                "Break the cycle by removing one of the constructor dependencies".to_string()
            }
            RegistryError::UnknownConcreteType { concrete, .. } => format!(
                "Add a factory for '{}' to the service catalog",
                concrete
            ),
            RegistryError::DuplicateFactory { .. } => {
                "Register each concrete type with exactly one factory".to_string()
            }
            RegistryError::TypeMismatch { .. } => {
                "Check that the interface id maps to the expected Rust type".to_string()
            }
            RegistryError::ConstructionFailed { .. } => {
                "Check the service profile values passed to the factory".to_string()
            }
            RegistryError::LifecycleFailed { .. } => {
                "Inspect the service's start/stop hook for the reported failure".to_string()
            }
            RegistryError::LockPoisoned { .. } => {
                "A thread panicked while holding the registry; restart the process".to_string()
            }
            RegistryError::IoError(_) => "Check that the file exists and is readable".to_string(),
            RegistryError::SerializationError(_) => {
                "Check the report destination and data for invalid content".to_string()
            }
            RegistryError::ConfigValidationError { field, .. }
            | RegistryError::InvalidConfigValueError { field, .. }
            | RegistryError::MissingConfigError { field } => {
                format!("Fix the '{}' entry in the configuration file", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Registration => format!("Registration problem: {}", self),
            ErrorCategory::Resolution => format!("Could not build service: {}", self),
            ErrorCategory::Lifecycle => format!("Service lifecycle problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_message_names_both_services() {
        let err = RegistryError::MissingDependency {
            dependent: "Inventory".to_string(),
            dependency: "IStorage".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Inventory"));
        assert!(message.contains("IStorage"));
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_cycle_message_joins_chain() {
        let err = RegistryError::CircularDependency {
            service: "A".to_string(),
            cycle: vec!["IA".to_string(), "IB".to_string(), "IA".to_string()],
        };
        assert!(err.to_string().contains("IA -> IB -> IA"));
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Critical);
        let err = RegistryError::LockPoisoned {
            operation: "register".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("System error"));
    }
}
