pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use self::config::CliConfig;
pub use self::config::RegistryConfig;

pub use self::core::{
    catalog::{ServiceCatalog, ServiceFactory},
    lifecycle::{LifecycleNotifier, PriorityLifecycle},
    plan::RegistrationPlan,
    platform::PlatformGate,
    registry::ServiceRegistry,
    report::{RegistrationOutcome, RegistrationReport, SkipReason},
    resolver::{ConstructorResolver, ResolvedDependencies},
    sequencer::{FailurePolicy, RegistrationSequencer},
};
pub use self::domain::model::{ConcreteType, InterfaceId, PlatformId, ServiceArgs, ServiceDescriptor};
pub use self::domain::ports::Service;
pub use self::utils::error::{RegistryError, Result};
