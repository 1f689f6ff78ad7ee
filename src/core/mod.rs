pub mod catalog;
pub mod graph;
pub mod lifecycle;
pub mod plan;
pub mod platform;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod sequencer;

pub use crate::domain::model::{
    ConcreteType, InterfaceId, PlatformId, RegisteredService, ServiceArgs, ServiceDescriptor,
};
pub use crate::domain::ports::Service;
pub use crate::utils::error::Result;
