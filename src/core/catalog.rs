use crate::core::resolver::ResolvedDependencies;
use crate::domain::model::{ConcreteType, InterfaceId, ServiceArgs};
use crate::domain::ports::Service;
use crate::utils::error::{RegistryError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type BuildFn =
    dyn Fn(&ServiceArgs, &ResolvedDependencies) -> Result<Arc<dyn Service>> + Send + Sync;

/// 明確註冊的建構函式，取代建構子反射
///
/// `dependencies` 的順序即為解析順序，也就是建構子參數的順序。
pub struct ServiceFactory {
    concrete: ConcreteType,
    dependencies: Vec<InterfaceId>,
    build: Box<BuildFn>,
}

impl ServiceFactory {
    pub fn new<F>(concrete: impl Into<ConcreteType>, build: F) -> Self
    where
        F: Fn(&ServiceArgs, &ResolvedDependencies) -> Result<Arc<dyn Service>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            concrete: concrete.into(),
            dependencies: Vec::new(),
            build: Box::new(build),
        }
    }

    pub fn depends_on(mut self, interface: impl Into<InterfaceId>) -> Self {
        self.dependencies.push(interface.into());
        self
    }

    pub fn concrete(&self) -> &ConcreteType {
        &self.concrete
    }

    pub fn dependencies(&self) -> &[InterfaceId] {
        &self.dependencies
    }

    pub fn build(
        &self,
        args: &ServiceArgs,
        dependencies: &ResolvedDependencies,
    ) -> Result<Arc<dyn Service>> {
        (self.build)(args, dependencies)
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("concrete", &self.concrete)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// 具體型別名稱 -> factory
#[derive(Debug, Default)]
pub struct ServiceCatalog {
    factories: HashMap<ConcreteType, ServiceFactory>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_factory(&mut self, factory: ServiceFactory) -> Result<()> {
        if self.factories.contains_key(factory.concrete()) {
            return Err(RegistryError::DuplicateFactory {
                concrete: factory.concrete().to_string(),
            });
        }
        tracing::debug!(
            "🏭 Factory added for {} ({} dependencies)",
            factory.concrete(),
            factory.dependencies().len()
        );
        self.factories.insert(factory.concrete().clone(), factory);
        Ok(())
    }

    /// 鏈式註冊，重複時回傳錯誤
    pub fn with_factory(mut self, factory: ServiceFactory) -> Result<Self> {
        self.register_factory(factory)?;
        Ok(self)
    }

    pub fn get(&self, concrete: &ConcreteType) -> Option<&ServiceFactory> {
        self.factories.get(concrete)
    }

    pub fn dependencies_of(&self, concrete: &ConcreteType) -> Option<&[InterfaceId]> {
        self.get(concrete).map(ServiceFactory::dependencies)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
