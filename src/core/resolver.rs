use crate::core::catalog::ServiceFactory;
use crate::core::registry::{downcast_instance, ServiceRegistry};
use crate::domain::model::{InterfaceId, ServiceDescriptor};
use crate::domain::ports::Service;
use crate::utils::error::{RegistryError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 已解析的建構子依賴，順序與 factory 宣告一致
///
/// 內含的實例與 registry 中儲存的是同一個 `Arc`。
#[derive(Clone, Default)]
pub struct ResolvedDependencies {
    resolved: Vec<(InterfaceId, Arc<dyn Service>)>,
}

impl ResolvedDependencies {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get_dyn(&self, interface: &InterfaceId) -> Result<Arc<dyn Service>> {
        self.resolved
            .iter()
            .find(|(id, _)| id == interface)
            .map(|(_, instance)| Arc::clone(instance))
            .ok_or_else(|| RegistryError::NotFound {
                interface: interface.to_string(),
            })
    }

    pub fn get<T: Any + Send + Sync>(&self, interface: impl Into<InterfaceId>) -> Result<Arc<T>> {
        let interface = interface.into();
        let instance = self.get_dyn(&interface)?;
        downcast_instance(&interface, instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InterfaceId, &Arc<dyn Service>)> {
        self.resolved.iter().map(|(id, instance)| (id, instance))
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl fmt::Debug for ResolvedDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolved.iter().map(|(id, _)| id))
            .finish()
    }
}

/// 依 factory 宣告的依賴到 registry 查詢實例
///
/// 只解析一層：每個依賴必須已經註冊完成，順序正確與否由 sequencer 負責。
pub struct ConstructorResolver<'a> {
    registry: &'a ServiceRegistry,
}

impl<'a> ConstructorResolver<'a> {
    pub fn new(registry: &'a ServiceRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(
        &self,
        descriptor: &ServiceDescriptor,
        factory: &ServiceFactory,
    ) -> Result<ResolvedDependencies> {
        let mut resolved = Vec::with_capacity(factory.dependencies().len());

        for dependency in factory.dependencies() {
            match self.registry.lookup(dependency) {
                Ok(instance) => {
                    tracing::debug!(
                        "🔗 {} <- {} resolved for '{}'",
                        descriptor.interface,
                        dependency,
                        descriptor.name
                    );
                    resolved.push((dependency.clone(), instance));
                }
                Err(RegistryError::NotFound { .. }) => {
                    return Err(RegistryError::MissingDependency {
                        dependent: descriptor.name.clone(),
                        dependency: dependency.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ResolvedDependencies { resolved })
    }
}
