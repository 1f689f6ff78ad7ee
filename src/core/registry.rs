use crate::domain::model::{ConcreteType, InterfaceId, RegisteredService};
use crate::domain::ports::Service;
use crate::utils::error::{RegistryError, Result};
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 服務註冊表：每個介面最多一個實例
///
/// 讀取可並行，register / unregister 之間以及與讀取之間互斥。
/// 不提供全域實例，呼叫端需自行傳遞 `Arc<ServiceRegistry>`。
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<InterfaceId, RegisteredService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 註冊實例；介面已被佔用時回傳 AlreadyRegistered 且不修改狀態
    pub fn register(
        &self,
        interface: InterfaceId,
        instance: Arc<dyn Service>,
        name: impl Into<String>,
    ) -> Result<()> {
        self.commit(RegisteredService {
            interface,
            name: name.into(),
            concrete: None,
            priority: 0,
            instance,
            registered_at: Utc::now(),
        })
    }

    /// 以 Rust 型別 `I` 作為介面鍵註冊
    pub fn register_as<I: ?Sized + 'static>(
        &self,
        instance: Arc<dyn Service>,
        name: impl Into<String>,
    ) -> Result<()> {
        self.register(InterfaceId::of::<I>(), instance, name)
    }

    pub(crate) fn register_descriptor_instance(
        &self,
        interface: InterfaceId,
        name: &str,
        concrete: ConcreteType,
        priority: u32,
        instance: Arc<dyn Service>,
    ) -> Result<()> {
        self.commit(RegisteredService {
            interface,
            name: name.to_string(),
            concrete: Some(concrete),
            priority,
            instance,
            registered_at: Utc::now(),
        })
    }

    fn commit(&self, entry: RegisteredService) -> Result<()> {
        let mut services = self.write_guard("register")?;

        // 檢查與寫入在同一個 write guard 內完成
        if let Some(existing) = services.get(&entry.interface) {
            tracing::warn!(
                "⚠️ Interface {} already registered by '{}', rejecting '{}'",
                entry.interface,
                existing.name,
                entry.name
            );
            return Err(RegistryError::AlreadyRegistered {
                interface: entry.interface.to_string(),
                existing: existing.name.clone(),
            });
        }

        tracing::debug!("📌 Registered {} as '{}'", entry.interface, entry.name);
        services.insert(entry.interface.clone(), entry);
        Ok(())
    }

    pub fn lookup(&self, interface: &InterfaceId) -> Result<Arc<dyn Service>> {
        let services = self.read_guard("lookup")?;
        services
            .get(interface)
            .map(|entry| Arc::clone(&entry.instance))
            .ok_or_else(|| RegistryError::NotFound {
                interface: interface.to_string(),
            })
    }

    /// 查詢並轉型為具體型別
    pub fn lookup_as<T: Any + Send + Sync>(&self, interface: &InterfaceId) -> Result<Arc<T>> {
        let instance = self.lookup(interface)?;
        downcast_instance(interface, instance)
    }

    pub fn unregister(&self, interface: &InterfaceId) -> Result<RegisteredService> {
        let mut services = self.write_guard("unregister")?;
        let removed = services
            .remove(interface)
            .ok_or_else(|| RegistryError::NotFound {
                interface: interface.to_string(),
            })?;

        tracing::info!("🗑️ Unregistered {} ('{}')", interface, removed.name);
        Ok(removed)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<RegisteredService>> {
        let services = self.read_guard("find_by_name")?;
        Ok(services.values().find(|entry| entry.name == name).cloned())
    }

    pub fn contains(&self, interface: &InterfaceId) -> Result<bool> {
        Ok(self.read_guard("contains")?.contains_key(interface))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_guard("len")?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_guard("is_empty")?.is_empty())
    }

    /// 已註冊介面的排序快照
    pub fn interfaces(&self) -> Result<Vec<InterfaceId>> {
        let mut interfaces: Vec<InterfaceId> =
            self.read_guard("interfaces")?.keys().cloned().collect();
        interfaces.sort();
        Ok(interfaces)
    }

    pub fn services(&self) -> Result<Vec<RegisteredService>> {
        let mut entries: Vec<RegisteredService> =
            self.read_guard("services")?.values().cloned().collect();
        entries.sort_by(|a, b| a.interface.cmp(&b.interface));
        Ok(entries)
    }

    /// 程序結束時釋放所有實例，回傳釋放的數量
    pub fn clear(&self) -> Result<usize> {
        let mut services = self.write_guard("clear")?;
        let dropped = services.len();
        services.clear();
        tracing::info!("🧹 Registry cleared ({} services dropped)", dropped);
        Ok(dropped)
    }

    fn read_guard(
        &self,
        operation: &str,
    ) -> Result<RwLockReadGuard<'_, HashMap<InterfaceId, RegisteredService>>> {
        self.services
            .read()
            .map_err(|_| RegistryError::LockPoisoned {
                operation: operation.to_string(),
            })
    }

    fn write_guard(
        &self,
        operation: &str,
    ) -> Result<RwLockWriteGuard<'_, HashMap<InterfaceId, RegisteredService>>> {
        self.services
            .write()
            .map_err(|_| RegistryError::LockPoisoned {
                operation: operation.to_string(),
            })
    }
}

pub(crate) fn downcast_instance<T: Any + Send + Sync>(
    interface: &InterfaceId,
    instance: Arc<dyn Service>,
) -> Result<Arc<T>> {
    instance
        .as_any_arc()
        .downcast::<T>()
        .map_err(|_| RegistryError::TypeMismatch {
            interface: interface.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock {
        ticks: u64,
    }

    impl Service for Clock {}

    struct Logger;

    impl Service for Logger {}

    fn clock(ticks: u64) -> Arc<dyn Service> {
        Arc::new(Clock { ticks })
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ServiceRegistry::new();
        let interface = InterfaceId::new("IClock");
        registry.register(interface.clone(), clock(7), "Clock").unwrap();

        let found: Arc<Clock> = registry.lookup_as(&interface).unwrap();
        assert_eq!(found.ticks, 7);
        assert!(registry.contains(&interface).unwrap());
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_second_registration_is_rejected_and_first_kept() {
        let registry = ServiceRegistry::new();
        let interface = InterfaceId::new("IClock");
        let first = clock(1);
        registry
            .register(interface.clone(), Arc::clone(&first), "First")
            .unwrap();

        let err = registry
            .register(interface.clone(), clock(2), "Second")
            .unwrap_err();
        match err {
            RegistryError::AlreadyRegistered { interface, existing } => {
                assert_eq!(interface, "IClock");
                assert_eq!(existing, "First");
            }
            other => panic!("unexpected error: {other}"),
        }

        let stored = registry.lookup(&interface).unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(registry.len().unwrap(), 1);
        assert_eq!(
            registry.find_by_name("First").unwrap().unwrap().interface,
            interface
        );
        assert!(registry.find_by_name("Second").unwrap().is_none());
    }

    #[test]
    fn test_lookup_missing_interface() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            registry.lookup(&InterfaceId::new("IMissing")),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unregister_frees_interface() {
        let registry = ServiceRegistry::new();
        let interface = InterfaceId::new("IClock");
        registry.register(interface.clone(), clock(1), "Clock").unwrap();

        let removed = registry.unregister(&interface).unwrap();
        assert_eq!(removed.name, "Clock");
        assert!(registry.is_empty().unwrap());
        assert!(matches!(
            registry.unregister(&interface),
            Err(RegistryError::NotFound { .. })
        ));

        // 釋放後可再次註冊
        registry.register(interface, clock(2), "Clock2").unwrap();
    }

    #[test]
    fn test_lookup_as_wrong_type() {
        let registry = ServiceRegistry::new();
        let interface = InterfaceId::new("ILogger");
        registry
            .register(interface.clone(), Arc::new(Logger), "Logger")
            .unwrap();

        assert!(matches!(
            registry.lookup_as::<Clock>(&interface),
            Err(RegistryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_register_as_uses_type_name() {
        let registry = ServiceRegistry::new();
        registry.register_as::<Clock>(clock(3), "Clock").unwrap();

        let found: Arc<Clock> = registry.lookup_as(&InterfaceId::of::<Clock>()).unwrap();
        assert_eq!(found.ticks, 3);
    }

    #[test]
    fn test_interfaces_sorted_and_clear() {
        let registry = ServiceRegistry::new();
        registry.register("IB".into(), clock(1), "B").unwrap();
        registry.register("IA".into(), Arc::new(Logger), "A").unwrap();

        assert_eq!(
            registry.interfaces().unwrap(),
            vec![InterfaceId::new("IA"), InterfaceId::new("IB")]
        );
        assert_eq!(registry.clear().unwrap(), 2);
        assert!(registry.is_empty().unwrap());
    }
}
