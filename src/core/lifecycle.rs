use crate::core::registry::ServiceRegistry;
use crate::core::report::RegistrationReport;
use crate::domain::model::InterfaceId;
use crate::domain::ports::Service;
use crate::utils::error::{RegistryError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 單一服務的 start / stop 結果
#[derive(Debug)]
pub struct LifecycleResult {
    pub name: String,
    pub interface: InterfaceId,
    pub result: Result<()>,
}

/// 註冊完成後的生命週期通知介面
#[async_trait]
pub trait LifecycleNotifier: Send + Sync {
    async fn start_all(
        &self,
        registry: &ServiceRegistry,
        report: &RegistrationReport,
    ) -> Result<Vec<LifecycleResult>>;

    /// 停止所有已啟動的服務，順序與啟動相反
    async fn stop_all(&self) -> Result<Vec<LifecycleResult>>;
}

/// 依 priority 啟動、反向停止
#[derive(Default)]
pub struct PriorityLifecycle {
    started: Mutex<Vec<(String, InterfaceId, Arc<dyn Service>)>>,
}

impl PriorityLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已成功啟動、尚未停止的服務名稱（依啟動順序）
    pub async fn started(&self) -> Vec<String> {
        self.started
            .lock()
            .await
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl LifecycleNotifier for PriorityLifecycle {
    async fn start_all(
        &self,
        registry: &ServiceRegistry,
        report: &RegistrationReport,
    ) -> Result<Vec<LifecycleResult>> {
        let mut results = Vec::new();
        let mut started = self.started.lock().await;

        for entry in report.startup_order() {
            // 服務可能在註冊後被移除或被其他服務取代
            let instance = match registry.find_by_name(&entry.name)? {
                Some(service) if service.interface == entry.interface => service.instance,
                _ => {
                    tracing::warn!(
                        "⚠️ {} no longer registered as {}, not starting",
                        entry.name,
                        entry.interface
                    );
                    continue;
                }
            };

            let result = instance.start().await.map_err(|e| RegistryError::LifecycleFailed {
                service: entry.name.clone(),
                hook: "start".to_string(),
                details: e.to_string(),
            });

            match &result {
                Ok(()) => {
                    tracing::info!("▶️ Started {} (priority {})", entry.name, entry.priority);
                    started.push((entry.name.clone(), entry.interface.clone(), instance));
                }
                Err(e) => tracing::warn!("❌ {}", e),
            }

            results.push(LifecycleResult {
                name: entry.name.clone(),
                interface: entry.interface.clone(),
                result,
            });
        }

        Ok(results)
    }

    async fn stop_all(&self) -> Result<Vec<LifecycleResult>> {
        let mut started = self.started.lock().await;
        let mut results = Vec::with_capacity(started.len());

        while let Some((name, interface, instance)) = started.pop() {
            let result = instance.stop().await.map_err(|e| RegistryError::LifecycleFailed {
                service: name.clone(),
                hook: "stop".to_string(),
                details: e.to_string(),
            });

            match &result {
                Ok(()) => tracing::info!("⏹️ Stopped {}", name),
                Err(e) => tracing::warn!("❌ {}", e),
            }

            results.push(LifecycleResult {
                name,
                interface,
                result,
            });
        }

        Ok(results)
    }
}
