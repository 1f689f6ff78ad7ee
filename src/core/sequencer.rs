use crate::core::catalog::ServiceCatalog;
use crate::core::graph::DependencyGraph;
use crate::core::platform::PlatformGate;
use crate::core::registry::ServiceRegistry;
use crate::core::report::{RegistrationEntry, RegistrationOutcome, RegistrationReport, SkipReason};
use crate::core::resolver::ConstructorResolver;
use crate::domain::model::ServiceDescriptor;
use crate::utils::error::{RegistryError, Result};
use crate::utils::monitor::SystemMonitor;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// 單一服務失敗後是否繼續處理後續描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Continue,
    Stop,
}

impl FromStr for FailurePolicy {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "stop" => Ok(FailurePolicy::Stop),
            other => Err(RegistryError::InvalidConfigValueError {
                field: "registry.on_failure".to_string(),
                value: other.to_string(),
                reason: "Expected 'continue' or 'stop'".to_string(),
            }),
        }
    }
}

/// 依設定列表順序逐一註冊服務
///
/// 每個描述完整經過 gate -> resolve -> commit 才處理下一個；
/// 註冊順序就是列表順序，priority 只影響之後的啟動順序。
pub struct RegistrationSequencer {
    registry: Arc<ServiceRegistry>,
    catalog: ServiceCatalog,
    gate: PlatformGate,
    policy: FailurePolicy,
    monitor: Option<SystemMonitor>,
    execution_id: Option<String>,
}

/// 單次 run 的可變狀態
struct RunState {
    report: RegistrationReport,
    graph: DependencyGraph,
    halted: bool,
}

impl RegistrationSequencer {
    pub fn new(registry: Arc<ServiceRegistry>, catalog: ServiceCatalog, gate: PlatformGate) -> Self {
        Self {
            registry,
            catalog,
            gate,
            policy: FailurePolicy::default(),
            monitor: None,
            execution_id: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| SystemMonitor::new(true));
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &PlatformGate {
        &self.gate
    }

    /// 處理所有描述並回報每一筆結果
    ///
    /// 只有 registry 本身故障（lock poisoned）才會回傳 Err。
    pub fn run(&self, descriptors: &[ServiceDescriptor]) -> Result<RegistrationReport> {
        let execution_id = self
            .execution_id
            .clone()
            .unwrap_or_else(|| format!("reg_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

        tracing::info!(
            "🚀 Registration {} started: {} descriptors on platform {}",
            execution_id,
            descriptors.len(),
            self.gate.describe()
        );
        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Registration started.");
        }

        let graph = DependencyGraph::build(descriptors, &self.catalog, &self.gate);
        if graph.has_cycle() {
            tracing::warn!(
                "🔁 {} interfaces participate in dependency cycles",
                graph.cycles().len()
            );
        }

        let mut state = RunState {
            report: RegistrationReport::new(execution_id, self.gate.describe()),
            graph,
            halted: false,
        };

        for descriptor in descriptors {
            self.process(descriptor, None, &mut state)?;
        }

        state.report.aborted = state.halted;

        tracing::info!(
            "🏁 Registration {} finished: {} registered, {} skipped, {} failed{}",
            state.report.execution_id,
            state.report.registered_count(),
            state.report.skipped_count(),
            state.report.failed_count(),
            if state.halted { " (aborted)" } else { "" }
        );
        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Registration completed.");
        }

        Ok(state.report)
    }

    fn process(
        &self,
        descriptor: &ServiceDescriptor,
        parent: Option<&str>,
        state: &mut RunState,
    ) -> Result<()> {
        let start_time = Instant::now();

        let outcome = if state.halted {
            RegistrationOutcome::Skipped(SkipReason::Aborted)
        } else if !descriptor.enabled {
            tracing::info!("⏸️ Skipping service: {} (disabled)", descriptor.name);
            RegistrationOutcome::Skipped(SkipReason::Disabled)
        } else if !self.gate.is_eligible(descriptor) {
            tracing::info!(
                "⏭️ Skipping service: {} (not eligible on {})",
                descriptor.name,
                self.gate.describe()
            );
            RegistrationOutcome::Skipped(SkipReason::PlatformExcluded {
                active: self.gate.describe(),
            })
        } else {
            match self.register_one(descriptor, &state.graph) {
                Ok(()) => {
                    tracing::info!(
                        "✅ Service registered: {} as {} (priority {})",
                        descriptor.name,
                        descriptor.interface,
                        descriptor.priority
                    );
                    RegistrationOutcome::Registered
                }
                Err(e @ RegistryError::LockPoisoned { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("❌ Service {} not registered: {}", descriptor.name, e);
                    tracing::debug!("💡 {}", e.recovery_suggestion());
                    if self.policy == FailurePolicy::Stop {
                        tracing::error!("🛑 Stopping registration after failure of {}", descriptor.name);
                        state.halted = true;
                    }
                    RegistrationOutcome::Failed(e)
                }
            }
        };

        let registered = outcome.is_registered();
        state.report.entries.push(RegistrationEntry {
            name: descriptor.name.clone(),
            interface: descriptor.interface.clone(),
            concrete: descriptor.concrete.clone(),
            priority: descriptor.priority,
            parent: parent.map(str::to_string),
            outcome,
            duration: start_time.elapsed(),
        });

        for module in &descriptor.modules {
            if registered {
                self.process(module, Some(descriptor.name.as_str()), state)?;
            } else {
                self.skip_subtree(module, &descriptor.name, state);
            }
        }

        Ok(())
    }

    fn register_one(
        &self,
        descriptor: &ServiceDescriptor,
        graph: &DependencyGraph,
    ) -> Result<()> {
        if let Some(cycle) = graph.cycle_for(descriptor) {
            return Err(RegistryError::CircularDependency {
                service: descriptor.name.clone(),
                cycle: cycle.iter().map(ToString::to_string).collect(),
            });
        }

        let factory =
            self.catalog
                .get(&descriptor.concrete)
                .ok_or_else(|| RegistryError::UnknownConcreteType {
                    service: descriptor.name.clone(),
                    concrete: descriptor.concrete.to_string(),
                })?;

        let dependencies = ConstructorResolver::new(&self.registry).resolve(descriptor, factory)?;

        let instance = factory
            .build(&descriptor.args(), &dependencies)
            .map_err(|e| match e {
                RegistryError::ConstructionFailed { .. } => e,
                other => RegistryError::ConstructionFailed {
                    service: descriptor.name.clone(),
                    details: other.to_string(),
                },
            })?;

        self.registry.register_descriptor_instance(
            descriptor.interface.clone(),
            &descriptor.name,
            descriptor.concrete.clone(),
            descriptor.priority,
            instance,
        )
    }

    fn skip_subtree(&self, descriptor: &ServiceDescriptor, parent: &str, state: &mut RunState) {
        let reason = if state.halted {
            SkipReason::Aborted
        } else {
            SkipReason::ParentNotRegistered {
                parent: parent.to_string(),
            }
        };
        tracing::info!("⏭️ Skipping module: {} ({})", descriptor.name, reason);

        state.report.entries.push(RegistrationEntry {
            name: descriptor.name.clone(),
            interface: descriptor.interface.clone(),
            concrete: descriptor.concrete.clone(),
            priority: descriptor.priority,
            parent: Some(parent.to_string()),
            outcome: RegistrationOutcome::Skipped(reason),
            duration: std::time::Duration::ZERO,
        });

        for module in &descriptor.modules {
            self.skip_subtree(module, &descriptor.name, state);
        }
    }
}
