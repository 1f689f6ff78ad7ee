use crate::domain::model::{ConcreteType, InterfaceId};
use crate::utils::error::{RegistryError, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// 未嘗試註冊的原因；這些都不是錯誤
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    PlatformExcluded { active: String },
    ParentNotRegistered { parent: String },
    Aborted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled in configuration"),
            SkipReason::PlatformExcluded { active } => {
                write!(f, "not eligible on platform '{}'", active)
            }
            SkipReason::ParentNotRegistered { parent } => {
                write!(f, "parent service '{}' was not registered", parent)
            }
            SkipReason::Aborted => write!(f, "run aborted by an earlier failure"),
        }
    }
}

#[derive(Debug)]
pub enum RegistrationOutcome {
    Registered,
    Skipped(SkipReason),
    Failed(RegistryError),
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RegistrationOutcome::Skipped(_))
    }

    pub fn error(&self) -> Option<&RegistryError> {
        match self {
            RegistrationOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    fn status(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered => "registered",
            RegistrationOutcome::Skipped(_) => "skipped",
            RegistrationOutcome::Failed(_) => "failed",
        }
    }
}

/// 單一描述的處理結果
#[derive(Debug)]
pub struct RegistrationEntry {
    pub name: String,
    pub interface: InterfaceId,
    pub concrete: ConcreteType,
    pub priority: u32,
    pub parent: Option<String>,
    pub outcome: RegistrationOutcome,
    pub duration: Duration,
}

/// 一次註冊流程的完整報告，順序與設定列表一致（子模組緊接父服務）
#[derive(Debug)]
pub struct RegistrationReport {
    pub execution_id: String,
    pub active_platform: String,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<RegistrationEntry>,
    pub aborted: bool,
}

impl RegistrationReport {
    pub fn new(execution_id: impl Into<String>, active_platform: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            active_platform: active_platform.into(),
            started_at: Utc::now(),
            entries: Vec::new(),
            aborted: false,
        }
    }

    pub fn entry(&self, name: &str) -> Option<&RegistrationEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn registered(&self) -> impl Iterator<Item = &RegistrationEntry> {
        self.entries.iter().filter(|e| e.outcome.is_registered())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RegistrationEntry> {
        self.entries.iter().filter(|e| e.outcome.error().is_some())
    }

    pub fn registered_count(&self) -> usize {
        self.registered().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed_count() == 0
    }

    /// 啟動順序：依 priority 由小到大，同值保留列表順序
    pub fn startup_order(&self) -> Vec<&RegistrationEntry> {
        let mut order: Vec<&RegistrationEntry> = self.registered().collect();
        order.sort_by_key(|entry| entry.priority);
        order
    }

    pub fn summary(&self) -> serde_json::Value {
        let total_duration: Duration = self.entries.iter().map(|e| e.duration).sum();
        json!({
            "execution_id": self.execution_id,
            "active_platform": self.active_platform,
            "started_at": self.started_at.to_rfc3339(),
            "total_descriptors": self.entries.len(),
            "registered": self.registered_count(),
            "skipped": self.skipped_count(),
            "failed": self.failed_count(),
            "aborted": self.aborted,
            "total_duration_ms": total_duration.as_millis() as u64,
            "startup_order": self
                .startup_order()
                .iter()
                .map(|e| e.name.clone())
                .collect::<Vec<_>>(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let entries: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|entry| {
                let detail = match &entry.outcome {
                    RegistrationOutcome::Registered => serde_json::Value::Null,
                    RegistrationOutcome::Skipped(reason) => json!(reason.to_string()),
                    RegistrationOutcome::Failed(error) => json!(error.to_string()),
                };
                json!({
                    "name": entry.name,
                    "interface": entry.interface,
                    "concrete": entry.concrete,
                    "priority": entry.priority,
                    "parent": entry.parent,
                    "status": entry.outcome.status(),
                    "detail": detail,
                    "duration_ms": entry.duration.as_millis() as u64,
                })
            })
            .collect();

        let document = json!({
            "summary": self.summary(),
            "entries": entries,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }
}
