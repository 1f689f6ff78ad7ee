use crate::core::platform::PlatformGate;
use crate::core::report::SkipReason;
use crate::domain::model::{InterfaceId, ServiceDescriptor};
use crate::utils::error::Result;
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Attempt,
    /// 前面已有相同介面的描述，預期得到 AlreadyRegistered
    Conflict { interface: InterfaceId },
    Skip(SkipReason),
}

#[derive(Debug, Clone)]
pub struct PlannedEntry {
    pub position: usize,
    pub name: String,
    pub interface: InterfaceId,
    pub priority: u32,
    pub parent: Option<String>,
    pub action: PlannedAction,
}

/// 不需要 factory 的註冊計畫，供 dry run 使用
///
/// 只反映設定本身能決定的部分：啟用狀態、平台、介面衝突與啟動順序。
#[derive(Debug, Clone)]
pub struct RegistrationPlan {
    pub platform: String,
    pub entries: Vec<PlannedEntry>,
}

impl RegistrationPlan {
    pub fn build(descriptors: &[ServiceDescriptor], gate: &PlatformGate) -> Self {
        let mut plan = Self {
            platform: gate.describe(),
            entries: Vec::new(),
        };
        let mut claimed = HashSet::new();

        for descriptor in descriptors {
            plan.visit(descriptor, None, gate, &mut claimed);
        }

        plan
    }

    fn visit(
        &mut self,
        descriptor: &ServiceDescriptor,
        parent: Option<&str>,
        gate: &PlatformGate,
        claimed: &mut HashSet<InterfaceId>,
    ) {
        let action = match parent {
            // 父服務若不會嘗試註冊，子模組一律略過
            Some(parent) if !self.will_attempt(parent) => {
                PlannedAction::Skip(SkipReason::ParentNotRegistered {
                    parent: parent.to_string(),
                })
            }
            _ if !descriptor.enabled => PlannedAction::Skip(SkipReason::Disabled),
            _ if !gate.is_eligible(descriptor) => {
                PlannedAction::Skip(SkipReason::PlatformExcluded {
                    active: gate.describe(),
                })
            }
            _ if !claimed.insert(descriptor.interface.clone()) => PlannedAction::Conflict {
                interface: descriptor.interface.clone(),
            },
            _ => PlannedAction::Attempt,
        };

        self.entries.push(PlannedEntry {
            position: self.entries.len() + 1,
            name: descriptor.name.clone(),
            interface: descriptor.interface.clone(),
            priority: descriptor.priority,
            parent: parent.map(str::to_string),
            action,
        });

        for module in &descriptor.modules {
            self.visit(module, Some(descriptor.name.as_str()), gate, claimed);
        }
    }

    fn will_attempt(&self, name: &str) -> bool {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.name == name)
            .is_some_and(|entry| entry.action == PlannedAction::Attempt)
    }

    pub fn attempts(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.action == PlannedAction::Attempt)
    }

    /// 預期的啟動順序（priority 由小到大，同值保留列表順序）
    pub fn startup_order(&self) -> Vec<&PlannedEntry> {
        let mut order: Vec<&PlannedEntry> = self.attempts().collect();
        order.sort_by_key(|entry| entry.priority);
        order
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let entries: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|entry| {
                let (action, detail) = match &entry.action {
                    PlannedAction::Attempt => ("attempt", None),
                    PlannedAction::Conflict { interface } => {
                        ("conflict", Some(format!("{} already claimed", interface)))
                    }
                    PlannedAction::Skip(reason) => ("skip", Some(reason.to_string())),
                };
                json!({
                    "position": entry.position,
                    "name": entry.name,
                    "interface": entry.interface,
                    "priority": entry.priority,
                    "parent": entry.parent,
                    "action": action,
                    "detail": detail,
                })
            })
            .collect();

        let document = json!({
            "platform": self.platform,
            "entries": entries,
            "startup_order": self
                .startup_order()
                .iter()
                .map(|e| e.name.clone())
                .collect::<Vec<_>>(),
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }
}
