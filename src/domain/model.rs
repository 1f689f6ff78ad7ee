use crate::domain::ports::Service;
use crate::utils::error::{RegistryError, Result};
use crate::utils::validation::validate_required_field;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// 介面識別，registry 以此為鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(String);

impl InterfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 以 Rust 型別名稱作為介面識別，供程式碼直接註冊時使用
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterfaceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for InterfaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 具體型別名稱，對應 ServiceCatalog 中的 factory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcreteType(String);

impl ConcreteType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConcreteType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 平台識別，一律轉小寫比較
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlatformId(String);

impl PlatformId {
    pub const EDITOR: &'static str = "editor";

    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    pub fn editor() -> Self {
        Self::new(Self::EDITOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PlatformId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PlatformId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PlatformId> for String {
    fn from(value: PlatformId) -> Self {
        value.0
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_enabled() -> bool {
    true
}

/// 服務描述：要建立什麼、以什麼介面註冊、在哪些平台上可用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub interface: InterfaceId,
    pub concrete: ConcreteType,
    #[serde(default)]
    pub priority: u32,
    /// 空集合代表所有平台皆可
    #[serde(default)]
    pub platforms: BTreeSet<PlatformId>,
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 子模組，於父服務註冊成功後依序註冊
    #[serde(default)]
    pub modules: Vec<ServiceDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        interface: impl Into<InterfaceId>,
        concrete: impl Into<ConcreteType>,
    ) -> Self {
        Self {
            name: name.into(),
            interface: interface.into(),
            concrete: concrete.into(),
            priority: 0,
            platforms: BTreeSet::new(),
            profile: None,
            enabled: true,
            modules: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_platforms<I, P>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlatformId>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_profile(mut self, profile: serde_json::Value) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_module(mut self, module: ServiceDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// 取得建構子固定的前置參數
    pub fn args(&self) -> ServiceArgs {
        ServiceArgs {
            name: self.name.clone(),
            priority: self.priority,
            profile: self.profile.clone(),
        }
    }

    /// 深度優先列出自身與所有子模組
    pub fn flatten(&self) -> Vec<&ServiceDescriptor> {
        let mut all = vec![self];
        for module in &self.modules {
            all.extend(module.flatten());
        }
        all
    }
}

/// 每個 factory 都會收到的固定參數 {name, priority, profile}
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArgs {
    pub name: String,
    pub priority: u32,
    pub profile: Option<serde_json::Value>,
}

impl ServiceArgs {
    /// 將 profile 反序列化為指定型別；沒有 profile 時回傳 None
    pub fn profile_as<T: DeserializeOwned>(&self) -> std::result::Result<Option<T>, serde_json::Error> {
        self.profile
            .as_ref()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// 必須有 profile 的服務使用；缺少時回傳 MissingConfigError
    pub fn require_profile<T: DeserializeOwned>(&self) -> Result<T> {
        let field = format!("services.{}.profile", self.name);
        let profile = validate_required_field(&field, &self.profile)?;
        serde_json::from_value(profile.clone()).map_err(|e| RegistryError::InvalidConfigValueError {
            field,
            value: profile.to_string(),
            reason: e.to_string(),
        })
    }
}

/// 已註冊的服務，只由 ServiceRegistry 持有
#[derive(Clone)]
pub struct RegisteredService {
    pub interface: InterfaceId,
    pub name: String,
    pub concrete: Option<ConcreteType>,
    pub priority: u32,
    pub instance: Arc<dyn Service>,
    pub registered_at: DateTime<Utc>,
}

impl fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredService")
            .field("interface", &self.interface)
            .field("name", &self.name)
            .field("concrete", &self.concrete)
            .field("priority", &self.priority)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}
