use crate::core::platform::PlatformGate;
use crate::core::sequencer::FailurePolicy;
use crate::domain::model::{PlatformId, ServiceDescriptor};
use crate::utils::error::{RegistryError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_unique_names, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub registry: RegistryInfo,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryInfo {
    pub name: String,
    pub description: Option<String>,
    pub active_platform: Option<String>, // 未設定時偵測執行平台
    pub editor: Option<bool>,
    pub on_failure: Option<String>, // "continue" or "stop"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub export_report: Option<String>,
}

impl RegistryConfig {
    /// 從 TOML 檔案載入服務配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析服務配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RegistryError::ConfigValidationError {
            field: "registry_toml_parsing".to_string(),
            message: format!("Registry TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AUDIO_VOLUME})，未設定的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RegistryError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        self.registry
            .on_failure
            .as_deref()
            .map(str::parse::<FailurePolicy>)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// 建立平台判斷；命令列參數優先於設定檔
    pub fn platform_gate(&self, platform_override: Option<&str>, editor_override: bool) -> PlatformGate {
        let gate = match platform_override.or(self.registry.active_platform.as_deref()) {
            Some(platform) => PlatformGate::new(PlatformId::new(platform)),
            None => PlatformGate::detect(),
        };
        gate.with_editor(editor_override || self.registry.editor.unwrap_or(false))
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 依名稱尋找描述（含子模組）
    pub fn get_service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.all_services().into_iter().find(|d| d.name == name)
    }

    pub fn all_services(&self) -> Vec<&ServiceDescriptor> {
        self.services
            .iter()
            .flat_map(ServiceDescriptor::flatten)
            .collect()
    }

    fn validate_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        validate_non_empty_string("services.name", &descriptor.name)?;
        validate_non_empty_string(
            &format!("services.{}.interface", descriptor.name),
            descriptor.interface.as_str(),
        )?;
        validate_non_empty_string(
            &format!("services.{}.concrete", descriptor.name),
            descriptor.concrete.as_str(),
        )?;

        for platform in &descriptor.platforms {
            validate_non_empty_string(
                &format!("services.{}.platforms", descriptor.name),
                platform.as_str(),
            )?;
        }

        Ok(())
    }
}

impl Validate for RegistryConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("registry.name", &self.registry.name)?;

        if let Some(on_failure) = &self.registry.on_failure {
            validate_one_of("registry.on_failure", on_failure, &["continue", "stop"])?;
        }

        let services = self.all_services();
        for descriptor in &services {
            self.validate_descriptor(descriptor)?;
        }
        validate_unique_names("services.name", services.iter().map(|d| d.name.as_str()))?;

        // 同一介面重複出現不在此拒絕，由 registry 在執行時回報
        let mut seen = std::collections::HashSet::new();
        for descriptor in &services {
            if !seen.insert(&descriptor.interface) {
                tracing::warn!(
                    "⚠️ Interface {} is declared more than once; only the first registration will succeed",
                    descriptor.interface
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[registry]
name = "game-services"
on_failure = "stop"

[[services]]
name = "Audio"
interface = "IAudioService"
concrete = "AudioService"
priority = 10
platforms = ["windows", "linux"]

[services.profile]
volume = 0.8

[[services.modules]]
name = "AudioMixer"
interface = "IAudioMixer"
concrete = "AudioMixer"

[[services]]
name = "Analytics"
interface = "IAnalytics"
concrete = "Analytics"
enabled = false
"#;

    #[test]
    fn test_registry_config_parsing() {
        let config = RegistryConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.registry.name, "game-services");
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].modules.len(), 1);
        assert_eq!(config.services[0].profile.as_ref().unwrap()["volume"], 0.8);
        assert!(!config.services[1].enabled);
        assert_eq!(config.failure_policy().unwrap(), FailurePolicy::Stop);
        assert!(config.get_service("AudioMixer").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = r#"
[registry]
name = "dup"

[[services]]
name = "Audio"
interface = "IAudio"
concrete = "Audio"

[[services.modules]]
name = "Audio"
interface = "IAudioMixer"
concrete = "AudioMixer"
"#;
        let config = RegistryConfig::from_toml_str(content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_interface_is_allowed_at_load_time() {
        let content = r#"
[registry]
name = "dup-interface"

[[services]]
name = "First"
interface = "IAudio"
concrete = "Audio"

[[services]]
name = "Second"
interface = "IAudio"
concrete = "Audio"
"#;
        let config = RegistryConfig::from_toml_str(content).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_failure_policy() {
        let content = r#"
[registry]
name = "bad"
on_failure = "retry"
"#;
        let config = RegistryConfig::from_toml_str(content).unwrap();
        assert!(config.validate().is_err());
        assert!(config.failure_policy().is_err());
    }

    #[test]
    fn test_platform_gate_override() {
        let content = r#"
[registry]
name = "platforms"
active_platform = "android"
editor = true
"#;
        let config = RegistryConfig::from_toml_str(content).unwrap();

        let gate = config.platform_gate(None, false);
        assert_eq!(gate.describe(), "android+editor");

        let gate = config.platform_gate(Some("IOS"), false);
        assert!(gate.active().any(|p| p.as_str() == "ios"));
    }

    #[test]
    fn test_env_substitution_leaves_unknown_vars() {
        let content = r#"
[registry]
name = "${SERVICE_REGISTRY_TEST_SURELY_UNSET}"
"#;
        let config = RegistryConfig::from_toml_str(content).unwrap();
        assert_eq!(config.registry.name, "${SERVICE_REGISTRY_TEST_SURELY_UNSET}");
    }
}
