use crate::domain::model::{PlatformId, ServiceDescriptor};
use std::collections::BTreeSet;
use std::sync::OnceLock;

static HOST_PLATFORM: OnceLock<PlatformId> = OnceLock::new();

/// 編譯目標對應的平台，程序啟動後只計算一次
pub fn host_platform() -> &'static PlatformId {
    HOST_PLATFORM.get_or_init(|| {
        let platform = match std::env::consts::OS {
            "macos" => "osx",
            "ios" => "ios",
            "android" => "android",
            "windows" => "windows",
            "linux" => "linux",
            other => other,
        };
        PlatformId::new(platform)
    })
}

/// 在註冊邊界集中判斷服務是否適用於目前平台
#[derive(Debug, Clone)]
pub struct PlatformGate {
    active: BTreeSet<PlatformId>,
}

impl PlatformGate {
    pub fn new(active: impl Into<PlatformId>) -> Self {
        let mut platforms = BTreeSet::new();
        platforms.insert(active.into());
        Self { active: platforms }
    }

    pub fn detect() -> Self {
        Self::new(host_platform().clone())
    }

    /// 編輯器情境：`editor` 與執行平台同時生效
    pub fn with_editor(mut self, editor: bool) -> Self {
        if editor {
            self.active.insert(PlatformId::editor());
        } else {
            self.active.remove(&PlatformId::editor());
        }
        self
    }

    pub fn active(&self) -> impl Iterator<Item = &PlatformId> {
        self.active.iter()
    }

    pub fn is_editor(&self) -> bool {
        self.active.contains(&PlatformId::editor())
    }

    /// 未列出平台的描述視為全平台適用
    pub fn is_eligible(&self, descriptor: &ServiceDescriptor) -> bool {
        descriptor.platforms.is_empty()
            || descriptor
                .platforms
                .iter()
                .any(|platform| self.active.contains(platform))
    }

    pub fn describe(&self) -> String {
        self.active
            .iter()
            .map(PlatformId::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl Default for PlatformGate {
    fn default() -> Self {
        Self::detect()
    }
}
