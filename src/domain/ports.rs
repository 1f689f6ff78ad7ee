use crate::utils::error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// 讓 `Arc<dyn Service>` 可以向下轉型為具體型別
pub trait AsAny: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 長期存在的服務；每個介面只會有一個實例
#[async_trait]
pub trait Service: AsAny {
    /// 註冊完成後依 priority 順序呼叫
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// 以啟動順序的反向呼叫
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
