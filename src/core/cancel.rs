use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 单次采集的取消标志
///
/// 克隆共享同一状态：宿主保留一个，另一个交给流水线
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 是否为同一个标志（克隆之间相等）
    pub fn same_as(&self, other: &CancelFlag) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// 门面持有的取消入口
///
/// `cancel()` 作用于正在进行的运行；若运行尚未开始，则作用于下一次运行。
/// 每次运行结束后换上新的标志，旧的取消不会被清除，也不会影响之后的运行。
#[derive(Debug, Default)]
pub struct CancelSlot {
    current: Mutex<CancelFlag>,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CancelFlag> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 即将开始的运行使用的标志
    pub fn begin(&self) -> CancelFlag {
        self.lock().clone()
    }

    pub fn cancel(&self) {
        self.lock().cancel();
    }

    /// 运行结束，后续 cancel 作用于下一次运行
    pub fn finish(&self, flag: &CancelFlag) {
        let mut current = self.lock();
        if current.same_as(flag) {
            *current = CancelFlag::new();
        }
    }
}
