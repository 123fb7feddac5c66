//! 会话注册表
//!
//! placement → 会话的共享映射，附带进程级配置（testMode、初始化标志、
//! 横幅纵向换算比）。所有读写对并发调用方原子可见；注册表是
//! "placement 是否已知"的唯一事实来源。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::session::{AdSession, AdType};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("placementId '{placement_id}' is not of type {requested}")]
    TypeMismatch {
        placement_id: String,
        requested: AdType,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// 会话注册表
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, AdSession>>,
    initialized: AtomicBool,
    test_mode: AtomicBool,
    /// 内容坐标 → 设备像素的纵向比，每次横幅加载时重算
    y_ratio: Mutex<f64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, AdSession>> {
        self.sessions.lock().expect("session registry lock poisoned")
    }

    /// 读取会话快照
    pub fn get(&self, placement_id: &str) -> Option<AdSession> {
        self.sessions().get(placement_id).cloned()
    }

    /// 插入或替换会话
    ///
    /// 同一 placement 换类型是用法错误，不会静默覆盖。替换时世代
    /// 计数递增；返回新会话的世代。
    pub fn upsert(&self, mut session: AdSession) -> RegistryResult<u64> {
        let mut sessions = self.sessions();

        let generation = match sessions.get(&session.placement_id) {
            Some(existing) => {
                if existing.ad_type != session.ad_type {
                    return Err(RegistryError::TypeMismatch {
                        placement_id: session.placement_id.clone(),
                        requested: session.ad_type,
                    });
                }
                existing.generation + 1
            }
            None => 1,
        };

        session.generation = generation;
        sessions.insert(session.placement_id.clone(), session);
        Ok(generation)
    }

    /// 在锁内原地修改会话，存在时返回 true
    pub fn update<F>(&self, placement_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut AdSession),
    {
        match self.sessions().get_mut(placement_id) {
            Some(session) => {
                mutate(session);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, placement_id: &str) -> Option<AdSession> {
        self.sessions().remove(placement_id)
    }

    /// 取出全部会话并清空映射（teardown 时由宿主线程释放句柄）
    pub fn drain(&self) -> Vec<AdSession> {
        self.sessions().drain().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    pub fn generation_of(&self, placement_id: &str) -> Option<u64> {
        self.sessions().get(placement_id).map(|s| s.generation)
    }

    pub fn initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn set_initialized(&self, value: bool) {
        self.initialized.store(value, Ordering::Release);
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode.load(Ordering::Acquire)
    }

    pub fn set_test_mode(&self, value: bool) {
        self.test_mode.store(value, Ordering::Release);
    }

    pub fn y_ratio(&self) -> f64 {
        *self.y_ratio.lock().expect("y_ratio lock poisoned")
    }

    pub fn set_y_ratio(&self, value: f64) {
        *self.y_ratio.lock().expect("y_ratio lock poisoned") = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    #[test]
    fn test_upsert_assigns_generations() {
        let registry = SessionRegistry::new();

        let gen1 = registry.upsert(AdSession::new("30473", AdType::Banner)).unwrap();
        assert_eq!(gen1, 1);

        let gen2 = registry.upsert(AdSession::new("30473", AdType::Banner)).unwrap();
        assert_eq!(gen2, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_rejects_type_change() {
        let registry = SessionRegistry::new();
        registry.upsert(AdSession::new("30473", AdType::Banner)).unwrap();

        let err = registry
            .upsert(AdSession::new("30473", AdType::Video))
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));

        // 原会话保持不变
        assert_eq!(registry.get("30473").unwrap().ad_type, AdType::Banner);
    }

    #[test]
    fn test_update_in_place() {
        let registry = SessionRegistry::new();
        registry.upsert(AdSession::new("30473", AdType::Interstitial)).unwrap();

        assert!(registry.update("30473", |s| s.state = SessionState::Loaded));
        assert_eq!(registry.get("30473").unwrap().state, SessionState::Loaded);

        assert!(!registry.update("99999", |s| s.state = SessionState::Loaded));
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SessionRegistry::new();
        registry.upsert(AdSession::new("1", AdType::Banner)).unwrap();
        registry.upsert(AdSession::new("2", AdType::Video)).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_distinct_placements_do_not_interfere() {
        let registry = SessionRegistry::new();
        registry.upsert(AdSession::new("p1", AdType::Banner)).unwrap();
        registry.upsert(AdSession::new("p2", AdType::Interstitial)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("p1").unwrap().ad_type, AdType::Banner);
        assert_eq!(registry.get("p2").unwrap().ad_type, AdType::Interstitial);
    }
}
