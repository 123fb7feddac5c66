//! SDK 回调分路器
//!
//! 每种广告类型向 SDK 注册一个逻辑监听器。回调在任意线程到达，
//! 分路器按 placement 找到归属会话、推进其状态机、归一化为事件
//! 记录后投入脚本队列。`displayed` 阶段不在这里产生，由执行
//! show 的宿主任务在原生展示完成后立即合成。

use crossbeam_channel::Sender;
use std::sync::Arc;

use crate::backend::{SdkEvent, SdkEventSink};
use crate::event::{AdPhase, AdResponse, EventRecord};
use crate::registry::SessionRegistry;
use crate::session::{AdType, SessionState};

/// 单一广告类型的回调分路器
pub struct DelegateMultiplexer {
    ad_type: AdType,
    registry: Arc<SessionRegistry>,
    events: Sender<EventRecord>,
}

impl DelegateMultiplexer {
    pub fn new(ad_type: AdType, registry: Arc<SessionRegistry>, events: Sender<EventRecord>) -> Self {
        Self {
            ad_type,
            registry,
            events,
        }
    }

    /// 推进会话状态；会话已被移除或类型不符时不做任何事
    fn transition(&self, placement_id: &str, next: SessionState) {
        let ad_type = self.ad_type;
        let applied = self.registry.update(placement_id, |session| {
            if session.ad_type == ad_type {
                session.state = next;
            }
        });

        if !applied {
            log::debug!(
                "sdk callback for unknown placement '{}' ({}), session already removed",
                placement_id,
                ad_type
            );
        }
    }

    fn emit(&self, record: EventRecord) {
        // 队列在 teardown 后关闭；迟到的回调静默丢弃
        if self.events.send(record).is_err() {
            log::debug!("event queue closed, dropping late sdk callback");
        }
    }
}

impl SdkEventSink for DelegateMultiplexer {
    fn on_event(&self, placement_id: &str, event: SdkEvent) {
        match event {
            SdkEvent::AdLoaded => {
                self.transition(placement_id, SessionState::Loaded);
                self.emit(EventRecord::phase(AdPhase::Loaded, self.ad_type, placement_id));
            }
            SdkEvent::AdEmpty => {
                self.transition(placement_id, SessionState::Failed);
                self.emit(EventRecord::failed(
                    self.ad_type,
                    placement_id,
                    AdResponse::NoAdsAvailable,
                ));
            }
            SdkEvent::AdFailedToLoad => {
                self.transition(placement_id, SessionState::Failed);
                self.emit(EventRecord::failed(
                    self.ad_type,
                    placement_id,
                    AdResponse::FailedToLoad,
                ));
            }
            SdkEvent::AdShown => {
                // displayed 由宿主的 show 任务合成，SDK 自己的回调相对
                // 脚本可见顺序到得太晚
            }
            SdkEvent::AdFailedToShow => {
                self.transition(placement_id, SessionState::Failed);
                self.emit(EventRecord::failed(
                    self.ad_type,
                    placement_id,
                    AdResponse::FailedToShow,
                ));
            }
            SdkEvent::AdClicked => {
                self.emit(EventRecord::phase(AdPhase::Clicked, self.ad_type, placement_id));
            }
            SdkEvent::AdClosed => {
                let (next, phase) = if self.ad_type == AdType::Banner {
                    (SessionState::Hidden, AdPhase::Hidden)
                } else {
                    (SessionState::Closed, AdPhase::Closed)
                };
                self.transition(placement_id, next);
                self.emit(EventRecord::phase(phase, self.ad_type, placement_id));
            }
            SdkEvent::AdEnded => {
                self.emit(EventRecord::phase(
                    AdPhase::PlaybackEnded,
                    self.ad_type,
                    placement_id,
                ));
            }
            SdkEvent::AdAlreadyLoaded => {
                self.emit(EventRecord::failed(
                    self.ad_type,
                    placement_id,
                    AdResponse::AlreadyLoaded,
                ));
            }
            SdkEvent::AdRefreshed => {
                self.emit(EventRecord::phase(
                    AdPhase::Refreshed,
                    self.ad_type,
                    placement_id,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AdSession;
    use crossbeam_channel::unbounded;

    fn multiplexer(ad_type: AdType) -> (DelegateMultiplexer, Arc<SessionRegistry>, crossbeam_channel::Receiver<EventRecord>) {
        let registry = Arc::new(SessionRegistry::new());
        let (tx, rx) = unbounded();
        (DelegateMultiplexer::new(ad_type, registry.clone(), tx), registry, rx)
    }

    #[test]
    fn test_loaded_callback_updates_state_and_emits() {
        let (mux, registry, rx) = multiplexer(AdType::Interstitial);
        let mut session = AdSession::new("30473", AdType::Interstitial);
        session.state = SessionState::Loading;
        registry.upsert(session).unwrap();

        mux.on_event("30473", SdkEvent::AdLoaded);

        assert_eq!(registry.get("30473").unwrap().state, SessionState::Loaded);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.phase, AdPhase::Loaded);
        assert_eq!(record.ad_type, Some(AdType::Interstitial));
        assert!(!record.is_error);
    }

    #[test]
    fn test_failed_to_load_maps_response_code() {
        let (mux, registry, rx) = multiplexer(AdType::Video);
        let mut session = AdSession::new("30473", AdType::Video);
        session.state = SessionState::Loading;
        registry.upsert(session).unwrap();

        mux.on_event("30473", SdkEvent::AdFailedToLoad);

        assert_eq!(registry.get("30473").unwrap().state, SessionState::Failed);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.phase, AdPhase::Failed);
        assert_eq!(record.response, Some(AdResponse::FailedToLoad));
        assert!(record.is_error);
    }

    #[test]
    fn test_closed_maps_to_hidden_for_banner() {
        let (mux, _, rx) = multiplexer(AdType::Banner);
        mux.on_event("30473", SdkEvent::AdClosed);
        assert_eq!(rx.try_recv().unwrap().phase, AdPhase::Hidden);

        let (mux, _, rx) = multiplexer(AdType::Video);
        mux.on_event("30473", SdkEvent::AdClosed);
        assert_eq!(rx.try_recv().unwrap().phase, AdPhase::Closed);
    }

    #[test]
    fn test_shown_callback_is_swallowed() {
        let (mux, _, rx) = multiplexer(AdType::Interstitial);
        mux.on_event("30473", SdkEvent::AdShown);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callback_after_removal_still_emits() {
        // 会话已被移除，排队中的通知依旧送达脚本层
        let (mux, registry, rx) = multiplexer(AdType::Banner);
        assert!(registry.is_empty());

        mux.on_event("30473", SdkEvent::AdClosed);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.phase, AdPhase::Hidden);
        assert_eq!(record.placement_id.as_deref(), Some("30473"));
    }
}
