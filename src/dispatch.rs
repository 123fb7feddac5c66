//! 执行上下文分派
//!
//! 两条互相独立的严格 FIFO 队列：宿主队列承载一切触碰原生广告
//! 对象的操作，由独占后端的宿主线程串行执行；脚本队列承载事件
//! 记录，由脚本线程按提交顺序取走投递。单一宿主队列天然序化了
//! 同一 placement 的全部原生操作，释放/重建竞争由此消除。
//!
//! 调用方提交后即返回，从不等待宿主任务完成。

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

use crate::backend::{AdBackend, ShowOptions};
use crate::delegate::DelegateMultiplexer;
use crate::error::{AdsError, AdsResult};
use crate::event::{AdPhase, AdResponse, EventRecord};
use crate::layout::{resolve_banner_frame, BannerPosition, BannerSize};
use crate::registry::SessionRegistry;
use crate::session::{AdSession, AdType, SessionState};

/// 横幅加载参数
#[derive(Debug, Clone, Copy, Default)]
pub struct BannerRequest {
    pub size: BannerSize,
    pub transparent: bool,
}

/// 宿主线程命令
pub enum HostCommand {
    Init {
        test_mode: bool,
    },
    Load {
        placement_id: String,
        ad_type: AdType,
        /// 提交时观察到的会话世代；0 表示当时没有会话
        generation: u64,
        banner: Option<BannerRequest>,
    },
    Show {
        placement_id: String,
        generation: u64,
        options: ShowOptions,
        position: BannerPosition,
    },
    Hide {
        placement_id: String,
        generation: u64,
    },
    Teardown,
}

/// 宿主命令队列的提交端
#[derive(Clone)]
pub struct HostQueue(Sender<HostCommand>);

impl HostQueue {
    pub fn submit(&self, command: HostCommand) -> AdsResult<()> {
        self.0
            .send(command)
            .map_err(|_| AdsError::Dispatch("host queue disconnected".to_string()))
    }
}

/// 创建脚本事件队列
pub fn event_queue() -> (Sender<EventRecord>, Receiver<EventRecord>) {
    unbounded()
}

/// 启动宿主驱动线程
///
/// 后端被移交给线程独占；返回的队列句柄可以任意克隆。
pub fn start_host_driver(
    mut backend: Box<dyn AdBackend>,
    registry: Arc<SessionRegistry>,
    events: Sender<EventRecord>,
) -> HostQueue {
    let (tx, rx) = unbounded::<HostCommand>();

    std::thread::spawn(move || {
        loop {
            match rx.recv() {
                Ok(HostCommand::Init { test_mode }) => {
                    host_init(backend.as_mut(), &registry, &events, test_mode);
                }
                Ok(HostCommand::Load {
                    placement_id,
                    ad_type,
                    generation,
                    banner,
                }) => {
                    host_load(
                        backend.as_mut(),
                        &registry,
                        &events,
                        &placement_id,
                        ad_type,
                        generation,
                        banner,
                    );
                }
                Ok(HostCommand::Show {
                    placement_id,
                    generation,
                    options,
                    position,
                }) => {
                    host_show(
                        backend.as_mut(),
                        &registry,
                        &events,
                        &placement_id,
                        generation,
                        &options,
                        &position,
                    );
                }
                Ok(HostCommand::Hide {
                    placement_id,
                    generation,
                }) => {
                    host_hide(backend.as_mut(), &registry, &placement_id, generation);
                }
                Ok(HostCommand::Teardown) => {
                    host_teardown(backend.as_mut(), &registry);
                    break;
                }
                Err(_) => {
                    log::info!("host command channel closed");
                    break;
                }
            }
        }
    });

    HostQueue(tx)
}

fn host_init(
    backend: &mut dyn AdBackend,
    registry: &Arc<SessionRegistry>,
    events: &Sender<EventRecord>,
    test_mode: bool,
) {
    // 每种广告类型一个逻辑监听器（横幅、插页、视频）
    for ad_type in [AdType::Banner, AdType::Interstitial, AdType::Video] {
        let sink = Arc::new(DelegateMultiplexer::new(
            ad_type,
            registry.clone(),
            events.clone(),
        ));
        backend.set_event_sink(ad_type, sink);
    }

    backend.initialize(test_mode);

    log::info!(
        "{}: {} (SDK: {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        backend.sdk_version()
    );

    let _ = events.send(EventRecord::init());
}

fn host_load(
    backend: &mut dyn AdBackend,
    registry: &Arc<SessionRegistry>,
    events: &Sender<EventRecord>,
    placement_id: &str,
    ad_type: AdType,
    generation: u64,
    banner: Option<BannerRequest>,
) {
    if let Some(existing) = registry.get(placement_id) {
        if existing.generation != generation {
            log::debug!(
                "load task for placement '{}' superseded (generation {} != {})",
                placement_id,
                generation,
                existing.generation
            );
            return;
        }

        if existing.ad_type != ad_type {
            log::error!(
                "placementId '{}' is not of type {}",
                placement_id,
                ad_type
            );
            return;
        }

        // 已有可用横幅：不释放现有句柄，合成 alreadyLoaded 失败事件
        if ad_type == AdType::Banner && existing.is_available() {
            let _ = events.send(EventRecord::failed(
                AdType::Banner,
                placement_id,
                AdResponse::AlreadyLoaded,
            ));
            return;
        }

        // Loading/Displaying 期间不允许释放句柄
        if !existing.can_replace() {
            log::debug!(
                "placement '{}' busy ({:?}), load ignored",
                placement_id,
                existing.state
            );
            return;
        }

        if let Some(handle) = existing.handle {
            backend.destroy_banner(handle);
        }
    } else if generation != 0 {
        // 提交后会话被移除；按全新加载继续
        log::debug!("placement '{}' removed since load was scheduled", placement_id);
    }

    backend.set_test_mode(registry.test_mode());

    let mut session = AdSession::new(placement_id, ad_type);
    session.state = SessionState::Loading;

    match ad_type {
        AdType::Interstitial => {
            if let Err(err) = registry.upsert(session) {
                log::error!("{}", err);
                return;
            }
            backend.load_interstitial(placement_id);
        }
        AdType::Video => {
            if let Err(err) = registry.upsert(session) {
                log::error!("{}", err);
                return;
            }
            backend.load_video(placement_id);
        }
        AdType::Banner => {
            // 纵向换算比随横竖屏变化，每次加载重算
            let screen = backend.screen();
            registry.set_y_ratio(screen.content_to_px_y);

            let request = banner.unwrap_or_default();
            let view_id = rand::random::<u32>();
            let handle = backend.create_banner(placement_id, view_id, request.transparent);

            session.handle = Some(handle);
            session.height = request.size.height_dp();

            if let Err(err) = registry.upsert(session) {
                log::error!("{}", err);
                backend.destroy_banner(handle);
                return;
            }
            backend.load_banner(handle);
        }
    }
}

fn host_show(
    backend: &mut dyn AdBackend,
    registry: &Arc<SessionRegistry>,
    events: &Sender<EventRecord>,
    placement_id: &str,
    generation: u64,
    options: &ShowOptions,
    position: &BannerPosition,
) {
    let Some(session) = registry.get(placement_id) else {
        log::error!("placementId '{}' not loaded", placement_id);
        return;
    };

    if session.generation != generation {
        log::debug!(
            "show task for placement '{}' superseded, ignored",
            placement_id
        );
        return;
    }

    // 可用性在任务执行时检查，而不是提交时，排除排队期间状态变化
    if !session.is_available() {
        log::error!("placementId '{}' not loaded", placement_id);
        return;
    }

    match session.ad_type {
        AdType::Interstitial => backend.play_interstitial(placement_id, options),
        AdType::Video => backend.play_video(placement_id, options),
        AdType::Banner => {
            let Some(handle) = session.handle else {
                log::error!("placementId '{}' has no banner view", placement_id);
                return;
            };
            let screen = backend.screen();
            let frame = resolve_banner_frame(session.height, position, registry.y_ratio(), &screen);
            backend.show_banner(handle, &frame, options);
        }
    }

    registry.update(placement_id, |s| s.state = SessionState::Displaying);

    // displayed 在宿主侧 show 完成的同时合成；SDK 自己的 shown 回调
    // 相对脚本可见顺序到得太晚
    let _ = events.send(EventRecord::phase(
        AdPhase::Displayed,
        session.ad_type,
        placement_id,
    ));
}

fn host_hide(
    backend: &mut dyn AdBackend,
    registry: &Arc<SessionRegistry>,
    placement_id: &str,
    generation: u64,
) {
    let Some(session) = registry.get(placement_id) else {
        log::debug!("hide task for placement '{}' ignored, no session", placement_id);
        return;
    };

    if session.generation != generation {
        log::debug!(
            "hide task for placement '{}' superseded, ignored",
            placement_id
        );
        return;
    }

    // 收起并销毁原生视图，然后才移除会话
    if let Some(handle) = session.handle {
        backend.close_banner(handle);
        backend.destroy_banner(handle);
    }

    registry.remove(placement_id);
}

fn host_teardown(backend: &mut dyn AdBackend, registry: &Arc<SessionRegistry>) {
    // 先停掉新回调，再释放句柄，最后清空注册表
    backend.detach_listeners();

    for session in registry.drain() {
        if let Some(handle) = session.handle {
            backend.destroy_banner(handle);
        }
    }

    registry.set_initialized(false);
    log::info!("ads host driver shut down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SdkEventSink, ShowOptions};
    use crate::layout::{BannerFrame, ScreenMetrics};
    use crate::session::NativeHandle;
    use std::time::Duration;

    struct NoopBackend;

    impl AdBackend for NoopBackend {
        fn sdk_version(&self) -> String {
            "0.0.0".to_string()
        }
        fn initialize(&mut self, _test_mode: bool) {}
        fn set_event_sink(&mut self, _ad_type: AdType, _sink: Arc<dyn SdkEventSink>) {}
        fn detach_listeners(&mut self) {}
        fn screen(&self) -> ScreenMetrics {
            ScreenMetrics::default()
        }
        fn set_test_mode(&mut self, _enabled: bool) {}
        fn load_interstitial(&mut self, _placement_id: &str) {}
        fn load_video(&mut self, _placement_id: &str) {}
        fn play_interstitial(&mut self, _placement_id: &str, _options: &ShowOptions) {}
        fn play_video(&mut self, _placement_id: &str, _options: &ShowOptions) {}
        fn create_banner(&mut self, _placement_id: &str, _view_id: u32, _transparent: bool) -> NativeHandle {
            NativeHandle(1)
        }
        fn load_banner(&mut self, _handle: NativeHandle) {}
        fn show_banner(&mut self, _handle: NativeHandle, _frame: &BannerFrame, _options: &ShowOptions) {}
        fn close_banner(&mut self, _handle: NativeHandle) {}
        fn destroy_banner(&mut self, _handle: NativeHandle) {}
    }

    #[test]
    fn test_submit_after_teardown_fails() {
        let registry = Arc::new(SessionRegistry::new());
        let (events_tx, _events_rx) = event_queue();
        let queue = start_host_driver(Box::new(NoopBackend), registry, events_tx);

        queue.submit(HostCommand::Teardown).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let result = queue.submit(HostCommand::Teardown);
        assert!(matches!(result, Err(AdsError::Dispatch(_))));
    }

    #[test]
    fn test_load_creates_loading_session() {
        let registry = Arc::new(SessionRegistry::new());
        let (events_tx, _events_rx) = event_queue();
        let queue = start_host_driver(Box::new(NoopBackend), registry.clone(), events_tx);

        queue
            .submit(HostCommand::Load {
                placement_id: "30473".to_string(),
                ad_type: AdType::Interstitial,
                generation: 0,
                banner: None,
            })
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let session = registry.get("30473").unwrap();
        assert_eq!(session.state, SessionState::Loading);
        assert_eq!(session.generation, 1);
    }
}
