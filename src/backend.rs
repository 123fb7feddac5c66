//! 广告 SDK 后端抽象
//!
//! 把具体广告 SDK 当作不透明能力：按类型加载/展示/关闭/查询可用性，
//! 外加横幅原生视图的创建与销毁。实现被移交给宿主线程独占，所有
//! 方法只会在宿主线程上被调用；回调则可能来自 SDK 的任意线程，
//! 经由 [`SdkEventSink`] 送回。

use std::sync::Arc;

use crate::impl_default;
use crate::layout::{BannerFrame, ScreenMetrics};
use crate::session::{AdType, NativeHandle};

/// SDK 异步回调事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkEvent {
    AdLoaded,
    AdEmpty,
    AdFailedToLoad,
    AdShown,
    AdFailedToShow,
    AdClicked,
    AdClosed,
    AdEnded,
    AdAlreadyLoaded,
    AdRefreshed,
}

/// SDK 回调接收端
///
/// 回调可能并发到达（不同 placement），同一 placement 串行。
pub trait SdkEventSink: Send + Sync {
    fn on_event(&self, placement_id: &str, event: SdkEvent);
}

/// 展示方向锁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockOrientation {
    #[default]
    Any,
    Portrait,
    Landscape,
}

impl LockOrientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "portrait" => Some(LockOrientation::Portrait),
            "landscape" => Some(LockOrientation::Landscape),
            _ => None,
        }
    }
}

/// 展示选项，宿主任务在调用 play 前传给后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOptions {
    pub parental_gate: bool,
    pub small_click_zone: bool,
    pub video_close_button: bool,
    pub close_video_at_end: bool,
    pub lock_orientation: LockOrientation,
}

impl_default!(ShowOptions {
    parental_gate: false,
    small_click_zone: false,
    video_close_button: true,
    close_video_at_end: false,
    lock_orientation: LockOrientation::Any,
});

/// 不透明的广告 SDK 能力
///
/// 插页和视频由 SDK 按 placement 管理，没有句柄；横幅每个实例有
/// 自己的原生视图，由后端签发句柄令牌。
pub trait AdBackend: Send {
    /// SDK 版本串，初始化成功后记录到日志
    fn sdk_version(&self) -> String;

    /// 初始化底层 SDK
    fn initialize(&mut self, test_mode: bool);

    /// 注册某一广告类型的回调接收端
    fn set_event_sink(&mut self, ad_type: AdType, sink: Arc<dyn SdkEventSink>);

    /// 注销全部回调接收端；teardown 的第一步
    fn detach_listeners(&mut self);

    /// 当前朝向下的屏幕信息
    fn screen(&self) -> ScreenMetrics;

    fn set_test_mode(&mut self, enabled: bool);

    fn load_interstitial(&mut self, placement_id: &str);

    fn load_video(&mut self, placement_id: &str);

    fn play_interstitial(&mut self, placement_id: &str, options: &ShowOptions);

    fn play_video(&mut self, placement_id: &str, options: &ShowOptions);

    /// 创建横幅原生视图并返回句柄令牌
    ///
    /// `view_id` 是宿主分配的随机视图 id，规避展示时的视图冲突。
    fn create_banner(&mut self, placement_id: &str, view_id: u32, transparent: bool)
        -> NativeHandle;

    fn load_banner(&mut self, handle: NativeHandle);

    /// 按帧布局并展示横幅
    fn show_banner(&mut self, handle: NativeHandle, frame: &BannerFrame, options: &ShowOptions);

    /// 收起横幅（触发 SDK 的关闭回调）
    fn close_banner(&mut self, handle: NativeHandle);

    /// 销毁横幅原生视图；句柄随之失效
    fn destroy_banner(&mut self, handle: NativeHandle);
}
