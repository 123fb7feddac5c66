//! 广告会话状态机
//!
//! 每个 placement 同一时刻最多持有一个会话。会话记录广告单元的当前
//! 状态、原生对象句柄令牌和世代计数。原生句柄只允许宿主线程解引用，
//! 会话本身只保存令牌。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 广告类型（封闭变体，不存在无效字符串状态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Banner,
    Interstitial,
    Video,
}

impl AdType {
    /// 解析脚本层传入的类型字符串
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "banner" => Some(AdType::Banner),
            "interstitial" => Some(AdType::Interstitial),
            "video" => Some(AdType::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Banner => "banner",
            AdType::Interstitial => "interstitial",
            AdType::Video => "video",
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 原生广告对象的句柄令牌
///
/// 令牌由后端在创建原生对象时签发，只有宿主线程可以将其交还后端
/// 进行展示或销毁。脚本线程持有令牌但永远不会解引用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Loaded,
    Displaying,
    Hidden,
    Closed,
    Failed,
}

/// 广告会话
#[derive(Debug, Clone)]
pub struct AdSession {
    /// 注册表键，会话生命周期内不变
    pub placement_id: String,
    /// 创建时固定；同一 placement 换类型重新加载是用法错误
    pub ad_type: AdType,
    pub state: SessionState,
    /// 原生句柄令牌；未加载或已释放时为 None
    pub handle: Option<NativeHandle>,
    /// 横幅显示高度（设备无关单位），加载时确定
    pub height: f32,
    /// 世代计数，会话被替换时递增。宿主任务用它识别过期工作。
    pub generation: u64,
}

impl AdSession {
    pub fn new(placement_id: impl Into<String>, ad_type: AdType) -> Self {
        Self {
            placement_id: placement_id.into(),
            ad_type,
            state: SessionState::Idle,
            handle: None,
            height: 0.0,
            generation: 0,
        }
    }

    /// 当前是否有可展示的广告
    ///
    /// 横幅在展示期间仍然可用；插页和视频在开始播放后即被消耗。
    pub fn is_available(&self) -> bool {
        match self.ad_type {
            AdType::Banner => matches!(self.state, SessionState::Loaded | SessionState::Displaying),
            AdType::Interstitial | AdType::Video => self.state == SessionState::Loaded,
        }
    }

    /// 是否允许释放旧句柄并以新加载替换本会话
    ///
    /// Loading 期间 SDK 可能正在填充句柄，Displaying 期间句柄正被
    /// 展示使用，两者都不允许释放。
    pub fn can_replace(&self) -> bool {
        !matches!(self.state, SessionState::Loading | SessionState::Displaying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_type_parse() {
        assert_eq!(AdType::parse("banner"), Some(AdType::Banner));
        assert_eq!(AdType::parse("interstitial"), Some(AdType::Interstitial));
        assert_eq!(AdType::parse("video"), Some(AdType::Video));
        assert_eq!(AdType::parse("appWall"), None);
    }

    #[test]
    fn test_banner_availability() {
        let mut session = AdSession::new("30473", AdType::Banner);
        assert!(!session.is_available());

        session.state = SessionState::Loaded;
        assert!(session.is_available());

        // 横幅展示期间仍然可用
        session.state = SessionState::Displaying;
        assert!(session.is_available());

        session.state = SessionState::Hidden;
        assert!(!session.is_available());
    }

    #[test]
    fn test_interstitial_availability_consumed_on_display() {
        let mut session = AdSession::new("30473", AdType::Interstitial);
        session.state = SessionState::Loaded;
        assert!(session.is_available());

        session.state = SessionState::Displaying;
        assert!(!session.is_available());
    }

    #[test]
    fn test_replacement_rules() {
        let mut session = AdSession::new("30473", AdType::Video);
        assert!(session.can_replace());

        session.state = SessionState::Loading;
        assert!(!session.can_replace());

        session.state = SessionState::Displaying;
        assert!(!session.can_replace());

        session.state = SessionState::Failed;
        assert!(session.can_replace());

        session.state = SessionState::Closed;
        assert!(session.can_replace());
    }
}
