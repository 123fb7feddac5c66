//! 广告事件模型
//!
//! 将 SDK 回调和宿主任务的结果归一化为发往脚本层的事件记录。
//! 每条记录恰好投递一次，按提交顺序送达监听器。

use serde::Serialize;

use crate::session::AdType;

/// 事件来源标签
pub const PROVIDER_NAME: &str = "adkit";

/// 事件阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdPhase {
    Init,
    Loaded,
    Displayed,
    Refreshed,
    PlaybackEnded,
    Failed,
    Closed,
    Hidden,
    Clicked,
}

impl AdPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdPhase::Init => "init",
            AdPhase::Loaded => "loaded",
            AdPhase::Displayed => "displayed",
            AdPhase::Refreshed => "refreshed",
            AdPhase::PlaybackEnded => "playbackEnded",
            AdPhase::Failed => "failed",
            AdPhase::Closed => "closed",
            AdPhase::Hidden => "hidden",
            AdPhase::Clicked => "clicked",
        }
    }
}

/// 失败响应码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdResponse {
    FailedToLoad,
    FailedToShow,
    AlreadyLoaded,
    NoAdsAvailable,
}

impl AdResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdResponse::FailedToLoad => "failedToLoad",
            AdResponse::FailedToShow => "failedToShow",
            AdResponse::AlreadyLoaded => "alreadyLoaded",
            AdResponse::NoAdsAvailable => "noAdsAvailable",
        }
    }
}

/// 归一化的生命周期通知
///
/// `init` 阶段没有类型和 placement；其余阶段两者都有。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub phase: AdPhase,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ad_type: Option<AdType>,
    #[serde(rename = "placementId", skip_serializing_if = "Option::is_none")]
    pub placement_id: Option<String>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdResponse>,
    pub provider: &'static str,
}

impl EventRecord {
    /// 初始化完成事件
    pub fn init() -> Self {
        Self {
            phase: AdPhase::Init,
            ad_type: None,
            placement_id: None,
            is_error: false,
            response: None,
            provider: PROVIDER_NAME,
        }
    }

    /// 非错误的生命周期事件
    pub fn phase(phase: AdPhase, ad_type: AdType, placement_id: impl Into<String>) -> Self {
        Self {
            phase,
            ad_type: Some(ad_type),
            placement_id: Some(placement_id.into()),
            is_error: false,
            response: None,
            provider: PROVIDER_NAME,
        }
    }

    /// 带响应码的失败事件
    pub fn failed(ad_type: AdType, placement_id: impl Into<String>, response: AdResponse) -> Self {
        Self {
            phase: AdPhase::Failed,
            ad_type: Some(ad_type),
            placement_id: Some(placement_id.into()),
            is_error: true,
            response: Some(response),
            provider: PROVIDER_NAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_record_has_no_placement() {
        let record = EventRecord::init();
        assert_eq!(record.phase, AdPhase::Init);
        assert!(record.ad_type.is_none());
        assert!(record.placement_id.is_none());
        assert!(!record.is_error);
        assert_eq!(record.provider, PROVIDER_NAME);
    }

    #[test]
    fn test_failed_record() {
        let record = EventRecord::failed(AdType::Banner, "30473", AdResponse::AlreadyLoaded);
        assert_eq!(record.phase, AdPhase::Failed);
        assert!(record.is_error);
        assert_eq!(record.response, Some(AdResponse::AlreadyLoaded));
    }

    #[test]
    fn test_record_serialization_keys() {
        let record = EventRecord::phase(AdPhase::Loaded, AdType::Video, "30473");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phase"], "loaded");
        assert_eq!(json["type"], "video");
        assert_eq!(json["placementId"], "30473");
        assert_eq!(json["isError"], false);
        assert_eq!(json["provider"], "adkit");
        assert!(json.get("response").is_none());
    }
}
