//! 脚本层 API 门面
//!
//! 五个入口：init / load / isLoaded / show / hide。每个调用立即返回，
//! 用法错误在调用边界解决（记日志、调用变空操作），绝不进入异步
//! 管线；SDK 结果通过事件记录异步送达监听器。
//!
//! 入口返回推回脚本栈的值向量；错误路径返回空向量。

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::backend::{AdBackend, LockOrientation, ShowOptions};
use crate::config::AdsConfig;
use crate::dispatch::{event_queue, start_host_driver, BannerRequest, HostCommand, HostQueue};
use crate::error::AdsResult;
use crate::event::EventRecord;
use crate::layout::{BannerPosition, BannerSize, VerticalAlign};
use crate::registry::SessionRegistry;
use crate::session::AdType;

/// 脚本值
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Object(HashMap<String, ScriptValue>),
}

impl ScriptValue {
    /// 脚本层视角的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "table",
        }
    }

    /// 便捷构造键值表
    pub fn object<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ScriptValue)>,
    {
        ScriptValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(value) => Some(value),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// 事件监听器，在脚本线程上被调用
pub type AdListener = Box<dyn FnMut(&EventRecord) + Send>;

fn log_error(signature: &str, message: &str) {
    log::error!("{}, {}", signature, message);
}

fn log_warning(signature: &str, message: &str) {
    log::warn!("{}, {}", signature, message);
}

/// 广告插件
///
/// 由脚本线程独占持有；宿主驱动线程在构造时启动。
pub struct AdsPlugin {
    registry: Arc<SessionRegistry>,
    host: HostQueue,
    events: Receiver<EventRecord>,
    listener: Option<AdListener>,
    config: AdsConfig,
}

impl AdsPlugin {
    pub fn new(backend: Box<dyn AdBackend>) -> Self {
        Self::with_config(backend, AdsConfig::default())
    }

    pub fn with_config(backend: Box<dyn AdBackend>, config: AdsConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let (events_tx, events_rx) = event_queue();
        let host = start_host_driver(backend, registry.clone(), events_tx);

        Self {
            registry,
            host,
            events: events_rx,
            listener: None,
            config,
        }
    }

    /// 从 TOML 配置文件构造，环境变量可覆盖文件内容
    pub fn with_config_file<P: AsRef<Path>>(
        backend: Box<dyn AdBackend>,
        path: P,
    ) -> AdsResult<Self> {
        let mut config = AdsConfig::from_toml_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(Self::with_config(backend, config))
    }

    fn is_sdk_initialized(&self, signature: &str) -> bool {
        if !self.registry.initialized() {
            log_error(
                signature,
                "ads.init() must be called before calling other API functions",
            );
            return false;
        }
        true
    }

    /// [script] ads.init(listener [, options])
    ///
    /// options: testMode (boolean)
    pub fn init(&mut self, listener: AdListener, args: &[ScriptValue]) -> Vec<ScriptValue> {
        const SIG: &str = "ads.init(listener [, options])";

        // init 只允许调用一次
        if self.registry.initialized() {
            log_warning(SIG, "init() should only be called once");
            return Vec::new();
        }

        if args.len() > 1 {
            log_error(
                SIG,
                &format!("Expected 1 or 2 arguments, got {}", args.len() + 1),
            );
            return Vec::new();
        }

        let mut test_mode = self.config.test_mode;

        // nil 的 options 视同未传
        if let Some(options) = args.first().filter(|v| !matches!(v, ScriptValue::Null)) {
            let ScriptValue::Object(table) = options else {
                log_error(
                    SIG,
                    &format!("options (table) expected, got {}", options.type_name()),
                );
                return Vec::new();
            };

            for (key, value) in table {
                match key.as_str() {
                    "testMode" => match value.as_bool() {
                        Some(enabled) => test_mode = enabled,
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.testMode (boolean) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    other => {
                        log_error(SIG, &format!("Invalid option '{}'", other));
                        return Vec::new();
                    }
                }
            }
        }

        self.listener = Some(listener);
        self.registry.set_test_mode(test_mode);
        self.registry.set_initialized(true);

        if let Err(err) = self.host.submit(HostCommand::Init { test_mode }) {
            log::error!("{}", err);
        }

        Vec::new()
    }

    /// [script] ads.load(adUnitType, options)
    ///
    /// options: placementId (string), bannerSize (string), bannerTransparency (boolean)。
    /// 兼容旧形式 ads.load(adUnitType, placementId [, options])，旧 options
    /// 只接受 bannerSize。
    pub fn load(&mut self, args: &[ScriptValue]) -> Vec<ScriptValue> {
        const SIG: &str = "ads.load(adUnitType, options)";

        if !self.is_sdk_initialized(SIG) {
            return Vec::new();
        }

        if args.len() < 2 || args.len() > 3 {
            log_error(
                SIG,
                &format!("Expected 2 or 3 arguments, got {}", args.len()),
            );
            return Vec::new();
        }

        let Some(type_name) = args[0].as_str() else {
            log_error(
                SIG,
                &format!("adUnitType (string) expected, got: {}", args[0].type_name()),
            );
            return Vec::new();
        };

        let Some(ad_type) = AdType::parse(type_name) else {
            log_error(SIG, &format!("adUnitType '{}' invalid", type_name));
            return Vec::new();
        };

        let mut placement_id: Option<String> = None;
        let mut banner_size = self.config.banner_size();
        let mut banner_transparency = self.config.banner_transparency;
        let mut legacy_api = false;

        match &args[1] {
            ScriptValue::String(value) => {
                placement_id = Some(value.clone());
                legacy_api = true;
            }
            ScriptValue::Object(table) => {
                for (key, value) in table {
                    match key.as_str() {
                        "placementId" => match value.as_str() {
                            Some(id) => placement_id = Some(id.to_string()),
                            None => {
                                log_error(
                                    SIG,
                                    &format!(
                                        "options.placementId (string) expected, got: {}",
                                        value.type_name()
                                    ),
                                );
                                return Vec::new();
                            }
                        },
                        "bannerSize" => match value.as_str() {
                            Some(size) => banner_size = self.parse_banner_size(SIG, size),
                            None => {
                                log_error(
                                    SIG,
                                    &format!(
                                        "options.bannerSize (string) expected, got: {}",
                                        value.type_name()
                                    ),
                                );
                                return Vec::new();
                            }
                        },
                        "bannerTransparency" => match value.as_bool() {
                            Some(transparent) => banner_transparency = transparent,
                            None => {
                                log_error(
                                    SIG,
                                    &format!(
                                        "options.bannerTransparency (boolean) expected, got: {}",
                                        value.type_name()
                                    ),
                                );
                                return Vec::new();
                            }
                        },
                        other => {
                            log_error(SIG, &format!("Invalid option '{}'", other));
                            return Vec::new();
                        }
                    }
                }
            }
            other => {
                log_error(
                    SIG,
                    &format!("options (table) expected, got: {}", other.type_name()),
                );
                return Vec::new();
            }
        }

        if legacy_api {
            if let Some(options) = args.get(2).filter(|v| !matches!(v, ScriptValue::Null)) {
                let ScriptValue::Object(table) = options else {
                    log_error(
                        SIG,
                        &format!("options (table) expected, got: {}", options.type_name()),
                    );
                    return Vec::new();
                };

                for (key, value) in table {
                    match key.as_str() {
                        "bannerSize" => match value.as_str() {
                            Some(size) => banner_size = self.parse_banner_size(SIG, size),
                            None => {
                                log_error(
                                    SIG,
                                    &format!(
                                        "options.bannerSize (string) expected, got: {}",
                                        value.type_name()
                                    ),
                                );
                                return Vec::new();
                            }
                        },
                        other => {
                            log_error(SIG, &format!("Invalid option '{}'", other));
                            return Vec::new();
                        }
                    }
                }
            }
        }

        let Some(placement_id) = placement_id else {
            log_error(SIG, "options.placementId (string) expected, got: nil");
            return Vec::new();
        };

        // 同一 placement 换类型是用法错误，在调用边界同步拦下
        let generation = match self.registry.get(&placement_id) {
            Some(existing) if existing.ad_type != ad_type => {
                log_error(
                    SIG,
                    &format!("placementId '{}' is not of type {}", placement_id, ad_type),
                );
                return Vec::new();
            }
            Some(existing) => existing.generation,
            None => 0,
        };

        let banner = (ad_type == AdType::Banner).then_some(BannerRequest {
            size: banner_size,
            transparent: banner_transparency,
        });

        if let Err(err) = self.host.submit(HostCommand::Load {
            placement_id,
            ad_type,
            generation,
            banner,
        }) {
            log::error!("{}", err);
        }

        Vec::new()
    }

    fn parse_banner_size(&self, signature: &str, value: &str) -> BannerSize {
        match BannerSize::parse(value) {
            Some(size) => size,
            None => {
                log_warning(
                    signature,
                    &format!(
                        "options.bannerSize '{}' invalid. Using default {}",
                        value, self.config.default_banner_size
                    ),
                );
                self.config.banner_size()
            }
        }
    }

    /// [script] ads.isLoaded(placementId)
    ///
    /// 同步读取当前可用性，不排宿主队列。
    pub fn is_loaded(&self, args: &[ScriptValue]) -> Vec<ScriptValue> {
        const SIG: &str = "ads.isLoaded(placementId)";

        if !self.is_sdk_initialized(SIG) {
            return Vec::new();
        }

        if args.len() != 1 {
            log_error(SIG, &format!("Expected 1 argument, got {}", args.len()));
            return Vec::new();
        }

        let Some(placement_id) = args[0].as_str() else {
            log_error(
                SIG,
                &format!("placementId (string) expected, got: {}", args[0].type_name()),
            );
            return Vec::new();
        };

        let has_loaded = self
            .registry
            .get(placement_id)
            .map(|session| session.is_available())
            .unwrap_or(false);

        vec![ScriptValue::Bool(has_loaded)]
    }

    /// [script] ads.show(placementId [, options])
    ///
    /// options: useParentalGate, showVideoCloseButton, closeVideoAtEnd,
    /// useSmallClickZone (boolean)；lockOrientation (string)；y (string 或
    /// number)；yAlign (string，旧形式，等价于字符串 y)。
    pub fn show(&mut self, args: &[ScriptValue]) -> Vec<ScriptValue> {
        const SIG: &str = "ads.show(placementId [, options])";

        if !self.is_sdk_initialized(SIG) {
            return Vec::new();
        }

        if args.is_empty() || args.len() > 2 {
            log_error(
                SIG,
                &format!("Expected 1 or 2 arguments, got {}", args.len()),
            );
            return Vec::new();
        }

        let Some(placement_id) = args[0].as_str() else {
            log_error(
                SIG,
                &format!("placementId (string) expected, got: {}", args[0].type_name()),
            );
            return Vec::new();
        };

        let mut options = ShowOptions::default();
        let mut position = BannerPosition::default();

        if let Some(value) = args.get(1).filter(|v| !matches!(v, ScriptValue::Null)) {
            let ScriptValue::Object(table) = value else {
                log_error(
                    SIG,
                    &format!("options (table) expected, got: {}", value.type_name()),
                );
                return Vec::new();
            };

            for (key, value) in table {
                match key.as_str() {
                    "useParentalGate" => match value.as_bool() {
                        Some(enabled) => options.parental_gate = enabled,
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.useParentalGate (boolean) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    "showVideoCloseButton" => match value.as_bool() {
                        Some(enabled) => options.video_close_button = enabled,
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.showVideoCloseButton (boolean) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    "closeVideoAtEnd" => match value.as_bool() {
                        Some(enabled) => options.close_video_at_end = enabled,
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.closeVideoAtEnd (boolean) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    "useSmallClickZone" => match value.as_bool() {
                        Some(enabled) => options.small_click_zone = enabled,
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.useSmallClickZone (boolean) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    "lockOrientation" => match value.as_str() {
                        Some(orientation) => {
                            options.lock_orientation = match LockOrientation::parse(orientation) {
                                Some(lock) => lock,
                                None => {
                                    log_warning(
                                        SIG,
                                        &format!(
                                            "lockOrientation '{}' invalid. Using default 'any' orientation",
                                            orientation
                                        ),
                                    );
                                    LockOrientation::Any
                                }
                            };
                        }
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.lockOrientation (string) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    "y" => match value {
                        ScriptValue::String(align) => {
                            let Some(align) = VerticalAlign::parse(align) else {
                                log_error(SIG, &format!("y '{}' invalid", align));
                                return Vec::new();
                            };
                            position = BannerPosition::Align(align);
                        }
                        ScriptValue::Number(offset) => {
                            position = BannerPosition::Offset(*offset);
                        }
                        other => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.y (string or number) expected, got: {}",
                                    other.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    // 旧形式（请改用 y）
                    "yAlign" => match value.as_str() {
                        Some(align) => {
                            let Some(align) = VerticalAlign::parse(align) else {
                                log_error(SIG, &format!("y '{}' invalid", align));
                                return Vec::new();
                            };
                            position = BannerPosition::Align(align);
                        }
                        None => {
                            log_error(
                                SIG,
                                &format!(
                                    "options.yAlign (string) expected, got: {}",
                                    value.type_name()
                                ),
                            );
                            return Vec::new();
                        }
                    },
                    other => {
                        log_error(SIG, &format!("Invalid option '{}'", other));
                        return Vec::new();
                    }
                }
            }
        }

        let Some(session) = self.registry.get(placement_id) else {
            log_error(SIG, &format!("placementId '{}' not loaded", placement_id));
            return Vec::new();
        };

        if let Err(err) = self.host.submit(HostCommand::Show {
            placement_id: placement_id.to_string(),
            generation: session.generation,
            options,
            position,
        }) {
            log::error!("{}", err);
        }

        Vec::new()
    }

    /// [script] ads.hide(placementId)
    ///
    /// 只有横幅可以隐藏。
    pub fn hide(&mut self, args: &[ScriptValue]) -> Vec<ScriptValue> {
        const SIG: &str = "ads.hide(placementId)";

        if !self.is_sdk_initialized(SIG) {
            return Vec::new();
        }

        if args.len() != 1 {
            log_error(SIG, &format!("Expected 1 argument, got {}", args.len()));
            return Vec::new();
        }

        let Some(placement_id) = args[0].as_str() else {
            log_error(
                SIG,
                &format!("placementId (string) expected, got {}", args[0].type_name()),
            );
            return Vec::new();
        };

        let Some(session) = self.registry.get(placement_id) else {
            log_error(SIG, &format!("placementId '{}' not loaded", placement_id));
            return Vec::new();
        };

        if session.ad_type != AdType::Banner {
            log_error(
                SIG,
                &format!("placementId '{}' is not a banner", placement_id),
            );
            return Vec::new();
        }

        if let Err(err) = self.host.submit(HostCommand::Hide {
            placement_id: placement_id.to_string(),
            generation: session.generation,
        }) {
            log::error!("{}", err);
        }

        Vec::new()
    }

    /// 由脚本线程驱动：按提交顺序投递排队的事件记录，返回投递条数
    pub fn process_events(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(record) = self.events.try_recv() {
            if let Some(listener) = self.listener.as_mut() {
                listener(&record);
            }
            delivered += 1;
        }
        delivered
    }

    /// 插件停机：注销 SDK 监听器、在宿主线程上释放全部原生句柄、
    /// 清空注册表。重复调用是空操作。
    pub fn shutdown(&mut self) {
        if self.host.submit(HostCommand::Teardown).is_err() {
            log::debug!("ads host driver already stopped");
        }
    }

    /// 当前注册表中的会话数
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_value_type_names() {
        assert_eq!(ScriptValue::Null.type_name(), "nil");
        assert_eq!(ScriptValue::Bool(true).type_name(), "boolean");
        assert_eq!(ScriptValue::Number(1.0).type_name(), "number");
        assert_eq!(ScriptValue::String("x".into()).type_name(), "string");
        assert_eq!(ScriptValue::object([]).type_name(), "table");
    }

    #[test]
    fn test_object_builder() {
        let table = ScriptValue::object([
            ("placementId", ScriptValue::String("30473".into())),
            ("bannerTransparency", ScriptValue::Bool(true)),
        ]);

        let ScriptValue::Object(map) = table else {
            panic!("expected table");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map["placementId"].as_str(), Some("30473"));
        assert_eq!(map["bannerTransparency"].as_bool(), Some(true));
    }
}
