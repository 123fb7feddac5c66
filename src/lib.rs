//! # Game Engine Ads
//!
//! Advertisement integration for game engines with a scripting layer.
//!
//! This crate exposes a small imperative ad API (init/load/isLoaded/show/hide)
//! to an embedded scripting runtime and coordinates the lifecycle of the
//! underlying thread-affine ad SDK objects across three execution contexts:
//! the script thread, a dedicated host thread that owns all native ad
//! objects, and the SDK's own callback threads.
//!
//! ## Modules
//!
//! - [`api`] - Scripting-facing plugin facade
//! - [`session`] - Per-placement ad session state machine
//! - [`registry`] - Shared placement → session registry
//! - [`dispatch`] - Host command queue and script event queue
//! - [`delegate`] - SDK callback demultiplexer
//! - [`backend`] - Opaque ad SDK capability trait
//! - [`layout`] - Banner frame math
//! - [`config`] - Plugin configuration
//!
//! ## Example
//!
//! ```ignore
//! use game_engine_ads::{AdsPlugin, ScriptValue};
//!
//! let mut ads = AdsPlugin::new(backend);
//! ads.init(Box::new(|event| println!("{:?}", event)), &[]);
//! ads.load(&[
//!     ScriptValue::String("interstitial".into()),
//!     ScriptValue::object([("placementId", ScriptValue::String("30473".into()))]),
//! ]);
//! // 每帧由脚本线程驱动事件投递
//! ads.process_events();
//! ```

// Macro for implementing Default trait
#[macro_export]
macro_rules! impl_default {
    ($type:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $type {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// Unified error types for the ads plugin
pub mod error;
/// Normalized lifecycle event records delivered to the script listener
pub mod event;
/// Per-placement ad session state machine
pub mod session;
/// Shared session registry and process-wide flags
pub mod registry;
/// Banner sizing and vertical placement math
pub mod layout;
/// Opaque ad SDK backend trait and callback types
pub mod backend;
/// SDK callback demultiplexer
pub mod delegate;
/// Host-context command queue and script-context event queue
pub mod dispatch;
/// Plugin configuration (TOML/JSON file + env overrides)
pub mod config;
/// Scripting-facing API facade
pub mod api;

// Re-export public APIs
pub use api::{AdListener, AdsPlugin, ScriptValue};
pub use backend::{AdBackend, LockOrientation, SdkEvent, SdkEventSink, ShowOptions};
pub use config::{AdsConfig, ConfigError};
pub use error::{AdsError, AdsResult};
pub use event::{AdPhase, AdResponse, EventRecord, PROVIDER_NAME};
pub use layout::{BannerFrame, BannerPosition, BannerSize, ScreenMetrics, VerticalAlign};
pub use registry::{RegistryError, SessionRegistry};
pub use session::{AdSession, AdType, NativeHandle, SessionState};
