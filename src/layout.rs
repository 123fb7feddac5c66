//! 横幅布局计算
//!
//! 把脚本层的尺寸档位和 y 选项换算成设备像素帧。内容坐标到设备
//! 像素的纵向比在每次横幅加载时重算，横竖屏切换会改变它。

use crate::impl_default;

/// 横幅尺寸档位（设备无关单位的高度）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerSize {
    Banner50,
    Banner90,
    Banner250,
}

impl BannerSize {
    /// 解析脚本层传入的档位名；不认识的值返回 None，调用方告警后用默认档
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BANNER_50" => Some(BannerSize::Banner50),
            "BANNER_90" => Some(BannerSize::Banner90),
            "BANNER_250" => Some(BannerSize::Banner250),
            _ => None,
        }
    }

    pub fn height_dp(&self) -> f32 {
        match self {
            BannerSize::Banner50 => 50.0,
            BannerSize::Banner90 => 90.0,
            BannerSize::Banner250 => 250.0,
        }
    }
}

impl Default for BannerSize {
    fn default() -> Self {
        BannerSize::Banner50
    }
}

/// 纵向停靠
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

impl VerticalAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top" => Some(VerticalAlign::Top),
            "center" => Some(VerticalAlign::Center),
            "bottom" => Some(VerticalAlign::Bottom),
            _ => None,
        }
    }
}

/// show() 的 y 选项：命名停靠或内容坐标偏移
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BannerPosition {
    Align(VerticalAlign),
    /// 内容坐标偏移；非负从顶部起算，负值从底部起算
    Offset(f64),
}

impl Default for BannerPosition {
    fn default() -> Self {
        BannerPosition::Offset(0.0)
    }
}

/// 宿主侧屏幕信息，由后端在宿主线程上报告
#[derive(Debug, Clone, Copy)]
pub struct ScreenMetrics {
    /// 设备像素密度
    pub density: f64,
    /// 当前朝向下的屏幕高度（像素）
    pub height_px: u32,
    /// 内容坐标 → 设备像素的纵向比
    pub content_to_px_y: f64,
}

impl_default!(ScreenMetrics {
    density: 1.0,
    height_px: 1920,
    content_to_px_y: 1.0,
});

/// 计算后的横幅帧（宿主线程交给后端布局原生视图）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerFrame {
    pub height_px: u32,
    pub gravity: VerticalAlign,
    pub top_margin_px: u32,
    pub bottom_margin_px: u32,
}

/// 把 y 选项解析成设备帧
///
/// 数值偏移换算成像素后若横幅会部分超出屏幕，钳到另一侧边缘并告警。
pub fn resolve_banner_frame(
    height_dp: f32,
    position: &BannerPosition,
    y_ratio: f64,
    screen: &ScreenMetrics,
) -> BannerFrame {
    let height_px = (height_dp as f64 * screen.density).round() as u32;

    let mut frame = BannerFrame {
        height_px,
        gravity: VerticalAlign::Top,
        top_margin_px: 0,
        bottom_margin_px: 0,
    };

    match position {
        BannerPosition::Align(align) => {
            frame.gravity = *align;
        }
        BannerPosition::Offset(offset) => {
            let y_px = (offset * y_ratio).ceil() as i64;
            let screen_height = screen.height_px as i64;
            let banner_height = height_px as i64;

            if y_px >= 0 {
                // 从顶部起算
                if y_px + banner_height > screen_height {
                    log::warn!("Banner y position off screen. Adjusting position.");
                    frame.gravity = VerticalAlign::Bottom;
                } else {
                    frame.gravity = VerticalAlign::Top;
                    frame.top_margin_px = y_px as u32;
                }
            } else {
                // 从底部起算
                if screen_height - banner_height + y_px < 0 {
                    log::warn!("Banner y position off screen. Adjusting position.");
                    frame.gravity = VerticalAlign::Top;
                } else {
                    frame.gravity = VerticalAlign::Bottom;
                    frame.bottom_margin_px = y_px.unsigned_abs() as u32;
                }
            }
        }
    }

    frame
}
