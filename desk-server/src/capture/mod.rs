//! 错误捕获子系统
//!
//! - [`identity`] - 错误身份指纹（类名 + 源位置 + 状态码）
//! - [`dedup`] - 滑动窗口去重判定
//! - [`pipeline`] - 捕获管线：策略扇出 → 去重落库 → 按策略一次性建单

pub mod dedup;
pub mod identity;
pub mod pipeline;

pub use identity::ErrorIdentity;
pub use pipeline::CapturePipeline;
