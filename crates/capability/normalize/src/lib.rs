//! # 扁平化能力模块
//!
//! 把解码后的字段树转换为有序、确定的扁平指标：
//! - `keys` 子树 → 标签
//! - `content` 子树 → 字段（路径以 `/` 连接）
//! - 厂商形态（表格 / DME 实体）由 [`rules`] 中的匹配器识别
//!
//! 一行失败只影响该行，其他行继续输出。

mod error;
mod flatten;
mod options;
pub mod rules;

pub use error::{NormalizeError, TransformError, TransformErrorKind};
pub use flatten::{Flattened, Flattener, MAX_DEPTH};
pub use options::{FieldConversion, FlattenOptions};
