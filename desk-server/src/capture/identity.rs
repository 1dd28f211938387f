//! 错误身份指纹
//!
//! 指纹只覆盖 `(exception_class, file_path, line_number, http_status)`，
//! 刻意排除消息文本：消息里常带插值 ID，变化不代表不同的问题。
//! 缺失分量用空串/零兜底，指纹计算永不失败。

use sha2::{Digest, Sha256};
use shared::models::CapturedError;

/// Stable fingerprint over an error's identity components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorIdentity<'a> {
    pub exception_class: &'a str,
    pub file_path: Option<&'a str>,
    pub line_number: Option<u32>,
    pub http_status: Option<u16>,
}

impl<'a> ErrorIdentity<'a> {
    pub fn of(error: &'a CapturedError) -> Self {
        Self {
            exception_class: &error.exception_class,
            file_path: error.file_path.as_deref(),
            line_number: error.line_number,
            http_status: error.http_status,
        }
    }

    /// 计算 SHA256 指纹
    ///
    /// 设计要点：
    /// - 变长字段后跟 `\x00` 分隔，防止 `("ab","cd")` 与 `("abc","d")` 碰撞
    /// - 定长字段（行号/状态码）用 LE 字节序，缺失时取 0
    /// - Optional 文本用 `\x00`=None / `\x01`+bytes 区分，None 与 Some("") 不碰撞
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.exception_class.as_bytes());
        hasher.update(b"\x00");

        hash_optional(&mut hasher, self.file_path);

        hasher.update(u64::from(self.line_number.unwrap_or(0)).to_le_bytes());
        hasher.update(u64::from(self.http_status.unwrap_or(0)).to_le_bytes());

        hex::encode(hasher.finalize())
    }
}

/// Optional 字段哈希：`\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}
