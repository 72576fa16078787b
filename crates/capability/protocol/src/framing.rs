//! TCP 拨出帧头编解码。

use crate::error::FramingError;

/// 帧头长度（字节）。
pub const HEADER_LEN: usize = 12;

/// TCP 拨出帧头（全部大端）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialoutHeader {
    pub msg_type: u16,
    pub msg_encap: u16,
    pub msg_hdr_version: u16,
    pub msg_flags: u16,
    pub msg_len: u32,
}

impl DialoutHeader {
    /// 为给定长度的记录构造帧头。超出 `u32` 的长度记为 `u32::MAX`，由 `validate` 拒绝。
    pub fn for_payload(len: usize) -> Self {
        Self {
            msg_len: u32::try_from(len).unwrap_or(u32::MAX),
            ..Self::default()
        }
    }

    pub fn parse(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            msg_type: u16::from_be_bytes([buf[0], buf[1]]),
            msg_encap: u16::from_be_bytes([buf[2], buf[3]]),
            msg_hdr_version: u16::from_be_bytes([buf[4], buf[5]]),
            msg_flags: u16::from_be_bytes([buf[6], buf[7]]),
            msg_len: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&self.msg_type.to_be_bytes());
        buf[2..4].copy_from_slice(&self.msg_encap.to_be_bytes());
        buf[4..6].copy_from_slice(&self.msg_hdr_version.to_be_bytes());
        buf[6..8].copy_from_slice(&self.msg_flags.to_be_bytes());
        buf[8..12].copy_from_slice(&self.msg_len.to_be_bytes());
        buf
    }

    /// 校验帧头，返回需要读取的记录长度。
    ///
    /// 先检查长度再检查标志位；任一失败都不应读取记录体。
    pub fn validate(&self, max_len: usize) -> Result<usize, FramingError> {
        let len = self.msg_len as usize;
        if len > max_len {
            return Err(FramingError::TooLong(self.msg_len));
        }
        if self.msg_flags != 0 {
            return Err(FramingError::InvalidFlags(self.msg_flags));
        }
        Ok(len)
    }
}
