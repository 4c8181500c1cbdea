//! 会话上下文
//!
//! 封装"我正在为哪个助手处理第几个请求"这一信息

use std::fmt::Display;

/// 会话上下文
///
/// 只用于日志定位，不参与业务判断
#[derive(Debug, Clone)]
pub struct SessionCtx {
    /// 助手ID
    pub assistant_id: String,

    /// 请求索引（从1开始，仅用于日志显示）
    pub request_index: usize,
}

impl SessionCtx {
    pub fn new(assistant_id: impl Into<String>, request_index: usize) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            request_index,
        }
    }
}

impl Display for SessionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[请求#{} 助手 {}]", self.request_index, self.assistant_id)
    }
}
