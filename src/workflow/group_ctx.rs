//! 分组处理上下文
//!
//! 封装"我正在处理哪个子单元下的哪个分组"这一信息

use std::fmt::Display;

/// 分组处理上下文
#[derive(Debug, Clone)]
pub struct GroupCtx {
    /// 子单元（村）代码
    pub sub_unit_key: String,

    /// 分组键（完整卡号）
    pub group_key: String,

    /// 分组短标签，用于下拉框选择
    pub group_label: String,

    /// 分组序号（从1开始，仅用于日志显示）
    pub group_index: usize,

    /// 分组总数
    pub total_groups: usize,
}

impl GroupCtx {
    /// 创建新的分组上下文
    pub fn new(
        sub_unit_key: String,
        group_key: String,
        group_label: String,
        group_index: usize,
        total_groups: usize,
    ) -> Self {
        Self {
            sub_unit_key,
            group_key,
            group_label,
            group_index,
            total_groups,
        }
    }
}

impl Display for GroupCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[子单元 {}][分组 {} {}/{}]",
            self.sub_unit_key, self.group_key, self.group_index, self.total_groups
        )
    }
}
