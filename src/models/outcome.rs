use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次提交后远程系统的响应分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 申报成功
    Accepted,
    /// 超出分组天数上限，`actual_consumed` 为服务端报告的已用天数，解析不出时为 -1
    QuotaExceeded { actual_consumed: i64 },
    /// 某个申请人在该时段已有申报
    DuplicateRequest { worker_name: String },
    /// 需要先完成认证
    AuthRequired,
    /// 目标不存在
    NotFound,
    /// 没有在等待期内拿到响应，或驱动层的临时故障
    Transient { cause: String },
    /// 无法识别的响应，原文保留给操作员排查
    Unknown { raw: String },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Accepted => OutcomeKind::Accepted,
            Outcome::QuotaExceeded { .. } => OutcomeKind::QuotaExceeded,
            Outcome::DuplicateRequest { .. } => OutcomeKind::DuplicateRequest,
            Outcome::AuthRequired => OutcomeKind::AuthRequired,
            Outcome::NotFound => OutcomeKind::NotFound,
            Outcome::Transient { .. } => OutcomeKind::Transient,
            Outcome::Unknown { .. } => OutcomeKind::Unknown,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accepted => write!(f, "申报成功"),
            Outcome::QuotaExceeded { actual_consumed } if *actual_consumed >= 0 => {
                write!(f, "超出天数上限 (已用 {} 天)", actual_consumed)
            }
            Outcome::QuotaExceeded { .. } => write!(f, "超出天数上限 (已用天数无法解析)"),
            Outcome::DuplicateRequest { worker_name } => {
                write!(f, "{} 在该时段已有申报", worker_name)
            }
            Outcome::AuthRequired => write!(f, "需要先完成认证"),
            Outcome::NotFound => write!(f, "未找到"),
            Outcome::Transient { cause } => write!(f, "临时故障: {}", cause),
            Outcome::Unknown { raw } => write!(f, "未知响应: {}", raw),
        }
    }
}

/// 结果记录里的结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Accepted,
    Skipped,
    NotFound,
    AuthRequired,
    QuotaExceeded,
    DuplicateRequest,
    Transient,
    Unknown,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 8] = [
        OutcomeKind::Accepted,
        OutcomeKind::Skipped,
        OutcomeKind::NotFound,
        OutcomeKind::AuthRequired,
        OutcomeKind::QuotaExceeded,
        OutcomeKind::DuplicateRequest,
        OutcomeKind::Transient,
        OutcomeKind::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Accepted => "accepted",
            OutcomeKind::Skipped => "skipped",
            OutcomeKind::NotFound => "not_found",
            OutcomeKind::AuthRequired => "auth_required",
            OutcomeKind::QuotaExceeded => "quota_exceeded",
            OutcomeKind::DuplicateRequest => "duplicate_request",
            OutcomeKind::Transient => "transient",
            OutcomeKind::Unknown => "unknown",
        }
    }

    pub fn is_accepted(self) -> bool {
        self == OutcomeKind::Accepted
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
