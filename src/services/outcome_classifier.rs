//! 响应分类 - 业务能力层
//!
//! 提交后捕获到的弹窗或页面提示都是自由文本，所有针对这些文本的模式匹配都集中在这里，
//! 对外只暴露一个封闭的 `Outcome` 枚举。

use regex::Regex;

use crate::models::Outcome;

/// 成功提示
const ACCEPTED_PATTERN: &str = r"(?i)(saved\s+successfully|successfully\s+(saved|registered|submitted)|demand\s+(has\s+been\s+)?(registered|saved|submitted)\s+successfully|record\s+(has\s+been\s+)?saved)";
/// 认证前置条件
const AUTH_PATTERN: &str = r"(?i)(session\s+(has\s+)?expired|please\s+log\s*-?in|login\s+(again|required)|not\s+authori[sz]ed|authentication\s+(is\s+)?required|e-?kyc\s+(is\s+)?(pending|required)|aadhaa?r\s+(authentication|verification)\s+(is\s+)?(pending|required))";
/// 超出分组天数上限
const QUOTA_PATTERN: &str = r"(?i)(exceed|more\s+than\s+\d+\s+days|limit\s+of\s+\d+\s+days|\d+\s+days\s+limit|ceiling)";
/// 已用天数：数字在前，如 "97 days already demanded"
const CONSUMED_BEFORE_PATTERN: &str = r"(?i)(\d+)\s*days?\s+(?:(?:has|have)\s+been\s+)?(?:already\s+)?(?:consumed|availed|demanded|provided|taken)";
/// 已用天数：数字在后，如 "already demanded: 97"
const CONSUMED_AFTER_PATTERN: &str = r"(?i)(?:already|consumed|availed)\D{0,40}?(\d+)";
/// 重复申报
const DUPLICATE_PATTERN: &str = r"(?i)is\s+already\s+there";
/// 重复申报中的姓名
const DUPLICATE_NAME_PATTERN: &str = r"(?i)demand\s+of\s+(.+?)(?:\s{2,}|\s+for\s+(?:the\s+)?period|\s+is\s+already\s+there|$)";

/// 响应分类器
pub struct OutcomeClassifier {
    accepted: Regex,
    auth: Regex,
    quota: Regex,
    consumed_before: Regex,
    consumed_after: Regex,
    duplicate: Regex,
    duplicate_name: Regex,
}

impl OutcomeClassifier {
    /// 使用默认模式创建分类器
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            accepted: Regex::new(ACCEPTED_PATTERN)?,
            auth: Regex::new(AUTH_PATTERN)?,
            quota: Regex::new(QUOTA_PATTERN)?,
            consumed_before: Regex::new(CONSUMED_BEFORE_PATTERN)?,
            consumed_after: Regex::new(CONSUMED_AFTER_PATTERN)?,
            duplicate: Regex::new(DUPLICATE_PATTERN)?,
            duplicate_name: Regex::new(DUPLICATE_NAME_PATTERN)?,
        })
    }

    /// 对捕获到的响应分类
    ///
    /// `None` 或空白表示等待期内没有任何响应。
    pub fn classify(&self, response: Option<&str>) -> Outcome {
        let text = match response.map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => {
                return Outcome::Transient {
                    cause: "等待期内未捕获到响应".to_string(),
                }
            }
        };

        if self.accepted.is_match(text) {
            return Outcome::Accepted;
        }

        if self.auth.is_match(text) {
            return Outcome::AuthRequired;
        }

        if self.quota.is_match(text) {
            return Outcome::QuotaExceeded {
                actual_consumed: self.parse_consumed(text).unwrap_or(-1),
            };
        }

        if self.duplicate.is_match(text) {
            if let Some(worker_name) = self.parse_duplicate_name(text) {
                return Outcome::DuplicateRequest { worker_name };
            }
        }

        Outcome::Unknown {
            raw: text.to_string(),
        }
    }

    fn parse_consumed(&self, text: &str) -> Option<i64> {
        [&self.consumed_before, &self.consumed_after]
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|cap| cap.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
    }

    fn parse_duplicate_name(&self, text: &str) -> Option<String> {
        let name = self
            .duplicate_name
            .captures(text)?
            .get(1)?
            .as_str()
            .trim()
            .to_string();

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// 姓名归一化：去掉所有空白并转小写
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// 响应中点名的申请人是否就是这个人（包含即算匹配）
pub fn names_match(named_in_response: &str, worker_name: &str) -> bool {
    let named = normalize_name(named_in_response);
    let worker = normalize_name(worker_name);
    !named.is_empty() && !worker.is_empty() && (worker.contains(&named) || named.contains(&worker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> OutcomeClassifier {
        OutcomeClassifier::new().unwrap()
    }

    #[test]
    fn test_accepted() {
        let c = classifier();

        assert_eq!(c.classify(Some("Demand Saved Successfully")), Outcome::Accepted);
        assert_eq!(
            c.classify(Some("  Record has been saved for 2 applicants ")),
            Outcome::Accepted
        );
    }

    #[test]
    fn test_auth_required() {
        let c = classifier();

        assert_eq!(
            c.classify(Some("Your session has expired. Please login again.")),
            Outcome::AuthRequired
        );
        assert_eq!(
            c.classify(Some("Aadhaar authentication is pending for this applicant")),
            Outcome::AuthRequired
        );
    }

    #[test]
    fn test_quota_exceeded_with_consumed() {
        let c = classifier();

        assert_eq!(
            c.classify(Some("Demand exceeds 100 days limit. 97 days already demanded by household.")),
            Outcome::QuotaExceeded { actual_consumed: 97 }
        );
        assert_eq!(
            c.classify(Some("Cannot demand more than 100 days. Days already consumed: 95")),
            Outcome::QuotaExceeded { actual_consumed: 95 }
        );
    }

    #[test]
    fn test_quota_exceeded_unparsable() {
        let c = classifier();

        assert_eq!(
            c.classify(Some("Household ceiling exceeded")),
            Outcome::QuotaExceeded { actual_consumed: -1 }
        );
    }

    #[test]
    fn test_duplicate_request_names_worker() {
        let c = classifier();

        assert_eq!(
            c.classify(Some(
                "Demand of SITA DEVI  for period 01/04/2025 to 14/04/2025 is already there."
            )),
            Outcome::DuplicateRequest {
                worker_name: "SITA DEVI".to_string()
            }
        );
        assert_eq!(
            c.classify(Some("Demand of Ram Kumar for period 01/04/2025 is already there")),
            Outcome::DuplicateRequest {
                worker_name: "Ram Kumar".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_without_name_is_unknown() {
        let c = classifier();

        assert!(matches!(
            c.classify(Some("Demand is already there")),
            Outcome::Unknown { .. }
        ));
    }

    #[test]
    fn test_no_response_is_transient() {
        let c = classifier();

        assert!(matches!(c.classify(None), Outcome::Transient { .. }));
        assert!(matches!(c.classify(Some("   ")), Outcome::Transient { .. }));
    }

    #[test]
    fn test_anything_else_is_unknown_verbatim() {
        let c = classifier();

        assert_eq!(
            c.classify(Some("Server Error in '/Netnrega' Application.")),
            Outcome::Unknown {
                raw: "Server Error in '/Netnrega' Application.".to_string()
            }
        );
    }

    #[test]
    fn test_names_match_ignores_case_and_spaces() {
        assert!(names_match("SITA  DEVI", "Sita Devi"));
        assert!(names_match("sita", "Sita Devi"));
        assert!(!names_match("Gita", "Sita Devi"));
        assert!(!names_match("", "Sita Devi"));
    }
}
