use serde::{Deserialize, Serialize};

/// 申请人
///
/// `identifier` 是形如 `JH-01-002-003-004/12345` 的劳动卡号，
/// 子单元和分组都从它推导，推导规则由地区配置决定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub name: String,
    pub identifier: String,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

impl Worker {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            selected: true,
        }
    }

    /// 按规则推导子单元和分组，卡号格式不对时返回 `None`
    pub fn keys(&self, rule: &SubUnitKeyRule) -> Option<WorkerKeys> {
        let identifier = self.identifier.trim();
        if !identifier.contains('/') {
            return None;
        }

        let prefix = identifier.split('/').next()?.trim();
        let group_label = identifier.rsplit('/').next()?.trim();
        if prefix.is_empty() || group_label.is_empty() {
            return None;
        }

        let sub_unit_key = rule.derive(prefix)?;

        Some(WorkerKeys {
            sub_unit_key,
            group_key: identifier.to_string(),
            group_label: group_label.to_string(),
        })
    }

    /// 同一个人的判定：卡号和姓名都相同
    pub fn same_person(&self, identifier: &str, name: &str) -> bool {
        self.identifier.trim() == identifier.trim() && self.name.trim() == name.trim()
    }
}

/// 从卡号推导出的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerKeys {
    /// 子单元（村）代码
    pub sub_unit_key: String,
    /// 分组键，即完整卡号
    pub group_key: String,
    /// 分组在下拉框中的短标签（卡号最后一段）
    pub group_label: String,
}

/// 子单元键推导规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubUnitKeyRule {
    /// 取前缀按分隔符切分后的最后一段
    TrailingSegment {
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    /// 取前缀的最后 n 个字符
    FixedSuffixLength { n: usize },
}

fn default_delimiter() -> char {
    '-'
}

impl Default for SubUnitKeyRule {
    fn default() -> Self {
        SubUnitKeyRule::TrailingSegment {
            delimiter: default_delimiter(),
        }
    }
}

impl SubUnitKeyRule {
    /// 纯字符串变换，推导不出时返回 `None`
    pub fn derive(&self, prefix: &str) -> Option<String> {
        let key = match self {
            SubUnitKeyRule::TrailingSegment { delimiter } => {
                if !prefix.contains(*delimiter) {
                    return None;
                }
                prefix.rsplit(*delimiter).next()?.trim().to_string()
            }
            SubUnitKeyRule::FixedSuffixLength { n } => {
                let count = prefix.chars().count();
                if *n == 0 || count < *n {
                    return None;
                }
                prefix.chars().skip(count - n).collect()
            }
        };

        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

/// 名册
#[derive(Debug, Clone, Default)]
pub struct Roster {
    workers: Vec<Worker>,
}

impl Roster {
    pub fn new(workers: Vec<Worker>) -> Self {
        Self { workers }
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// 被选中的申请人，保持名册顺序
    pub fn selected(&self) -> Vec<Worker> {
        self.workers.iter().filter(|w| w.selected).cloned().collect()
    }

    /// 只重新选中给定的申请人，其余全部取消，返回选中数量
    pub fn reselect(&mut self, failed: &[Worker]) -> usize {
        let mut count = 0;
        for worker in self.workers.iter_mut() {
            worker.selected = failed
                .iter()
                .any(|f| worker.same_person(&f.identifier, &f.name));
            if worker.selected {
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_trailing_segment() {
        let worker = Worker::new("Sita Devi", "JH-01-002-003-004/12345");
        let keys = worker.keys(&SubUnitKeyRule::default()).unwrap();

        assert_eq!(keys.sub_unit_key, "004");
        assert_eq!(keys.group_key, "JH-01-002-003-004/12345");
        assert_eq!(keys.group_label, "12345");
    }

    #[test]
    fn test_keys_fixed_suffix_length() {
        let worker = Worker::new("Ram", "RJ-02-0110034/77");
        let rule = SubUnitKeyRule::FixedSuffixLength { n: 3 };

        assert_eq!(worker.keys(&rule).unwrap().sub_unit_key, "034");
    }

    #[test]
    fn test_keys_malformed_identifier() {
        let rule = SubUnitKeyRule::default();

        assert!(Worker::new("A", "no-slash-here").keys(&rule).is_none());
        assert!(Worker::new("A", "/123").keys(&rule).is_none());
        assert!(Worker::new("A", "JH-01-004/").keys(&rule).is_none());
        assert!(Worker::new("A", "JH01004/12").keys(&rule).is_none());
        assert!(Worker::new("A", "JH-01-/12").keys(&rule).is_none());
        assert!(Worker::new("A", "AB/12")
            .keys(&SubUnitKeyRule::FixedSuffixLength { n: 3 })
            .is_none());
    }

    #[test]
    fn test_reselect_only_failed() {
        let mut roster = Roster::new(vec![
            Worker::new("A", "JH-01-004/1"),
            Worker::new("B", "JH-01-004/1"),
            Worker::new("C", "JH-01-005/2"),
        ]);

        let count = roster.reselect(&[Worker::new("B", "JH-01-004/1")]);

        assert_eq!(count, 1);
        let selected = roster.selected();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "B");
    }

    #[test]
    fn test_rule_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rule: SubUnitKeyRule,
        }

        let parsed: Wrapper = toml::from_str("rule = { kind = \"fixed_suffix_length\", n = 4 }").unwrap();
        assert_eq!(parsed.rule, SubUnitKeyRule::FixedSuffixLength { n: 4 });

        let parsed: Wrapper = toml::from_str("rule = { kind = \"trailing_segment\" }").unwrap();
        assert_eq!(parsed.rule, SubUnitKeyRule::default());
    }
}
