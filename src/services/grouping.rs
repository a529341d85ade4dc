//! 分组 - 业务能力层
//!
//! 把选中的申请人按 子单元 → 分组 两级归类，组内保持名册顺序（分配时的先后顺序依赖它）。

use crate::models::{SubUnitKeyRule, Worker};

/// 分组：共享同一个天数上限的申请人集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub group_key: String,
    /// 下拉框中的短标签
    pub group_label: String,
    pub workers: Vec<Worker>,
}

/// 子单元：进入其下任何分组之前都要先切换到它
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubUnit {
    pub sub_unit_key: String,
    pub groups: Vec<Group>,
}

impl SubUnit {
    pub fn worker_count(&self) -> usize {
        self.groups.iter().map(|g| g.workers.len()).sum()
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.groups.iter().flat_map(|g| g.workers.iter())
    }
}

/// 分组结果
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// 按首次出现顺序排列的子单元
    pub sub_units: Vec<SubUnit>,
    /// 卡号推导不出键的申请人，直接记为 NotFound
    pub unresolved: Vec<Worker>,
}

impl Grouping {
    pub fn group_count(&self) -> usize {
        self.sub_units.iter().map(|s| s.groups.len()).sum()
    }

    pub fn worker_count(&self) -> usize {
        self.sub_units.iter().map(SubUnit::worker_count).sum::<usize>() + self.unresolved.len()
    }
}

/// 对选中的申请人分组
///
/// 未选中的申请人被忽略；单个卡号格式错误不影响其余申请人。
/// 子单元和分组都按首次出现的顺序排列，保证结果确定。
pub fn group_workers(workers: &[Worker], rule: &SubUnitKeyRule) -> Grouping {
    let mut grouping = Grouping::default();

    for worker in workers.iter().filter(|w| w.selected) {
        let Some(keys) = worker.keys(rule) else {
            tracing::warn!(
                "⚠️ 卡号格式错误，无法推导分组: {} ({})",
                worker.identifier,
                worker.name
            );
            grouping.unresolved.push(worker.clone());
            continue;
        };

        let sub_unit = match grouping
            .sub_units
            .iter_mut()
            .position(|s| s.sub_unit_key == keys.sub_unit_key)
        {
            Some(idx) => &mut grouping.sub_units[idx],
            None => {
                grouping.sub_units.push(SubUnit {
                    sub_unit_key: keys.sub_unit_key.clone(),
                    groups: Vec::new(),
                });
                let last = grouping.sub_units.len() - 1;
                &mut grouping.sub_units[last]
            }
        };

        match sub_unit
            .groups
            .iter_mut()
            .find(|g| g.group_key == keys.group_key)
        {
            Some(group) => group.workers.push(worker.clone()),
            None => sub_unit.groups.push(Group {
                group_key: keys.group_key,
                group_label: keys.group_label,
                workers: vec![worker.clone()],
            }),
        }
    }

    grouping
}
