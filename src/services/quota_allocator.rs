//! 配额分配 - 业务能力层
//!
//! 纯函数：给定每人申请天数、人数和分组剩余额度，算出每个人本次能申请多少天。
//! 不认识远程系统，初次尝试和超额重试各调用一次。

/// 分配结果，`days[i]` 对应分组内第 i 个申请人（保持输入顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub days: Vec<u32>,
    /// 是否因额度不足而调整过
    pub adjusted: bool,
}

impl Allocation {
    pub fn total(&self) -> u64 {
        self.days.iter().map(|&d| u64::from(d)).sum()
    }
}

/// 计算分配
///
/// 规则按顺序：
/// 1. 额度 ≤ 0：全部为 0
/// 2. 总申请不超过额度：每人按申请天数
/// 3. 否则每人 `available / n`（整除，余数本次不分配）；
///    若整除结果为 0，则第一个人拿走全部额度（不超过申请天数），其余为 0
pub fn allocate(requested_per_worker: u32, worker_count: usize, available: i64) -> Allocation {
    if worker_count == 0 {
        return Allocation {
            days: Vec::new(),
            adjusted: false,
        };
    }

    if available <= 0 {
        return Allocation {
            days: vec![0; worker_count],
            adjusted: requested_per_worker > 0,
        };
    }

    let requested_total = i64::from(requested_per_worker).saturating_mul(worker_count as i64);
    if requested_total <= available {
        return Allocation {
            days: vec![requested_per_worker; worker_count],
            adjusted: false,
        };
    }

    // 走到这里 available < requested * n，所以 per_worker < requested，不会溢出 u32
    let per_worker = available / worker_count as i64;
    let days = if per_worker > 0 {
        vec![per_worker as u32; worker_count]
    } else {
        let mut days = vec![0; worker_count];
        days[0] = (available as u32).min(requested_per_worker);
        days
    };

    Allocation {
        days,
        adjusted: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_request_fits() {
        let allocation = allocate(14, 3, 42);

        assert_eq!(allocation.days, vec![14, 14, 14]);
        assert!(!allocation.adjusted);
    }

    #[test]
    fn test_exhausted_budget_is_all_zero() {
        assert_eq!(allocate(14, 2, 0).days, vec![0, 0]);
        assert_eq!(allocate(14, 2, -3).days, vec![0, 0]);
        assert!(allocate(14, 2, 0).adjusted);
    }

    #[test]
    fn test_even_split_drops_remainder() {
        // cap=100, consumed=95
        let allocation = allocate(14, 2, 5);

        assert_eq!(allocation.days, vec![2, 2]);
        assert_eq!(allocation.total(), 4);
        assert!(allocation.adjusted);
    }

    #[test]
    fn test_first_worker_takes_all_when_split_is_zero() {
        // cap=100, consumed=99
        let allocation = allocate(14, 2, 1);

        assert_eq!(allocation.days, vec![1, 0]);
    }

    #[test]
    fn test_first_worker_capped_at_request() {
        assert_eq!(allocate(1, 5, 3).days, vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reconciled_budget() {
        // 服务端报告已用 97 天
        assert_eq!(allocate(14, 2, 100 - 97).days, vec![1, 1]);
    }

    #[test]
    fn test_no_workers() {
        let allocation = allocate(14, 0, 50);

        assert!(allocation.days.is_empty());
        assert!(!allocation.adjusted);
    }

    #[test]
    fn test_sum_never_exceeds_available() {
        for requested in [0u32, 1, 5, 14, 100] {
            for n in 0usize..8 {
                for available in -5i64..120 {
                    let allocation = allocate(requested, n, available);
                    assert_eq!(allocation.days.len(), n);
                    assert!(allocation.total() as i64 <= available.max(0));
                    assert!(allocation.days.iter().all(|&d| d <= requested));
                    assert_eq!(allocation, allocate(requested, n, available));
                }
            }
        }
    }
}
