use chrono::{Duration, NaiveDate};

/// 页面上日期字段使用的格式
pub const PAGE_DATE_FORMAT: &str = "%d/%m/%Y";

/// 申报的日期范围（含首尾）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub till: NaiveDate,
}

impl DateRange {
    /// 从起始日期起连续 `days` 天；0 天按 1 天处理，避免结束日早于开始日
    pub fn for_days(from: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            from,
            till: from + Duration::days(span),
        }
    }

    pub fn from_text(&self) -> String {
        self.from.format(PAGE_DATE_FORMAT).to_string()
    }

    pub fn till_text(&self) -> String {
        self.till.format(PAGE_DATE_FORMAT).to_string()
    }
}

/// 解析申报日期，支持 `DD/MM/YYYY` 和 `YYYY-MM-DD`
pub fn parse_demand_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, PAGE_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_inclusive() {
        let from = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        let range = DateRange::for_days(from, 14);

        assert_eq!(range.till, NaiveDate::from_ymd_opt(2025, 2, 12).unwrap());
        assert_eq!(range.from_text(), "30/01/2025");
        assert_eq!(range.till_text(), "12/02/2025");
    }

    #[test]
    fn test_parse_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 1);

        assert_eq!(parse_demand_date("01/04/2025"), expected);
        assert_eq!(parse_demand_date(" 2025-04-01 "), expected);
        assert_eq!(parse_demand_date("2025/04/01"), None);
    }
}
