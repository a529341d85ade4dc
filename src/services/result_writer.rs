//! 结果导出服务 - 业务能力层
//!
//! 只负责把台账快照写成 CSV，不关心流程

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ResultRecord;

/// 结果导出服务
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    /// 创建新的导出服务
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 默认文件名：`Demand_Report_<乡镇>_<日期>.csv`，未配置乡镇时用 `GP`
    pub fn default_file_name(panchayat: Option<&str>) -> String {
        let scope = panchayat
            .map(|p| p.trim().replace(' ', "_"))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "GP".to_string());
        format!(
            "Demand_Report_{}_{}.csv",
            scope,
            Local::now().format("%Y%m%d")
        )
    }

    /// 写出所有记录，返回文件路径
    pub fn write(&self, file_name: &str, records: &[ResultRecord]) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let path = self.output_dir.join(file_name);
        debug!("导出 {} 条结果到 {}", records.len(), path.display());

        write_records(&path, records)?;
        Ok(path)
    }
}

fn write_records(path: &Path, records: &[ResultRecord]) -> AppResult<()> {
    let path_text = path.display().to_string();
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| AppError::file_write_failed(&path_text, e))?;

    if records.is_empty() {
        writer
            .write_record([
                "groupKey",
                "workerName",
                "daysAssigned",
                "outcome",
                "detail",
                "timestamp",
            ])
            .map_err(|e| AppError::file_write_failed(&path_text, e))?;
    }

    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::file_write_failed(&path_text, e))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(&path_text, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutcomeKind, Worker};

    #[test]
    fn test_export_columns() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("out"));
        let worker = Worker::new("Sita Devi", "JH-01-004/12");
        let records = vec![ResultRecord::new(
            &worker,
            "JH-01-004/12",
            14,
            OutcomeKind::Accepted,
            "Demand Saved Successfully",
        )];

        let path = writer.write("report.csv", &records).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let mut lines = content.lines();

        assert_eq!(
            lines.next().unwrap(),
            "groupKey,workerName,daysAssigned,outcome,detail,timestamp"
        );
        assert!(lines
            .next()
            .unwrap()
            .starts_with("JH-01-004/12,Sita Devi,14,accepted,Demand Saved Successfully,"));
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path());

        let path = writer.write("empty.csv", &[]).unwrap();

        assert!(std::fs::read_to_string(path).unwrap().starts_with("groupKey,"));
    }

    #[test]
    fn test_default_file_name() {
        assert!(ResultWriter::default_file_name(Some("Bara Tand")).starts_with("Demand_Report_Bara_Tand_"));
        assert!(ResultWriter::default_file_name(None).starts_with("Demand_Report_GP_"));
    }
}
