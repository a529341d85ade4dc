use crate::error::FileError;
use crate::models::worker::{Roster, Worker};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 姓名列可接受的表头（已归一化）
const NAME_HEADERS: &[&str] = &["nameofapplicant", "applicantname", "name"];
/// 卡号列可接受的表头（已归一化）
const IDENTIFIER_HEADERS: &[&str] = &["jobcardnumber", "jobcardno", "jobcard", "identifier"];

/// 从 CSV 文件加载名册
///
/// 表头匹配忽略大小写和所有空白；姓名或卡号为空的行直接跳过。
pub async fn load_roster_csv(csv_path: &Path) -> Result<Roster> {
    if !fs::try_exists(csv_path).await.unwrap_or(false) {
        return Err(FileError::NotFound {
            path: csv_path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(csv_path)
        .await
        .with_context(|| format!("无法读取名册文件: {}", csv_path.display()))?;

    let roster = parse_roster(&content, &csv_path.display().to_string())?;
    tracing::info!(
        "成功加载名册 {}: {} 名申请人",
        csv_path.file_name().unwrap_or_default().to_string_lossy(),
        roster.len()
    );

    Ok(roster)
}

/// 解析名册内容
pub fn parse_roster(content: &str, source_name: &str) -> Result<Roster> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .with_context(|| format!("无法读取表头: {}", source_name))?
        .clone();

    let name_idx = find_column(&headers, NAME_HEADERS).ok_or_else(|| FileError::MissingColumn {
        path: source_name.to_string(),
        column: "Name of Applicant".to_string(),
    })?;
    let identifier_idx =
        find_column(&headers, IDENTIFIER_HEADERS).ok_or_else(|| FileError::MissingColumn {
            path: source_name.to_string(),
            column: "Job card number".to_string(),
        })?;

    let mut workers = Vec::new();
    for (row_index, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("第 {} 行无法解析: {}", row_index + 2, source_name))?;
        let name = row.get(name_idx).unwrap_or_default().trim();
        let identifier = row.get(identifier_idx).unwrap_or_default().trim();

        if name.is_empty() || identifier.is_empty() {
            tracing::debug!("跳过第 {} 行: 姓名或卡号为空", row_index + 2);
            continue;
        }

        workers.push(Worker::new(name, identifier));
    }

    Ok(Roster::new(workers))
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    candidates
        .iter()
        .find_map(|candidate| normalized.iter().position(|h| h == candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_matching_ignores_case_and_spaces() {
        let content = "S.No, NAME OF  Applicant ,Job Card Number\n\
                       1,Sita Devi,JH-01-002-003-004/12\n\
                       2,,JH-01-002-003-004/13\n\
                       3,Ram Kumar,\n\
                       4,Gita,JH-01-002-003-005/7\n";

        let roster = parse_roster(content, "test.csv").unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.workers()[0].name, "Sita Devi");
        assert_eq!(roster.workers()[1].identifier, "JH-01-002-003-005/7");
        assert!(roster.workers().iter().all(|w| w.selected));
    }

    #[test]
    fn test_missing_identifier_column() {
        let err = parse_roster("Name of Applicant,Village\nSita,Foo\n", "bad.csv").unwrap_err();

        assert!(err.to_string().contains("Job card number"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applicants.csv");
        std::fs::write(&path, "Applicant Name,Jobcard\nA,JH-1-004/1\n").unwrap();

        let roster = load_roster_csv(&path).await.unwrap();

        assert_eq!(roster.len(), 1);
    }
}
