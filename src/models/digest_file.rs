//! 文稿文件加载
//!
//! 上游的文稿编译器把每日文稿写成 TOML 文件交接给本程序。

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;

use crate::models::WorkItem;

/// 文稿文件的磁盘格式
///
/// 正文既可以内联在 `text` 字段，也可以通过 `text_file` 指向旁边的纯文本文件。
#[derive(Debug, Deserialize)]
struct DigestFile {
    date: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    text_file: Option<String>,
}

/// 从 TOML 文件加载数据并转换为 WorkItem
pub async fn load_digest_file(digest_path: &Path) -> Result<WorkItem> {
    let content = fs::read_to_string(digest_path)
        .await
        .with_context(|| format!("无法读取文稿文件: {}", digest_path.display()))?;

    let digest: DigestFile = toml::from_str(&content)
        .with_context(|| format!("无法解析文稿文件: {}", digest_path.display()))?;

    // 日期必须是合法的 YYYY-MM-DD，产物命名和失败截图都依赖它
    chrono::NaiveDate::parse_from_str(&digest.date, "%Y-%m-%d")
        .with_context(|| format!("文稿日期不合法: {}", digest.date))?;

    let text = match (digest.text, digest.text_file) {
        (Some(text), _) => text,
        (None, Some(rel)) => {
            let text_path = digest_path.parent().unwrap_or_else(|| Path::new(".")).join(&rel);
            fs::read_to_string(&text_path)
                .await
                .with_context(|| format!("无法读取正文文件: {}", text_path.display()))?
        }
        (None, None) => anyhow::bail!(
            "文稿文件缺少正文 (text 或 text_file): {}",
            digest_path.display()
        ),
    };

    if text.trim().is_empty() {
        anyhow::bail!("文稿正文为空: {}", digest_path.display());
    }

    Ok(WorkItem::new(text, digest.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_inline_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "date = \"2026-08-26\"\ntext = \"今日内容\"").unwrap();

        let item = load_digest_file(&path).await.unwrap();
        assert_eq!(item.date, "2026-08-26");
        assert_eq!(item.text, "今日内容");
    }

    #[tokio::test]
    async fn test_load_text_file_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("body.txt"), "正文在旁边的文件里").unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(&path, "date = \"2026-08-26\"\ntext_file = \"body.txt\"\n").unwrap();

        let item = load_digest_file(&path).await.unwrap();
        assert_eq!(item.text, "正文在旁边的文件里");
    }

    #[tokio::test]
    async fn test_reject_bad_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(&path, "date = \"08/26/2026\"\ntext = \"x\"\n").unwrap();

        assert!(load_digest_file(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_reject_missing_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(&path, "date = \"2026-08-26\"\n").unwrap();

        assert!(load_digest_file(&path).await.is_err());
    }
}
