use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 一次调用的工作单元：一份编译好的文稿 + 逻辑日期
///
/// 交给编排层之后不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// 文稿全文
    pub text: String,
    /// 逻辑日期标识（YYYY-MM-DD），用于产物命名和失败截图命名
    pub date: String,
}

impl WorkItem {
    pub fn new(text: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date: date.into(),
        }
    }

    /// 按上限截断文稿
    ///
    /// 上游编译器按优先级从高到低排列内容，因此从尾部丢弃即丢弃
    /// 优先级最低的部分。截断点落在字符边界上，结果是确定性的。
    pub fn truncated_text(&self, max_chars: usize) -> (String, IngestReport) {
        let original_chars = self.text.chars().count();

        if original_chars <= max_chars {
            return (
                self.text.clone(),
                IngestReport {
                    original_chars,
                    submitted_chars: original_chars,
                    truncated: false,
                },
            );
        }

        let submitted: String = self.text.chars().take(max_chars).collect();
        let report = IngestReport {
            original_chars,
            submitted_chars: max_chars,
            truncated: true,
        };
        (submitted, report)
    }
}

/// 文稿摄入报告
///
/// 记录提交给远端应用的文本是否被截断，随产物一并返回给调用方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub original_chars: usize,
    pub submitted_chars: usize,
    pub truncated: bool,
}

/// 可识别的音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
}

impl AudioFormat {
    /// 根据文件头识别格式
    ///
    /// MP3: `ID3` 标签或 0xFFEx 帧同步字；WAV: `RIFF`；M4A: 偏移 4 处的 `ftyp`。
    /// 识别不出即返回 None，调用方视为下载失败。
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.len() >= 3 && &header[..3] == b"ID3" {
            return Some(AudioFormat::Mp3);
        }
        if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0 {
            return Some(AudioFormat::Mp3);
        }
        if header.len() >= 4 && &header[..4] == b"RIFF" {
            return Some(AudioFormat::Wav);
        }
        if header.len() >= 8 && &header[4..8] == b"ftyp" {
            return Some(AudioFormat::M4a);
        }
        None
    }

    /// 产物文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
        }
    }
}

/// 下载成功并通过校验的产物
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub format: AudioFormat,
}

/// 一次生成的完整结果：产物 + 摄入报告
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub artifact: Artifact,
    pub ingest: IngestReport,
}
