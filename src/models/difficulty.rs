use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 难度等级（对应布鲁姆层级 1..=3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// 标签 → 难度（已转小写）
static DIFFICULTY_LABELS: phf::Map<&'static str, Difficulty> = phf::phf_map! {
    "easy" => Difficulty::Easy,
    "facil" => Difficulty::Easy,
    "fácil" => Difficulty::Easy,
    "1" => Difficulty::Easy,
    "medium" => Difficulty::Medium,
    "medio" => Difficulty::Medium,
    "media" => Difficulty::Medium,
    "2" => Difficulty::Medium,
    "hard" => Difficulty::Hard,
    "dificil" => Difficulty::Hard,
    "difícil" => Difficulty::Hard,
    "3" => Difficulty::Hard,
};

impl Difficulty {
    /// 布鲁姆层级
    pub fn level(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// 写入提示词的难度描述
    pub fn prompt_label(self) -> &'static str {
        match self {
            Difficulty::Easy => "fácil",
            Difficulty::Medium => "media",
            Difficulty::Hard => "difícil",
        }
    }

    /// 从标签解析，不区分大小写
    pub fn from_label(label: &str) -> Option<Self> {
        DIFFICULTY_LABELS
            .get(label.trim().to_lowercase().as_str())
            .copied()
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// 无法识别的难度标签
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无法识别的难度: {0}")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}
