use std::fmt;

use serde::{Deserialize, Serialize};

use super::difficulty::Difficulty;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(alias = "vf")]
    TrueFalse,
    #[serde(alias = "alternativa", alias = "alternativas")]
    MultipleChoice,
    #[serde(alias = "desarrollo")]
    Essay,
}

impl QuestionType {
    /// 是否为本地判分的客观题
    pub fn is_objective(self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::TrueFalse => write!(f, "true_false"),
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::Essay => write!(f, "essay"),
        }
    }
}

/// 一次生成请求的题目数量与难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub true_false: u32,
    pub essay: u32,
    pub multiple_choice: u32,
    pub difficulty: Difficulty,
}

impl QuestionSpec {
    pub fn new(true_false: u32, essay: u32, multiple_choice: u32, difficulty: Difficulty) -> Self {
        Self {
            true_false,
            essay,
            multiple_choice,
            difficulty,
        }
    }

    /// 各难度的默认题量
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::new(2, 1, 2, difficulty),
            Difficulty::Medium => Self::new(2, 2, 2, difficulty),
            Difficulty::Hard => Self::new(1, 3, 1, difficulty),
        }
    }

    pub fn total(&self) -> u32 {
        self.true_false + self.essay + self.multiple_choice
    }

    pub fn count_of(&self, kind: QuestionType) -> u32 {
        match kind {
            QuestionType::TrueFalse => self.true_false,
            QuestionType::MultipleChoice => self.multiple_choice,
            QuestionType::Essay => self.essay,
        }
    }
}

/// 选择题选项，按字母顺序保存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet(Vec<(char, String)>);

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, letter: char, text: impl Into<String>) {
        self.0.push((letter, text.into()));
    }

    pub fn get(&self, letter: char) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, text)| text.as_str())
    }

    pub fn contains(&self, letter: char) -> bool {
        self.get(letter).is_some()
    }

    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().map(|(l, _)| *l)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.0.iter().map(|(l, t)| (*l, t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(char, S)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (char, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, t)| (l, t.into())).collect())
    }
}

/// 生成的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedQuestion {
    TrueFalse {
        statement: String,
        correct: bool,
    },
    Essay {
        statement: String,
        reference_answer: String,
    },
    MultipleChoice {
        statement: String,
        options: OptionSet,
        correct_letter: char,
    },
}

impl GeneratedQuestion {
    pub fn kind(&self) -> QuestionType {
        match self {
            GeneratedQuestion::TrueFalse { .. } => QuestionType::TrueFalse,
            GeneratedQuestion::Essay { .. } => QuestionType::Essay,
            GeneratedQuestion::MultipleChoice { .. } => QuestionType::MultipleChoice,
        }
    }

    pub fn statement(&self) -> &str {
        match self {
            GeneratedQuestion::TrueFalse { statement, .. }
            | GeneratedQuestion::Essay { statement, .. }
            | GeneratedQuestion::MultipleChoice { statement, .. } => statement,
        }
    }

    /// 客观题的标准答案文本（判断题为 "V"/"F"，选择题为字母）
    pub fn expected_answer(&self) -> String {
        match self {
            GeneratedQuestion::TrueFalse { correct, .. } => {
                let answer = if *correct { "V" } else { "F" };
                answer.to_string()
            }
            GeneratedQuestion::Essay { reference_answer, .. } => reference_answer.clone(),
            GeneratedQuestion::MultipleChoice { correct_letter, .. } => correct_letter.to_string(),
        }
    }
}

/// 一次成功生成得到的评测包，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPackage {
    pub name: String,
    pub description: String,
    pub questions: Vec<GeneratedQuestion>,
}

impl EvaluationPackage {
    pub fn count_of(&self, kind: QuestionType) -> usize {
        self.questions.iter().filter(|q| q.kind() == kind).count()
    }

    /// 满分：客观题每题 1 分，论述题每题 `essay_weight` 分
    pub fn max_points(&self, essay_weight: f64) -> f64 {
        self.questions
            .iter()
            .map(|q| if q.kind().is_objective() { 1.0 } else { essay_weight })
            .sum()
    }
}
