use serde::{Deserialize, Serialize};

use super::question::QuestionType;

/// 学生对单道题的作答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub question_type: QuestionType,
    pub user_response: String,
    /// 客观题为标准答案，论述题为参考答案
    #[serde(default)]
    pub expected_correct: Option<String>,
    /// 题干，论述题评分提示词需要
    #[serde(default)]
    pub statement: String,
}

impl AnswerSubmission {
    pub fn objective(
        question_id: impl Into<String>,
        question_type: QuestionType,
        user_response: impl Into<String>,
        expected_correct: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_type,
            user_response: user_response.into(),
            expected_correct: Some(expected_correct.into()),
            statement: String::new(),
        }
    }

    pub fn essay(
        question_id: impl Into<String>,
        statement: impl Into<String>,
        user_response: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_type: QuestionType::Essay,
            user_response: user_response.into(),
            expected_correct: None,
            statement: statement.into(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.expected_correct = Some(reference.into());
        self
    }
}

/// 单道论述题的评分反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayFeedback {
    pub question_id: String,
    /// 0..=100
    pub score: u8,
    pub feedback_text: String,
}

/// 一次作答的评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    /// 0..=100
    pub completion_percent: u8,
    pub points_obtained: f64,
    pub max_points: f64,
    pub essay_feedback: Vec<EssayFeedback>,
}

/// 作答表（TOML 文件格式）
///
/// ```toml
/// [[answers]]
/// question_id = "12"
/// question_type = "vf"
/// user_response = "V"
/// expected_correct = "V"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerSheet {
    #[serde(default)]
    pub essay_weight: Option<f64>,
    pub answers: Vec<AnswerSubmission>,
}
