//! 评分计算 - 业务能力层
//!
//! 只负责分数的本地计算，不关心论述题如何得到分数

use tracing::warn;

use crate::models::{AnswerSubmission, QuestionType};

/// 浮点误差容忍度
const PERCENT_EPSILON: f64 = 1e-9;

/// 客观题判分：去掉首尾空白后不区分大小写比较
///
/// 没有标准答案的题记 0 分。
pub fn score_objective(answer: &AnswerSubmission) -> f64 {
    let Some(expected) = answer.expected_correct.as_deref() else {
        warn!("⚠️ 题目 {} 缺少标准答案，记 0 分", answer.question_id);
        return 0.0;
    };

    if answer.user_response.trim().to_lowercase() == expected.trim().to_lowercase() {
        1.0
    } else {
        0.0
    }
}

/// 论述题得分：`score / 100 * weight`
pub fn essay_points(score: u8, essay_weight: f64) -> f64 {
    f64::from(score.min(100)) / 100.0 * essay_weight
}

/// 满分：客观题每题 1 分，论述题每题 `essay_weight` 分
pub fn max_points(answers: &[AnswerSubmission], essay_weight: f64) -> f64 {
    answers
        .iter()
        .map(|a| match a.question_type {
            QuestionType::Essay => essay_weight,
            _ => 1.0,
        })
        .sum()
}

/// 完成度百分比，向下取整，满分为 0 时返回 0
pub fn completion_percent(points_obtained: f64, max_points: f64) -> u8 {
    if max_points <= 0.0 {
        return 0;
    }
    let percent = (points_obtained / max_points * 100.0 + PERCENT_EPSILON).floor();
    percent.clamp(0.0, 100.0) as u8
}
