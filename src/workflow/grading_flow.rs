//! 评分流程 - 流程层
//!
//! 核心职责：定义"一次作答"的完整评分流程
//!
//! 流程顺序：
//! 1. 客观题在本地判分
//! 2. 论述题逐题新建会话，由助手打分
//! 3. 汇总为完成度百分比

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clients::AssistantGateway;
use crate::error::{GradingError, RemoteError};
use crate::models::{AnswerSubmission, EssayFeedback, GradingResult, QuestionType};
use crate::services::marker_grammar::build_grading_prompt;
use crate::services::response_parser::{parse_grading_reply, GradingReply};
use crate::services::run_poller::{run_to_completion, PollSettings, RunOutcome};
use crate::services::scoring;

/// 评分流程
///
/// - 论述题按提交顺序依次评分
/// - 任一论述题远程失败即中止，不返回部分结果
pub struct GradingFlow<'a, G: ?Sized> {
    gateway: &'a G,
    poll: PollSettings,
    cancel: CancellationToken,
}

impl<'a, G> GradingFlow<'a, G>
where
    G: AssistantGateway + ?Sized,
{
    pub fn new(gateway: &'a G, poll: PollSettings) -> Self {
        Self {
            gateway,
            poll,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(
        &self,
        assistant_id: &str,
        answers: &[AnswerSubmission],
        essay_weight: f64,
    ) -> Result<GradingResult, GradingError> {
        let max_points = scoring::max_points(answers, essay_weight);
        let mut points_obtained = 0.0;
        let mut essay_feedback = Vec::new();

        for answer in answers {
            match answer.question_type {
                QuestionType::TrueFalse | QuestionType::MultipleChoice => {
                    points_obtained += scoring::score_objective(answer);
                }
                QuestionType::Essay => {
                    let reply = self.grade_essay(assistant_id, answer).await?;
                    points_obtained += scoring::essay_points(reply.score, essay_weight);
                    essay_feedback.push(EssayFeedback {
                        question_id: answer.question_id.clone(),
                        score: reply.score,
                        feedback_text: reply.feedback,
                    });
                }
            }
        }

        let completion_percent = scoring::completion_percent(points_obtained, max_points);
        info!(
            "📊 评分完成: {:.2}/{:.2} 分，完成度 {}%",
            points_obtained, max_points, completion_percent
        );

        Ok(GradingResult {
            completion_percent,
            points_obtained,
            max_points,
            essay_feedback,
        })
    }

    /// 单道论述题评分
    async fn grade_essay(&self, assistant_id: &str, answer: &AnswerSubmission) -> Result<GradingReply, GradingError> {
        let wrap = |source: RemoteError| GradingError::Remote {
            question_id: answer.question_id.clone(),
            source,
        };

        if self.cancel.is_cancelled() {
            return Err(GradingError::Cancelled);
        }

        let prompt = build_grading_prompt(
            &answer.statement,
            answer.expected_correct.as_deref(),
            &answer.user_response,
        );
        let conversation = self.gateway.create_conversation(&prompt).await.map_err(wrap)?;

        let outcome = run_to_completion(self.gateway, &conversation, assistant_id, self.poll, &self.cancel)
            .await
            .map_err(wrap)?;
        if outcome == RunOutcome::Cancelled {
            return Err(GradingError::Cancelled);
        }

        let text = self
            .gateway
            .latest_response_text(&conversation)
            .await
            .map_err(wrap)?;
        let reply = parse_grading_reply(&text);

        debug!("论述题 {} 得分 {}/100", answer.question_id, reply.score);
        Ok(reply)
    }
}
