//! 知识库服务 - 业务能力层
//!
//! 围绕一个课程单元管理助手、向量库与文档的生命周期。
//! 删除类操作只收集失败，从不中断主流程。

use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use crate::clients::AssistantGateway;
use crate::error::{CleanupReport, RemoteResult, ResourceKind};

/// 一个单元在远程的资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResources {
    pub assistant_id: String,
    pub corpus_id: String,
}

/// 知识库服务
pub struct CorpusService<G: ?Sized> {
    gateway: Arc<G>,
}

impl<G> CorpusService<G>
where
    G: AssistantGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// 为单元创建助手和向量库，并把二者绑定
    pub async fn provision_unit(&self, unit_name: &str) -> RemoteResult<UnitResources> {
        let assistant_id = self.gateway.create_assistant(unit_name).await?;
        let corpus_id = self
            .gateway
            .create_corpus(&format!("Vector {}", assistant_id))
            .await?;
        self.gateway.bind_corpus(&assistant_id, &corpus_id).await?;

        info!("✓ 单元 '{}' 已创建: 助手 {} | 向量库 {}", unit_name, assistant_id, corpus_id);

        Ok(UnitResources {
            assistant_id,
            corpus_id,
        })
    }

    /// 上传文档并重新绑定向量库，返回 file_id
    pub async fn add_document(&self, unit: &UnitResources, filename: &str, bytes: Vec<u8>) -> RemoteResult<String> {
        let file_id = self.gateway.attach_file(&unit.corpus_id, filename, bytes).await?;
        self.gateway.bind_corpus(&unit.assistant_id, &unit.corpus_id).await?;

        info!("✓ 文档 {} 已加入向量库 {} (file_id: {})", filename, unit.corpus_id, file_id);
        Ok(file_id)
    }

    /// 用新文档替换旧文档
    ///
    /// 旧文档删除失败只记入清理报告，新文档上传失败才返回错误。
    pub async fn replace_document(
        &self,
        unit: &UnitResources,
        old_file_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> RemoteResult<(String, CleanupReport)> {
        let report = self.remove_document(old_file_id).await;
        let file_id = self.add_document(unit, filename, bytes).await?;
        Ok((file_id, report))
    }

    /// 删除一个文档
    pub async fn remove_document(&self, file_id: &str) -> CleanupReport {
        let mut report = CleanupReport::new();
        report.record(ResourceKind::File, file_id, self.gateway.delete_file(file_id).await);
        report
    }

    /// 删除单元的全部远程资源：文档、向量库、助手
    ///
    /// 每一步都会执行，失败全部收集到报告中。
    pub async fn teardown_unit(&self, unit: &UnitResources, file_ids: &[String]) -> CleanupReport {
        let mut report = CleanupReport::new();

        let file_results = join_all(file_ids.iter().map(|id| self.gateway.delete_file(id))).await;
        for (id, result) in file_ids.iter().zip(file_results) {
            report.record(ResourceKind::File, id, result);
        }

        let (corpus_result, assistant_result) = futures::join!(
            self.gateway.delete_corpus(&unit.corpus_id),
            self.gateway.delete_assistant(&unit.assistant_id),
        );
        report.record(ResourceKind::Corpus, &unit.corpus_id, corpus_result);
        report.record(ResourceKind::Assistant, &unit.assistant_id, assistant_result);

        if report.is_clean() {
            info!("🧹 单元资源已全部删除: 助手 {}", unit.assistant_id);
        } else {
            info!(
                "🧹 单元资源删除完成，{} 项失败: 助手 {}",
                report.error_count(),
                unit.assistant_id
            );
        }

        report
    }
}
