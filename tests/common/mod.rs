//! 测试用的内存网关
//!
//! 每个助手有一份脚本，按顺序决定每次运行的结果，所有调用都会被记录下来。

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use assessment_pipeline::clients::{AssistantGateway, ConversationHandle, RunHandle, RunStatus};
use assessment_pipeline::error::{RemoteError, RemoteResult};
use assessment_pipeline::services::PollSettings;
use assessment_pipeline::workflow::SessionOptions;
use async_trait::async_trait;

/// 一次运行的脚本
#[derive(Debug, Clone)]
pub enum Script {
    /// 运行完成，助手回复这段文本
    Reply(String),
    /// 运行以失败状态结束
    RunFails,
    /// 运行永远不结束
    NeverCompletes,
}

pub fn reply(text: &str) -> Script {
    Script::Reply(text.to_string())
}

/// 被记录的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAssistant(String),
    BindCorpus { assistant_id: String, corpus_id: String },
    CreateCorpus(String),
    AttachFile { corpus_id: String, filename: String },
    CreateConversation(String),
    AppendMessage(String),
    Run { conversation: String, assistant_id: String },
    DeleteAssistant(String),
    DeleteCorpus(String),
    DeleteFile(String),
}

struct PendingRun {
    conversation: String,
    assistant_id: String,
    script: Script,
    polls_left: u32,
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<Script>>,
    calls: Vec<Call>,
    next_id: u32,
    runs: HashMap<String, PendingRun>,
    latest: HashMap<String, String>,
    failing_deletes: HashSet<String>,
    busy_assistants: HashSet<String>,
    overlap_detected: bool,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<State>,
    /// 每次运行在完成前返回 Pending 的次数
    pending_polls: u32,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn script(self, assistant_id: &str, scripts: impl IntoIterator<Item = Script>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(assistant_id.to_string())
            .or_default()
            .extend(scripts);
        self
    }

    /// 删除这个 id 时返回错误
    pub fn fail_delete(self, id: &str) -> Self {
        self.state.lock().unwrap().failing_deletes.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matcher(c)).count()
    }

    /// 运行调用使用的会话，按调用顺序
    pub fn run_conversations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Run { conversation, .. } => Some(conversation),
                _ => None,
            })
            .collect()
    }

    /// 是否出现过同一助手同时有两个运行
    pub fn overlap_detected(&self) -> bool {
        self.state.lock().unwrap().overlap_detected
    }

    fn next_id(state: &mut State, prefix: &str) -> String {
        state.next_id += 1;
        format!("{}_{}", prefix, state.next_id)
    }

    fn delete(&self, call: Call, id: &str, operation: &'static str) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing_deletes.contains(id) {
            Err(RemoteError::Rejected {
                operation,
                message: format!("{} 删除失败", id),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AssistantGateway for FakeGateway {
    async fn create_assistant(&self, name: &str) -> RemoteResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateAssistant(name.to_string()));
        Ok(Self::next_id(&mut state, "asst"))
    }

    async fn bind_corpus(&self, assistant_id: &str, corpus_id: &str) -> RemoteResult<()> {
        self.state.lock().unwrap().calls.push(Call::BindCorpus {
            assistant_id: assistant_id.to_string(),
            corpus_id: corpus_id.to_string(),
        });
        Ok(())
    }

    async fn create_corpus(&self, name: &str) -> RemoteResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateCorpus(name.to_string()));
        Ok(Self::next_id(&mut state, "vs"))
    }

    async fn attach_file(&self, corpus_id: &str, filename: &str, _bytes: Vec<u8>) -> RemoteResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AttachFile {
            corpus_id: corpus_id.to_string(),
            filename: filename.to_string(),
        });
        Ok(Self::next_id(&mut state, "file"))
    }

    async fn create_conversation(&self, _initial_prompt: &str) -> RemoteResult<ConversationHandle> {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state, "thread");
        state.calls.push(Call::CreateConversation(id.clone()));
        Ok(ConversationHandle::new(id))
    }

    async fn append_message(&self, conversation: &ConversationHandle, _text: &str) -> RemoteResult<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::AppendMessage(conversation.id().to_string()));
        Ok(())
    }

    async fn run(&self, conversation: &ConversationHandle, assistant_id: &str) -> RemoteResult<RunHandle> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Run {
            conversation: conversation.id().to_string(),
            assistant_id: assistant_id.to_string(),
        });

        if !state.busy_assistants.insert(assistant_id.to_string()) {
            state.overlap_detected = true;
        }

        let script = state
            .scripts
            .get_mut(assistant_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Script::Reply(String::new()));
        let run_id = Self::next_id(&mut state, "run");
        state.runs.insert(
            run_id.clone(),
            PendingRun {
                conversation: conversation.id().to_string(),
                assistant_id: assistant_id.to_string(),
                script,
                polls_left: self.pending_polls,
            },
        );

        Ok(RunHandle {
            conversation: conversation.clone(),
            run_id,
        })
    }

    async fn poll(&self, run: &RunHandle) -> RemoteResult<RunStatus> {
        let mut state = self.state.lock().unwrap();
        let pending = state.runs.get_mut(&run.run_id).unwrap();

        if matches!(pending.script, Script::NeverCompletes) {
            return Ok(RunStatus::Pending);
        }
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(RunStatus::Pending);
        }

        let conversation = pending.conversation.clone();
        let assistant_id = pending.assistant_id.clone();
        let script = pending.script.clone();
        state.busy_assistants.remove(&assistant_id);

        match script {
            Script::Reply(text) => {
                state.latest.insert(conversation, text);
                Ok(RunStatus::Completed)
            }
            _ => Ok(RunStatus::Failed("failed".to_string())),
        }
    }

    async fn latest_response_text(&self, conversation: &ConversationHandle) -> RemoteResult<String> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .latest
            .get(conversation.id())
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> RemoteResult<()> {
        self.delete(Call::DeleteAssistant(assistant_id.to_string()), assistant_id, "delete_assistant")
    }

    async fn delete_corpus(&self, corpus_id: &str) -> RemoteResult<()> {
        self.delete(Call::DeleteCorpus(corpus_id.to_string()), corpus_id, "delete_corpus")
    }

    async fn delete_file(&self, file_id: &str) -> RemoteResult<()> {
        self.delete(Call::DeleteFile(file_id.to_string()), file_id, "delete_file")
    }
}

/// 快速轮询的会话参数
pub fn fast_options() -> SessionOptions {
    SessionOptions {
        poll: PollSettings {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        },
        ..SessionOptions::default()
    }
}

pub const VALID_RESPONSE: &str = "Nombre: Células\n\
    Descripcion: Evaluación sobre la célula.\n\
    Pregunta_vf: La mitocondria produce ATP.\n\
    Alternativa correcta: V\n\
    Pregunta_desarrollo: Explique la función del núcleo.\n\
    Respuesta: Contiene el material genético y regula la actividad celular.\n\
    Pregunta_alternativas: ¿Qué organelo realiza la fotosíntesis?\n\
    a) Cloroplasto\n\
    b) Ribosoma\n\
    c) Lisosoma\n\
    d) Aparato de Golgi\n\
    Alternativa correcta: a\n";
