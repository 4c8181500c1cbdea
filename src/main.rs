use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use assessment_pipeline::models::load_answer_sheet;
use assessment_pipeline::utils::logging;
use assessment_pipeline::{
    Config, CorpusService, Difficulty, EvaluationService, OpenAiGateway, QuestionSpec,
};
use tracing::info;

const USAGE: &str = "用法:
  assessment_pipeline generate <assistant_id> <difficulty> [vf desarrollo alternativas]
  assessment_pipeline grade <assistant_id> <answers.toml>
  assessment_pipeline provision <unit_name>";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("缺少命令\n{}", USAGE);
    };

    logging::init_log_file(&config.output_log_file)?;
    logging::log_startup(command, &config.assistant_model, config.max_concurrent_sessions);

    let gateway = Arc::new(OpenAiGateway::new(&config).context("无法创建 OpenAI 网关")?);

    match (command.as_str(), &args[1..]) {
        ("generate", [assistant_id, difficulty, counts @ ..]) => {
            let spec = parse_spec(difficulty, counts)?;
            let service = EvaluationService::new(gateway, &config);
            let package = service.generate_evaluation(assistant_id, spec).await?;
            println!("{}", serde_json::to_string_pretty(&package)?);
        }
        ("grade", [assistant_id, answers_path]) => {
            let sheet = load_answer_sheet(Path::new(answers_path)).await?;
            let weight = sheet.essay_weight.unwrap_or(config.essay_weight);
            let service = EvaluationService::new(gateway, &config);
            let result = service
                .grade_submission(assistant_id, &sheet.answers, weight)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ("provision", [unit_name]) => {
            let unit = CorpusService::new(gateway).provision_unit(unit_name).await?;
            println!("assistant_id = {}\ncorpus_id = {}", unit.assistant_id, unit.corpus_id);
        }
        _ => bail!("无法识别的参数: {}\n{}", args.join(" "), USAGE),
    }

    info!("日志已保存至: {}", config.output_log_file);
    Ok(())
}

/// 难度 + 可选的三个题量
fn parse_spec(difficulty: &str, counts: &[String]) -> Result<QuestionSpec> {
    let difficulty: Difficulty = difficulty.parse()?;

    match counts {
        [] => Ok(QuestionSpec::for_difficulty(difficulty)),
        [vf, essay, mc] => Ok(QuestionSpec::new(
            vf.parse().with_context(|| format!("判断题数量无效: {}", vf))?,
            essay.parse().with_context(|| format!("论述题数量无效: {}", essay))?,
            mc.parse().with_context(|| format!("选择题数量无效: {}", mc))?,
            difficulty,
        )),
        _ => bail!("题量需要同时给出三个数字\n{}", USAGE),
    }
}
