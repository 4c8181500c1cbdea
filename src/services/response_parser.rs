//! 回复解析服务
//!
//! 把模型的自由文本回复还原为结构化题目。解析是纯函数，不访问远程，
//! 对同一段文本重复解析得到相同结果。
//!
//! 文本按标记切分成若干区块，每个区块从一个标记开始，到下一个标记或文本结尾为止。
//! 判断题、论述题、选择题各自独立提取，同一题型内保持出现顺序。

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::models::{EvaluationPackage, GeneratedQuestion, OptionSet, QuestionType};
use crate::services::marker_grammar::{self as grammar, OPTION_LETTERS};

/// 缺少 `Nombre:` 时的默认名称
pub const DEFAULT_PACKAGE_NAME: &str = "Evaluación generada";

/// 区块起始标记
static BLOCK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = grammar::boundary_markers()
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&pattern).expect("区块标记正则无效")
});

/// 选择题选项，如 `a) Foo`
///
/// `e)` 也算选项边界，只是不会被保留。
static OPTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)([a-e])\)").expect("选项正则无效"));

/// 评分回复中的分数
static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){}\s*([0-9]+)", regex::escape(grammar::SCORE))).expect("分数正则无效")
});

/// 一个标记区块
struct Block<'a> {
    marker: &'a str,
    body: &'a str,
}

fn split_blocks(text: &str) -> Vec<Block<'_>> {
    let starts: Vec<_> = BLOCK_MARKER.find_iter(text).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = starts.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
            Block {
                marker: m.as_str(),
                body: &text[m.end()..end],
            }
        })
        .collect()
}

/// 在 `separator` 处拆分区块，两侧去掉首尾空白
fn split_on<'a>(body: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    body.split_once(separator)
        .map(|(head, tail)| (head.trim(), tail.trim()))
}

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

fn parse_true_false(body: &str) -> Option<GeneratedQuestion> {
    let (statement, answer) = split_on(body, grammar::CORRECT)?;
    let correct = match first_token(answer)?.chars().next()?.to_ascii_uppercase() {
        'V' => true,
        'F' => false,
        _ => return None,
    };
    Some(GeneratedQuestion::TrueFalse {
        statement: statement.to_string(),
        correct,
    })
}

fn parse_essay(body: &str) -> Option<GeneratedQuestion> {
    let (statement, answer) = split_on(body, grammar::ESSAY_ANSWER)?;
    Some(GeneratedQuestion::Essay {
        statement: statement.to_string(),
        reference_answer: answer.to_string(),
    })
}

fn parse_multiple_choice(body: &str) -> Option<GeneratedQuestion> {
    let (question, answer) = split_on(body, grammar::CORRECT)?;
    let correct_letter = first_token(answer)?
        .trim_end_matches([')', '.'])
        .chars()
        .next()?
        .to_ascii_lowercase();

    let option_marks: Vec<_> = OPTION_MARKER.captures_iter(question).collect();
    let statement_end = option_marks
        .first()
        .and_then(|c| c.get(0))
        .map(|m| m.start())
        .unwrap_or(question.len());

    let mut options = OptionSet::new();
    for (i, caps) in option_marks.iter().enumerate() {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let text_end = option_marks
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map(|m| m.start())
            .unwrap_or(question.len());
        let letter = letter.as_str().chars().next().map(|c| c.to_ascii_lowercase());
        if let Some(letter) = letter.filter(|l| OPTION_LETTERS.contains(l)) {
            if !options.contains(letter) {
                options.push(letter, question[whole.end()..text_end].trim());
            }
        }
    }

    Some(GeneratedQuestion::MultipleChoice {
        statement: question[..statement_end].trim().to_string(),
        options,
        correct_letter,
    })
}

/// 提取某一题型的全部题目
fn extract(blocks: &[Block<'_>], kind: QuestionType) -> Vec<GeneratedQuestion> {
    let (marker, parse): (&str, fn(&str) -> Option<GeneratedQuestion>) = match kind {
        QuestionType::TrueFalse => (grammar::TRUE_FALSE, parse_true_false),
        QuestionType::Essay => (grammar::ESSAY, parse_essay),
        QuestionType::MultipleChoice => (grammar::MULTIPLE_CHOICE, parse_multiple_choice),
    };

    blocks
        .iter()
        .filter(|b| b.marker == marker)
        .filter_map(|b| {
            let parsed = parse(b.body);
            if parsed.is_none() {
                debug!("跳过不完整的 {} 区块: {}", kind, b.body.trim());
            }
            parsed
        })
        .collect()
}

fn header_block<'a>(blocks: &'a [Block<'a>], markers: &[&str]) -> Option<&'a str> {
    blocks
        .iter()
        .find(|b| markers.contains(&b.marker))
        .map(|b| b.body)
}

/// 解析出题回复
///
/// 题目顺序：先判断题，再论述题，最后选择题。
pub fn parse_generation_response(text: &str) -> EvaluationPackage {
    let blocks = split_blocks(text);

    // 名称只取标记所在的那一行
    let name = header_block(&blocks, &[grammar::NAME])
        .and_then(|body| body.lines().next())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| DEFAULT_PACKAGE_NAME.to_string(), str::to_string);
    let description = header_block(&blocks, &[grammar::DESCRIPTION, grammar::DESCRIPTION_ACCENTED])
        .map(|body| body.trim().to_string())
        .unwrap_or_default();

    let mut questions = extract(&blocks, QuestionType::TrueFalse);
    questions.extend(extract(&blocks, QuestionType::Essay));
    questions.extend(extract(&blocks, QuestionType::MultipleChoice));

    EvaluationPackage {
        name,
        description,
        questions,
    }
}

/// 单条题目不合法的原因
pub fn rejection_reason(question: &GeneratedQuestion) -> Option<&'static str> {
    if question.statement().trim().is_empty() {
        return Some("题干为空");
    }
    match question {
        GeneratedQuestion::Essay { reference_answer, .. } if reference_answer.trim().is_empty() => {
            Some("参考答案为空")
        }
        GeneratedQuestion::MultipleChoice {
            options,
            correct_letter,
            ..
        } => {
            if !OPTION_LETTERS.contains(correct_letter) {
                Some("正确选项不在 a-d 范围内")
            } else if !options.contains(*correct_letter) {
                Some("正确选项不在选项列表中")
            } else {
                None
            }
        }
        _ => None,
    }
}

/// 严格校验：丢弃不合法的题目并记录原因
pub fn validate_questions(package: EvaluationPackage) -> EvaluationPackage {
    let EvaluationPackage {
        name,
        description,
        questions,
    } = package;

    let questions = questions
        .into_iter()
        .filter(|q| match rejection_reason(q) {
            Some(reason) => {
                warn!("⚠️ 丢弃不合法的{}题 ({}): {}", q.kind(), reason, q.statement());
                false
            }
            None => true,
        })
        .collect();

    EvaluationPackage {
        name,
        description,
        questions,
    }
}

/// 论述题评分回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingReply {
    /// 0..=100
    pub score: u8,
    pub feedback: String,
}

/// 解析评分回复
///
/// 缺少分数时记 0 分，超过 100 的分数（包括超长数字）截断为 100。
/// 缺少 `Retroalimentacion:` 时，去掉分数行后的全文作为反馈。
pub fn parse_grading_reply(text: &str) -> GradingReply {
    let score = SCORE_LINE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().parse::<u64>().map_or(100, |s| s.min(100) as u8))
        .unwrap_or(0);

    let feedback = match text.split_once(grammar::FEEDBACK) {
        Some((_, rest)) => rest.trim().to_string(),
        None => text
            .lines()
            .filter(|line| !line.trim_start().starts_with(grammar::SCORE))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
    };

    GradingReply { score, feedback }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Nombre: Fotosíntesis\n\
        Descripcion: Evaluación sobre la fotosíntesis.\n\
        Pregunta_vf: Las plantas producen oxígeno.\n\
        Alternativa correcta: V\n\
        Pregunta_vf: La clorofila es azul.\n\
        Alternativa correcta: f\n\
        Pregunta_desarrollo: Explique la fase luminosa.\n\
        Respuesta: Ocurre en los tilacoides y produce ATP.\n\
        Pregunta_alternativas: ¿Dónde ocurre el ciclo de Calvin?\n\
        a) Estroma\n\
        b) Núcleo\n\
        c) Mitocondria\n\
        d) Vacuola\n\
        Alternativa correcta: a\n";

    #[test]
    fn test_parse_full_response() {
        let package = parse_generation_response(SAMPLE);

        assert_eq!(package.name, "Fotosíntesis");
        assert_eq!(package.description, "Evaluación sobre la fotosíntesis.");
        assert_eq!(package.questions.len(), 4);
        assert_eq!(
            package.questions[0],
            GeneratedQuestion::TrueFalse {
                statement: "Las plantas producen oxígeno.".into(),
                correct: true,
            }
        );
        assert_eq!(
            package.questions[1],
            GeneratedQuestion::TrueFalse {
                statement: "La clorofila es azul.".into(),
                correct: false,
            }
        );
        assert_eq!(package.count_of(QuestionType::Essay), 1);

        match &package.questions[3] {
            GeneratedQuestion::MultipleChoice {
                statement,
                options,
                correct_letter,
            } => {
                assert_eq!(statement, "¿Dónde ocurre el ciclo de Calvin?");
                assert_eq!(options.letters().collect::<String>(), "abcd");
                assert_eq!(options.get('a'), Some("Estroma"));
                assert_eq!(*correct_letter, 'a');
            }
            other => panic!("期望选择题，得到 {:?}", other),
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse_generation_response(SAMPLE), parse_generation_response(SAMPLE));
    }

    #[test]
    fn test_inline_multiple_choice() {
        let package = parse_generation_response(
            "Pregunta_alternativas: What is X? a) Foo b) Bar c) Baz d) Qux Alternativa correcta: b",
        );

        assert_eq!(package.questions.len(), 1);
        match &package.questions[0] {
            GeneratedQuestion::MultipleChoice {
                statement,
                options,
                correct_letter,
            } => {
                assert_eq!(statement, "What is X?");
                let collected: Vec<_> = options.iter().collect();
                assert_eq!(collected, vec![('a', "Foo"), ('b', "Bar"), ('c', "Baz"), ('d', "Qux")]);
                assert_eq!(*correct_letter, 'b');
            }
            other => panic!("期望选择题，得到 {:?}", other),
        }
    }

    #[test]
    fn test_defaults_when_header_missing() {
        let package = parse_generation_response("Pregunta_vf: El agua hierve a 100 °C. Alternativa correcta: V");
        assert_eq!(package.name, DEFAULT_PACKAGE_NAME);
        assert_eq!(package.description, "");
        assert_eq!(package.questions.len(), 1);
    }

    #[test]
    fn test_accented_description_marker() {
        let package = parse_generation_response("Nombre: X\nDescripción: con tilde\nPregunta_vf: a Alternativa correcta: F");
        assert_eq!(package.description, "con tilde");
    }

    #[test]
    fn test_incomplete_blocks_are_skipped() {
        let package = parse_generation_response(
            "Pregunta_vf: sin respuesta\nPregunta_desarrollo: sin referencia\nPregunta_vf: ok Alternativa correcta: V",
        );
        assert_eq!(package.questions.len(), 1);
        assert_eq!(package.questions[0].statement(), "ok");
    }

    #[test]
    fn test_validation_drops_invalid_records() {
        let package = parse_generation_response(
            "Pregunta_alternativas: ¿Cuál? a) Uno b) Dos Alternativa correcta: c\n\
             Pregunta_alternativas: ¿Otra? a) Uno b) Dos Alternativa correcta: z\n\
             Pregunta_desarrollo: Explique. Respuesta: \n\
             Pregunta_alternativas: ¿Válida? a) Uno b) Dos Alternativa correcta: b",
        );
        assert_eq!(package.questions.len(), 4);

        let validated = validate_questions(package);
        assert_eq!(validated.questions.len(), 1);
        assert_eq!(validated.questions[0].statement(), "¿Válida?");
    }

    #[test]
    fn test_rejection_reason_for_empty_statement() {
        let question = GeneratedQuestion::TrueFalse {
            statement: "  ".into(),
            correct: true,
        };
        assert_eq!(rejection_reason(&question), Some("题干为空"));
    }

    #[test]
    fn test_parse_grading_reply() {
        let reply = parse_grading_reply("Puntaje: 75\nRetroalimentacion: Buena respuesta, falta detalle.");
        assert_eq!(reply.score, 75);
        assert_eq!(reply.feedback, "Buena respuesta, falta detalle.");
    }

    #[test]
    fn test_grading_reply_defaults_and_clamps() {
        let missing = parse_grading_reply("No puedo evaluar esta respuesta.");
        assert_eq!(missing.score, 0);
        assert_eq!(missing.feedback, "No puedo evaluar esta respuesta.");

        let over = parse_grading_reply("Puntaje: 250\nMuy bien.");
        assert_eq!(over.score, 100);
        assert_eq!(over.feedback, "Muy bien.");
    }

    #[test]
    fn test_name_is_only_the_marker_line() {
        let package = parse_generation_response(
            "Nombre: Células\nA continuación las preguntas solicitadas.\n\
             Pregunta_vf: La célula es la unidad básica de la vida. Alternativa correcta: V",
        );
        assert_eq!(package.name, "Células");
        assert_eq!(package.questions.len(), 1);

        let blank = parse_generation_response("Nombre:\nTexto suelto\nPregunta_vf: x Alternativa correcta: F");
        assert_eq!(blank.name, DEFAULT_PACKAGE_NAME);
    }

    #[test]
    fn test_interleaved_blocks_come_out_grouped_by_type() {
        let package = parse_generation_response(
            "Pregunta_alternativas: ¿M1? a) Uno b) Dos Alternativa correcta: a\n\
             Pregunta_vf: V1 Alternativa correcta: V\n\
             Pregunta_desarrollo: E1 Respuesta: R1\n\
             Pregunta_vf: V2 Alternativa correcta: F\n\
             Pregunta_alternativas: ¿M2? a) Uno b) Dos Alternativa correcta: b\n\
             Pregunta_desarrollo: E2 Respuesta: R2",
        );

        let order: Vec<_> = package.questions.iter().map(|q| q.statement()).collect();
        assert_eq!(order, vec!["V1", "V2", "E1", "E2", "¿M1?", "¿M2?"]);
    }

    /// 按指定题量拼出一段打乱顺序的回复
    fn shuffled_response(vf: usize, essay: usize, mc: usize) -> String {
        let mut blocks = Vec::new();
        for i in 0..mc {
            blocks.push(format!("Pregunta_alternativas: ¿M{i}? a) Uno b) Dos c) Tres Alternativa correcta: c"));
        }
        for i in 0..essay {
            blocks.push(format!("Pregunta_desarrollo: E{i} Respuesta: R{i}"));
        }
        for i in 0..vf {
            blocks.push(format!("Pregunta_vf: V{i} Alternativa correcta: V"));
        }
        let mid = blocks.len() / 2;
        blocks.rotate_left(mid);
        format!("Nombre: Mezcla\n{}", blocks.join("\n"))
    }

    #[test]
    fn test_counts_and_order_survive_for_several_mixes() {
        for (vf, essay, mc) in [(2, 1, 2), (2, 2, 2), (1, 3, 1), (0, 2, 3), (3, 0, 0)] {
            let package = validate_questions(parse_generation_response(&shuffled_response(vf, essay, mc)));

            assert_eq!(package.count_of(QuestionType::TrueFalse), vf);
            assert_eq!(package.count_of(QuestionType::Essay), essay);
            assert_eq!(package.count_of(QuestionType::MultipleChoice), mc);

            let kinds: Vec<_> = package.questions.iter().map(|q| q.kind()).collect();
            let mut expected = vec![QuestionType::TrueFalse; vf];
            expected.extend(vec![QuestionType::Essay; essay]);
            expected.extend(vec![QuestionType::MultipleChoice; mc]);
            assert_eq!(kinds, expected, "题量 ({vf}, {essay}, {mc})");
        }
    }

    #[test]
    fn test_option_e_ends_option_d() {
        let package = parse_generation_response(
            "Pregunta_alternativas: ¿Cuál? a) A b) B c) C d) D e) E Alternativa correcta: d",
        );
        match &package.questions[0] {
            GeneratedQuestion::MultipleChoice { options, .. } => {
                let collected: Vec<_> = options.iter().collect();
                assert_eq!(collected, vec![('a', "A"), ('b', "B"), ('c', "C"), ('d', "D")]);
            }
            other => panic!("期望选择题，得到 {:?}", other),
        }
    }

    #[test]
    fn test_huge_score_is_clamped() {
        let reply = parse_grading_reply("Puntaje: 99999999999\nRetroalimentacion: Excelente.");
        assert_eq!(reply.score, 100);
        assert_eq!(reply.feedback, "Excelente.");
    }
}
