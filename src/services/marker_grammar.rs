//! 标记语法 - 提示词与解析器共享的契约
//!
//! 提示词要求模型输出的每个标记都在这里定义，解析器也只认这里的标记。
//! 修改任何标记都必须同时升级 `MARKER_GRAMMAR_VERSION`。

use crate::models::QuestionSpec;

/// 标记语法版本
pub const MARKER_GRAMMAR_VERSION: u32 = 2;

pub const NAME: &str = "Nombre:";
pub const DESCRIPTION: &str = "Descripcion:";
/// 模型常带重音输出，解析时同样接受
pub const DESCRIPTION_ACCENTED: &str = "Descripción:";
pub const TRUE_FALSE: &str = "Pregunta_vf:";
pub const ESSAY: &str = "Pregunta_desarrollo:";
pub const ESSAY_ANSWER: &str = "Respuesta:";
pub const MULTIPLE_CHOICE: &str = "Pregunta_alternativas:";
pub const CORRECT: &str = "Alternativa correcta:";

/// 选择题选项字母
pub const OPTION_LETTERS: [char; 4] = ['a', 'b', 'c', 'd'];

/// 三种题目标记，出现任意一个即视为结构合法
pub const QUESTION_MARKERS: [&str; 3] = [TRUE_FALSE, ESSAY, MULTIPLE_CHOICE];

// 评分回复的标记
pub const SCORE: &str = "Puntaje:";
pub const FEEDBACK: &str = "Retroalimentacion:";

/// 回复中是否出现了任意题目标记
pub fn has_question_marker(text: &str) -> bool {
    QUESTION_MARKERS.iter().any(|marker| text.contains(marker))
}

/// 构建出题提示词
pub fn build_generation_prompt(spec: &QuestionSpec) -> String {
    let difficulty = spec.difficulty.prompt_label();
    let last_letter = OPTION_LETTERS[OPTION_LETTERS.len() - 1];

    format!(
        r#"Generame preguntas segun su tipo que seran indicadas a continuacion. Las preguntas deben basarse exclusivamente en la información contenida en los archivos proporcionados en el vector_store, pero sin mencionar los nombres de los documentos. Cada pregunta debe abordar un concepto aprendido en los archivos. Las preguntas deben tener una dificultad {difficulty}.

Antes de las preguntas entrega un encabezado:
{NAME} seguido de un nombre breve para la evaluación.
{DESCRIPTION} seguido de una descripción de una o dos oraciones.

Cada tipo de pregunta deberá seguir el siguiente formato:

1. Tipo: Verdadero o Falso, deben ser {vf} preguntas
Pregunta: Debe comenzar con "{TRUE_FALSE}" seguida del enunciado.
Alternativa correcta: Debe ser indicada con "{CORRECT}" seguida de "V" para Verdadero o "F" para Falso.

2. Tipo: Desarrollo, deben ser {essay} preguntas
Pregunta: Debe comenzar con "{ESSAY}" seguida del enunciado.
Respuesta: Debe comenzar con "{ESSAY_ANSWER}" seguida de una breve respuesta.

3. Tipo: Alternativas, deben ser {mc} preguntas
Pregunta: Debe comenzar con "{MULTIPLE_CHOICE}" seguida del enunciado de la pregunta.
Alternativas: Cada alternativa debe estar en una nueva línea, comenzando con una letra en minúscula seguida de un paréntesis, desde "a)" hasta "{last_letter})", y luego el texto de la alternativa.
Alternativa correcta: Debe comenzar con "{CORRECT}" seguida de la letra correspondiente a la opción correcta (en minúscula).

Utiliza un tono formal y no incluyas introducciones ni comentarios adicionales, no menciones explícitamente los documentos en las preguntas. No incluyas formatos especiales como **, - o markdown en general, solamente devuelve texto plano. Si la cantidad de preguntas de un tipo es 0 no generes ese tipo de preguntas."#,
        vf = spec.true_false,
        essay = spec.essay,
        mc = spec.multiple_choice,
    )
}

/// 构建论述题评分提示词
pub fn build_grading_prompt(statement: &str, reference_answer: Option<&str>, user_response: &str) -> String {
    let reference = match reference_answer {
        Some(answer) if !answer.trim().is_empty() => {
            format!("Respuesta de referencia: {}\n", answer.trim())
        }
        _ => String::new(),
    };

    format!(
        r#"Evalúa la respuesta de un estudiante a una pregunta de desarrollo, usando como referencia la información de los archivos proporcionados en el vector_store.

Pregunta: {statement}
{reference}Respuesta del estudiante: {response}

Responde únicamente con el siguiente formato, en texto plano:
{SCORE} un número entero entre 0 y 100
{FEEDBACK} una retroalimentación breve para el estudiante"#,
        statement = statement.trim(),
        response = user_response.trim(),
    )
}

/// 解析时 "下一个标记" 的候选集合
pub(crate) fn boundary_markers() -> [&'static str; 6] {
    [NAME, DESCRIPTION, DESCRIPTION_ACCENTED, TRUE_FALSE, ESSAY, MULTIPLE_CHOICE]
}

/// 请求摘要，用于日志
pub fn describe_request(spec: &QuestionSpec) -> String {
    format!(
        "vf={} desarrollo={} alternativas={} dificultad={}",
        spec.true_false,
        spec.essay,
        spec.multiple_choice,
        spec.difficulty.prompt_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    #[test]
    fn test_generation_prompt_carries_every_marker() {
        let spec = QuestionSpec::new(2, 0, 3, Difficulty::Hard);
        let prompt = build_generation_prompt(&spec);

        for marker in [NAME, DESCRIPTION, TRUE_FALSE, CORRECT, ESSAY, ESSAY_ANSWER, MULTIPLE_CHOICE] {
            assert!(prompt.contains(marker), "提示词缺少标记 {}", marker);
        }
        assert!(prompt.contains("\"a)\" hasta \"d)\""));
        assert!(prompt.contains("deben ser 2 preguntas"));
        assert!(prompt.contains("deben ser 0 preguntas"));
        assert!(prompt.contains("deben ser 3 preguntas"));
        assert!(prompt.contains("dificultad difícil"));
        assert!(prompt.contains("es 0 no generes"));
    }

    #[test]
    fn test_has_question_marker() {
        assert!(has_question_marker("xx Pregunta_vf: algo"));
        assert!(has_question_marker("Pregunta_alternativas: algo"));
        assert!(!has_question_marker("Lo siento, no encuentro documentos."));
    }

    #[test]
    fn test_grading_prompt_includes_reference_only_when_present() {
        let with_ref = build_grading_prompt("¿Qué es X?", Some("X es Y"), "X es Z");
        assert!(with_ref.contains("Respuesta de referencia: X es Y"));
        assert!(with_ref.contains(SCORE));
        assert!(with_ref.contains(FEEDBACK));

        let without_ref = build_grading_prompt("¿Qué es X?", Some("  "), "X es Z");
        assert!(!without_ref.contains("Respuesta de referencia"));
    }
}
