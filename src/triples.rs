//! Extracción de tripletas con el LLM y análisis de su respuesta.
//!
//! Gramática de cada línea de la respuesta:
//!
//! ```text
//! Sujeto - Relación -> Objeto
//! ```
//!
//! Sólo son candidatas las líneas que contienen a la vez `-` y `->`; el resto
//! (texto explicativo del modelo) se ignora. Una línea candidata debe tener un
//! único `->`, y su parte izquierda se parte por el primer `-`. Los espacios
//! alrededor de cada campo se recortan y ningún campo puede quedar vacío.

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    llm::TextGenerator,
    models::Triple,
};

const ARROW: &str = "->";
const SEPARATOR: char = '-';

const EXTRACTION_PROMPT: &str = r#"Extrae los conceptos clave y sus relaciones como tripletas (Sujeto, Relación, Objeto)
del texto siguiente. Devuélvelas en texto plano, una tripleta por línea, con este formato exacto:

Sujeto - relacion -> Objeto

Ejemplo:
Urbanization - leads_to -> Industrialization

No añadas numeración, viñetas ni explicaciones.

Texto:
"#;

/// Motivo por el que una línea candidata no produjo tripleta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Aparece `->` más de una vez.
    MultipleArrows,
    /// La parte izquierda no tiene `-` que separe sujeto y relación.
    MissingRelationSeparator,
    /// Sujeto, relación u objeto vacíos tras recortar.
    EmptyField,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::MultipleArrows => "más de un '->' en la línea",
            Self::MissingRelationSeparator => "falta el '-' entre sujeto y relación",
            Self::EmptyField => "sujeto, relación u objeto vacío",
        };
        f.write_str(msg)
    }
}

/// Diagnóstico de una línea descartada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// Número de línea (desde 1) dentro de la respuesta del LLM.
    pub line_number: usize,
    pub line: String,
    pub reason: SkipReason,
}

/// Resultado de analizar la respuesta del LLM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTriples {
    /// En el orden de la respuesta; se permiten duplicados.
    pub triples: Vec<Triple>,
    pub skipped: Vec<SkippedLine>,
    /// Líneas sin `-` y `->` (texto libre del modelo).
    pub ignored: usize,
}

/// Analiza una única línea candidata.
pub fn parse_line(line: &str) -> Result<Triple, SkipReason> {
    let mut parts = line.split(ARROW);
    let left = parts.next().unwrap_or_default();
    let right = match (parts.next(), parts.next()) {
        (Some(right), None) => right,
        _ => return Err(SkipReason::MultipleArrows),
    };

    let (subject, relation) = left
        .split_once(SEPARATOR)
        .ok_or(SkipReason::MissingRelationSeparator)?;

    let triple = Triple::new(subject, relation, right);
    if triple.subject.is_empty() || triple.relation.is_empty() || triple.object.is_empty() {
        return Err(SkipReason::EmptyField);
    }
    Ok(triple)
}

/// Convierte la respuesta del LLM en tripletas más la lista de líneas descartadas.
pub fn parse_triples(response: &str) -> ParsedTriples {
    let mut parsed = ParsedTriples::default();

    for (idx, raw) in response.lines().enumerate() {
        let line = raw.trim();
        if !(line.contains(SEPARATOR) && line.contains(ARROW)) {
            if !line.is_empty() {
                parsed.ignored += 1;
            }
            continue;
        }

        match parse_line(line) {
            Ok(triple) => parsed.triples.push(triple),
            Err(reason) => parsed.skipped.push(SkippedLine {
                line_number: idx + 1,
                line: line.to_string(),
                reason,
            }),
        }
    }

    parsed
}

/// Devuelve como mucho los primeros `limit` caracteres (no bytes) de `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_extraction_prompt(text: &str) -> String {
    format!("{EXTRACTION_PROMPT}{text}\n")
}

/// Pide al LLM las tripletas de los primeros `char_limit` caracteres de `text`.
pub async fn extract_triples(
    llm: &dyn TextGenerator,
    text: &str,
    char_limit: usize,
) -> PipelineResult<ParsedTriples> {
    let excerpt = truncate_chars(text, char_limit);
    let prompt = build_extraction_prompt(excerpt);

    let response = llm.generate(&prompt).await.map_err(PipelineError::Llm)?;
    let parsed = parse_triples(&response);

    for skipped in &parsed.skipped {
        warn!(
            "Línea {} descartada ({}): '{}'",
            skipped.line_number, skipped.reason, skipped.line
        );
    }
    info!(
        "📊 Extraídas {} tripletas del texto ({} líneas descartadas)",
        parsed.triples.len(),
        parsed.skipped.len()
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[test]
    fn parses_one_triple_per_valid_line_in_order() {
        let parsed = parse_triples("Cats - hunt -> Mice\nMice - eat -> Grain");
        assert_eq!(
            parsed.triples,
            vec![
                Triple::new("Cats", "hunt", "Mice"),
                Triple::new("Mice", "eat", "Grain"),
            ]
        );
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.ignored, 0);
    }

    #[test]
    fn prose_lines_are_ignored_not_reported() {
        let parsed = parse_triples("Here are the triples:\n\nCats - hunt -> Mice\nThat's all.");
        assert_eq!(parsed.triples.len(), 1);
        assert_eq!(parsed.ignored, 2);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn lines_with_only_an_arrow_are_still_candidates() {
        // "->" contiene un guion, así que la línea es candidata pero le falta el separador.
        let parsed = parse_triples("Cats -> Mice");
        assert!(parsed.triples.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].reason, SkipReason::MissingRelationSeparator);
        assert_eq!(parsed.skipped[0].line_number, 1);
    }

    #[test]
    fn relation_is_split_on_first_hyphen() {
        let triple = parse_line("Self - well-known for -> Hyphens").unwrap();
        assert_eq!(triple, Triple::new("Self", "well-known for", "Hyphens"));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let triple = parse_line("   Urbanization  -   leads_to ->   Industrialization   ").unwrap();
        assert_eq!(triple, Triple::new("Urbanization", "leads_to", "Industrialization"));
    }

    #[test]
    fn malformed_lines_are_reported_and_batch_continues() {
        let response = "A - b -> C -> D\n- bullet -> X\nGood - one -> Line\nY - z ->   ";
        let parsed = parse_triples(response);
        assert_eq!(parsed.triples, vec![Triple::new("Good", "one", "Line")]);

        let reasons: Vec<_> = parsed.skipped.iter().map(|s| (s.line_number, s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (1, SkipReason::MultipleArrows),
                (2, SkipReason::EmptyField),
                (4, SkipReason::EmptyField),
            ]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let parsed = parse_triples("A - r -> B\nA - r -> B");
        assert_eq!(parsed.triples.len(), 2);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn extraction_sends_only_the_truncated_excerpt() {
        let llm = ScriptedLlm::new(["Cats - hunt -> Mice"]);
        let text = format!("{}{}", "a".repeat(10), "MARCA_FUERA_DE_LIMITE");

        let parsed = extract_triples(&llm, &text, 10).await.unwrap();

        assert_eq!(parsed.triples, vec![Triple::new("Cats", "hunt", "Mice")]);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(&"a".repeat(10)));
        assert!(!prompts[0].contains("MARCA_FUERA_DE_LIMITE"));
    }

    #[tokio::test]
    async fn llm_failure_is_a_service_error() {
        let llm = ScriptedLlm::failing("cuota agotada");
        let err = extract_triples(&llm, "texto", 4000).await.unwrap_err();
        assert!(matches!(err, PipelineError::Llm(_)));
    }
}
