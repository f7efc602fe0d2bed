//! Turns retrieved fragments, recent conversation and the question into a
//! single prompt for the language model.

use crate::document_store::Fragment;
use crate::types::{ConversationTurn, Role, SourceReference};
use crate::utils::TextUtils;
use tracing::debug;

pub const PERSONA: &str =
    "Sos un facilitador judicial de Costa Rica. Respondé de forma clara, práctica y amable en español.";
pub const CONTEXT_MARKER: &str = "Contexto legal:";
pub const LOCATION_MARKER: &str = "Ubicación detectada:";
pub const QUESTION_MARKER: &str = "Pregunta:";
pub const ANSWER_MARKER: &str = "Respuesta (clara, con pasos si aplica, y al final ofrecé ayuda adicional):";

const HISTORY_HEADER: &str = "**CONVERSACIÓN PREVIA:**";
const HISTORY_FOOTER: &str = "Considera este contexto para dar una respuesta más personalizada y coherente.";

/// Costa Rican places recognised in questions, lowercase form first.
/// Checked in order; the first contained name wins.
pub const GAZETTEER: &[(&str, &str)] = &[
    ("san josé", "San José"),
    ("cartago", "Cartago"),
    ("alajuela", "Alajuela"),
    ("heredia", "Heredia"),
    ("puntarenas", "Puntarenas"),
    ("guanacaste", "Guanacaste"),
    ("limón", "Limón"),
    ("liberia", "Liberia"),
    ("pérez zeledón", "Pérez Zeledón"),
    ("desamparados", "Desamparados"),
    ("escazú", "Escazú"),
    ("goicoechea", "Goicoechea"),
];

pub fn detect_location(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    GAZETTEER
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, proper)| *proper)
}

#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    /// Fragments placed in the prompt (and reported as sources)
    pub max_fragments: usize,
    pub prompt_excerpt_chars: usize,
    pub source_excerpt_chars: usize,
    pub history_turns: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_fragments: 2,
            prompt_excerpt_chars: 400,
            source_excerpt_chars: 150,
            history_turns: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub prompt: String,
    pub sources: Vec<SourceReference>,
    pub location: Option<&'static str>,
}

pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(ContextBuilderConfig::default())
    }
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        question: &str,
        fragments: &[Fragment],
        history: &[ConversationTurn],
    ) -> BuiltContext {
        let used = &fragments[..fragments.len().min(self.config.max_fragments)];
        let location = detect_location(question);

        let mut prompt = String::with_capacity(1024);
        prompt.push_str(PERSONA);
        prompt.push_str("\n\n");

        let legal_context = self.format_fragments(used);
        if !legal_context.is_empty() {
            prompt.push_str(CONTEXT_MARKER);
            prompt.push('\n');
            prompt.push_str(&legal_context);
            prompt.push('\n');
        }

        if let Some(place) = location {
            prompt.push_str(&format!(
                "{} {}. Adapta la guía a esa localidad y menciona las oficinas locales.\n\n",
                LOCATION_MARKER, place
            ));
        }

        let conversation = self.format_history(history);
        if !conversation.is_empty() {
            prompt.push_str(&conversation);
            prompt.push('\n');
        }

        prompt.push_str(QUESTION_MARKER);
        prompt.push(' ');
        prompt.push_str(question);
        prompt.push_str("\n\n");
        prompt.push_str(ANSWER_MARKER);

        debug!(
            "Built prompt: {} chars, {} fragments, {} history turns, location={:?}",
            prompt.len(),
            used.len(),
            history.len().min(self.config.history_turns),
            location
        );

        BuiltContext {
            prompt,
            sources: self.build_sources(used),
            location,
        }
    }

    fn format_fragments(&self, fragments: &[Fragment]) -> String {
        let mut context = String::new();
        for fragment in fragments {
            context.push_str(&format!("--- {} ---\n", display_filename(fragment)));
            context.push_str(TextUtils::truncate_chars(&fragment.content, self.config.prompt_excerpt_chars));
            context.push('\n');
        }
        context
    }

    fn build_sources(&self, fragments: &[Fragment]) -> Vec<SourceReference> {
        fragments
            .iter()
            .map(|fragment| SourceReference {
                filename: display_filename(fragment).to_string(),
                content: TextUtils::truncate_with_ellipsis(&fragment.content, self.config.source_excerpt_chars)
                    .into_owned(),
                source: if fragment.source.trim().is_empty() {
                    "Desconocido".to_string()
                } else {
                    fragment.source.clone()
                },
            })
            .collect()
    }

    /// Label the last few turns; older turns are left out
    pub fn format_history(&self, history: &[ConversationTurn]) -> String {
        if history.is_empty() || self.config.history_turns == 0 {
            return String::new();
        }

        let start = history.len().saturating_sub(self.config.history_turns);
        let mut block = format!("{}\n", HISTORY_HEADER);
        for turn in &history[start..] {
            let label = match turn.role {
                Role::User => "Usuario",
                Role::Assistant => "Tú (Facilitador)",
            };
            block.push_str(&format!("{}: {}\n", label, turn.content));
        }
        block.push('\n');
        block.push_str(HISTORY_FOOTER);
        block.push('\n');
        block
    }
}

fn display_filename(fragment: &Fragment) -> &str {
    if fragment.filename.trim().is_empty() {
        "Documento"
    } else {
        &fragment.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(id: i64, filename: &str, content: &str) -> Fragment {
        Fragment {
            id,
            filename: filename.to_string(),
            source: format!("./data/docs/{}", filename),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_detect_location() {
        assert_eq!(detect_location("Vivo en CARTAGO centro"), Some("Cartago"));
        assert_eq!(detect_location("soy de pérez zeledón"), Some("Pérez Zeledón"));
        assert_eq!(detect_location("sin lugar"), None);
        // Gazetteer order decides when several places appear
        assert_eq!(detect_location("heredia o san josé"), Some("San José"));
    }

    #[test]
    fn test_only_first_two_fragments_are_used() {
        let builder = ContextBuilder::default();
        let fragments = vec![
            fragment(1, "a.txt", "primero"),
            fragment(2, "b.txt", "segundo"),
            fragment(3, "c.txt", "tercero"),
            fragment(4, "d.txt", "cuarto"),
        ];

        let built = builder.build("pregunta", &fragments, &[]);
        assert_eq!(built.sources.len(), 2);
        assert!(built.prompt.contains("--- a.txt ---"));
        assert!(built.prompt.contains("--- b.txt ---"));
        assert!(!built.prompt.contains("tercero"));
    }

    #[test]
    fn test_excerpt_lengths() {
        let builder = ContextBuilder::default();
        let long = "x".repeat(1000);
        let built = builder.build("pregunta", &[fragment(1, "largo.txt", &long)], &[]);

        assert!(built.prompt.contains(&"x".repeat(400)));
        assert!(!built.prompt.contains(&"x".repeat(401)));
        assert_eq!(built.sources[0].content, format!("{}...", "x".repeat(150)));

        let short = builder.build("pregunta", &[fragment(1, "corto.txt", "breve")], &[]);
        assert_eq!(short.sources[0].content, "breve");
    }

    #[test]
    fn test_missing_metadata_gets_placeholders() {
        let builder = ContextBuilder::default();
        let mut f = fragment(1, "", "texto");
        f.source = String::new();

        let built = builder.build("pregunta", &[f], &[]);
        assert_eq!(built.sources[0].filename, "Documento");
        assert_eq!(built.sources[0].source, "Desconocido");
    }

    #[test]
    fn test_history_keeps_last_four_turns() {
        let builder = ContextBuilder::default();
        let history = vec![
            ConversationTurn::user("uno"),
            ConversationTurn::assistant("dos"),
            ConversationTurn::user("tres"),
            ConversationTurn::assistant("cuatro"),
            ConversationTurn::user("cinco"),
        ];

        let block = builder.format_history(&history);
        assert!(!block.contains("Usuario: uno"));
        assert!(block.contains("Tú (Facilitador): dos"));
        assert!(block.contains("Usuario: cinco"));
        assert!(builder.format_history(&[]).is_empty());
    }

    #[test]
    fn test_prompt_layout() {
        let builder = ContextBuilder::default();
        let built = builder.build(
            "¿Dónde pido pensión en Cartago?",
            &[fragment(1, "pension.txt", "Juzgado de Familia")],
            &[ConversationTurn::user("hola")],
        );

        assert_eq!(built.location, Some("Cartago"));
        let prompt = &built.prompt;
        let persona = prompt.find(PERSONA).unwrap();
        let context = prompt.find(CONTEXT_MARKER).unwrap();
        let location = prompt.find("Ubicación detectada: Cartago.").unwrap();
        let history = prompt.find(HISTORY_HEADER).unwrap();
        let question = prompt.find("Pregunta: ¿Dónde pido pensión en Cartago?").unwrap();
        let answer = prompt.find(ANSWER_MARKER).unwrap();
        assert!(persona < context && context < location && location < history);
        assert!(history < question && question < answer);
    }

    #[test]
    fn test_no_context_section_without_fragments() {
        let built = ContextBuilder::default().build("hola", &[], &[]);
        assert!(!built.prompt.contains(CONTEXT_MARKER));
        assert!(built.sources.is_empty());
        assert!(built.location.is_none());
    }
}
