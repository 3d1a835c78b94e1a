//! Prompt templates and builders.
//!
//! The system prompt carries the evidence context block; the user prompt
//! carries the question with its fiscal-year framing. Templates load from
//! external files when available, falling back to compiled-in defaults.

use crate::core::Evidence;
use std::fmt::Write;
use std::path::Path;

/// Character budget for the serialized evidence context.
pub const CONTEXT_CHAR_BUDGET: usize = 400_000;

/// Marker appended when the context is cut at the budget.
pub const TRUNCATION_MARKER: &str = "--- CONTEXTO TRUNCADO POR LÍMITE DE TAMAÑO ---";

/// Placeholder used when retrieval produced no evidence.
pub const EMPTY_CONTEXT_PLACEHOLDER: &str =
    "(No se recuperó evidencia de la base de datos para esta consulta.)";

/// System prompt for the fiscal assistant. `{context}` is replaced with
/// the serialized evidence block.
pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"
Eres un Asesor Fiscal Experto (IA) especializado en la legislación mexicana.
Tu misión es dar respuestas técnicas, fundamentadas y fáciles de leer para contadores y fiscalistas.

---
🧠 REGLA DE ORO: CONTINUIDAD NORMATIVA
1.  **Prioridad Temporal:** Busca primero disposiciones del ejercicio consultado.
2.  **Vigencia Extendida:** Si NO encuentras información del ejercicio consultado, ESTÁS AUTORIZADO a usar documentos de ejercicios anteriores, asumiendo que siguen vigentes salvo que haya una derogación explícita.
3.  **Transparencia:** Si usas normativa de ejercicios anteriores, agrega al final:
    _"Nota: Respuesta basada en normativa [AÑO] por continuidad legal."_
4.  **Honestidad:** Si el contexto recuperado no contiene la respuesta, dilo explícitamente; no inventes fundamentos.

---
📝 REGLAS DE FORMATO (OBLIGATORIO)
1.  **Estructura:** Usa párrafos cortos y listas con viñetas (-) para enumerar requisitos u obligaciones.
2.  **Énfasis:** Usa **negritas** para resaltar:
    * Números de Artículos (ej. **Art. 27 LISR**)
    * Reglas Misceláneas (ej. **Regla 3.5.1**)
    * Fechas clave y plazos.
3.  **Estilo:** Mantén un tono profesional pero directo. No uses saludos excesivos.
4.  Para listar requisitos, SIEMPRE usa viñetas con "-" (no numeración romana) y cita la referencia en negritas, por ejemplo: **Art. 27, fracc. I LISR**.

---
CONTEXTO RECUPERADO DE LA BASE DE DATOS:
{context}
"#;

/// Slot substituted with the context block.
const CONTEXT_SLOT: &str = "{context}";

/// Default prompt directory under the user config dir.
const DEFAULT_PROMPT_DIR: &str = ".config/fisco-rs/prompts";

/// Filename of the system prompt template.
const SYSTEM_FILENAME: &str = "system.md";

/// Prompt templates, loaded from disk with compiled-in fallbacks.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt template with the `{context}` slot.
    pub system_template: String,
}

impl PromptSet {
    /// Loads templates from the given directory, falling back to the
    /// compiled-in defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `FISCO_PROMPT_DIR` environment variable
    /// 3. `~/.config/fisco-rs/prompts/`
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("FISCO_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let system_template = resolved_dir
            .map(|dir| dir.join(SYSTEM_FILENAME))
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .unwrap_or_else(|| SYSTEM_PROMPT_TEMPLATE.to_string());

        Self { system_template }
    }

    /// Returns the compiled-in defaults without touching the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            system_template: SYSTEM_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Serializes evidence into the bounded context block.
///
/// Entries render as `--- DOCUMENTO <i> ---` sections. When the next
/// entry would exceed the budget, a visible truncation marker is appended
/// and serialization stops; truncation is not an error.
#[must_use]
pub fn build_context_block(evidence: &[Evidence], budget: usize) -> String {
    if evidence.is_empty() {
        return EMPTY_CONTEXT_PLACEHOLDER.to_string();
    }

    let mut block = String::new();
    for (i, entry) in evidence.iter().enumerate() {
        let mut section = String::new();
        let _ = write!(
            section,
            "--- DOCUMENTO {n} ---\nFuente: {fuente}\nTipo: {tipo}\nTexto:\n{texto}\n\n",
            n = i + 1,
            fuente = entry.source_filename,
            tipo = entry.doc_type,
            texto = entry.text,
        );

        if block.chars().count() + section.chars().count() > budget {
            block.push_str(TRUNCATION_MARKER);
            block.push('\n');
            break;
        }
        block.push_str(&section);
    }
    block
}

/// Substitutes the context block into the system template.
#[must_use]
pub fn build_system_prompt(template: &str, context_block: &str) -> String {
    template.replace(CONTEXT_SLOT, context_block)
}

/// Continuity note the model is instructed to append.
#[must_use]
pub fn continuity_note(used_year: i32) -> String {
    format!("Nota: Respuesta basada en normativa {used_year} por continuidad legal.")
}

/// Composes the user prompt.
///
/// When the evidence year differs from the requested year (and is not the
/// evergreen year 0), the prompt carries the continuity-note instruction
/// so the reader is flagged.
#[must_use]
pub fn build_user_prompt(
    question: &str,
    requested_year: i32,
    used_year: i32,
    regimen: Option<&str>,
) -> String {
    let mut prompt = format!("Ejercicio fiscal consultado: {requested_year}\n");

    if used_year == 0 {
        prompt.push_str("Evidencia: legislación vigente (sin ejercicio específico)\n");
    } else {
        let _ = writeln!(prompt, "Ejercicio de la evidencia recuperada: {used_year}");
    }

    if let Some(regimen) = regimen {
        let _ = writeln!(prompt, "Régimen: {regimen}");
    }

    let _ = writeln!(prompt, "Pregunta: {question}");

    if used_year != requested_year && used_year != 0 {
        let _ = writeln!(
            prompt,
            "Instrucción: la evidencia proviene del ejercicio {used_year}; \
             agrega al final de tu respuesta exactamente esta línea: \"{nota}\"",
            nota = continuity_note(used_year),
        );
    }

    prompt
}
