//! Query expansion for Mexican fiscal terminology.
//!
//! Enriches a question with synonyms and related terms before embedding,
//! and extracts keyword candidates for the substring half of hybrid
//! search. The expander is advisory: retrieval works without it.

use regex::Regex;
use std::sync::LazyLock;

/// Synonyms cap per matched key.
const MAX_SYNONYMS_PER_KEY: usize = 3;

/// Terms appended to the expanded query.
const MAX_EXPANSION_TERMS: usize = 5;

/// Keywords handed to substring search.
const MAX_KEYWORDS: usize = 5;

/// `user term -> related terms` table.
const FISCAL_SYNONYMS: &[(&str, &[&str])] = &[
    // Límites y exenciones
    (
        "límite",
        &["exención", "tope", "máximo", "monto máximo", "cantidad máxima"],
    ),
    (
        "limite",
        &["exención", "tope", "máximo", "monto máximo", "cantidad máxima"],
    ),
    ("tope", &["límite", "exención", "máximo"]),
    (
        "exención",
        &["límite", "exento", "no gravado", "no sujeto al pago"],
    ),
    ("exento", &["exención", "no gravado", "límite"]),
    // Salarios y UMA
    (
        "salario mínimo",
        &["UMA", "unidad de medida", "veces el salario", "siete veces"],
    ),
    ("uma", &["salario mínimo", "unidad de medida y actualización"]),
    ("veces", &["salario mínimo", "UMA", "siete veces", "equivalente"]),
    // Deducciones
    ("deducción", &["deducible", "deducir", "gasto deducible"]),
    ("deducir", &["deducción", "deducible"]),
    ("deducible", &["deducción", "requisitos de deducción"]),
    // Previsión social
    (
        "previsión social",
        &["prestaciones", "beneficios trabajadores", "seguridad social"],
    ),
    ("prestaciones", &["previsión social", "beneficios"]),
    // Requisitos
    (
        "requisitos",
        &["condiciones", "requisito", "cumplir", "obligaciones"],
    ),
    ("requisito", &["requisitos", "condiciones"]),
    // Artículos específicos
    ("fracción xi", &["fracción 11", "once"]),
    ("fracción 11", &["fracción XI", "once"]),
    // Personas morales/físicas
    (
        "persona moral",
        &["empresa", "sociedad", "contribuyente persona moral"],
    ),
    ("persona física", &["individuo", "contribuyente persona física"]),
    // Ingresos
    ("ingreso acumulable", &["ingreso gravable", "base gravable"]),
    ("ingreso exento", &["exención", "no acumulable"]),
];

/// Question-shape rules: pattern over the whole question -> expansions.
#[allow(clippy::unwrap_used)]
static EXPANSION_PATTERNS: LazyLock<Vec<(Regex, &'static [&'static str])>> = LazyLock::new(|| {
    let rules: [(&str, &[&str]); 3] = [
        (
            r"(límite|limite|tope|máximo).*(deducción|deducir|exención|exento|previsión)",
            &[
                "siete veces el salario mínimo",
                "salario mínimo general",
                "UMA",
                "cantidad equivalente",
                "monto de la exención",
                "ingreso no sujeto",
            ],
        ),
        (
            r"(cuánto|cuanto|cuántos|cuantos).*(deducir|exento|exención|límite)",
            &[
                "veces el salario",
                "salario mínimo",
                "UMA",
                "monto máximo",
                "cantidad",
            ],
        ),
        (
            r"(porcentaje|%|por ciento).*(deducción|deducible|límite)",
            &["proporción", "fracción", "parte", "monto"],
        ),
    ];
    rules
        .into_iter()
        .map(|(pattern, terms)| (Regex::new(pattern).unwrap(), terms))
        .collect()
});

/// Expands a question with related fiscal terms.
///
/// Returns `(expanded_query, keywords)`: the expanded query is the
/// original question plus up to five parenthesized related terms and
/// feeds the embedding; the keywords (at most five) feed substring
/// search. Both are deduplicated preserving first-seen order.
#[must_use]
pub fn expand_query(question: &str) -> (String, Vec<String>) {
    let q_lower = question.to_lowercase();
    let mut terms: Vec<&str> = Vec::new();
    let mut keywords: Vec<&str> = Vec::new();

    for (key, synonyms) in FISCAL_SYNONYMS {
        if q_lower.contains(key) {
            terms.extend(synonyms.iter().take(MAX_SYNONYMS_PER_KEY).copied());
            keywords.extend(synonyms.iter().take(2).copied());
        }
    }

    for (pattern, expansions) in EXPANSION_PATTERNS.iter() {
        if pattern.is_match(&q_lower) {
            terms.extend(expansions.iter().copied());
            keywords.extend(expansions.iter().take(3).copied());
        }
    }

    let terms = dedup_casefold(&terms);
    let keywords = dedup_casefold(&keywords);

    let expanded = if terms.is_empty() {
        question.to_string()
    } else {
        let joined = terms
            .iter()
            .take(MAX_EXPANSION_TERMS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        format!("{question} ({joined})")
    };

    let keywords = keywords
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect();

    (expanded, keywords)
}

/// Order-preserving case-insensitive dedup.
fn dedup_casefold<'a>(items: &[&'a str]) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expansion_for_neutral_question() {
        let (expanded, keywords) = expand_query("¿Qué es el RFC?");
        assert_eq!(expanded, "¿Qué es el RFC?");
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_limit_question_expands() {
        let (expanded, keywords) =
            expand_query("¿Cuál es el límite de deducción de previsión social?");
        assert!(expanded.starts_with("¿Cuál es el límite"));
        assert!(expanded.contains('('));
        assert!(expanded.contains("exención"));
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= MAX_KEYWORDS);
    }

    #[test]
    fn test_expansion_caps_terms() {
        let (expanded, _) = expand_query("límite tope exento deducción requisitos");
        let inside = expanded.rsplit('(').next().unwrap();
        assert!(inside.matches(", ").count() < MAX_EXPANSION_TERMS);
    }

    #[test]
    fn test_keywords_are_deduped() {
        let (_, keywords) = expand_query("límite y limite de exención");
        let unique: std::collections::HashSet<_> =
            keywords.iter().map(|k| k.to_lowercase()).collect();
        assert_eq!(unique.len(), keywords.len());
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let q = "¿Cuánto puedo deducir de previsión social?";
        assert_eq!(expand_query(q), expand_query(q));
    }

    #[test]
    fn test_pattern_rule_fires() {
        let (expanded, keywords) = expand_query("¿cuánto puedo deducir por prestaciones?");
        assert!(expanded.contains("veces el salario") || expanded.contains("salario mínimo"));
        assert!(keywords.iter().any(|k| k.contains("salario") || k.contains("previsión")));
    }
}
