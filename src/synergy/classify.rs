// src/synergy/classify.rs — Category prompt, strict answer parsing, keyword fallback

use serde::Serialize;

use crate::core::types::Category;
use crate::infra::errors::SynergyError;

/// Few-shot examples shared by the prompt and the local backend's exemplars.
pub const FEW_SHOT: &[(&str, Category)] = &[
    ("motion sensor in hallway, light in hallway", Category::Convenience),
    ("doorbell in entrance, media player in living room", Category::Convenience),
    ("front door lock in entrance, alarm panel in entrance", Category::Security),
    ("camera in garden, siren in garden", Category::Security),
    ("power plug in office, monitor in office", Category::Energy),
    ("solar inverter in garage, water heater in garage", Category::Energy),
    ("temperature sensor in bedroom, thermostat in bedroom", Category::Comfort),
    ("humidity sensor in bathroom, fan in bathroom", Category::Comfort),
];

const SECURITY_WORDS: &[&str] = &[
    "lock", "alarm", "siren", "camera", "intrusion", "security", "tamper", "smoke",
];
const ENERGY_WORDS: &[&str] = &[
    "power", "energy", "plug", "outlet", "solar", "meter", "consumption", "standby", "battery",
    "inverter",
];
const COMFORT_WORDS: &[&str] = &[
    "temperature", "thermostat", "climate", "humidity", "fan", "blind", "cover", "shade",
    "curtain", "heat", "cool", "air",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Model,
    Keyword,
    Default,
}

/// Structured few-shot prompt for generative backends.
pub fn build_prompt(description: &str) -> String {
    let mut prompt = String::from(
        "Classify the home automation opportunity into exactly one category.\n\
         Valid categories: energy, comfort, security, convenience.\n\
         Answer with the category word only.\n\n",
    );
    for (example, category) in FEW_SHOT {
        prompt.push_str(&format!("Devices: {example}\nCategory: {}\n\n", category.as_str()));
    }
    prompt.push_str(&format!("Devices: {description}\nCategory:"));
    prompt
}

/// Strictly parse a model answer. Only surrounding whitespace, quotes and
/// trailing punctuation are tolerated; the remainder must be one of the four
/// literals.
pub fn parse_model_output(raw: &str) -> Option<Category> {
    let first_line = raw.trim().lines().next()?;
    let is_quote = |c: char| c == '"' || c == '\'' || c == '`';
    let cleaned = first_line
        .trim()
        .trim_end_matches(['.', '!', ','])
        .trim_matches(is_quote)
        .trim_end_matches(['.', '!', ','])
        .to_lowercase();
    Category::parse_literal(&cleaned)
}

/// Keyword match over the description; `None` when nothing matches.
pub fn keyword_category(description: &str) -> Option<Category> {
    let tokens: Vec<String> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    let hit = |words: &[&str]| {
        tokens
            .iter()
            .any(|t| words.iter().any(|w| t.starts_with(w)))
    };

    if hit(SECURITY_WORDS) {
        Some(Category::Security)
    } else if hit(ENERGY_WORDS) {
        Some(Category::Energy)
    } else if hit(COMFORT_WORDS) {
        Some(Category::Comfort)
    } else {
        None
    }
}

/// Resolve the final category from a model answer (or failure).
pub fn resolve(
    answer: Result<String, SynergyError>,
    description: &str,
) -> (Category, ClassificationSource) {
    match answer {
        Ok(raw) => {
            if let Some(category) = parse_model_output(&raw) {
                return (category, ClassificationSource::Model);
            }
            tracing::debug!(answer = %raw, "Unparseable category answer, using keywords");
        }
        Err(e) => tracing::warn!("Classification failed, using keywords: {e}"),
    }
    match keyword_category(description) {
        Some(category) => (category, ClassificationSource::Keyword),
        None => (Category::Convenience, ClassificationSource::Default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_plain_literal() {
        assert_eq!(parse_model_output(" comfort\n"), Some(Category::Comfort));
        assert_eq!(parse_model_output("\"Energy\"."), Some(Category::Energy));
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert_eq!(parse_model_output("The category is security"), None);
        assert_eq!(parse_model_output("safety"), None);
        assert_eq!(parse_model_output(""), None);
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(
            keyword_category("front door lock in entrance"),
            Some(Category::Security)
        );
        assert_eq!(
            keyword_category("smart plug in office, lamp in office"),
            Some(Category::Energy)
        );
        assert_eq!(keyword_category("ceiling fan in bedroom"), Some(Category::Comfort));
        assert_eq!(keyword_category("motion sensor in hall, light in hall"), None);
    }

    #[test]
    fn test_resolve_prefers_model_answer() {
        let (c, src) = resolve(Ok("energy".into()), "alarm panel");
        assert_eq!(c, Category::Energy);
        assert_eq!(src, ClassificationSource::Model);
    }

    #[test]
    fn test_resolve_falls_back_to_keywords_then_default() {
        let (c, src) = resolve(Ok("unknown".into()), "alarm panel in hall");
        assert_eq!((c, src), (Category::Security, ClassificationSource::Keyword));

        let err = SynergyError::ModelUnavailable {
            backend: "test".into(),
            message: "down".into(),
        };
        let (c, src) = resolve(Err(err), "motion sensor in hall, light in hall");
        assert_eq!((c, src), (Category::Convenience, ClassificationSource::Default));
    }

    #[test]
    fn test_prompt_lists_examples_and_target() {
        let p = build_prompt("lamp in den");
        assert!(p.contains("Category: security"));
        assert!(p.ends_with("Devices: lamp in den\nCategory:"));
    }
}
