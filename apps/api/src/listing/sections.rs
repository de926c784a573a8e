//! Section kinds and the per-run section content map.
//!
//! Every content slot of the listing page is one `SectionKind`. The per-kind
//! rules (length limit, default text, writer persona) live in one lookup table
//! here instead of one writer type per section.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Title,
    MetaDescription,
    H1,
    Description,
    KeyFeatures,
    Neighborhood,
    CallToAction,
}

impl SectionKind {
    /// Document order.
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Title,
        SectionKind::MetaDescription,
        SectionKind::H1,
        SectionKind::Description,
        SectionKind::KeyFeatures,
        SectionKind::Neighborhood,
        SectionKind::CallToAction,
    ];

    /// Canonical key, as used in judge replies and logs.
    pub fn key(self) -> &'static str {
        match self {
            SectionKind::Title => "title",
            SectionKind::MetaDescription => "meta_description",
            SectionKind::H1 => "h1",
            SectionKind::Description => "description",
            SectionKind::KeyFeatures => "key_features",
            SectionKind::Neighborhood => "neighborhood",
            SectionKind::CallToAction => "call_to_action",
        }
    }

    /// Hard character limit enforced at assembly. `None` = no enforcement.
    pub fn max_chars(self) -> Option<usize> {
        match self {
            SectionKind::Title => Some(60),
            SectionKind::MetaDescription => Some(155),
            SectionKind::Description => Some(700),
            _ => None,
        }
    }

    /// Text used when the section has no content.
    pub fn default_text(self) -> &'static str {
        match self {
            SectionKind::Title => "Property Listing",
            SectionKind::MetaDescription => "",
            SectionKind::H1 => "Property Listing",
            SectionKind::Description => "Property description",
            SectionKind::KeyFeatures => "No features listed",
            SectionKind::Neighborhood => "Neighborhood information",
            SectionKind::CallToAction => "Contact us for more information",
        }
    }

    /// Writer persona (system instruction) for this kind.
    pub fn persona(self) -> &'static str {
        match self {
            SectionKind::Title => {
                "You are a real estate SEO expert. You write a single page title for a property listing, at most 60 characters."
            }
            SectionKind::MetaDescription => {
                "You are a real estate SEO expert. You write a single meta description for a property listing, at most 155 characters."
            }
            SectionKind::H1 => {
                "You are a real estate copywriting expert. You write a single compelling main heading (H1) for a property listing."
            }
            SectionKind::Description => {
                "You are a real estate copywriting expert. You write one engaging property description paragraph of at most 700 characters."
            }
            SectionKind::KeyFeatures => {
                "You are a real estate copywriting expert. You write 3 to 5 key property features as a list, one per line, each line starting with a hyphen (-)."
            }
            SectionKind::Neighborhood => {
                "You are a real estate copywriting expert. You write one lifestyle paragraph about the neighborhood of a property."
            }
            SectionKind::CallToAction => {
                "You are a real estate marketing expert. You write one short, persuasive call to action for a property listing."
            }
        }
    }

    /// Maps a section name as a judge might write it (any supported language,
    /// any casing, spaces/hyphens/underscores) to the canonical kind.
    pub fn from_synonym(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| c == '*' || c == '#' || c == '"' || c == '`' || c == '[' || c == ']')
            .to_lowercase()
            .chars()
            .map(|c| match c {
                '-' | '_' => ' ',
                'á' | 'à' | 'â' | 'ã' => 'a',
                'é' | 'ê' => 'e',
                'í' => 'i',
                'ó' | 'ô' | 'õ' => 'o',
                'ú' => 'u',
                'ç' => 'c',
                'ñ' => 'n',
                other => other,
            })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        let kind = match normalized.as_str() {
            "title" | "page title" | "titulo" | "titulo de la pagina" | "titulo da pagina" => {
                SectionKind::Title
            }
            "meta description" | "meta" | "description meta" | "meta descripcion"
            | "meta descricao" | "metadescripcion" | "metadescricao" => SectionKind::MetaDescription,
            "h1" | "heading" | "main heading" | "headline" | "encabezado" | "encabezado principal"
            | "titulo principal" | "cabecalho" | "cabecalho principal" => SectionKind::H1,
            "description" | "property description" | "descripcion" | "descricao"
            | "descripcion de la propiedad" | "descricao do imovel" => SectionKind::Description,
            "key features" | "features" | "caracteristicas" | "caracteristicas clave"
            | "caracteristicas principales" | "principais caracteristicas"
            | "caracteristicas principais" => SectionKind::KeyFeatures,
            "neighborhood" | "neighbourhood" | "barrio" | "vecindario" | "bairro"
            | "vizinhanca" => SectionKind::Neighborhood,
            "call to action" | "cta" | "llamada a la accion" | "llamado a la accion"
            | "chamada para acao" | "chamada a acao" | "chamada para a acao" => {
                SectionKind::CallToAction
            }
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section content
// ────────────────────────────────────────────────────────────────────────────

/// Current plain (unwrapped) text per section. Owned by the refinement loop;
/// every other component only ever sees a shared reference or a clone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionContent {
    sections: BTreeMap<SectionKind, String>,
}

impl SectionContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SectionKind) -> Option<&str> {
        self.sections.get(&kind).map(String::as_str)
    }

    pub fn set(&mut self, kind: SectionKind, text: impl Into<String>) {
        self.sections.insert(kind, text.into());
    }

    /// Stored text, or the kind's default when the section is missing.
    pub fn text_or_default(&self, kind: SectionKind) -> &str {
        self.get(kind).unwrap_or_else(|| kind.default_text())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Returns a copy with `updates` applied on top.
    pub fn with_updates(&self, updates: impl IntoIterator<Item = (SectionKind, String)>) -> Self {
        let mut next = self.clone();
        for (kind, text) in updates {
            next.set(kind, text);
        }
        next
    }
}

impl FromIterator<(SectionKind, String)> for SectionContent {
    fn from_iter<I: IntoIterator<Item = (SectionKind, String)>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_match_page_rules() {
        assert_eq!(SectionKind::Title.max_chars(), Some(60));
        assert_eq!(SectionKind::MetaDescription.max_chars(), Some(155));
        assert_eq!(SectionKind::Description.max_chars(), Some(700));
        assert_eq!(SectionKind::H1.max_chars(), None);
        assert_eq!(SectionKind::KeyFeatures.max_chars(), None);
    }

    #[test]
    fn test_keys_round_trip_through_synonyms() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_synonym(kind.key()), Some(kind));
        }
    }

    #[test]
    fn test_spanish_and_portuguese_synonyms() {
        assert_eq!(
            SectionKind::from_synonym("Meta Descripción"),
            Some(SectionKind::MetaDescription)
        );
        assert_eq!(
            SectionKind::from_synonym("Características Clave"),
            Some(SectionKind::KeyFeatures)
        );
        assert_eq!(SectionKind::from_synonym("Bairro"), Some(SectionKind::Neighborhood));
        assert_eq!(
            SectionKind::from_synonym("Chamada para Ação"),
            Some(SectionKind::CallToAction)
        );
        assert_eq!(SectionKind::from_synonym("**Título**"), Some(SectionKind::Title));
    }

    #[test]
    fn test_unknown_synonym() {
        assert_eq!(SectionKind::from_synonym("footer"), None);
    }

    #[test]
    fn test_missing_section_falls_back_to_default() {
        let content = SectionContent::new();
        assert_eq!(
            content.text_or_default(SectionKind::CallToAction),
            "Contact us for more information"
        );
        assert_eq!(content.text_or_default(SectionKind::MetaDescription), "");
    }

    #[test]
    fn test_with_updates_leaves_original_untouched() {
        let mut content = SectionContent::new();
        content.set(SectionKind::Title, "Old");
        let next = content.with_updates([(SectionKind::Title, "New".to_string())]);
        assert_eq!(content.get(SectionKind::Title), Some("Old"));
        assert_eq!(next.get(SectionKind::Title), Some("New"));
    }

    #[test]
    fn test_serde_key_matches_canonical_key() {
        let json = serde_json::to_string(&SectionKind::CallToAction).unwrap();
        assert_eq!(json, "\"call_to_action\"");
    }
}
