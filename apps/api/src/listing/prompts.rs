//! Prompt catalog for the section writers.
//!
//! One template per (language × section kind × stage), built once at startup
//! and handed to the `ContentOracle` as configuration. Templates are composed
//! from a per-language frame plus a per-kind task line and length rule.
//!
//! Placeholders: `{language_name}`, `{tone}`, `{tone_description}`,
//! `{property_data}`, `{current_content}`, `{instruction}`.

use std::collections::HashMap;

use crate::listing::options::Language;
use crate::listing::sections::SectionKind;
use crate::llm_client::prompts::fill_placeholders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptStage {
    Initial,
    Refinement,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct PromptVars<'a> {
    pub language_name: &'a str,
    pub tone: &'a str,
    pub tone_description: &'a str,
    pub property_data: &'a str,
    pub current_content: &'a str,
    pub instruction: &'a str,
}

#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: HashMap<(Language, SectionKind, PromptStage), String>,
}

impl PromptCatalog {
    /// Built-in templates for every supported language.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        for language in Language::ALL {
            let frame = frame(language);
            for kind in SectionKind::ALL {
                let wording = wording(language, kind);
                let initial = frame
                    .initial
                    .replace("{task}", wording.task)
                    .replace("{rule}", wording.rule);
                let refinement = frame
                    .refinement
                    .replace("{task}", wording.refine_task)
                    .replace("{rule}", wording.rule);
                templates.insert((language, kind, PromptStage::Initial), initial);
                templates.insert((language, kind, PromptStage::Refinement), refinement);
            }
        }
        Self { templates }
    }

    /// Renders the template for `(language, kind, stage)`. Falls back to the
    /// English template if a language entry is missing.
    pub fn render(
        &self,
        language: Language,
        kind: SectionKind,
        stage: PromptStage,
        vars: &PromptVars<'_>,
    ) -> String {
        let template = self
            .templates
            .get(&(language, kind, stage))
            .or_else(|| self.templates.get(&(Language::En, kind, stage)))
            .map(String::as_str)
            .unwrap_or("{property_data}");

        fill_placeholders(
            template,
            &[
                ("language_name", vars.language_name),
                ("tone", vars.tone),
                ("tone_description", vars.tone_description),
                ("current_content", vars.current_content),
                ("instruction", vars.instruction),
                ("property_data", vars.property_data),
            ],
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-language frames
// ────────────────────────────────────────────────────────────────────────────

struct Frame {
    initial: &'static str,
    refinement: &'static str,
}

fn frame(language: Language) -> Frame {
    match language {
        Language::En => Frame {
            initial: "Respond exclusively in {language_name}. Do not use any other language.\n\
{task}\n\
Tone: {tone}. Tone details: {tone_description}\n\
{rule}\n\
\n\
Property data:\n\
{property_data}\n\
\n\
Only output the requested text, with no explanations or extra content.",
            refinement: "Respond exclusively in {language_name}. Do not use any other language.\n\
{task}\n\
Tone: {tone}. Tone details: {tone_description}\n\
{rule}\n\
\n\
Current text:\n\
{current_content}\n\
\n\
Property data:\n\
{property_data}\n\
\n\
Instruction for improvement:\n\
- {instruction}\n\
\n\
Only output the improved text, with no explanations or extra content.",
        },
        Language::Es => Frame {
            initial: "Responde exclusivamente en {language_name}. No uses ningún otro idioma.\n\
{task}\n\
Tono: {tone}. Detalles del tono: {tone_description}\n\
{rule}\n\
\n\
Datos de la propiedad:\n\
{property_data}\n\
\n\
Solo proporciona el texto solicitado, sin explicaciones ni contenido adicional.",
            refinement: "Responde exclusivamente en {language_name}. No uses ningún otro idioma.\n\
{task}\n\
Tono: {tone}. Detalles del tono: {tone_description}\n\
{rule}\n\
\n\
Texto actual:\n\
{current_content}\n\
\n\
Datos de la propiedad:\n\
{property_data}\n\
\n\
Instrucción de mejora:\n\
- {instruction}\n\
\n\
Solo proporciona el texto mejorado, sin explicaciones ni contenido adicional.",
        },
        Language::Pt => Frame {
            initial: "Responda exclusivamente em {language_name}. Não use nenhum outro idioma.\n\
{task}\n\
Tom: {tone}. Detalhes do tom: {tone_description}\n\
{rule}\n\
\n\
Dados do imóvel:\n\
{property_data}\n\
\n\
Forneça apenas o texto solicitado, sem explicações ou conteúdo extra.",
            refinement: "Responda exclusivamente em {language_name}. Não use nenhum outro idioma.\n\
{task}\n\
Tom: {tone}. Detalhes do tom: {tone_description}\n\
{rule}\n\
\n\
Texto atual:\n\
{current_content}\n\
\n\
Dados do imóvel:\n\
{property_data}\n\
\n\
Instrução de melhoria:\n\
- {instruction}\n\
\n\
Forneça apenas o texto melhorado, sem explicações ou conteúdo extra.",
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-kind wording
// ────────────────────────────────────────────────────────────────────────────

struct Wording {
    task: &'static str,
    refine_task: &'static str,
    rule: &'static str,
}

fn wording(language: Language, kind: SectionKind) -> Wording {
    use Language::*;
    use SectionKind::*;

    match (language, kind) {
        (En, Title) => Wording {
            task: "Generate an SEO page title for the following property.",
            refine_task: "Refine this property page title following the instruction below.",
            rule: "CRITICAL: maximum 60 characters including spaces.",
        },
        (En, MetaDescription) => Wording {
            task: "Generate a meta description for the following property.",
            refine_task: "Refine this property meta description following the instruction below.",
            rule: "CRITICAL: maximum 155 characters including spaces.",
        },
        (En, H1) => Wording {
            task: "Generate the main H1 heading for the following property.",
            refine_task: "Refine this property H1 heading following the instruction below.",
            rule: "Keep it to a single short line.",
        },
        (En, Description) => Wording {
            task: "Generate an engaging description paragraph for the following property.",
            refine_task: "Refine this property description following the instruction below.",
            rule: "CRITICAL: maximum 700 characters including spaces.",
        },
        (En, KeyFeatures) => Wording {
            task: "Generate 3-5 key features for the following property. Use ONLY the listed features.",
            refine_task: "Refine this key features list following the instruction below. Use ONLY the listed features.",
            rule: "Output one feature per line, each line starting with a hyphen (-).",
        },
        (En, Neighborhood) => Wording {
            task: "Generate a lifestyle paragraph about the neighborhood of the following property.",
            refine_task: "Refine this neighborhood description following the instruction below.",
            rule: "Keep it to one informative, appealing paragraph.",
        },
        (En, CallToAction) => Wording {
            task: "Generate a short call to action inviting buyers to contact the agent about the following property.",
            refine_task: "Refine this call to action following the instruction below.",
            rule: "Keep it to one or two sentences.",
        },
        (Es, Title) => Wording {
            task: "Genera un título SEO para la siguiente propiedad.",
            refine_task: "Refina este título de propiedad siguiendo la instrucción indicada abajo.",
            rule: "CRÍTICO: máximo 60 caracteres incluyendo espacios.",
        },
        (Es, MetaDescription) => Wording {
            task: "Genera una meta descripción para la siguiente propiedad.",
            refine_task: "Refina esta meta descripción siguiendo la instrucción indicada abajo.",
            rule: "CRÍTICO: máximo 155 caracteres incluyendo espacios.",
        },
        (Es, H1) => Wording {
            task: "Genera el encabezado principal H1 para la siguiente propiedad.",
            refine_task: "Refina este encabezado H1 siguiendo la instrucción indicada abajo.",
            rule: "Mantenlo en una sola línea corta.",
        },
        (Es, Description) => Wording {
            task: "Genera un párrafo de descripción atractivo para la siguiente propiedad.",
            refine_task: "Refina esta descripción siguiendo la instrucción indicada abajo.",
            rule: "CRÍTICO: máximo 700 caracteres incluyendo espacios.",
        },
        (Es, KeyFeatures) => Wording {
            task: "Genera de 3 a 5 características clave para la siguiente propiedad. Usa SOLO las características listadas.",
            refine_task: "Refina esta lista de características siguiendo la instrucción indicada abajo. Usa SOLO las características listadas.",
            rule: "Una característica por línea, cada línea empezando con un guion (-).",
        },
        (Es, Neighborhood) => Wording {
            task: "Genera un párrafo sobre el estilo de vida del barrio de la siguiente propiedad.",
            refine_task: "Refina esta descripción del barrio siguiendo la instrucción indicada abajo.",
            rule: "Un solo párrafo informativo y atractivo.",
        },
        (Es, CallToAction) => Wording {
            task: "Genera una llamada a la acción breve invitando a contactar al agente sobre la siguiente propiedad.",
            refine_task: "Refina esta llamada a la acción siguiendo la instrucción indicada abajo.",
            rule: "Una o dos frases como máximo.",
        },
        (Pt, Title) => Wording {
            task: "Gere um título SEO para o seguinte imóvel.",
            refine_task: "Refine este título do imóvel seguindo a instrução abaixo.",
            rule: "CRÍTICO: máximo de 60 caracteres incluindo espaços.",
        },
        (Pt, MetaDescription) => Wording {
            task: "Gere uma meta descrição para o seguinte imóvel.",
            refine_task: "Refine esta meta descrição seguindo a instrução abaixo.",
            rule: "CRÍTICO: máximo de 155 caracteres incluindo espaços.",
        },
        (Pt, H1) => Wording {
            task: "Gere o cabeçalho principal H1 para o seguinte imóvel.",
            refine_task: "Refine este cabeçalho H1 seguindo a instrução abaixo.",
            rule: "Mantenha-o numa única linha curta.",
        },
        (Pt, Description) => Wording {
            task: "Gere um parágrafo de descrição atraente para o seguinte imóvel.",
            refine_task: "Refine esta descrição seguindo a instrução abaixo.",
            rule: "CRÍTICO: máximo de 700 caracteres incluindo espaços.",
        },
        (Pt, KeyFeatures) => Wording {
            task: "Gere de 3 a 5 características principais para o seguinte imóvel. Use APENAS as características listadas.",
            refine_task: "Refine esta lista de características seguindo a instrução abaixo. Use APENAS as características listadas.",
            rule: "Uma característica por linha, cada linha começando com um hífen (-).",
        },
        (Pt, Neighborhood) => Wording {
            task: "Gere um parágrafo sobre o estilo de vida do bairro do seguinte imóvel.",
            refine_task: "Refine esta descrição do bairro seguindo a instrução abaixo.",
            rule: "Um único parágrafo informativo e atraente.",
        },
        (Pt, CallToAction) => Wording {
            task: "Gere uma chamada para ação curta convidando a contactar o agente sobre o seguinte imóvel.",
            refine_task: "Refine esta chamada para ação seguindo a instrução abaixo.",
            rule: "Uma ou duas frases no máximo.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> PromptVars<'static> {
        PromptVars {
            language_name: "English",
            tone: "luxury",
            tone_description: "Sophisticated and premium.",
            property_data: "{\"price\": 850000}",
            current_content: "Old title",
            instruction: "Problem: too long; Fix: shorten it",
        }
    }

    #[test]
    fn test_catalog_covers_every_language_kind_stage() {
        let catalog = PromptCatalog::builtin();
        assert_eq!(
            catalog.templates.len(),
            Language::ALL.len() * SectionKind::ALL.len() * 2
        );
    }

    #[test]
    fn test_initial_prompt_fills_placeholders() {
        let catalog = PromptCatalog::builtin();
        let prompt = catalog.render(Language::En, SectionKind::Title, PromptStage::Initial, &vars());
        assert!(prompt.contains("English"));
        assert!(prompt.contains("luxury"));
        assert!(prompt.contains("Sophisticated and premium."));
        assert!(prompt.contains("850000"));
        assert!(prompt.contains("60 characters"));
        assert!(!prompt.contains("{tone}"), "unfilled placeholder: {prompt}");
    }

    #[test]
    fn test_refinement_prompt_carries_current_text_and_instruction() {
        let catalog = PromptCatalog::builtin();
        let prompt = catalog.render(
            Language::Es,
            SectionKind::Description,
            PromptStage::Refinement,
            &vars(),
        );
        assert!(prompt.contains("Old title"));
        assert!(prompt.contains("Fix: shorten it"));
        assert!(prompt.contains("Responde exclusivamente"));
        assert!(prompt.contains("700"));
    }

    #[test]
    fn test_placeholder_text_in_current_content_stays_literal() {
        let catalog = PromptCatalog::builtin();
        let vars = PromptVars {
            current_content: "Text with {property_data} literal",
            property_data: "SECRET_DATA",
            ..vars()
        };
        let prompt = catalog.render(Language::En, SectionKind::Description, PromptStage::Refinement, &vars);
        assert!(prompt.contains("Text with {property_data} literal"), "{prompt}");
        assert_eq!(prompt.matches("SECRET_DATA").count(), 1);
    }

    #[test]
    fn test_portuguese_key_features_prompt_demands_hyphen_list() {
        let catalog = PromptCatalog::builtin();
        let prompt = catalog.render(
            Language::Pt,
            SectionKind::KeyFeatures,
            PromptStage::Initial,
            &vars(),
        );
        assert!(prompt.contains("hífen (-)"));
        assert!(prompt.contains("APENAS"));
    }
}
