//! Prompt assembly for the grounded text chat and the live voice session.
//!
//! Both paths are pure string composition; the caller submits the result to
//! the AI boundary.

use serde::{Deserialize, Serialize};

use crate::collectors::Collector;
use crate::context::build_collectors_context;
use crate::geo::UserLocation;
use crate::intent::{is_logistics_intent, should_use_location_tool};

/// Default instruction for single-image e-waste identification.
pub const DEFAULT_IMAGE_PROMPT: &str =
    "Identifique o lixo eletrônico nesta imagem e sugira como descartá-lo corretamente.";

/// Shown when an image analysis is requested with a blank prompt.
pub const IMAGE_PROMPT_MISSING_MESSAGE: &str =
    "Por favor, selecione uma imagem e forneça uma solicitação.";

/// Shown when image analysis fails.
pub const IMAGE_FAILURE_MESSAGE: &str = "Falha ao analisar a imagem. Por favor, tente novamente.";

/// External retrieval tool attached to one grounded completion. Exactly one per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolSelection {
    WebSearch,
    Maps { latitude: f64, longitude: f64 },
}

/// A fully assembled grounded-chat request, ready for the AI boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedRequest {
    pub prompt: String,
    pub tool: ToolSelection,
    /// Whether the collector context was injected into `prompt`.
    pub logistics: bool,
}

/// Build the text-chat request for `text`.
///
/// Logistics messages are wrapped in the partner-recommendation template with
/// the context block; anything else passes through verbatim. The tool choice
/// is computed independently of the wrapping.
#[must_use]
pub fn assemble_grounded_request(
    roster: &[Collector],
    text: &str,
    location: Option<UserLocation>,
) -> GroundedRequest {
    let logistics = is_logistics_intent(text);
    let prompt = if logistics {
        logistics_prompt(roster, text, location)
    } else {
        text.to_string()
    };

    let tool = match location {
        Some(loc) if should_use_location_tool(text, location) => ToolSelection::Maps {
            latitude: loc.latitude,
            longitude: loc.longitude,
        },
        _ => ToolSelection::WebSearch,
    };

    GroundedRequest {
        prompt,
        tool,
        logistics,
    }
}

fn logistics_prompt(roster: &[Collector], text: &str, location: Option<UserLocation>) -> String {
    let context = build_collectors_context(roster, location);
    let location_line = location.map_or_else(|| "Não fornecida.".to_string(), coordinates);
    format!(
        "
Você é um especialista em logística de descarte de lixo eletrônico.
Um usuário está pedindo ajuda. Sua tarefa principal é usar o banco de dados de parceiros fornecido para sugerir os pontos de coleta mais apropriados.
A lista de parceiros já está ordenada por distância do usuário (mais próximo primeiro).
Você DEVE recomendar pelo menos os 3 parceiros mais próximos desta lista antes de fornecer qualquer outro conselho geral sobre descarte. Indique claramente seus nomes e endereços.

{context}

Localização atual do usuário (se disponível): {location_line}

Solicitação do Usuário: \"{text}\"

Com base nisso, forneça sua recomendação.
"
    )
}

/// System instruction for a live voice session, fixed for the session's lifetime.
///
/// Unlike the chat path the context block is always injected and the
/// top-three mandate always applies; no intent check happens here.
#[must_use]
pub fn live_system_instruction(roster: &[Collector], location: Option<UserLocation>) -> String {
    let context = build_collectors_context(roster, location);
    let location_line = location.map_or_else(|| "desconhecida".to_string(), coordinates);
    format!(
        "Você é um agente de IA prestativo e amigável para o descarte de lixo eletrônico. Seja conciso. Quando questionado sobre descarte, pontos de coleta ou logística, você DEVE usar os dados dos parceiros fornecidos. Os dados estão ordenados por proximidade ao usuário. Sua tarefa principal é recomendar pelo menos os 3 parceiros mais próximos da lista antes de dar qualquer outro conselho.

{context}

A localização do usuário é {location_line}."
    )
}

fn coordinates(loc: UserLocation) -> String {
    format!(
        "Latitude: {}, Longitude: {}",
        loc.latitude, loc.longitude
    )
}
