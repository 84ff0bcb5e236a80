//! Serializes the (optionally ranked) roster into the prompt context block.

use crate::collectors::Collector;
use crate::geo::UserLocation;
use crate::ranking::rank_collectors;

/// Header used when the roster was ranked against a known location.
pub const RANKED_HEADER: &str = "Banco de Dados de Coletores Parceiros (ordenado por distância do usuário, mais próximo primeiro):";

/// Header used when no location is known and the roster is in its original order.
pub const UNRANKED_HEADER: &str = "Banco de Dados de Coletores Parceiros:";

/// Render the header line, a newline, and the full roster as 2-space indented JSON.
///
/// The whole roster is always included; there is no truncation.
#[must_use]
pub fn build_collectors_context(roster: &[Collector], location: Option<UserLocation>) -> String {
    let ranked = rank_collectors(roster, location);
    let header = if ranked.is_ranked() {
        RANKED_HEADER
    } else {
        UNRANKED_HEADER
    };
    // Plain structs with string keys cannot fail to serialize into memory.
    let data = serde_json::to_string_pretty(&ranked).unwrap_or_else(|_| String::from("[]"));
    format!("{header}\n{data}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{default_roster, Contact};

    fn split(context: &str) -> (&str, serde_json::Value) {
        let (header, data) = context.split_once('\n').expect("header line");
        (header, serde_json::from_str(data).expect("valid JSON body"))
    }

    #[test]
    fn unranked_context_has_plain_header_and_full_roster() {
        let roster = default_roster().unwrap();
        let context = build_collectors_context(roster.collectors(), None);
        let (header, data) = split(&context);
        assert_eq!(header, UNRANKED_HEADER);
        let entries = data.as_array().unwrap();
        assert_eq!(entries.len(), roster.len());
        assert!(entries.iter().all(|e| e.get("distanceKm").is_none()));
        assert_eq!(entries[0]["name"], "Green-Tech Recyclers");
    }

    #[test]
    fn ranked_context_has_sorted_header_and_distances() {
        let roster = default_roster().unwrap();
        let sao_paulo = UserLocation::new(-23.55, -46.63);
        let context = build_collectors_context(roster.collectors(), Some(sao_paulo));
        let (header, data) = split(&context);
        assert_eq!(header, RANKED_HEADER);
        let entries = data.as_array().unwrap();
        assert_eq!(entries.len(), roster.len());
        assert_eq!(entries[0]["name"], "Recicla Sampa Eletrônicos");
        assert_eq!(entries[1]["name"], "E-lixo Zero RJ");
        assert_eq!(entries[2]["name"], "BH Recicla Tech");
        let distances: Vec<f64> = entries
            .iter()
            .map(|e| e["distanceKm"].as_f64().unwrap())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn empty_roster_still_renders_header_and_empty_list() {
        assert_eq!(
            build_collectors_context(&[], None),
            format!("{UNRANKED_HEADER}\n[]")
        );
        assert_eq!(
            build_collectors_context(&[], Some(UserLocation::new(0.0, 0.0))),
            format!("{RANKED_HEADER}\n[]")
        );
    }

    #[test]
    fn fields_keep_declaration_order_with_two_space_indent() {
        let roster = vec![Collector {
            name: "Ponto Único".to_string(),
            address: "Rua A, 1".to_string(),
            latitude: -23.5,
            longitude: -46.6,
            contact: Contact {
                person: None,
                phone: Some("1234".to_string()),
                email: None,
            },
            hours: "Seg-Sex".to_string(),
            accepted_waste: vec!["Celulares".to_string()],
        }];
        let context = build_collectors_context(&roster, Some(UserLocation::new(-23.5, -46.6)));
        let expected = format!(
            "{RANKED_HEADER}\n{}",
            r#"[
  {
    "name": "Ponto Único",
    "address": "Rua A, 1",
    "latitude": -23.5,
    "longitude": -46.6,
    "contact": {
      "phone": "1234"
    },
    "hours": "Seg-Sex",
    "accepted_waste": [
      "Celulares"
    ],
    "distanceKm": 0
  }
]"#
        );
        assert_eq!(context, expected);
    }

    #[test]
    fn whole_numbers_print_without_fraction() {
        let roster = vec![Collector {
            name: "Centro".to_string(),
            address: "Praça 1".to_string(),
            latitude: -23.0,
            longitude: -46.25,
            contact: Contact::default(),
            hours: "24h".to_string(),
            accepted_waste: vec![],
        }];
        let context = build_collectors_context(&roster, None);
        assert!(context.contains("\"latitude\": -23,"), "{context}");
        assert!(context.contains("\"longitude\": -46.25,"), "{context}");
        assert!(!context.contains("-23.0"));
    }
}
