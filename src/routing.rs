//! Decodes dotted AMQP routing keys against a reference schema.

use crate::error::PulseError;

/// One positional component of a dotted routing key schema. At most one
/// descriptor in a given reference list may set `multiple_words`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    pub name: String,
    pub multiple_words: bool,
}

impl KeyPart {
    pub fn single(name: impl Into<String>) -> Self {
        KeyPart {
            name: name.into(),
            multiple_words: false,
        }
    }

    pub fn multi(name: impl Into<String>) -> Self {
        KeyPart {
            name: name.into(),
            multiple_words: true,
        }
    }
}

/// A `(queue, exchange, routingKeyPattern)` association, plus the
/// optional schema used to decode matching deliveries' routing keys.
#[derive(Debug, Clone)]
pub struct Binding {
    pub exchange: String,
    pub routing_key_pattern: String,
    pub routing_key_reference: Option<Vec<KeyPart>>,
}

impl Binding {
    pub fn new(exchange: impl Into<String>, routing_key_pattern: impl Into<String>) -> Self {
        Binding {
            exchange: exchange.into(),
            routing_key_pattern: routing_key_pattern.into(),
            routing_key_reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Vec<KeyPart>) -> Self {
        self.routing_key_reference = Some(reference);
        self
    }
}

/// The decoded mapping from reference part name to value, in the same
/// order as the reference list — so that re-joining the values (with the
/// multi-word value substituted whole) reproduces the original key.
///
/// `multi_index` names which entry (if any) came from a `multiple_words`
/// reference part: its value may itself span zero or more dot-separated
/// segments (including zero, when it consumed none of the key), unlike
/// every other entry, which always corresponds to exactly one segment.
/// That distinction matters for reconstruction — see `to_routing_key`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Routing {
    parts: Vec<(String, String)>,
    multi_index: Option<usize>,
}

impl Routing {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Reconstructs the original dotted routing key. Every entry except
    /// the multi-word one contributes exactly one segment; the
    /// multi-word entry contributes however many dot-separated segments
    /// its own value splits into — zero if it's empty, which is how a
    /// multi-word part that consumed none of the key round-trips without
    /// leaving a stray leading/trailing/doubled dot.
    pub fn to_routing_key(&self) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(self.parts.len());
        for (i, (_, value)) in self.parts.iter().enumerate() {
            if Some(i) == self.multi_index {
                if !value.is_empty() {
                    segments.extend(value.split('.'));
                }
            } else {
                segments.push(value.as_str());
            }
        }
        segments.join(".")
    }
}

/// Walks `reference` forward assigning dot-parts until a `multiple_words`
/// part is hit, then walks backward from the tail assigning the
/// remaining parts, joining whatever is left over (inclusive of the
/// internal dots) into the multi-word part.
pub fn parse(routing_key: &str, reference: &[KeyPart]) -> Result<Routing, PulseError> {
    let multi_count = reference.iter().filter(|p| p.multiple_words).count();
    if multi_count > 1 {
        return Err(PulseError::Configuration(
            "routing key reference may have at most one multiple_words part".to_string(),
        ));
    }

    let parts: Vec<&str> = routing_key.split('.').collect();

    let multi_index = reference.iter().position(|p| p.multiple_words);

    let Some(multi_index) = multi_index else {
        if parts.len() != reference.len() {
            return Err(PulseError::Configuration(format!(
                "routing key {routing_key:?} has {} parts, reference expects {}",
                parts.len(),
                reference.len()
            )));
        }
        let mapped = reference
            .iter()
            .zip(parts.iter())
            .map(|(p, v)| (p.name.clone(), v.to_string()))
            .collect();
        return Ok(Routing {
            parts: mapped,
            multi_index: None,
        });
    };

    let before = &reference[..multi_index];
    let after = &reference[multi_index + 1..];

    if parts.len() < before.len() + after.len() {
        return Err(PulseError::Configuration(format!(
            "routing key {routing_key:?} too short for reference with {} fixed parts",
            before.len() + after.len()
        )));
    }

    let mut mapped = Vec::with_capacity(reference.len());
    for (part, value) in before.iter().zip(parts.iter()) {
        mapped.push((part.name.clone(), value.to_string()));
    }

    let tail_start = parts.len() - after.len();
    let multi_value = parts[before.len()..tail_start].join(".");
    mapped.push((reference[multi_index].name.clone(), multi_value));

    for (part, value) in after.iter().zip(parts[tail_start..].iter()) {
        mapped.push((part.name.clone(), value.to_string()));
    }

    Ok(Routing {
        parts: mapped,
        multi_index: Some(multi_index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verb_object_remainder() -> Vec<KeyPart> {
        vec![
            KeyPart::single("verb"),
            KeyPart::single("object"),
            KeyPart::multi("remainder"),
        ]
    }

    #[test]
    fn parses_scenario_3_routing_key() {
        let routing = parse("greetings.earthling.foo.bar.bing", &verb_object_remainder()).unwrap();
        assert_eq!(routing.get("verb"), Some("greetings"));
        assert_eq!(routing.get("object"), Some("earthling"));
        assert_eq!(routing.get("remainder"), Some("foo.bar.bing"));
    }

    #[test]
    fn round_trips_back_to_the_original_key() {
        let key = "greetings.earthling.foo.bar.bing";
        let routing = parse(key, &verb_object_remainder()).unwrap();
        assert_eq!(routing.to_routing_key(), key);
    }

    #[test]
    fn empty_multi_word_value_is_permitted() {
        let routing = parse("greetings.earthling", &verb_object_remainder()).unwrap();
        assert_eq!(routing.get("remainder"), Some(""));
    }

    #[test]
    fn empty_multi_word_value_round_trips_without_a_stray_dot() {
        let key = "greetings.earthling";
        let routing = parse(key, &verb_object_remainder()).unwrap();
        assert_eq!(routing.to_routing_key(), key);
    }

    #[test]
    fn empty_multi_word_value_at_the_head_round_trips() {
        let reference = vec![KeyPart::multi("prefix"), KeyPart::single("suffix")];
        let key = "tail";
        let routing = parse(key, &reference).unwrap();
        assert_eq!(routing.get("prefix"), Some(""));
        assert_eq!(routing.to_routing_key(), key);
    }

    #[test]
    fn no_multi_word_part_requires_exact_length() {
        let reference = vec![KeyPart::single("a"), KeyPart::single("b")];
        assert!(parse("one.two.three", &reference).is_err());
        let routing = parse("one.two", &reference).unwrap();
        assert_eq!(routing.get("a"), Some("one"));
        assert_eq!(routing.get("b"), Some("two"));
    }

    #[test]
    fn rejects_more_than_one_multi_word_part() {
        let reference = vec![KeyPart::multi("a"), KeyPart::multi("b")];
        assert!(parse("x.y", &reference).is_err());
    }

    #[test]
    fn multi_word_part_can_be_first() {
        let reference = vec![KeyPart::multi("prefix"), KeyPart::single("suffix")];
        let routing = parse("a.b.c.tail", &reference).unwrap();
        assert_eq!(routing.get("prefix"), Some("a.b.c"));
        assert_eq!(routing.get("suffix"), Some("tail"));
    }
}
