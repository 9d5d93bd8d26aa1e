use regex::{Captures, Regex};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$(UUID|Timestamp)\b").expect("keyword pattern is valid"))
}

/// Substitutes predefined keywords in test data with generated values.
///
/// Supported keywords:
/// - $UUID -> a fresh UUID v4 for every occurrence
/// - $Timestamp -> milliseconds since the unix epoch
pub fn substitute_keywords(input: &str) -> String {
    keyword_pattern()
        .replace_all(input, |caps: &Captures| match &caps[1] {
            "UUID" => Uuid::new_v4().to_string(),
            "Timestamp" => unix_millis().to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_substitution_single() {
        let input = "Your unique ID is $UUID.";
        let output = substitute_keywords(input);

        assert!(!output.contains("$UUID"));

        let uuid_part = output.replace("Your unique ID is ", "").replace('.', "");
        assert!(Uuid::parse_str(&uuid_part).is_ok());
    }

    #[test]
    fn test_uuid_substitution_multiple() {
        let input = "First UUID: $UUID, Second UUID: $UUID.";
        let output = substitute_keywords(input);

        assert!(!output.contains("$UUID"));

        let parts: Vec<&str> = output.split(", ").collect();
        let first_uuid = parts[0].replace("First UUID: ", "");
        let second_uuid = parts[1].replace("Second UUID: ", "").replace('.', "");

        assert!(Uuid::parse_str(&first_uuid).is_ok());
        assert!(Uuid::parse_str(&second_uuid).is_ok());
        assert_ne!(first_uuid, second_uuid);
    }

    #[test]
    fn test_timestamp_substitution() {
        let output = substitute_keywords("created at $Timestamp");
        let millis = output.trim_start_matches("created at ");
        assert!(millis.parse::<u128>().is_ok());
    }

    #[test]
    fn test_unknown_keywords_are_kept() {
        assert_eq!(substitute_keywords("cost: $UUIDs $Price"), "cost: $UUIDs $Price");
        assert_eq!(substitute_keywords("plain text"), "plain text");
    }
}
