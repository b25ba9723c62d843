//! Keyword extraction of profile facts from one exchange
//!
//! Deliberately shallow: tokens are matched against fixed keyword tables
//! covering crops (with Hindi aliases), Indian states, land units, interests,
//! farming methods and experience hints. Interests and experience are read
//! from the farmer's query only; everything else from query and response.

use super::profile::{ExtractedContext, ProfileField};

/// Canonical crop name and the terms that denote it
const CROP_TERMS: &[(&str, &[&str])] = &[
    ("rice", &["rice", "paddy", "basmati"]),
    ("wheat", &["wheat"]),
    ("cotton", &["cotton", "kapas"]),
    ("corn", &["corn", "maize", "makka"]),
    ("soybean", &["soybean", "soya"]),
    ("sugarcane", &["sugarcane", "ganna"]),
    ("potato", &["potato", "aloo"]),
    ("onion", &["onion", "pyaaz"]),
    ("tomato", &["tomato", "tamatar"]),
];

const STATES: &[&str] = &[
    "punjab",
    "haryana",
    "uttar pradesh",
    "bihar",
    "maharashtra",
    "gujarat",
    "rajasthan",
    "karnataka",
    "andhra pradesh",
    "telangana",
    "tamil nadu",
    "kerala",
    "west bengal",
    "odisha",
    "madhya pradesh",
];

const LAND_UNITS: &[&str] = &["acre", "acres", "hectare", "hectares", "bigha", "bighas"];

const INTEREST_TERMS: &[(&str, &[&str])] = &[
    ("organic farming", &["organic", "chemical-free", "natural farming"]),
    ("pest management", &["pest", "insect", "disease", "fungus"]),
    ("irrigation", &["irrigation", "water", "drip", "sprinkler"]),
    ("soil health", &["soil", "fertility", "nutrients"]),
    ("market prices", &["price", "market", "selling", "profit"]),
    ("weather", &["weather", "rainfall", "temperature", "climate"]),
];

const METHOD_TERMS: &[(&str, &[&str])] = &[
    ("organic", &["organic", "chemical-free", "bio"]),
    ("conventional", &["chemical", "fertilizer", "pesticide"]),
    ("integrated", &["ipm", "integrated pest management"]),
    ("precision", &["precision", "technology", "sensors"]),
];

const BEGINNER_TERMS: &[&str] = &["beginner", "first time", "new to farming"];

/// Lowercased word tokens; hyphens and decimal points stay inside tokens
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '.'))
        .map(|t| t.trim_matches(|c| c == '.' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `term` (one or more words) occurs in `tokens`
///
/// The final word may carry a plural `s`/`es`.
fn contains_term(tokens: &[String], term: &str) -> bool {
    let words: Vec<&str> = term.split_whitespace().collect();
    let Some((last, init)) = words.split_last() else {
        return false;
    };

    tokens.windows(words.len()).any(|window| {
        let (last_tok, init_toks) = match window.split_last() {
            Some(parts) => parts,
            None => return false,
        };
        init_toks.iter().zip(init).all(|(t, w)| t == w)
            && (last_tok == last
                || last_tok.strip_suffix('s') == Some(*last)
                || last_tok.strip_suffix("es") == Some(*last))
    })
}

fn any_term(tokens: &[String], terms: &[&str]) -> bool {
    terms.iter().any(|term| contains_term(tokens, term))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_number(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) && token.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// "<number> <unit>" with the number up to three tokens before the unit
fn find_farm_size(tokens: &[String]) -> Option<String> {
    for (i, token) in tokens.iter().enumerate() {
        if !LAND_UNITS.contains(&token.as_str()) {
            continue;
        }
        let start = i.saturating_sub(3);
        if let Some(number) = tokens[start..i].iter().rev().find(|t| is_number(t)) {
            return Some(format!("{} {}", number, token));
        }
    }
    None
}

/// "<n> years" followed within three tokens by "farming" or "experience"
fn find_experience(tokens: &[String]) -> Option<String> {
    for (i, token) in tokens.iter().enumerate() {
        if !matches!(token.as_str(), "year" | "years" | "yrs") || i == 0 {
            continue;
        }
        let number = &tokens[i - 1];
        if !is_number(number) {
            continue;
        }
        let end = (i + 4).min(tokens.len());
        if tokens[i + 1..end]
            .iter()
            .any(|t| t == "farming" || t == "experience")
        {
            return Some(format!("{} years", number));
        }
    }

    any_term(tokens, BEGINNER_TERMS).then(|| "beginner".to_string())
}

/// Extract profile facts from one query/response pair
pub fn extract_exchange_context(query: &str, response: &str) -> ExtractedContext {
    let query_tokens = tokenize(query);
    let mut all_tokens = query_tokens.clone();
    all_tokens.extend(tokenize(response));

    let mut extracted = ExtractedContext::new();

    for (crop, terms) in CROP_TERMS {
        if any_term(&all_tokens, terms) {
            extracted.insert(ProfileField::Crops, *crop);
        }
    }

    if let Some(state) = STATES.iter().find(|s| contains_term(&all_tokens, s)) {
        extracted.insert(ProfileField::Location, title_case(state));
    }

    if let Some(size) = find_farm_size(&query_tokens).or_else(|| find_farm_size(&all_tokens)) {
        extracted.insert(ProfileField::FarmSize, size);
    }

    for (interest, terms) in INTEREST_TERMS {
        if any_term(&query_tokens, terms) {
            extracted.insert(ProfileField::Interests, *interest);
        }
    }

    for (method, terms) in METHOD_TERMS {
        if any_term(&all_tokens, terms) {
            extracted.insert(ProfileField::FarmingMethods, *method);
        }
    }

    if let Some(experience) = find_experience(&query_tokens) {
        extracted.insert(ProfileField::Experience, experience);
    }

    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_aliases_map_to_canonical_names() {
        let extracted = extract_exchange_context(
            "My paddy and aloo fields need attention",
            "Tomatoes can follow potatoes.",
        );
        assert_eq!(
            extracted.get(ProfileField::Crops),
            ["rice", "potato", "tomato"]
        );
    }

    #[test]
    fn test_location_is_title_cased_multiword_state() {
        let extracted = extract_exchange_context("I farm near Lucknow in uttar pradesh", "");
        assert_eq!(extracted.get(ProfileField::Location), ["Uttar Pradesh"]);
    }

    #[test]
    fn test_no_false_location_from_substrings() {
        let extracted = extract_exchange_context("Please update my irrigation schedule", "");
        assert!(extracted.get(ProfileField::Location).is_empty());
    }

    #[test]
    fn test_farm_size_with_number_before_unit() {
        let extracted = extract_exchange_context("I have 12.5 acres of wheat", "");
        assert_eq!(extracted.get(ProfileField::FarmSize), ["12.5 acres"]);

        let extracted = extract_exchange_context("about 4 pucca bigha", "");
        assert_eq!(extracted.get(ProfileField::FarmSize), ["4 bigha"]);
    }

    #[test]
    fn test_interests_only_from_query() {
        let extracted = extract_exchange_context(
            "How do I control pests?",
            "Check the market price and the weather first.",
        );
        assert_eq!(extracted.get(ProfileField::Interests), ["pest management"]);
    }

    #[test]
    fn test_methods_and_experience() {
        let extracted = extract_exchange_context(
            "I have 15 years of farming behind me and want IPM advice",
            "Integrated pest management reduces chemical use.",
        );
        assert_eq!(
            extracted.get(ProfileField::FarmingMethods),
            ["conventional", "integrated"]
        );
        assert_eq!(extracted.get(ProfileField::Experience), ["15 years"]);

        let extracted = extract_exchange_context("I am new to farming", "");
        assert_eq!(extracted.get(ProfileField::Experience), ["beginner"]);
    }

    #[test]
    fn test_contains_term_plural_and_multiword() {
        let tokens = tokenize("Integrated pest managements, onions.");
        assert!(contains_term(&tokens, "integrated pest management"));
        assert!(contains_term(&tokens, "onion"));
        assert!(!contains_term(&tokens, "pesticide"));
    }
}
