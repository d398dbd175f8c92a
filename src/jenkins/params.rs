use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// One build parameter extracted from a job's config.xml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "defaultValue")]
    pub default_value: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

// Parameter blocks are flat elements like
// <hudson.model.StringParameterDefinition>...</hudson.model.StringParameterDefinition>;
// the non-greedy body stops at the first closing definition tag.
static PARAM_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<([A-Za-z0-9_.]*ParameterDefinition)(?:\s[^>]*)?>(.*?)</[A-Za-z0-9_.]*ParameterDefinition>",
    )
    .expect("invalid parameter block pattern")
});
static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("invalid name pattern"));
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<description>(.*?)</description>").expect("invalid description pattern")
});
static DEFAULT_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<defaultValue>(.*?)</defaultValue>").expect("invalid default pattern")
});

/// Extracts parameter definitions from a job configuration document.
/// Malformed or absent parameter blocks yield an empty list.
pub fn extract_parameters(config_xml: &str) -> Vec<ParameterDefinition> {
    PARAM_BLOCK
        .captures_iter(config_xml)
        .filter_map(|captures| {
            let element = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let block = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

            let name = tag_text(block, &NAME);
            if name.is_empty() {
                return None;
            }

            Some(ParameterDefinition {
                name,
                description: tag_text(block, &DESCRIPTION),
                default_value: tag_text(block, &DEFAULT_VALUE),
                param_type: param_type_from_element(element),
            })
        })
        .collect()
}

fn tag_text(block: &str, pattern: &Regex) -> String {
    pattern
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .unwrap_or_default()
}

/// `hudson.model.BooleanParameterDefinition` -> `Boolean`; anything that
/// does not follow the convention falls back to `String`.
fn param_type_from_element(element: &str) -> String {
    let short = element.rsplit('.').next().unwrap_or(element);
    match short.strip_suffix("ParameterDefinition") {
        Some(kind) if !kind.is_empty() => kind.to_string(),
        _ => "String".to_string(),
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
