//! Path template handling.
//!
//! OpenAPI paths use `{param}` placeholders. Generated clients render them
//! with `format!`, so the template is turned into a format string with one
//! `{}` per placeholder and every other brace escaped.

/// Extracts placeholder names from a path template, in order.
///
/// ## Examples
///
/// ```
/// use apibind_gen::path_template::extract_path_params;
///
/// assert_eq!(extract_path_params("/pets"), Vec::<&str>::new());
/// assert_eq!(extract_path_params("/pets/{petId}"), vec!["petId"]);
/// assert_eq!(
///     extract_path_params("/stores/{storeId}/pets/{petId}"),
///     vec!["storeId", "petId"]
/// );
/// ```
pub fn extract_path_params(path: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in path.char_indices() {
        match c {
            '{' => start = Some(idx + 1),
            '}' => {
                if let Some(pos) = start.take() {
                    let param = &path[pos..idx];
                    if !param.is_empty() {
                        params.push(param);
                    }
                }
            }
            _ => {}
        }
    }

    params
}

/// Builds a `format!` string by replacing each `{param}` with `{}`.
///
/// Stray braces outside placeholders are escaped.
///
/// ## Examples
///
/// ```
/// use apibind_gen::path_template::build_format_string;
///
/// assert_eq!(build_format_string("/pets/{petId}/photos"), "/pets/{}/photos");
/// assert_eq!(build_format_string("/pets"), "/pets");
/// ```
pub fn build_format_string(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        result.push_str(&escape_braces(&rest[..open]));
        if close == open + 1 {
            result.push_str("{{}}");
        } else {
            result.push_str("{}");
        }
        rest = &rest[close + 1..];
    }

    result.push_str(&escape_braces(rest));
    result
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
