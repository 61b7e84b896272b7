//! Identifier normalization.
//!
//! OpenAPI schema keys, property names, enum literals and operation ids are
//! arbitrary strings. [`normalize`] turns any of them into a PascalCase
//! identifier; the remaining helpers turn that into something `quote!` can
//! splice into Rust code without producing an invalid or colliding token.

use std::collections::{BTreeMap, HashSet};

use apibind_define::SchemaMap;
use proc_macro2::{Ident, Span};

/// Rust keywords that cannot be used as bare identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that are not allowed even as raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Type names that would shadow prelude items or the generated runtime.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "ApiClientBase", "AsMut", "AsRef", "Box", "Clone", "ClientError", "Copy", "Default",
    "Deserialize", "Drop", "Eq", "Err", "Extend", "Fn", "FnMut", "FnOnce", "From", "FromIterator",
    "Future", "Into", "IntoIterator", "Iterator", "None", "Ok", "Option", "Ord", "PartialEq",
    "PartialOrd", "Result", "Self", "Send", "Serialize", "Sized", "Some", "String", "Sync", "ToOwned",
    "ToString", "TryFrom", "TryInto", "Unpin", "Vec",
];

/// Normalizes an arbitrary string into a PascalCase identifier.
///
/// Whitespace and underscores separate words, every other character outside
/// `[A-Za-z0-9]` is dropped, each word is capitalized and acronyms are folded
/// (`HTTPServer` becomes `HttpServer`). A leading digit is escaped with an
/// underscore. The function is total and idempotent on its own output.
///
/// ## Examples
///
/// ```
/// use apibind_gen::naming::normalize;
///
/// assert_eq!(normalize("pet store"), "PetStore");
/// assert_eq!(normalize("already_Pascal"), "AlreadyPascal");
/// assert_eq!(normalize("alreadyPascal"), "AlreadyPascal");
/// assert_eq!(normalize("ABcDEf"), "AbcDef");
/// assert_eq!(normalize("123abc"), "_123Abc");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(raw: &str) -> String {
    let words: Vec<String> = raw
        .split(|c: char| c.is_whitespace() || c == '_')
        .map(|word| word.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
        .filter(|word| !word.is_empty())
        .map(|word| normalize_word(&word))
        .collect();

    let joined = normalize_word(&words.concat());
    if joined.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{joined}")
    } else {
        joined
    }
}

/// Applies the casing rules to a single ASCII alphanumeric word.
fn normalize_word(word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();

    if let Some(first) = chars.first_mut() {
        first.make_ascii_uppercase();
    }

    // An all-caps tail after a capital reads as an acronym: `UserID` -> `UserId`.
    let tail = (1..chars.len()).find(|&i| {
        chars[i - 1].is_ascii_uppercase()
            && chars[i..]
                .iter()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    });
    if let Some(start) = tail {
        chars[start..].iter_mut().for_each(char::make_ascii_lowercase);
    }

    for i in 1..chars.len() {
        if chars[i - 1].is_ascii_digit() {
            chars[i].make_ascii_uppercase();
        }
    }

    // Fold runs of capitals, keeping the capital that starts the next word
    // in runs of three or more: `HTTPServer` -> `HttpServer`, `ABcD` -> `AbcD`.
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_uppercase() {
            i += 1;
        }
        let run = i - start;
        if run >= 2 {
            let keep_last = run >= 3 && chars.get(i).is_some_and(char::is_ascii_lowercase);
            let stop = if keep_last { i - 1 } else { i };
            chars[start + 1..stop]
                .iter_mut()
                .for_each(char::make_ascii_lowercase);
        }
    }

    chars.into_iter().collect()
}

/// Converts a normalized PascalCase identifier into snake_case.
///
/// ## Examples
///
/// ```
/// use apibind_gen::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("PetId"), "pet_id");
/// assert_eq!(to_snake_case("HttpServer2Go"), "http_server2_go");
/// assert_eq!(to_snake_case("_123Abc"), "_123_abc");
/// ```
pub fn to_snake_case(pascal: &str) -> String {
    let mut out = String::with_capacity(pascal.len() + 4);
    let mut previous: Option<char> = None;
    for c in pascal.chars() {
        if c.is_ascii_uppercase()
            && previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
        previous = Some(c);
    }
    out
}

/// Returns `true` if `name` is a Rust keyword.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Creates an identifier token, escaping keywords.
///
/// Keywords that allow it become raw identifiers (`r#type`); `self`, `Self`,
/// `super`, `crate` and `_` get a trailing underscore instead. `name` must
/// already be a valid identifier body as produced by [`normalize`] or
/// [`to_snake_case`].
pub fn ident(name: &str) -> Ident {
    if NON_RAW_KEYWORDS.contains(&name) {
        Ident::new(&format!("{name}_"), Span::call_site())
    } else if is_keyword(name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

/// Returns the plain (unescaped) text of an identifier token.
pub fn unraw(ident: &Ident) -> String {
    let text = ident.to_string();
    text.strip_prefix("r#").map(str::to_string).unwrap_or(text)
}

/// Normalizes a raw string into a snake_case member name, using `fallback`
/// when nothing usable survives normalization.
pub fn member_name(raw: &str, fallback: &str) -> String {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        fallback.to_string()
    } else {
        to_snake_case(&normalized)
    }
}

/// Normalizes a raw string into a PascalCase type or variant name, using
/// `fallback` when nothing usable survives normalization.
pub fn pascal_name(raw: &str, fallback: &str) -> String {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        fallback.to_string()
    } else {
        normalized
    }
}

/// Allocates unique names within one scope.
///
/// A name that is already taken gets the smallest free numeric suffix
/// starting at `2`.
///
/// ## Examples
///
/// ```
/// use apibind_gen::naming::UniqueNames;
///
/// let mut names = UniqueNames::new();
/// assert_eq!(names.claim("pet_id"), "pet_id");
/// assert_eq!(names.claim("pet_id"), "pet_id2");
/// assert_eq!(names.claim("pet_id"), "pet_id3");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope in which the given names are already taken.
    pub fn with_reserved<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            used: reserved.into_iter().map(str::to_string).collect(),
        }
    }

    /// Claims `base`, or `base` plus a numeric suffix if it is taken.
    pub fn claim(&mut self, base: &str) -> String {
        let name = self.peek(base);
        self.used.insert(name.clone());
        name
    }

    /// Returns the name [`claim`](Self::claim) would allocate, without
    /// taking it.
    pub fn peek(&self, base: &str) -> String {
        if !self.used.contains(base) {
            return base.to_string();
        }
        (2usize..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.used.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// The generated type name of every schema in a document.
///
/// Built in one pass over the whole schema map before any code is emitted,
/// so references can be resolved regardless of declaration order.
#[derive(Debug, Clone, Default)]
pub struct TypeNames {
    names: BTreeMap<String, String>,
}

impl TypeNames {
    /// Allocates a unique PascalCase name for each schema key.
    ///
    /// Names that would shadow Rust prelude items or generated runtime types
    /// get a `Model` suffix.
    pub fn from_schemas(schemas: &SchemaMap) -> Self {
        let mut scope = UniqueNames::new();
        let names = schemas
            .names()
            .enumerate()
            .map(|(i, key)| {
                let mut name = pascal_name(key, &format!("Schema{}", i + 1));
                if RESERVED_TYPE_NAMES.contains(&name.as_str()) {
                    name.push_str("Model");
                }
                (key.to_string(), scope.claim(&name))
            })
            .collect();
        Self { names }
    }

    /// Returns the generated name for a schema key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Returns `true` if `name` is one of the generated type names.
    pub fn is_generated(&self, name: &str) -> bool {
        self.names.values().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apibind_define::TypeDescriptor;

    #[test]
    fn empty_input_yields_empty_identifier() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("-!?"), "");
    }

    #[test]
    fn leading_digit_is_escaped() {
        assert_eq!(normalize("123abc"), "_123Abc");
        assert_eq!(normalize("2fa code"), "_2FaCode");
    }

    #[test]
    fn separators_split_words() {
        assert_eq!(normalize("hello world"), "HelloWorld");
        assert_eq!(normalize("hello\t\n  world"), "HelloWorld");
        assert_eq!(normalize("snake_case_name"), "SnakeCaseName");
    }

    #[test]
    fn invalid_characters_are_stripped_without_splitting() {
        assert_eq!(normalize("foo-bar!"), "Foobar");
        assert_eq!(normalize("x.y"), "Xy");
        assert_eq!(normalize("café"), "Caf");
    }

    #[test]
    fn pascal_and_camel_forms_converge() {
        assert_eq!(normalize("already_Pascal"), normalize("alreadyPascal"));
        assert_eq!(normalize("AlreadyPascal"), "AlreadyPascal");
    }

    #[test]
    fn acronyms_are_folded() {
        assert_eq!(normalize("ABC"), "Abc");
        assert_eq!(normalize("ABcDEf"), "AbcDef");
        assert_eq!(normalize("HTTPServer"), "HttpServer");
        assert_eq!(normalize("getHTTPResponse"), "GetHttpResponse");
        assert_eq!(normalize("userID"), "UserId");
        assert_eq!(normalize("IOStream"), "IoStream");
    }

    #[test]
    fn letters_after_digits_are_capitalized() {
        assert_eq!(normalize("ab9cd"), "Ab9Cd");
        assert_eq!(normalize("v2beta"), "V2Beta");
        assert_eq!(normalize("ABC2d"), "Abc2D");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "", "a", "A", "abc", "ABC", "ABcDEf", "HTTPServer", "userID", "user_ID", "IOStream",
            "123abc", "2FA", "ab9cd", "v2beta", "URLs", "hello world", "already_Pascal",
            "get_/pets/{petId}", "X-Request-ID", "a_b_c", "AB_CD", "A1B2C3", "aB", "Ab", "ABc",
            "ID_token", "snake_case", "GET_pets_PET_ID", "lower UPPER Mixed", "Q", "q1", "_9",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn normalized_output_is_identifier_shaped() {
        for input in ["123", "a b c", "$ref", "ümlaut", "9 lives"] {
            let out = normalize(input);
            assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert!(!out.starts_with(|c: char| c.is_ascii_digit()));
        }
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("Id"), "id");
        assert_eq!(to_snake_case("PetId"), "pet_id");
        assert_eq!(to_snake_case("Ab9Cd"), "ab9_cd");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn keywords_become_raw_or_suffixed() {
        assert_eq!(ident("type").to_string(), "r#type");
        assert_eq!(ident("match").to_string(), "r#match");
        assert_eq!(ident("self").to_string(), "self_");
        assert_eq!(ident("crate").to_string(), "crate_");
        assert_eq!(ident("Self").to_string(), "Self_");
        assert_eq!(ident("pet").to_string(), "pet");
        assert_eq!(unraw(&ident("type")), "type");
    }

    #[test]
    fn member_and_pascal_names_fall_back() {
        assert_eq!(member_name("petId", "field"), "pet_id");
        assert_eq!(member_name("$$$", "field1"), "field1");
        assert_eq!(pascal_name("***", "Value1"), "Value1");
    }

    #[test]
    fn unique_names_respect_reservations() {
        let mut names = UniqueNames::with_reserved(["response"]);
        assert_eq!(names.claim("response"), "response2");
        assert_eq!(names.claim("status"), "status");
    }

    #[test]
    fn peek_does_not_take_the_name() {
        let mut names = UniqueNames::with_reserved(["runtime"]);
        assert_eq!(names.peek("runtime"), "runtime2");
        assert_eq!(names.peek("runtime"), "runtime2");
        assert_eq!(names.claim("runtime"), "runtime2");
        assert_eq!(names.peek("runtime"), "runtime3");
    }

    #[test]
    fn type_names_deduplicate_and_avoid_prelude() {
        let mut schemas = SchemaMap::new();
        schemas.insert("pet", TypeDescriptor::primitive("string", None));
        schemas.insert("Pet", TypeDescriptor::primitive("string", None));
        schemas.insert("Result", TypeDescriptor::primitive("string", None));
        schemas.insert("!!!", TypeDescriptor::primitive("string", None));
        schemas.insert("self", TypeDescriptor::primitive("string", None));

        let names = TypeNames::from_schemas(&schemas);
        assert_eq!(names.get("pet"), Some("Pet"));
        assert_eq!(names.get("Pet"), Some("Pet2"));
        assert_eq!(names.get("Result"), Some("ResultModel"));
        assert_eq!(names.get("!!!"), Some("Schema4"));
        assert_eq!(names.get("self"), Some("SelfModel"));
        assert!(names.is_generated("Pet2"));
        assert_eq!(names.get("Missing"), None);
    }
}
