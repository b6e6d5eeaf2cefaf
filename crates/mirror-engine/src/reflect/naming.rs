//! Accessor naming conventions and case conversion

/// Prefix of getter operations
pub const GETTER_PREFIX: &str = "get";

/// Prefix of setter operations
pub const SETTER_PREFIX: &str = "set";

/// Separator between a class name and an operation name
pub const SEPARATOR: &str = ".";

/// Upper-case the first character
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character
pub fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a field name starts lower-case and continues upper-case (`aGe`)
///
/// The getter of such a field is conventionally `getaGe`, not `getAGe`.
pub fn is_alien_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some(second)) if first.is_lowercase() && second.is_uppercase()
    )
}

/// Conventional getter name of a field
pub fn getter_name(field: &str) -> String {
    format!("{}{}", GETTER_PREFIX, capitalize(field))
}

/// Conventional setter name of a field
pub fn setter_name(field: &str) -> String {
    format!("{}{}", SETTER_PREFIX, capitalize(field))
}

/// Field name of a getter, if `operation` looks like one
pub fn field_name_from_getter(operation: &str) -> Option<String> {
    if operation.len() > GETTER_PREFIX.len() && operation.starts_with(GETTER_PREFIX) {
        Some(uncapitalize(&operation[GETTER_PREFIX.len()..]))
    } else {
        None
    }
}

/// `the_google` to `theGoogle`
///
/// The first letter of each word after an underscore is upper-cased, every
/// other ASCII letter lower-cased, and the underscores removed.
pub fn snake_case_to_camel_case(snake: &str) -> String {
    let mut camel = String::with_capacity(snake.len());
    let mut word_start = false;
    for c in snake.chars() {
        if c == '_' {
            word_start = true;
            continue;
        }
        if word_start {
            camel.push(c.to_ascii_uppercase());
            word_start = false;
        } else {
            camel.push(c.to_ascii_lowercase());
        }
    }
    camel
}

/// `theGoogle` to `the_google`
pub fn camel_case_to_snake_case(camel: &str) -> String {
    let mut snake = String::with_capacity(camel.len() * 2);
    for c in camel.chars() {
        if c.is_ascii_uppercase() {
            snake.push('_');
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}
