//! String interpolation lowering (spec §4.G `codegen/format.rs`).
//!
//! Each `$"...{expr}..."` literal becomes a chain of calls into
//! `rt_format_long`/`rt_format_double`/`rt_format_string`, parameterized by
//! the parsed format specifier (width, precision, type code, padding,
//! percent form) the lexer captured verbatim after the hole's `:`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTypeCode {
    Decimal,
    Hex,
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatSpec {
    pub width: Option<u32>,
    pub precision: Option<u32>,
    pub zero_pad: bool,
    pub type_code: FormatTypeCode,
}

impl Default for FormatSpec {
    fn default() -> Self {
        FormatSpec {
            width: None,
            precision: None,
            zero_pad: false,
            type_code: FormatTypeCode::Decimal,
        }
    }
}

/// Parses the verbatim text captured after a `{expr:...}` hole's colon,
/// e.g. `05d`, `.2f`, `%`, `x`.
pub fn parse_format_spec(text: &str) -> FormatSpec {
    let mut spec = FormatSpec::default();
    if text == "%" {
        spec.type_code = FormatTypeCode::Percent;
        return spec;
    }
    let mut chars = text.chars().peekable();
    let mut digits = String::new();
    if chars.peek() == Some(&'0') {
        spec.zero_pad = true;
    }
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    if !digits.is_empty() {
        spec.width = digits.parse().ok();
    }
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut prec_digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                prec_digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        spec.precision = prec_digits.parse().ok();
    }
    if let Some(c) = chars.next() {
        spec.type_code = match c {
            'x' | 'X' => FormatTypeCode::Hex,
            'f' | 'F' => FormatTypeCode::Fixed,
            _ => FormatTypeCode::Decimal,
        };
    }
    spec
}

/// Builds the C call that formats one interpolation hole given the
/// already-evaluated C expression text and the value's runtime kind.
pub fn format_call(arena: &str, value_expr: &str, kind: &str, spec: &FormatSpec) -> String {
    let width = spec.width.unwrap_or(0);
    let precision = spec.precision.unwrap_or(6);
    let pad = if spec.zero_pad { 1 } else { 0 };
    let type_code = match spec.type_code {
        FormatTypeCode::Decimal => 0,
        FormatTypeCode::Hex => 1,
        FormatTypeCode::Percent => 2,
        FormatTypeCode::Fixed => 3,
    };
    match kind {
        "long" | "int" | "byte" => format!(
            "rt_format_long({arena}, {value_expr}, {width}, {pad}, {type_code})"
        ),
        "double" | "float" => format!(
            "rt_format_double({arena}, {value_expr}, {width}, {precision}, {pad}, {type_code})"
        ),
        _ => format!("rt_format_string({arena}, {value_expr}, {width})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zero_padded_width() {
        let spec = parse_format_spec("05d");
        assert_eq!(spec.width, Some(5));
        assert!(spec.zero_pad);
        assert_eq!(spec.type_code, FormatTypeCode::Decimal);
    }

    #[test]
    fn parses_precision_for_fixed_point() {
        let spec = parse_format_spec(".2f");
        assert_eq!(spec.precision, Some(2));
        assert_eq!(spec.type_code, FormatTypeCode::Fixed);
    }

    #[test]
    fn percent_form_is_recognized() {
        let spec = parse_format_spec("%");
        assert_eq!(spec.type_code, FormatTypeCode::Percent);
    }

    #[test]
    fn dispatches_to_the_right_rt_format_function() {
        let spec = FormatSpec::default();
        assert!(format_call("arena", "x", "long", &spec).starts_with("rt_format_long(arena,"));
        assert!(format_call("arena", "x", "double", &spec).starts_with("rt_format_double(arena,"));
        assert!(format_call("arena", "x", "string", &spec).starts_with("rt_format_string(arena,"));
    }

    #[test]
    fn uses_the_passed_arena_identifier_not_a_hardcoded_one() {
        let spec = FormatSpec::default();
        assert!(format_call("__arena3", "x", "long", &spec).starts_with("rt_format_long(__arena3,"));
    }
}
