use playback_api::AdapterError;

// ═══════════════════════════════════════════════════════════════
//  RFC 4180 field parser
// ═══════════════════════════════════════════════════════════════

/// Split one RFC 4180 line into fields, honouring quotes when `quoting`.
pub(crate) fn parse_fields(line: &str, delimiter: char, quoting: bool) -> Vec<String> {
    if !quoting {
        return line.split(delimiter).map(|s| s.to_string()).collect();
    }

    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    let mut field = String::new();

    loop {
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => {
                        if chars.peek() == Some(&'"') {
                            // "" → "
                            chars.next();
                            field.push('"');
                        } else {
                            break;
                        }
                    }
                    Some(c) => field.push(c),
                    None => break, // unterminated quote, best effort
                }
            }
            // Skip anything between the closing quote and the delimiter.
            while let Some(c) = chars.next() {
                if c == delimiter {
                    break;
                }
            }
        } else {
            while let Some(c) = chars.next() {
                if c == delimiter {
                    break;
                }
                field.push(c);
            }
        }

        fields.push(std::mem::take(&mut field));

        if chars.peek().is_none() {
            if line.ends_with(delimiter) {
                // Trailing delimiter → one more empty field
                fields.push(String::new());
            }
            break;
        }
    }

    fields
}

/// Whether `text` stops inside a quoted field, i.e. the record goes on
/// past this line break. Follows the same quote rules as `parse_fields`.
pub(crate) fn ends_in_quote(text: &str, delimiter: char) -> bool {
    let mut in_quotes = false;
    let mut after_close = false;
    let mut field_start = true;

    for c in text.chars() {
        if in_quotes {
            if c == '"' {
                in_quotes = false;
                after_close = true;
            }
        } else if after_close {
            after_close = false;
            if c == '"' {
                // "" → literal quote, still inside the field
                in_quotes = true;
            } else {
                field_start = c == delimiter;
            }
        } else if field_start && c == '"' {
            in_quotes = true;
            field_start = false;
        } else {
            field_start = c == delimiter;
        }
    }
    in_quotes
}

pub(crate) fn parse_delimiter(s: &str) -> Result<char, AdapterError> {
    let mut chars = s.chars();
    match (s, chars.next(), chars.next()) {
        ("\\t", _, _) => Ok('\t'),
        (_, Some(c), None) if c != '"' && c != '\n' && c != '\r' => Ok(c),
        (other, _, _) => Err(AdapterError::config(format!(
            "CSV: delimiter must be a single character, got {other:?}"
        ))),
    }
}
