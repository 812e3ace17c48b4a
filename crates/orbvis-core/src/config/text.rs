use super::ConfigError;
use serde_json::{Map, Number, Value};

/// Parses the `KEY = VALUE` format into a JSON object with upper-case keys.
///
/// `#` starts a comment. A value that opens more brackets than it closes
/// continues on the following lines. Lists use Python literal syntax with
/// single or double quotes; scalars are booleans, numbers or bare strings.
pub(super) fn parse_key_values(source: &str) -> Result<Map<String, Value>, ConfigError> {
    let mut entries = Map::new();
    let mut pending: Option<(String, String, usize)> = None;

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some((key, mut buffer, start_line)) = pending.take() {
            buffer.push_str(line);
            if bracket_depth(&buffer) > 0 {
                pending = Some((key, buffer, start_line));
            } else {
                insert_entry(&mut entries, key, &buffer, start_line)?;
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax {
                line: line_number,
                text: line.to_string(),
            });
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim();
        if key.is_empty() {
            return Err(ConfigError::Syntax {
                line: line_number,
                text: line.to_string(),
            });
        }

        if bracket_depth(value) > 0 {
            pending = Some((key, value.to_string(), line_number));
        } else {
            insert_entry(&mut entries, key, value, line_number)?;
        }
    }

    if let Some((key, _, line)) = pending {
        return Err(ConfigError::UnterminatedList { key, line });
    }
    Ok(entries)
}

fn insert_entry(
    entries: &mut Map<String, Value>,
    key: String,
    raw: &str,
    line: usize,
) -> Result<(), ConfigError> {
    let value = literal_to_json(&key, raw)?;
    if entries.insert(key.clone(), value).is_some() {
        return Err(ConfigError::DuplicateKey { key, line });
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

fn bracket_depth(text: &str) -> i32 {
    text.chars().fold(0, |depth, ch| match ch {
        '[' => depth + 1,
        ']' => depth - 1,
        _ => depth,
    })
}

fn literal_to_json(key: &str, raw: &str) -> Result<Value, ConfigError> {
    if raw.starts_with('[') {
        return serde_json::from_str(&python_list_to_json(raw)).map_err(|source| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse list '{raw}': {source}"),
            }
        });
    }

    match raw.to_ascii_lowercase().as_str() {
        "true" | ".true." | "on" => return Ok(Value::Bool(true)),
        "false" | ".false." | "off" => return Ok(Value::Bool(false)),
        "none" | "null" => return Ok(Value::Null),
        _ => {}
    }

    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(integer.into()));
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Ok(Value::Number(number));
    }

    let unquoted = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
        .unwrap_or(raw);
    Ok(Value::String(unquoted.to_string()))
}

/// Rewrites a Python list literal as JSON. Strings in either quote style
/// become double-quoted; `True`, `False` and `None` are mapped only outside
/// strings.
fn python_list_to_json(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some(open) => match ch {
                '\\' => match chars.next() {
                    Some('\'') => output.push('\''),
                    Some(escaped) => {
                        output.push('\\');
                        output.push(escaped);
                    }
                    None => output.push_str("\\\\"),
                },
                _ if ch == open => {
                    output.push('"');
                    quote = None;
                }
                '"' => output.push_str("\\\""),
                _ => output.push(ch),
            },
            None if ch.is_ascii_alphanumeric() || ch == '_' => word.push(ch),
            None => {
                flush_word(&mut output, &mut word);
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                    output.push('"');
                } else {
                    output.push(ch);
                }
            }
        }
    }
    flush_word(&mut output, &mut word);
    output
}

fn flush_word(output: &mut String, word: &mut String) {
    output.push_str(match word.as_str() {
        "True" => "true",
        "False" => "false",
        "None" => "null",
        other => other,
    });
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::{parse_key_values, python_list_to_json};
    use crate::config::ConfigError;
    use serde_json::json;

    #[test]
    fn scalars_lists_and_comments() {
        let source = "\
# band plot
ispin = 2          # collinear
Title = 'Fe bands'
EFERMI = 5.25
SOC = off
ORBITAL_INFO = [[[0, 1], 'Fe', [4, 5]],
                [[2], 'O', [1, 2, 3]]]
";
        let entries = parse_key_values(source).expect("config should parse");
        assert_eq!(entries["ISPIN"], json!(2));
        assert_eq!(entries["TITLE"], json!("Fe bands"));
        assert_eq!(entries["EFERMI"], json!(5.25));
        assert_eq!(entries["SOC"], json!(false));
        assert_eq!(
            entries["ORBITAL_INFO"],
            json!([[[0, 1], "Fe", [4, 5]], [[2], "O", [1, 2, 3]]])
        );
    }

    #[test]
    fn malformed_lines_report_their_position() {
        assert_eq!(
            parse_key_values("ISPIN = 1\nnot a pair\n"),
            Err(ConfigError::Syntax {
                line: 2,
                text: "not a pair".to_string()
            })
        );
        assert!(matches!(
            parse_key_values("ORBITAL_INFO = [[[0], 'Fe',\n"),
            Err(ConfigError::UnterminatedList { line: 1, .. })
        ));
        assert!(matches!(
            parse_key_values("ISPIN = 1\nispin = 2\n"),
            Err(ConfigError::DuplicateKey { line: 2, .. })
        ));
    }

    #[test]
    fn quoted_text_survives_list_conversion() {
        let entries = parse_key_values("LABELS = [\"\\u0393\", \"X'\", 'M']\n")
            .expect("primed labels should parse");
        assert_eq!(entries["LABELS"], json!(["\u{393}", "X'", "M"]));

        assert_eq!(
            python_list_to_json(r#"['None', None, 'say "True"', True, 'it\'s']"#),
            r#"["None", null, "say \"True\"", true, "it's"]"#
        );
    }
}
