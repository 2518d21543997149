//! Russian number words -> digits ("сто двадцать пять" -> "125")

/// 0..19
const UNITS: &[(&str, u32)] = &[
    ("ноль", 0),
    ("один", 1),
    ("одна", 1),
    ("два", 2),
    ("две", 2),
    ("три", 3),
    ("четыре", 4),
    ("пять", 5),
    ("шесть", 6),
    ("семь", 7),
    ("восемь", 8),
    ("девять", 9),
    ("десять", 10),
    ("одиннадцать", 11),
    ("двенадцать", 12),
    ("тринадцать", 13),
    ("четырнадцать", 14),
    ("пятнадцать", 15),
    ("шестнадцать", 16),
    ("семнадцать", 17),
    ("восемнадцать", 18),
    ("девятнадцать", 19),
];

const TENS: &[(&str, u32)] = &[
    ("двадцать", 20),
    ("тридцать", 30),
    ("сорок", 40),
    ("пятьдесят", 50),
    ("шестьдесят", 60),
    ("семьдесят", 70),
    ("восемьдесят", 80),
    ("девяносто", 90),
];

const HUNDREDS: &[(&str, u32)] = &[("сто", 100), ("двести", 200), ("триста", 300)];

/// Value of a single number word, if it is one
fn word_value(word: &str) -> Option<u32> {
    HUNDREDS
        .iter()
        .chain(TENS)
        .chain(UNITS)
        .find(|(w, _)| *w == word)
        .map(|(_, v)| *v)
}

/// Sum a run of number words. Composition is additive in whatever order
/// the words appear.
fn resolve_run(words: &[String]) -> Option<u32> {
    if words.is_empty() {
        return None;
    }
    words
        .iter()
        .map(|w| word_value(w))
        .sum::<Option<u32>>()
}

fn flush(run: &mut Vec<String>, out: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    match resolve_run(run) {
        Some(value) => out.push(value.to_string()),
        None => out.append(run),
    }
    run.clear();
}

/// Replace every contiguous run of number words with its decimal value.
///
/// Tokens are split on whitespace and re-joined with single spaces; any
/// token that is not a number word passes through untouched.
pub fn normalize_numbers(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<String> = Vec::new();

    for token in text.split_whitespace() {
        let lower = token.to_lowercase();
        if word_value(&lower).is_some() {
            run.push(lower);
        } else {
            flush(&mut run, &mut out);
            out.push(token.to_string());
        }
    }
    flush(&mut run, &mut out);

    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_words() {
        assert_eq!(normalize_numbers("восемьдесят"), "80");
        assert_eq!(normalize_numbers("двести"), "200");
        assert_eq!(normalize_numbers("ноль"), "0");
        assert_eq!(normalize_numbers("две"), "2");
    }

    #[test]
    fn test_compound_numbers() {
        assert_eq!(normalize_numbers("сто двадцать пять"), "125");
        assert_eq!(normalize_numbers("триста"), "300");
        assert_eq!(normalize_numbers("девяносто девять"), "99");
    }

    #[test]
    fn test_embedded_in_text() {
        assert_eq!(
            normalize_numbers("становая восемьдесят 5x3"),
            "становая 80 5x3"
        );
        assert_eq!(
            normalize_numbers("жим Сто Десять 8x3"),
            "жим 110 8x3"
        );
        assert_eq!(
            normalize_numbers("присед сто 5 4 было тяжело"),
            "присед 100 5 4 было тяжело"
        );
    }

    #[test]
    fn test_separate_runs() {
        assert_eq!(
            normalize_numbers("жим восемьдесят на восемь"),
            "жим 80 на 8"
        );
    }

    #[test]
    fn test_passthrough_without_number_words() {
        assert_eq!(normalize_numbers("жим лежа 80 8x3"), "жим лежа 80 8x3");
        assert_eq!(normalize_numbers(""), "");
    }

    #[test]
    fn test_idempotent_on_digits() {
        let once = normalize_numbers("присед 100кг 5 4 тяжело");
        assert_eq!(normalize_numbers(&once), once);
    }

    #[test]
    fn test_resolve_run_empty() {
        assert_eq!(resolve_run(&[]), None);
        assert_eq!(resolve_run(&["абв".to_string()]), None);
    }
}
