use crate::cohort::parser::IngestDiagnostics;

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub source: &'a str,
    pub count: usize,
    pub reason: &'a str,
}

pub fn render(event: &WarnEvent<'_>) -> String {
    format!(
        "COHORT_WARN code={} stage={} source={} count={} reason={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.source),
        event.count,
        sanitize_value(event.reason),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", render(&event));
}

/// One warning per non-zero data-quality counter.
pub fn ingest_warnings<'a>(
    diagnostics: &IngestDiagnostics,
    source: &'a str,
) -> Vec<WarnEvent<'a>> {
    let checks: [(&'static str, usize, &'static str); 7] = [
        ("ROWS_TOO_FEW_FIELDS", diagnostics.too_few_fields, "row has fewer than 6 fields"),
        ("ROWS_MISSING_DATE_RANGE", diagnostics.missing_date_range, "date range has no - separator"),
        ("MONTH_INDEX_UNPARSED", diagnostics.unparsed_month_index, "month index is not a number"),
        ("VISITORS_DEFAULTED", diagnostics.defaulted_visitors, "visitors not numeric, used 0"),
        ("PURCHASES_DEFAULTED", diagnostics.defaulted_purchases, "purchases not numeric, used 0"),
        ("RATE_DEFAULTED", diagnostics.defaulted_rate, "rate not numeric, used 0%"),
        ("DATE_UNFORMATTED", diagnostics.unformatted_dates, "date not YYYYMMDD, kept as is"),
    ];
    checks
        .into_iter()
        .filter(|(_, count, _)| *count > 0)
        .map(|(code, count, reason)| WarnEvent {
            code,
            stage: "ingest",
            source,
            count,
            reason,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_value_rewrites_whitespace() {
        assert_eq!(sanitize_value("a b\tc"), "a_b_c");
    }

    #[test]
    fn sanitize_value_falls_back_for_empty() {
        assert_eq!(sanitize_value("   "), "na");
    }

    #[test]
    fn only_nonzero_counters_warn() {
        let diagnostics = IngestDiagnostics {
            defaulted_rate: 2,
            ..IngestDiagnostics::default()
        };
        let events = ingest_warnings(&diagnostics, "export.csv");
        assert_eq!(events.len(), 1);
        assert_eq!(
            render(&events[0]),
            "COHORT_WARN code=RATE_DEFAULTED stage=ingest source=export.csv count=2 reason=rate_not_numeric,_used_0%"
        );
    }
}
