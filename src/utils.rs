use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Keeps the first letter of each word and masks the rest.
pub fn redact_phrase(phrase: &str) -> String {
    phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut masked = first.to_string();
                    masked.extend(chars.map(|_| '*'));
                    masked
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compact display form of an example URL: host and path, with `?…` standing
/// in for a query string, cut to `max` characters.
pub fn shorten_url(url: &str, max: usize) -> String {
    let display = match Url::parse(url) {
        Ok(parsed) => {
            let has_query = parsed.query().is_some_and(|q| !q.is_empty());
            format!(
                "{}{}{}",
                parsed.host_str().unwrap_or_default(),
                parsed.path(),
                if has_query { "?…" } else { "" }
            )
        }
        Err(_) => url.to_string(),
    };
    truncate(&display, max)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Flag combinations that cannot be expressed as config values. Range checks
/// live in [`crate::config::Config::validate`].
pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.history.is_some() && args.cached {
        anyhow::bail!("--history cannot be combined with --cached");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use clap::Parser;
    use rstest::rstest;

    #[test]
    fn test_validate_args_rejects_history_with_cached() {
        let args = Args::parse_from(["meaning-scan", "--cached", "--history", "/tmp/History"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_leaves_ranges_to_config() {
        let args = Args::parse_from(["meaning-scan", "--top", "0", "--limit", "0"]);
        assert!(validate_args(&args).is_ok());
    }

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(1234567, "1,234,567")]
    fn test_format_number(#[case] num: u64, #[case] expected: &str) {
        assert_eq!(format_number(num), expected);
    }

    #[test]
    fn test_redact_phrase() {
        assert_eq!(redact_phrase("ad hoc"), "a* h**");
        assert_eq!(redact_phrase("café"), "c***");
    }

    #[rstest]
    #[case("https://www.google.com/search?q=x+meaning", 48, "www.google.com/search?…")]
    #[case("https://duckduckgo.com/", 48, "duckduckgo.com/")]
    #[case("https://example.com/a/very/long/path", 12, "example.com…")]
    #[case("not a url at all", 8, "not a u…")]
    #[case("https://bing.com/search?", 48, "bing.com/search")]
    fn test_shorten_url(#[case] url: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(shorten_url(url, max), expected);
    }
}
