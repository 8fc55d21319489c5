//! Shared CLI helpers: path expansion, the console summary, error hints.

use std::path::PathBuf;

use colored::Colorize;

use splitlens_core::AnalysisResult;
use splitlens_providers::AnalyzeError;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print the banner shown before long-running commands.
pub fn print_banner(mode: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🔬 Splitlens".cyan().bold(), version.dimmed());
    println!("  Mode: {mode}");
    println!();
}

/// Render the human-readable summary of one analysis.
pub fn format_summary(analysis: &AnalysisResult) -> String {
    let stats = &analysis.statistical_results;
    let rule = "=".repeat(60);
    let mut out = String::new();

    out.push_str(&format!("\n{rule}\n"));
    out.push_str(&format!("{}\n", "📊 EXPERIMENT ANALYSIS SUMMARY".bold()));
    out.push_str(&format!("{rule}\n\n"));
    out.push_str(&format!("{}\n", analysis.executive_summary));

    out.push_str(&format!("\n{} {}\n", "🏆 Winner:".bold(), stats.winner.to_uppercase()));
    out.push_str(&format!("{} {}\n", "📈 Lift:".bold(), or_na(&stats.lift)));
    out.push_str(&format!(
        "{} {}\n",
        "🎯 Confidence:".bold(),
        or_na(&stats.confidence_level)
    ));
    let significant = if stats.is_significant {
        "yes".green().to_string()
    } else {
        "no".yellow().to_string()
    };
    out.push_str(&format!("{} {}\n", "✓ Significant:".bold(), significant));
    if !analysis.is_conclusive() {
        out.push_str(&format!(
            "{}\n",
            "⚠ No clear winner; treat this result as provisional.".yellow()
        ));
    }

    if !analysis.key_insights.is_empty() {
        out.push_str(&format!("\n{}\n", "💡 Key Insights:".bold()));
        for (i, insight) in analysis.key_insights.iter().enumerate() {
            out.push_str(&format!("  {}. {insight}\n", i + 1));
        }
    }

    out.push_str(&format!(
        "\n{} {}\n",
        "🎬 Recommended Action:".bold(),
        analysis.recommended_action
    ));

    if !analysis.next_experiments.is_empty() {
        out.push_str(&format!("\n{}\n", "🔬 Next Experiments:".bold()));
        for (i, next) in analysis.next_experiments.iter().enumerate() {
            out.push_str(&format!("  {}. {next}\n", i + 1));
        }
    }

    out.push_str(&format!("\n{rule}\n"));
    out
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Print the analysis summary to stdout.
pub fn print_summary(analysis: &AnalysisResult) {
    print!("{}", format_summary(analysis));
}

/// Hint shown after failures that a caller-supplied key would fix.
pub fn user_credential_hint(err: &AnalyzeError) -> Option<&'static str> {
    match err {
        AnalyzeError::NoCredentialConfigured => Some(
            "No server API key is configured. Set GROQ_API_KEY or pass --api-key <KEY>.",
        ),
        _ if err.suggests_user_credential() => {
            Some("The API key was rejected. Try again with your own key: --api-key <KEY>.")
        }
        _ => None,
    }
}

/// Print an analysis failure to stderr, with the bring-your-own-key hint where it applies.
pub fn print_analyze_error(err: &AnalyzeError) {
    eprintln!();
    eprintln!("{} {err}", "✗ Analysis failed:".red().bold());
    if let Some(hint) = user_credential_hint(err) {
        eprintln!("  {}", hint.yellow());
    }
    eprintln!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use splitlens_core::StatisticalResults;
    use splitlens_providers::{CompletionError, FetchError};

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            executive_summary: "Variant A wins on conversion.".into(),
            statistical_results: StatisticalResults {
                primary_metric: "conversion_rate".into(),
                winner: "variant_a".into(),
                lift: "12.5%".into(),
                confidence_level: String::new(),
                is_significant: true,
                sample_size_adequate: true,
            },
            key_insights: vec!["Mobile drove most of the lift".into(), "Bounce fell".into()],
            secondary_metrics: vec![],
            risks_and_caveats: vec![],
            recommended_action: "ship".into(),
            next_experiments: vec!["Test the annual plan copy".into()],
            report_narrative: String::new(),
        }
    }

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/reports/out.json");
        assert!(result.ends_with("reports/out.json"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        assert_eq!(
            expand_tilde("experiment-analysis.json"),
            PathBuf::from("experiment-analysis.json")
        );
    }

    #[test]
    fn test_summary_contents() {
        colored::control::set_override(false);
        let text = format_summary(&analysis());

        assert!(text.contains("Variant A wins on conversion."));
        assert!(text.contains("Winner: VARIANT_A"));
        assert!(text.contains("Lift: 12.5%"));
        assert!(text.contains("Confidence: N/A"));
        assert!(text.contains("Significant: yes"));
        assert!(text.contains("  1. Mobile drove most of the lift"));
        assert!(text.contains("  2. Bounce fell"));
        assert!(text.contains("Recommended Action: ship"));
        assert!(text.contains("  1. Test the annual plan copy"));
    }

    #[test]
    fn test_summary_flags_inconclusive_result() {
        colored::control::set_override(false);
        assert!(!format_summary(&analysis()).contains("No clear winner"));

        let mut unclear = analysis();
        unclear.statistical_results.winner = "inconclusive".into();
        unclear.statistical_results.is_significant = false;
        let text = format_summary(&unclear);
        assert!(text.contains("Winner: INCONCLUSIVE"));
        assert!(text.contains("No clear winner; treat this result as provisional."));
    }

    #[test]
    fn test_summary_skips_empty_lists() {
        colored::control::set_override(false);
        let mut bare = analysis();
        bare.key_insights.clear();
        bare.next_experiments.clear();

        let text = format_summary(&bare);
        assert!(!text.contains("Key Insights"));
        assert!(!text.contains("Next Experiments"));
    }

    #[test]
    fn test_hints_only_for_credential_failures() {
        assert!(user_credential_hint(&AnalyzeError::NoCredentialConfigured)
            .unwrap()
            .contains("GROQ_API_KEY"));
        assert!(user_credential_hint(&CompletionError::InvalidCredential.into())
            .unwrap()
            .contains("--api-key"));
        assert!(user_credential_hint(&CompletionError::RateLimited.into()).is_none());
        assert!(user_credential_hint(&FetchError::MissingCredentials.into()).is_none());
    }
}
