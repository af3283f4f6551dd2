use crate::infra::{build_service, ApiService};
use card_advisor::advisor::history::CsvTransactionLedger;
use card_advisor::advisor::{AdvancedOutcome, AdvisorFlow, Recommendation, UserId};
use card_advisor::config::AdvisorSettings;
use card_advisor::error::AppError;
use clap::Args;
use serde_json::{json, Value};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Profile as inline JSON or a path to a JSON file
    #[arg(long)]
    pub(crate) profile: String,
    /// Recommendation flow: beginner or advanced
    #[arg(long, default_value = "beginner", value_parser = parse_flow)]
    pub(crate) flow: AdvisorFlow,
    /// JSON catalog export; the built-in fallback list is used when omitted
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Statement export (Date,Description,Category,Amount) used to enrich sparse spend
    #[arg(long)]
    pub(crate) transactions: Option<PathBuf>,
    /// Number of cards to return
    #[arg(long)]
    pub(crate) results: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print full reasoning, perks, cons and the application guide
    #[arg(long)]
    pub(crate) verbose: bool,
}

fn parse_flow(raw: &str) -> Result<AdvisorFlow, String> {
    AdvisorFlow::parse(raw)
        .ok_or_else(|| format!("unknown flow '{raw}' (expected beginner or advanced)"))
}

fn read_profile(raw: &str) -> Result<Value, AppError> {
    let text = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw)?
    };
    serde_json::from_str(&text)
        .map_err(|err| AppError::Input(format!("profile is not valid JSON ({err})")))
}

pub(crate) async fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        profile,
        flow,
        catalog,
        transactions,
        results,
    } = args;

    let payload = read_profile(&profile)?;
    let ledger = match transactions {
        Some(path) => CsvTransactionLedger::from_path(&path)
            .map_err(|err| AppError::Input(format!("{}: {err}", path.display())))?,
        None => CsvTransactionLedger::default(),
    };
    println!("Loaded {} statement lines", ledger.entries().len());

    let mut settings = AdvisorSettings {
        catalog_path: catalog,
        ..AdvisorSettings::default()
    };
    if let Some(results) = results.filter(|count| *count > 0) {
        settings.beginner_min_results = results;
        settings.advanced_results = results;
    }
    let service = build_service(settings, Arc::new(ledger));
    let user = UserId("cli".to_string());

    match flow {
        AdvisorFlow::Beginner => {
            let outcome = service.recommend_beginner(&user, payload).await?;
            if outcome.fallback_catalog {
                println!("Catalog: built-in fallback list ({})", outcome.catalog_origin.as_str());
            }
            print!("{}", render_recommendation(&outcome.recommendation, true));
        }
        AdvisorFlow::Advanced => match service.recommend_advanced(&user, payload).await? {
            AdvancedOutcome::NeedsMoreInfo { persona, questions } => {
                println!("Persona: {}", persona.label());
                println!("More information needed; add these to followUpAnswers:");
                for question in questions {
                    let values: Vec<&str> =
                        question.options.iter().map(|option| option.value).collect();
                    println!("  - {}: {} [{}]", question.id, question.question, values.join(", "));
                }
            }
            AdvancedOutcome::Scored {
                recommendation,
                model,
                ..
            } => {
                println!("Model: {model}");
                print!("{}", render_recommendation(&recommendation, true));
            }
        },
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_service(
        AdvisorSettings::default(),
        Arc::new(CsvTransactionLedger::default()),
    );

    println!("Card advisor demo (fallback catalog)");
    for (title, payload) in sample_profiles() {
        println!("\n== {title}");
        score_sample(&service, payload, args.verbose).await?;
    }
    Ok(())
}

async fn score_sample(
    service: &ApiService<CsvTransactionLedger>,
    payload: Value,
    verbose: bool,
) -> Result<(), AppError> {
    let outcome = service
        .recommend_beginner(&UserId("demo".to_string()), payload)
        .await?;
    print!("{}", render_recommendation(&outcome.recommendation, verbose));
    Ok(())
}

fn sample_profiles() -> Vec<(&'static str, Value)> {
    vec![
        (
            "First-year student, no income",
            json!({ "age": 19, "employment": "student", "income": 0, "topCategories": [] }),
        ),
        (
            "Salaried professional rebuilding credit",
            json!({
                "age": 31,
                "employment": "salaried",
                "monthlyIncome": 55000,
                "creditScore": 580,
                "primaryGoal": "credit_building",
                "fixedDeposit": { "hasFd": true, "amount": 50000 }
            }),
        ),
        (
            "Frequent traveller",
            json!({
                "age": 38,
                "employment": "salaried",
                "annualIncome": 2400000,
                "creditScore": 790,
                "primaryGoal": "travel_perks",
                "topCategories": ["travel", "dining"],
                "bankName": "Axis Bank"
            }),
        ),
    ]
}

fn render_recommendation(recommendation: &Recommendation, verbose: bool) -> String {
    let mut out = String::new();
    if let Some(persona) = recommendation.persona {
        let _ = writeln!(out, "Persona: {} (focus: {})", persona.label(), persona.benefit_focus());
    }
    let _ = writeln!(out, "{}", recommendation.overall_analysis);
    for (rank, card) in recommendation.cards.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({}) score {} | annual fee Rs {} | est. value Rs {}/yr{}",
            rank + 1,
            card.card_name,
            card.bank,
            card.score,
            card.annual_fee,
            card.annual_value,
            if card.backfilled { " | backfilled" } else { "" }
        );
        if verbose {
            let _ = writeln!(out, "   {}", card.reasoning);
            for perk in &card.key_perks {
                let _ = writeln!(out, "   + {perk}");
            }
            for con in &card.cons {
                let _ = writeln!(out, "   - {con}");
            }
        } else if let Some(line) = card.reasoning.split(". ").next() {
            let _ = writeln!(out, "   {line}");
        }
    }
    if verbose && !recommendation.application_guide.is_empty() {
        let _ = writeln!(out, "How to apply:");
        for step in &recommendation.application_guide {
            let _ = writeln!(out, "   * {step}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_profiles_are_parsed_without_touching_disk() {
        let value = read_profile(r#"{ "age": 22 }"#).expect("inline json");
        assert_eq!(value["age"], 22);
    }

    #[test]
    fn missing_profile_file_is_an_io_error() {
        let err = read_profile("/nonexistent/profile.json").unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn flow_names_are_validated() {
        assert_eq!(parse_flow("advisor"), Ok(AdvisorFlow::Advanced));
        assert!(parse_flow("premium").is_err());
    }

    #[tokio::test]
    async fn verbose_rendering_adds_perks_and_application_guide() {
        let service = build_service(
            AdvisorSettings::default(),
            Arc::new(CsvTransactionLedger::default()),
        );
        let (_, payload) = sample_profiles().remove(0);
        let outcome = service
            .recommend_beginner(&UserId("demo".to_string()), payload)
            .await
            .expect("sample scores");

        let brief = render_recommendation(&outcome.recommendation, false);
        let full = render_recommendation(&outcome.recommendation, true);
        assert!(!brief.contains("How to apply:"));
        assert!(full.contains("How to apply:"));
        assert!(full.lines().any(|line| line.starts_with("   + ")));
        assert!(full.len() > brief.len());
    }

    #[tokio::test]
    async fn demo_profiles_all_score() {
        let service = build_service(
            AdvisorSettings::default(),
            Arc::new(CsvTransactionLedger::default()),
        );
        for (_, payload) in sample_profiles() {
            let outcome = service
                .recommend_beginner(&UserId("demo".to_string()), payload)
                .await
                .expect("sample scores");
            assert_eq!(outcome.recommendation.cards.len(), 3);
        }
    }
}
