use std::path::PathBuf;

use academic_aggregates::assignments::compute_final_scores;
use academic_aggregates::attendance::{aggregate_attendance, aggregate_by_group};
use academic_aggregates::db::{self, PgSource};
use academic_aggregates::distribution::summarize;
use academic_aggregates::grade::display_round;
use academic_aggregates::ratings::aggregate_ratings;
use academic_aggregates::report;
use academic_aggregates::scope::{cutoff_date, Scope};
use academic_aggregates::source::{CsvSource, RecordSource};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "academic-aggregates")]
#[command(about = "Attendance, grade and teacher rating aggregates for academic records", long_about = None)]
struct Cli {
    /// Read records from a directory of CSV files instead of DATABASE_URL
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct ScopeArgs {
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    teacher: Option<String>,
    /// Survey period identifier
    #[arg(long)]
    period: Option<String>,
    /// Only count lessons held within the last N days
    #[arg(long)]
    since_days: Option<i64>,
}

impl ScopeArgs {
    fn into_scope(self) -> Scope {
        Scope {
            group_id: self.group,
            subject_id: self.subject,
            teacher_id: self.teacher,
            period_id: self.period,
            since: self.since_days.map(cutoff_date),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Attendance rates per student with the cohort distribution
    Attendance {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Break the cohort down by group
        #[arg(long, default_value_t = false)]
        by_group: bool,
    },
    /// Final scores and letter grades per student
    Grades {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Teacher ratings from survey answers
    Ratings {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when --data-dir is not given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn open_source(data_dir: Option<PathBuf>) -> anyhow::Result<Box<dyn RecordSource>> {
    match data_dir {
        Some(dir) => Ok(Box::new(CsvSource::new(dir))),
        None => Ok(Box::new(PgSource::new(connect().await?))),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Attendance { scope, by_group } => {
            let scope = scope.into_scope();
            let records = open_source(cli.data_dir).await?.load(&scope).await?;

            if by_group {
                let groups =
                    aggregate_by_group(&records.marks, &records.lessons, &records.students, &scope)?;
                if cli.json {
                    return print_json(&groups);
                }
                for group in &groups {
                    println!(
                        "{}: {}% across {} students",
                        group.group_id,
                        display_round(group.average_attendance),
                        group.student_count
                    );
                }
                return Ok(());
            }

            let cohort =
                aggregate_attendance(&records.marks, &records.lessons, &records.students, &scope)?;
            let summary = summarize(&cohort.stats);
            if cli.json {
                return print_json(&serde_json::json!({
                    "cohort": cohort,
                    "distribution": summary,
                }));
            }

            if cohort.stats.is_empty() {
                println!("No students found for this scope.");
                return Ok(());
            }
            println!("Attendance for {}:", scope.label());
            for stat in &cohort.stats {
                println!(
                    "- {} {}% ({} of {} lessons, {} missed) {}",
                    stat.student_name,
                    display_round(stat.attendance_rate),
                    stat.attended_lessons,
                    stat.total_lessons,
                    stat.missed_lessons,
                    stat.bucket
                );
            }
            println!("Average attendance {}%", display_round(summary.average_attendance));
            for share in &summary.buckets {
                println!(
                    "  {}: {} ({}%)",
                    share.bucket,
                    share.count,
                    display_round(share.percentage)
                );
            }
        }
        Commands::Grades { scope } => {
            let scope = scope.into_scope();
            let records = open_source(cli.data_dir).await?.load(&scope).await?;
            let grades = compute_final_scores(
                &records.submissions,
                &records.assignments,
                &records.students,
                &scope,
            )?;
            if cli.json {
                return print_json(&grades);
            }

            if grades.is_empty() {
                println!("No students found for this scope.");
                return Ok(());
            }
            println!("Final grades for {}:", scope.label());
            for view in &grades {
                println!(
                    "- {} {:.1} {} ({} graded, {} pending)",
                    view.student_id,
                    view.total_score,
                    view.letter_grade,
                    view.graded_count,
                    view.pending_count
                );
            }
        }
        Commands::Ratings { scope } => {
            let scope = scope.into_scope();
            let records = open_source(cli.data_dir).await?.load(&scope).await?;
            let ratings = aggregate_ratings(
                &records.responses,
                &records.answers,
                &records.questions,
                &records.students,
                &scope,
            )?;
            if cli.json {
                return print_json(&ratings);
            }

            if ratings.is_empty() {
                println!("No survey responses for this scope.");
                return Ok(());
            }
            for rating in &ratings {
                println!(
                    "{} / {}: {:.2} from {} responses",
                    rating.teacher_id,
                    rating.subject_id,
                    rating.average_rating,
                    rating.total_responses
                );
                for question in &rating.question_ratings {
                    println!("  - {}: {:.2}", question.text, question.average);
                }
            }
        }
        Commands::Report { scope, out } => {
            let scope = scope.into_scope();
            let records = open_source(cli.data_dir).await?.load(&scope).await?;
            let report = report::build_report(&scope, &records)?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
