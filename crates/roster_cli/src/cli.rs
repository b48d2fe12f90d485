use clap::{Parser, Subcommand};
use roster_core::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster", about = "Student roster maintenance", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the SQLite database file
    #[arg(long, global = true, default_value = "students.db")]
    pub db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Directory for rolling log files; logging is off when omitted
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add one student
    Add {
        /// Full name, letters and spaces only
        fio: String,

        /// Six-digit group number
        group: String,

        /// Exam result as SUBJECT=GRADE; repeatable
        #[arg(long = "exam", value_parser = parse_exam)]
        exams: Vec<(String, i64)>,
    },

    /// Show one page of students ordered by id
    List {
        /// 1-based page number; clamped to the last page
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Rows per page (1, 5, 10, 15, 20, 25 or 50)
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Delete students by id
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Remove every student
    Clear,

    /// Search students
    Search {
        #[command(subcommand)]
        mode: SearchMode,

        /// Delete every matched student
        #[arg(long, global = true)]
        delete: bool,
    },

    /// Export all students as XML
    ExportXml { path: PathBuf },

    /// Import students from XML
    ImportXml {
        path: PathBuf,

        /// Remove existing students first
        #[arg(long)]
        clear: bool,
    },

    /// Export the database as an SQL dump
    ExportSql { path: PathBuf },

    /// Merge an SQL dump into the database
    ImportSql {
        path: PathBuf,

        /// Remove existing students first
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum SearchMode {
    /// Exact group number
    Group { group: String },

    /// Students having SUBJECT whose average of all grades is in [MIN, MAX]
    Avg { subject: String, min: f64, max: f64 },

    /// Students whose SUBJECT grade is in [MIN, MAX]
    Exam { subject: String, min: f64, max: f64 },
}

fn parse_exam(raw: &str) -> Result<(String, i64), String> {
    let (subject, grade) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SUBJECT=GRADE, got `{raw}`"))?;
    let grade = grade
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("grade must be an integer, got `{}`", grade.trim()))?;
    Ok((subject.trim().to_string(), grade))
}
