//! Command-line shell over `roster_core`.
//!
//! # Responsibility
//! - Map subcommands to core operations.
//! - Render results and errors; no domain rules live here.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, SearchMode};
use roster_core::{
    default_log_level, export_dump, export_markup, import_dump, import_markup, init_logging,
    open_db, NewStudent, Paginator, SearchOutcome, SearchQuery, ServiceError,
    SqliteStudentRepository, Student, StudentService,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_cli_logging(&cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            render_error(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn init_cli_logging(cli: &Cli) -> CliResult {
    let Some(dir) = cli.log_dir.as_deref() else {
        return Ok(());
    };
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    init_logging(level, absolute(dir)?)?;
    Ok(())
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn run(cli: Cli) -> CliResult {
    let mut conn = open_db(&cli.db)?;
    let repo = SqliteStudentRepository::try_new(&mut conn)?;
    let mut service = StudentService::new(repo);

    match cli.command {
        Commands::Add { fio, group, exams } => {
            let candidate = exams
                .into_iter()
                .fold(NewStudent::new(fio, group), |student, (subject, grade)| {
                    student.with_exam(subject, grade)
                });
            let id = service.create(&candidate)?;
            println!("added student id={id}");
        }
        Commands::List { page, page_size } => {
            let mut paginator = Paginator::new(page_size)?;
            paginator.refresh(service.repo())?;
            paginator.go_to(page);
            let students = paginator.page_slice(service.repo())?;
            print_students(&students);
            println!(
                "page {}/{} | {} students total",
                paginator.current_page(),
                paginator.total_pages(),
                paginator.total_count()
            );
        }
        Commands::Delete { ids } => {
            let summary = service.delete_many(&ids);
            println!("deleted {} | not deleted {}", summary.deleted, summary.failed);
        }
        Commands::Clear => {
            let removed = service.clear()?;
            println!("removed {removed} students");
        }
        Commands::Search { mode, delete } => {
            let outcome = service.search(&search_query(mode))?;
            print_outcome(&outcome);
            if delete && !outcome.is_empty() {
                let summary = service.delete_many(&outcome.ids());
                println!("deleted {} | not deleted {}", summary.deleted, summary.failed);
            }
        }
        Commands::ExportXml { path } => {
            let count = export_markup(service.repo(), &path)?;
            println!("exported {count} students to {}", path.display());
        }
        Commands::ImportXml { path, clear } => {
            if clear {
                service.clear()?;
            }
            let count = import_markup(service.repo_mut(), &path)?;
            println!("imported {count} students from {}", path.display());
        }
        Commands::ExportSql { path } => {
            let statements = export_dump(service.repo().connection(), &path)?;
            println!("wrote {statements} statements to {}", path.display());
        }
        Commands::ImportSql { path, clear } => {
            if clear {
                service.clear()?;
            }
            let summary = import_dump(service.repo_mut().connection_mut(), &path)?;
            println!(
                "students: {} inserted, {} skipped | exams: {} inserted, {} skipped",
                summary.students_inserted,
                summary.students_skipped,
                summary.exams_inserted,
                summary.exams_skipped
            );
        }
    }
    Ok(())
}

fn search_query(mode: SearchMode) -> SearchQuery {
    match mode {
        SearchMode::Group { group } => SearchQuery::ByGroup { group },
        SearchMode::Avg { subject, min, max } => SearchQuery::ByAverageGrade { subject, min, max },
        SearchMode::Exam { subject, min, max } => SearchQuery::ByExamGrade { subject, min, max },
    }
}

fn print_outcome(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Students(students) => print_students(students),
        SearchOutcome::Ranked(ranked) => {
            for entry in ranked {
                println!("{}  avg={:.2}", student_line(&entry.student), entry.avg_grade);
            }
        }
    }
    println!("{} matched", outcome.len());
}

fn print_students(students: &[Student]) {
    for student in students {
        println!("{}", student_line(student));
    }
}

fn student_line(student: &Student) -> String {
    let exams = student
        .exams
        .iter()
        .map(|(subject, grade)| format!("{subject}={grade}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{:>5}  {:<32}  {}  {}",
        student.id, student.fio, student.group, exams
    )
}

fn render_error(err: &(dyn Error + 'static)) {
    if let Some(ServiceError::Validation(errors)) = err.downcast_ref::<ServiceError>() {
        eprintln!("input rejected:");
        for message in errors.messages() {
            eprintln!("  - {message}");
        }
        return;
    }
    eprintln!("error: {err}");
}
