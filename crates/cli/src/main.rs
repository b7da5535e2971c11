//! Pathway CLI - browse learning paths and track progress.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pathway_core::{Course, CourseFilter, Difficulty, LearnerId, LearningPath, PathFilter, PathId};
use pathway_progress::{
    BasicProgressTracker, EffortEstimator, PathState, ProgressSnapshot, ProgressTracker, TrackerConfig,
};
use pathway_storage::{CatalogStore, JsonStorage};

#[derive(Parser)]
#[command(name = "pathway")]
#[command(about = "Learning paths with milestone progress tracking", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, env = "PATHWAY_DATA_DIR", default_value = ".pathway", global = true)]
    data_dir: PathBuf,

    /// Learner to act as
    #[arg(long, env = "PATHWAY_LEARNER", global = true)]
    learner: Option<String>,

    /// Allow enrolling into inactive paths
    #[arg(long, global = true)]
    allow_inactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import learning paths (or, with --courses, courses) from a JSON file
    /// holding one record or an array
    Import {
        /// JSON file
        file: PathBuf,
        /// The file holds course records
        #[arg(long)]
        courses: bool,
    },
    /// List learning paths
    List {
        /// Filter by domain
        #[arg(long)]
        domain: Option<String>,
        /// Filter by difficulty
        #[arg(long)]
        difficulty: Option<String>,
        /// Search title and description
        #[arg(long)]
        search: Option<String>,
        /// Include inactive paths
        #[arg(long)]
        all: bool,
    },
    /// Browse the course catalog
    Courses {
        /// Search name, description and domains
        #[arg(long)]
        search: Option<String>,
        /// Filter by platform
        #[arg(long)]
        platform: Option<String>,
        /// Filter by domain
        #[arg(long)]
        domain: Option<String>,
    },
    /// List course platforms
    Platforms,
    /// Show a path and, with --learner, its progress
    Show {
        /// Path ID
        id: String,
        /// Weekly study pace used to project a finish date
        #[arg(long)]
        hours_per_week: Option<f32>,
    },
    /// Enroll into a path
    Enroll {
        /// Path ID
        id: String,
    },
    /// Mark a course as completed
    CompleteCourse {
        /// Path ID
        id: String,
        /// Milestone number as shown by `show` (starting at 1)
        milestone: usize,
        /// Course name
        course: String,
    },
    /// Mark a practice task as completed
    CompleteTask {
        /// Path ID
        id: String,
        /// Milestone number as shown by `show` (starting at 1)
        milestone: usize,
        /// Task title
        task: String,
    },
    /// List the learner's enrollments
    Progress,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile<T> {
    Many(Vec<T>),
    One(Box<T>),
}

impl<T> ImportFile<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ImportFile::Many(items) => items,
            ImportFile::One(item) => vec![*item],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let storage = JsonStorage::new(&cli.data_dir)
        .await
        .with_context(|| format!("opening storage at {}", cli.data_dir.display()))?;
    let mut tracker = BasicProgressTracker::new(storage).with_config(TrackerConfig {
        allow_inactive_enrollment: cli.allow_inactive,
    });
    let learner = cli.learner.as_deref().map(LearnerId::new);

    match cli.command {
        Commands::Import { file, courses } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let storage = tracker.storage_mut();

            if courses {
                let courses = serde_json::from_str::<ImportFile<Course>>(&raw)?.into_vec();
                for course in courses {
                    let (course, replaced) = storage.import_course(course).await?;
                    println!("{}: {} - {}", import_verb(replaced), course.id, course.name);
                }
            } else {
                let paths = serde_json::from_str::<ImportFile<LearningPath>>(&raw)?.into_vec();
                for mut path in paths {
                    path.normalize();
                    if let Err(e) = path.validate() {
                        warn!(title = %path.title, error = %e, "skipping invalid path");
                        continue;
                    }
                    let (path, replaced) = storage.import_path(path).await?;
                    println!("{}: {} - {}", import_verb(replaced), path.id, path.title);
                }
            }
        }
        Commands::Courses { search, platform, domain } => {
            let filter = CourseFilter { search, platform, domain };
            let courses = tracker.storage().list_courses(&filter).await?;

            println!("Courses ({})", courses.len());
            for course in courses {
                println!("  {} | {} | {}", course.id, course.platform, course.domain.join(", "));
                println!("      {}", course.name);
                if !course.link.is_empty() {
                    println!("      {}", course.link);
                }
            }
        }
        Commands::Platforms => {
            for platform in tracker.storage().list_platforms().await? {
                println!("{platform}");
            }
        }
        Commands::List { domain, difficulty, search, all } => {
            let difficulty = difficulty.map(|d| d.parse::<Difficulty>()).transpose()?;
            let filter = PathFilter {
                domain,
                difficulty,
                search,
                include_inactive: all,
            };
            let paths = tracker.storage().list_paths(&filter).await?;

            println!("Learning paths ({})", paths.len());
            for path in paths {
                println!(
                    "  {} | {} | {} | {} milestones{}",
                    path.id,
                    path.difficulty,
                    path.domain,
                    path.milestones.len(),
                    if path.is_active { "" } else { " | INACTIVE" },
                );
                println!("      {}", path.title);
            }
        }
        Commands::Show { id, hours_per_week } => {
            let path_id = parse_path_id(&id)?;
            let snapshot = tracker.snapshot(learner.as_ref(), path_id).await?;
            let overview = tracker.overview(path_id).await?;
            print_snapshot(&snapshot);
            println!("  Enrolled learners: {}", overview.enrollment_count.unwrap_or(0));
            if !overview.skills.is_empty() {
                println!("  Skills: {}", overview.skills.join(", "));
            }
            if let Some(pace) = hours_per_week {
                match EffortEstimator.estimate_completion(
                    &snapshot.path,
                    snapshot.progress.as_ref(),
                    pace,
                ) {
                    Some(at) => println!("  Projected finish: {}", at.format("%Y-%m-%d")),
                    None => println!("  Projected finish: unknown at {pace} hours/week"),
                }
            }
        }
        Commands::Enroll { id } => {
            let learner = require_learner(learner)?;
            let progress = tracker.enroll(&learner, parse_path_id(&id)?).await?;
            println!(
                "Enrolled {} in {} (milestone {}, {}%)",
                learner,
                progress.path_id,
                progress.current_milestone + 1,
                progress.overall_progress
            );
        }
        Commands::CompleteCourse { id, milestone, course } => {
            let learner = require_learner(learner)?;
            let index = milestone_index(milestone)?;
            let progress = tracker
                .complete_course(&learner, parse_path_id(&id)?, index, &course)
                .await?;
            println!(
                "Recorded course '{}'. Now on milestone {} ({}%)",
                course,
                progress.current_milestone + 1,
                progress.overall_progress
            );
        }
        Commands::CompleteTask { id, milestone, task } => {
            let learner = require_learner(learner)?;
            let index = milestone_index(milestone)?;
            let progress = tracker
                .complete_task(&learner, parse_path_id(&id)?, index, &task)
                .await?;
            println!(
                "Recorded task '{}'. Now on milestone {} ({}%)",
                task,
                progress.current_milestone + 1,
                progress.overall_progress
            );
        }
        Commands::Progress => {
            let learner = require_learner(learner)?;
            let enrollments = tracker.enrolled_paths(&learner).await?;

            println!("Enrollments of {} ({})", learner, enrollments.len());
            for progress in enrollments {
                let title = match tracker.storage().load_path(progress.path_id).await? {
                    Some(path) => path.title,
                    None => "<removed path>".to_string(),
                };
                println!(
                    "  {} | {:>3}% | milestone {} | {}",
                    progress.path_id,
                    progress.overall_progress,
                    progress.current_milestone + 1,
                    title
                );
            }
        }
    }

    info!("done");
    Ok(())
}

fn import_verb(replaced: bool) -> &'static str {
    if replaced {
        "Updated"
    } else {
        "Imported"
    }
}

fn parse_path_id(s: &str) -> Result<PathId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid path ID: {s}"))
}

fn require_learner(learner: Option<LearnerId>) -> Result<LearnerId> {
    learner.ok_or_else(|| anyhow::anyhow!("--learner (or PATHWAY_LEARNER) is required"))
}

fn milestone_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Milestones are numbered from 1"))
}

fn print_snapshot(snapshot: &ProgressSnapshot) {
    let path = &snapshot.path;
    println!("Path: {}", path.id);
    println!("  Title: {}", path.title);
    println!("  Domain: {}", path.domain);
    println!("  Difficulty: {}", path.difficulty);
    println!("  Duration: {} weeks, {} hours", path.duration.weeks, path.duration.hours);
    println!("  Status: {}", format_state(snapshot.state));
    if let Some(progress) = &snapshot.progress {
        println!("  Overall progress: {}%", progress.overall_progress);
    }
    println!("  Remaining required hours: {:.1}", snapshot.remaining_hours);

    for ((milestone, state), summary) in path
        .milestones
        .iter()
        .zip(&snapshot.milestones)
        .zip(&snapshot.summaries)
    {
        let marker = if state.completed {
            "[x]"
        } else if state.current {
            "[>]"
        } else if state.unlocked {
            "[ ]"
        } else {
            "[#]"
        };
        println!("  {} {}. {}", marker, milestone.order, milestone.title);
        if snapshot.progress.is_some() {
            println!(
                "        {} / {} courses, {} / {} tasks",
                summary.completed_courses,
                summary.total_courses,
                summary.completed_tasks,
                summary.total_tasks
            );
        }
        if !state.unlocked {
            println!("        Complete previous milestone to unlock");
        }
    }
}

fn format_state(state: PathState) -> String {
    match state {
        PathState::NotEnrolled => "NOT ENROLLED".to_string(),
        PathState::Enrolled(idx) => format!("ENROLLED (milestone {})", idx + 1),
        PathState::PathComplete => "COMPLETE".to_string(),
    }
}
