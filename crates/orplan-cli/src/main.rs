use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use orplan_core::{
    AssignmentPlan, CoverPlan, Coverage, Instance, Outcome, PlanError, Planner, PlannerConfig, Summary,
};

#[derive(Parser)]
#[command(name = "orplan")]
#[command(about = "Operating room assignment and covering under time-overlap conflicts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance file and print its contents
    Check {
        /// The instance file (JSON)
        file: PathBuf,
        /// Keep only operations of this specialty (repeatable)
        #[arg(short, long)]
        specialty: Vec<String>,
    },
    /// Print the conflict relation between operations
    Conflicts {
        file: PathBuf,
        #[arg(short, long)]
        specialty: Vec<String>,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print the conflict-free groups
    Groups {
        file: PathBuf,
        #[arg(short, long)]
        specialty: Vec<String>,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Solve one of the models (or all of them)
    Solve {
        file: PathBuf,
        /// Which model to solve
        #[arg(short, long, value_enum, default_value = "assign")]
        model: ModelKind,
        #[arg(short, long)]
        specialty: Vec<String>,
        /// Planner configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Require every operation in exactly one selected group
        #[arg(long)]
        exact_cover: bool,
        /// Solver time limit in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// Branch-and-bound node limit
        #[arg(long)]
        max_nodes: Option<usize>,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelKind {
    /// Minimum-cost assignment of each operation to a room
    Assign,
    /// Cheapest set of conflict-free groups at average cost
    CostCover,
    /// Fewest conflict-free groups (room-days)
    RoomCover,
    /// All three
    All,
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, e);
    std::process::exit(1);
}

fn load_instance(file: &Path, specialties: &[String]) -> Instance {
    match Instance::load(file) {
        Ok(instance) => instance.restrict_to_specialties(specialties),
        Err(e) => fail("Error loading instance", e),
    }
}

fn load_planner(file: &Path, specialties: &[String], config: PlannerConfig) -> Planner {
    let instance = load_instance(file, specialties);
    match Planner::new(instance, config) {
        Ok(p) => p,
        Err(e) => fail("Error building conflicts", e),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => fail("Error serializing output", e),
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Summary:");
    println!("  Rooms used:           {}", summary.rooms_used);
    if summary.groups_selected > 0 {
        println!("  Groups selected:      {}", summary.groups_selected);
    }
    println!("  Operations covered:   {}", summary.operations_covered);
    println!("  Distinct operations:  {}", summary.distinct_operations);
    if let Some(cost) = summary.total_cost {
        println!("  Total cost:           {:.2}", cost);
    }
    println!("  Objective:            {:.2}", summary.objective_value);
}

fn print_assignment(plan: &AssignmentPlan) {
    println!("Assignments:");
    for a in &plan.assignments {
        println!("  {:20} {:10} {:10.2}", a.operation, a.room, a.cost);
    }
    print_summary(&plan.summary);
}

fn print_cover(plan: &CoverPlan) {
    println!("Selected groups:");
    for (n, selected) in plan.groups.iter().enumerate() {
        let members: Vec<&str> = selected.group.members().iter().map(|id| id.as_str()).collect();
        match selected.cost {
            Some(cost) => println!("  Group {} (#{}, cost {:.2}): {}", n + 1, selected.index, cost, members.join(", ")),
            None => println!("  Group {} (#{}): {}", n + 1, selected.index, members.join(", ")),
        }
    }
    print_summary(&plan.summary);
}

/// Print one model's outcome. Returns false when no plan was produced.
fn report<T: serde::Serialize>(
    title: &str,
    outcome: &Result<Outcome<T>, PlanError>,
    format: &str,
    print_plan: fn(&T),
) -> bool {
    match outcome {
        Ok(outcome) => {
            if format == "json" {
                print_json(outcome);
            } else {
                println!("{}", title);
                println!("Status: {}", outcome.label());
                match outcome {
                    Outcome::Optimal(plan) | Outcome::Suboptimal(plan) => {
                        println!();
                        print_plan(plan);
                    }
                    Outcome::Infeasible => {
                        println!("No room plan satisfies all constraints.");
                    }
                    Outcome::TimedOut => {
                        println!("The solver budget ran out before a feasible plan was found.");
                    }
                }
                println!();
            }
            outcome.plan().is_some()
        }
        Err(e) => {
            eprintln!("{}: {}", title, e);
            false
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { file, specialty } => {
            let instance = load_instance(&file, &specialty);
            let planner = match Planner::new(instance, PlannerConfig::default()) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            };
            let instance = planner.instance();
            let missing = instance.costs.missing(&instance.rooms, &instance.operations);

            println!("✓ {} is valid", file.display());
            println!("  {} operations", instance.operations.len());
            println!("  {} rooms", instance.rooms.len());
            println!("  {} conflicts", planner.relation().edge_count());
            for (name, count) in instance.specialties() {
                println!("    {:40} {}", name, count);
            }
            if !missing.is_empty() {
                println!("  {} missing room costs, e.g. operation {} in room {}",
                    missing.len(), missing[0].1, missing[0].0);
            }
        }
        Commands::Conflicts { file, specialty, format } => {
            let planner = load_planner(&file, &specialty, PlannerConfig::default());
            let relation = planner.relation();
            if format == "json" {
                print_json(&relation.to_map());
            } else {
                for id in relation.operation_ids() {
                    let others: Vec<&str> = relation.neighbors(id).map(|o| o.as_str()).collect();
                    println!("  {:20} {}", id, others.join(", "));
                }
                println!();
                println!("{} operations, {} conflicting pairs", relation.len(), relation.edge_count());
            }
        }
        Commands::Groups { file, specialty, format } => {
            let planner = load_planner(&file, &specialty, PlannerConfig::default());
            let groups = planner.groups();
            if format == "json" {
                print_json(&groups);
            } else {
                for (k, group) in groups.iter().enumerate() {
                    let members: Vec<&str> = group.members().iter().map(|id| id.as_str()).collect();
                    println!("  Group {}: {}", k + 1, members.join(", "));
                }
                println!();
                println!("{} groups for {} operations", groups.len(), planner.relation().len());
            }
        }
        Commands::Solve {
            file,
            model,
            specialty,
            config,
            exact_cover,
            time_limit,
            max_nodes,
            format,
        } => {
            let mut config = match config {
                Some(path) => match PlannerConfig::load(&path) {
                    Ok(c) => c,
                    Err(e) => fail("Error loading config", e),
                },
                None => PlannerConfig::default(),
            };
            if exact_cover {
                config.coverage = Coverage::Exactly;
            }
            if time_limit.is_some() {
                config.time_limit_secs = time_limit;
            }
            if let Some(max) = max_nodes {
                config.max_nodes = max;
            }
            if let Err(e) = config.validate() {
                fail("Invalid configuration", e);
            }

            let planner = load_planner(&file, &specialty, config);
            let solver = planner.config().solver();

            let ok = match model {
                ModelKind::Assign => {
                    report("Room assignment", &planner.assign(&solver), &format, print_assignment)
                }
                ModelKind::CostCover => {
                    report("Cost cover", &planner.cover_by_cost(&solver), &format, print_cover)
                }
                ModelKind::RoomCover => {
                    report("Room count cover", &planner.cover_by_rooms(&solver), &format, print_cover)
                }
                ModelKind::All => {
                    let plans = planner.solve_all(&solver);
                    let a = report("Room assignment", &plans.assignment, &format, print_assignment);
                    let b = report("Cost cover", &plans.cost_cover, &format, print_cover);
                    let c = report("Room count cover", &plans.room_cover, &format, print_cover);
                    a && b && c
                }
            };

            if !ok {
                std::process::exit(1);
            }
        }
    }
}
