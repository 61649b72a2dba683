//! rlinear command line interface
//!
//! Train, apply, cross-validate and inspect linear classifiers on data in
//! the libsvm text format.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use rlinear::api::LinearClassifier;
use rlinear::core::{LinearError, Predictor, Problem, Result, SolverType};
use rlinear::data::read_instance_weights;
use rlinear::Model;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rlinear")]
#[command(about = "Large-scale linear classification: logistic regression and linear SVM")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and save it
    Train(TrainArgs),
    /// Predict labels with a trained model
    Predict(PredictArgs),
    /// Estimate accuracy with k-fold cross-validation
    CrossValidate(CrossValidateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSolver {
    /// L2-regularized logistic regression (primal)
    #[value(name = "l2r-lr")]
    L2rLr,
    /// L2-regularized L2-loss SVC (dual, default)
    #[value(name = "l2r-l2loss-svc-dual")]
    L2rL2LossSvcDual,
    /// L2-regularized L2-loss SVC (primal)
    #[value(name = "l2r-l2loss-svc")]
    L2rL2LossSvc,
    /// L2-regularized L1-loss SVC (dual)
    #[value(name = "l2r-l1loss-svc-dual")]
    L2rL1LossSvcDual,
    /// Multi-class SVC by Crammer and Singer
    #[value(name = "mcsvm-cs")]
    McsvmCs,
    /// L1-regularized L2-loss SVC
    #[value(name = "l1r-l2loss-svc")]
    L1rL2LossSvc,
    /// L1-regularized logistic regression
    #[value(name = "l1r-lr")]
    L1rLr,
    /// L2-regularized logistic regression (dual)
    #[value(name = "l2r-lr-dual")]
    L2rLrDual,
}

impl From<CliSolver> for SolverType {
    fn from(solver: CliSolver) -> Self {
        match solver {
            CliSolver::L2rLr => SolverType::L2rLr,
            CliSolver::L2rL2LossSvcDual => SolverType::L2rL2LossSvcDual,
            CliSolver::L2rL2LossSvc => SolverType::L2rL2LossSvc,
            CliSolver::L2rL1LossSvcDual => SolverType::L2rL1LossSvcDual,
            CliSolver::McsvmCs => SolverType::McsvmCs,
            CliSolver::L1rL2LossSvc => SolverType::L1rL2LossSvc,
            CliSolver::L1rLr => SolverType::L1rLr,
            CliSolver::L2rLrDual => SolverType::L2rLrDual,
        }
    }
}

/// Options shared by training and cross-validation
#[derive(Args)]
struct TrainingOptions {
    /// Training data file (libsvm format)
    #[arg(long)]
    data: PathBuf,

    /// Solver
    #[arg(short, long, value_enum, default_value = "l2r-l2loss-svc-dual")]
    solver: CliSolver,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Stopping tolerance (defaults to the solver's recommendation)
    #[arg(short, long)]
    eps: Option<f64>,

    /// Bias feature value; negative disables the bias feature
    #[arg(short = 'B', long, default_value = "-1", allow_hyphen_values = true)]
    bias: f64,

    /// Cap on outer iterations (defaults to the solver's recommendation)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Class weight as LABEL:WEIGHT; multiplies C for that class (repeatable)
    #[arg(short, long = "weight", value_parser = parse_class_weight, allow_hyphen_values = true)]
    weights: Vec<(i32, f64)>,

    /// Per-instance weight file, one value per line
    #[arg(long)]
    instance_weights: Option<PathBuf>,

    /// Seed for the random sweep order and fold assignment
    #[arg(long, default_value = "0")]
    seed: u64,
}

impl TrainingOptions {
    fn classifier(&self) -> LinearClassifier {
        let mut classifier = LinearClassifier::new()
            .with_solver(self.solver.into())
            .with_c(self.c)
            .with_bias(self.bias)
            .with_seed(self.seed);
        if let Some(eps) = self.eps {
            classifier = classifier.with_eps(eps);
        }
        if let Some(max_iterations) = self.max_iterations {
            classifier = classifier.with_max_iterations(max_iterations);
        }
        for &(label, weight) in &self.weights {
            classifier = classifier.with_class_weight(label, weight);
        }
        classifier
    }

    fn load_problem(&self) -> Result<Problem> {
        info!("Loading training data from: {:?}", self.data);
        let problem = Problem::from_libsvm_file(&self.data, self.bias)?;
        let problem = match &self.instance_weights {
            Some(path) => {
                info!("Loading instance weights from: {path:?}");
                problem.with_weights(read_instance_weights(path)?)?
            }
            None => problem,
        };
        info!(
            "Loaded {} instances with {} features",
            problem.len(),
            problem.n
        );
        Ok(problem)
    }
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    options: TrainingOptions,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Save the model as JSON instead of the text format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file (libsvm format)
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output probability estimates (logistic regression models only)
    #[arg(short, long)]
    probability: bool,
}

#[derive(Args)]
struct CrossValidateArgs {
    #[command(flatten)]
    options: TrainingOptions,

    /// Number of folds
    #[arg(short = 'k', long, default_value = "5")]
    folds: usize,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn parse_class_weight(s: &str) -> std::result::Result<(i32, f64), String> {
    let (label, weight) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LABEL:WEIGHT, got '{s}'"))?;
    let label = rlinear::utils::parse_int(label).map_err(|e| e.to_string())?;
    let weight = rlinear::utils::parse_real(weight).map_err(|e| e.to_string())?;
    Ok((label, weight))
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::CrossValidate(args) => cross_validate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let problem = args.options.load_problem()?;
    let classifier = args.options.classifier();
    let param = classifier.parameter();
    info!(
        "Parameters: solver={}, C={}, eps={}, max_iter={}",
        param.solver_type,
        param.c,
        param.eps,
        param.max_iterations()
    );

    let model = classifier.train(&problem)?;
    info!("Training completed successfully");

    if args.json {
        model.inner().save_json(&args.output)?;
    } else {
        model.save(&args.output)?;
    }
    info!("Model saved to: {:?}", args.output);

    let accuracy = model.evaluate(&problem);
    info!("Training accuracy: {:.2}%", accuracy * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;
    if args.probability && !model.supports_probability() {
        return Err(LinearError::InvalidParameter(format!(
            "probability output is only supported for logistic regression, not {}",
            model.solver_type()
        )));
    }

    info!("Loading prediction data from: {:?}", args.data);
    let problem = Problem::from_libsvm_file(&args.data, model.bias())?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.probability {
        write!(writer, "labels")?;
        for label in model.labels() {
            write!(writer, " {label}")?;
        }
        writeln!(writer)?;
    }

    let mut predicted = Vec::with_capacity(problem.len());
    for x in &problem.x {
        if args.probability {
            let (label, prob) = model.predict_probability(x)?;
            write!(writer, "{label}")?;
            for p in prob {
                write!(writer, " {p:.6}")?;
            }
            writeln!(writer)?;
            predicted.push(label);
        } else {
            let label = model.predict_label(x);
            writeln!(writer, "{label}")?;
            predicted.push(label);
        }
    }
    writer.flush()?;

    let correct = predicted
        .iter()
        .zip(&problem.y)
        .filter(|(p, y)| p == y)
        .count();
    let total = problem.len();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };
    let summary = format!("Accuracy = {:.4}% ({correct}/{total})", accuracy * 100.0);
    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
        println!("{summary}");
    } else {
        info!("{summary}");
    }

    Ok(())
}

fn cross_validate_command(args: CrossValidateArgs) -> Result<()> {
    let problem = args.options.load_problem()?;
    let result = args
        .options
        .classifier()
        .cross_validate(&problem, args.folds)?;

    println!("=== Cross-Validation Results ===");
    println!("Data file: {:?}", args.options.data);
    println!("Folds: {}", args.folds);
    println!(
        "Cross Validation Accuracy = {:.4}%",
        result.accuracy() * 100.0
    );
    for label in result.metrics.labels() {
        println!(
            "  label {label}: precision {:.4} recall {:.4} f1 {:.4}",
            result.metrics.precision(label),
            result.metrics.recall(label),
            result.metrics.f1_score(label)
        );
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;

    println!("=== Model Information ===");
    println!("Solver: {}", model.solver_type());
    println!("Classes: {}", model.nr_class());
    let labels: Vec<String> = model.labels().iter().map(i32::to_string).collect();
    println!("Labels: {}", labels.join(" "));
    println!("Features: {}", model.nr_feature());
    if model.has_bias() {
        println!("Bias: {}", model.bias());
    } else {
        println!("Bias: disabled");
    }
    println!("Weight columns: {}", model.nr_weight_columns());

    let non_zero = model.feature_weights().iter().filter(|w| **w != 0.0).count();
    println!(
        "Non-zero weights: {} of {}",
        non_zero,
        model.feature_weights().len()
    );
    println!(
        "Probability estimates: {}",
        if model.supports_probability() {
            "yes"
        } else {
            "no"
        }
    );

    Ok(())
}

/// Load a model, choosing JSON or the text format by file extension
fn load_model(path: &Path) -> Result<Model> {
    if is_json(path) {
        Model::load_json(path)
    } else {
        Model::load(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}
