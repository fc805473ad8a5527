//! Command line tool to train, evaluate and query a text classifier

use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    config::Config as _,
    data::dataset::Dataset as _,
};
use pico_args::Arguments;
use serde::Serialize;
use text_classifiers::{
    cli::datasets::Dataset,
    datasets::{
        github_issues::GithubIssues, mark_diagnosis::MarkDiagnosis, sentiment::Sentiment, Task,
        TextInput,
    },
    pipelines::text_classification::{evaluate, Label, Prediction, TrainerConfig},
};

type Backend = Autodiff<NdArray>;

const HELP: &str = "\
Usage: train DATASET [OPTIONS]

Arguments:
  DATASET              The dataset to use ('github-issues', 'mark-diagnosis' or 'sentiment')

Options:
  -h, --help           Print help
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -c, --config         A JSON trainer config file; other options override its values
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  -l, --learning-rate  Learning rate
  -s, --seed           Seed for the train/test split and batch order
  -p, --predict        Text to classify after training, repeatable (separate fields with a tab)
  -r, --report         Write metrics and predictions to this JSON file
";

#[derive(Debug)]
struct Args {
    dataset: String,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    seed: Option<u64>,
    predict: Vec<String>,
    report: Option<PathBuf>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            learning_rate: pargs.opt_value_from_str(["-l", "--learning-rate"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?,
            predict: pargs.values_from_str(["-p", "--predict"])?,
            report: pargs.opt_value_from_str(["-r", "--report"])?,
            dataset: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: DATASET"),
                _ => anyhow!("{}", e),
            })?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            log::warn!("Ignoring unused arguments: {:?}", remaining);
        }

        Ok(Some(args))
    }
}

/// Everything printed to the console, as written to the `--report` file
#[derive(Serialize)]
struct Report<'a, L, M> {
    dataset: &'static str,
    pipeline: String,
    trainer: &'a TrainerConfig,
    train_rows: usize,
    test_rows: usize,
    metrics: &'a M,
    predictions: &'a [Prediction<L>],
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    match Dataset::try_from(args.dataset.as_str())? {
        Dataset::GithubIssues => run(GithubIssues, &args),
        Dataset::MarkDiagnosis => run(MarkDiagnosis, &args),
        Dataset::Sentiment => run(Sentiment, &args),
    }
}

/// Load, fit, evaluate and predict for one task
fn run<T: Task>(task: T, args: &Args) -> anyhow::Result<()>
where
    T::Label: Serialize,
{
    let mut config = match &args.config {
        Some(path) => TrainerConfig::load(path)
            .map_err(|e| anyhow!("Unable to load config file {}: {}", path.display(), e))?,
        None => TrainerConfig::new(),
    };

    if let Some(num_epochs) = args.num_epochs {
        config.num_epochs = num_epochs;
    }

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }

    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"));
    let schema = task.schema();

    println!("=============== Loading the {} dataset ===============", T::NAME);

    let data = task
        .source(&data_dir)
        .load::<T::Label>(&schema, config.seed)
        .with_context(|| format!("Unable to load the {} dataset", T::NAME))?;

    println!(
        "Loaded {} training rows and {} test rows",
        data.train.len(),
        data.test.len()
    );

    let estimator = task.pipeline(&schema)?.append_trainer(config);

    println!("=============== Create and Train the Model ===============");

    let device = NdArrayDevice::default();
    let model = estimator
        .fit::<Backend>(&data.train, &device)
        .context("Unable to fit the pipeline")?;

    println!("=============== End of training ===============");
    println!();
    println!("=============== Evaluating Model Accuracy with Test Data ===============");

    let metrics = evaluate(&model, &data.test).context("Unable to evaluate the model")?;

    println!();
    println!("Model quality metrics evaluation");
    println!("--------------------------------");
    println!("{}", metrics);
    println!("=============== End of model evaluation ===============");

    let inputs: Vec<TextInput> = if args.predict.is_empty() {
        task.samples()
    } else {
        args.predict
            .iter()
            .map(|text| TextInput::new(text.split('\t').map(str::to_string).collect()))
            .collect()
    };

    println!();
    println!("=============== Prediction Test of model with multiple samples ===============");

    let predictions = model.prediction_engine().predict_batch(&inputs)?;

    for prediction in &predictions {
        println!(
            "Text: {} | Prediction: {} | Probability: {:.2}%",
            prediction.text,
            prediction.predicted_label.display(),
            prediction.probability * 100.0
        );
    }

    println!("=============== End of predictions ===============");

    if let Some(path) = &args.report {
        let report = Report {
            dataset: T::NAME,
            pipeline: estimator.describe(),
            trainer: estimator.trainer(),
            train_rows: data.train.len(),
            test_rows: data.test.len(),
            metrics: &metrics,
            predictions: &predictions,
        };

        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Unable to write report to {}", path.display()))?;

        log::info!("Wrote report to {}", path.display());
    }

    Ok(())
}
