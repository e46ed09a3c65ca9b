//! Developer utility to train and export a logistic regression churn artifact.

use std::path::PathBuf;

use churn_scorer::features::normalize;
use churn_scorer::ml::dataset::{parse_labelled_jsonl, stratified_split};
use churn_scorer::ml::logreg::{LogRegModel, TrainDataset, TrainOptions, train_logreg};
use churn_scorer::ml::metrics::{ConfusionMatrix, roc_auc};
use churn_scorer::server::CHURN_THRESHOLD;

const DEFAULT_MODEL_ID: &str = "churn_logreg_v1";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let text = std::fs::read_to_string(&options.data_path)
        .map_err(|err| format!("Failed to read {}: {err}", options.data_path.display()))?;
    let labelled = parse_labelled_jsonl(&text)?;
    if labelled.skipped > 0 {
        eprintln!("skipped {} rows without a usable label", labelled.skipped);
    }
    if labelled.records.is_empty() {
        return Err("Training data has no labelled rows".to_string());
    }

    // imputation medians come from the whole file, matching how the data was prepared
    let canonical = normalize(&labelled.records);
    let (train_idx, test_idx) =
        stratified_split(&labelled.labels, options.test_fraction, options.seed);
    let subset = |indices: &[usize]| {
        let records: Vec<_> = indices.iter().map(|&idx| canonical[idx]).collect();
        let labels: Vec<bool> = indices.iter().map(|&idx| labelled.labels[idx]).collect();
        TrainDataset::from_records(&records, &labels)
    };
    let train = subset(&train_idx)?;
    let test = subset(&test_idx)?;

    let train_options = TrainOptions {
        epochs: options.epochs,
        learning_rate: options.learning_rate,
        l2: options.l2,
        batch_size: options.batch_size.max(1),
        seed: options.seed,
        balance_classes: options.balance_classes,
    };
    let mut model = train_logreg(&train, &train_options)?;
    model.model_id = Some(options.model_id.clone());
    save_model(&options.model_out, &model)?;

    println!("train rows: {}", train.len());
    println!("test rows: {}", test.len());
    if test.is_empty() {
        println!("no test rows; skipping evaluation");
    } else {
        let scores: Vec<f64> = test
            .x
            .iter()
            .map(|row| model.predict_proba(row).map_err(|err| err.to_string()))
            .collect::<Result<_, _>>()?;
        match roc_auc(&scores, &test.y) {
            Some(auc) => println!("Trained model ROC-AUC: {auc:.3}"),
            None => println!("ROC-AUC undefined: test split has a single class"),
        }
        let cm = ConfusionMatrix::from_scores(&scores, &test.y, CHURN_THRESHOLD);
        println!(
            "accuracy={:.3}  precision={:.3}  recall={:.3}",
            cm.accuracy(),
            cm.precision(),
            cm.recall()
        );
        println!(
            "confusion (rows=true, cols=pred): [[{}, {}], [{}, {}]]",
            cm.true_negative, cm.false_positive, cm.false_negative, cm.true_positive
        );
    }
    println!("Saved model -> {}", options.model_out.display());
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    data_path: PathBuf,
    model_out: PathBuf,
    model_id: String,
    epochs: usize,
    learning_rate: f64,
    l2: f64,
    batch_size: usize,
    seed: u64,
    balance_classes: bool,
    test_fraction: f64,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let defaults = TrainOptions::default();
    let mut data_path: Option<PathBuf> = None;
    let mut model_out = PathBuf::from(churn_scorer::config::DEFAULT_MODEL_PATH);
    let mut model_id = DEFAULT_MODEL_ID.to_string();
    let mut epochs = defaults.epochs;
    let mut learning_rate = defaults.learning_rate;
    let mut l2 = defaults.l2;
    let mut batch_size = defaults.batch_size;
    let mut seed = defaults.seed;
    let mut balance_classes = defaults.balance_classes;
    let mut test_fraction = 0.2f64;

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--balance" => balance_classes = true,
            "--data" | "--out" | "--model-id" | "--epochs" | "--learning-rate" | "--l2"
            | "--batch-size" | "--seed" | "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                match flag {
                    "--data" => data_path = Some(PathBuf::from(value)),
                    "--out" => model_out = PathBuf::from(value),
                    "--model-id" => model_id = value.clone(),
                    "--epochs" => epochs = parse_value(flag, value)?,
                    "--learning-rate" => learning_rate = parse_value(flag, value)?,
                    "--l2" => l2 = parse_value(flag, value)?,
                    "--batch-size" => batch_size = parse_value(flag, value)?,
                    "--seed" => seed = parse_value(flag, value)?,
                    _ => test_fraction = parse_value(flag, value)?,
                }
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    if !(0.0..1.0).contains(&test_fraction) {
        return Err(format!("--test-fraction must be in [0, 1): {test_fraction}"));
    }
    let data_path = data_path.ok_or_else(help_text)?;
    Ok(CliOptions {
        data_path,
        model_out,
        model_id,
        epochs,
        learning_rate,
        l2,
        batch_size,
        seed,
        balance_classes,
        test_fraction,
    })
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "churn-train-logreg",
        "",
        "Trains a logistic regression churn artifact from labelled JSON lines.",
        "",
        "Usage:",
        "  churn-train-logreg --data <file.jsonl> [--out models/model.json] [options]",
        "",
        "Each line holds the raw request fields plus a `churned` label (bool or 0/1).",
        "",
        "Options:",
        "  --data <file>           Labelled JSON lines (required).",
        "  --out <file>            Output artifact path (default: models/model.json).",
        "  --model-id <id>         Identifier stored in the artifact (default: churn_logreg_v1).",
        "  --epochs <n>            Epoch count (default: 100).",
        "  --learning-rate <f64>   Learning rate (default: 0.1).",
        "  --l2 <f64>              L2 regularization (default: 1e-4).",
        "  --batch-size <n>        Batch size (default: 64).",
        "  --seed <u64>            RNG seed for init, shuffling and the split (default: 42).",
        "  --test-fraction <f64>   Stratified hold-out share (default: 0.2).",
        "  --balance               Weight the loss by inverse class frequency.",
    ]
    .join("\n")
}

fn save_model(path: &PathBuf, model: &LogRegModel) -> Result<(), String> {
    model
        .save_json(path)
        .map_err(|err| format!("Failed to write {}: {err}", path.display()))
}
