mod support;

use std::sync::Arc;

use churn_scorer::config;
use churn_scorer::features::normalize;
use churn_scorer::gateway::{Gateway, Method};
use churn_scorer::ml::dataset::parse_labelled_jsonl;
use churn_scorer::ml::logreg::{LogRegModel, TrainDataset, TrainOptions, train_logreg};
use churn_scorer::server::{ModelServer, ReadinessState};
use serde_json::{Value, json};
use support::churn_env::ChurnEnvGuard;
use tempfile::TempDir;

fn labelled_jsonl(rows: usize) -> String {
    let contracts = ["month-to-month", "One Year", "two_year"];
    let services = ["fiber", "dsl", "none"];
    let payments = ["electronic check", "mailed_check", "credit card", "bank transfer"];
    (0..rows)
        .map(|i| {
            let contract = contracts[i % contracts.len()];
            let tenure = (i * 7) % 72;
            let churned = contract == "month-to-month" && tenure < 36;
            json!({
                "tenure_months": tenure,
                "monthly_charges": 25.0 + (i % 80) as f64,
                "total_charges": (tenure as f64) * 50.0,
                "contract_type": contract,
                "internet_service": services[i % services.len()],
                "payment_method": payments[i % payments.len()],
                "paperless_billing": i % 2 == 0,
                "churned": u8::from(churned),
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn train_model() -> LogRegModel {
    let labelled = parse_labelled_jsonl(&labelled_jsonl(240)).expect("parse training data");
    let records = normalize(&labelled.records);
    let dataset = TrainDataset::from_records(&records, &labelled.labels).expect("dataset");
    let options = TrainOptions {
        epochs: 200,
        ..TrainOptions::default()
    };
    train_logreg(&dataset, &options).expect("train")
}

fn request(tenure: i64, contract: &str) -> Vec<u8> {
    json!({
        "tenure_months": tenure,
        "monthly_charges": 70.5,
        "total_charges": 850.0,
        "contract_type": contract,
        "internet_service": "fiber",
        "payment_method": "electronic_check",
        "paperless_billing": true,
    })
    .to_string()
    .into_bytes()
}

fn probability(body: &Value) -> f64 {
    body["churn_probability"].as_f64().expect("probability")
}

#[test]
fn serves_once_a_trained_artifact_is_deployed() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("models").join("model.json");
    let gateway = Gateway::new(Arc::new(ModelServer::new(&model_path)));

    let health = gateway.handle(Method::Get, "/health", b"");
    assert_eq!(health.body["model"], json!("NOT_LOADED"));
    let response = gateway.handle(Method::Post, "/predict", &request(3, "month-to-month"));
    assert_eq!(response.status, 503);
    assert_eq!(
        response.body["detail"],
        json!(format!(
            "Model file not found at {}. Train first.",
            model_path.display()
        ))
    );

    train_model().save_json(&model_path).unwrap();

    let response = gateway.handle(Method::Post, "/predict", &request(3, "month-to-month"));
    assert_eq!(response.status, 200);
    let p = probability(&response.body);
    assert!((0.0..=1.0).contains(&p));
    assert_eq!(response.body["will_churn"], json!(p >= 0.5));
    assert_eq!(response.body["version"], json!("v1"));
    assert_eq!(gateway.server().readiness(), ReadinessState::Loaded);
}

#[test]
fn trained_model_ranks_short_monthly_accounts_as_riskier() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("model.json");
    train_model().save_json(&model_path).unwrap();
    let gateway = Gateway::new(Arc::new(ModelServer::new(&model_path)));

    let risky = gateway.handle(Method::Post, "/predict", &request(2, "Month-to-Month"));
    let loyal = gateway.handle(Method::Post, "/predict", &request(60, "two year"));
    assert_eq!(risky.status, 200);
    assert_eq!(loyal.status, 200);
    assert!(probability(&risky.body) > probability(&loyal.body));
    assert_eq!(risky.body["will_churn"], json!(true));
    assert_eq!(loyal.body["will_churn"], json!(false));
}

#[test]
fn concurrent_requests_share_one_loaded_model() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("model.json");
    train_model().save_json(&model_path).unwrap();
    let gateway = Gateway::new(Arc::new(ModelServer::new(&model_path)));

    let statuses: Vec<u16> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gateway = &gateway;
                scope.spawn(move || {
                    gateway
                        .handle(Method::Post, "/predict", &request(i * 5, "one_year"))
                        .status
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(statuses.iter().all(|&status| status == 200));
    assert_eq!(gateway.server().readiness(), ReadinessState::Loaded);
}

#[test]
fn unknown_categories_still_score() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("model.json");
    LogRegModel::neutral().save_json(&model_path).unwrap();
    let gateway = Gateway::new(Arc::new(ModelServer::new(&model_path)));

    let response = gateway.handle(Method::Post, "/predict", &request(10, "weekly"));
    assert_eq!(response.status, 200);
    assert_eq!(probability(&response.body), 0.5);
    assert_eq!(response.body["will_churn"], json!(true));
}

#[test]
fn env_model_path_overrides_config_file() {
    let temp = TempDir::new().unwrap();
    let config_home = temp.path().join("config");
    let env_model = temp.path().join("env-model.json");
    let _env = ChurnEnvGuard::set(config_home.clone(), Some(env_model.clone()));

    let file_config = config::ServeConfig {
        model_path: temp.path().join("file-model.json"),
        ..config::ServeConfig::default()
    };
    config::save_to_path(&file_config, &config::config_path().unwrap()).unwrap();
    assert!(config_home.join(".churn_scorer").join("config.toml").is_file());

    let loaded = config::load_or_default().unwrap();
    assert_eq!(loaded.model_path, env_model);
    assert_eq!(loaded.logging, file_config.logging);
}

#[test]
fn config_file_supplies_model_path_without_env() {
    let temp = TempDir::new().unwrap();
    let _env = ChurnEnvGuard::set(temp.path().to_path_buf(), None);
    let path = config::config_path().unwrap();
    std::fs::write(
        &path,
        "model_path = \"artifacts/churn.json\"\n\n[logging]\nlevel = \"debug\"\nfile = false\n",
    )
    .unwrap();

    let loaded = config::load_or_default().unwrap();
    assert_eq!(loaded.model_path, std::path::PathBuf::from("artifacts/churn.json"));
    assert_eq!(loaded.logging.level, "debug");
    assert!(!loaded.logging.file);
}
