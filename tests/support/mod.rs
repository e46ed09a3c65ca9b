pub mod churn_env;
