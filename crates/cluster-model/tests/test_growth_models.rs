use chrono::NaiveDate;
use indexmap::IndexMap;

use cluster_model::core::config::GrowthModelConfig;
use cluster_model::core::error::Error;
use cluster_model::core::growth_model::GrowthModel;
use cluster_model::core::series::Series;
use cluster_model::core::usage::{resolve_usage, UsageTable};

fn month(year: i32, month_number: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month_number, 1).unwrap()
}

fn model(name: &str, yaml: &str) -> GrowthModel {
    let config: GrowthModelConfig = serde_yaml::from_str(yaml).unwrap();
    GrowthModel::from_config(name, &config, &IndexMap::new()).unwrap()
}

fn values(series: &Series) -> Vec<f64> {
    series.values().collect()
}

// 100 users in the first two months, 200 in the next two.
fn user_model() -> GrowthModel {
    model(
        "users",
        r#"
model: date_range_value
ranges:
  - ['2017-01', '2017-02', 100]
  - ['2017-03', '2017-04', 200]
"#,
    )
}

fn user_data() -> UsageTable {
    resolve_usage(vec![user_model()]).unwrap()
}

#[test]
fn test_date_range_value() {
    let table = user_data();
    assert_eq!(
        table.months(),
        vec![month(2017, 1), month(2017, 2), month(2017, 3), month(2017, 4)]
    );
    assert_eq!(values(table.series("users").unwrap()), vec![100.0, 100.0, 200.0, 200.0]);
}

#[test]
fn test_date_value() {
    let table = resolve_usage(vec![model(
        "signups",
        r#"
model: date_value
values:
  - ['20180101', 10]
  - ['20180201', 20]
  - ['20180301', 30]
"#,
    )])
    .unwrap();
    assert_eq!(values(table.series("signups").unwrap()), vec![10.0, 20.0, 30.0]);
}

#[test]
fn test_overlapping_ranges_rejected() {
    let overlapping = model(
        "users",
        r#"
model: date_range_value
ranges:
  - ['2017-01', '2017-03', 100]
  - ['2017-03', '2017-04', 200]
"#,
    );
    assert!(overlapping.produce(&UsageTable::new()).is_err());
}

#[test]
fn test_can_run() {
    let forms = model(
        "forms",
        r#"
model: derived_factor
dependent_field: users
factor: 1
"#,
    );
    assert!(!forms.can_run(&UsageTable::new()));
    assert!(forms.can_run(&user_data()));
}

// Cumulative of [100, 100, 200, 200] is [100, 200, 400, 600].
#[test]
fn test_cumulative() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "total",
            r#"
model: cumulative
dependent_field: users
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("total").unwrap()), vec![100.0, 200.0, 400.0, 600.0]);
}

// start_with is added to the first row before summing.
#[test]
fn test_cumulative_start_with() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "total",
            r#"
model: cumulative
dependent_field: users
start_with: 50
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("total").unwrap()), vec![150.0, 250.0, 450.0, 650.0]);
}

// With a lifespan of 2 months each value loses the cumulative total from two
// periods back: [100, 200, 400 - 100, 600 - 200].
#[test]
fn test_cumulative_limited_lifespan() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "total_live",
            r#"
model: cumulative_limited_lifespan
dependent_field: users
lifespan: 2
"#,
        ),
    ])
    .unwrap();
    assert_eq!(
        values(table.series("total_live").unwrap()),
        vec![100.0, 200.0, 300.0, 400.0]
    );
}

// users + 5x users = 6x users.
#[test]
fn test_derived_sum() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "forms",
            r#"
model: derived_factor
dependent_field: users
factor: 5
"#,
        ),
        model(
            "sum",
            r#"
model: derived_sum
dependent_fields: [users, forms]
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("forms").unwrap()), vec![500.0, 500.0, 1000.0, 1000.0]);
    assert_eq!(values(table.series("sum").unwrap()), vec![600.0, 600.0, 1200.0, 1200.0]);
}

#[test]
fn test_derived_factor() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "2x",
            r#"
model: derived_factor
dependent_field: users
factor: 2
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("2x").unwrap()), vec![200.0, 200.0, 400.0, 400.0]);
}

// The baseline is added to the first row before the factor is applied:
// (100 + 10) * 2 = 220 in the first month.
#[test]
fn test_derived_factor_start_with() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "cases",
            r#"
model: derived_factor
dependent_field: users
factor: 2
start_with: 10
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("cases").unwrap()), vec![220.0, 200.0, 400.0, 400.0]);
}

// Growth input is users * 0.5 = [50, 50, 100, 100]; its cumulative with
// start_with 10 is [60, 110, 210, 310]. Adding users * 2 on top gives
// [260, 310, 610, 710].
#[test]
fn test_baseline_with_growth() {
    let table = resolve_usage(vec![
        user_model(),
        model(
            "items",
            r#"
model: baseline_with_growth
dependent_field: users
baseline_factor: 2
monthly_growth_factor: 0.5
start_with: 10
"#,
        ),
    ])
    .unwrap();
    assert_eq!(values(table.series("items").unwrap()), vec![260.0, 310.0, 610.0, 710.0]);
}

// Derived output is aligned exactly to the table's month axis.
#[test]
fn test_output_matches_table_index() {
    let table = user_data();
    let forms = model(
        "forms",
        r#"
model: derived_factor
dependent_field: users
factor: 3
"#,
    );
    let series = forms.produce(&table).unwrap();
    assert_eq!(series.len(), table.months().len());
    assert_eq!(series.months().collect::<Vec<_>>(), table.months());
}

// Scalar parameters may be written as "{placeholder}" and are filled from
// the scenario-set context when the model is constructed.
#[test]
fn test_placeholder_parameter() {
    let config: GrowthModelConfig = serde_yaml::from_str(
        r#"
model: derived_factor
dependent_field: users
factor: '{forms_per_user}'
"#,
    )
    .unwrap();

    let mut context = IndexMap::new();
    context.insert("forms_per_user".to_string(), 3.0);
    let forms = GrowthModel::from_config("forms", &config, &context).unwrap();
    let table = user_data();
    assert_eq!(values(&forms.produce(&table).unwrap()), vec![300.0, 300.0, 600.0, 600.0]);

    let missing = GrowthModel::from_config("forms", &config, &IndexMap::new());
    assert!(matches!(missing, Err(Error::UnknownPlaceholder(key)) if key == "forms_per_user"));
}
