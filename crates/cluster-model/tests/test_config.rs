use cluster_model::core::config::ClusterConfig;
use cluster_model::core::error::Error;

const BASE: &str = r#"
estimation_buffer: 0.2
storage_buffer: 0.25
vm_os_storage_gb: 40
vm_os_storage_group: 'VM OS'
usage:
  users:
    model: date_range_value
    ranges:
      - ['2018-01', '2019-01', 5000]
"#;

fn with_service(service_yaml: &str) -> Result<ClusterConfig, Error> {
    ClusterConfig::from_yaml(&format!("{}services:\n{}", BASE, service_yaml))
}

#[test]
fn test_full_config_parses() {
    let config = ClusterConfig::from_yaml(
        r#"
estimation_buffer: 0.2
estimation_growth_factor: 0.01
storage_buffer: 0.25
storage_display_unit: TB
summary_dates: ['2019-06', '2018-12']
sets_summary_date: '2019-06'
vm_os_storage_gb: 40
vm_os_storage_group: 'VM OS'
usage:
  users:
    model: date_range_value
    ranges:
      - ['2018-01', '2019-06', 5000]
  forms:
    model: derived_factor
    dependent_field: users
    factor: 50
  forms_total:
    model: cumulative
    dependent_field: forms
services:
  app:
    usage_capacity_per_node: 500
    storage:
      group: 'SSD'
      data_models:
        - referenced_field: forms_total
          unit_size: '10KB'
    process:
      cores_per_node: 4
      ram_per_node: 16
sets:
  load:
    - name: low
      user_growth: 1000
    - name: high
      user_growth: 5000
"#,
    )
    .unwrap();

    assert_eq!(config.services.len(), 1);
    assert_eq!(config.usage.len(), 3);
    // summary dates come back sorted
    let months = config.summary_months().unwrap();
    assert!(months[0] < months[1]);
    assert_eq!(config.sets["load"][0].values["user_growth"], 1000.0);
}

#[test]
fn test_sizing_strategies_are_mutually_exclusive() {
    let result = with_service(
        r#"
  app:
    static_number: 2
    usage_capacity_per_node: 100
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));

    let neither = with_service(
        r#"
  app:
    min_nodes: 2
"#,
    );
    assert!(matches!(neither, Err(Error::Config(_))));
}

#[test]
fn test_sub_process_needs_exactly_one_of_static_and_capacity() {
    let result = with_service(
        r#"
  app:
    process:
      cores_per_node: 4
      ram_per_node: 16
      cores_per_sub_process: 1
      ram_per_sub_process: 2
      sub_processes:
        - name: web
          static_number: 2
          capacity: 500
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_sub_processes_require_per_process_sizing() {
    let result = with_service(
        r#"
  app:
    process:
      cores_per_node: 4
      ram_per_node: 16
      sub_processes:
        - name: web
          capacity: 500
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_storage_ceiling_conflicts_with_node_scaled_storage() {
    let result = with_service(
        r#"
  db:
    static_number: 1
    storage_scales_with_nodes: true
    max_storage_per_node: '1TB'
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_unit_size_fails_at_load() {
    let result = with_service(
        r#"
  db:
    static_number: 1
    storage:
      data_models:
        - referenced_field: users
          unit_size: 'ten gigabytes'
"#,
    );
    assert!(matches!(result, Err(Error::MalformedSize(_))));
}

#[test]
fn test_ram_model_needs_usable_ram() {
    let result = with_service(
        r#"
  cache:
    static_number: 1
    process:
      ram_per_node: 8
      ram_static_baseline: 8
      ram_model:
        - referenced_field: users
          unit_size: '1MB'
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_usage_models_are_required() {
    let result = ClusterConfig::from_yaml(
        r#"
estimation_buffer: 0.2
storage_buffer: 0.25
vm_os_storage_gb: 40
vm_os_storage_group: 'VM OS'
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_negative_buffer_rejected() {
    let result = ClusterConfig::from_yaml(
        r#"
estimation_buffer: -0.2
storage_buffer: 0.25
vm_os_storage_gb: 40
vm_os_storage_group: 'VM OS'
usage:
  users:
    model: date_range_value
    ranges:
      - ['2018-01', '2019-01', 5000]
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_bad_summary_date_rejected() {
    let result = ClusterConfig::from_yaml(&format!("{}summary_dates: ['June 2019']\n", BASE));
    assert!(matches!(result, Err(Error::Config(_))));
}
