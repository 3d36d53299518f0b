use challenger_core::{CatalogSnapshot, WireRule};
use schemars::schema_for;

fn main() {
    let rule = schema_for!(WireRule);
    let catalog = schema_for!(CatalogSnapshot);
    let json = serde_json::json!({ "rule": rule, "catalog": catalog });
    let json = serde_json::to_string_pretty(&json).expect("serialize json schema");
    println!("{json}");
}
