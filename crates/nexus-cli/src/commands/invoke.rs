//! `nexus invoke` command.

use crate::commands::client;
use crate::render;
use crate::Cli;
use anyhow::Context;
use clap::Args;
use serde_json::{Map, Value};

#[derive(Args)]
pub struct InvokeArgs {
    /// Workflow name
    pub workflow: String,

    /// Workflow input as key=value (repeatable; values parse as JSON when
    /// possible, otherwise as strings)
    #[arg(short, long = "input")]
    pub inputs: Vec<String>,

    /// Workflow inputs as a JSON object (merged over --input values)
    #[arg(long)]
    pub json: Option<String>,

    /// Pin a specific workflow version
    #[arg(long)]
    pub version: Option<String>,
}

pub async fn run(cli: &Cli, args: &InvokeArgs) -> anyhow::Result<()> {
    let mut options = Map::new();
    options.insert("workflow".to_string(), Value::String(args.workflow.clone()));
    if let Some(version) = &args.version {
        options.insert("version".to_string(), Value::String(version.clone()));
    }

    for pair in &args.inputs {
        let (key, value) = parse_input(pair)?;
        options.insert(key, value);
    }
    if let Some(json) = &args.json {
        let parsed: Value = serde_json::from_str(json).context("--json is not valid JSON")?;
        let map = parsed
            .as_object()
            .context("--json must be a JSON object")?;
        for (key, value) in map {
            options.insert(key.clone(), value.clone());
        }
    }

    let data = client(cli).command("invoke", Value::Object(options)).await?;
    render::render(&data, cli.output);
    Ok(())
}

/// Split `key=value`, parsing the value as JSON when it looks like JSON.
fn parse_input(pair: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .with_context(|| format!("input '{pair}' is not key=value"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_json_values() {
        assert_eq!(parse_input("count=3").unwrap().1, Value::from(3));
        assert_eq!(parse_input("flag=true").unwrap().1, Value::from(true));
        assert_eq!(
            parse_input("message=hi").unwrap().1,
            Value::String("hi".to_string())
        );
        assert_eq!(
            parse_input("list=[1,2]").unwrap().1,
            serde_json::json!([1, 2])
        );
    }

    #[test]
    fn test_parse_input_requires_equals() {
        assert!(parse_input("no-equals").is_err());
    }

    #[test]
    fn test_parse_input_keeps_value_equals() {
        let (key, value) = parse_input("note=a=b").unwrap();
        assert_eq!(key, "note");
        assert_eq!(value, Value::String("a=b".to_string()));
    }
}
