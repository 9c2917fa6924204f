// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::env;
use std::time::Duration;
use tokio::time::Instant;

use streamwood::config::{load_and_validate_definition, Parameters};
use streamwood::engine::{response_channel, FrameResponse, Pipeline, StreamOptions};
use streamwood::errors::PipelineError;
use streamwood::traits::Swag;

const DEFAULT_WAIT_SECS: f64 = 2.0;

/// Command line options for one demo run
#[derive(Debug)]
struct RunOptions {
    definition: String,
    graph_path: Option<String>,
    stream_id: String,
    parameters: Parameters,
    frame_data: Option<Swag>,
    wait: Duration,
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} <definition> [--graph-path P] [--stream-id S] [-p key value]... [-fd key=value,...] [--wait secs]",
        program
    );
    eprintln!("Example: {} demos/pipeline_increment.yaml -fd a=0", program);
    eprintln!("Example: {} demos/pipeline_random.yaml -p limit 5 --wait 3", program);
}

/// JSON when the text parses as JSON, otherwise the text itself
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_frame_data(text: &str) -> Result<Swag> {
    text.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("frame data '{}' is not key=value", pair))?;
            Ok((key.trim().to_string(), parse_value(value.trim())))
        })
        .collect()
}

fn parse_args(args: &[String]) -> Result<RunOptions> {
    let mut definition = None;
    let mut options = RunOptions {
        definition: String::new(),
        graph_path: None,
        stream_id: "1".to_string(),
        parameters: Parameters::new(),
        frame_data: None,
        wait: Duration::from_secs_f64(DEFAULT_WAIT_SECS),
    };

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .cloned()
                .with_context(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--graph-path" => options.graph_path = Some(value("--graph-path")?),
            "--stream-id" => options.stream_id = value("--stream-id")?,
            "-p" | "--parameter" => {
                let key = value("-p")?;
                let parameter = value("-p")?;
                options.parameters.insert(key, parse_value(&parameter));
            }
            "-fd" | "--frame-data" => {
                options.frame_data = Some(parse_frame_data(&value("-fd")?)?);
            }
            "--wait" => {
                let seconds: f64 = value("--wait")?.parse().context("--wait takes seconds")?;
                options.wait = Duration::try_from_secs_f64(seconds)
                    .context("--wait must be a non-negative number of seconds")?;
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            path if definition.is_none() => definition = Some(path.to_string()),
            extra => bail!("unexpected argument '{}'", extra),
        }
    }

    options.definition = definition.context("missing pipeline definition")?;
    Ok(options)
}

fn print_response(response: &FrameResponse) {
    let swag = serde_json::to_string(&response.swag).unwrap_or_else(|_| "{}".to_string());
    println!(
        "stream {} frame {} [{}] {:?}: {}",
        response.stream_id, response.frame_id, response.graph_path, response.event, swag
    );
}

async fn run(options: RunOptions) -> Result<()> {
    let definition = load_and_validate_definition(&options.definition)?;
    let pipeline = Pipeline::new(definition, Parameters::new())?;
    pipeline.start();

    let mut stream_options = StreamOptions::new().parameters(options.parameters);
    if let Some(graph_path) = &options.graph_path {
        stream_options = stream_options.graph_path(graph_path.clone());
    }

    let (sink, receiver) = response_channel();
    pipeline
        .create_stream(options.stream_id.clone(), stream_options, sink)
        .await?;
    if let Some(frame_data) = options.frame_data {
        pipeline.create_frame(&options.stream_id, frame_data, options.graph_path.as_deref())?;
    }

    let deadline = Instant::now() + options.wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining).await {
            Ok(response) => print_response(&response),
            Err(PipelineError::ResponseTimeout(_)) => break,
            Err(error) => return Err(error.into()),
        }
    }

    pipeline.destroy_stream(&options.stream_id).await;
    for response in receiver.drain().await {
        print_response(&response);
    }
    pipeline.terminate().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("streamwood");

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            usage(program);
            std::process::exit(1);
        }
    };

    if let Err(error) = run(options).await {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}
