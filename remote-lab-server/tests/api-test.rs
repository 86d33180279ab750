//! Tests which start the binary and call the api.
//!
//! The code execution tests need a `python3` on the path.

use std::time::Duration;

use httpc_test::Client;
use remote_lab_api::api::{ExecuteResponse, TemperatureResponse, SENSOR_FAILURE};
use serde_json::{json, Value};
use tokio::process::Child;

/// Starts the remote lab binary and returns a child to abort it and a client to interact with it.
async fn spawn_server(extra_args: &[&str]) -> anyhow::Result<(Child, Client)> {
    // IANA recommended port range.
    let port = fastrand::u16(49152..65535);
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_remote-lab-server"))
        .kill_on_drop(true)
        .args(["--host", "127.0.0.1"])
        .args(["--port", &port.to_string()])
        .args(extra_args)
        .spawn()
        .expect("Couldn't spawn server");
    let hc = httpc_test::new_client(format!("http://localhost:{port}"))?;

    for _ in 0..100 {
        if hc.do_get("/health").await.is_ok() {
            return Ok((child, hc));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("server didn't come up on port {port}")
}

async fn execute(hc: &Client, body: Value) -> anyhow::Result<Value> {
    let response = hc.do_post("/execute_computational", body).await?;
    response.print().await?;
    assert_eq!(response.status(), 200);
    Ok(response.json_body()?)
}

/// `"<secs>.<5 digits> seconds"` parsed back into seconds.
fn parse_execution_time(execution_time: &str) -> f64 {
    let seconds = execution_time
        .strip_suffix(" seconds")
        .expect("should end with ' seconds'");
    let (_, decimals) = seconds.split_once('.').expect("should have decimals");
    assert_eq!(decimals.len(), 5, "{execution_time}");
    seconds.parse().expect("should be a number")
}

#[tokio::test(flavor = "current_thread")]
async fn pages() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    for (path, title) in [
        ("/", "Remote Lab"),
        ("/computational_lab", "Computational Power Lab"),
        ("/temperature_lab", "Temperature Remote Sensing Lab"),
    ] {
        let response = hc.do_get(path).await?;
        assert_eq!(response.status(), 200);
        assert!(response
            .header("content-type")
            .expect("should have a content type")
            .starts_with("text/html"));
        let body = response.text_body()?;
        assert!(body.contains(&format!("<title>{title}</title>")), "{path}");
    }

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn python_print() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let body = execute(&hc, json!({ "code": "print(6 * 7)" })).await?;
    assert!(body.get("error").is_none());
    assert_eq!(body["output"], "42");
    let seconds = parse_execution_time(body["execution_time"].as_str().unwrap());
    assert!(seconds >= 0.0);

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn python_combined_output() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let code = "import sys\nprint('to stdout', flush=True)\nprint('to stderr', file=sys.stderr)";
    let body = execute(&hc, json!({ "code": code })).await?;
    let ExecuteResponse::Completed { output, .. } =
        serde_json::from_value::<ExecuteResponse>(body)?
    else {
        panic!("should have completed");
    };
    assert_eq!(output, "to stdout\nto stderr");

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn python_sleep_is_timed() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let body = execute(&hc, json!({ "code": "import time; time.sleep(0.3)" })).await?;
    assert_eq!(body["output"], "");
    let seconds = parse_execution_time(body["execution_time"].as_str().unwrap());
    assert!(seconds >= 0.3, "{seconds}");

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn python_exception() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let body = execute(&hc, json!({ "code": "raise ValueError('nope')" })).await?;
    assert!(body.get("output").is_none());
    assert!(body.get("execution_time").is_none());
    let error = body["error"].as_str().expect("should be an error");
    assert!(error.contains("ValueError: nope"), "{error}");

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn missing_code_field() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let body = execute(&hc, json!({ "source": "print(1)" })).await?;
    assert!(body.get("output").is_none());
    assert!(body["error"].is_string());

    // And the server is still there.
    let body = execute(&hc, json!({ "code": "print(1)" })).await?;
    assert_eq!(body["output"], "1");

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn body_is_not_json() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let response = hc.do_post("/execute_computational", "print(1)").await?;
    assert_eq!(response.status(), 200);
    let body: ExecuteResponse = response.json_body_as()?;
    assert!(matches!(body, ExecuteResponse::Failure { .. }));

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn missing_interpreter() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&["--python-path", "/no/such/python"]).await?;

    let body = execute(&hc, json!({ "code": "print(1)" })).await?;
    let error = body["error"].as_str().expect("should be an error");
    assert!(error.contains("/no/such/python"), "{error}");

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn timeout_stops_endless_code() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&["--timeout", "1"]).await?;

    let body = execute(&hc, json!({ "code": "while True: pass" })).await?;
    assert_eq!(body, json!({ "error": "execution timed out after 1 seconds" }));

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn timeout_covers_background_children() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&["--timeout", "1"]).await?;

    let code = "import subprocess\nsubprocess.Popen(['sleep', '4'])\nprint('started')";
    let start = std::time::Instant::now();
    let body = execute(&hc, json!({ "code": code })).await?;
    assert_eq!(body, json!({ "error": "execution timed out after 1 seconds" }));
    assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn temperature_has_exactly_one_shape() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&[]).await?;

    let response = hc.do_get("/get_temperature").await?;
    response.print().await?;
    assert_eq!(response.status(), 200);
    let body = response.json_body()?;
    let keys: Vec<_> = body.as_object().expect("is an object").keys().collect();
    assert_eq!(keys.len(), 1, "{body}");
    match serde_json::from_value::<TemperatureResponse>(body)? {
        TemperatureResponse::Reading { temperature } => {
            assert!(temperature.contains("°C, Humidity: "));
            assert!(temperature.ends_with('%'));
        }
        TemperatureResponse::Failure { error } => assert_eq!(error, SENSOR_FAILURE),
    }

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn simulated_temperature() -> anyhow::Result<()> {
    let (mut child, hc) = spawn_server(&["--simulate-sensor"]).await?;

    let response = hc.do_get("/get_temperature").await?;
    let body = response.json_body()?;
    assert_eq!(body, json!({ "temperature": "22.0°C, Humidity: 45.0%" }));

    child.kill().await.expect("Couldn't kill server");
    Ok(())
}
