//! Pokes a locally running server: `cargo run -- --simulate-sensor` in another terminal.

use remote_lab_api::api::{ExecuteResponse, TemperatureResponse};
use serde_json::{json, Value};

const URL: &str = "http://localhost:8080";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let hc = httpc_test::new_client(URL)?;

    hc.do_get("/health").await?.print().await?;

    let response = hc.do_post("/execute_computational", fibonacci()).await?;
    response.print().await?;
    match response.json_body_as::<ExecuteResponse>()? {
        ExecuteResponse::Completed {
            output,
            execution_time,
        } => println!("fib(25) = {output} in {execution_time}"),
        ExecuteResponse::Failure { error } => println!("failed: {error}"),
    }

    let response = hc.do_get("/get_temperature").await?;
    if let TemperatureResponse::Reading { temperature } = response.json_body_as()? {
        println!("Temperature: {temperature}");
    }

    Ok(())
}

fn fibonacci() -> Value {
    json!({
        "code": "f = lambda n: n if n < 2 else f(n - 1) + f(n - 2)\nprint(f(25))",
    })
}
