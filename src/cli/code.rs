//! Code command implementation
//!
//! Generates a one-time code for a credential. By default only the code is
//! written to stdout so the output is machine-parsable.

use super::with_client;
use oathkit_core::error::OathkitError;
use oathkit_core::types::OathCodeInfo;

/// Run the code command
pub fn run_code(id: &str, validity: bool) -> Result<(), OathkitError> {
    let info = with_client(|client| {
        let id = id.to_string();
        async move { client.generate_code_with_validity(&id).await }
    })?;

    println!("{}", info.code());
    if validity {
        println!("{}", describe_validity(&info));
    }
    Ok(())
}

fn describe_validity(info: &OathCodeInfo) -> String {
    match (info.counter, info.valid_until) {
        (Some(counter), _) => format!("counter: {}", counter),
        (None, Some(valid_until)) => {
            let remaining = info.time_remaining(info.generated_at).unwrap_or_default();
            let until = i64::try_from(valid_until)
                .ok()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|utc| utc.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| valid_until.to_string());
            let elapsed = info.progress(info.generated_at).unwrap_or_default() * 100.0;
            format!(
                "valid for {}s (until {}, {:.0}% elapsed)",
                remaining, until, elapsed
            )
        }
        (None, None) => String::new(),
    }
}
