use amiga::AnnotationValue;
use tracing::info;

use crate::cmd::{parse_duration, Context, RecordArgs};
use crate::exit::{amiga_error, check_reply, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, AckOutput};

pub async fn run(args: RecordArgs, ctx: &Context) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let items = args
        .annotations
        .iter()
        .map(|item| parse_annotation(item))
        .collect::<CliResult<Vec<_>>>()?;
    let client = ctx.client();

    let reply = client
        .start_recording(&args.id, &args.topics)
        .await
        .map_err(|err| amiga_error("start recording failed", err))?;
    check_reply("start recording", reply)?;
    info!(id = %args.id, topics = ?args.topics, "recording started");

    tokio::time::sleep(wait).await;
    if !items.is_empty() {
        let reply = client
            .record_annotations(args.context.as_deref(), items)
            .await
            .map_err(|err| amiga_error("annotation failed", err))?;
        check_reply("annotate", reply)?;
        info!("annotations recorded");
        tokio::time::sleep(wait).await;
    }

    let reply = client
        .stop_recording(&args.id)
        .await
        .map_err(|err| amiga_error("stop recording failed", err))?;
    check_reply("stop recording", reply)?;

    print_record(
        &AckOutput {
            command: "record",
            target: args.id,
            ok: true,
        },
        ctx.format,
    );
    client.close().await;
    Ok(SUCCESS)
}

/// `KEY=VALUE`, where VALUE is JSON or else taken as text.
fn parse_annotation(item: &str) -> CliResult<(String, AnnotationValue)> {
    let (key, raw) = item
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("annotation must be KEY=VALUE: {item}")))?;
    if key.is_empty() {
        return Err(CliError::new(USAGE, format!("annotation key is empty: {item}")));
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => AnnotationValue::try_from(json)
            .map_err(|err| CliError::new(USAGE, format!("annotation {key}: {err}")))?,
        Err(_) => AnnotationValue::from(raw),
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_parse_json_or_text() {
        let (key, value) = parse_annotation("temperature=23.5").expect("float");
        assert_eq!(key, "temperature");
        assert_eq!(value, AnnotationValue::Float(23.5));

        let (_, value) = parse_annotation("status=running").expect("text");
        assert_eq!(value, AnnotationValue::Text("running".into()));

        let (_, value) = parse_annotation("is_active=true").expect("flag");
        assert_eq!(value, AnnotationValue::Flag(true));

        assert!(parse_annotation("novalue").is_err());
        assert!(parse_annotation("=3").is_err());
    }
}
