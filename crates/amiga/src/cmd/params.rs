use amiga::{create_parameter, ParameterValue};
use tracing::info;

use crate::cmd::{Context, ParamsAction, ParamsArgs};
use crate::exit::{amiga_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, print_records, AckOutput, ParamOutput};

pub async fn run(args: ParamsArgs, ctx: &Context) -> CliResult<i32> {
    let client = ctx.client();
    let nodo = client.nodo();
    let result = match args.action {
        ParamsAction::List => nodo.get_all_parameters().await.map(|params| {
            let rows: Vec<ParamOutput> = params.iter().map(ParamOutput::from_param).collect();
            print_records(&rows, ctx.format);
        }),
        ParamsAction::Set { node, param, value } => {
            let value = parse_value(&value)?;
            info!(node = %node, param = %param, value = %value, "setting parameter");
            let target = format!("{node}.{param}");
            nodo.update_parameters(vec![create_parameter(&node, &param, value)])
                .await
                .map(|()| {
                    print_record(
                        &AckOutput {
                            command: "params-set",
                            target,
                            ok: true,
                        },
                        ctx.format,
                    )
                })
        }
    };
    client.close().await;
    result.map_err(|err| amiga_error("parameter request failed", err))?;
    Ok(SUCCESS)
}

/// JSON first; anything that is not JSON is sent as text.
fn parse_value(raw: &str) -> CliResult<ParameterValue> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => ParameterValue::try_from(json)
            .map_err(|err| CliError::new(USAGE, format!("invalid parameter value: {err}"))),
        Err(_) => Ok(ParameterValue::from(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_as_json_then_text() {
        assert_eq!(parse_value("true").expect("bool"), ParameterValue::Bool(true));
        assert_eq!(parse_value("-3").expect("int"), ParameterValue::Int(-3));
        assert_eq!(
            parse_value("[0.1, 0.2, 0.3]").expect("list"),
            ParameterValue::FloatVec(vec![0.1, 0.2, 0.3])
        );
        assert_eq!(
            parse_value("rtk2go.com").expect("text"),
            ParameterValue::Text("rtk2go.com".into())
        );
        assert_eq!(parse_value("{\"a\": 1}").expect_err("object").code, USAGE);
    }
}
