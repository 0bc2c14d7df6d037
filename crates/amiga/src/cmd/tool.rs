use amiga::request::tool_type_for_id;
use tracing::info;

use crate::cmd::{Context, ToolAction, ToolArgs};
use crate::exit::{amiga_error, check_reply, CliResult, SUCCESS};
use crate::output::{print_record, AckOutput};

pub async fn run(args: ToolArgs, ctx: &Context) -> CliResult<i32> {
    let client = ctx.client();
    let (command, target, reply) = match args.action {
        ToolAction::Activate {
            id,
            tool_type,
            setpoint,
        } => {
            info!(id, tool_type = %tool_type, setpoint, "activating tool");
            let reply = client.activate_tool(id, tool_type, setpoint).await;
            ("tool-activate", format!("{tool_type}:{id}"), reply)
        }
        ToolAction::Deactivate { id, tool_type } => {
            info!(id, tool_type = %tool_type, "deactivating tool");
            let reply = client.deactivate_tool(id, tool_type).await;
            ("tool-deactivate", format!("{tool_type}:{id}"), reply)
        }
        ToolAction::StopAll { ids } => {
            let known: Vec<String> = ids
                .iter()
                .filter_map(|id| tool_type_for_id(*id).map(|t| format!("{t}:{id}")))
                .collect();
            info!(tools = ?known, "stopping tools");
            let reply = client.stop_all_tools(&ids).await;
            ("tool-stop-all", known.join(","), reply)
        }
    };
    client.close().await;

    let reply = reply.map_err(|err| amiga_error(&format!("{command} failed"), err))?;
    check_reply(command, reply)?;
    print_record(
        &AckOutput {
            command,
            target,
            ok: true,
        },
        ctx.format,
    );
    Ok(SUCCESS)
}
