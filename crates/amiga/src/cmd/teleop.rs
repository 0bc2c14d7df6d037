use amiga::teleop::{TeleopCommand, TeleopDriver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cmd::{parse_duration, Context, TeleopArgs};
use crate::exit::{amiga_error, check_reply, io_error, CliResult, SUCCESS};

pub async fn run(args: TeleopArgs, ctx: &Context) -> CliResult<i32> {
    let period = parse_duration(&args.period)?;
    let driver = TeleopDriver::with_period(ctx.client(), period);

    let result = drive(&driver).await;

    match driver.shutdown().await {
        Ok(reply) => check_reply("deactivate teleop", reply)?,
        Err(err) => warn!(error = %err, "deactivate teleop failed"),
    }
    info!("teleop deactivated");
    result.map(|_| SUCCESS)
}

async fn drive(driver: &TeleopDriver) -> CliResult<()> {
    let reply = driver
        .activate()
        .await
        .map_err(|err| amiga_error("activate teleop failed", err))?;
    check_reply("activate teleop", reply)?;
    info!("teleop activated; w/a/s/d to adjust, 'stop' to zero, 'exit' to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|err| io_error("reading stdin failed", err))?,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let command = match line.trim() {
            "exit" => return Ok(()),
            "stop" => TeleopCommand::default(),
            key => driver.command().adjust(key),
        };
        driver.update_command(command);
        info!(h_axis = command.h_axis, v_axis = command.v_axis, "command updated");
    }
}
