use amiga::proto::nexus::Reply;
use amiga::{Amiga, AmigaError};
use tracing::info;

use crate::cmd::{CircleTrackArgs, Context, FollowTrackArgs, SquareTrackArgs};
use crate::exit::{amiga_error, check_reply, CliResult, SUCCESS};
use crate::output::{print_record, AckOutput};

pub async fn square_track(args: SquareTrackArgs, ctx: &Context) -> CliResult<i32> {
    info!(direction = %args.direction, "requesting square track");
    let client = ctx.client();
    let reply = client.square_track(args.direction).await;
    finish("square-track", args.direction.to_string(), client, reply, ctx).await
}

pub async fn circle_track(args: CircleTrackArgs, ctx: &Context) -> CliResult<i32> {
    info!(
        radius = args.radius,
        arc_angle = args.arc_angle,
        direction = %args.direction,
        "requesting circle track"
    );
    let client = ctx.client();
    let reply = client
        .circle_track(args.radius, args.arc_angle, args.direction)
        .await;
    finish("circle-track", args.direction.to_string(), client, reply, ctx).await
}

pub async fn follow_track(args: FollowTrackArgs, ctx: &Context) -> CliResult<i32> {
    let client = ctx.client();
    let (target, reply) = match (args.track, args.route) {
        (Some(track), _) => {
            info!(track = %track.display(), "following local track");
            let reply = client.repeat_route_from_lon_lats(&track).await;
            (track.display().to_string(), reply)
        }
        (None, Some(route)) => {
            info!(route = %route, "repeating route stored on the robot");
            let reply = client.repeat_route(&route).await;
            (route, reply)
        }
        (None, None) => (
            String::new(),
            Err(AmigaError::Validation(
                "either --track or --route is required".into(),
            )),
        ),
    };
    finish("follow-track", target, client, reply, ctx).await
}

pub async fn pause(ctx: &Context) -> CliResult<i32> {
    let client = ctx.client();
    let reply = client.pause_route().await;
    let target = client.request_channel().address().to_string();
    finish("pause", target, client, reply, ctx).await
}

async fn finish(
    command: &'static str,
    target: String,
    client: Amiga,
    reply: amiga::Result<Reply>,
    ctx: &Context,
) -> CliResult<i32> {
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
