use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amiga::peer::BoxError;
use amiga::proto::nexus::Stream;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::cmd::{parse_duration, wait_for, Context, StreamArgs};
use crate::exit::{amiga_error, check_reply, CliResult, SUCCESS};
use crate::output::{print_record, StreamOutput};

pub async fn run(args: StreamArgs, ctx: &Context) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let client = ctx.client();

    let reply = client
        .select_video_stream(&args.camera, args.resolution)
        .await
        .map_err(|err| amiga_error("select video stream failed", err))?;
    check_reply("select video stream", reply)?;
    info!(camera = %args.camera, resolution = %args.resolution, "video stream selected");

    let frames = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(Notify::new());
    let format = ctx.format;
    let limit = args.count;

    let guard = {
        let frames = Arc::clone(&frames);
        let done = Arc::clone(&done);
        client
            .stream_subscribe(move |stream: Arc<Stream>| {
                let index = frames.fetch_add(1, Ordering::SeqCst);
                if let Some(out) = StreamOutput::from_stream(index, &stream) {
                    print_record(&out, format);
                }
                if limit.is_some_and(|limit| index + 1 >= limit) {
                    done.notify_one();
                }
                std::future::ready(Ok::<(), BoxError>(()))
            })
            .await
            .map_err(|err| amiga_error("stream subscription failed", err))?
    };

    wait_for(duration, &done).await;
    drop(guard);

    if let Err(err) = client.disable_video_stream().await {
        warn!(error = %err, "could not disable video stream");
    }
    client.close().await;
    info!(frames = frames.load(Ordering::SeqCst), "stream session finished");
    Ok(SUCCESS)
}
