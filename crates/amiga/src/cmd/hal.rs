use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amiga::frame::RawFrame;
use amiga::peer::BoxError;
use amiga::transport::Address;
use amiga::{decode_payload, HalFeed, HalPayload};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::cmd::{parse_duration, wait_for, Context, HalArgs};
use crate::exit::{amiga_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_record, FrameOutput};

pub async fn run(args: HalArgs, ctx: &Context) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let address: Address = args
        .hal_address
        .parse()
        .map_err(|err| transport_error("invalid hardware feed address", err))?;
    let feed = HalFeed::new(address.clone(), ctx.subscription_config());

    let frames = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(Notify::new());
    let format = ctx.format;
    let limit = args.count;

    let guard = {
        let frames = Arc::clone(&frames);
        let done = Arc::clone(&done);
        feed.subscribe(move |frame: Arc<RawFrame>| {
            let imu = match decode_payload(&frame) {
                Ok(HalPayload::Imu(imu)) => Some(imu),
                Ok(HalPayload::Other(_)) => None,
                Err(err) => {
                    warn!(prefix = %frame.prefix, error = %err, "undecodable payload");
                    None
                }
            };
            print_record(&FrameOutput::from_frame(&frame, imu.as_ref()), format);
            let count = frames.fetch_add(1, Ordering::SeqCst) + 1;
            if limit.is_some_and(|limit| count >= limit) {
                done.notify_one();
            }
            std::future::ready(Ok::<(), BoxError>(()))
        })
        .await
        .map_err(|err| amiga_error("hardware feed subscription failed", err))?
    };
    info!(address = %address, "listening to hardware feed");

    wait_for(duration, &done).await;
    drop(guard);
    feed.stop().await;
    info!(frames = frames.load(Ordering::SeqCst), "hardware feed session finished");
    Ok(SUCCESS)
}
