use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amiga::filter_feedback;
use amiga::peer::BoxError;
use amiga::proto::nexus::Feedback;
use tokio::sync::Notify;
use tracing::info;

use crate::cmd::{parse_duration, wait_for, Context, FeedbackArgs};
use crate::exit::{amiga_error, CliResult, SUCCESS};
use crate::output::{print_record, FeedbackOutput};

pub async fn run(args: FeedbackArgs, ctx: &Context) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let client = ctx.client();

    let printed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(Notify::new());
    let format = ctx.format;
    let kind = args.kind;
    let limit = args.count;

    let guard = {
        let printed = Arc::clone(&printed);
        let done = Arc::clone(&done);
        client
            .feedback_subscribe(move |feedback: Arc<Feedback>| {
                if let Some(feedback) = filter_feedback(&feedback, kind) {
                    print_record(&FeedbackOutput::from_feedback(feedback), format);
                    let count = printed.fetch_add(1, Ordering::SeqCst) + 1;
                    if limit.is_some_and(|limit| count >= limit) {
                        done.notify_one();
                    }
                }
                std::future::ready(Ok::<(), BoxError>(()))
            })
            .await
            .map_err(|err| amiga_error("feedback subscription failed", err))?
    };
    info!(kind = %kind, "listening to feedback");

    wait_for(duration, &done).await;
    drop(guard);
    client.close().await;
    info!(received = printed.load(Ordering::SeqCst), "feedback session finished");
    Ok(SUCCESS)
}
